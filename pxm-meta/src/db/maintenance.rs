//! Bulk maintenance queries
//!
//! Each function is a single pass over a whole table. They are safe to run
//! repeatedly and converge on the same result.

use chrono::NaiveDate;
use pxm_common::text::slugify;
use pxm_common::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

/// Album type of generated month albums
pub const MOMENT_ALBUM_TYPE: &str = "moment";

/// Set quality to -1 for live photos without a primary file
pub async fn reset_photo_quality(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE photos SET photo_quality = -1
        WHERE deleted_at IS NULL
          AND photo_quality <> -1
          AND NOT EXISTS (
              SELECT 1 FROM files f
              WHERE f.photo_id = photos.id AND f.file_primary = 1 AND f.file_missing = 0
          )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Hide photos whose files are all missing, then refresh label and album
/// photo counts from visible photos
pub async fn update_counts(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE photos SET photo_hidden = CASE
            WHEN EXISTS (SELECT 1 FROM files f WHERE f.photo_id = photos.id)
             AND NOT EXISTS (
                 SELECT 1 FROM files f WHERE f.photo_id = photos.id AND f.file_missing = 0
             )
            THEN 1 ELSE 0 END
        WHERE deleted_at IS NULL
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE labels SET photo_count = (
            SELECT COUNT(*) FROM photos_labels pl
            JOIN photos p ON p.id = pl.photo_id
            WHERE pl.label_id = labels.id AND p.deleted_at IS NULL AND p.photo_hidden = 0
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE albums SET photo_count = (
            SELECT COUNT(*) FROM photos_albums pa
            JOIN photos p ON p.id = pa.photo_id
            WHERE pa.album_id = albums.id AND p.deleted_at IS NULL AND p.photo_hidden = 0
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    debug!("Counts updated");
    Ok(())
}

/// Create a moment album for every month with at least `min_photos` visible
/// photos and link the photos to it. Returns the number of albums created.
pub async fn create_moments(pool: &SqlitePool, min_photos: usize) -> Result<usize> {
    let months = sqlx::query(
        r#"
        SELECT CAST(strftime('%Y', taken_at, 'unixepoch') AS INTEGER) AS year,
               CAST(strftime('%m', taken_at, 'unixepoch') AS INTEGER) AS month
        FROM photos
        WHERE deleted_at IS NULL AND photo_hidden = 0 AND taken_at IS NOT NULL
        GROUP BY year, month
        HAVING COUNT(*) >= ?
        ORDER BY year, month
        "#,
    )
    .bind(min_photos.max(1) as i64)
    .fetch_all(pool)
    .await?;

    let mut created = 0;
    for row in &months {
        let year: i64 = row.try_get("year")?;
        let month: i64 = row.try_get("month")?;

        let Some(first_day) = NaiveDate::from_ymd_opt(year as i32, month as u32, 1) else {
            warn!(year, month, "Skipping moment with invalid date");
            continue;
        };

        let title = first_day.format("%B %Y").to_string();
        let slug = slugify(&title);

        let inserted = sqlx::query(
            r#"
            INSERT INTO albums (album_slug, album_type, album_title, album_year, album_month)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(album_type, album_slug) DO NOTHING
            "#,
        )
        .bind(&slug)
        .bind(MOMENT_ALBUM_TYPE)
        .bind(&title)
        .bind(year)
        .bind(month)
        .execute(pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            debug!(album = %slug, "Moment created");
            created += 1;
        }

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO photos_albums (photo_id, album_id)
            SELECT p.id, a.id
            FROM photos p
            JOIN albums a ON a.album_type = ? AND a.album_slug = ?
            WHERE p.deleted_at IS NULL
              AND p.taken_at IS NOT NULL
              AND strftime('%Y-%m', p.taken_at, 'unixepoch') = ?
            "#,
        )
        .bind(MOMENT_ALBUM_TYPE)
        .bind(&slug)
        .bind(first_day.format("%Y-%m").to_string())
        .execute(pool)
        .await?;
    }

    Ok(created)
}

/// Point album and label thumbnails at the primary file of their newest
/// visible photo
pub async fn update_previews(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE albums SET thumb = COALESCE((
            SELECT f.file_hash
            FROM photos_albums pa
            JOIN photos p ON p.id = pa.photo_id
            JOIN files f ON f.photo_id = p.id AND f.file_primary = 1 AND f.file_missing = 0
            WHERE pa.album_id = albums.id AND p.deleted_at IS NULL AND p.photo_hidden = 0
            ORDER BY p.taken_at DESC, p.id DESC
            LIMIT 1
        ), '')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        UPDATE labels SET thumb = COALESCE((
            SELECT f.file_hash
            FROM photos_labels pl
            JOIN photos p ON p.id = pl.photo_id
            JOIN files f ON f.photo_id = p.id AND f.file_primary = 1 AND f.file_missing = 0
            WHERE pl.label_id = labels.id AND p.deleted_at IS NULL AND p.photo_hidden = 0
            ORDER BY p.taken_at DESC, p.id DESC
            LIMIT 1
        ), '')
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
