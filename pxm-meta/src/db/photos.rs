//! Photo persistence for the maintenance worker

use crate::models::{Photo, PhotoFilter, StackKey, StackMode};
use pxm_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

const PHOTO_COLUMNS: &str = r#"
    p.id, p.photo_uid, p.photo_title, p.taken_at,
    p.camera_make, p.camera_model, p.lens_make, p.lens_model,
    p.camera_id, p.lens_id, p.document_id,
    p.photo_quality, p.photo_stack, p.photo_hidden, p.merged_into,
    p.checked_at, p.updated_at, p.deleted_at,
    EXISTS (
        SELECT 1 FROM files f
        WHERE f.photo_id = p.id AND f.file_primary = 1 AND f.file_missing = 0
    ) AS has_primary
"#;

/// One page of photos due for optimization, ordered by id
///
/// Photos merged away during the current run stay in the result so a merge
/// never shifts later pages. The scanner skips them through its seen-set.
pub async fn fetch_photo_page(
    pool: &SqlitePool,
    filter: &PhotoFilter,
    offset: usize,
    limit: usize,
) -> Result<Vec<Photo>> {
    let sql = format!(
        r#"
        SELECT {PHOTO_COLUMNS}
        FROM photos p
        WHERE (p.deleted_at IS NULL OR (p.merged_into IS NOT NULL AND p.deleted_at >= ?))
          AND p.updated_at < ?
          AND (p.checked_at IS NULL OR p.checked_at < ? OR p.checked_at >= ?)
        ORDER BY p.id
        LIMIT ? OFFSET ?
        "#
    );

    let rows = sqlx::query(&sql)
        .bind(filter.run_started_at)
        .bind(filter.stale_before)
        .bind(filter.stale_before)
        .bind(filter.run_started_at)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .bind(i64::try_from(offset).unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await?;

    rows.iter().map(photo_from_row).collect()
}

/// Load photo by uid, deleted rows included
pub async fn find_photo_by_uid(pool: &SqlitePool, uid: &str) -> Result<Option<Photo>> {
    let sql = format!("SELECT {PHOTO_COLUMNS} FROM photos p WHERE p.photo_uid = ?");
    let row = sqlx::query(&sql).bind(uid).fetch_optional(pool).await?;

    row.as_ref().map(photo_from_row).transpose()
}

/// Insert a photo with its raw metadata; returns the new id
pub async fn insert_photo(pool: &SqlitePool, photo: &Photo) -> Result<i64> {
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO photos (
            photo_uid, photo_title, taken_at,
            camera_make, camera_model, lens_make, lens_model,
            document_id, photo_quality, photo_stack, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&photo.uid)
    .bind(&photo.title)
    .bind(photo.taken_at)
    .bind(&photo.camera_make)
    .bind(&photo.camera_model)
    .bind(&photo.lens_make)
    .bind(&photo.lens_model)
    .bind(&photo.document_id)
    .bind(photo.quality)
    .bind(photo.stack.as_i64())
    .bind(photo.updated_at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Attach a file to a photo
pub async fn insert_file(
    pool: &SqlitePool,
    photo_id: i64,
    file_name: &str,
    file_hash: &str,
    primary: bool,
) -> Result<i64> {
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO files (photo_id, file_name, file_hash, file_primary)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(photo_id)
    .bind(file_name)
    .bind(file_hash)
    .bind(primary)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Store optimizer results; `updated_at` is left alone so the photo does
/// not look edited
pub async fn save_optimized(pool: &SqlitePool, photo: &Photo) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE photos
        SET camera_id = ?, lens_id = ?, photo_quality = ?, checked_at = ?
        WHERE id = ?
        "#,
    )
    .bind(photo.camera_id)
    .bind(photo.lens_id)
    .bind(photo.quality)
    .bind(photo.checked_at)
    .bind(photo.id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Newer live photos sharing `key` whose stack setting allows merging
pub async fn find_stack_candidates(pool: &SqlitePool, photo: &Photo, key: &StackKey) -> Result<Vec<Photo>> {
    let ignore = StackMode::Ignore.as_i64();

    let rows = match key {
        StackKey::Document(document_id) => {
            let sql = format!(
                r#"
                SELECT {PHOTO_COLUMNS}
                FROM photos p
                WHERE p.deleted_at IS NULL AND p.id > ? AND p.photo_stack <> ?
                  AND p.document_id = ?
                ORDER BY p.id
                "#
            );
            sqlx::query(&sql)
                .bind(photo.id)
                .bind(ignore)
                .bind(document_id)
                .fetch_all(pool)
                .await?
        }
        StackKey::Capture {
            taken_at,
            camera_id,
            camera_make,
            camera_model,
        } => {
            let sql = format!(
                r#"
                SELECT {PHOTO_COLUMNS}
                FROM photos p
                WHERE p.deleted_at IS NULL AND p.id > ? AND p.photo_stack <> ?
                  AND p.taken_at = ?
                  AND (p.camera_id = ? OR (p.camera_make = ? AND p.camera_model = ?))
                ORDER BY p.id
                "#
            );
            sqlx::query(&sql)
                .bind(photo.id)
                .bind(ignore)
                .bind(taken_at)
                .bind(camera_id)
                .bind(camera_make)
                .bind(camera_model)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(photo_from_row).collect()
}

/// Move files, labels and albums of `merged` onto `keep`, then soft-delete
/// them. Runs in one transaction; returns the uids actually merged.
pub async fn merge_photos(pool: &SqlitePool, keep: &Photo, merged: &[Photo]) -> Result<Vec<String>> {
    let now = pxm_common::time::now_unix();
    let mut tx = pool.begin().await?;
    let mut merged_uids = Vec::with_capacity(merged.len());

    for photo in merged {
        let deleted = sqlx::query(
            r#"
            UPDATE photos SET deleted_at = ?, merged_into = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(&keep.uid)
        .bind(photo.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            debug!(photo = %photo.uid, "Already merged elsewhere");
            continue;
        }

        sqlx::query("UPDATE files SET photo_id = ?, file_primary = 0 WHERE photo_id = ?")
            .bind(keep.id)
            .bind(photo.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO photos_labels (photo_id, label_id)
            SELECT ?, label_id FROM photos_labels WHERE photo_id = ?
            "#,
        )
        .bind(keep.id)
        .bind(photo.id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM photos_labels WHERE photo_id = ?")
            .bind(photo.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO photos_albums (photo_id, album_id)
            SELECT ?, album_id FROM photos_albums WHERE photo_id = ?
            "#,
        )
        .bind(keep.id)
        .bind(photo.id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM photos_albums WHERE photo_id = ?")
            .bind(photo.id)
            .execute(&mut *tx)
            .await?;

        merged_uids.push(photo.uid.clone());
    }

    tx.commit().await?;
    Ok(merged_uids)
}

fn photo_from_row(row: &SqliteRow) -> Result<Photo> {
    Ok(Photo {
        id: row.try_get("id")?,
        uid: row.try_get("photo_uid")?,
        title: row.try_get("photo_title")?,
        taken_at: row.try_get("taken_at")?,
        camera_make: row.try_get("camera_make")?,
        camera_model: row.try_get("camera_model")?,
        lens_make: row.try_get("lens_make")?,
        lens_model: row.try_get("lens_model")?,
        camera_id: row.try_get("camera_id")?,
        lens_id: row.try_get("lens_id")?,
        document_id: row.try_get("document_id")?,
        quality: row.try_get("photo_quality")?,
        stack: StackMode::from_i64(row.try_get("photo_stack")?),
        hidden: row.try_get("photo_hidden")?,
        merged_into: row.try_get("merged_into")?,
        checked_at: row.try_get("checked_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
        has_primary: row.try_get("has_primary")?,
    })
}
