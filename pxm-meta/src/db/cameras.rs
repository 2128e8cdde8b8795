//! Camera persistence

use crate::db::store::InsertOutcome;
use crate::models::Camera;
use pxm_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Load camera by slug, soft-deleted rows included
pub async fn find_camera_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Camera>> {
    let row = sqlx::query(
        r#"
        SELECT id, camera_slug, camera_name, camera_make, camera_model,
               camera_type, camera_description, camera_notes,
               deleted_at IS NOT NULL AS deleted
        FROM cameras
        WHERE camera_slug = ?
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(camera_from_row).transpose()
}

/// Insert camera unless its slug exists
pub async fn insert_camera_if_absent(pool: &SqlitePool, camera: &Camera) -> Result<InsertOutcome<Camera>> {
    let row = sqlx::query(
        r#"
        INSERT INTO cameras (
            camera_slug, camera_name, camera_make, camera_model,
            camera_type, camera_description, camera_notes
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(camera_slug) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&camera.slug)
    .bind(&camera.name)
    .bind(&camera.make)
    .bind(&camera.model)
    .bind(&camera.camera_type)
    .bind(&camera.description)
    .bind(&camera.notes)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let mut stored = camera.clone();
            stored.id = Some(row.try_get("id")?);
            Ok(InsertOutcome::Inserted(stored))
        }
        None => Ok(InsertOutcome::Conflict),
    }
}

fn camera_from_row(row: &SqliteRow) -> Result<Camera> {
    Ok(Camera {
        id: Some(row.try_get("id")?),
        slug: row.try_get("camera_slug")?,
        name: row.try_get("camera_name")?,
        make: row.try_get("camera_make")?,
        model: row.try_get("camera_model")?,
        camera_type: row.try_get("camera_type")?,
        description: row.try_get("camera_description")?,
        notes: row.try_get("camera_notes")?,
        deleted: row.try_get("deleted")?,
    })
}
