//! Lens persistence

use crate::db::store::InsertOutcome;
use crate::models::Lens;
use pxm_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

/// Load lens by slug, soft-deleted rows included
pub async fn find_lens_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Lens>> {
    let row = sqlx::query(
        r#"
        SELECT id, lens_slug, lens_name, lens_make, lens_model,
               lens_type, lens_description, lens_notes,
               deleted_at IS NOT NULL AS deleted
        FROM lenses
        WHERE lens_slug = ?
        "#,
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(lens_from_row).transpose()
}

/// Insert lens unless its slug exists
pub async fn insert_lens_if_absent(pool: &SqlitePool, lens: &Lens) -> Result<InsertOutcome<Lens>> {
    let row = sqlx::query(
        r#"
        INSERT INTO lenses (
            lens_slug, lens_name, lens_make, lens_model,
            lens_type, lens_description, lens_notes
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(lens_slug) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&lens.slug)
    .bind(&lens.name)
    .bind(&lens.make)
    .bind(&lens.model)
    .bind(&lens.lens_type)
    .bind(&lens.description)
    .bind(&lens.notes)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let mut stored = lens.clone();
            stored.id = Some(row.try_get("id")?);
            Ok(InsertOutcome::Inserted(stored))
        }
        None => Ok(InsertOutcome::Conflict),
    }
}

fn lens_from_row(row: &SqliteRow) -> Result<Lens> {
    Ok(Lens {
        id: Some(row.try_get("id")?),
        slug: row.try_get("lens_slug")?,
        name: row.try_get("lens_name")?,
        make: row.try_get("lens_make")?,
        model: row.try_get("lens_model")?,
        lens_type: row.try_get("lens_type")?,
        description: row.try_get("lens_description")?,
        notes: row.try_get("lens_notes")?,
        deleted: row.try_get("deleted")?,
    })
}
