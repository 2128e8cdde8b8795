//! Storage traits consumed by the maintenance services
//!
//! [`super::SqliteStore`] implements all of them; tests substitute in-memory
//! fakes.

use crate::models::{Photo, StackKey};
use async_trait::async_trait;
use pxm_common::Result;

/// Result of an insert that must not overwrite an existing row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<E> {
    /// The row was created; carries the stored entity (with id)
    Inserted(E),
    /// A row with the same slug already exists
    Conflict,
}

/// Slug-addressed reference entity storage
#[async_trait]
pub trait ReferenceStore<E>: Send + Sync {
    /// Look up by slug, soft-deleted rows included
    async fn find_by_slug(&self, slug: &str) -> Result<Option<E>>;

    /// Insert unless the slug is taken
    async fn insert_if_absent(&self, entity: &E) -> Result<InsertOutcome<E>>;
}

/// Per-photo writes made by the optimizer
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Persist camera, lens, quality and `checked_at`, leaving `updated_at`
    async fn save_optimized(&self, photo: &Photo) -> Result<()>;

    /// Live photos other than `photo` that share `key` and may be stacked,
    /// ordered by id
    async fn stack_candidates(&self, photo: &Photo, key: &StackKey) -> Result<Vec<Photo>>;

    /// Move files and links of `merged` onto `keep` and soft-delete them.
    /// Returns the uids actually merged.
    async fn merge_photos(&self, keep: &Photo, merged: &[Photo]) -> Result<Vec<String>>;
}

/// Bulk maintenance passes
#[async_trait]
pub trait MaintenanceStore: Send + Sync {
    /// Set quality to -1 for photos without a primary file; returns rows changed
    async fn reset_photo_quality(&self) -> Result<u64>;

    /// Refresh label/album photo counts and photo visibility
    async fn update_counts(&self) -> Result<()>;

    /// Create month moment albums with at least `min_photos` photos; returns
    /// the number created
    async fn create_moments(&self, min_photos: usize) -> Result<usize>;

    /// Refresh album and label thumbnails
    async fn update_previews(&self) -> Result<()>;
}
