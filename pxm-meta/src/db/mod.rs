//! Database access for pxm-meta
//!
//! Query functions live in one module per table group and take a pool.
//! [`SqliteStore`] wraps a pool and implements the store traits the
//! services depend on.

pub mod cameras;
pub mod lenses;
pub mod maintenance;
pub mod photos;
pub mod store;

use crate::models::{Camera, Lens, Photo, PhotoFilter, StackKey};
use crate::services::scanner::PageSource;
use async_trait::async_trait;
use pxm_common::Result;
use sqlx::SqlitePool;
use store::{InsertOutcome, MaintenanceStore, PhotoStore, ReferenceStore};

/// SQLite implementation of every store trait
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ReferenceStore<Lens> for SqliteStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Lens>> {
        lenses::find_lens_by_slug(&self.pool, slug).await
    }

    async fn insert_if_absent(&self, lens: &Lens) -> Result<InsertOutcome<Lens>> {
        lenses::insert_lens_if_absent(&self.pool, lens).await
    }
}

#[async_trait]
impl ReferenceStore<Camera> for SqliteStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Camera>> {
        cameras::find_camera_by_slug(&self.pool, slug).await
    }

    async fn insert_if_absent(&self, camera: &Camera) -> Result<InsertOutcome<Camera>> {
        cameras::insert_camera_if_absent(&self.pool, camera).await
    }
}

#[async_trait]
impl PhotoStore for SqliteStore {
    async fn save_optimized(&self, photo: &Photo) -> Result<()> {
        photos::save_optimized(&self.pool, photo).await
    }

    async fn stack_candidates(&self, photo: &Photo, key: &StackKey) -> Result<Vec<Photo>> {
        photos::find_stack_candidates(&self.pool, photo, key).await
    }

    async fn merge_photos(&self, keep: &Photo, merged: &[Photo]) -> Result<Vec<String>> {
        photos::merge_photos(&self.pool, keep, merged).await
    }
}

#[async_trait]
impl MaintenanceStore for SqliteStore {
    async fn reset_photo_quality(&self) -> Result<u64> {
        maintenance::reset_photo_quality(&self.pool).await
    }

    async fn update_counts(&self) -> Result<()> {
        maintenance::update_counts(&self.pool).await
    }

    async fn create_moments(&self, min_photos: usize) -> Result<usize> {
        maintenance::create_moments(&self.pool, min_photos).await
    }

    async fn update_previews(&self) -> Result<()> {
        maintenance::update_previews(&self.pool).await
    }
}

#[async_trait]
impl PageSource<PhotoFilter> for SqliteStore {
    type Item = Photo;

    async fn fetch_page(&self, filter: &PhotoFilter, offset: usize, limit: usize) -> anyhow::Result<Vec<Photo>> {
        Ok(photos::fetch_photo_page(&self.pool, filter, offset, limit).await?)
    }
}
