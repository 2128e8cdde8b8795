//! Database Test Utilities

#![allow(dead_code)]

use pxm_common::db::{init_database, set_setting};
use pxm_meta::db::photos::{insert_file, insert_photo};
use pxm_meta::models::Photo;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create a temporary database with schema and default settings
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("pxm.db")).await.unwrap();
    (temp_dir, pool)
}

/// No inter-page pause and the given page size
pub async fn quiet_settings(pool: &SqlitePool, page_size: usize) {
    set_setting(pool, "meta_page_delay_ms", 0).await.unwrap();
    set_setting(pool, "meta_page_size", page_size).await.unwrap();
}

/// Photo fixture
#[derive(Debug, Clone)]
pub struct PhotoSpec {
    pub uid: String,
    pub camera: (&'static str, &'static str),
    pub lens: (&'static str, &'static str),
    pub taken_at: Option<i64>,
    pub document_id: String,
    pub primary_file: bool,
}

impl PhotoSpec {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            camera: ("Canon", "EOS 5D"),
            lens: ("Canon", "EF24-70mm"),
            taken_at: Some(1_700_000_000),
            document_id: String::new(),
            primary_file: true,
        }
    }

    pub fn taken_at(mut self, taken_at: i64) -> Self {
        self.taken_at = Some(taken_at);
        self
    }

    pub fn document(mut self, document_id: &str) -> Self {
        self.document_id = document_id.to_string();
        self
    }

    pub fn without_file(mut self) -> Self {
        self.primary_file = false;
        self
    }
}

/// Insert a photo last edited an hour ago, plus its primary file
pub async fn add_photo(pool: &SqlitePool, spec: PhotoSpec) -> i64 {
    let mut photo = Photo::new(0, spec.uid.as_str());
    photo.camera_make = spec.camera.0.to_string();
    photo.camera_model = spec.camera.1.to_string();
    photo.lens_make = spec.lens.0.to_string();
    photo.lens_model = spec.lens.1.to_string();
    photo.taken_at = spec.taken_at;
    photo.document_id = spec.document_id;
    photo.updated_at = pxm_common::time::now_unix() - 3600;

    let id = insert_photo(pool, &photo).await.unwrap();
    if spec.primary_file {
        insert_file(pool, id, &format!("{}.jpg", spec.uid), &format!("hash-{}", spec.uid), true)
            .await
            .unwrap();
    }
    id
}

pub async fn count_rows(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}
