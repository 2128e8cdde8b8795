//! Tests for database initialization and default settings

use pxm_common::db::init::{init_database, SCHEMA_VERSION};
use pxm_common::db::{get_setting, set_setting};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("pxm.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("pxm.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO lenses (lens_slug, lens_name) VALUES ('zz', 'Unknown')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lenses")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1, "Existing rows must survive re-initialization");
}

#[tokio::test]
async fn test_schema_tables_exist() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("pxm.db")).await.unwrap();

    for table in [
        "schema_version",
        "settings",
        "cameras",
        "lenses",
        "photos",
        "files",
        "labels",
        "photos_labels",
        "albums",
        "photos_albums",
    ] {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(exists, 1, "missing table {}", table);
    }

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_default_settings_initialized() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("pxm.db")).await.unwrap();

    let page_size: Option<usize> = get_setting(&pool, "meta_page_size").await.unwrap();
    assert_eq!(page_size, Some(50));

    let faces: Option<bool> = get_setting(&pool, "faces_enabled").await.unwrap();
    assert_eq!(faces, Some(false));
}

#[tokio::test]
async fn test_existing_settings_preserved() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("pxm.db");

    let pool = init_database(&db_path).await.unwrap();
    set_setting(&pool, "meta_page_size", 20).await.unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let page_size: Option<usize> = get_setting(&pool, "meta_page_size").await.unwrap();
    assert_eq!(page_size, Some(20));
}

#[tokio::test]
async fn test_null_settings_reset_to_default() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("pxm.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("UPDATE settings SET value = NULL WHERE key = 'meta_page_delay_ms'")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    let delay: Option<u64> = get_setting(&pool, "meta_page_delay_ms").await.unwrap();
    assert_eq!(delay, Some(100));
}

#[tokio::test]
async fn test_photo_updated_at_defaults_to_now() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("pxm.db")).await.unwrap();

    sqlx::query("INSERT INTO photos (photo_uid) VALUES ('p1')")
        .execute(&pool)
        .await
        .unwrap();

    let updated_at: i64 = sqlx::query_scalar("SELECT updated_at FROM photos WHERE photo_uid = 'p1'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(updated_at > 946_684_800);
}
