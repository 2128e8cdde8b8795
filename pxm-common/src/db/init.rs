//! Database initialization
//!
//! Opens (or creates) the SQLite database, applies connection pragmas,
//! creates the schema idempotently and seeds default settings.

use crate::db::settings::default_settings;
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets foreground readers proceed while the maintenance worker writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create every table (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;

    // Reference entities
    create_cameras_table(pool).await?;
    create_lenses_table(pool).await?;

    // Photos and their files
    create_photos_table(pool).await?;
    create_files_table(pool).await?;

    // Aggregates
    create_labels_table(pool).await?;
    create_albums_table(pool).await?;

    debug!("Database schema verified (version {})", SCHEMA_VERSION);
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores runtime configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_cameras_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cameras (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            camera_slug TEXT NOT NULL UNIQUE,
            camera_name TEXT NOT NULL,
            camera_make TEXT NOT NULL DEFAULT '',
            camera_model TEXT NOT NULL DEFAULT '',
            camera_type TEXT NOT NULL DEFAULT '',
            camera_description TEXT NOT NULL DEFAULT '',
            camera_notes TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            deleted_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_lenses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lens_slug TEXT NOT NULL UNIQUE,
            lens_name TEXT NOT NULL,
            lens_make TEXT NOT NULL DEFAULT '',
            lens_model TEXT NOT NULL DEFAULT '',
            lens_type TEXT NOT NULL DEFAULT '',
            lens_description TEXT NOT NULL DEFAULT '',
            lens_notes TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            deleted_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Photos table
///
/// Check and edit timestamps are unix seconds. `camera_id`/`lens_id` stay
/// NULL until the maintenance worker resolves the raw EXIF fields.
async fn create_photos_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS photos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            photo_uid TEXT NOT NULL UNIQUE,
            photo_title TEXT NOT NULL DEFAULT '',
            taken_at INTEGER,
            camera_make TEXT NOT NULL DEFAULT '',
            camera_model TEXT NOT NULL DEFAULT '',
            lens_make TEXT NOT NULL DEFAULT '',
            lens_model TEXT NOT NULL DEFAULT '',
            camera_id INTEGER REFERENCES cameras(id),
            lens_id INTEGER REFERENCES lenses(id),
            document_id TEXT NOT NULL DEFAULT '',
            photo_quality INTEGER NOT NULL DEFAULT 0,
            photo_stack INTEGER NOT NULL DEFAULT 0,
            photo_hidden INTEGER NOT NULL DEFAULT 0,
            merged_into TEXT,
            checked_at INTEGER,
            updated_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER)),
            deleted_at INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_photos_checked_at ON photos(checked_at)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_photos_document_id ON photos(document_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_files_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            photo_id INTEGER NOT NULL REFERENCES photos(id),
            file_name TEXT NOT NULL,
            file_hash TEXT NOT NULL DEFAULT '',
            file_primary INTEGER NOT NULL DEFAULT 0,
            file_missing INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_photo_id ON files(photo_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_labels_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS labels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label_slug TEXT NOT NULL UNIQUE,
            label_name TEXT NOT NULL,
            photo_count INTEGER NOT NULL DEFAULT 0,
            thumb TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS photos_labels (
            photo_id INTEGER NOT NULL REFERENCES photos(id),
            label_id INTEGER NOT NULL REFERENCES labels(id),
            PRIMARY KEY (photo_id, label_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_albums_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS albums (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            album_slug TEXT NOT NULL,
            album_type TEXT NOT NULL DEFAULT 'album',
            album_title TEXT NOT NULL,
            album_year INTEGER,
            album_month INTEGER,
            photo_count INTEGER NOT NULL DEFAULT 0,
            thumb TEXT NOT NULL DEFAULT '',
            UNIQUE (album_type, album_slug)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS photos_albums (
            photo_id INTEGER NOT NULL REFERENCES photos(id),
            album_id INTEGER NOT NULL REFERENCES albums(id),
            PRIMARY KEY (photo_id, album_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Ensure every runtime setting exists, writing built-in defaults for
/// missing or NULL values
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for (key, value) in default_settings() {
        ensure_setting(pool, key, &value).await?;
    }
    Ok(())
}

async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    // INSERT OR IGNORE handles concurrent initialization by several processes
    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let reset = sqlx::query("UPDATE settings SET value = ? WHERE key = ? AND value IS NULL")
        .bind(default_value)
        .bind(key)
        .execute(pool)
        .await?
        .rows_affected();

    if reset > 0 {
        info!("Reset NULL setting '{}' to default value: {}", key, default_value);
    }

    Ok(())
}
