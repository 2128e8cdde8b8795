//! Settings table access
//!
//! Key/value accessors plus the built-in defaults for every runtime setting.
//! `init_database` seeds these defaults; services read them back with
//! `get_setting` and fall back to the same constants.

use crate::{Error, Result};
use sqlx::SqlitePool;

/// Built-in defaults for runtime settings
pub mod defaults {
    /// Photos fetched per scanner page
    pub const META_PAGE_SIZE: usize = 50;
    /// Largest accepted page size
    pub const META_PAGE_SIZE_MAX: usize = 10_000;
    /// Pause between scanner pages (milliseconds)
    pub const META_PAGE_DELAY_MS: u64 = 100;
    /// Seconds a photo must be untouched before it is checked again
    pub const META_STALE_DELAY_SECS: u64 = 1200;
    /// Stack photos sharing a document id
    pub const META_STACK_UUID: bool = true;
    /// Stack photos sharing capture time and camera
    pub const META_STACK_META: bool = true;
    /// Recompute quality estimates while optimizing
    pub const META_ESTIMATES: bool = true;
    /// Run the recognition stage
    pub const FACES_ENABLED: bool = false;
    /// Minimum photos in a month before a moment album is created
    pub const MOMENTS_MIN_PHOTOS: usize = 10;
    /// Resolver cache entry lifetime in seconds (0 disables expiry)
    pub const RESOLVER_CACHE_TTL_SECS: u64 = 900;
}

/// Setting keys paired with their default value text
pub fn default_settings() -> Vec<(&'static str, String)> {
    use defaults::*;

    vec![
        ("meta_page_size", META_PAGE_SIZE.to_string()),
        ("meta_page_delay_ms", META_PAGE_DELAY_MS.to_string()),
        ("meta_stale_delay_secs", META_STALE_DELAY_SECS.to_string()),
        ("meta_stack_uuid", META_STACK_UUID.to_string()),
        ("meta_stack_meta", META_STACK_META.to_string()),
        ("meta_estimates", META_ESTIMATES.to_string()),
        ("faces_enabled", FACES_ENABLED.to_string()),
        ("moments_min_photos", MOMENTS_MIN_PHOTOS.to_string()),
        ("resolver_cache_ttl_secs", RESOLVER_CACHE_TTL_SECS.to_string()),
    ]
}

/// Generic setting getter
///
/// Returns `None` if the key is missing or its value is NULL.
pub async fn get_setting<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Generic setting setter (insert or replace)
pub async fn set_setting<T>(db: &SqlitePool, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
