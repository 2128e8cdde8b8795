//! Runtime settings for the maintenance worker
//!
//! Loaded from the database `settings` table. A missing or unparseable value
//! falls back to the built-in default, which is written back so the table
//! always shows the effective configuration.

use pxm_common::db::settings::defaults;
use pxm_common::db::{get_setting, set_setting};
use pxm_common::Result;
use sqlx::SqlitePool;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Effective maintenance settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceSettings {
    /// Photos fetched per scanner page (never 0)
    pub page_size: usize,
    /// Pause between pages
    pub page_delay: Duration,
    /// Minimum age of an edit or check before a photo is optimized again
    pub stale_delay: Duration,
    /// Stack photos sharing a document id
    pub stack_uuid: bool,
    /// Stack photos sharing capture time and camera
    pub stack_meta: bool,
    /// Recompute quality estimates
    pub estimates: bool,
    /// Run the recognition stage
    pub faces_enabled: bool,
    /// Minimum photos per month for a moment album
    pub moments_min_photos: usize,
    /// Resolver cache lifetime, `None` keeps entries forever
    pub cache_ttl: Option<Duration>,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            page_size: defaults::META_PAGE_SIZE,
            page_delay: Duration::from_millis(defaults::META_PAGE_DELAY_MS),
            stale_delay: Duration::from_secs(defaults::META_STALE_DELAY_SECS),
            stack_uuid: defaults::META_STACK_UUID,
            stack_meta: defaults::META_STACK_META,
            estimates: defaults::META_ESTIMATES,
            faces_enabled: defaults::FACES_ENABLED,
            moments_min_photos: defaults::MOMENTS_MIN_PHOTOS,
            cache_ttl: ttl_from_secs(defaults::RESOLVER_CACHE_TTL_SECS),
        }
    }
}

impl MaintenanceSettings {
    /// Load all settings from the database
    pub async fn load(db: &SqlitePool) -> Result<Self> {
        let mut page_size = load_or_default(db, "meta_page_size", defaults::META_PAGE_SIZE).await?;
        if page_size == 0 {
            warn!(
                "meta_page_size 0 is not usable, using default {}",
                defaults::META_PAGE_SIZE
            );
            page_size = defaults::META_PAGE_SIZE;
        } else if page_size > defaults::META_PAGE_SIZE_MAX {
            warn!(
                "meta_page_size {} is too large, using {}",
                page_size,
                defaults::META_PAGE_SIZE_MAX
            );
            page_size = defaults::META_PAGE_SIZE_MAX;
        }

        let delay_ms = load_or_default(db, "meta_page_delay_ms", defaults::META_PAGE_DELAY_MS).await?;
        let stale_secs =
            load_or_default(db, "meta_stale_delay_secs", defaults::META_STALE_DELAY_SECS).await?;
        let ttl_secs =
            load_or_default(db, "resolver_cache_ttl_secs", defaults::RESOLVER_CACHE_TTL_SECS).await?;

        let settings = Self {
            page_size,
            page_delay: Duration::from_millis(delay_ms),
            stale_delay: Duration::from_secs(stale_secs),
            stack_uuid: load_or_default(db, "meta_stack_uuid", defaults::META_STACK_UUID).await?,
            stack_meta: load_or_default(db, "meta_stack_meta", defaults::META_STACK_META).await?,
            estimates: load_or_default(db, "meta_estimates", defaults::META_ESTIMATES).await?,
            faces_enabled: load_or_default(db, "faces_enabled", defaults::FACES_ENABLED).await?,
            moments_min_photos: load_or_default(
                db,
                "moments_min_photos",
                defaults::MOMENTS_MIN_PHOTOS,
            )
            .await?,
            cache_ttl: ttl_from_secs(ttl_secs),
        };

        debug!(?settings, "Maintenance settings loaded");
        Ok(settings)
    }
}

fn ttl_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Read `key`, writing `default` back when it is missing or malformed
async fn load_or_default<T>(db: &SqlitePool, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match get_setting::<T>(db, key).await {
        Ok(Some(value)) => Ok(value),
        Ok(None) => {
            set_setting(db, key, default).await?;
            Ok(default)
        }
        Err(pxm_common::Error::Config(msg)) => {
            warn!("{}; using default {}", msg, default);
            set_setting(db, key, default).await?;
            Ok(default)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pxm_common::db::init::create_settings_table;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn settings_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_settings_table(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_defaults_written_back() {
        let pool = settings_pool().await;

        let settings = MaintenanceSettings::load(&pool).await.unwrap();
        assert_eq!(settings, MaintenanceSettings::default());

        let stored: Option<usize> = get_setting(&pool, "meta_page_size").await.unwrap();
        assert_eq!(stored, Some(50));
    }

    #[tokio::test]
    async fn test_overrides_and_clamping() {
        let pool = settings_pool().await;
        set_setting(&pool, "meta_page_size", 0).await.unwrap();
        set_setting(&pool, "meta_page_delay_ms", 5).await.unwrap();
        set_setting(&pool, "faces_enabled", true).await.unwrap();
        set_setting(&pool, "resolver_cache_ttl_secs", 0).await.unwrap();

        let settings = MaintenanceSettings::load(&pool).await.unwrap();
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.page_delay, Duration::from_millis(5));
        assert!(settings.faces_enabled);
        assert_eq!(settings.cache_ttl, None);
    }

    #[tokio::test]
    async fn test_huge_page_size_capped() {
        let pool = settings_pool().await;
        set_setting(&pool, "meta_page_size", usize::MAX).await.unwrap();

        let settings = MaintenanceSettings::load(&pool).await.unwrap();
        assert_eq!(settings.page_size, defaults::META_PAGE_SIZE_MAX);
    }

    #[tokio::test]
    async fn test_malformed_value_replaced() {
        let pool = settings_pool().await;
        set_setting(&pool, "meta_estimates", "maybe").await.unwrap();

        let settings = MaintenanceSettings::load(&pool).await.unwrap();
        assert!(settings.estimates);

        let stored: Option<bool> = get_setting(&pool, "meta_estimates").await.unwrap();
        assert_eq!(stored, Some(true));
    }
}
