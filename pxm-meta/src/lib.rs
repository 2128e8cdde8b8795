//! pxm-meta library interface
//!
//! Background metadata maintenance for the photo index: resolves camera and
//! lens references, optimizes photo metadata page by page, and runs the
//! downstream maintenance stages under an exclusive task guard.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::config::MaintenanceSettings;
pub use crate::error::{GuardError, PipelineError, ScanError};

use crate::db::SqliteStore;
use crate::models::{Camera, Lens};
use crate::services::{
    default_stages, EntityResolver, FaceRecognizer, MaintenancePipeline, OptimizerOptions,
    PageScanner, PhotoOptimizer, PipelineOutcome, ResolutionCache, ScanOptions, TaskGuard,
    TaskRegistry,
};
use pxm_common::events::EventBus;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// Guard name of the metadata maintenance task
pub const META_TASK: &str = "meta";

/// Metadata maintenance worker wired to a SQLite database
pub struct MetaWorker {
    pipeline: MaintenancePipeline,
    settings: MaintenanceSettings,
    cameras: Arc<EntityResolver<Camera>>,
    lenses: Arc<EntityResolver<Lens>>,
}

impl MetaWorker {
    /// Load settings, seed the Unknown camera and lens, and build the pipeline
    ///
    /// All workers created from the same `registry` share the `meta` guard.
    pub async fn new(
        pool: SqlitePool,
        events: EventBus,
        registry: &TaskRegistry,
        recognizer: Option<Arc<dyn FaceRecognizer>>,
    ) -> pxm_common::Result<Self> {
        let settings = MaintenanceSettings::load(&pool).await?;
        let store = Arc::new(SqliteStore::new(pool));

        let cameras = Arc::new(EntityResolver::<Camera>::new(
            store.clone(),
            ResolutionCache::new(settings.cache_ttl),
            events.clone(),
        ));
        let lenses = Arc::new(EntityResolver::<Lens>::new(
            store.clone(),
            ResolutionCache::new(settings.cache_ttl),
            events.clone(),
        ));
        cameras.seed_unknown().await?;
        lenses.seed_unknown().await?;

        let optimizer = PhotoOptimizer::new(
            store.clone(),
            cameras.clone(),
            lenses.clone(),
            events.clone(),
            OptimizerOptions {
                stack_uuid: settings.stack_uuid,
                stack_meta: settings.stack_meta,
                estimates: settings.estimates,
            },
        );

        let scanner = PageScanner::new(ScanOptions {
            page_size: settings.page_size,
            page_delay: settings.page_delay,
        });

        let stages = default_stages(store.clone(), &settings, recognizer);

        let pipeline = MaintenancePipeline::new(
            registry.guard(META_TASK),
            scanner,
            store,
            Arc::new(optimizer),
            stages,
            settings.stale_delay,
            events,
        );

        info!(
            page_size = settings.page_size,
            faces = settings.faces_enabled,
            "Metadata worker ready"
        );

        Ok(Self {
            pipeline,
            settings,
            cameras,
            lenses,
        })
    }

    /// Run the pipeline once
    pub async fn start(&self) -> Result<PipelineOutcome, PipelineError> {
        self.pipeline.run().await
    }

    pub fn guard(&self) -> &TaskGuard {
        self.pipeline.guard()
    }

    pub fn settings(&self) -> &MaintenanceSettings {
        &self.settings
    }

    pub fn cameras(&self) -> &Arc<EntityResolver<Camera>> {
        &self.cameras
    }

    pub fn lenses(&self) -> &Arc<EntityResolver<Lens>> {
        &self.lenses
    }
}
