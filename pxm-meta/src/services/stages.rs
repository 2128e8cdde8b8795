//! Maintenance stages that run after the optimize scan
//!
//! Each stage is a thin adapter from [`MaintenanceStage`] to a bulk store
//! pass or an external collaborator. Stages fail independently.

use crate::config::MaintenanceSettings;
use crate::db::store::MaintenanceStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// A step of the maintenance pipeline
#[async_trait]
pub trait MaintenanceStage: Send + Sync {
    /// Short name used in logs and operator messages
    fn name(&self) -> &'static str;

    /// Disabled stages are skipped without being started
    fn disabled(&self) -> bool {
        false
    }

    async fn start(&self) -> anyhow::Result<()>;
}

/// Face recognition collaborator
#[async_trait]
pub trait FaceRecognizer: Send + Sync {
    /// Process pending faces; returns the number of faces updated
    async fn recognize(&self) -> anyhow::Result<usize>;
}

/// Quality -1 for photos without a primary file
pub struct ResetQualityStage {
    store: Arc<dyn MaintenanceStore>,
}

impl ResetQualityStage {
    pub fn new(store: Arc<dyn MaintenanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MaintenanceStage for ResetQualityStage {
    fn name(&self) -> &'static str {
        "reset quality"
    }

    async fn start(&self) -> anyhow::Result<()> {
        let reset = self.store.reset_photo_quality().await?;
        if reset > 0 {
            info!("Reset quality of {} photos without primary file", reset);
        }
        Ok(())
    }
}

/// Label and album counts plus photo visibility
pub struct CountsStage {
    store: Arc<dyn MaintenanceStore>,
}

impl CountsStage {
    pub fn new(store: Arc<dyn MaintenanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MaintenanceStage for CountsStage {
    fn name(&self) -> &'static str {
        "counts"
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.store.update_counts().await?;
        Ok(())
    }
}

/// Month moment albums
pub struct MomentsStage {
    store: Arc<dyn MaintenanceStore>,
    min_photos: usize,
}

impl MomentsStage {
    pub fn new(store: Arc<dyn MaintenanceStore>, min_photos: usize) -> Self {
        Self { store, min_photos }
    }
}

#[async_trait]
impl MaintenanceStage for MomentsStage {
    fn name(&self) -> &'static str {
        "moments"
    }

    async fn start(&self) -> anyhow::Result<()> {
        let created = self.store.create_moments(self.min_photos).await?;
        if created > 0 {
            info!("Created {} moments", created);
        }
        Ok(())
    }
}

/// Face recognition, off unless enabled and a recognizer is configured
pub struct FacesStage {
    recognizer: Option<Arc<dyn FaceRecognizer>>,
    enabled: bool,
}

impl FacesStage {
    pub fn new(recognizer: Option<Arc<dyn FaceRecognizer>>, enabled: bool) -> Self {
        Self { recognizer, enabled }
    }
}

#[async_trait]
impl MaintenanceStage for FacesStage {
    fn name(&self) -> &'static str {
        "faces"
    }

    fn disabled(&self) -> bool {
        !self.enabled || self.recognizer.is_none()
    }

    async fn start(&self) -> anyhow::Result<()> {
        let Some(recognizer) = &self.recognizer else {
            return Ok(());
        };

        let updated = recognizer.recognize().await?;
        debug!("Recognition updated {} faces", updated);
        Ok(())
    }
}

/// Album and label thumbnails
pub struct PreviewsStage {
    store: Arc<dyn MaintenanceStore>,
}

impl PreviewsStage {
    pub fn new(store: Arc<dyn MaintenanceStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MaintenanceStage for PreviewsStage {
    fn name(&self) -> &'static str {
        "previews"
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.store.update_previews().await?;
        Ok(())
    }
}

/// Built-in stages in execution order
pub fn default_stages(
    store: Arc<dyn MaintenanceStore>,
    settings: &MaintenanceSettings,
    recognizer: Option<Arc<dyn FaceRecognizer>>,
) -> Vec<Arc<dyn MaintenanceStage>> {
    vec![
        Arc::new(ResetQualityStage::new(store.clone())),
        Arc::new(CountsStage::new(store.clone())),
        Arc::new(MomentsStage::new(store.clone(), settings.moments_min_photos)),
        Arc::new(FacesStage::new(recognizer, settings.faces_enabled)),
        Arc::new(PreviewsStage::new(store)),
    ]
}
