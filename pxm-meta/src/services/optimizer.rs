//! Per-photo metadata optimization
//!
//! Resolves the camera and lens references from the raw EXIF fields,
//! refreshes the quality estimate, stacks duplicates, and stamps
//! `checked_at`. Running it again over an unchanged photo reports no change.

use crate::db::store::PhotoStore;
use crate::models::{Camera, Lens, Photo, ReferenceEntity};
use crate::services::entity_resolver::EntityResolver;
use crate::services::scanner::{ItemTransform, ScanItem, TransformOutcome};
use async_trait::async_trait;
use chrono::Utc;
use pxm_common::events::{EventBus, PxmEvent};
use std::sync::Arc;
use tracing::{debug, info};

impl ScanItem for Photo {
    fn scan_id(&self) -> &str {
        &self.uid
    }
}

/// Feature toggles for the optimizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerOptions {
    pub stack_uuid: bool,
    pub stack_meta: bool,
    pub estimates: bool,
}

pub struct PhotoOptimizer {
    store: Arc<dyn PhotoStore>,
    cameras: Arc<EntityResolver<Camera>>,
    lenses: Arc<EntityResolver<Lens>>,
    events: EventBus,
    options: OptimizerOptions,
}

impl PhotoOptimizer {
    pub fn new(
        store: Arc<dyn PhotoStore>,
        cameras: Arc<EntityResolver<Camera>>,
        lenses: Arc<EntityResolver<Lens>>,
        events: EventBus,
        options: OptimizerOptions,
    ) -> Self {
        Self {
            store,
            cameras,
            lenses,
            events,
            options,
        }
    }
}

#[async_trait]
impl ItemTransform<Photo> for PhotoOptimizer {
    async fn apply(&self, photo: &Photo) -> anyhow::Result<TransformOutcome> {
        if photo.deleted_at.is_some() {
            debug!(photo = %photo.uid, "Skipping deleted photo");
            return Ok(TransformOutcome::unchanged());
        }

        let mut updated = photo.clone();
        let mut changed = false;

        let camera = self.cameras.resolve(&photo.camera_fields()).await;
        if updated.camera_id != camera.id {
            debug!(photo = %photo.uid, camera = %camera, "Camera changed");
            updated.camera_id = camera.id;
            changed = true;
        }

        let lens = self.lenses.resolve(&photo.lens_fields()).await;
        if updated.lens_id != lens.id {
            debug!(photo = %photo.uid, lens = %lens, "Lens changed");
            updated.lens_id = lens.id;
            changed = true;
        }

        let camera_known = !camera.is_unknown();

        if self.options.estimates {
            let quality = updated.estimate_quality(camera_known);
            if quality != updated.quality {
                debug!(photo = %photo.uid, from = updated.quality, to = quality, "Quality changed");
                updated.quality = quality;
                changed = true;
            }
        }

        let mut merged = Vec::new();
        if let Some(key) = updated.stack_key(self.options.stack_uuid, self.options.stack_meta, camera_known) {
            let candidates = self.store.stack_candidates(&updated, &key).await?;
            if !candidates.is_empty() {
                merged = self.store.merge_photos(&updated, &candidates).await?;
            }
        }

        if !merged.is_empty() {
            info!(photo = %photo.uid, merged = ?merged, "Merged photos into stack");
            self.events.emit_lossy(PxmEvent::PhotosMerged {
                photo_uid: photo.uid.clone(),
                merged_uids: merged.clone(),
                timestamp: Utc::now(),
            });
            changed = true;
        }

        updated.checked_at = Some(pxm_common::time::now_unix());
        self.store.save_optimized(&updated).await?;

        Ok(TransformOutcome { changed, merged })
    }
}
