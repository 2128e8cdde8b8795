//! Photo records as seen by the maintenance worker

use super::identity::DescriptiveFields;
use std::time::Duration;

/// Quality score of a photo without a usable primary file
pub const QUALITY_NO_PRIMARY: i32 = -1;

/// Per-photo stacking preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackMode {
    /// Never stack this photo
    Ignore,
    /// Stack when the global toggles allow it
    #[default]
    Default,
    /// Always stack, even if the global toggles are off
    Always,
}

impl StackMode {
    pub fn from_i64(value: i64) -> Self {
        match value {
            v if v < 0 => StackMode::Ignore,
            0 => StackMode::Default,
            _ => StackMode::Always,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            StackMode::Ignore => -1,
            StackMode::Default => 0,
            StackMode::Always => 1,
        }
    }
}

/// Key shared by photos that belong in the same stack
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StackKey {
    /// Same document id (XMP DocumentID / stack UUID)
    Document(String),
    /// Same capture second and camera
    ///
    /// Newer photos are usually not optimized yet when the keeper is, so
    /// candidates match either the resolved camera or the same raw EXIF
    /// make and model.
    Capture {
        taken_at: i64,
        camera_id: i64,
        camera_make: String,
        camera_model: String,
    },
}

/// Photo row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub id: i64,
    pub uid: String,
    pub title: String,
    pub taken_at: Option<i64>,
    pub camera_make: String,
    pub camera_model: String,
    pub lens_make: String,
    pub lens_model: String,
    pub camera_id: Option<i64>,
    pub lens_id: Option<i64>,
    pub document_id: String,
    pub quality: i32,
    pub stack: StackMode,
    pub hidden: bool,
    pub merged_into: Option<String>,
    pub checked_at: Option<i64>,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    /// Whether a primary, non-missing file exists (derived, not stored)
    pub has_primary: bool,
}

impl Photo {
    /// Minimal photo with the given id and uid, everything else empty
    pub fn new(id: i64, uid: impl Into<String>) -> Self {
        Self {
            id,
            uid: uid.into(),
            title: String::new(),
            taken_at: None,
            camera_make: String::new(),
            camera_model: String::new(),
            lens_make: String::new(),
            lens_model: String::new(),
            camera_id: None,
            lens_id: None,
            document_id: String::new(),
            quality: 0,
            stack: StackMode::Default,
            hidden: false,
            merged_into: None,
            checked_at: None,
            updated_at: 0,
            deleted_at: None,
            has_primary: false,
        }
    }

    pub fn camera_fields(&self) -> DescriptiveFields {
        DescriptiveFields::new(self.camera_make.as_str(), self.camera_model.as_str())
    }

    pub fn lens_fields(&self) -> DescriptiveFields {
        DescriptiveFields::new(self.lens_make.as_str(), self.lens_model.as_str())
    }

    /// Quality estimate: one point each for a primary file, a known camera
    /// and a capture time. Photos without a primary file score -1.
    pub fn estimate_quality(&self, camera_known: bool) -> i32 {
        if !self.has_primary {
            return QUALITY_NO_PRIMARY;
        }

        1 + i32::from(camera_known) + i32::from(self.taken_at.is_some())
    }

    /// Stack key for this photo, if any
    ///
    /// Document ids take precedence over capture metadata. `Always` stacks by
    /// either key even when the corresponding toggle is off.
    pub fn stack_key(&self, stack_uuid: bool, stack_meta: bool, camera_known: bool) -> Option<StackKey> {
        let (by_uuid, by_meta) = match self.stack {
            StackMode::Ignore => return None,
            StackMode::Default => (stack_uuid, stack_meta),
            StackMode::Always => (true, true),
        };

        if by_uuid && !self.document_id.is_empty() {
            return Some(StackKey::Document(self.document_id.clone()));
        }

        match (by_meta, self.taken_at, self.camera_id) {
            (true, Some(taken_at), Some(camera_id)) if camera_known => Some(StackKey::Capture {
                taken_at,
                camera_id,
                camera_make: self.camera_make.clone(),
                camera_model: self.camera_model.clone(),
            }),
            _ => None,
        }
    }
}

/// Selection of photos due for optimization
///
/// A photo qualifies when it is not deleted, has not been edited within the
/// staleness window, and was either never checked or checked before the
/// window. Photos checked or merged away during the current run keep
/// qualifying so that page offsets stay stable while the run writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoFilter {
    /// Unix seconds; rows edited or checked at or after this are fresh
    pub stale_before: i64,
    /// Unix seconds when the current run started
    pub run_started_at: i64,
}

impl PhotoFilter {
    pub fn needs_optimization(now: i64, stale_delay: Duration) -> Self {
        Self {
            stale_before: pxm_common::time::unix_before(now, stale_delay),
            run_started_at: now,
        }
    }

    /// In-memory evaluation of the same predicate the store runs in SQL
    pub fn matches(&self, photo: &Photo) -> bool {
        let live = match photo.deleted_at {
            None => true,
            Some(deleted) => photo.merged_into.is_some() && deleted >= self.run_started_at,
        };
        if !live || photo.updated_at >= self.stale_before {
            return false;
        }

        match photo.checked_at {
            None => true,
            Some(checked) => checked < self.stale_before || checked >= self.run_started_at,
        }
    }
}
