//! Camera model as extracted from EXIF metadata

use super::identity::{canonical_camera_model, DescriptiveFields, NormalizedIdentity, UNKNOWN_NAME, UNKNOWN_SLUG};
use super::ReferenceEntity;

/// Camera record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camera {
    pub id: Option<i64>,
    pub slug: String,
    pub name: String,
    pub make: String,
    pub model: String,
    pub camera_type: String,
    pub description: String,
    pub notes: String,
    pub deleted: bool,
}

impl Camera {
    /// Build a camera from EXIF model and make
    pub fn new(model: &str, make: &str) -> Self {
        Self::from_fields(&DescriptiveFields::new(make, model))
    }
}

impl ReferenceEntity for Camera {
    const KIND: &'static str = "cameras";

    fn from_fields(fields: &DescriptiveFields) -> Self {
        match NormalizedIdentity::new(fields, canonical_camera_model) {
            Some(identity) => Self {
                id: None,
                slug: identity.slug,
                name: identity.name,
                make: identity.make,
                model: identity.model,
                camera_type: String::new(),
                description: String::new(),
                notes: String::new(),
                deleted: false,
            },
            None => Self::unknown(),
        }
    }

    fn unknown() -> Self {
        Self {
            id: None,
            slug: UNKNOWN_SLUG.to_string(),
            name: UNKNOWN_NAME.to_string(),
            make: String::new(),
            model: UNKNOWN_NAME.to_string(),
            camera_type: String::new(),
            description: String::new(),
            notes: String::new(),
            deleted: false,
        }
    }

    fn slug(&self) -> &str {
        &self.slug
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl std::fmt::Display for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
