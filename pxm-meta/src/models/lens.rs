//! Camera lens as extracted from EXIF metadata

use super::identity::{no_model_synonym, DescriptiveFields, NormalizedIdentity, UNKNOWN_NAME, UNKNOWN_SLUG};
use super::ReferenceEntity;

/// Lens record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lens {
    pub id: Option<i64>,
    pub slug: String,
    pub name: String,
    pub make: String,
    pub model: String,
    pub lens_type: String,
    pub description: String,
    pub notes: String,
    pub deleted: bool,
}

impl Lens {
    /// Build a lens from EXIF lens model and make
    pub fn new(model: &str, make: &str) -> Self {
        Self::from_fields(&DescriptiveFields::new(make, model))
    }

    fn from_identity(identity: NormalizedIdentity) -> Self {
        Self {
            id: None,
            slug: identity.slug,
            name: identity.name,
            make: identity.make,
            model: identity.model,
            lens_type: String::new(),
            description: String::new(),
            notes: String::new(),
            deleted: false,
        }
    }
}

impl ReferenceEntity for Lens {
    const KIND: &'static str = "lenses";

    fn from_fields(fields: &DescriptiveFields) -> Self {
        NormalizedIdentity::new(fields, no_model_synonym)
            .map(Self::from_identity)
            .unwrap_or_else(Self::unknown)
    }

    fn unknown() -> Self {
        Self {
            id: None,
            slug: UNKNOWN_SLUG.to_string(),
            name: UNKNOWN_NAME.to_string(),
            make: String::new(),
            model: UNKNOWN_NAME.to_string(),
            lens_type: String::new(),
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

impl std::fmt::Display for Lens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
