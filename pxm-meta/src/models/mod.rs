//! Data models for pxm-meta
//!
//! - Reference entities (cameras, lenses) addressed by a normalized slug
//! - Photos as seen by the maintenance scanner

pub mod camera;
pub mod identity;
pub mod lens;
pub mod photo;

pub use camera::Camera;
pub use identity::{DescriptiveFields, NormalizedIdentity, UNKNOWN_NAME, UNKNOWN_SLUG};
pub use lens::Lens;
pub use photo::{Photo, PhotoFilter, StackKey, StackMode};

/// A deduplicated, immutable-after-creation record addressed by its slug
///
/// Every kind has one distinguished Unknown instance with the reserved slug
/// [`UNKNOWN_SLUG`], returned whenever the descriptive fields are not enough
/// to form a key.
pub trait ReferenceEntity: Clone + Send + Sync + std::fmt::Debug + 'static {
    /// Entity kind, also the table name ("lenses", "cameras")
    const KIND: &'static str;

    /// Build a (not yet stored) entity from free-form fields
    fn from_fields(fields: &DescriptiveFields) -> Self;

    /// The Unknown instance (not yet stored)
    fn unknown() -> Self;

    /// Identity key
    fn slug(&self) -> &str;

    /// Human-readable display name
    fn name(&self) -> &str;

    /// Storage id, `None` until stored
    fn id(&self) -> Option<i64>;

    /// Whether this is the Unknown instance (or has no usable key)
    fn is_unknown(&self) -> bool {
        self.slug().is_empty() || self.slug() == UNKNOWN_SLUG
    }

    /// Counter metric published when an entity of this kind is created
    fn count_metric() -> String {
        format!("count.{}", Self::KIND)
    }
}
