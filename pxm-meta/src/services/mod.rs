//! Maintenance services
//!
//! Resolution of reference entities, the exclusive task guard, the paginated
//! scanner and the pipeline built from them.

pub mod entity_resolver;
pub mod optimizer;
pub mod pipeline;
pub mod resolution_cache;
pub mod scanner;
pub mod stages;
pub mod task_guard;

pub use entity_resolver::{EntityResolver, Resolution};
pub use optimizer::{OptimizerOptions, PhotoOptimizer};
pub use pipeline::{MaintenancePipeline, PipelineOutcome, PipelineReport, StageFailure, OPTIMIZE_STAGE};
pub use resolution_cache::ResolutionCache;
pub use scanner::{ItemTransform, PageScanner, PageSource, ScanCursor, ScanItem, ScanOptions, ScanReport, TransformOutcome};
pub use stages::{default_stages, FaceRecognizer, MaintenanceStage};
pub use task_guard::{ActiveTask, TaskGuard, TaskRegistry};
