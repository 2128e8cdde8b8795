//! Error types for pxm-meta
//!
//! Guard contention and cancellation are control signals rather than faults,
//! so they get their own variants instead of being folded into `anyhow`.

use thiserror::Error;

/// Task guard acquisition failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    /// Another run of the named task holds the guard
    #[error("{0} already running")]
    AlreadyRunning(String),
}

/// Scanner run failure
#[derive(Debug, Error)]
pub enum ScanError {
    /// Cancellation was requested through the task guard
    #[error("canceled")]
    Canceled,

    /// A page could not be fetched; the run cannot continue
    #[error("page fetch at offset {offset} failed: {source}")]
    Fetch {
        offset: usize,
        #[source]
        source: anyhow::Error,
    },
}

/// Pipeline failure surfaced to the operator
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The optimize stage could not fetch its input
    #[error("failed: {stage} - {source}")]
    Scan {
        stage: &'static str,
        #[source]
        source: ScanError,
    },

    /// A panic escaped a stage and was caught at the pipeline boundary
    #[error("failed: {stage} - panic: {message}")]
    Panicked {
        stage: String,
        message: String,
        backtrace: String,
    },
}

impl PipelineError {
    /// Name of the stage that failed
    pub fn stage(&self) -> &str {
        match self {
            PipelineError::Scan { stage, .. } => stage,
            PipelineError::Panicked { stage, .. } => stage,
        }
    }
}
