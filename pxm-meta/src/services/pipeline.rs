//! Maintenance pipeline
//!
//! One run: acquire the task guard, scan and optimize photos, then run the
//! remaining stages in order. A failing stage is logged and recorded, and
//! later stages still run. Only cancellation, a failed page fetch, or a
//! panic end the run early. The guard is released on every path.

use crate::error::{PipelineError, ScanError};
use crate::models::{Photo, PhotoFilter};
use crate::services::scanner::{ItemTransform, PageScanner, PageSource, ScanReport};
use crate::services::stages::MaintenanceStage;
use crate::services::task_guard::TaskGuard;
use chrono::Utc;
use futures::FutureExt;
use pxm_common::events::{EventBus, PxmEvent};
use serde::Serialize;
use std::backtrace::Backtrace;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Name of the scan stage in reports
pub const OPTIMIZE_STAGE: &str = "optimize";

/// A stage that returned an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: &'static str,
    pub cause: String,
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub scan: ScanReport,
    pub stage_failures: Vec<StageFailure>,
    pub disabled_stages: Vec<&'static str>,
}

impl PipelineReport {
    /// Photos changed by the optimize scan
    pub fn optimized(&self) -> usize {
        self.scan.changed
    }
}

/// How a run ended, when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Another run held the guard; nothing was done
    Skipped,
    Completed(PipelineReport),
    Canceled,
}

impl fmt::Display for PipelineOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineOutcome::Skipped => write!(f, "skipped: already running"),
            PipelineOutcome::Canceled => write!(f, "canceled"),
            PipelineOutcome::Completed(report) => {
                write!(f, "completed: {} items optimized", report.optimized())?;
                for failure in &report.stage_failures {
                    write!(f, "; failed: {} - {}", failure.stage, failure.cause)?;
                }
                Ok(())
            }
        }
    }
}

/// Scan plus downstream stages under one task guard
pub struct MaintenancePipeline {
    guard: TaskGuard,
    scanner: PageScanner,
    source: Arc<dyn PageSource<PhotoFilter, Item = Photo>>,
    transform: Arc<dyn ItemTransform<Photo>>,
    stages: Vec<Arc<dyn MaintenanceStage>>,
    stale_delay: Duration,
    events: EventBus,
}

impl MaintenancePipeline {
    pub fn new(
        guard: TaskGuard,
        scanner: PageScanner,
        source: Arc<dyn PageSource<PhotoFilter, Item = Photo>>,
        transform: Arc<dyn ItemTransform<Photo>>,
        stages: Vec<Arc<dyn MaintenanceStage>>,
        stale_delay: Duration,
        events: EventBus,
    ) -> Self {
        Self {
            guard,
            scanner,
            source,
            transform,
            stages,
            stale_delay,
            events,
        }
    }

    pub fn guard(&self) -> &TaskGuard {
        &self.guard
    }

    /// Execute one run
    pub async fn run(&self) -> Result<PipelineOutcome, PipelineError> {
        let task = self.guard.name().to_string();

        let active = match self.guard.start() {
            Ok(active) => active,
            Err(e) => {
                debug!("Skipping run: {}", e);
                self.events.emit_lossy(PxmEvent::MaintenanceSkipped {
                    task,
                    timestamp: Utc::now(),
                });
                return Ok(PipelineOutcome::Skipped);
            }
        };

        self.events.emit_lossy(PxmEvent::MaintenanceStarted {
            task: task.clone(),
            timestamp: Utc::now(),
        });

        let started = Instant::now();
        let mut stage = OPTIMIZE_STAGE;
        let caught = AssertUnwindSafe(self.run_stages(&mut stage)).catch_unwind().await;

        let result = match caught {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                let backtrace = Backtrace::force_capture().to_string();
                error!(stage, "Maintenance panicked: {}\n{}", message, backtrace);
                Err(PipelineError::Panicked {
                    stage: stage.to_string(),
                    message,
                    backtrace,
                })
            }
        };

        active.stop();

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(PipelineOutcome::Completed(report)) => {
                info!(elapsed_ms, "Maintenance {}", PipelineOutcome::Completed(report.clone()));
                self.events.emit_lossy(PxmEvent::MaintenanceCompleted {
                    task,
                    optimized: report.optimized(),
                    failed_stages: report.stage_failures.iter().map(|f| f.stage.to_string()).collect(),
                    timestamp: Utc::now(),
                });
            }
            Ok(PipelineOutcome::Canceled) => {
                info!(elapsed_ms, "Maintenance canceled");
                self.events.emit_lossy(PxmEvent::MaintenanceCanceled {
                    task,
                    timestamp: Utc::now(),
                });
            }
            Ok(PipelineOutcome::Skipped) => {}
            Err(e) => {
                error!(elapsed_ms, "Maintenance {}", e);
                self.events.emit_lossy(PxmEvent::MaintenanceFailed {
                    task,
                    stage: e.stage().to_string(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        result
    }

    async fn run_stages(&self, stage: &mut &'static str) -> Result<PipelineOutcome, PipelineError> {
        *stage = OPTIMIZE_STAGE;
        let filter = PhotoFilter::needs_optimization(pxm_common::time::now_unix(), self.stale_delay);

        let scan = match self
            .scanner
            .run(self.source.as_ref(), &filter, self.transform.as_ref(), &self.guard)
            .await
        {
            Ok(scan) => scan,
            Err(ScanError::Canceled) => return Ok(PipelineOutcome::Canceled),
            Err(source) => {
                return Err(PipelineError::Scan {
                    stage: OPTIMIZE_STAGE,
                    source,
                })
            }
        };

        let mut report = PipelineReport {
            scan,
            ..Default::default()
        };

        for next in &self.stages {
            if self.guard.canceled() {
                return Ok(PipelineOutcome::Canceled);
            }

            *stage = next.name();
            if next.disabled() {
                debug!(stage = *stage, "Stage disabled");
                report.disabled_stages.push(next.name());
                continue;
            }

            let started = Instant::now();
            match next.start().await {
                Ok(()) => debug!(
                    stage = *stage,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Stage finished"
                ),
                Err(e) => {
                    warn!(stage = *stage, "Stage failed: {:#}", e);
                    report.stage_failures.push(StageFailure {
                        stage: next.name(),
                        cause: format!("{:#}", e),
                    });
                }
            }
        }

        Ok(PipelineOutcome::Completed(report))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
