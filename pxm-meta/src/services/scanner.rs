//! Paginated maintenance scanner
//!
//! Walks a filtered collection page by page while the collection may change
//! underneath. Offsets advance by the full page size even when items were
//! skipped, so the offset tracks position in the underlying result set. A
//! run-scoped seen-set keeps items from being transformed twice, including
//! items merged away by an earlier transform.
//!
//! Concurrent deletion ahead of the cursor can shift rows across a page
//! boundary and leave an item for the next run. That is accepted.

use crate::error::ScanError;
use crate::services::task_guard::TaskGuard;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, error, info};

/// Anything the scanner can deduplicate
pub trait ScanItem {
    /// Stable identifier, also used for merged-away references
    fn scan_id(&self) -> &str;
}

/// Result of transforming one item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutcome {
    pub changed: bool,
    /// Ids of items absorbed into this one
    pub merged: Vec<String>,
}

impl TransformOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// Per-item transformation
#[async_trait]
pub trait ItemTransform<T>: Send + Sync {
    async fn apply(&self, item: &T) -> anyhow::Result<TransformOutcome>;
}

/// Source of filtered pages
#[async_trait]
pub trait PageSource<F: Sync>: Send + Sync {
    type Item: ScanItem + Send + Sync;

    /// Fetch up to `limit` items at `offset`, ordered by a key the
    /// transform never changes
    async fn fetch_page(&self, filter: &F, offset: usize, limit: usize)
        -> anyhow::Result<Vec<Self::Item>>;
}

/// Pagination settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub page_size: usize,
    pub page_delay: Duration,
}

/// Offset, limit and seen-set of a single run
#[derive(Debug)]
pub struct ScanCursor {
    pub offset: usize,
    pub limit: usize,
    seen: HashSet<String>,
}

impl ScanCursor {
    pub fn new(limit: usize) -> Self {
        Self {
            offset: 0,
            limit: limit.max(1),
            seen: HashSet::new(),
        }
    }

    /// Mark `id` as seen, returning false if it already was
    pub fn mark_seen(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            return false;
        }
        self.seen.insert(id.to_string())
    }

    pub fn is_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn advance(&mut self) {
        self.offset = self.offset.saturating_add(self.limit);
    }
}

/// Counters for a completed run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Page fetches, including the final empty one
    pub pages: usize,
    /// Items handed to the transform
    pub processed: usize,
    /// Items the transform reported as changed
    pub changed: usize,
    /// Items whose transform failed
    pub failed: usize,
    /// Items skipped because they were already seen
    pub skipped: usize,
    /// Items reported as merged away
    pub merged: usize,
}

/// Scanner over any [`PageSource`]
#[derive(Debug, Clone)]
pub struct PageScanner {
    options: ScanOptions,
}

impl PageScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    /// Run until an empty page, polling `guard` for cancellation before each
    /// page, before each item, and after each page
    pub async fn run<F, S, T>(
        &self,
        source: &S,
        filter: &F,
        transform: &T,
        guard: &TaskGuard,
    ) -> Result<ScanReport, ScanError>
    where
        F: Sync,
        S: PageSource<F> + ?Sized,
        T: ItemTransform<S::Item> + ?Sized,
    {
        let mut cursor = ScanCursor::new(self.options.page_size);
        let mut report = ScanReport::default();

        loop {
            if guard.canceled() {
                return Err(ScanError::Canceled);
            }

            let page = source
                .fetch_page(filter, cursor.offset, cursor.limit)
                .await
                .map_err(|source| ScanError::Fetch {
                    offset: cursor.offset,
                    source,
                })?;
            report.pages += 1;

            if page.is_empty() {
                break;
            }

            debug!(offset = cursor.offset, count = page.len(), "Processing page");

            for item in &page {
                if guard.canceled() {
                    return Err(ScanError::Canceled);
                }

                let id = item.scan_id();
                if !cursor.mark_seen(id) {
                    report.skipped += 1;
                    continue;
                }

                report.processed += 1;
                match transform.apply(item).await {
                    Ok(outcome) => {
                        if outcome.changed {
                            report.changed += 1;
                        }
                        for merged in &outcome.merged {
                            debug!(item = %id, merged = %merged, "Marking merged item as seen");
                            cursor.mark_seen(merged);
                            report.merged += 1;
                        }
                    }
                    Err(e) => {
                        error!(item = %id, "Transform failed: {:#}", e);
                        report.failed += 1;
                    }
                }
            }

            cursor.advance();

            if guard.canceled() {
                return Err(ScanError::Canceled);
            }

            if !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }
        }

        if report.changed > 0 {
            info!(
                changed = report.changed,
                failed = report.failed,
                merged = report.merged,
                "Scan finished"
            );
        } else {
            debug!(processed = report.processed, "Scan finished without changes");
        }

        Ok(report)
    }
}
