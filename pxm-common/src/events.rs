//! Event types for the PXM event system
//!
//! Provides shared event definitions and the EventBus used as the
//! fire-and-forget notification sink of every PXM service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// PXM event types
///
/// Events are broadcast via EventBus and can be serialized for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PxmEvent {
    /// Reference entities were created (e.g. kind "lenses")
    EntitiesCreated {
        kind: String,
        names: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// An aggregate counter changed (e.g. metric "count.lenses")
    CountChanged {
        metric: String,
        delta: i64,
        timestamp: DateTime<Utc>,
    },

    /// Photos were absorbed into another photo's stack
    PhotosMerged {
        photo_uid: String,
        merged_uids: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A maintenance run acquired its guard and started
    MaintenanceStarted {
        task: String,
        timestamp: DateTime<Utc>,
    },

    /// A maintenance run was skipped because another run is active
    MaintenanceSkipped {
        task: String,
        timestamp: DateTime<Utc>,
    },

    /// A maintenance run finished all stages
    MaintenanceCompleted {
        task: String,
        optimized: usize,
        failed_stages: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A maintenance run stopped after a cancellation request
    MaintenanceCanceled {
        task: String,
        timestamp: DateTime<Utc>,
    },

    /// A maintenance run aborted with an error
    MaintenanceFailed {
        task: String,
        stage: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl PxmEvent {
    /// Get event type as string
    pub fn event_type(&self) -> &str {
        match self {
            PxmEvent::EntitiesCreated { .. } => "EntitiesCreated",
            PxmEvent::CountChanged { .. } => "CountChanged",
            PxmEvent::PhotosMerged { .. } => "PhotosMerged",
            PxmEvent::MaintenanceStarted { .. } => "MaintenanceStarted",
            PxmEvent::MaintenanceSkipped { .. } => "MaintenanceSkipped",
            PxmEvent::MaintenanceCompleted { .. } => "MaintenanceCompleted",
            PxmEvent::MaintenanceCanceled { .. } => "MaintenanceCanceled",
            PxmEvent::MaintenanceFailed { .. } => "MaintenanceFailed",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use pxm_common::events::{EventBus, PxmEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PxmEvent::CountChanged {
///     metric: "count.lenses".to_string(),
///     delta: 1,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert_eq!(rx.try_recv().unwrap().event_type(), "CountChanged");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PxmEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PxmEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: PxmEvent) -> Result<usize, broadcast::error::SendError<PxmEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PxmEvent) {
        let _ = self.tx.send(event);
    }

    /// Publish a creation notification for reference entities of `kind`
    pub fn publish_created(&self, kind: &str, names: Vec<String>) {
        self.emit_lossy(PxmEvent::EntitiesCreated {
            kind: kind.to_string(),
            names,
            timestamp: Utc::now(),
        });
    }

    /// Publish a counter delta for `metric`
    pub fn publish_count(&self, metric: &str, delta: i64) {
        self.emit_lossy(PxmEvent::CountChanged {
            metric: metric.to_string(),
            delta,
            timestamp: Utc::now(),
        });
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
