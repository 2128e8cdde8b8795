//! Named exclusive task guards
//!
//! A [`TaskRegistry`] hands out [`TaskGuard`] handles by name. All handles
//! for one name share state, so at most one [`ActiveTask`] exists per name at
//! any time. Distinct names are independent.
//!
//! Cancellation may be requested whether or not the task is running. A
//! request made before `start` is observed by the next run; `stop` clears it.

use crate::error::GuardError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct GuardState {
    active: AtomicBool,
    canceled: AtomicBool,
}

/// Shared handle to one named guard
#[derive(Debug, Clone)]
pub struct TaskGuard {
    name: Arc<str>,
    state: Arc<GuardState>,
}

impl TaskGuard {
    fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::new(GuardState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Acquire the guard
    ///
    /// Fails with [`GuardError::AlreadyRunning`] while another [`ActiveTask`]
    /// for this name is alive. The returned handle releases on drop.
    pub fn start(&self) -> Result<ActiveTask, GuardError> {
        self.state
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| GuardError::AlreadyRunning(self.name.to_string()))?;

        debug!(task = %self.name, "Task guard acquired");
        Ok(ActiveTask {
            guard: self.clone(),
            released: false,
        })
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        debug!(task = %self.name, "Cancellation requested");
        self.state.canceled.store(true, Ordering::Release);
    }

    pub fn canceled(&self) -> bool {
        self.state.canceled.load(Ordering::Acquire)
    }

    pub fn running(&self) -> bool {
        self.state.active.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.state.canceled.store(false, Ordering::Release);
        self.state.active.store(false, Ordering::Release);
        debug!(task = %self.name, "Task guard released");
    }
}

/// Proof of holding a guard; releasing it is `stop()` or drop
#[derive(Debug)]
pub struct ActiveTask {
    guard: TaskGuard,
    released: bool,
}

impl ActiveTask {
    pub fn guard(&self) -> &TaskGuard {
        &self.guard
    }

    /// Release the guard now
    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.guard.release();
        }
    }
}

impl Drop for ActiveTask {
    fn drop(&mut self) {
        self.release();
    }
}

/// Registry of named guards
///
/// Clone it to share; every clone sees the same guards.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    guards: Arc<Mutex<HashMap<String, TaskGuard>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the guard called `name`, created on first use
    pub fn guard(&self, name: &str) -> TaskGuard {
        // The map is only ever inserted into, so a poisoned lock is still usable
        let mut guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
        guards
            .entry(name.to_string())
            .or_insert_with(|| TaskGuard::new(name))
            .clone()
    }
}
