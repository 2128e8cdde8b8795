//! # PXM Common Library
//!
//! Shared code for the PXM photo index services including:
//! - Database initialization and settings access
//! - Event types (PxmEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Text clipping and slug normalization
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod text;
pub mod time;

pub use error::{Error, Result};
pub use events::{EventBus, PxmEvent};
