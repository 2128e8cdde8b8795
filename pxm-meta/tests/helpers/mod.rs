//! Test Helper Utilities
//!
//! Shared utilities for testing pxm-meta

pub mod db_utils;

pub use db_utils::{add_photo, count_rows, create_test_db, quiet_settings, PhotoSpec};
