//! Database initialization, schema and settings access

pub mod init;
pub mod settings;

pub use init::*;
pub use settings::{get_setting, set_setting};
