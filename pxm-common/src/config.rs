//! Bootstrap configuration loading and root folder resolution
//!
//! Only bootstrap concerns live here (where the database is, how loud the
//! logs are, how often a service wakes up). Runtime tuning is stored in the
//! database `settings` table and loaded by each service.
//!
//! # Root folder priority
//! 1. Command-line argument (handled by the caller, passed to `resolve_with`)
//! 2. `PXM_ROOT_FOLDER` environment variable
//! 3. `root_folder` in the TOML config file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "PXM_ROOT_FOLDER";

/// Environment variable pointing at an explicit TOML config file
pub const CONFIG_FILE_ENV: &str = "PXM_CONFIG";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "pxm.db";

/// Bootstrap configuration loaded from a TOML file
///
/// These settings cannot change during runtime.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Root folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Explicit database path; overrides `<root_folder>/pxm.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Seconds between scheduled maintenance runs
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Locate and load the config file for `module_name`.
    ///
    /// A missing file is not an error: a warning is logged and defaults are used.
    /// A file that exists but does not parse is an error.
    pub fn load_or_default(module_name: &str, cli_path: Option<&Path>) -> Result<Self> {
        match locate_config_file(module_name, cli_path) {
            Some(path) => {
                let config = Self::load(&path)?;
                info!("Loaded config file: {}", path.display());
                Ok(config)
            }
            None => {
                warn!("No config file found for {}, using built-in defaults", module_name);
                Ok(Self::default())
            }
        }
    }
}

/// Find the TOML config file: explicit path, then `PXM_CONFIG`, then
/// `<config_dir>/pxm/<module_name>.toml`, then `/etc/pxm/<module_name>.toml`.
pub fn locate_config_file(module_name: &str, cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let file_name = format!("{}.toml", module_name);
    let user_config = dirs::config_dir().map(|d| d.join("pxm").join(&file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/pxm").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub interval_secs: u64,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: default_log_level(),
            interval_secs: 900,
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("pxm"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/pxm"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("pxm"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/pxm"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("pxm"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\pxm"))
    } else {
        PathBuf::from("./pxm_data")
    }
}

/// Resolves the root folder following the documented priority order
#[derive(Debug, Clone)]
pub struct RootFolderResolver<'a> {
    module_name: String,
    toml: Option<&'a TomlConfig>,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            toml: None,
        }
    }

    /// Consult `config.root_folder` before falling back to compiled defaults
    pub fn with_toml(mut self, config: &'a TomlConfig) -> Self {
        self.toml = Some(config);
        self
    }

    /// Resolve without a command-line override
    pub fn resolve(&self) -> PathBuf {
        self.resolve_with(None)
    }

    /// Resolve, giving `cli_arg` the highest priority
    pub fn resolve_with(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = self.toml.and_then(|c| c.root_folder.clone()) {
            return path;
        }

        let fallback = CompiledDefaults::for_current_platform().root_folder;
        info!(
            "{}: using default root folder {}",
            self.module_name,
            fallback.display()
        );
        fallback
    }
}

/// Creates the root folder and derives file locations inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
            info!("Created root folder: {}", self.root.display());
        }
        Ok(())
    }

    /// Path of the database file inside the root folder
    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    /// Whether the database file already exists
    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}

/// Database path: explicit CLI path, then TOML `database_path`, then
/// `<root_folder>/pxm.db`.
pub fn resolve_database_path(
    cli_database: Option<&Path>,
    toml: &TomlConfig,
    root_folder: &Path,
) -> PathBuf {
    if let Some(path) = cli_database {
        return path.to_path_buf();
    }

    if let Some(path) = &toml.database_path {
        return path.clone();
    }

    RootFolderInitializer::new(root_folder.to_path_buf()).database_path()
}
