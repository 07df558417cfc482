//! Bootstrap configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`BOUQUET_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is not an error: defaults are used and startup
//! continues. A config file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "BOUQUET_ROOT_FOLDER";

/// Environment variable pointing at an explicit config file
pub const CONFIG_FILE_ENV: &str = "BOUQUET_CONFIG";

/// Directory name used under the platform config/data directories
pub const APP_DIR_NAME: &str = "bouquet-feedback";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Root folder holding the local database and default export directory
    pub root_folder: Option<PathBuf>,

    /// Locale for rating labels (`en` or `pl`)
    pub locale: Option<String>,

    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub relay: RelayConfig,
    pub export: ExportConfig,
    pub server: ServerConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: CompiledDefaults::for_current_platform().log_level,
        }
    }
}

/// Local history storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file name, relative to the root folder
    pub database_file: String,

    /// The single key holding the serialized feedback history
    pub history_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: "bouquet-feedback.db".to_string(),
            history_key: "clientFeedback".to_string(),
        }
    }
}

/// How the pipeline waits on the remote relay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// Relay is awaited (bounded by the timeout); its outcome is reported
    #[default]
    Awaited,
    /// Relay runs on a spawned task; its outcome is only logged
    Detached,
}

/// Field layout of the relayed payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadLayout {
    /// Canonical camelCase record fields
    #[default]
    Canonical,
    /// Spreadsheet columns used by the Polish form variant
    Sheet,
}

/// Remote collector configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Collector URL; relay is skipped when unset
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
    pub mode: RelayMode,
    pub payload: PayloadLayout,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: 10,
            mode: RelayMode::default(),
            payload: PayloadLayout::default(),
        }
    }
}

/// CSV export configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving exported files (default: `<root>/exports`)
    pub directory: Option<PathBuf>,

    /// File name prefix; the date and `.csv` are appended
    pub filename_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: None,
            filename_prefix: "feedback".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5730,
        }
    }
}

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("./bouquet_data"));

        Self {
            root_folder,
            log_level: "info".to_string(),
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Locate the config file: explicit path → `BOUQUET_CONFIG` → platform config dir
///
/// Explicit paths are returned even when they do not exist, so the caller
/// reports them; the platform default is only returned if present.
pub fn config_file_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR_NAME).join("config.toml"))
        .filter(|p| p.exists())
}

/// Load bootstrap configuration with graceful degradation
///
/// No config file found → defaults. A named file that is missing or invalid
/// → error. Runs before logging is initialized, so callers report which
/// source was used (see [`config_file_path`]).
pub fn load_config(cli_path: Option<&Path>) -> Result<TomlConfig> {
    match config_file_path(cli_path) {
        Some(path) => load_toml_config(&path),
        None => Ok(TomlConfig::default()),
    }
}

/// Resolves the root folder using the documented priority order
pub struct RootFolderResolver<'a> {
    config: &'a TomlConfig,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new(config: &'a TomlConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.config.root_folder {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout on first run
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root folder if missing (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
            info!("Created root folder: {}", self.root.display());
        }
        Ok(())
    }

    pub fn database_path(&self, storage: &StorageConfig) -> PathBuf {
        self.root.join(&storage.database_file)
    }

    /// Configured export directory, or `<root>/exports`
    pub fn export_dir(&self, export: &ExportConfig) -> PathBuf {
        export
            .directory
            .clone()
            .unwrap_or_else(|| self.root.join("exports"))
    }
}
