//! Bootstrap configuration loading and root folder resolution
//!
//! Configuration is read once at startup. Sources, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name looked up in the platform config directories
pub const CONFIG_FILE_NAME: &str = "audix-ml.toml";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "audix.db";

/// Bootstrap configuration loaded from TOML file
///
/// Every section is optional; missing values fall back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the service database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server binding
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Model-serving endpoints for separation and classification
    #[serde(default)]
    pub models: ModelsConfig,

    /// Pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Model-serving sidecar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Base URL of the stem separation service
    #[serde(default = "default_separator_url")]
    pub separator_url: String,

    /// Base URL of the per-component classification service
    #[serde(default = "default_classifier_url")]
    pub classifier_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            separator_url: default_separator_url(),
            classifier_url: default_classifier_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Sample rate every accepted recording must have (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Number of batch items analysed concurrently
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            batch_concurrency: default_batch_concurrency(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_separator_url() -> String {
    "http://127.0.0.1:8100".to_string()
}

fn default_classifier_url() -> String {
    "http://127.0.0.1:8101".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_batch_concurrency() -> usize {
    4
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the platform config locations are
    /// searched and built-in defaults are used when no file is found.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit_path)? {
            Some(path) => Self::load_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Find the config file to read, if any
    ///
    /// Runs before logging is set up, so it reports through its return value only.
    pub fn locate(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
        match explicit_path {
            Some(path) if !path.exists() => Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            ))),
            Some(path) => Ok(Some(path.to_path_buf())),
            None => Ok(find_config_file()),
        }
    }

    /// Read and parse one config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Path of the service database inside the resolved root folder
    pub fn database_path(root_folder: &Path) -> PathBuf {
        root_folder.join(DATABASE_FILE_NAME)
    }
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config value
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        tracing::info!(path = %path.display(), "Root folder from command line");
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            tracing::info!(path = %path, "Root folder from {}", env_var_name);
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        tracing::info!(path = %path.display(), "Root folder from config file");
        return path.clone();
    }

    let path = get_default_root_folder();
    tracing::info!(path = %path.display(), "Root folder from compiled default");
    path
}

/// Look for the config file in the platform locations
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("audix").join(CONFIG_FILE_NAME));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/audix").join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/audix (or /var/lib/audix for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("audix"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/audix"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("audix"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/audix"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("audix"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\audix"))
    } else {
        PathBuf::from("./audix_data")
    }
}
