//! Configuration resolution for audix-ml
//!
//! Each setting resolves with Command line → Environment → TOML → compiled default
//! priority. clap folds the environment into the command-line values; the root folder
//! goes through `audix_common::config::resolve_root_folder`.

use audix_common::config::{resolve_root_folder, LoggingConfig, ModelsConfig, TomlConfig};
use audix_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::workflow::MAX_BATCH_ITEMS;

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "AUDIX_ROOT_FOLDER";

/// Default log filter when neither `RUST_LOG` nor the TOML level is usable
pub const DEFAULT_LOG_FILTER: &str = "audix_ml=info,tower_http=info";

/// Values supplied on the command line (or their environment fallbacks)
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub separator_url: Option<String>,
    pub classifier_url: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub database_path: PathBuf,
    /// Directory where uploads are staged while decoding
    pub staging_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub models: ModelsConfig,
    pub sample_rate: u32,
    pub batch_concurrency: usize,
}

impl ServiceConfig {
    pub fn resolve(cli: &CliOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let root_folder = resolve_root_folder(cli.root_folder.as_deref(), ROOT_FOLDER_ENV, toml_config);

        let host = pick("host", cli.host.clone(), toml_config.server.host.clone());
        let port = pick("port", cli.port, toml_config.server.port);

        let mut models = toml_config.models.clone();
        models.separator_url = pick("separator_url", cli.separator_url.clone(), models.separator_url);
        models.classifier_url = pick("classifier_url", cli.classifier_url.clone(), models.classifier_url);

        for (name, url) in [
            ("separator_url", &models.separator_url),
            ("classifier_url", &models.classifier_url),
        ] {
            if !is_valid_url(url) {
                return Err(Error::Config(format!("{} is not a valid http(s) URL: '{}'", name, url)));
            }
        }
        if models.request_timeout_secs == 0 {
            return Err(Error::Config("models.request_timeout_secs must be at least 1".to_string()));
        }

        let sample_rate = toml_config.pipeline.sample_rate;
        if sample_rate == 0 {
            return Err(Error::Config("pipeline.sample_rate must be positive".to_string()));
        }

        let mut batch_concurrency = toml_config.pipeline.batch_concurrency;
        if !(1..=MAX_BATCH_ITEMS).contains(&batch_concurrency) {
            let clamped = batch_concurrency.clamp(1, MAX_BATCH_ITEMS);
            warn!(
                "pipeline.batch_concurrency {} out of range, using {}",
                batch_concurrency, clamped
            );
            batch_concurrency = clamped;
        }

        Ok(Self {
            database_path: TomlConfig::database_path(&root_folder),
            staging_dir: staging_dir(&root_folder),
            root_folder,
            host,
            port,
            models,
            sample_rate,
            batch_concurrency,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.models.request_timeout_secs)
    }
}

/// Filter directive for the `[logging]` section, used when `RUST_LOG` is unset
pub fn log_filter(logging: &LoggingConfig) -> String {
    let level = logging.level.trim();
    if level.is_empty() {
        DEFAULT_LOG_FILTER.to_string()
    } else {
        level.to_string()
    }
}

fn staging_dir(root_folder: &Path) -> PathBuf {
    root_folder.join("staging")
}

/// Command-line value if given, otherwise the TOML/default value
fn pick<T: std::fmt::Debug>(name: &str, cli: Option<T>, fallback: T) -> T {
    match cli {
        Some(value) => {
            info!("{} = {:?} (command line / environment)", name, value);
            value
        }
        None => fallback,
    }
}

/// Accept absolute http(s) URLs only
pub fn is_valid_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}
