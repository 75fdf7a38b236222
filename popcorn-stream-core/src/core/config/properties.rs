use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_more::Display;
use log::{debug, trace, warn};
use serde::Deserialize;

use crate::core::config::{Error, Result};

const DEFAULT_HOST: fn() -> String = || "0.0.0.0".to_string();
const DEFAULT_PORT: fn() -> u16 = || 0;
const DEFAULT_RESOLVE_TIMEOUT_SECONDS: fn() -> u64 = || 120;
const DEFAULT_SWEEP_INTERVAL_SECONDS: fn() -> u64 = || 3600;
const DEFAULT_IDLE_THRESHOLD_SECONDS: fn() -> u64 = || 3 * 3600;
const DEFAULT_STORAGE_PATH: fn() -> PathBuf = || env::temp_dir().join("popcorn-stream");

const DEFAULT_CONFIG_FILENAME: &str = "application";
const CONFIG_EXTENSIONS: [&str; 2] = ["yml", "yaml"];

/// In-between wrapper for serde which holds the `stream` root key.
#[derive(Debug, Clone, Deserialize, PartialEq)]
struct PropertiesWrapper {
    #[serde(default)]
    pub stream: StreamProperties,
}

/// The static properties of the stream application.
#[derive(Debug, Display, Clone, Deserialize, PartialEq)]
#[display(
    "host: {}, port: {}, resolve_timeout: {}s, sweep_interval: {}s, idle_threshold: {}s, storage_path: {:?}",
    host,
    port,
    resolve_timeout_seconds,
    sweep_interval_seconds,
    idle_threshold_seconds,
    storage_path
)]
pub struct StreamProperties {
    /// The address the stream server binds to.
    #[serde(default = "DEFAULT_HOST")]
    pub host: String,
    /// The port of the stream server, `0` lets the OS assign one.
    #[serde(default = "DEFAULT_PORT")]
    pub port: u16,
    /// The max time the torrent engine gets to resolve a torrent source.
    #[serde(alias = "resolve-timeout-seconds")]
    #[serde(default = "DEFAULT_RESOLVE_TIMEOUT_SECONDS")]
    pub resolve_timeout_seconds: u64,
    /// The interval between idle torrent sweeps.
    #[serde(alias = "sweep-interval-seconds")]
    #[serde(default = "DEFAULT_SWEEP_INTERVAL_SECONDS")]
    pub sweep_interval_seconds: u64,
    /// The inactivity after which a torrent is evicted.
    #[serde(alias = "idle-threshold-seconds")]
    #[serde(default = "DEFAULT_IDLE_THRESHOLD_SECONDS")]
    pub idle_threshold_seconds: u64,
    /// The directory in which the torrent engine stores the downloaded torrent data.
    #[serde(alias = "storage-path")]
    #[serde(default = "DEFAULT_STORAGE_PATH")]
    pub storage_path: PathBuf,
    /// The log level overrides per package.
    #[serde(default)]
    pub loggers: HashMap<String, String>,
}

impl StreamProperties {
    /// Create new properties which will look for the [DEFAULT_CONFIG_FILENAME] config file
    /// within the current working directory.
    /// It will parse the config file if found, else uses the defaults instead.
    pub fn new_auto() -> Self {
        match Self::find_existing_file(DEFAULT_CONFIG_FILENAME) {
            None => Self::default(),
            Some(path) => Self::from_path(&path).unwrap_or_else(|e| {
                warn!("Failed to load config {:?}, {}", path, e);
                Self::default()
            }),
        }
    }

    /// Load the properties from the given config file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config file {:?}", path);
        let data = fs::read_to_string(path)?;

        Self::parse(data.as_str())
    }

    /// Parse the given config data.
    /// Invalid data results in the defaults being used.
    pub fn from_str(data: &str) -> Self {
        Self::parse(data).unwrap_or_else(|e| {
            warn!("Failed to parse config, {}, using defaults instead", e);
            Self::default()
        })
    }

    /// The max time the torrent engine gets to resolve a torrent source.
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_seconds)
    }

    /// The interval between idle torrent sweeps.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// The inactivity after which a torrent is evicted.
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_secs(self.idle_threshold_seconds)
    }

    fn parse(data: &str) -> Result<Self> {
        trace!("Parsing config data {}", data);
        if data.trim().is_empty() {
            return Ok(Self::default());
        }

        let wrapper: PropertiesWrapper =
            serde_yaml::from_str(data).map_err(|e| Error::Parse(e.to_string()))?;
        debug!("Parsed config data {:?}", &wrapper);
        Ok(wrapper.stream)
    }

    fn find_existing_file(filename: &str) -> Option<PathBuf> {
        let directory = env::current_dir().ok()?;

        for extension in CONFIG_EXTENSIONS {
            let path = directory.join(format!("{}.{}", filename, extension));
            if path.is_file() {
                debug!("Found config file {:?}", path);
                return Some(path);
            }

            trace!("Config file location {:?} doesn't exist", path);
        }

        None
    }
}

impl Default for StreamProperties {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST(),
            port: DEFAULT_PORT(),
            resolve_timeout_seconds: DEFAULT_RESOLVE_TIMEOUT_SECONDS(),
            sweep_interval_seconds: DEFAULT_SWEEP_INTERVAL_SECONDS(),
            idle_threshold_seconds: DEFAULT_IDLE_THRESHOLD_SECONDS(),
            storage_path: DEFAULT_STORAGE_PATH(),
            loggers: Default::default(),
        }
    }
}
