//! Configuration: a YAML file with environment overrides.
//!
//! ```yaml
//! tempest:
//!   scheme: wss
//!   host: ws.weatherflow.com
//!   path: /swd/data
//!   token: "..."
//!   device_id: 12345
//!   listen_group: listen_start
//! server:
//!   bind: 127.0.0.1
//!   port: 8080
//!   history_size: 720
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::DEFAULT_BASE_URL;
use crate::tempest::{EnvelopePolicy, ListenGroup};

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

const ENV_SCHEME: &str = "WEATHERSTATION_TEMPEST_SCHEME";
const ENV_HOST: &str = "WEATHERSTATION_TEMPEST_HOST";
const ENV_PATH: &str = "WEATHERSTATION_TEMPEST_PATH";
const ENV_TOKEN: &str = "WEATHERSTATION_TEMPEST_TOKEN";
const ENV_DEVICE_ID: &str = "WEATHERSTATION_TEMPEST_DEVICE_ID";
const ENV_LISTEN_GROUP: &str = "WEATHERSTATION_TEMPEST_LISTEN_GROUP";
const ENV_SERVER_PORT: &str = "WEATHERSTATION_SERVER_PORT";
const ENV_SERVER_BIND: &str = "WEATHERSTATION_SERVER_BIND";

const SUPPORTED_SCHEMES: [&str; 3] = ["wss", "ws", "udp"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Connection to the Tempest device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempestConfig {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub token: String,
    #[serde(alias = "deviceID")]
    pub device_id: i64,
    pub listen_group: ListenGroup,
    /// Reconnect when nothing arrives for this long
    pub read_timeout_secs: Option<u64>,
    /// Keep listening past messages without a valid envelope
    pub skip_malformed_messages: bool,
}

impl Default for TempestConfig {
    fn default() -> Self {
        Self {
            scheme: "wss".to_string(),
            host: "ws.weatherflow.com".to_string(),
            path: "/swd/data".to_string(),
            token: String::new(),
            device_id: 0,
            listen_group: ListenGroup::default(),
            read_timeout_secs: None,
            skip_malformed_messages: false,
        }
    }
}

impl TempestConfig {
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_secs.map(Duration::from_secs)
    }

    pub fn envelope_policy(&self) -> EnvelopePolicy {
        if self.skip_malformed_messages {
            EnvelopePolicy::Skip
        } else {
            EnvelopePolicy::Strict
        }
    }
}

/// Dashboard HTTP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Observations kept for the history chart
    pub history_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
            history_size: 720,
        }
    }
}

/// Tempest REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Fetch the latest observation over REST before the first live one arrives
    pub seed_on_start: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            seed_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tempest: TempestConfig,
    pub server: ServerConfig,
    pub api: ApiConfig,
}

/// Load configuration from a YAML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration from a file, or use defaults if it doesn't exist.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    if !path.exists() {
        log::info!("Config file not found, using defaults: {}", path.display());
        return Ok(Config::default());
    }

    load_config(path)
}

pub fn parse_config(yaml: &str) -> Result<Config, serde_yaml::Error> {
    // An empty file is a valid, default config
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(yaml)
}

/// Per-user config file, e.g. `~/.config/weatherstation/config.yaml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("weatherstation").join(DEFAULT_CONFIG_FILE))
}

impl Config {
    /// Resolve the configuration for a command.
    ///
    /// An explicit `path` must exist. Without one, `./config.yaml` and then
    /// the per-user file are tried before falling back to defaults. The
    /// process environment is applied on top and the result validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => load_config(path)?,
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                match user_config_path() {
                    Some(user) if !local.exists() && user.exists() => load_config(user)?,
                    _ => load_config_or_default(local)?,
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `WEATHERSTATION_*` variables found by `lookup`.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let tempest = &mut self.tempest;
        if let Some(v) = lookup(ENV_SCHEME) {
            tempest.scheme = v;
        }
        if let Some(v) = lookup(ENV_HOST) {
            tempest.host = v;
        }
        if let Some(v) = lookup(ENV_PATH) {
            tempest.path = v;
        }
        if let Some(v) = lookup(ENV_TOKEN) {
            tempest.token = v;
        }
        if let Some(v) = lookup(ENV_DEVICE_ID) {
            match v.trim().parse() {
                Ok(id) => tempest.device_id = id,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", ENV_DEVICE_ID, v, e),
            }
        }
        if let Some(v) = lookup(ENV_LISTEN_GROUP) {
            match v.trim().parse() {
                Ok(group) => tempest.listen_group = group,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", ENV_LISTEN_GROUP, v, e),
            }
        }

        let server = &mut self.server;
        if let Some(v) = lookup(ENV_SERVER_PORT) {
            match v.trim().parse() {
                Ok(port) => server.port = port,
                Err(e) => log::warn!("Ignoring {}={:?}: {}", ENV_SERVER_PORT, v, e),
            }
        }
        if let Some(v) = lookup(ENV_SERVER_BIND) {
            server.bind = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tempest.host.trim().is_empty() {
            return Err(ConfigError::Invalid("tempest.host must not be empty".into()));
        }
        let scheme = self.tempest.scheme.to_ascii_lowercase();
        if !SUPPORTED_SCHEMES.contains(&scheme.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "tempest.scheme must be one of {}, got {:?}",
                SUPPORTED_SCHEMES.join(", "),
                self.tempest.scheme
            )));
        }
        if self.server.history_size == 0 {
            return Err(ConfigError::Invalid(
                "server.history_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
