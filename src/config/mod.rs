//! Source configuration.
//!
//! Everything is an explicit struct handed to the constructor; no hidden
//! process-wide state. Besides literal construction, [`SourceConfig::load`]
//! merges an optional TOML file with `CONF_MIRROR_`-prefixed environment
//! variables (highest priority).

use std::time::Duration;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONFIG_NODE;
use crate::constants::DEFAULT_CONNECT_TIMEOUT_MS;
use crate::constants::DEFAULT_ROOT_PATH;
use crate::constants::DEFAULT_SESSION_TIMEOUT_MS;
use crate::constants::ENV_PREFIX;
use crate::Error;
use crate::Result;


/// Connection and watch parameters of a [`crate::WatchedConfigSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Backend connect address, e.g. `127.0.0.1:2181`. Required.
    #[serde(default)]
    pub address: String,

    /// Backend session timeout.
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /// How long construction waits for a first connection.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Root of the watched subtree. A bare (non-absolute) value `r` watches
    /// `/r/config` instead.
    #[serde(default = "default_root_path")]
    pub root_path: String,

    /// Whether a failed first connection is fatal. When false (the
    /// default) the source logs a warning and proceeds disconnected,
    /// leaving reconnection to the backend client.
    #[serde(default)]
    pub strict_connect: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            session_timeout_ms: default_session_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            root_path: default_root_path(),
            strict_connect: false,
        }
    }
}

impl SourceConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Loads configuration from an optional TOML file, overridden by
    /// `CONF_MIRROR_`-prefixed environment variables, and validates the
    /// result.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: SourceConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validates construction-time invariants. Violations are fatal and
    /// never retried.
    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "address is empty; must specify the backend to connect to".into(),
            )));
        }
        if self.root_path.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "root_path must not be empty".into(),
            )));
        }
        if self.root_path.contains("//")
            || self.root_path.ends_with('/')
            || self.root_path.chars().any(char::is_whitespace)
        {
            return Err(Error::Config(ConfigError::Message(format!(
                "malformed root_path: {}",
                self.root_path
            ))));
        }
        if self.session_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "session_timeout_ms must be at least 1ms".into(),
            )));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "connect_timeout_ms must be at least 1ms".into(),
            )));
        }
        Ok(())
    }

    /// The path actually watched: `root_path` as-is when absolute,
    /// otherwise `/{root_path}/config`.
    pub fn watch_root(&self) -> String {
        if self.root_path.starts_with('/') {
            self.root_path.clone()
        } else {
            format!("/{}/{}", self.root_path, CONFIG_NODE)
        }
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn default_session_timeout_ms() -> u64 {
    DEFAULT_SESSION_TIMEOUT_MS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_root_path() -> String {
    DEFAULT_ROOT_PATH.to_string()
}
