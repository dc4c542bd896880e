//! Shared configuration for the fibridge binary.
//!
//! Layering: built-in defaults, then `config.toml` at the platform config
//! path, then `FIBRIDGE_*` environment variables. The polling bridge and
//! the local HTTP service both read from here, which is the only coupling
//! between them.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config structs ──────────────────────────────────────────────────

/// Full bridge configuration.
///
/// The password stays a plain field only inside this struct; it leaves as
/// a [`SecretString`] via [`Config::password`] and is never logged.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Vendor account email.
    #[serde(default)]
    pub email: String,

    /// Vendor account password.
    #[serde(default)]
    password: String,

    /// Vendor API root.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// MQTT broker URL (e.g. "mqtt://localhost:1883").
    #[serde(default = "default_broker_url")]
    pub broker_url: String,

    /// Topic the detail snapshot is published to.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Poll interval in milliseconds. Typed as an integer: a non-numeric
    /// value (say `FIBRIDGE_POLL_INTERVAL_MS=abc`) fails extraction at
    /// startup instead of producing a degenerate timer.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bind address for the local HTTP user service.
    #[serde(default = "default_http_bind")]
    pub http_bind: SocketAddr,

    /// HTTP request timeout in seconds for vendor API calls.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            api_base_url: default_api_base_url(),
            broker_url: default_broker_url(),
            topic: default_topic(),
            poll_interval_ms: default_poll_interval_ms(),
            http_bind: default_http_bind(),
            timeout: default_timeout(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.tryfi.com".into()
}
fn default_broker_url() -> String {
    "mqtt://localhost:1883".into()
}
fn default_topic() -> String {
    "tryfi/details".into()
}
fn default_poll_interval_ms() -> u64 {
    60_000
}
fn default_http_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}
fn default_timeout() -> u64 {
    30
}

impl Config {
    /// The account password as a secret.
    pub fn password(&self) -> SecretString {
        SecretString::from(self.password.clone())
    }

    /// The poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The vendor API timeout as a `Duration`.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Validate the invariants that figment's typed extraction can't
    /// express: non-empty credentials, a non-zero interval, and URLs that
    /// actually name a host.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.email.is_empty() {
            return Err(ConfigError::Validation {
                field: "email".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.password.is_empty() {
            return Err(ConfigError::Validation {
                field: "password".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation {
                field: "poll_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let api_url: url::Url =
            self.api_base_url
                .parse()
                .map_err(|_| ConfigError::Validation {
                    field: "api_base_url".into(),
                    reason: format!("invalid URL: {}", self.api_base_url),
                })?;
        if api_url.host_str().is_none() {
            return Err(ConfigError::Validation {
                field: "api_base_url".into(),
                reason: "URL has no host".into(),
            });
        }

        let broker: url::Url = self
            .broker_url
            .parse()
            .map_err(|_| ConfigError::Validation {
                field: "broker_url".into(),
                reason: format!("invalid URL: {}", self.broker_url),
            })?;
        if broker.host_str().is_none() {
            return Err(ConfigError::Validation {
                field: "broker_url".into(),
                reason: "URL has no host".into(),
            });
        }

        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "fibridge", "fibridge").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("fibridge");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the full config from defaults + file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let config = extract_from(Figment::new().merge(Toml::file(config_path())))?;
    config.validate()?;
    Ok(config)
}

/// Figment merge chain shared by `load_config` and the tests (which
/// substitute their own file layer).
fn extract_from(file_layer: Figment) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(file_layer)
        .merge(Env::prefixed("FIBRIDGE_"));

    Ok(figment.extract()?)
}
