//! CLI error type with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Configuration error")]
    #[diagnostic(
        code(fibridge::config),
        help(
            "Set FIBRIDGE_EMAIL and FIBRIDGE_PASSWORD (plus FIBRIDGE_BROKER_URL,\n\
             FIBRIDGE_TOPIC, FIBRIDGE_POLL_INTERVAL_MS as needed), or create a\n\
             config.toml at the platform config path."
        )
    )]
    Config(#[from] fibridge_config::ConfigError),

    #[error("Vendor API request failed")]
    #[diagnostic(code(fibridge::api))]
    Api(#[from] fibridge_api::Error),

    #[error("Bridge runtime failed")]
    #[diagnostic(code(fibridge::bridge))]
    Bridge(#[from] fibridge_core::BridgeError),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(fibridge::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_code::USAGE,
            Self::Api(err) if err.is_auth() => exit_code::AUTH,
            Self::Api(fibridge_api::Error::Transport(_))
            | Self::Bridge(fibridge_core::BridgeError::BrokerUrl { .. }) => exit_code::CONNECTION,
            Self::Bridge(fibridge_core::BridgeError::Api(err)) if err.is_auth() => exit_code::AUTH,
            _ => exit_code::GENERAL,
        }
    }
}
