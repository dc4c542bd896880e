use thiserror::Error;

/// Top-level error type for the `fibridge-api` crate.
///
/// The taxonomy keeps authentication, body-shape validation, and transport
/// failures distinguishable -- callers route on the variant (the publish
/// cycle logs validation failures differently from broker/network noise).
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Re-login during a 401 retry was rejected by the vendor.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTTP client construction failed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Data ────────────────────────────────────────────────────────
    /// Response body did not match the expected shape, with the raw body
    /// for debugging.
    #[error("Validation error: {message}")]
    Validation { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error came from the re-login step.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if the response body failed shape validation.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
