// Transport configuration for building the session-scoped reqwest::Client.
//
// The vendor API is cookie-authenticated: the login endpoint sets a session
// cookie that every later request must carry. The jar lives here so the
// whole client shares one logical account session.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

use crate::error::Error;

/// Configuration for the HTTP transport backing a [`FiClient`](crate::FiClient).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("fibridge/", env!("CARGO_PKG_VERSION")));

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder.build().map_err(|e| Error::ClientBuild(e.to_string()))
    }

    /// Create a config with a fresh cookie jar (session auth requires one).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }
}
