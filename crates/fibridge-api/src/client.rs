// Vendor API HTTP client
//
// Wraps `reqwest::Client` with the session cookie jar, fixed endpoint URL
// construction, and the bounded re-login wrapper. Endpoint operations
// (auth, details) are implemented as inherent methods via separate files
// to keep this module focused on transport mechanics.

use secrecy::SecretString;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Default vendor API root.
pub const DEFAULT_BASE_URL: &str = "https://api.tryfi.com";

/// HTTP client for the TryFi vendor API.
///
/// Holds the cookie-jar-backed `reqwest::Client` and the account
/// credentials. The jar is the whole session state: login populates it,
/// every authenticated request reads it, and it lives as long as the
/// client (there is no explicit logout).
pub struct FiClient {
    http: reqwest::Client,
    base_url: Url,
    email: String,
    password: SecretString,
}

impl FiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// If the config doesn't already include a cookie jar, one is created
    /// automatically (session auth requires cookies).
    pub fn new(
        base_url: Url,
        email: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let http = config.build_client()?;
        Ok(Self { http, base_url, email, password })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Use this when you need control over the underlying client (tests
    /// point it at a mock server).
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        email: String,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            email,
            password,
        }
    }

    /// The account email this session is tied to.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The account password (exposed only inside auth).
    pub(crate) fn password(&self) -> &SecretString {
        &self.password
    }

    /// The underlying HTTP client.
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The vendor API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/auth/login`
    pub(crate) fn login_url(&self) -> Result<Url, Error> {
        self.base_url.join("/auth/login").map_err(Error::InvalidUrl)
    }

    /// `{base}/graphql`
    pub(crate) fn graphql_url(&self) -> Result<Url, Error> {
        self.base_url.join("/graphql").map_err(Error::InvalidUrl)
    }

    // ── Re-login wrapper ─────────────────────────────────────────────

    /// Issue an authenticated request with a single bounded re-login retry.
    ///
    /// State machine: the first response is returned as-is unless its
    /// status is 401. On 401, re-authenticate; if login succeeds the
    /// request is re-issued exactly once and that second response is
    /// returned regardless of status (a second consecutive 401 is NOT
    /// retried -- callers see it fail at body validation). If login is
    /// rejected, fails with an authentication error. The wrapped request
    /// runs at most twice per call.
    pub(crate) async fn send_with_relogin<F, Fut>(&self, send: F) -> Result<reqwest::Response, Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let response = send().await?;
        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("session rejected (401), re-authenticating");
        if self.login().await? {
            return Ok(send().await?);
        }

        Err(Error::Authentication {
            message: "login failed".into(),
        })
    }
}
