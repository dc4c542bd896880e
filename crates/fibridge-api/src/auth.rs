// Authentication
//
// Cookie-based session login. The login endpoint sets a session cookie in
// the client's jar; subsequent requests use that cookie automatically.

use secrecy::ExposeSecret;
use tracing::debug;

use crate::client::FiClient;
use crate::error::Error;

impl FiClient {
    /// Authenticate with the vendor using the configured email/password.
    ///
    /// `POST /auth/login` with a form-encoded body. Returns `Ok(true)`
    /// only on HTTP 200; any other status is `Ok(false)` rather than an
    /// error -- the caller (startup probe or the 401 retry wrapper)
    /// decides how to interpret a rejection. Transport failures still
    /// surface as `Err`. On success the session cookie lands in the
    /// client's jar transparently.
    pub async fn login(&self) -> Result<bool, Error> {
        let url = self.login_url()?;
        debug!("logging in at {}", url);

        let form = [
            ("email", self.email()),
            ("password", self.password().expose_secret()),
        ];

        let response = self
            .http()
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Transport)?;

        let ok = response.status() == reqwest::StatusCode::OK;
        debug!(status = %response.status(), ok, "login response");
        Ok(ok)
    }
}
