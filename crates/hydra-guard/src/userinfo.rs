//! Token verification against the provider's userinfo endpoint
//!
//! Every protected request costs one `GET` to the userinfo endpoint with the
//! token as a bearer credential. Results are not cached and failures are not
//! retried.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::types::{UserInfo, VerificationOutcome};

/// Verifies an access token and resolves the identity behind it
///
/// ```
/// use async_trait::async_trait;
/// use hydra_guard::{VerificationOutcome, Verifier};
///
/// #[derive(Debug)]
/// struct DenyAll;
///
/// #[async_trait]
/// impl Verifier for DenyAll {
///     async fn verify(&self, _token: &str) -> VerificationOutcome {
///         VerificationOutcome::Unauthorized("unauthorized".to_string())
///     }
/// }
///
/// # tokio_test::block_on(async {
/// assert!(!DenyAll.verify("tok").await.is_success());
/// # });
/// ```
#[async_trait]
pub trait Verifier: Send + Sync + fmt::Debug {
    /// Classify `token` into a [`VerificationOutcome`]
    async fn verify(&self, token: &str) -> VerificationOutcome;
}

/// [`Verifier`] backed by an OpenID Connect style userinfo endpoint
#[derive(Debug, Clone)]
pub struct UserInfoVerifier {
    endpoint: Url,
    http_client: reqwest::Client,
}

impl UserInfoVerifier {
    /// Create a verifier for `endpoint` with a bounded request timeout
    ///
    /// # Errors
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint,
            http_client,
        })
    }

    /// Create a verifier from the client configuration
    ///
    /// # Errors
    /// Returns [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Self::new(config.userinfo_endpoint().clone(), config.request_timeout())
    }

    /// Userinfo endpoint this verifier calls
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Verifier for UserInfoVerifier {
    async fn verify(&self, token: &str) -> VerificationOutcome {
        let response = match self
            .http_client
            .get(self.endpoint.clone())
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "userinfo request failed");
                return VerificationOutcome::TransportError(format!(
                    "sending userinfo request: {e}"
                ));
            }
        };

        let status = response.status();
        match response.bytes().await {
            Ok(body) => classify_response(status, &body),
            Err(e) => {
                warn!(error = %e, "failed to read userinfo response");
                VerificationOutcome::TransportError(format!("reading userinfo response: {e}"))
            }
        }
    }
}

/// Classify a userinfo response
///
/// - 200 with a JSON object body: [`VerificationOutcome::Success`], unknown keys kept
/// - 200 with any other body: [`VerificationOutcome::TransportError`]
/// - 401: [`VerificationOutcome::Unauthorized`]
/// - anything else: [`VerificationOutcome::ProviderError`] with the body verbatim
#[must_use]
pub fn classify_response(status: StatusCode, body: &[u8]) -> VerificationOutcome {
    match status {
        StatusCode::OK => match serde_json::from_slice::<UserInfo>(body) {
            Ok(info) => VerificationOutcome::Success(info),
            Err(e) => {
                warn!(error = %e, "unparseable userinfo response");
                VerificationOutcome::TransportError(format!("parsing userinfo response: {e}"))
            }
        },
        StatusCode::UNAUTHORIZED => {
            debug!("userinfo endpoint rejected token");
            VerificationOutcome::Unauthorized("unauthorized".to_string())
        }
        status => {
            debug!(%status, "userinfo endpoint returned an error");
            VerificationOutcome::ProviderError {
                status,
                body: String::from_utf8_lossy(body).into_owned(),
            }
        }
    }
}
