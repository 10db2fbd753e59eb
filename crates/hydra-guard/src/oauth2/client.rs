//! OAuth2 Client Implementation
//!
//! [`OAuth2Client`] wraps an oauth2-rs `BasicClient` configured for the
//! authorization code flow against a single identity provider. Authorization URLs
//! request online access only; no refresh-token flow is driven from here.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use secrecy::ExposeSecret;
use tracing::{debug, warn};
use url::{Host, Url};

use super::http_client::{ExchangeRecorder, TokenHttpClient};
use crate::config::OAuth2Config;
use crate::error::{ConfigError, ExchangeError};
use crate::types::TokenInfo;

/// Builds authorization redirects and exchanges authorization codes
///
/// The handlers only depend on this trait, so tests and alternative OAuth2
/// libraries can stand in for [`OAuth2Client`].
#[async_trait]
pub trait AuthorizationClient: Send + Sync + fmt::Debug {
    /// Provider authorization URL carrying `state`
    fn authorization_url(&self, state: &str) -> Url;

    /// Exchange an authorization code for a token
    ///
    /// `Ok(None)` means the provider answered successfully but issued no usable
    /// access token.
    async fn exchange_code(&self, code: &str) -> Result<Option<TokenInfo>, ExchangeError>;
}

type AuthCodeClient = BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// oauth2-rs backed [`AuthorizationClient`]
#[derive(Debug, Clone)]
pub struct OAuth2Client {
    client: AuthCodeClient,
    scopes: Vec<Scope>,
    http_client: TokenHttpClient,
}

impl OAuth2Client {
    /// Create a client from a provider registration
    ///
    /// # Errors
    /// Returns [`ConfigError`] for an unparseable authorization or token URL, a
    /// redirect URI that fails the security checks, or an HTTP client that cannot
    /// be built.
    pub fn new(config: &OAuth2Config, timeout: Duration) -> Result<Self, ConfigError> {
        let auth_url = AuthUrl::new(config.auth_url.clone()).map_err(|source| {
            ConfigError::InvalidUrl {
                field: "authorization",
                source,
            }
        })?;
        let token_url = TokenUrl::new(config.token_url.clone()).map_err(|source| {
            ConfigError::InvalidUrl {
                field: "token",
                source,
            }
        })?;
        let redirect_url = validate_redirect_uri(&config.redirect_uri)?;

        let mut client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        if let Some(secret) = config
            .client_secret
            .as_ref()
            .filter(|s| !s.expose_secret().is_empty())
        {
            client = client.set_client_secret(ClientSecret::new(secret.expose_secret().clone()));
        }

        Ok(Self {
            client,
            scopes: config.scopes.iter().cloned().map(Scope::new).collect(),
            http_client: TokenHttpClient::new(timeout)?,
        })
    }

    /// Replace the HTTP client used for token requests
    #[must_use]
    pub fn with_http_client(mut self, http_client: TokenHttpClient) -> Self {
        self.http_client = http_client;
        self
    }

    fn token_response_to_token_info(response: &BasicTokenResponse) -> Option<TokenInfo> {
        let access_token = response.access_token().secret();
        if access_token.is_empty() {
            return None;
        }

        Some(TokenInfo {
            access_token: access_token.clone(),
            token_type: response.token_type().as_ref().to_string(),
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expires_in: response.expires_in().map(|d| d.as_secs()),
            scope: response.scopes().map(|scopes| {
                scopes
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            }),
        })
    }
}

#[async_trait]
impl AuthorizationClient for OAuth2Client {
    fn authorization_url(&self, state: &str) -> Url {
        let state = state.to_string();
        let (url, _) = self
            .client
            .authorize_url(|| CsrfToken::new(state))
            .add_scopes(self.scopes.iter().cloned())
            .add_extra_param("access_type", "online")
            .url();
        url
    }

    async fn exchange_code(&self, code: &str) -> Result<Option<TokenInfo>, ExchangeError> {
        let recorder = ExchangeRecorder::new(&self.http_client);
        let result = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&recorder)
            .await;

        match result {
            Ok(response) => {
                debug!("authorization code exchanged");
                Ok(Self::token_response_to_token_info(&response))
            }
            Err(err) => match recorder.into_rejection() {
                Some((status, body)) => {
                    debug!(%status, error = %err, "provider rejected code exchange");
                    Err(ExchangeError::Rejected {
                        body: String::from_utf8_lossy(&body).into_owned(),
                    })
                }
                None => {
                    warn!(error = %err, "code exchange failed");
                    Err(ExchangeError::Failed(err.to_string()))
                }
            },
        }
    }
}

/// Redirect URI validation with security checks
///
/// - `https`, or `http` on a loopback host only
/// - no fragment
/// - no `..` path segments
fn validate_redirect_uri(uri: &str) -> Result<RedirectUrl, ConfigError> {
    let parsed = Url::parse(uri).map_err(|source| ConfigError::InvalidUrl {
        field: "redirect",
        source,
    })?;

    match parsed.scheme() {
        "https" => {}
        "http" => {
            let is_loopback = match parsed.host() {
                Some(Host::Domain(host)) => host == "localhost",
                Some(Host::Ipv4(ip)) => ip.is_loopback(),
                Some(Host::Ipv6(ip)) => ip.is_loopback(),
                None => false,
            };
            if !is_loopback {
                return Err(ConfigError::InvalidRedirectUri(
                    "HTTP redirect URIs are only allowed for loopback hosts".to_string(),
                ));
            }
        }
        other => {
            return Err(ConfigError::InvalidRedirectUri(format!(
                "unsupported scheme: {other}"
            )));
        }
    }

    if parsed.fragment().is_some() {
        return Err(ConfigError::InvalidRedirectUri(
            "redirect URI must not contain a fragment".to_string(),
        ));
    }

    if parsed
        .path_segments()
        .is_some_and(|mut segments| segments.any(|s| s == ".."))
    {
        return Err(ConfigError::InvalidRedirectUri(
            "redirect URI path must not contain traversal sequences".to_string(),
        ));
    }

    Ok(RedirectUrl::from_url(parsed))
}
