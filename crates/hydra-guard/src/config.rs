//! Client Configuration
//!
//! [`ClientConfig`] is built once at wiring time and shared read-only by the
//! handlers and the auth-check middleware. It can be assembled three ways:
//!
//! - [`ClientConfig::builder`] in code
//! - [`ClientSettings`], deserialized from a config file, via `TryFrom`
//! - [`ClientConfig::from_env`]
//!
//! Every path validates eagerly; a configuration that would fail per request is
//! rejected with a [`ConfigError`] instead.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use http::header::HeaderName;
use secrecy::{ExposeSecret, SecretString, SecretVec};
use serde::Deserialize;
use url::Url;

use crate::bypass::BypassRule;
use crate::credential::CredentialTransport;
use crate::error::ConfigError;
use crate::state::{HmacStateCodec, StateCodec};

/// Default timeout for calls to the identity provider
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Validated client configuration
#[derive(Debug)]
pub struct ClientConfig {
    transport: CredentialTransport,
    missing_credential_status: StatusCode,
    bypasses: Vec<BypassRule>,
    state_codec: Arc<dyn StateCodec>,
    userinfo_endpoint: Url,
    trust_cookie_hints: bool,
    secure_cookies: bool,
    request_timeout: Duration,
}

impl ClientConfig {
    /// Start building a configuration
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from environment variables
    ///
    /// Required:
    /// - `AUTH_USERINFO_URL`: userinfo endpoint of the identity provider
    /// - `AUTH_STATE_SECRET`: HMAC key for the CSRF state
    ///
    /// Optional:
    /// - `AUTH_COOKIE_NAME`: commit tokens in this cookie
    /// - `AUTH_HEADER_NAME`: commit tokens in this header (ignored with a cookie name)
    /// - `AUTH_MISSING_CREDENTIAL_STATUS`: status for requests without a token (default: 401)
    /// - `AUTH_TRUST_COOKIE_HINTS`: derive cookie flags from request headers (default: false)
    /// - `AUTH_SECURE_COOKIES`: `Secure` flag when hints are not trusted (default: true)
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: provider call timeout (default: 30)
    ///
    /// # Example
    /// ```rust,no_run
    /// use hydra_guard::ClientConfig;
    ///
    /// let config = ClientConfig::from_env().expect("Failed to load auth config");
    /// ```
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a required variable is missing or any value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        ClientSettings::from_lookup(|name| std::env::var(name).ok())?.try_into()
    }

    /// Where tokens are committed and read back from
    #[must_use]
    pub fn transport(&self) -> &CredentialTransport {
        &self.transport
    }

    /// Status returned when a protected request carries no token
    #[must_use]
    pub fn missing_credential_status(&self) -> StatusCode {
        self.missing_credential_status
    }

    /// Bypass rules, in evaluation order
    #[must_use]
    pub fn bypasses(&self) -> &[BypassRule] {
        &self.bypasses
    }

    /// Active state codec
    #[must_use]
    pub fn state_codec(&self) -> &dyn StateCodec {
        self.state_codec.as_ref()
    }

    /// Userinfo endpoint
    #[must_use]
    pub fn userinfo_endpoint(&self) -> &Url {
        &self.userinfo_endpoint
    }

    /// Whether cookie `Secure`/`Domain` come from client-supplied headers
    #[must_use]
    pub fn trust_cookie_hints(&self) -> bool {
        self.trust_cookie_hints
    }

    /// `Secure` flag used when cookie hints are not trusted
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    /// Timeout for userinfo and token calls
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Builder for [`ClientConfig`]
pub struct ClientConfigBuilder {
    cookie_name: Option<String>,
    header_name: Option<String>,
    missing_credential_status: u16,
    bypasses: Vec<BypassRule>,
    state_secret: Option<SecretVec<u8>>,
    state_codec: Option<Arc<dyn StateCodec>>,
    userinfo_endpoint: Option<String>,
    trust_cookie_hints: bool,
    secure_cookies: bool,
    request_timeout: Duration,
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("cookie_name", &self.cookie_name)
            .field("header_name", &self.header_name)
            .field("missing_credential_status", &self.missing_credential_status)
            .field("bypasses", &self.bypasses)
            .field("state_secret", &self.state_secret.as_ref().map(|_| "[REDACTED]"))
            .field("state_codec", &self.state_codec)
            .field("userinfo_endpoint", &self.userinfo_endpoint)
            .field("trust_cookie_hints", &self.trust_cookie_hints)
            .field("secure_cookies", &self.secure_cookies)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            cookie_name: None,
            header_name: None,
            missing_credential_status: StatusCode::UNAUTHORIZED.as_u16(),
            bypasses: Vec::new(),
            state_secret: None,
            state_codec: None,
            userinfo_endpoint: None,
            trust_cookie_hints: false,
            secure_cookies: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfigBuilder {
    /// Commit tokens in a cookie with this name (takes precedence over a header)
    #[must_use]
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = Some(name.into()).filter(|n| !n.is_empty());
        self
    }

    /// Commit tokens in a header with this name
    #[must_use]
    pub fn header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = Some(name.into()).filter(|n| !n.is_empty());
        self
    }

    /// Status for protected requests without a token (default: 401)
    #[must_use]
    pub fn missing_credential_status(mut self, status: u16) -> Self {
        self.missing_credential_status = status;
        self
    }

    /// Append a bypass rule
    #[must_use]
    pub fn bypass(mut self, rule: BypassRule) -> Self {
        self.bypasses.push(rule);
        self
    }

    /// Append several bypass rules, keeping their order
    #[must_use]
    pub fn bypasses(mut self, rules: impl IntoIterator<Item = BypassRule>) -> Self {
        self.bypasses.extend(rules);
        self
    }

    /// HMAC key for the default state codec
    #[must_use]
    pub fn state_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.state_secret = Some(SecretVec::new(secret.into()));
        self
    }

    /// Replace the default state codec
    #[must_use]
    pub fn state_codec(mut self, codec: Arc<dyn StateCodec>) -> Self {
        self.state_codec = Some(codec);
        self
    }

    /// Userinfo endpoint of the identity provider
    #[must_use]
    pub fn userinfo_endpoint(mut self, url: impl Into<String>) -> Self {
        self.userinfo_endpoint = Some(url.into());
        self
    }

    /// Derive cookie `Secure`/`Domain` from `origin`/`referer`/`x-cookie-domain`
    ///
    /// Only enable behind a proxy that strips or validates these headers.
    #[must_use]
    pub fn trust_cookie_hints(mut self, trust: bool) -> Self {
        self.trust_cookie_hints = trust;
        self
    }

    /// `Secure` flag when cookie hints are not trusted (default: true)
    #[must_use]
    pub fn secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Timeout for calls to the identity provider (default: 30s, must be non-zero)
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate and build
    ///
    /// # Errors
    /// Returns [`ConfigError`] for a missing or empty state secret (without a custom
    /// codec), a missing or unparseable userinfo endpoint, an invalid cookie or header
    /// name, a missing-credential status outside 400..=599, or a zero request timeout.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let transport = match (self.cookie_name, self.header_name) {
            (Some(cookie), _) => {
                validate_token_name(&cookie)?;
                CredentialTransport::Cookie(cookie)
            }
            (None, Some(header)) => CredentialTransport::Header(
                HeaderName::from_bytes(header.as_bytes())
                    .map_err(|_| ConfigError::InvalidHeaderName(header.clone()))?,
            ),
            (None, None) => CredentialTransport::JsonBody,
        };

        let missing_credential_status = StatusCode::from_u16(self.missing_credential_status)
            .ok()
            .filter(|s| s.is_client_error() || s.is_server_error())
            .ok_or(ConfigError::InvalidStatus(self.missing_credential_status))?;

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        let state_codec = match (self.state_codec, self.state_secret) {
            (Some(codec), _) => codec,
            (None, Some(secret)) => Arc::new(HmacStateCodec::new(secret.expose_secret().clone())?),
            (None, None) => return Err(ConfigError::MissingStateSecret),
        };

        let endpoint = self
            .userinfo_endpoint
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingUserInfoEndpoint)?;
        let userinfo_endpoint = Url::parse(&endpoint).map_err(|source| ConfigError::InvalidUrl {
            field: "userinfo endpoint",
            source,
        })?;

        Ok(ClientConfig {
            transport,
            missing_credential_status,
            bypasses: self.bypasses,
            state_codec,
            userinfo_endpoint,
            trust_cookie_hints: self.trust_cookie_hints,
            secure_cookies: self.secure_cookies,
            request_timeout: self.request_timeout,
        })
    }
}

// Cookie names share the header-name token grammar
fn validate_token_name(name: &str) -> Result<(), ConfigError> {
    HeaderName::from_bytes(name.as_bytes())
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidHeaderName(name.to_string()))
}

/// Serializable client settings
///
/// ```
/// use hydra_guard::{ClientConfig, ClientSettings};
///
/// let settings: ClientSettings = serde_json::from_str(r#"{
///     "cookie_name": "sid",
///     "state_secret": "change-me",
///     "userinfo_endpoint": "https://id.example.com/userinfo",
///     "bypasses": [{ "pattern": "^/health$", "methods": ["GET"] }]
/// }"#).unwrap();
///
/// let config = ClientConfig::try_from(settings).unwrap();
/// assert_eq!(config.bypasses().len(), 1);
/// ```
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Cookie transport name
    pub cookie_name: Option<String>,
    /// Header transport name
    pub header_name: Option<String>,
    /// Status for requests without a token
    pub missing_credential_status: u16,
    /// Bypass rules, in evaluation order
    pub bypasses: Vec<BypassSettings>,
    /// HMAC key for the state codec
    pub state_secret: Option<SecretString>,
    /// Userinfo endpoint
    pub userinfo_endpoint: Option<String>,
    /// Derive cookie flags from request headers
    pub trust_cookie_hints: bool,
    /// `Secure` flag when hints are not trusted
    pub secure_cookies: bool,
    /// Provider call timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            cookie_name: None,
            header_name: None,
            missing_credential_status: StatusCode::UNAUTHORIZED.as_u16(),
            bypasses: Vec::new(),
            state_secret: None,
            userinfo_endpoint: None,
            trust_cookie_hints: false,
            secure_cookies: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

/// Serializable bypass rule
#[derive(Debug, Clone, Deserialize)]
pub struct BypassSettings {
    /// Path regex
    pub pattern: String,
    /// Exempt methods
    pub methods: Vec<String>,
}

impl ClientSettings {
    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let userinfo_endpoint = var("AUTH_USERINFO_URL").ok_or(ConfigError::Env {
            name: "AUTH_USERINFO_URL",
            reason: "not set".to_string(),
        })?;

        let missing_credential_status = match var("AUTH_MISSING_CREDENTIAL_STATUS") {
            Some(v) => parse_env("AUTH_MISSING_CREDENTIAL_STATUS", &v)?,
            None => defaults.missing_credential_status,
        };
        let trust_cookie_hints = match var("AUTH_TRUST_COOKIE_HINTS") {
            Some(v) => parse_bool("AUTH_TRUST_COOKIE_HINTS", &v)?,
            None => defaults.trust_cookie_hints,
        };
        let secure_cookies = match var("AUTH_SECURE_COOKIES") {
            Some(v) => parse_bool("AUTH_SECURE_COOKIES", &v)?,
            None => defaults.secure_cookies,
        };
        let request_timeout_secs = match var("AUTH_REQUEST_TIMEOUT_SECS") {
            Some(v) => parse_env("AUTH_REQUEST_TIMEOUT_SECS", &v)?,
            None => defaults.request_timeout_secs,
        };

        Ok(Self {
            cookie_name: var("AUTH_COOKIE_NAME"),
            header_name: var("AUTH_HEADER_NAME"),
            missing_credential_status,
            bypasses: Vec::new(),
            state_secret: var("AUTH_STATE_SECRET").map(SecretString::new),
            userinfo_endpoint: Some(userinfo_endpoint),
            trust_cookie_hints,
            secure_cookies,
            request_timeout_secs,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        name,
        reason: e.to_string(),
    })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Env {
            name,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

impl TryFrom<ClientSettings> for ClientConfig {
    type Error = ConfigError;

    fn try_from(settings: ClientSettings) -> Result<Self, Self::Error> {
        let mut builder = ClientConfig::builder()
            .missing_credential_status(settings.missing_credential_status)
            .trust_cookie_hints(settings.trust_cookie_hints)
            .secure_cookies(settings.secure_cookies)
            .request_timeout(Duration::from_secs(settings.request_timeout_secs));

        if let Some(name) = settings.cookie_name {
            builder = builder.cookie_name(name);
        }
        if let Some(name) = settings.header_name {
            builder = builder.header_name(name);
        }
        if let Some(secret) = settings.state_secret {
            builder = builder.state_secret(secret.expose_secret().as_bytes());
        }
        if let Some(url) = settings.userinfo_endpoint {
            builder = builder.userinfo_endpoint(url);
        }
        for rule in settings.bypasses {
            builder = builder.bypass(BypassRule::new(&rule.pattern, &rule.methods)?);
        }

        builder.build()
    }
}

/// OAuth2 client registration with the identity provider
#[derive(Debug, Deserialize)]
pub struct OAuth2Config {
    /// Client ID
    pub client_id: String,
    /// Client secret, for confidential clients
    #[serde(default)]
    pub client_secret: Option<SecretString>,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// Redirect URI registered with the provider
    pub redirect_uri: String,
    /// Scopes to request
    #[serde(default)]
    pub scopes: Vec<String>,
}
