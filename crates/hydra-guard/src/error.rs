//! Error Types
//!
//! Errors are split by where they surface:
//!
//! - [`ConfigError`] - wiring-time faults; building a config or layer fails with these
//!   and the process should not start serving
//! - [`StateError`] - state token generation failures
//! - [`ExchangeError`] - authorization code exchange failures, as reported by the
//!   [`AuthorizationClient`](crate::oauth2::AuthorizationClient)
//! - [`ContextError`] - identity values missing from a request's extensions
//! - [`FlowError`] - per-request failures resolved into an HTTP response at the
//!   handler boundary that detected them

use http::StatusCode;

use crate::response::{error_response, raw_response};

/// Configuration error detected while wiring the client
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Neither a state secret nor a custom state codec was supplied
    #[error("state secret is missing from client configuration")]
    MissingStateSecret,

    /// The auth-check middleware needs a cookie or header to read tokens from
    #[error("no cookie or header name configured")]
    NoCredentialTransport,

    /// The userinfo endpoint is required to verify tokens
    #[error("userinfo endpoint is missing from client configuration")]
    MissingUserInfoEndpoint,

    /// A configured URL failed to parse
    #[error("invalid {field} URL: {source}")]
    InvalidUrl {
        /// Which option carried the URL
        field: &'static str,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// A redirect URI failed the security checks
    #[error("invalid redirect URI: {0}")]
    InvalidRedirectUri(String),

    /// A header or cookie name is not a valid HTTP token
    #[error("invalid header name: {0}")]
    InvalidHeaderName(String),

    /// A bypass rule names a method that is not a valid HTTP method
    #[error("invalid HTTP method in bypass rule: {0}")]
    InvalidMethod(String),

    /// The status returned for missing credentials is not a client or server error
    #[error("invalid missing credential status: {0}")]
    InvalidStatus(u16),

    /// Provider calls need a non-zero timeout
    #[error("request timeout must be greater than zero")]
    InvalidTimeout,

    /// A bypass path pattern failed to compile
    #[error("invalid bypass pattern: {0}")]
    InvalidBypassPattern(#[from] regex::Error),

    /// An environment variable could not be read or parsed
    #[error("environment variable {name}: {reason}")]
    Env {
        /// Variable name
        name: &'static str,
        /// What went wrong
        reason: String,
    },

    /// The outbound HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// State token generation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// The HMAC key was empty or rejected
    #[error("state secret is missing from client configuration")]
    MissingSecret,

    /// A custom codec refused to produce a state value
    #[error("state generation failed: {0}")]
    Generation(String),
}

/// Authorization code exchange error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// The provider answered the token request with a non-2xx response
    ///
    /// The body is the provider's response, passed back to the caller verbatim.
    #[error("provider rejected code exchange: {body}")]
    Rejected {
        /// Provider error body
        body: String,
    },

    /// Any other failure (network, timeout, unreadable response)
    #[error("code exchange failed: {0}")]
    Failed(String),
}

/// A request-scoped identity value was not present
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// No [`UserInfo`](crate::UserInfo) in the request extensions
    #[error("missing user info")]
    MissingUserInfo,

    /// No [`UserToken`](crate::context::UserToken) in the request extensions
    #[error("missing user token")]
    MissingUserToken,
}

/// Per-request failure, resolved into a response where it is detected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// A required parameter or header was missing or malformed (400)
    #[error("{0}")]
    ClientRequest(String),

    /// The state codec could not produce a state for this request (400)
    #[error(transparent)]
    State(#[from] StateError),

    /// The callback state did not validate against the current request (401)
    #[error("state mismatch")]
    CsrfMismatch,

    /// The identity provider rejected the request; its status and body are surfaced
    #[error("provider rejected request with status {status}")]
    ProviderRejection {
        /// Status to respond with
        status: StatusCode,
        /// Provider body, returned verbatim
        body: String,
    },

    /// Network or parse failure talking to the provider (500)
    #[error("{0}")]
    Transport(String),

    /// An exchange succeeded but produced nothing usable (500)
    #[error("{0}")]
    InternalInvariant(String),
}

impl FlowError {
    /// HTTP status this error resolves to
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ClientRequest(_) | Self::State(_) => StatusCode::BAD_REQUEST,
            Self::CsrfMismatch => StatusCode::UNAUTHORIZED,
            Self::ProviderRejection { status, .. } => *status,
            Self::Transport(_) | Self::InternalInvariant(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Resolve into a complete response
    ///
    /// Provider rejections pass the provider body through untouched; everything
    /// else becomes a `{"error": "..."}` JSON body.
    #[must_use]
    pub fn into_response(self) -> http::Response<String> {
        let status = self.status();
        match self {
            Self::ProviderRejection { body, .. } => raw_response(status, body),
            other => error_response(status, &other.to_string()),
        }
    }
}

impl From<ExchangeError> for FlowError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Rejected { body } => Self::ProviderRejection {
                status: StatusCode::UNAUTHORIZED,
                body,
            },
            ExchangeError::Failed(detail) => Self::Transport(detail),
        }
    }
}
