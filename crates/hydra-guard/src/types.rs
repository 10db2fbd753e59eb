//! Core Types
//!
//! Identity and token types shared by the handlers and the auth-check middleware.

use std::collections::HashMap;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read access to provider-asserted identity claims
///
/// Claims are untyped on the wire; every accessor degrades to the zero value for
/// missing keys and type mismatches instead of failing.
pub trait IdentityClaims {
    /// `sub` claim
    fn subject(&self) -> String {
        self.get_string("sub")
    }

    /// String claim, or `""`
    fn get_string(&self, key: &str) -> String;

    /// 32-bit integer claim, or `0`
    fn get_int(&self, key: &str) -> i32;

    /// 64-bit integer claim, or `0`
    fn get_int64(&self, key: &str) -> i64;
}

/// Userinfo record returned by the identity provider
///
/// Keeps every key the provider sent, known or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserInfo {
    claims: HashMap<String, Value>,
}

impl UserInfo {
    /// Wrap a claims map
    #[must_use]
    pub fn new(claims: HashMap<String, Value>) -> Self {
        Self { claims }
    }

    /// Raw claim value
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.claims.get(key)
    }

    /// All claims
    #[must_use]
    pub fn claims(&self) -> &HashMap<String, Value> {
        &self.claims
    }
}

impl IdentityClaims for UserInfo {
    fn get_string(&self, key: &str) -> String {
        self.claims
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default()
    }

    fn get_int(&self, key: &str) -> i32 {
        i32::try_from(self.get_int64(key)).unwrap_or_default()
    }

    fn get_int64(&self, key: &str) -> i64 {
        match self.claims.get(key) {
            Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
            Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        }
    }
}

impl From<HashMap<String, Value>> for UserInfo {
    fn from(claims: HashMap<String, Value>) -> Self {
        Self::new(claims)
    }
}

/// Token information returned by the code exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Access token
    pub access_token: String,
    /// Token type (Bearer, etc.)
    pub token_type: String,
    /// Refresh token, passed through to the application untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token expiry in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Token scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenInfo {
    /// Bearer token with no optional fields
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "bearer".to_string(),
            refresh_token: None,
            expires_in: None,
            scope: None,
        }
    }
}

/// Result of verifying an access token against the userinfo endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Token accepted; the provider's identity record
    Success(UserInfo),
    /// Provider answered 401
    Unauthorized(String),
    /// Provider answered with any other failure status
    ProviderError {
        /// Provider status
        status: StatusCode,
        /// Provider body, verbatim
        body: String,
    },
    /// Network failure, timeout, or an unparseable success body
    TransportError(String),
}

impl VerificationOutcome {
    /// Whether the token was accepted
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
