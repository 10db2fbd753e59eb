//! # CSRF State Binding
//!
//! The `state` parameter of the authorization redirect binds the callback to the
//! client that started the flow. The default [`HmacStateCodec`] does this without
//! any server-side storage: the state is
//!
//! ```text
//! hex(HMAC-SHA256(secret, client_address || user_agent))
//! ```
//!
//! and validation recomputes it from the callback request and compares the two in
//! constant time.
//!
//! ## Client Address
//!
//! The first non-empty of:
//! 1. `x-forwarded-for` (whole header value)
//! 2. `x-real-ip`
//! 3. the peer [`SocketAddr`] stored in the request extensions by the server
//!
//! ## Limitation
//!
//! A recomputed fingerprint is not a nonce. It only detects a callback that arrives
//! with a different address or user agent than the initiation; it does not stop a
//! state value from being replayed by a client sharing the same fingerprint, and
//! address churn behind NAT or proxies will fail honest callbacks. Deployments that
//! need real per-session nonces should supply their own [`StateCodec`] (for example
//! via [`FnStateCodec`]).

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use http::header::USER_AGENT;
use http::request::Parts;
use secrecy::{ExposeSecret, SecretVec};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::{ConfigError, StateError};

type HmacSha256 = Hmac<Sha256>;

/// Generates and validates the `state` parameter of the authorization flow
///
/// Implementations must be deterministic enough that a state produced for the
/// initiating request validates against the callback request of the same client.
pub trait StateCodec: Send + Sync + fmt::Debug {
    /// Produce the state value for an initiating request
    fn generate(&self, req: &Parts) -> Result<String, StateError>;

    /// Check a returned state value against the callback request
    fn validate(&self, candidate: &str, req: &Parts) -> bool;
}

/// Client address used in the fingerprint
///
/// Returns an empty string when no source is available.
#[must_use]
pub fn client_address(req: &Parts) -> String {
    if let Some(forwarded) = header_str(req, "x-forwarded-for") {
        return forwarded.to_string();
    }
    debug!("no value for x-forwarded-for, checking x-real-ip");

    if let Some(real_ip) = header_str(req, "x-real-ip") {
        return real_ip.to_string();
    }
    debug!("no value for x-real-ip, using peer address");

    req.extensions
        .get::<SocketAddr>()
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Request fingerprint: client address followed by the user agent, no separator
#[must_use]
pub fn fingerprint(req: &Parts) -> String {
    let mut data = client_address(req);
    if let Some(agent) = req.headers.get(USER_AGENT).and_then(|v| v.to_str().ok()) {
        data.push_str(agent);
    }
    data
}

fn header_str<'a>(req: &'a Parts, name: &str) -> Option<&'a str> {
    req.headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Default codec: HMAC-SHA256 of the request fingerprint, hex encoded
pub struct HmacStateCodec {
    secret: SecretVec<u8>,
}

impl HmacStateCodec {
    /// Create a codec keyed with `secret`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingStateSecret`] if the secret is empty.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::MissingStateSecret);
        }
        Ok(Self {
            secret: SecretVec::new(secret),
        })
    }

    fn sign(&self, data: &str) -> Result<Vec<u8>, StateError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret())
            .map_err(|_| StateError::MissingSecret)?;
        mac.update(data.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl fmt::Debug for HmacStateCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacStateCodec")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl StateCodec for HmacStateCodec {
    fn generate(&self, req: &Parts) -> Result<String, StateError> {
        let data = fingerprint(req);
        let state = hex::encode(self.sign(&data)?);
        debug!(fingerprint = %data, "generated state");
        Ok(state)
    }

    fn validate(&self, candidate: &str, req: &Parts) -> bool {
        let Ok(provided) = hex::decode(candidate) else {
            debug!("state is not valid hex");
            return false;
        };
        let Ok(expected) = self.sign(&fingerprint(req)) else {
            return false;
        };
        expected.as_slice().ct_eq(provided.as_slice()).into()
    }
}

type GenerateFn = dyn Fn(&Parts) -> Result<String, StateError> + Send + Sync;
type ValidateFn = dyn Fn(&str, &Parts) -> bool + Send + Sync;

/// Codec built from a pair of functions
///
/// Replaces the fingerprint mechanism wholesale, e.g. with a nonce kept in a
/// signed cookie or an external store.
///
/// ```
/// use hydra_guard::state::{FnStateCodec, StateCodec};
///
/// let codec = FnStateCodec::new(
///     |_req| Ok("fixed".to_string()),
///     |candidate, _req| candidate == "fixed",
/// );
/// let (parts, ()) = http::Request::new(()).into_parts();
/// assert!(codec.validate(&codec.generate(&parts).unwrap(), &parts));
/// ```
#[derive(Clone)]
pub struct FnStateCodec {
    generate: Arc<GenerateFn>,
    validate: Arc<ValidateFn>,
}

impl FnStateCodec {
    /// Create a codec from a generator and a validator
    pub fn new<G, V>(generate: G, validate: V) -> Self
    where
        G: Fn(&Parts) -> Result<String, StateError> + Send + Sync + 'static,
        V: Fn(&str, &Parts) -> bool + Send + Sync + 'static,
    {
        Self {
            generate: Arc::new(generate),
            validate: Arc::new(validate),
        }
    }
}

impl fmt::Debug for FnStateCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStateCodec").finish_non_exhaustive()
    }
}

impl StateCodec for FnStateCodec {
    fn generate(&self, req: &Parts) -> Result<String, StateError> {
        (self.generate)(req)
    }

    fn validate(&self, candidate: &str, req: &Parts) -> bool {
        (self.validate)(candidate, req)
    }
}
