//! # Hydra Guard - OAuth2 Authorization Code Client Gate
//!
//! Protects HTTP resources behind a central OAuth2 identity provider (such as
//! Ory Hydra) without server-side sessions.
//!
//! ## Flow
//!
//! 1. [`AuthorizeService`] redirects the user agent to the provider with a CSRF
//!    `state` bound to the request fingerprint
//! 2. [`CallbackService`] validates the returned state, exchanges the code and
//!    commits the access token to a cookie, a header, or a JSON body
//! 3. [`AuthCheckLayer`] guards later requests: it applies bypass rules, reads the
//!    token back, verifies it against the userinfo endpoint and hands the
//!    identity to the inner service through request extensions
//!
//! ## Architecture
//!
//! - [`config`] - [`ClientConfig`] builder, serde settings and environment loading
//! - [`state`] - CSRF state codecs
//! - [`bypass`] - method and path exemptions
//! - [`credential`] - token transports and extraction
//! - [`userinfo`] - token verification against the userinfo endpoint
//! - [`oauth2`] - authorization URL and code exchange
//! - [`handlers`] - initiation and callback endpoints
//! - [`tower`] - auth-check middleware
//! - [`context`] - request-scoped identity accessors
//! - [`error`] - error types
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use hydra_guard::{AuthCheckLayer, BypassRule, ClientConfig, UserInfoVerifier};
//!
//! let config = Arc::new(
//!     ClientConfig::builder()
//!         .cookie_name("sid")
//!         .state_secret("change-me")
//!         .userinfo_endpoint("https://id.example.com/userinfo")
//!         .bypass(BypassRule::new("^/health$", ["GET"]).unwrap())
//!         .build()
//!         .unwrap(),
//! );
//!
//! let verifier = Arc::new(UserInfoVerifier::from_config(&config).unwrap());
//! let layer = AuthCheckLayer::new(config, verifier).unwrap();
//! # let _ = layer;
//! ```
//!
//! ## Logging
//!
//! All diagnostics are `tracing` events. Without a subscriber they are no-ops;
//! token values are never logged.

pub mod bypass;
pub mod config;
pub mod context;
pub mod credential;
pub mod error;
pub mod handlers;
pub mod oauth2;
mod response;
pub mod state;
pub mod tower;
pub mod types;
pub mod userinfo;

#[doc(inline)]
pub use bypass::{BypassRule, can_bypass};

#[doc(inline)]
pub use config::{BypassSettings, ClientConfig, ClientConfigBuilder, ClientSettings, OAuth2Config};

#[doc(inline)]
pub use credential::{CredentialTransport, extract_credential};

#[doc(inline)]
pub use error::{ConfigError, ContextError, ExchangeError, FlowError, StateError};

#[doc(inline)]
pub use handlers::{AuthorizeService, CallbackService};

#[doc(inline)]
pub use crate::oauth2::{AuthorizationClient, OAuth2Client};

#[doc(inline)]
pub use state::{FnStateCodec, HmacStateCodec, StateCodec};

#[doc(inline)]
pub use crate::tower::{AuthCheckLayer, AuthCheckService};

#[doc(inline)]
pub use types::{IdentityClaims, TokenInfo, UserInfo, VerificationOutcome};

#[doc(inline)]
pub use userinfo::{UserInfoVerifier, Verifier};
