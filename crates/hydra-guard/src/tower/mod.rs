//! # Auth-Check Middleware
//!
//! [`AuthCheckLayer`] wraps a downstream service so that every request either
//! bypasses authentication, is rejected, or reaches the inner service carrying a
//! verified identity in its extensions.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tower::ServiceBuilder;
//! use hydra_guard::{AuthCheckLayer, ClientConfig, UserInfoVerifier};
//!
//! let config = Arc::new(ClientConfig::from_env()?);
//! let verifier = Arc::new(UserInfoVerifier::from_config(&config)?);
//!
//! let service = ServiceBuilder::new()
//!     .layer(AuthCheckLayer::new(config, verifier)?)
//!     .service(my_inner_service);
//! ```
//!
//! ## Pipeline
//!
//! 1. a matching bypass rule forwards the request untouched
//! 2. a missing credential answers the configured missing-credential status
//! 3. the credential is verified once, never retried:
//!    - `Success`: [`UserInfo`](crate::UserInfo) and
//!      [`UserToken`](crate::context::UserToken) are inserted into the request
//!      extensions and the request is forwarded
//!    - `Unauthorized`: 401
//!    - `ProviderError`: the provider's status and body
//!    - `TransportError`: 500

mod layer;
mod service;

pub use layer::AuthCheckLayer;
pub use service::{AuthCheckFuture, AuthCheckService};
