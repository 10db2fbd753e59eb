//! Authorization code flow endpoints
//!
//! - [`AuthorizeService`] starts the flow by redirecting to the provider
//! - [`CallbackService`] finishes it by validating state, exchanging the code and
//!   committing the token to the configured transport
//!
//! Both are tower services that never fail: every error is resolved into a
//! response where it is detected.

pub mod authorize;
pub mod callback;

pub use authorize::AuthorizeService;
pub use callback::CallbackService;
