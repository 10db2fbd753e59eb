//! Request-scoped identity
//!
//! After a successful auth check the middleware stores the provider's
//! [`UserInfo`] and the raw access token in the request extensions. Downstream
//! handlers read them back with [`user_info`] and [`user_token`].
//!
//! ```
//! use hydra_guard::context::{insert_identity, user_info, user_token};
//! use hydra_guard::{IdentityClaims, UserInfo};
//!
//! let mut req = http::Request::new(());
//! let info: UserInfo = serde_json::from_str(r#"{"sub":"user-1"}"#).unwrap();
//! insert_identity(req.extensions_mut(), info, "tok123".to_string());
//!
//! assert_eq!(user_info(req.extensions()).unwrap().subject(), "user-1");
//! assert_eq!(user_token(req.extensions()).unwrap(), "tok123");
//! ```

use http::Extensions;

use crate::error::ContextError;
use crate::types::UserInfo;

/// The verified access token of the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserToken(pub String);

impl UserToken {
    /// Token value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Store a verified identity in request extensions
pub fn insert_identity(extensions: &mut Extensions, info: UserInfo, token: String) {
    extensions.insert(info);
    extensions.insert(UserToken(token));
}

/// Verified identity of the current request
///
/// # Errors
///
/// Returns [`ContextError::MissingUserInfo`] when the request did not pass through
/// the auth check, or was bypassed.
pub fn user_info(extensions: &Extensions) -> Result<&UserInfo, ContextError> {
    extensions
        .get::<UserInfo>()
        .ok_or(ContextError::MissingUserInfo)
}

/// Verified access token of the current request
///
/// # Errors
///
/// Returns [`ContextError::MissingUserToken`] when the request did not pass through
/// the auth check, or was bypassed.
pub fn user_token(extensions: &Extensions) -> Result<&str, ContextError> {
    extensions
        .get::<UserToken>()
        .map(UserToken::as_str)
        .ok_or(ContextError::MissingUserToken)
}
