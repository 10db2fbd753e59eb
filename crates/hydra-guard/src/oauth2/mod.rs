//! OAuth2 authorization code client
//!
//! - `client` - [`AuthorizationClient`] trait and the oauth2-rs backed [`OAuth2Client`]
//! - `http_client` - reqwest adapter for oauth2 token requests

pub mod client;
pub mod http_client;

pub use client::{AuthorizationClient, OAuth2Client};
pub use http_client::TokenHttpClient;
