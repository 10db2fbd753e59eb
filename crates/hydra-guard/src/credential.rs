//! Credential transport and extraction
//!
//! The access token travels between the callback response and later requests in
//! exactly one transport. A cookie name takes precedence over a header name; with
//! neither, the callback falls back to returning the token as a JSON body and the
//! auth-check middleware cannot be built.

use cookie::Cookie;
use http::HeaderMap;
use http::header::{COOKIE, HeaderName};

/// Where the access token is committed and read back from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialTransport {
    /// `Set-Cookie` on the callback, `Cookie` on later requests
    Cookie(String),
    /// A named response header on the callback, the same request header later
    Header(HeaderName),
    /// JSON body on the callback, for applications that store the token themselves
    JsonBody,
}

impl CredentialTransport {
    /// Whether later requests can carry the token back
    #[must_use]
    pub fn is_readable(&self) -> bool {
        !matches!(self, Self::JsonBody)
    }
}

/// Pull the bearer token out of request headers
///
/// Absent cookies or headers, empty values, and non-UTF-8 header values are all
/// treated as no credential.
#[must_use]
pub fn extract_credential(transport: &CredentialTransport, headers: &HeaderMap) -> Option<String> {
    let token = match transport {
        CredentialTransport::Cookie(name) => find_cookie(headers, name),
        CredentialTransport::Header(name) => headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        CredentialTransport::JsonBody => None,
    };
    token.filter(|t| !t.is_empty())
}

fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}
