//! Callback endpoint
//!
//! Terminal on the first failing step:
//!
//! 1. `code`, `scope` and `state` query parameters must be present (400)
//! 2. `state` must validate against this request (401, before any network call)
//! 3. the code is exchanged with the provider (401 with the provider body on
//!    rejection, 500 otherwise)
//! 4. the access token is committed to the configured transport

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use cookie::Cookie;
use futures_util::future::BoxFuture;
use http::header::{HOST, HeaderValue, SET_COOKIE};
use http::request::Parts;
use http::{Request, Response, StatusCode};
use tower_service::Service;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::credential::CredentialTransport;
use crate::error::FlowError;
use crate::oauth2::AuthorizationClient;
use crate::response::{json_response, status_response};
use crate::types::TokenInfo;

/// Headers consulted, in order, for the scheme that decides the cookie `Secure` flag
const SCHEME_HINT_HEADERS: [&str; 3] = ["origin", "referer", "referrer"];

/// Header overriding the cookie `Domain`
const COOKIE_DOMAIN_HEADER: &str = "x-cookie-domain";

/// Completes the authorization code flow
#[derive(Debug, Clone)]
pub struct CallbackService {
    config: Arc<ClientConfig>,
    client: Arc<dyn AuthorizationClient>,
}

struct CallbackParams {
    code: String,
    state: String,
}

impl CallbackParams {
    fn from_query(query: Option<&str>) -> Result<Self, FlowError> {
        let query = query.unwrap_or_default();
        let param = |name: &str| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| FlowError::ClientRequest(format!("{name} required")))
        };

        let code = param("code")?;
        // provider-asserted; only presence is checked
        param("scope")?;
        let state = param("state")?;
        Ok(Self { code, state })
    }
}

impl CallbackService {
    /// Create the service
    pub fn new(config: Arc<ClientConfig>, client: Arc<dyn AuthorizationClient>) -> Self {
        Self { config, client }
    }

    /// Run the callback state machine for one request
    pub async fn handle(&self, req: &Parts) -> Response<String> {
        match self.complete(req).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    FlowError::CsrfMismatch => debug!("state mismatch on callback"),
                    FlowError::Transport(detail) => warn!(%detail, "callback failed"),
                    FlowError::InternalInvariant(detail) => error!(%detail, "callback failed"),
                    other => debug!(error = %other, "callback rejected"),
                }
                e.into_response()
            }
        }
    }

    async fn complete(&self, req: &Parts) -> Result<Response<String>, FlowError> {
        let params = CallbackParams::from_query(req.uri.query())?;

        if !self.config.state_codec().validate(&params.state, req) {
            return Err(FlowError::CsrfMismatch);
        }

        let token = self
            .client
            .exchange_code(&params.code)
            .await?
            .ok_or_else(|| FlowError::InternalInvariant("token is nil".to_string()))?;

        self.commit(req, token)
    }

    fn commit(&self, req: &Parts, token: TokenInfo) -> Result<Response<String>, FlowError> {
        match self.config.transport() {
            CredentialTransport::Cookie(name) => {
                let (secure, domain) = self.cookie_scope(req)?;
                debug!(cookie = %name, domain = ?domain, secure, "committing token to cookie");

                let mut builder = Cookie::build((name.clone(), token.access_token))
                    .http_only(true)
                    .secure(secure)
                    .path("/");
                if let Some(domain) = domain {
                    builder = builder.domain(domain);
                }
                let value = HeaderValue::from_str(&builder.build().to_string()).map_err(|e| {
                    FlowError::InternalInvariant(format!("token is not a valid cookie value: {e}"))
                })?;

                let mut response = status_response(StatusCode::OK);
                response.headers_mut().append(SET_COOKIE, value);
                Ok(response)
            }
            CredentialTransport::Header(name) => {
                debug!(header = %name, "committing token to header");
                let value = HeaderValue::from_str(&token.access_token).map_err(|e| {
                    FlowError::InternalInvariant(format!("token is not a valid header value: {e}"))
                })?;

                let mut response = status_response(StatusCode::OK);
                response.headers_mut().insert(name.clone(), value);
                Ok(response)
            }
            CredentialTransport::JsonBody => {
                debug!("returning token in response body");
                Ok(json_response(&token))
            }
        }
    }

    /// `Secure` flag and `Domain` for the token cookie
    fn cookie_scope(&self, req: &Parts) -> Result<(bool, Option<String>), FlowError> {
        let host = header_str(req, HOST.as_str())
            .or_else(|| req.uri.host())
            .map(|h| strip_port(h).to_string());

        if !self.config.trust_cookie_hints() {
            return Ok((self.config.secure_cookies(), host));
        }

        let secure = match SCHEME_HINT_HEADERS
            .iter()
            .find_map(|name| header_str(req, name))
        {
            Some(origin) => {
                let origin = Url::parse(origin)
                    .map_err(|_| FlowError::ClientRequest("invalid referrer".to_string()))?;
                origin.scheme() == "https"
            }
            None => false,
        };

        let domain = header_str(req, COOKIE_DOMAIN_HEADER)
            .map(str::to_string)
            .or(host);
        Ok((secure, domain))
    }
}

fn header_str<'a>(req: &'a Parts, name: &str) -> Option<&'a str> {
    req.headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

// Cookie domains carry no port
fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port))
            if !name.is_empty() && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name
        }
        _ => host,
    }
}

impl<B> Service<Request<B>> for CallbackService {
    type Response = Response<String>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let this = self.clone();
        let (parts, _) = req.into_parts();
        Box::pin(async move { Ok(this.handle(&parts).await) })
    }
}
