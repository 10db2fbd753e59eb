//! Auth-initiation endpoint

use std::convert::Infallible;
use std::future::{Ready, ready};
use std::sync::Arc;
use std::task::{Context, Poll};

use http::header::{HeaderValue, LOCATION};
use http::request::Parts;
use http::{Request, Response, StatusCode};
use tower_service::Service;
use tracing::{debug, error};

use crate::config::ClientConfig;
use crate::error::FlowError;
use crate::oauth2::AuthorizationClient;
use crate::response::status_response;

/// Redirects the user agent to the provider's authorization endpoint
///
/// The redirect carries a state value derived from the request by the configured
/// [`StateCodec`](crate::state::StateCodec).
#[derive(Debug, Clone)]
pub struct AuthorizeService {
    config: Arc<ClientConfig>,
    client: Arc<dyn AuthorizationClient>,
}

impl AuthorizeService {
    /// Create the service
    pub fn new(config: Arc<ClientConfig>, client: Arc<dyn AuthorizationClient>) -> Self {
        Self { config, client }
    }

    /// 302 to the authorization URL, or 400 if no state can be produced
    pub fn handle(&self, req: &Parts) -> Response<String> {
        match self.redirect(req) {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    FlowError::InternalInvariant(detail) => error!(%detail, "cannot redirect"),
                    other => debug!(error = %other, "state generation failed"),
                }
                e.into_response()
            }
        }
    }

    fn redirect(&self, req: &Parts) -> Result<Response<String>, FlowError> {
        let state = self.config.state_codec().generate(req)?;
        let url = self.client.authorization_url(&state);
        let location = HeaderValue::from_str(url.as_str())
            .map_err(|e| FlowError::InternalInvariant(format!("invalid authorization URL: {e}")))?;

        let mut response = status_response(StatusCode::FOUND);
        response.headers_mut().insert(LOCATION, location);
        Ok(response)
    }
}

impl<B> Service<Request<B>> for AuthorizeService {
    type Response = Response<String>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let (parts, _) = req.into_parts();
        ready(Ok(self.handle(&parts)))
    }
}
