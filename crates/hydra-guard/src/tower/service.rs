//! Tower Service implementation for the auth check

use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use http::{Request, Response, StatusCode};
use tower_service::Service;
use tracing::{debug, warn};

use crate::bypass::can_bypass;
use crate::config::ClientConfig;
use crate::context::insert_identity;
use crate::credential::extract_credential;
use crate::response::{error_response, raw_response, status_response};
use crate::types::VerificationOutcome;
use crate::userinfo::Verifier;

/// Future returned by [`AuthCheckService`]
pub type AuthCheckFuture<T, E> = BoxFuture<'static, Result<T, E>>;

/// Service verifying the request's access token before calling `S`
///
/// Rejections are ordinary responses; the error type is the inner service's.
#[derive(Debug, Clone)]
pub struct AuthCheckService<S> {
    inner: S,
    config: Arc<ClientConfig>,
    verifier: Arc<dyn Verifier>,
}

impl<S> AuthCheckService<S> {
    /// Wrap `inner`
    pub fn new(inner: S, config: Arc<ClientConfig>, verifier: Arc<dyn Verifier>) -> Self {
        Self {
            inner,
            config,
            verifier,
        }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }
}

fn rejection<ResBody: From<String>>(outcome: VerificationOutcome) -> Response<ResBody> {
    let response = match outcome {
        VerificationOutcome::Unauthorized(detail) => error_response(StatusCode::UNAUTHORIZED, &detail),
        VerificationOutcome::ProviderError { status, body } => raw_response(status, body),
        VerificationOutcome::TransportError(detail) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &detail)
        }
        VerificationOutcome::Success(_) => status_response(StatusCode::INTERNAL_SERVER_ERROR),
    };
    response.map(ResBody::from)
}

impl<S, B, ResBody> Service<Request<B>> for AuthCheckService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = AuthCheckFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let inner = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, inner);

        if can_bypass(self.config.bypasses(), req.method(), req.uri().path()) {
            debug!(method = %req.method(), path = req.uri().path(), "auth bypassed");
            return Box::pin(inner.call(req));
        }

        let Some(token) = extract_credential(self.config.transport(), req.headers()) else {
            debug!(path = req.uri().path(), "no credential on request");
            let response = status_response(self.config.missing_credential_status()).map(ResBody::from);
            return Box::pin(async move { Ok(response) });
        };

        let verifier = Arc::clone(&self.verifier);
        Box::pin(async move {
            match verifier.verify(&token).await {
                VerificationOutcome::Success(info) => {
                    insert_identity(req.extensions_mut(), info, token);
                    inner.call(req).await
                }
                outcome => {
                    match &outcome {
                        VerificationOutcome::TransportError(detail) => {
                            warn!(%detail, "token verification failed");
                        }
                        other => debug!(outcome = ?other, "token rejected"),
                    }
                    Ok(rejection(outcome))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bypass::BypassRule;
    use crate::context::{user_info, user_token};
    use crate::types::UserInfo;
    use async_trait::async_trait;
    use std::convert::Infallible;
    use tower::{Layer, ServiceExt, service_fn};

    #[derive(Debug)]
    struct FixedVerifier(VerificationOutcome);

    #[async_trait]
    impl Verifier for FixedVerifier {
        async fn verify(&self, _token: &str) -> VerificationOutcome {
            self.0.clone()
        }
    }

    async fn echo_identity(req: Request<String>) -> Result<Response<String>, Infallible> {
        let body = match user_info(req.extensions()) {
            Ok(info) => serde_json::to_string(info).unwrap(),
            Err(e) => e.to_string(),
        };
        Ok(Response::new(body))
    }

    fn service(
        outcome: VerificationOutcome,
    ) -> impl Service<Request<String>, Response = Response<String>, Error = Infallible> {
        let config = ClientConfig::builder()
            .header_name("x-access-token")
            .state_secret("secret")
            .userinfo_endpoint("https://id.example.com/userinfo")
            .bypass(BypassRule::new("^/health$", ["GET"]).unwrap())
            .build()
            .unwrap();
        crate::tower::AuthCheckLayer::new(Arc::new(config), Arc::new(FixedVerifier(outcome)))
            .unwrap()
            .layer(service_fn(echo_identity))
    }

    fn request(path: &str, token: Option<&str>) -> Request<String> {
        let mut builder = Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header("x-access-token", token);
        }
        builder.body(String::new()).unwrap()
    }

    #[tokio::test]
    async fn test_success_inserts_identity() {
        let info: UserInfo = serde_json::from_str(r#"{"sub":"user-1"}"#).unwrap();
        let config = ClientConfig::builder()
            .header_name("x-access-token")
            .state_secret("secret")
            .userinfo_endpoint("https://id.example.com/userinfo")
            .build()
            .unwrap();
        let expected = info.clone();
        let svc = AuthCheckService::new(
            service_fn(move |req: Request<String>| {
                let expected = expected.clone();
                async move {
                    assert_eq!(user_info(req.extensions()).unwrap(), &expected);
                    assert_eq!(user_token(req.extensions()).unwrap(), "tok123");
                    Ok::<_, Infallible>(Response::new("ok".to_string()))
                }
            }),
            Arc::new(config),
            Arc::new(FixedVerifier(VerificationOutcome::Success(info))),
        );

        let response = svc.oneshot(request("/api", Some("tok123"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "ok");
    }

    #[tokio::test]
    async fn test_bypass_leaves_extensions_empty() {
        let svc = service(VerificationOutcome::Unauthorized("unauthorized".into()));
        let response = svc.oneshot(request("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "missing user info");
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let svc = service(VerificationOutcome::Unauthorized("unauthorized".into()));
        let response = svc.oneshot(request("/api", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_passthrough() {
        let svc = service(VerificationOutcome::ProviderError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "down for maintenance".into(),
        });
        let response = svc.oneshot(request("/api", Some("tok123"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.body(), "down for maintenance");
    }

    #[tokio::test]
    async fn test_transport_error_is_500() {
        let svc = service(VerificationOutcome::TransportError("timed out".into()));
        let response = svc.oneshot(request("/api", Some("tok123"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body().contains("timed out"));
    }
}
