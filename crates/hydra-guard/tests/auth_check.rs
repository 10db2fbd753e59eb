//! Auth-check middleware integration tests
//!
//! The layer wraps a `service_fn` downstream that records whether it ran and what
//! identity it received; verification goes to a mock userinfo endpoint.

mod common;

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{MockProvider, STATE_SECRET};
use http::{Request, Response, StatusCode};
use hydra_guard::context::{user_info, user_token};
use hydra_guard::{
    AuthCheckLayer, BypassRule, ClientConfig, IdentityClaims, UserInfoVerifier,
};
use serde_json::json;
use tower::{Layer, Service, ServiceExt, service_fn};

fn downstream(
    calls: Arc<AtomicUsize>,
) -> impl Service<Request<String>, Response = Response<String>, Error = Infallible, Future: Send>
+ Clone
+ Send
+ 'static {
    service_fn(move |req: Request<String>| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let body = match (user_info(req.extensions()), user_token(req.extensions())) {
                (Ok(info), Ok(token)) => format!("{}:{}:{}", info.subject(), info.get_int("age"), token),
                (Err(e), _) => e.to_string(),
                (_, Err(e)) => e.to_string(),
            };
            Ok::<_, Infallible>(Response::new(body))
        }
    })
}

fn config(provider: &MockProvider, missing_status: u16) -> Arc<ClientConfig> {
    Arc::new(
        ClientConfig::builder()
            .cookie_name("sid")
            .state_secret(STATE_SECRET)
            .userinfo_endpoint(provider.userinfo_endpoint.clone())
            .missing_credential_status(missing_status)
            .request_timeout(Duration::from_millis(500))
            .bypass(BypassRule::new("^/health$", ["GET"]).unwrap())
            .build()
            .unwrap(),
    )
}

fn layer(config: Arc<ClientConfig>) -> AuthCheckLayer {
    let verifier = Arc::new(UserInfoVerifier::from_config(&config).unwrap());
    AuthCheckLayer::new(config, verifier).unwrap()
}

fn request(method: &str, uri: &str, cookie: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(String::new()).unwrap()
}

#[tokio::test]
async fn test_verified_identity_reaches_downstream() {
    // GIVEN: a provider that knows tok123
    let provider = MockProvider::start().await;
    provider
        .mock_userinfo("tok123", json!({"sub": "user-1", "age": "42", "tenant": "acme"}))
        .await;
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = layer(config(&provider, 401)).layer(downstream(calls.clone()));

    // WHEN: a request carries the session cookie
    let response = svc
        .oneshot(request("GET", "/api/me", Some("theme=dark; sid=tok123")))
        .await
        .unwrap();

    // THEN: downstream sees the provider's identity and the raw token
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "user-1:42:tok123");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bypass_skips_verification() {
    let provider = MockProvider::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = layer(config(&provider, 401)).layer(downstream(calls.clone()));

    let response = svc.oneshot(request("GET", "/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "missing user info");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(provider.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bypass_is_method_specific() {
    let provider = MockProvider::start().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = layer(config(&provider, 401)).layer(downstream(calls.clone()));

    let response = svc.oneshot(request("POST", "/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_cookie_uses_configured_status() {
    let provider = MockProvider::start().await;
    let calls = Arc::new(AtomicUsize::new(0));

    for (status, cookie) in [(401, None), (403, Some("other=1")), (403, Some("sid="))] {
        let svc = layer(config(&provider, status)).layer(downstream(calls.clone()));
        let response = svc.oneshot(request("GET", "/api/me", cookie)).await.unwrap();
        assert_eq!(response.status().as_u16(), status);
        assert!(response.body().is_empty());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(provider.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_token_is_401() {
    let provider = MockProvider::start().await;
    provider.mock_userinfo_status(401, "token expired").await;
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = layer(config(&provider, 401)).layer(downstream(calls.clone()));

    let response = svc
        .oneshot(request("GET", "/api/me", Some("sid=stale")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = serde_json::from_str(response.body()).unwrap();
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_provider_error_is_passed_through() {
    let provider = MockProvider::start().await;
    provider
        .mock_userinfo_status(503, r#"{"error":"temporarily_unavailable"}"#)
        .await;
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = layer(config(&provider, 401)).layer(downstream(calls.clone()));

    let response = svc
        .oneshot(request("GET", "/api/me", Some("sid=tok123")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.body(), r#"{"error":"temporarily_unavailable"}"#);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_slow_provider_times_out_as_500() {
    let provider = MockProvider::start().await;
    provider.mock_userinfo_delay(Duration::from_secs(3)).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = layer(config(&provider, 401)).layer(downstream(calls.clone()));

    let response = svc
        .oneshot(request("GET", "/api/me", Some("sid=tok123")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_verification_is_not_retried() {
    let provider = MockProvider::start().await;
    provider.mock_userinfo_status(500, "boom").await;
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = layer(config(&provider, 401)).layer(downstream(calls.clone()));

    let response = svc
        .oneshot(request("GET", "/api/me", Some("sid=tok123")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body(), "boom");
    assert_eq!(provider.server.received_requests().await.unwrap().len(), 1);
}

#[test]
fn test_layer_rejects_json_body_transport() {
    let config = Arc::new(
        ClientConfig::builder()
            .state_secret(STATE_SECRET)
            .userinfo_endpoint("https://id.example.com/userinfo")
            .build()
            .unwrap(),
    );
    let verifier = Arc::new(UserInfoVerifier::from_config(&config).unwrap());
    assert!(matches!(
        AuthCheckLayer::new(config, verifier),
        Err(hydra_guard::ConfigError::NoCredentialTransport)
    ));
}
