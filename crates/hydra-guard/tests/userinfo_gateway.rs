//! Userinfo verification against a mock provider

mod common;

use std::time::Duration;

use common::MockProvider;
use http::StatusCode;
use hydra_guard::{IdentityClaims, UserInfoVerifier, VerificationOutcome, Verifier};
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn verifier(provider: &MockProvider, timeout: Duration) -> UserInfoVerifier {
    UserInfoVerifier::new(Url::parse(&provider.userinfo_endpoint).unwrap(), timeout).unwrap()
}

#[tokio::test]
async fn test_token_sent_as_bearer() {
    let provider = MockProvider::start().await;
    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .and(header("authorization", "Bearer tok123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sub": "user-1"})))
        .expect(1)
        .mount(&provider.server)
        .await;

    let outcome = verifier(&provider, Duration::from_secs(5))
        .verify("tok123")
        .await;

    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_claims_are_kept_verbatim() {
    let provider = MockProvider::start().await;
    provider
        .mock_userinfo(
            "tok123",
            json!({
                "sub": "user-1",
                "email": "user@example.com",
                "groups": ["admin", "ops"],
                "uid": 9_000_000_000_i64,
            }),
        )
        .await;

    let outcome = verifier(&provider, Duration::from_secs(5))
        .verify("tok123")
        .await;

    let VerificationOutcome::Success(info) = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(info.subject(), "user-1");
    assert_eq!(info.get_string("email"), "user@example.com");
    assert_eq!(info.get("groups"), Some(&json!(["admin", "ops"])));
    assert_eq!(info.get_int64("uid"), 9_000_000_000);
    // does not fit in i32
    assert_eq!(info.get_int("uid"), 0);
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let provider = MockProvider::start().await;
    provider.mock_userinfo_status(401, r#"{"error":"invalid_token"}"#).await;

    let outcome = verifier(&provider, Duration::from_secs(5))
        .verify("bogus")
        .await;

    assert_eq!(outcome, VerificationOutcome::Unauthorized("unauthorized".to_string()));
}

#[tokio::test]
async fn test_forbidden_body_is_verbatim() {
    let provider = MockProvider::start().await;
    provider.mock_userinfo_status(403, "scope openid not granted\n").await;

    let outcome = verifier(&provider, Duration::from_secs(5))
        .verify("tok123")
        .await;

    assert_eq!(
        outcome,
        VerificationOutcome::ProviderError {
            status: StatusCode::FORBIDDEN,
            body: "scope openid not granted\n".to_string(),
        }
    );
}

#[tokio::test]
async fn test_non_json_success_is_transport_error() {
    let provider = MockProvider::start().await;
    provider.mock_userinfo_status(200, "<html>login</html>").await;

    let outcome = verifier(&provider, Duration::from_secs(5))
        .verify("tok123")
        .await;

    assert!(matches!(outcome, VerificationOutcome::TransportError(_)));
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let provider = MockProvider::start().await;
    provider.mock_userinfo_delay(Duration::from_secs(3)).await;

    let outcome = verifier(&provider, Duration::from_millis(200))
        .verify("tok123")
        .await;

    assert!(matches!(outcome, VerificationOutcome::TransportError(_)));
}

#[tokio::test]
async fn test_unreachable_provider_is_transport_error() {
    // nothing listens on the discard port
    let endpoint = Url::parse("http://127.0.0.1:9/userinfo").unwrap();
    let outcome = UserInfoVerifier::new(endpoint, Duration::from_secs(2))
        .unwrap()
        .verify("tok123")
        .await;

    assert!(matches!(outcome, VerificationOutcome::TransportError(_)));
}
