//! Common test utilities for integration tests
//!
//! A wiremock identity provider with token and userinfo endpoints, plus request
//! and configuration helpers shared across the flow tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use hydra_guard::{ClientConfig, OAuth2Client, OAuth2Config};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path},
};

pub const STATE_SECRET: &str = "integration-secret";
pub const USER_AGENT: &str = "Mozilla/5.0 (integration)";
pub const CLIENT_ADDR: &str = "203.0.113.7";

/// Mock identity provider
pub struct MockProvider {
    pub server: MockServer,
    pub token_endpoint: String,
    pub authorize_endpoint: String,
    pub userinfo_endpoint: String,
}

impl MockProvider {
    /// Start a new mock provider
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();

        Self {
            server,
            token_endpoint: format!("{}/oauth2/token", base_url),
            authorize_endpoint: format!("{}/oauth2/auth", base_url),
            userinfo_endpoint: format!("{}/userinfo", base_url),
        }
    }

    /// Successful code exchange
    pub async fn mock_token_success(&self, access_token: &str) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": access_token,
                "token_type": "bearer",
                "expires_in": 3600,
                "scope": "openid profile",
            })))
            .mount(&self.server)
            .await;
    }

    /// Code exchange rejected with an OAuth2 error response
    pub async fn mock_token_error(&self, error: &str, description: &str) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": error,
                "error_description": description,
            })))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint failing with an arbitrary status and raw body
    pub async fn mock_token_status(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint answering with something that is not a token response
    pub async fn mock_token_garbage(&self) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&self.server)
            .await;
    }

    /// Userinfo accepting exactly `token`
    pub async fn mock_userinfo(&self, token: &str, claims: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(claims))
            .mount(&self.server)
            .await;
    }

    /// Userinfo answering every request with `status` and `body`
    pub async fn mock_userinfo_status(&self, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Userinfo that answers too late
    pub async fn mock_userinfo_delay(&self, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"sub": "late"}))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Provider registration pointing at this server
    pub fn oauth2_config(&self) -> OAuth2Config {
        OAuth2Config {
            client_id: "integration-app".to_string(),
            client_secret: Some(secrecy::SecretString::new("integration-secret".to_string())),
            auth_url: self.authorize_endpoint.clone(),
            token_url: self.token_endpoint.clone(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            scopes: vec!["openid".to_string(), "profile".to_string()],
        }
    }

    /// oauth2-rs client against this server
    pub fn oauth2_client(&self) -> Arc<OAuth2Client> {
        Arc::new(OAuth2Client::new(&self.oauth2_config(), Duration::from_secs(5)).unwrap())
    }

    /// Cookie-transport client configuration against this server
    pub fn cookie_config(&self, cookie: &str) -> Arc<ClientConfig> {
        Arc::new(
            ClientConfig::builder()
                .cookie_name(cookie)
                .state_secret(STATE_SECRET)
                .userinfo_endpoint(self.userinfo_endpoint.clone())
                .request_timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
        )
    }
}

/// Browser-like request from the integration client
pub fn browser_request(uri: &str) -> http::Request<String> {
    http::Request::builder()
        .uri(uri)
        .header("x-forwarded-for", CLIENT_ADDR)
        .header("user-agent", USER_AGENT)
        .header("host", "app.example.com")
        .body(String::new())
        .unwrap()
}
