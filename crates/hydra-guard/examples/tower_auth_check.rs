//! Example: Login flow and auth-check middleware
//!
//! Walks through the three endpoints with an in-process identity provider:
//! the login redirect, the callback that sets the session cookie, and a
//! protected route behind `AuthCheckLayer`.
//!
//! Run with:
//! ```sh
//! cargo run --example tower_auth_check
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{COOKIE, LOCATION, SET_COOKIE};
use http::{Request, Response};
use hydra_guard::context::user_info;
use hydra_guard::{
    AuthCheckLayer, AuthorizationClient, AuthorizeService, BypassRule, CallbackService,
    ClientConfig, ExchangeError, IdentityClaims, TokenInfo, UserInfo, VerificationOutcome,
    Verifier,
};
use tower::{ServiceBuilder, ServiceExt};
use url::Url;

/// Provider stand-in: every code exchanges for the same token
#[derive(Debug)]
struct DemoProvider;

const DEMO_TOKEN: &str = "demo-access-token";

#[async_trait]
impl AuthorizationClient for DemoProvider {
    fn authorization_url(&self, state: &str) -> Url {
        let mut url = Url::parse("https://id.example.com/oauth2/auth").expect("static URL");
        url.query_pairs_mut()
            .append_pair("client_id", "demo")
            .append_pair("state", state);
        url
    }

    async fn exchange_code(&self, _code: &str) -> Result<Option<TokenInfo>, ExchangeError> {
        Ok(Some(TokenInfo::bearer(DEMO_TOKEN)))
    }
}

#[async_trait]
impl Verifier for DemoProvider {
    async fn verify(&self, token: &str) -> VerificationOutcome {
        if token != DEMO_TOKEN {
            return VerificationOutcome::Unauthorized("unauthorized".to_string());
        }
        let mut claims = HashMap::new();
        claims.insert("sub".to_string(), "alice".into());
        VerificationOutcome::Success(UserInfo::new(claims))
    }
}

fn browser(uri: &str, cookie: Option<&str>) -> Request<String> {
    let mut builder = Request::builder()
        .uri(uri)
        .header("host", "app.example.com")
        .header("x-forwarded-for", "192.168.1.100")
        .header("user-agent", "demo-browser/1.0");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(String::new()).expect("valid request")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hydra_guard=debug")),
        )
        .init();

    println!("Hydra Guard login flow example\n");

    let config = Arc::new(
        ClientConfig::builder()
            .cookie_name("sid")
            .state_secret("example-state-secret")
            .userinfo_endpoint("https://id.example.com/userinfo")
            .bypass(BypassRule::new("^/health$", ["GET"])?)
            .build()?,
    );
    let provider = Arc::new(DemoProvider);

    // 1. Login redirect
    let response = AuthorizeService::new(config.clone(), provider.clone())
        .oneshot(browser("/login", None))
        .await?;
    let location = response.headers()[LOCATION].to_str()?.to_string();
    println!("1. GET /login -> {} {location}", response.status());

    let state = Url::parse(&location)?
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();

    // 2. Provider redirects back with code and state
    let response = CallbackService::new(config.clone(), provider.clone())
        .oneshot(browser(
            &format!("/callback?code=demo-code&scope=openid&state={state}"),
            None,
        ))
        .await?;
    let set_cookie = response.headers()[SET_COOKIE].to_str()?.to_string();
    println!("2. GET /callback -> {} Set-Cookie: {set_cookie}", response.status());

    // 3. Protected routes
    let app = ServiceBuilder::new()
        .layer(AuthCheckLayer::new(config, provider)?)
        .service_fn(|req: Request<String>| async move {
            let body = match user_info(req.extensions()) {
                Ok(info) => format!("hello {}", info.subject()),
                Err(_) => "ok".to_string(),
            };
            Ok::<_, Infallible>(Response::new(body))
        });

    let session = format!("sid={DEMO_TOKEN}");
    for (uri, cookie) in [
        ("/health", None),
        ("/profile", None),
        ("/profile", Some("sid=forged")),
        ("/profile", Some(session.as_str())),
    ] {
        let response = app.clone().oneshot(browser(uri, cookie)).await?;
        println!(
            "3. GET {uri} cookie={cookie:?} -> {} {}",
            response.status(),
            response.body()
        );
    }

    Ok(())
}
