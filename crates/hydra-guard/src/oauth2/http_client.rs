//! Token endpoint transport
//!
//! oauth2-rs builds the token request as an `http::Request<Vec<u8>>` and leaves
//! sending it to an [`AsyncHttpClient`]. [`TokenHttpClient`] sends it with
//! reqwest. Redirects are not followed, so the token endpoint cannot forward the
//! authorization code elsewhere, and every call is bounded by a timeout.

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::time::Duration;

use http::StatusCode;

use oauth2::{AsyncHttpClient, HttpRequest, HttpResponse};

/// reqwest transport for token requests
#[derive(Clone)]
pub struct TokenHttpClient {
    client: reqwest::Client,
}

/// Failure sending a token request or reading its response
#[derive(Debug, thiserror::Error)]
pub enum TokenHttpError {
    /// Connect, TLS, timeout or body read failure
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// reqwest produced a response `http` would not accept
    #[error("invalid token response: {0}")]
    Response(#[from] http::Error),
}

type TokenHttpFuture<'c> =
    Pin<Box<dyn Future<Output = Result<HttpResponse, TokenHttpError>> + Send + 'c>>;

impl TokenHttpClient {
    /// Build a transport that never follows redirects
    ///
    /// # Errors
    /// Returns the reqwest error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map(|client| Self { client })
    }

    /// Use a preconfigured reqwest client
    ///
    /// Redirect following should be disabled on `client`.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TokenHttpError> {
        let (head, body) = request.into_parts();
        let response = self
            .client
            .request(head.method, head.uri.to_string())
            .headers(head.headers)
            .body(body)
            .send()
            .await?;

        let mut builder = http::Response::builder().status(response.status());
        for (name, value) in response.headers() {
            builder = builder.header(name, value);
        }
        let body = response.bytes().await?;
        Ok(builder.body(body.to_vec())?)
    }
}

impl std::fmt::Debug for TokenHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenHttpClient").finish_non_exhaustive()
    }
}

impl<'c> AsyncHttpClient<'c> for TokenHttpClient {
    type Error = TokenHttpError;
    type Future = TokenHttpFuture<'c>;

    fn call(&'c self, request: HttpRequest) -> Self::Future {
        Box::pin(self.send(request))
    }
}

/// One code exchange over a [`TokenHttpClient`], keeping the first non-2xx answer
///
/// oauth2-rs only hands back the error fields it knows, and none at all when the
/// body is not standard error JSON. The raw status and body stay available here.
pub(crate) struct ExchangeRecorder<'a> {
    client: &'a TokenHttpClient,
    rejection: OnceLock<(StatusCode, Vec<u8>)>,
}

impl<'a> ExchangeRecorder<'a> {
    pub(crate) fn new(client: &'a TokenHttpClient) -> Self {
        Self {
            client,
            rejection: OnceLock::new(),
        }
    }

    /// Status and raw body of the provider's error response, if it sent one
    pub(crate) fn into_rejection(self) -> Option<(StatusCode, Vec<u8>)> {
        self.rejection.into_inner()
    }
}

impl<'a, 'c> AsyncHttpClient<'c> for ExchangeRecorder<'a> {
    type Error = TokenHttpError;
    type Future = TokenHttpFuture<'c>;

    fn call(&'c self, request: HttpRequest) -> Self::Future {
        Box::pin(async move {
            let response = self.client.send(request).await?;
            if !response.status().is_success() {
                let _ = self
                    .rejection
                    .set((response.status(), response.body().clone()));
            }
            Ok(response)
        })
    }
}
