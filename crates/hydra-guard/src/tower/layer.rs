//! Tower Layer implementation for the auth check

use std::sync::Arc;

use tower::Layer;

use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::userinfo::Verifier;

use super::service::AuthCheckService;

/// Tower layer producing [`AuthCheckService`]s
#[derive(Debug, Clone)]
pub struct AuthCheckLayer {
    config: Arc<ClientConfig>,
    verifier: Arc<dyn Verifier>,
}

impl AuthCheckLayer {
    /// Create the layer
    ///
    /// # Errors
    /// Returns [`ConfigError::NoCredentialTransport`] if the configuration has
    /// neither a cookie nor a header name, since tokens could never be read back.
    pub fn new(config: Arc<ClientConfig>, verifier: Arc<dyn Verifier>) -> Result<Self, ConfigError> {
        if !config.transport().is_readable() {
            return Err(ConfigError::NoCredentialTransport);
        }
        Ok(Self { config, verifier })
    }

    /// Configuration shared with the produced services
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl<S> Layer<S> for AuthCheckLayer {
    type Service = AuthCheckService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthCheckService::new(inner, Arc::clone(&self.config), Arc::clone(&self.verifier))
    }
}
