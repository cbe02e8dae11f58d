//! The Xyz provider's callback implementation.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::callback::{ConfigureRequest, ConfigureResponse, ProviderCallback};
use crate::credentials::{authorization_header, process_env, resolve_api_key, ApiKey};
use crate::error::ProviderError;
use crate::schema::PackageSpec;
use crate::types::{API_KEY_CONFIG_KEY, AUTH_SCHEME_PREFIX};

/// Reads an environment variable by name.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// The Xyz provider.
///
/// Only configuration and the authorization header are customised; every
/// other lifecycle hook keeps its default behaviour.
pub struct XyzProvider {
    name: String,
    version: String,
    env_vars: Vec<String>,
    api_key: OnceLock<ApiKey>,
    env: EnvLookup,
}

impl XyzProvider {
    /// Create a provider whose API-key fallbacks come from `schema`.
    pub fn new(name: impl Into<String>, version: impl Into<String>, schema: &PackageSpec) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            env_vars: schema.api_key_env_vars(),
            api_key: OnceLock::new(),
            env: Arc::new(process_env),
        }
    }

    /// Replace the environment lookup.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// The provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The provider version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Environment variables consulted for the API key.
    pub fn env_vars(&self) -> &[String] {
        &self.env_vars
    }

    /// Whether configure has completed.
    pub fn is_configured(&self) -> bool {
        self.api_key.get().is_some()
    }
}

impl fmt::Debug for XyzProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XyzProvider")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("env_vars", &self.env_vars)
            .field("api_key", &self.api_key.get())
            .finish()
    }
}

#[async_trait::async_trait]
impl ProviderCallback for XyzProvider {
    fn get_authorization_header(&self) -> Result<String, ProviderError> {
        let key = self.api_key.get().ok_or_else(|| {
            ProviderError::FailedPrecondition("provider has not been configured".to_string())
        })?;
        Ok(authorization_header(AUTH_SCHEME_PREFIX, key.expose()))
    }

    async fn on_configure(
        &self,
        req: &ConfigureRequest,
    ) -> Result<ConfigureResponse, ProviderError> {
        if self.is_configured() {
            return Err(ProviderError::FailedPrecondition(
                "provider is already configured".to_string(),
            ));
        }

        let key = resolve_api_key(&req.variables, API_KEY_CONFIG_KEY, &self.env_vars, |name| {
            (self.env)(name)
        })?;

        debug!("Configuring Xyz API key");
        info!(source = %key.source(), provider = %self.name, "API key resolved");

        self.api_key.set(key).map_err(|_| {
            ProviderError::FailedPrecondition("provider is already configured".to_string())
        })?;

        Ok(ConfigureResponse {
            accept_secrets: true,
        })
    }
}


#[cfg(test)]
mod process_env_tests {
    use super::*;
    use crate::schema::xyz_package;
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_reads_process_environment() {
        std::env::set_var("XYZ_APIKEY", "process-key");
        let provider = XyzProvider::new("xyz", "0.1.0", &xyz_package());

        let result = provider.on_configure(&ConfigureRequest::new()).await;
        std::env::remove_var("XYZ_APIKEY");

        result.unwrap();
        assert_eq!(
            provider.get_authorization_header().unwrap(),
            "Bearer process-key"
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_process_environment_fails() {
        std::env::remove_var("XYZ_APIKEY");
        let provider = XyzProvider::new("xyz", "0.1.0", &xyz_package());

        let err = provider
            .on_configure(&ConfigureRequest::new())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "api key is required");
    }
}
