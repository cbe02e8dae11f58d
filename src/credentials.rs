//! API-key resolution.
//!
//! The key comes from the host-supplied configuration when present, and
//! otherwise from the environment variables the package schema declares as
//! fallbacks for the `apiKey` input property.

use std::collections::HashMap;
use std::fmt;

use crate::error::ProviderError;

/// Where a resolved API key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// The explicit configuration entry.
    Config,
    /// The named environment variable.
    Environment(String),
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "provider configuration"),
            CredentialSource::Environment(name) => write!(f, "environment variable {}", name),
        }
    }
}

/// A resolved, non-empty API key.
///
/// The `Debug` form never prints the key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    value: String,
    source: CredentialSource,
}

impl ApiKey {
    /// The key itself.
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Where the key came from.
    pub fn source(&self) -> &CredentialSource {
        &self.source
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Read a variable from the process environment.
///
/// Unset and non-unicode variables both read as `None`.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Resolve the API key.
///
/// An explicit `config_key` entry in `config` wins over the environment.
/// Otherwise every name in `env_vars` is looked up in order and the last
/// non-empty value is kept. Fails with a configuration error when neither
/// path yields a non-empty key.
pub fn resolve_api_key<F>(
    config: &HashMap<String, String>,
    config_key: &str,
    env_vars: &[String],
    lookup: F,
) -> Result<ApiKey, ProviderError>
where
    F: Fn(&str) -> Option<String>,
{
    let resolved = match config.get(config_key) {
        Some(value) => Some(ApiKey {
            value: value.clone(),
            source: CredentialSource::Config,
        }),
        None => {
            let mut found = None;
            // Later names overwrite earlier matches.
            for name in env_vars {
                if let Some(value) = lookup(name.as_str()).filter(|v| !v.is_empty()) {
                    found = Some(ApiKey {
                        value,
                        source: CredentialSource::Environment(name.clone()),
                    });
                }
            }
            found
        }
    };

    resolved
        .filter(|key| !key.value.is_empty())
        .ok_or_else(|| ProviderError::Configuration("api key is required".to_string()))
}

/// Build the `Authorization` header value for a key.
pub fn authorization_header(scheme_prefix: &str, credential: &str) -> String {
    format!("{} {}", scheme_prefix, credential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{API_KEY_CONFIG_KEY, AUTH_SCHEME_PREFIX};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn config(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_entry_wins_over_env() {
        let key = resolve_api_key(
            &config(&[(API_KEY_CONFIG_KEY, "abc")]),
            API_KEY_CONFIG_KEY,
            &names(&["XYZ_APIKEY"]),
            env(&[("XYZ_APIKEY", "zzz")]),
        )
        .unwrap();

        assert_eq!(key.expose(), "abc");
        assert_eq!(key.source(), &CredentialSource::Config);
    }

    #[test]
    fn test_env_fallback() {
        let key = resolve_api_key(
            &HashMap::new(),
            API_KEY_CONFIG_KEY,
            &names(&["XYZ_APIKEY"]),
            env(&[("XYZ_APIKEY", "from-env")]),
        )
        .unwrap();

        assert_eq!(key.expose(), "from-env");
        assert_eq!(
            key.source(),
            &CredentialSource::Environment("XYZ_APIKEY".to_string())
        );
    }

    #[test]
    fn test_last_non_empty_env_wins() {
        let key = resolve_api_key(
            &HashMap::new(),
            API_KEY_CONFIG_KEY,
            &names(&["XYZ_APIKEY", "XYZ_API_KEY"]),
            env(&[("XYZ_APIKEY", "a"), ("XYZ_API_KEY", "b")]),
        )
        .unwrap();
        assert_eq!(key.expose(), "b");

        // An empty later variable does not clear an earlier match.
        let key = resolve_api_key(
            &HashMap::new(),
            API_KEY_CONFIG_KEY,
            &names(&["XYZ_APIKEY", "XYZ_API_KEY"]),
            env(&[("XYZ_APIKEY", "a"), ("XYZ_API_KEY", "")]),
        )
        .unwrap();
        assert_eq!(key.expose(), "a");
    }

    #[test]
    fn test_empty_env_fails() {
        let err = resolve_api_key(
            &HashMap::new(),
            API_KEY_CONFIG_KEY,
            &names(&["XYZ_APIKEY"]),
            env(&[("XYZ_APIKEY", "")]),
        )
        .unwrap_err();

        assert!(matches!(err, ProviderError::Configuration(_)));
        assert_eq!(err.message(), "api key is required");
    }

    #[test]
    fn test_no_fallbacks_declared_fails() {
        let err = resolve_api_key(
            &HashMap::new(),
            API_KEY_CONFIG_KEY,
            &[],
            env(&[("XYZ_APIKEY", "ignored")]),
        )
        .unwrap_err();
        assert_eq!(err.message(), "api key is required");
    }

    #[test]
    fn test_empty_config_entry_fails() {
        let err = resolve_api_key(
            &config(&[(API_KEY_CONFIG_KEY, "")]),
            API_KEY_CONFIG_KEY,
            &names(&["XYZ_APIKEY"]),
            env(&[("XYZ_APIKEY", "zzz")]),
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = resolve_api_key(
            &config(&[(API_KEY_CONFIG_KEY, "super-secret")]),
            API_KEY_CONFIG_KEY,
            &[],
            env(&[]),
        )
        .unwrap();

        let debug = format!("{:?}", key);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_authorization_header() {
        assert_eq!(
            authorization_header(AUTH_SCHEME_PREFIX, "abc"),
            "Bearer abc"
        );
        assert_eq!(authorization_header("Token", "k-1"), "Token k-1");
    }

    #[test]
    fn test_source_display() {
        assert_eq!(CredentialSource::Config.to_string(), "provider configuration");
        assert_eq!(
            CredentialSource::Environment("XYZ_APIKEY".to_string()).to_string(),
            "environment variable XYZ_APIKEY"
        );
    }
}
