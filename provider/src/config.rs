//! Provider configuration
//!
//! Credentials and endpoint come from the provider block, falling back to the
//! environment. Configured attributes always win over environment values.

use crate::error::ProviderError;
use serde::Deserialize;
use serde_json::{Map, Value};
use softlayer_client::DEFAULT_ENDPOINT;
use std::env;
use std::time::Duration;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings needed to build the API client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub username: String,
    pub api_key: String,
    pub endpoint_url: String,
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            api_key: String::new(),
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Provider block attributes; absent keys leave the current value alone
#[derive(Debug, Default, Deserialize)]
struct ProviderAttributes {
    username: Option<String>,
    api_key: Option<String>,
    endpoint_url: Option<String>,
    timeout: Option<u64>,
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

impl ProviderConfig {
    /// Load defaults from the environment
    ///
    /// Reads `SOFTLAYER_USERNAME` (or `SL_USERNAME`), `SOFTLAYER_API_KEY`
    /// (or `SL_API_KEY`), `SOFTLAYER_ENDPOINT_URL` and `SOFTLAYER_TIMEOUT`.
    pub fn from_env() -> Result<Self, ProviderError> {
        let mut config = Self::default();
        if let Some(username) = first_env(&["SOFTLAYER_USERNAME", "SL_USERNAME"]) {
            config.username = username;
        }
        if let Some(api_key) = first_env(&["SOFTLAYER_API_KEY", "SL_API_KEY"]) {
            config.api_key = api_key;
        }
        if let Some(endpoint) = first_env(&["SOFTLAYER_ENDPOINT_URL"]) {
            config.endpoint_url = endpoint;
        }
        if let Some(timeout) = first_env(&["SOFTLAYER_TIMEOUT"]) {
            config.timeout_secs = timeout.parse().map_err(|_| {
                ProviderError::InvalidConfig(format!(
                    "SOFTLAYER_TIMEOUT must be a number of seconds, got {:?}",
                    timeout
                ))
            })?;
        }
        Ok(config)
    }

    /// Override values with the attributes set in the provider block
    pub fn merge_attributes(&mut self, attributes: &Map<String, Value>) -> Result<(), ProviderError> {
        let attrs: ProviderAttributes = serde_json::from_value(Value::Object(attributes.clone()))
            .map_err(|e| ProviderError::InvalidConfig(format!("provider block: {}", e)))?;

        let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        if let Some(username) = non_blank(attrs.username) {
            self.username = username;
        }
        if let Some(api_key) = non_blank(attrs.api_key) {
            self.api_key = api_key;
        }
        if let Some(endpoint) = non_blank(attrs.endpoint_url) {
            self.endpoint_url = endpoint;
        }
        if let Some(timeout) = attrs.timeout {
            self.timeout_secs = timeout;
        }
        Ok(())
    }

    /// Check the configuration is complete enough to build a client
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.username.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "username is required: set it in the provider block or export SOFTLAYER_USERNAME".to_string(),
            ));
        }
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::InvalidConfig(
                "api_key is required: set it in the provider block or export SOFTLAYER_API_KEY".to_string(),
            ));
        }
        if !self.endpoint_url.starts_with("http://") && !self.endpoint_url.starts_with("https://") {
            return Err(ProviderError::InvalidConfig(format!(
                "endpoint_url must be an http(s) URL, got {:?}",
                self.endpoint_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ProviderError::InvalidConfig(
                "timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn configured() -> ProviderConfig {
        ProviderConfig {
            username: "sl-user".to_string(),
            api_key: "key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.endpoint_url, "https://api.softlayer.com/rest/v3.1");
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_attributes_override_values() {
        let mut config = configured();
        let attrs = json!({"username": "other", "timeout": 120, "api_key": "  "});
        config.merge_attributes(attrs.as_object().unwrap()).unwrap();

        assert_eq!(config.username, "other");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_bad_attribute_type_is_reported() {
        let mut config = configured();
        let attrs = json!({"timeout": "soon"});
        let err = config.merge_attributes(attrs.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let err = ProviderConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("SOFTLAYER_USERNAME"));

        let mut config = configured();
        config.api_key.clear();
        assert!(config.validate().unwrap_err().to_string().contains("SOFTLAYER_API_KEY"));

        let mut config = configured();
        config.endpoint_url = "api.softlayer.com".to_string();
        assert!(config.validate().is_err());

        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_deserializes_from_provider_block() {
        let config: ProviderConfig =
            serde_json::from_value(json!({"username": "u", "api_key": "k", "timeout": 30})).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.endpoint_url, DEFAULT_ENDPOINT);
    }
}
