//! Provider error types.
//!
//! Client faults are wrapped unchanged so callers can still classify them
//! (not found, transient, already cancelled). Everything the provider itself
//! detects gets its own variant.

use provider_schema::SchemaError;
use softlayer_client::SoftLayerError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while running a resource callback
#[derive(Debug, Error)]
pub enum ProviderError {
    /// SoftLayer API error
    #[error("SoftLayer error: {0}")]
    Api(#[from] SoftLayerError),

    /// Provider or resource configuration is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configured attribute is missing or has an unusable value
    #[error("Invalid value for {attribute}: {message}")]
    Validation { attribute: String, message: String },

    /// A provisioning wait ran out of time
    #[error(
        "Timed out after {timeout:?} waiting for {action} of {resource_id} (last state: {last_state})"
    )]
    Timeout {
        action: String,
        resource_id: String,
        timeout: Duration,
        last_state: String,
    },

    /// No standard price matches the requested item
    #[error("No matching price: {0}")]
    NoMatchingPrice(String),

    /// Product package not found by key name
    #[error("Product package not found: {0}")]
    PackageNotFound(String),

    /// The API answered with something the provider cannot use
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The callback needs a resource ID but none is set
    #[error("Resource ID is not set")]
    MissingId,

    /// The resource ID cannot be parsed
    #[error("Invalid resource ID: {0}")]
    InvalidId(String),

    /// No resource is registered under this type name
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),
}

impl From<SchemaError> for ProviderError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::MissingAttribute(attribute) => Self::Validation {
                attribute,
                message: "is required but not set".to_string(),
            },
            SchemaError::WrongType {
                attribute,
                expected,
            } => Self::Validation {
                attribute,
                message: format!("must be {}", expected),
            },
        }
    }
}

impl ProviderError {
    pub fn validation(attribute: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            attribute: attribute.to_string(),
            message: message.into(),
        }
    }

    /// True when the underlying API fault is a known transient fault
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_transient())
    }

    /// True when the underlying API fault reports a missing object
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_errors_become_validation_errors() {
        let err: ProviderError = SchemaError::MissingAttribute("hostname".to_string()).into();
        assert_eq!(err.to_string(), "Invalid value for hostname: is required but not set");

        let err: ProviderError = SchemaError::WrongType {
            attribute: "cores".to_string(),
            expected: "an integer",
        }
        .into();
        assert!(matches!(err, ProviderError::Validation { ref attribute, .. } if attribute == "cores"));
    }

    #[test]
    fn test_classification_follows_client_error() {
        let transient: ProviderError =
            SoftLayerError::api(500, "SoftLayer_Exception_Public", "Operation already in progress").into();
        assert!(transient.is_transient());
        assert!(!transient.is_not_found());

        let missing: ProviderError = SoftLayerError::NotFound("gone".to_string()).into();
        assert!(missing.is_not_found());
        assert!(!ProviderError::MissingId.is_transient());
    }

    #[test]
    fn test_timeout_message_names_action_and_state() {
        let err = ProviderError::Timeout {
            action: "provisioning".to_string(),
            resource_id: "42".to_string(),
            timeout: Duration::from_secs(5),
            last_state: "1 active transaction".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("provisioning of 42"));
        assert!(message.contains("1 active transaction"));
    }
}
