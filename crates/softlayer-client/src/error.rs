//! SoftLayer client errors

use thiserror::Error;

/// Faults the API raises while another change on the same object is still
/// running. Retrying after a pause succeeds once the change settles.
pub const TRANSIENT_FAULTS: &[&str] = &[
    "Operation already in progress",
    "SoftLayer_Exception_Network_Storage_Group_MassAccessControlModification",
    "There is currently an active transaction",
];

/// Faults raised when cancelling a billing item that is already gone or
/// already scheduled for cancellation.
pub const ALREADY_CANCELLED_FAULTS: &[&str] = &[
    "SoftLayer_Exception_NotFound",
    "SoftLayer_Exception_ObjectNotFound",
    "cancellation request already exists",
    "already been cancelled",
    "Billing item is already cancelled",
];

/// Errors that can occur when interacting with the SoftLayer API
#[derive(Debug, Error)]
pub enum SoftLayerError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// SoftLayer API returned a fault
    #[error("SoftLayer API error ({status} {code}): {message}")]
    Api {
        /// HTTP status of the response
        status: u16,
        /// SoftLayer exception class, e.g. `SoftLayer_Exception_Public`
        code: String,
        /// Human readable fault message
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (bad username or API key)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found (HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SoftLayerError {
    /// Build an API fault from its parts
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// True when the remote object does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api { status, code, .. } => {
                *status == 404 || code == "SoftLayer_Exception_ObjectNotFound"
            }
            _ => false,
        }
    }

    /// SoftLayer exception class, when the error came from an API fault
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    /// True when the fault code equals `fault` or the message contains it
    pub fn matches_fault(&self, fault: &str) -> bool {
        match self {
            Self::Api { code, message, .. } => code == fault || message.contains(fault),
            Self::NotFound(message) | Self::InvalidRequest(message) => message.contains(fault),
            _ => false,
        }
    }

    /// True when the fault is one of the known transient faults
    pub fn is_transient(&self) -> bool {
        TRANSIENT_FAULTS.iter().any(|fault| self.matches_fault(fault))
    }

    /// True when a cancel request failed because the item is already cancelled
    pub fn is_already_cancelled(&self) -> bool {
        self.is_not_found()
            || ALREADY_CANCELLED_FAULTS
                .iter()
                .any(|fault| self.matches_fault(fault))
    }
}
