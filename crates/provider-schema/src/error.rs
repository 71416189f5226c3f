//! Attribute access errors

use thiserror::Error;

/// Errors raised when reading typed values out of `ResourceData`
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A value the callback needs is absent
    #[error("attribute {0} is required but not set")]
    MissingAttribute(String),

    /// A value is present but has the wrong type
    #[error("attribute {attribute} must be {expected}")]
    WrongType {
        attribute: String,
        expected: &'static str,
    },
}
