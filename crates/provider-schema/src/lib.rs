//! Provider Schema Definitions
//!
//! Declarative attribute schemas for provider resources, plus the attribute
//! bag (`ResourceData`) that resource callbacks read configuration from and
//! write state into.
//!
//! # Example
//!
//! ```
//! use provider_schema::{Attribute, ResourceData, Schema, validators};
//! use serde_json::json;
//!
//! let schema = Schema::new()
//!     .attribute("name", Attribute::string().required().force_new())
//!     .attribute("ttl", Attribute::int().optional().default(900).validate_with(validators::int_between(60, 86400)))
//!     .attribute("serial", Attribute::int().computed());
//!
//! let config = json!({"name": "example.com"});
//! let config = config.as_object().cloned().unwrap_or_default();
//! assert!(schema.validate(&config).is_empty());
//!
//! let mut data = ResourceData::create(&schema, config);
//! assert_eq!(data.get_i64("ttl"), Some(900));
//! data.set("serial", 2026101501);
//! data.set_id("42");
//! assert!(data.missing_computed(&schema).is_empty());
//! ```

pub mod attribute;
pub mod data;
pub mod error;
pub mod schema;
pub mod validators;

pub use attribute::{Attribute, AttributeType, Validator};
pub use data::ResourceData;
pub use error::SchemaError;
pub use schema::{Diagnostic, Schema, Severity, has_errors};
