//! Resource and provider schemas
//!
//! A `Schema` is the ordered set of attributes a resource accepts. It checks a
//! configuration map before any remote call is made and reports every problem
//! it finds as a `Diagnostic`.

use crate::attribute::Attribute;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Problem found while validating configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Attribute the diagnostic is about, if any
    pub attribute: Option<String>,
    pub summary: String,
}

impl Diagnostic {
    pub fn error(attribute: &str, summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            attribute: Some(attribute.to_string()),
            summary: summary.into(),
        }
    }

    pub fn warning(attribute: &str, summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            attribute: Some(attribute.to_string()),
            summary: summary.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            Some(attribute) => write!(f, "{}: {}", attribute, self.summary),
            None => write!(f, "{}", self.summary),
        }
    }
}

/// True when any diagnostic is an error
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

/// Attribute schema of a resource or of the provider itself
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute (builder style)
    pub fn attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(name, attr)| (name.as_str(), attr))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// True when the named attribute is a set (order-insensitive)
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some_and(|attr| attr.attr_type.is_set())
    }

    /// Names of every attribute the provider computes
    pub fn computed_names(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, attr)| attr.computed)
            .map(|(name, _)| name)
            .collect()
    }

    /// Fill in defaults for attributes the configuration leaves out
    pub fn apply_defaults(&self, config: &mut Map<String, Value>) {
        for (name, attr) in self.iter() {
            if let Some(default) = &attr.default {
                let missing = config.get(name).is_none_or(Value::is_null);
                if missing {
                    config.insert(name.to_string(), default.clone());
                }
            }
        }
    }

    /// Validate a configuration map
    ///
    /// Checks, in order: unknown attributes, attributes only the provider may
    /// set, missing required attributes, value types, conflicting attributes
    /// and per-attribute validators. The map is left untouched; defaults are
    /// filled in by [`Schema::apply_defaults`] when `ResourceData` is built.
    pub fn validate(&self, config: &Map<String, Value>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let is_set = |name: &str| config.get(name).is_some_and(|v| !v.is_null());

        for name in config.keys() {
            if !self.attributes.contains_key(name) {
                diagnostics.push(Diagnostic::error(
                    name,
                    "An argument with this name is not expected here",
                ));
            }
        }

        for (name, attr) in self.iter() {
            if attr.is_computed_only() {
                if is_set(name) {
                    diagnostics.push(Diagnostic::error(
                        name,
                        "Value for unconfigurable attribute; it is computed by the provider",
                    ));
                }
                continue;
            }

            let Some(value) = config.get(name).filter(|v| !v.is_null()) else {
                if attr.required {
                    diagnostics.push(Diagnostic::error(
                        name,
                        "The argument is required, but no definition was found",
                    ));
                }
                continue;
            };

            if !attr.attr_type.matches(value) {
                diagnostics.push(Diagnostic::error(
                    name,
                    format!("Inappropriate value: expected {}", attr.attr_type),
                ));
                continue;
            }

            for other in &attr.conflicts_with {
                // Report each conflicting pair once
                if is_set(other) && name < *other {
                    diagnostics.push(Diagnostic::error(
                        name,
                        format!("\"{}\" conflicts with \"{}\"", name, other),
                    ));
                }
            }

            for message in attr.check(value) {
                diagnostics.push(Diagnostic::error(name, message));
            }
        }

        diagnostics
    }
}
