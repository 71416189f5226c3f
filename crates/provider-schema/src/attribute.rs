//! Attribute declarations
//!
//! An `Attribute` describes one key of a resource's attribute bag: its value
//! type, whether the practitioner must, may or cannot set it, whether changing
//! it forces replacement, and how its value is validated.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Validation hook run against a configured value
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Value type of an attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Int,
    Float,
    Bool,
    List(Box<AttributeType>),
    /// Unordered collection; equality ignores element order
    Set(Box<AttributeType>),
    /// String-keyed map
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// True when `value` has this type (null is handled by the caller)
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::String, Value::String(_)) => true,
            (Self::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Self::Float, Value::Number(_)) => true,
            (Self::Bool, Value::Bool(_)) => true,
            (Self::List(element) | Self::Set(element), Value::Array(items)) => {
                items.iter().all(|item| element.matches(item))
            }
            (Self::Map(element), Value::Object(entries)) => {
                entries.values().all(|item| element.matches(item))
            }
            _ => false,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Bool => write!(f, "bool"),
            Self::List(element) => write!(f, "list of {}", element),
            Self::Set(element) => write!(f, "set of {}", element),
            Self::Map(element) => write!(f, "map of {}", element),
        }
    }
}

/// Schema entry for one attribute
#[derive(Clone)]
pub struct Attribute {
    pub attr_type: AttributeType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub sensitive: bool,
    pub default: Option<Value>,
    pub conflicts_with: Vec<&'static str>,
    pub description: String,
    validators: Vec<Validator>,
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("attr_type", &self.attr_type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("force_new", &self.force_new)
            .field("sensitive", &self.sensitive)
            .field("default", &self.default)
            .field("conflicts_with", &self.conflicts_with)
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Attribute {
    pub fn new(attr_type: AttributeType) -> Self {
        Self {
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            conflicts_with: Vec::new(),
            description: String::new(),
            validators: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(AttributeType::String)
    }

    pub fn int() -> Self {
        Self::new(AttributeType::Int)
    }

    pub fn float() -> Self {
        Self::new(AttributeType::Float)
    }

    pub fn bool() -> Self {
        Self::new(AttributeType::Bool)
    }

    pub fn list(element: AttributeType) -> Self {
        Self::new(AttributeType::List(Box::new(element)))
    }

    pub fn set(element: AttributeType) -> Self {
        Self::new(AttributeType::Set(Box::new(element)))
    }

    pub fn map(element: AttributeType) -> Self {
        Self::new(AttributeType::Map(Box::new(element)))
    }

    /// Must be present in configuration
    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// May be present in configuration
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.required = false;
        self
    }

    /// Set by the provider. Combined with `optional`, the provider fills the
    /// value in when configuration leaves it out.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// A change to this attribute replaces the resource
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Value must not be shown in plans or logs
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Value used when configuration leaves the attribute out
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Attributes that may not be configured together with this one
    pub fn conflicts_with(mut self, names: &[&'static str]) -> Self {
        self.conflicts_with.extend_from_slice(names);
        self
    }

    pub fn validate_with(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    /// True when only the provider may set the attribute
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional && !self.required
    }

    /// Run every validator against a configured value, collecting messages
    pub fn check(&self, value: &Value) -> Vec<String> {
        self.validators
            .iter()
            .filter_map(|validator| validator(value).err())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_matching() {
        assert!(AttributeType::Int.matches(&json!(4)));
        assert!(!AttributeType::Int.matches(&json!(0.25)));
        assert!(AttributeType::Float.matches(&json!(4)));
        assert!(AttributeType::List(Box::new(AttributeType::String)).matches(&json!(["a", "b"])));
        assert!(!AttributeType::Set(Box::new(AttributeType::Int)).matches(&json!([1, "2"])));
        assert!(AttributeType::Map(Box::new(AttributeType::String)).matches(&json!({"k": "v"})));
        assert!(!AttributeType::Bool.matches(&json!("true")));
    }

    #[test]
    fn test_builder_flags() {
        let attr = Attribute::string().optional().computed().force_new();
        assert!(attr.optional && attr.computed && attr.force_new);
        assert!(!attr.is_computed_only());
        assert!(Attribute::int().computed().is_computed_only());

        let attr = Attribute::string().optional().required();
        assert!(attr.required && !attr.optional);
    }

    #[test]
    fn test_check_collects_validator_messages() {
        let attr = Attribute::int()
            .validate_with(Arc::new(|v| {
                if v.as_i64().unwrap_or(0) > 0 {
                    Ok(())
                } else {
                    Err("must be positive".to_string())
                }
            }));
        assert!(attr.check(&json!(3)).is_empty());
        assert_eq!(attr.check(&json!(-1)), vec!["must be positive".to_string()]);
    }
}
