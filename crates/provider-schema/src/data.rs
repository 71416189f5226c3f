//! Resource attribute bag
//!
//! `ResourceData` carries two maps through a callback: the prior state the
//! host last persisted and the current values (configuration merged with
//! prior computed values). Callbacks read configuration from the current
//! map, compare it against the prior map to find changes, and write the
//! remote object's attributes back with `set`.

use crate::error::SchemaError;
use crate::schema::Schema;
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: Option<String>,
    prior: Map<String, Value>,
    current: Map<String, Value>,
    set_keys: HashSet<String>,
}

fn set_keys(schema: &Schema) -> HashSet<String> {
    schema
        .iter()
        .filter(|(_, attr)| attr.attr_type.is_set())
        .map(|(name, _)| name.to_string())
        .collect()
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Canonical form of a set value, so element order does not count as change
fn normalize_set(value: &Value) -> Value {
    match value {
        Value::Array(items) => {
            let mut items = items.clone();
            items.sort_by_key(|item| item.to_string());
            items.dedup();
            Value::Array(items)
        }
        other => other.clone(),
    }
}

impl ResourceData {
    /// Data for a Create: no prior state, configuration with defaults applied
    pub fn create(schema: &Schema, mut config: Map<String, Value>) -> Self {
        schema.apply_defaults(&mut config);
        Self {
            id: None,
            prior: Map::new(),
            current: config,
            set_keys: set_keys(schema),
        }
    }

    /// Data for Read, Delete and Exists: the persisted state only
    pub fn from_state(schema: &Schema, id: impl Into<String>, state: Map<String, Value>) -> Self {
        Self {
            id: Some(id.into()),
            prior: state.clone(),
            current: state,
            set_keys: set_keys(schema),
        }
    }

    /// Data for an Update: persisted state plus the new configuration
    ///
    /// Computed attributes the configuration leaves out keep their prior
    /// value, so they never show up as changes.
    pub fn update(
        schema: &Schema,
        id: impl Into<String>,
        state: Map<String, Value>,
        mut config: Map<String, Value>,
    ) -> Self {
        schema.apply_defaults(&mut config);
        for (name, attr) in schema.iter() {
            if attr.computed && present(config.get(name)).is_none() {
                if let Some(prior) = state.get(name) {
                    config.insert(name.to_string(), prior.clone());
                }
            }
        }
        Self {
            id: Some(id.into()),
            prior: state,
            current: config,
            set_keys: set_keys(schema),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Mark the resource as gone; the host drops it from state
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// True when the resource has never been persisted
    pub fn is_new(&self) -> bool {
        self.prior.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        present(self.current.get(key))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Elements of a list or set attribute; empty when unset
    pub fn get_list(&self, key: &str) -> &[Value] {
        match self.get(key) {
            Some(Value::Array(items)) => items,
            _ => &[],
        }
    }

    pub fn get_strings(&self, key: &str) -> Vec<String> {
        self.get_list(key)
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    pub fn get_ints(&self, key: &str) -> Vec<i64> {
        self.get_list(key).iter().filter_map(Value::as_i64).collect()
    }

    /// String value that must be present
    pub fn require_str(&self, key: &str) -> Result<&str, SchemaError> {
        match self.get(key) {
            None => Err(SchemaError::MissingAttribute(key.to_string())),
            Some(value) => value.as_str().ok_or_else(|| SchemaError::WrongType {
                attribute: key.to_string(),
                expected: "a string",
            }),
        }
    }

    /// Integer value that must be present
    pub fn require_i64(&self, key: &str) -> Result<i64, SchemaError> {
        match self.get(key) {
            None => Err(SchemaError::MissingAttribute(key.to_string())),
            Some(value) => value.as_i64().ok_or_else(|| SchemaError::WrongType {
                attribute: key.to_string(),
                expected: "an integer",
            }),
        }
    }

    /// Prior and current value of an attribute
    pub fn get_change(&self, key: &str) -> (Option<&Value>, Option<&Value>) {
        (present(self.prior.get(key)), present(self.current.get(key)))
    }

    /// True when the current value differs from the prior state
    pub fn has_change(&self, key: &str) -> bool {
        match self.get_change(key) {
            (None, None) => false,
            (Some(old), Some(new)) if self.set_keys.contains(key) => {
                normalize_set(old) != normalize_set(new)
            }
            (old, new) => old != new,
        }
    }

    /// Write an attribute into the current values; null removes it
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        if value.is_null() {
            self.current.remove(key);
        } else {
            self.current.insert(key.to_string(), value);
        }
    }

    /// Write an optional attribute, removing it when `None`
    pub fn set_opt<T: Into<Value>>(&mut self, key: &str, value: Option<T>) {
        match value {
            Some(value) => self.set(key, value),
            None => self.set(key, Value::Null),
        }
    }

    /// The state the host should persist
    pub fn state(&self) -> Map<String, Value> {
        self.current.clone()
    }

    /// Force-new attributes whose value changed since the prior state
    ///
    /// A non-empty result means the host has to replace the resource rather
    /// than call Update.
    pub fn force_new_changes(&self, schema: &Schema) -> Vec<String> {
        if self.is_new() {
            return Vec::new();
        }
        schema
            .iter()
            .filter(|(name, attr)| attr.force_new && self.has_change(name))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Computed attributes that have no value yet
    pub fn missing_computed(&self, schema: &Schema) -> Vec<String> {
        schema
            .iter()
            .filter(|(name, attr)| attr.computed && self.get(name).is_none())
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, AttributeType};
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .attribute("name", Attribute::string().required().force_new())
            .attribute("notes", Attribute::string().optional())
            .attribute("tags", Attribute::set(AttributeType::String).optional())
            .attribute("ttl", Attribute::int().optional().default(900))
            .attribute("datacenter", Attribute::string().optional().computed())
            .attribute("serial", Attribute::int().computed())
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_create_applies_defaults() {
        let data = ResourceData::create(&schema(), map(json!({"name": "a"})));
        assert!(data.is_new());
        assert_eq!(data.id(), None);
        assert_eq!(data.get_i64("ttl"), Some(900));
        assert!(data.has_change("name"));
        assert!(data.force_new_changes(&schema()).is_empty());
    }

    #[test]
    fn test_update_keeps_computed_values() {
        let state = map(json!({"name": "a", "ttl": 900, "datacenter": "dal06", "serial": 7}));
        let data = ResourceData::update(&schema(), "1", state, map(json!({"name": "a", "notes": "x"})));

        assert!(!data.has_change("datacenter"));
        assert!(!data.has_change("serial"));
        assert!(!data.has_change("ttl"));
        assert!(data.has_change("notes"));
        assert_eq!(data.get_change("notes"), (None, Some(&json!("x"))));
        assert_eq!(data.get_i64("serial"), Some(7));
    }

    #[test]
    fn test_set_order_is_not_a_change() {
        let state = map(json!({"name": "a", "tags": ["x", "y"]}));
        let data = ResourceData::update(&schema(), "1", state.clone(), map(json!({"name": "a", "tags": ["y", "x"]})));
        assert!(!data.has_change("tags"));

        let data = ResourceData::update(&schema(), "1", state, map(json!({"name": "a", "tags": ["x"]})));
        assert!(data.has_change("tags"));
    }

    #[test]
    fn test_force_new_changes() {
        let state = map(json!({"name": "a"}));
        let data = ResourceData::update(&schema(), "1", state, map(json!({"name": "b"})));
        assert_eq!(data.force_new_changes(&schema()), vec!["name".to_string()]);
    }

    #[test]
    fn test_set_and_clear() {
        let mut data = ResourceData::from_state(&schema(), "5", map(json!({"name": "a", "notes": "n"})));
        data.set("serial", 3);
        data.set_opt::<String>("notes", None);
        assert_eq!(data.get_i64("serial"), Some(3));
        assert_eq!(data.get("notes"), None);
        assert!(data.missing_computed(&schema()).contains(&"datacenter".to_string()));

        data.clear_id();
        assert_eq!(data.id(), None);
        assert!(!data.state().contains_key("notes"));
    }

    #[test]
    fn test_require_reports_missing_and_wrong_type() {
        let data = ResourceData::create(&schema(), map(json!({"name": 5})));
        assert_eq!(
            data.require_str("notes"),
            Err(SchemaError::MissingAttribute("notes".to_string()))
        );
        assert!(matches!(data.require_str("name"), Err(SchemaError::WrongType { .. })));
        assert_eq!(data.require_i64("ttl"), Ok(900));
    }

    #[test]
    fn test_list_accessors() {
        let data = ResourceData::create(&schema(), map(json!({"name": "a", "tags": ["x", 1]})));
        assert_eq!(data.get_strings("tags"), vec!["x".to_string()]);
        assert_eq!(data.get_ints("tags"), vec![1]);
        assert!(data.get_list("missing").is_empty());
    }
}
