//! Query utilities for the SoftLayer REST API
//!
//! SoftLayer narrows responses with two query parameters: `objectMask`
//! (which properties and relations to return) and `objectFilter` (a nested
//! JSON document of `{"operation": ...}` matchers rooted at the relational
//! property being listed).

use serde_json::{Map, Value};

/// Object mask selecting properties and relational properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMask {
    fields: Vec<String>,
}

impl ObjectMask {
    /// Create a mask from a list of property paths (`"datacenter.name"`)
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Add a property path
    pub fn field(mut self, field: &str) -> Self {
        self.fields.push(field.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render as the `objectMask` parameter value, e.g. `mask[id,hostname]`
    pub fn as_param(&self) -> String {
        format!("mask[{}]", self.fields.join(","))
    }
}

/// Optional parameters attached to a GET call
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub mask: Option<ObjectMask>,
    pub filter: Option<Value>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mask(mut self, mask: ObjectMask) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Build the URL query string (without the leading `?`)
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(mask) = self.mask.as_ref().filter(|m| !m.is_empty()) {
            parts.push(format!(
                "objectMask={}",
                urlencoding::encode(&mask.as_param())
            ));
        }
        if let Some(filter) = &self.filter {
            parts.push(format!(
                "objectFilter={}",
                urlencoding::encode(&filter.to_string())
            ));
        }
        parts.join("&")
    }
}

/// Build an equality filter for a dotted property path
///
/// `filter_eq("hardware.globalIdentifier", "abc")` produces
/// `{"hardware":{"globalIdentifier":{"operation":"abc"}}}`.
pub fn filter_eq(path: &str, value: impl Into<Value>) -> Value {
    let mut node = serde_json::json!({ "operation": value.into() });
    for segment in path.rsplit('.') {
        let mut wrapper = Map::new();
        wrapper.insert(segment.to_string(), node);
        node = Value::Object(wrapper);
    }
    node
}

/// Deep-merge two filter documents
pub fn merge_filters(mut base: Value, other: Value) -> Value {
    merge_into(&mut base, other);
    base
}

fn merge_into(base: &mut Value, other: Value) {
    match (base, other) {
        (Value::Object(base_map), Value::Object(other_map)) => {
            for (key, value) in other_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Look up the `operation` matcher at a dotted path in a filter document
pub fn filter_operation<'a>(filter: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = filter;
    for segment in path.split('.') {
        node = node.get(segment)?;
    }
    node.get("operation")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_mask_param() {
        let mask = ObjectMask::new(&["id", "hostname"]).field("datacenter.name");
        assert_eq!(mask.as_param(), "mask[id,hostname,datacenter.name]");
    }

    #[test]
    fn test_filter_eq_nests_path() {
        let filter = filter_eq("networkVlans.billingItem.orderItem.order.id", 123);
        assert_eq!(
            filter,
            serde_json::json!({
                "networkVlans": {"billingItem": {"orderItem": {"order": {"id": {"operation": 123}}}}}
            })
        );
        assert_eq!(
            filter_operation(&filter, "networkVlans.billingItem.orderItem.order.id"),
            Some(&serde_json::json!(123))
        );
        assert_eq!(filter_operation(&filter, "networkVlans.name"), None);
    }

    #[test]
    fn test_merge_filters_keeps_both_branches() {
        let merged = merge_filters(
            filter_eq("hardware.hostname", "web01"),
            filter_eq("hardware.domain", "example.com"),
        );
        assert_eq!(
            filter_operation(&merged, "hardware.hostname"),
            Some(&serde_json::json!("web01"))
        );
        assert_eq!(
            filter_operation(&merged, "hardware.domain"),
            Some(&serde_json::json!("example.com"))
        );
    }

    #[test]
    fn test_query_string_encodes_parameters() {
        let query = Query::new()
            .mask(ObjectMask::new(&["id"]))
            .filter(filter_eq("hardware.id", 1));
        let rendered = query.to_query_string();
        assert!(rendered.starts_with("objectMask=mask%5Bid%5D&objectFilter="));
        assert!(!rendered.contains('{'));
        assert_eq!(Query::new().to_query_string(), "");
    }
}
