//! Reusable attribute validators

use crate::attribute::Validator;
use serde_json::Value;
use std::sync::Arc;

/// Integer within `[min, max]`
pub fn int_between(min: i64, max: i64) -> Validator {
    Arc::new(move |value: &Value| match value.as_i64() {
        Some(n) if (min..=max).contains(&n) => Ok(()),
        Some(n) => Err(format!("expected a value between {} and {}, got {}", min, max, n)),
        None => Err(format!("expected an integer, got {}", value)),
    })
}

/// String equal to one of `allowed`
pub fn one_of(allowed: &'static [&'static str]) -> Validator {
    Arc::new(move |value: &Value| match value.as_str() {
        Some(s) if allowed.contains(&s) => Ok(()),
        Some(s) => Err(format!("expected one of [{}], got {:?}", allowed.join(", "), s)),
        None => Err(format!("expected a string, got {}", value)),
    })
}

/// Integer equal to one of `allowed`
pub fn int_one_of(allowed: &'static [i64]) -> Validator {
    Arc::new(move |value: &Value| match value.as_i64() {
        Some(n) if allowed.contains(&n) => Ok(()),
        Some(n) => Err(format!(
            "expected one of [{}], got {}",
            allowed
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            n
        )),
        None => Err(format!("expected an integer, got {}", value)),
    })
}

/// Number equal to one of `allowed`
pub fn float_one_of(allowed: &'static [f64]) -> Validator {
    Arc::new(move |value: &Value| match value.as_f64() {
        Some(n) if allowed.iter().any(|a| (a - n).abs() < f64::EPSILON) => Ok(()),
        Some(n) => Err(format!(
            "expected one of [{}], got {}",
            allowed
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            n
        )),
        None => Err(format!("expected a number, got {}", value)),
    })
}

/// Non-blank string or non-empty collection
pub fn non_empty() -> Validator {
    Arc::new(|value: &Value| {
        let empty = match value {
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(entries) => entries.is_empty(),
            _ => false,
        };
        if empty {
            Err("must not be empty".to_string())
        } else {
            Ok(())
        }
    })
}
