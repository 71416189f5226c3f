//! Test utilities for unit testing resource handlers
//!
//! This module provides helpers for building configurations and running
//! handlers against `MockSoftLayerClient` with millisecond waits.

#[cfg(test)]
use crate::wait::Timing;
#[cfg(test)]
use serde_json::{Map, Value};
#[cfg(test)]
use std::time::Duration;

/// Waits short enough for unit tests: 300ms timeouts polled every 2ms
#[cfg(test)]
pub fn fast_timing() -> Timing {
    Timing::uniform(Duration::from_millis(300), Duration::from_millis(2))
}

/// Helper to turn a `json!` object into a configuration map
#[cfg(test)]
pub fn config(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
