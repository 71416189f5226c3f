//! The resource callback surface
//!
//! A plugin host drives every resource the same way: validate configuration
//! against `schema()`, then call `create`, `read`, `update`, `delete` or
//! `exists` with a [`ResourceData`] holding the prior state and planned
//! values. Callbacks for one resource instance are never run concurrently.

use crate::error::ProviderError;
use provider_schema::{Diagnostic, ResourceData, Schema};
use serde_json::{Map, Value};

#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// Type name the host knows the resource by, e.g. `softlayer_vlan`
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> &Schema;

    /// Check a configuration before any remote call
    ///
    /// The default runs the schema rules; resources override it to add
    /// cross-attribute rules and must keep calling the schema.
    fn validate(&self, config: &Map<String, Value>) -> Vec<Diagnostic> {
        self.schema().validate(config)
    }

    /// Create the remote object, set the ID and read it back
    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Refresh state from the remote object; clears the ID when it is gone
    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Apply changed attributes, then read back
    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Remove or cancel the remote object and clear the ID
    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError>;

    /// Whether the remote object still exists
    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError>;
}
