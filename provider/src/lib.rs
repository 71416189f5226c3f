//! SoftLayer Provider
//!
//! Declarative resources for SoftLayer (IBM Cloud classic infrastructure):
//! virtual guests, bare metal servers, VLANs, file and block storage, DNS,
//! SSH keys, portal users and NetScaler VPX load balancers.
//!
//! Each resource is a schema plus create, read, update, delete and exists
//! callbacks that a plugin host drives. Handlers depend on the SoftLayer
//! capability traits and receive the shared client when they are built, so
//! they can run against `MockSoftLayerClient` in tests.
//!
//! # Example
//!
//! ```no_run
//! use provider_schema::ResourceData;
//! use serde_json::json;
//! use softlayer_provider::Provider;
//!
//! # async fn example() -> Result<(), softlayer_provider::ProviderError> {
//! let mut provider = Provider::new();
//! let block = json!({"username": "sl-user", "api_key": "secret"});
//! provider.configure(&block.as_object().cloned().unwrap_or_default()).await?;
//!
//! let keys = provider.resource("softlayer_ssh_key")?;
//! let config = json!({"label": "ops", "public_key": "ssh-ed25519 AAAA... ops"});
//! let mut data = ResourceData::create(keys.schema(), config.as_object().cloned().unwrap_or_default());
//! keys.create(&mut data).await?;
//! println!("created SSH key {}", data.id().unwrap_or("?"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crud;
pub mod error;
pub mod logging;
pub mod pricing;
pub mod provider;
pub mod resource;
pub mod resources;
pub mod retry;
pub mod wait;

#[cfg(test)]
mod test_utils;

pub use config::ProviderConfig;
pub use error::ProviderError;
pub use provider::{Provider, RESOURCE_TYPES};
pub use resource::Resource;
pub use wait::{Poll, RetryConfig, Timing, WaitConfig};
