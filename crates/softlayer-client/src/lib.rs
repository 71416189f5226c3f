//! SoftLayer REST API Client
//!
//! A Rust client library for the SoftLayer (IBM Cloud classic infrastructure)
//! REST API. Provides typed models and one capability trait per SoftLayer
//! service used by the provider.
//!
//! # Example
//!
//! ```no_run
//! use softlayer_client::{SoftLayerClient, VirtualGuestService, ProductService};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SoftLayerClient::new(
//!     "https://api.softlayer.com/rest/v3.1".to_string(),
//!     "my-user".to_string(),
//!     "my-api-key".to_string(),
//!     Duration::from_secs(60),
//! )?;
//!
//! // Fetch a virtual guest
//! let guest = client.get_virtual_guest(12345).await?;
//! println!("{} has {} active transactions", guest.hostname, guest.active_transaction_count.unwrap_or(0));
//!
//! // Look up a product package by key name
//! let package = client.find_package("NETSCALER_VPX").await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Compute**: Virtual guests and bare metal hardware
//! - **Network**: VLANs and NetScaler VPX load balancers
//! - **Storage**: File and block storage with host authorization
//! - **DNS**: Domains and resource records
//! - **Account**: Users, permissions and SSH keys
//! - **Ordering**: Product packages, prices, orders and billing cancellation
//! - **Filtering**: `objectMask` and `objectFilter` query support

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod softlayer_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::{DEFAULT_ENDPOINT, SoftLayerClient};
pub use common::{HttpClient, ObjectMask, Query, filter_eq, filter_operation, merge_filters};
pub use error::SoftLayerError;
pub use models::*;
pub use softlayer_trait::*;
#[cfg(feature = "test-util")]
pub use mock::MockSoftLayerClient;
