//! Resource handlers, one module per SoftLayer object type
//!
//! - `virtual_guest.rs` - Virtual guests
//! - `bare_metal.rs` - Bare metal servers
//! - `vlan.rs` - Ordered VLANs
//! - `network_storage.rs` - File and block storage volumes
//! - `dns_domain.rs` / `dns_record.rs` - DNS zones and records
//! - `ssh_key.rs` - SSH keys
//! - `user.rs` - Portal users
//! - `lb_vpx.rs` / `lb_vpx_vip.rs` - NetScaler VPX appliances and their virtual IPs

pub mod bare_metal;
pub mod dns_domain;
pub mod dns_record;
pub mod lb_vpx;
pub mod lb_vpx_vip;
pub mod network_storage;
pub mod ssh_key;
pub mod user;
pub mod virtual_guest;
pub mod vlan;

pub use bare_metal::BareMetalResource;
pub use dns_domain::DnsDomainResource;
pub use dns_record::DnsRecordResource;
pub use lb_vpx::LbVpxResource;
pub use lb_vpx_vip::LbVpxVipResource;
pub use network_storage::{NetworkStorageResource, StorageKind};
pub use ssh_key::SshKeyResource;
pub use user::UserResource;
pub use virtual_guest::VirtualGuestResource;
pub use vlan::VlanResource;
