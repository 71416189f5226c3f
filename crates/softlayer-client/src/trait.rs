//! Capability traits for the SoftLayer API
//!
//! Each trait covers one SoftLayer service. Resource handlers depend only on
//! the services they call, which keeps them testable against
//! `MockSoftLayerClient` and lets the provider inject the shared client as a
//! trait object. `SoftLayerApi` bundles every service for the registry.
//! All async methods must be `Send` to work with Tokio's work-stealing runtime.

use crate::error::SoftLayerError;
use crate::models::*;
use serde_json::Value;

/// `SoftLayer_Account` listing operations
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Fetch the user the session authenticates as
    async fn get_current_user(&self) -> Result<User, SoftLayerError>;
    async fn list_hardware(&self, filter: Value) -> Result<Vec<Hardware>, SoftLayerError>;
    async fn list_network_vlans(&self, filter: Value) -> Result<Vec<NetworkVlan>, SoftLayerError>;
    async fn list_network_storage(&self, filter: Value) -> Result<Vec<NetworkStorage>, SoftLayerError>;
    async fn list_delivery_controllers(&self, filter: Value) -> Result<Vec<DeliveryController>, SoftLayerError>;
}

/// `SoftLayer_Virtual_Guest`
#[async_trait::async_trait]
pub trait VirtualGuestService: Send + Sync {
    async fn create_virtual_guest(&self, template: &VirtualGuestTemplate) -> Result<VirtualGuest, SoftLayerError>;
    async fn get_virtual_guest(&self, id: u64) -> Result<VirtualGuest, SoftLayerError>;
    async fn edit_virtual_guest(&self, id: u64, edit: &VirtualGuestEdit) -> Result<bool, SoftLayerError>;
    async fn set_virtual_guest_tags(&self, id: u64, tags: &str) -> Result<bool, SoftLayerError>;
    async fn delete_virtual_guest(&self, id: u64) -> Result<bool, SoftLayerError>;
}

/// `SoftLayer_Hardware`
#[async_trait::async_trait]
pub trait HardwareService: Send + Sync {
    async fn create_hardware(&self, template: &HardwareTemplate) -> Result<Hardware, SoftLayerError>;
    async fn get_hardware(&self, id: u64) -> Result<Hardware, SoftLayerError>;
    async fn edit_hardware(&self, id: u64, edit: &HardwareEdit) -> Result<bool, SoftLayerError>;
    async fn set_hardware_tags(&self, id: u64, tags: &str) -> Result<bool, SoftLayerError>;
}

/// `SoftLayer_Network_Vlan`
#[async_trait::async_trait]
pub trait NetworkVlanService: Send + Sync {
    async fn get_network_vlan(&self, id: u64) -> Result<NetworkVlan, SoftLayerError>;
    async fn edit_network_vlan(&self, id: u64, edit: &NetworkVlanEdit) -> Result<bool, SoftLayerError>;
}

/// `SoftLayer_Network_Storage`
#[async_trait::async_trait]
pub trait NetworkStorageService: Send + Sync {
    async fn get_network_storage(&self, id: u64) -> Result<NetworkStorage, SoftLayerError>;
    async fn edit_network_storage(&self, id: u64, edit: &NetworkStorageEdit) -> Result<bool, SoftLayerError>;
    async fn allow_access_from_virtual_guests(&self, id: u64, guest_ids: &[u64]) -> Result<bool, SoftLayerError>;
    async fn remove_access_from_virtual_guests(&self, id: u64, guest_ids: &[u64]) -> Result<bool, SoftLayerError>;
    async fn allow_access_from_hardware(&self, id: u64, hardware_ids: &[u64]) -> Result<bool, SoftLayerError>;
    async fn remove_access_from_hardware(&self, id: u64, hardware_ids: &[u64]) -> Result<bool, SoftLayerError>;
}

/// `SoftLayer_Dns_Domain` and `SoftLayer_Dns_Domain_ResourceRecord`
#[async_trait::async_trait]
pub trait DnsService: Send + Sync {
    async fn create_dns_domain(&self, template: &DnsDomainTemplate) -> Result<DnsDomain, SoftLayerError>;
    async fn get_dns_domain(&self, id: u64) -> Result<DnsDomain, SoftLayerError>;
    async fn delete_dns_domain(&self, id: u64) -> Result<bool, SoftLayerError>;
    async fn create_dns_record(&self, template: &DnsRecordTemplate) -> Result<DnsRecord, SoftLayerError>;
    async fn get_dns_record(&self, id: u64) -> Result<DnsRecord, SoftLayerError>;
    async fn edit_dns_record(&self, id: u64, edit: &DnsRecordEdit) -> Result<bool, SoftLayerError>;
    async fn delete_dns_record(&self, id: u64) -> Result<bool, SoftLayerError>;
}

/// `SoftLayer_Security_Ssh_Key`
#[async_trait::async_trait]
pub trait SshKeyService: Send + Sync {
    async fn create_ssh_key(&self, template: &SshKeyTemplate) -> Result<SshKey, SoftLayerError>;
    async fn get_ssh_key(&self, id: u64) -> Result<SshKey, SoftLayerError>;
    async fn edit_ssh_key(&self, id: u64, edit: &SshKeyEdit) -> Result<bool, SoftLayerError>;
    async fn delete_ssh_key(&self, id: u64) -> Result<bool, SoftLayerError>;
}

/// `SoftLayer_User_Customer`
#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn create_user(&self, template: &UserTemplate, password: Option<&str>) -> Result<User, SoftLayerError>;
    async fn get_user(&self, id: u64) -> Result<User, SoftLayerError>;
    async fn edit_user(&self, id: u64, edit: &UserEdit) -> Result<bool, SoftLayerError>;
    async fn get_user_permissions(&self, id: u64) -> Result<Vec<Permission>, SoftLayerError>;
    async fn add_user_permissions(&self, id: u64, key_names: &[String]) -> Result<bool, SoftLayerError>;
    async fn remove_user_permissions(&self, id: u64, key_names: &[String]) -> Result<bool, SoftLayerError>;
}

/// `SoftLayer_Product_Package`, `SoftLayer_Location_Datacenter` and `SoftLayer_Product_Order`
#[async_trait::async_trait]
pub trait ProductService: Send + Sync {
    async fn find_package(&self, key_name: &str) -> Result<Option<ProductPackage>, SoftLayerError>;
    async fn get_package_items(&self, package_id: u64) -> Result<Vec<ProductItem>, SoftLayerError>;
    async fn find_datacenter(&self, name: &str) -> Result<Option<Datacenter>, SoftLayerError>;
    async fn place_order(&self, order: &OrderContainer) -> Result<OrderReceipt, SoftLayerError>;
}

/// `SoftLayer_Billing_Item`
#[async_trait::async_trait]
pub trait BillingService: Send + Sync {
    /// Cancel at the end of the billing cycle
    async fn cancel_service(&self, billing_item_id: u64) -> Result<bool, SoftLayerError>;
    /// Cancel immediately or at the anniversary date, with a reason
    async fn cancel_item(&self, billing_item_id: u64, immediate: bool, reason: &str) -> Result<bool, SoftLayerError>;
}

/// `SoftLayer_Network_Application_Delivery_Controller`
#[async_trait::async_trait]
pub trait LoadBalancerService: Send + Sync {
    async fn get_delivery_controller(&self, id: u64) -> Result<DeliveryController, SoftLayerError>;
    async fn list_virtual_ips(&self, nadc_id: u64) -> Result<Vec<LoadBalancerVip>, SoftLayerError>;
    async fn create_virtual_ip(&self, nadc_id: u64, vip: &LoadBalancerVip) -> Result<bool, SoftLayerError>;
    async fn update_virtual_ip(&self, nadc_id: u64, vip: &LoadBalancerVipEdit) -> Result<bool, SoftLayerError>;
    async fn delete_virtual_ip(&self, nadc_id: u64, name: &str) -> Result<bool, SoftLayerError>;
}

/// Every SoftLayer service the provider uses
pub trait SoftLayerApi:
    AccountService
    + VirtualGuestService
    + HardwareService
    + NetworkVlanService
    + NetworkStorageService
    + DnsService
    + SshKeyService
    + UserService
    + ProductService
    + BillingService
    + LoadBalancerService
{
}

impl<T> SoftLayerApi for T where
    T: AccountService
        + VirtualGuestService
        + HardwareService
        + NetworkVlanService
        + NetworkStorageService
        + DnsService
        + SshKeyService
        + UserService
        + ProductService
        + BillingService
        + LoadBalancerService
{
}
