//! Mock SoftLayerClient for unit testing
//!
//! This module provides an in-memory implementation of every SoftLayer
//! capability trait that can be used in tests without a SoftLayer account.
//!
//! Besides storing objects, the mock simulates the asynchronous behaviour of
//! the real API:
//! - ordered objects only show up in account listings after
//!   `provisioning_polls` listing calls
//! - new virtual guests keep an active transaction and no IP addresses until
//!   they have been fetched `provisioning_polls` times
//! - faults can be scripted per method with [`MockSoftLayerClient::fail_next`]
//! - every call is recorded and can be inspected with
//!   [`MockSoftLayerClient::calls_to`]
//!
//! The mock is organized into domain-specific modules:
//! - `compute.rs` - Virtual guests and bare metal hardware
//! - `network.rs` - VLANs and NetScaler load balancers
//! - `storage.rs` - File and block storage volumes
//! - `dns.rs` - DNS domains and records
//! - `account.rs` - Account listings, users and SSH keys
//! - `ordering.rs` - Product catalog, orders and billing cancellation
//! - `helpers.rs` - Catalog fixtures and object builders

mod account;
mod compute;
mod dns;
mod helpers;
mod network;
mod ordering;
mod storage;

use crate::error::SoftLayerError;
use crate::models::*;
use crate::softlayer_trait::*;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub use helpers::{
    MOCK_DATACENTER, MOCK_DATACENTER_ID, STORAGE_PACKAGE_ID, VLAN_PACKAGE_ID, VPX_PACKAGE_ID,
};

/// A recorded call against the mock
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    /// SoftLayer method, e.g. `SoftLayer_Virtual_Guest::editObject`
    pub method: String,
    /// Parameters the call was made with
    pub params: Value,
}

#[derive(Debug, Clone)]
pub(crate) struct ScriptedFault {
    code: String,
    message: String,
    remaining: u32,
}

/// Mock SoftLayerClient for testing
///
/// Clones share the same store, so a test can keep a handle while the code
/// under test owns another.
#[derive(Clone)]
pub struct MockSoftLayerClient {
    // In-memory storage for objects
    pub(crate) virtual_guests: Arc<Mutex<HashMap<u64, VirtualGuest>>>,
    pub(crate) hardware: Arc<Mutex<HashMap<u64, Hardware>>>,
    pub(crate) vlans: Arc<Mutex<HashMap<u64, NetworkVlan>>>,
    pub(crate) storage: Arc<Mutex<HashMap<u64, NetworkStorage>>>,
    pub(crate) dns_domains: Arc<Mutex<HashMap<u64, DnsDomain>>>,
    pub(crate) dns_records: Arc<Mutex<HashMap<u64, DnsRecord>>>,
    pub(crate) ssh_keys: Arc<Mutex<HashMap<u64, SshKey>>>,
    pub(crate) users: Arc<Mutex<HashMap<u64, User>>>,
    pub(crate) permissions: Arc<Mutex<HashMap<u64, Vec<String>>>>,
    pub(crate) packages: Arc<Mutex<HashMap<u64, (ProductPackage, Vec<ProductItem>)>>>,
    pub(crate) datacenters: Arc<Mutex<HashMap<String, Datacenter>>>,
    pub(crate) delivery_controllers: Arc<Mutex<HashMap<u64, DeliveryController>>>,
    pub(crate) virtual_ips: Arc<Mutex<HashMap<u64, Vec<LoadBalancerVip>>>>,
    pub(crate) orders: Arc<Mutex<HashMap<u64, OrderContainer>>>,
    pub(crate) cancelled_billing_items: Arc<Mutex<HashSet<u64>>>,
    // Provisioning simulation: remaining polls per (kind, object id)
    pub(crate) pending: Arc<Mutex<HashMap<(&'static str, u64), u32>>>,
    pub(crate) provisioning_polls: Arc<Mutex<u32>>,
    // Scripted faults and call log
    pub(crate) faults: Arc<Mutex<HashMap<String, ScriptedFault>>>,
    pub(crate) calls: Arc<Mutex<Vec<MockCall>>>,
    // Counter for generating IDs
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl Default for MockSoftLayerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSoftLayerClient {
    /// Create a new, empty mock client
    pub fn new() -> Self {
        Self {
            virtual_guests: Arc::new(Mutex::new(HashMap::new())),
            hardware: Arc::new(Mutex::new(HashMap::new())),
            vlans: Arc::new(Mutex::new(HashMap::new())),
            storage: Arc::new(Mutex::new(HashMap::new())),
            dns_domains: Arc::new(Mutex::new(HashMap::new())),
            dns_records: Arc::new(Mutex::new(HashMap::new())),
            ssh_keys: Arc::new(Mutex::new(HashMap::new())),
            users: Arc::new(Mutex::new(HashMap::new())),
            permissions: Arc::new(Mutex::new(HashMap::new())),
            packages: Arc::new(Mutex::new(HashMap::new())),
            datacenters: Arc::new(Mutex::new(HashMap::new())),
            delivery_controllers: Arc::new(Mutex::new(HashMap::new())),
            virtual_ips: Arc::new(Mutex::new(HashMap::new())),
            orders: Arc::new(Mutex::new(HashMap::new())),
            cancelled_billing_items: Arc::new(Mutex::new(HashSet::new())),
            pending: Arc::new(Mutex::new(HashMap::new())),
            provisioning_polls: Arc::new(Mutex::new(0)),
            faults: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1000)),
        }
    }

    /// Create a mock seeded with the product catalog and a datacenter
    ///
    /// The catalog covers the VLAN, storage-as-a-service and NetScaler VPX
    /// packages (see `helpers.rs`).
    pub fn with_catalog() -> Self {
        let client = Self::new();
        helpers::seed_catalog(&client);
        client
    }

    /// Number of polls before asynchronously provisioned objects settle
    pub fn set_provisioning_polls(&self, polls: u32) {
        *self.provisioning_polls.lock().unwrap() = polls;
    }

    /// Make the next `times` calls to `method` fail with the given fault
    pub fn fail_next(&self, method: &str, code: &str, message: &str, times: u32) {
        self.faults.lock().unwrap().insert(
            method.to_string(),
            ScriptedFault {
                code: code.to_string(),
                message: message.to_string(),
                remaining: times,
            },
        );
    }

    /// Parameters of every recorded call to `method`, oldest first
    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method)
            .map(|call| call.params.clone())
            .collect()
    }

    /// Every recorded call, oldest first
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Billing items that have been cancelled
    pub fn cancelled_billing_items(&self) -> HashSet<u64> {
        self.cancelled_billing_items.lock().unwrap().clone()
    }

    /// Add a product package and its items to the mock store (for test setup)
    pub fn add_package(&self, package: ProductPackage, items: Vec<ProductItem>) {
        self.packages
            .lock()
            .unwrap()
            .insert(package.id, (package, items));
    }

    /// Add a datacenter to the mock store (for test setup)
    pub fn add_datacenter(&self, datacenter: Datacenter) {
        self.datacenters
            .lock()
            .unwrap()
            .insert(datacenter.name.clone(), datacenter);
    }

    /// Add a virtual guest to the mock store (for test setup)
    pub fn add_virtual_guest(&self, guest: VirtualGuest) {
        self.virtual_guests.lock().unwrap().insert(guest.id, guest);
    }

    /// Add a hardware server to the mock store (for test setup)
    pub fn add_hardware(&self, hardware: Hardware) {
        self.hardware.lock().unwrap().insert(hardware.id, hardware);
    }

    /// Add a VLAN to the mock store (for test setup)
    pub fn add_network_vlan(&self, vlan: NetworkVlan) {
        self.vlans.lock().unwrap().insert(vlan.id, vlan);
    }

    /// Add a storage volume to the mock store (for test setup)
    pub fn add_network_storage(&self, volume: NetworkStorage) {
        self.storage.lock().unwrap().insert(volume.id, volume);
    }

    /// Add a NetScaler to the mock store (for test setup)
    ///
    /// The appliance starts with no virtual IPs.
    pub fn add_delivery_controller(&self, controller: DeliveryController) {
        self.virtual_ips.lock().unwrap().entry(controller.id).or_default();
        self.delivery_controllers
            .lock()
            .unwrap()
            .insert(controller.id, controller);
    }

    /// Add a DNS record to the mock store (for test setup)
    pub fn add_dns_record(&self, record: DnsRecord) {
        self.dns_records.lock().unwrap().insert(record.id, record);
    }

    /// Add a user to the mock store (for test setup)
    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id, user);
    }

    /// Remove a virtual guest behind the provider's back (drift tests)
    pub fn remove_virtual_guest(&self, id: u64) {
        self.virtual_guests.lock().unwrap().remove(&id);
    }

    /// Snapshot of a stored virtual guest, without simulating a poll
    pub fn stored_virtual_guest(&self, id: u64) -> Option<VirtualGuest> {
        self.virtual_guests.lock().unwrap().get(&id).cloned()
    }

    /// Snapshot of a stored user, without recording a call
    pub fn stored_user(&self, id: u64) -> Option<User> {
        self.users.lock().unwrap().get(&id).cloned()
    }

    /// Snapshot of a stored storage volume, without simulating a poll
    pub fn stored_network_storage(&self, id: u64) -> Option<NetworkStorage> {
        self.storage.lock().unwrap().get(&id).cloned()
    }

    /// Generate next ID
    pub(crate) fn next_id(&self) -> u64 {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        current
    }

    /// Record a call and return a scripted fault if one is armed for it
    pub(crate) fn enter(&self, method: &str, params: Value) -> Result<(), SoftLayerError> {
        self.calls.lock().unwrap().push(MockCall {
            method: method.to_string(),
            params,
        });

        let mut faults = self.faults.lock().unwrap();
        if let Some(fault) = faults.get_mut(method) {
            if fault.remaining > 0 {
                fault.remaining -= 1;
                return Err(SoftLayerError::api(500, fault.code.clone(), fault.message.clone()));
            }
        }
        Ok(())
    }

    /// Start a provisioning countdown for an object
    pub(crate) fn start_provisioning(&self, kind: &'static str, id: u64) {
        let polls = *self.provisioning_polls.lock().unwrap();
        if polls > 0 {
            self.pending.lock().unwrap().insert((kind, id), polls);
        }
    }

    /// True when provisioning is not being simulated
    pub(crate) fn settles_immediately(&self) -> bool {
        *self.provisioning_polls.lock().unwrap() == 0
    }

    /// Count one poll against an object; true once it has settled
    pub(crate) fn poll_settled(&self, kind: &'static str, id: u64) -> bool {
        let mut pending = self.pending.lock().unwrap();
        match pending.get_mut(&(kind, id)) {
            None => true,
            Some(remaining) if *remaining <= 1 => {
                pending.remove(&(kind, id));
                true
            }
            Some(remaining) => {
                *remaining -= 1;
                false
            }
        }
    }

    pub(crate) fn not_found(kind: &str, id: u64) -> SoftLayerError {
        SoftLayerError::api(
            404,
            "SoftLayer_Exception_ObjectNotFound",
            format!("{}: Unable to find object with id of '{}'.", kind, id),
        )
    }
}

#[async_trait::async_trait]
impl AccountService for MockSoftLayerClient {
    async fn get_current_user(&self) -> Result<User, SoftLayerError> {
        account::get_current_user(self)
    }

    async fn list_hardware(&self, filter: Value) -> Result<Vec<Hardware>, SoftLayerError> {
        compute::list_hardware(self, filter)
    }

    async fn list_network_vlans(&self, filter: Value) -> Result<Vec<NetworkVlan>, SoftLayerError> {
        network::list_network_vlans(self, filter)
    }

    async fn list_network_storage(&self, filter: Value) -> Result<Vec<NetworkStorage>, SoftLayerError> {
        storage::list_network_storage(self, filter)
    }

    async fn list_delivery_controllers(&self, filter: Value) -> Result<Vec<DeliveryController>, SoftLayerError> {
        network::list_delivery_controllers(self, filter)
    }
}

#[async_trait::async_trait]
impl VirtualGuestService for MockSoftLayerClient {
    async fn create_virtual_guest(&self, template: &VirtualGuestTemplate) -> Result<VirtualGuest, SoftLayerError> {
        compute::create_virtual_guest(self, template)
    }

    async fn get_virtual_guest(&self, id: u64) -> Result<VirtualGuest, SoftLayerError> {
        compute::get_virtual_guest(self, id)
    }

    async fn edit_virtual_guest(&self, id: u64, edit: &VirtualGuestEdit) -> Result<bool, SoftLayerError> {
        compute::edit_virtual_guest(self, id, edit)
    }

    async fn set_virtual_guest_tags(&self, id: u64, tags: &str) -> Result<bool, SoftLayerError> {
        compute::set_virtual_guest_tags(self, id, tags)
    }

    async fn delete_virtual_guest(&self, id: u64) -> Result<bool, SoftLayerError> {
        compute::delete_virtual_guest(self, id)
    }
}

#[async_trait::async_trait]
impl HardwareService for MockSoftLayerClient {
    async fn create_hardware(&self, template: &HardwareTemplate) -> Result<Hardware, SoftLayerError> {
        compute::create_hardware(self, template)
    }

    async fn get_hardware(&self, id: u64) -> Result<Hardware, SoftLayerError> {
        compute::get_hardware(self, id)
    }

    async fn edit_hardware(&self, id: u64, edit: &HardwareEdit) -> Result<bool, SoftLayerError> {
        compute::edit_hardware(self, id, edit)
    }

    async fn set_hardware_tags(&self, id: u64, tags: &str) -> Result<bool, SoftLayerError> {
        compute::set_hardware_tags(self, id, tags)
    }
}

#[async_trait::async_trait]
impl NetworkVlanService for MockSoftLayerClient {
    async fn get_network_vlan(&self, id: u64) -> Result<NetworkVlan, SoftLayerError> {
        network::get_network_vlan(self, id)
    }

    async fn edit_network_vlan(&self, id: u64, edit: &NetworkVlanEdit) -> Result<bool, SoftLayerError> {
        network::edit_network_vlan(self, id, edit)
    }
}

#[async_trait::async_trait]
impl NetworkStorageService for MockSoftLayerClient {
    async fn get_network_storage(&self, id: u64) -> Result<NetworkStorage, SoftLayerError> {
        storage::get_network_storage(self, id)
    }

    async fn edit_network_storage(&self, id: u64, edit: &NetworkStorageEdit) -> Result<bool, SoftLayerError> {
        storage::edit_network_storage(self, id, edit)
    }

    async fn allow_access_from_virtual_guests(&self, id: u64, guest_ids: &[u64]) -> Result<bool, SoftLayerError> {
        storage::change_access(self, id, storage::AccessChange::AllowGuests, guest_ids)
    }

    async fn remove_access_from_virtual_guests(&self, id: u64, guest_ids: &[u64]) -> Result<bool, SoftLayerError> {
        storage::change_access(self, id, storage::AccessChange::RemoveGuests, guest_ids)
    }

    async fn allow_access_from_hardware(&self, id: u64, hardware_ids: &[u64]) -> Result<bool, SoftLayerError> {
        storage::change_access(self, id, storage::AccessChange::AllowHardware, hardware_ids)
    }

    async fn remove_access_from_hardware(&self, id: u64, hardware_ids: &[u64]) -> Result<bool, SoftLayerError> {
        storage::change_access(self, id, storage::AccessChange::RemoveHardware, hardware_ids)
    }
}

#[async_trait::async_trait]
impl DnsService for MockSoftLayerClient {
    async fn create_dns_domain(&self, template: &DnsDomainTemplate) -> Result<DnsDomain, SoftLayerError> {
        dns::create_dns_domain(self, template)
    }

    async fn get_dns_domain(&self, id: u64) -> Result<DnsDomain, SoftLayerError> {
        dns::get_dns_domain(self, id)
    }

    async fn delete_dns_domain(&self, id: u64) -> Result<bool, SoftLayerError> {
        dns::delete_dns_domain(self, id)
    }

    async fn create_dns_record(&self, template: &DnsRecordTemplate) -> Result<DnsRecord, SoftLayerError> {
        dns::create_dns_record(self, template)
    }

    async fn get_dns_record(&self, id: u64) -> Result<DnsRecord, SoftLayerError> {
        dns::get_dns_record(self, id)
    }

    async fn edit_dns_record(&self, id: u64, edit: &DnsRecordEdit) -> Result<bool, SoftLayerError> {
        dns::edit_dns_record(self, id, edit)
    }

    async fn delete_dns_record(&self, id: u64) -> Result<bool, SoftLayerError> {
        dns::delete_dns_record(self, id)
    }
}

#[async_trait::async_trait]
impl SshKeyService for MockSoftLayerClient {
    async fn create_ssh_key(&self, template: &SshKeyTemplate) -> Result<SshKey, SoftLayerError> {
        account::create_ssh_key(self, template)
    }

    async fn get_ssh_key(&self, id: u64) -> Result<SshKey, SoftLayerError> {
        account::get_ssh_key(self, id)
    }

    async fn edit_ssh_key(&self, id: u64, edit: &SshKeyEdit) -> Result<bool, SoftLayerError> {
        account::edit_ssh_key(self, id, edit)
    }

    async fn delete_ssh_key(&self, id: u64) -> Result<bool, SoftLayerError> {
        account::delete_ssh_key(self, id)
    }
}

#[async_trait::async_trait]
impl UserService for MockSoftLayerClient {
    async fn create_user(&self, template: &UserTemplate, password: Option<&str>) -> Result<User, SoftLayerError> {
        account::create_user(self, template, password)
    }

    async fn get_user(&self, id: u64) -> Result<User, SoftLayerError> {
        account::get_user(self, id)
    }

    async fn edit_user(&self, id: u64, edit: &UserEdit) -> Result<bool, SoftLayerError> {
        account::edit_user(self, id, edit)
    }

    async fn get_user_permissions(&self, id: u64) -> Result<Vec<Permission>, SoftLayerError> {
        account::get_user_permissions(self, id)
    }

    async fn add_user_permissions(&self, id: u64, key_names: &[String]) -> Result<bool, SoftLayerError> {
        account::add_user_permissions(self, id, key_names)
    }

    async fn remove_user_permissions(&self, id: u64, key_names: &[String]) -> Result<bool, SoftLayerError> {
        account::remove_user_permissions(self, id, key_names)
    }
}

#[async_trait::async_trait]
impl ProductService for MockSoftLayerClient {
    async fn find_package(&self, key_name: &str) -> Result<Option<ProductPackage>, SoftLayerError> {
        ordering::find_package(self, key_name)
    }

    async fn get_package_items(&self, package_id: u64) -> Result<Vec<ProductItem>, SoftLayerError> {
        ordering::get_package_items(self, package_id)
    }

    async fn find_datacenter(&self, name: &str) -> Result<Option<Datacenter>, SoftLayerError> {
        ordering::find_datacenter(self, name)
    }

    async fn place_order(&self, order: &OrderContainer) -> Result<OrderReceipt, SoftLayerError> {
        ordering::place_order(self, order)
    }
}

#[async_trait::async_trait]
impl BillingService for MockSoftLayerClient {
    async fn cancel_service(&self, billing_item_id: u64) -> Result<bool, SoftLayerError> {
        ordering::cancel(self, "SoftLayer_Billing_Item::cancelService", billing_item_id)
    }

    async fn cancel_item(&self, billing_item_id: u64, _immediate: bool, _reason: &str) -> Result<bool, SoftLayerError> {
        ordering::cancel(self, "SoftLayer_Billing_Item::cancelItem", billing_item_id)
    }
}

#[async_trait::async_trait]
impl LoadBalancerService for MockSoftLayerClient {
    async fn get_delivery_controller(&self, id: u64) -> Result<DeliveryController, SoftLayerError> {
        network::get_delivery_controller(self, id)
    }

    async fn list_virtual_ips(&self, nadc_id: u64) -> Result<Vec<LoadBalancerVip>, SoftLayerError> {
        network::list_virtual_ips(self, nadc_id)
    }

    async fn create_virtual_ip(&self, nadc_id: u64, vip: &LoadBalancerVip) -> Result<bool, SoftLayerError> {
        network::create_virtual_ip(self, nadc_id, vip)
    }

    async fn update_virtual_ip(&self, nadc_id: u64, vip: &LoadBalancerVipEdit) -> Result<bool, SoftLayerError> {
        network::update_virtual_ip(self, nadc_id, vip)
    }

    async fn delete_virtual_ip(&self, nadc_id: u64, name: &str) -> Result<bool, SoftLayerError> {
        network::delete_virtual_ip(self, nadc_id, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_fault_fires_requested_times() {
        let client = MockSoftLayerClient::new();
        client.fail_next(
            "SoftLayer_Account::getCurrentUser",
            "SoftLayer_Exception_Public",
            "Operation already in progress",
            2,
        );

        assert!(client.get_current_user().await.unwrap_err().is_transient());
        assert!(client.get_current_user().await.unwrap_err().is_transient());
        assert!(client.get_current_user().await.is_ok());
        assert_eq!(client.calls_to("SoftLayer_Account::getCurrentUser").len(), 3);
    }

    #[test]
    fn test_poll_settled_counts_down() {
        let client = MockSoftLayerClient::new();
        client.set_provisioning_polls(2);
        client.start_provisioning("guest", 7);

        assert!(!client.poll_settled("guest", 7));
        assert!(client.poll_settled("guest", 7));
        assert!(client.poll_settled("guest", 7));
        assert!(client.poll_settled("guest", 8));
    }

    #[test]
    fn test_not_found_is_classified() {
        let err = MockSoftLayerClient::not_found("SoftLayer_Virtual_Guest", 4);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("SoftLayer_Virtual_Guest"));
    }
}
