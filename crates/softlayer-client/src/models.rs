//! SoftLayer API models
//!
//! These models mirror the SoftLayer data types (`SoftLayer_Virtual_Guest`,
//! `SoftLayer_Hardware`, `SoftLayer_Network_Storage`, ...) as returned by the
//! REST endpoint. Only the properties the provider masks for are modelled;
//! every field is optional on the wire, so structs default missing values.
//! See: https://sldn.softlayer.com/reference/datatypes/

use serde::{Deserialize, Deserializer, Serialize};

/// Accepts a number or a numeric string.
///
/// SoftLayer serializes capacities and capacity restrictions as strings
/// (`"20"`, `"0.25"`) while other numeric properties arrive as numbers.
fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected number or numeric string, got {}",
            other
        ))),
    }
}

/// Keeps an explicit `null` apart from a missing key in edit templates.
///
/// `None` leaves the remote property alone, `Some(None)` clears it.
fn de_nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// Shared references

/// Datacenter reference (`SoftLayer_Location_Datacenter`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Datacenter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
}

impl Datacenter {
    /// Reference by short name, as accepted by `createObject` templates
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            long_name: None,
        }
    }
}

/// Billing item reference attached to most billable objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingItemRef {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_item: Option<OrderItemRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderItemRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderRef {
    pub id: u64,
}

impl BillingItemRef {
    /// Order id that produced this billing item, when masked for
    pub fn order_id(&self) -> Option<u64> {
        self.order_item
            .as_ref()
            .and_then(|item| item.order.as_ref())
            .map(|order| order.id)
    }
}

/// Tag reference (`SoftLayer_Tag_Reference`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TagReference {
    pub tag: Tag,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tag {
    pub name: String,
}

/// Collect tag names from a list of tag references
pub fn tag_names(references: &[TagReference]) -> Vec<String> {
    let mut names: Vec<String> = references.iter().map(|r| r.tag.name.clone()).collect();
    names.sort();
    names
}

/// Identifier-only reference used in templates (`{"id": 42}`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: u64,
}

/// Global-identifier reference (image templates)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalIdRef {
    pub global_identifier: String,
}

/// Key-name reference (`{"keyName": "..."}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyNameRef {
    pub key_name: String,
}

/// Network component speed request
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkComponent {
    pub max_speed: u32,
}

/// Primary network component pinned to a VLAN
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryNetworkComponent {
    pub network_vlan: IdRef,
}

/// User-data attribute (`SoftLayer_Virtual_Guest_Attribute`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserData {
    pub value: String,
}

// Virtual guests

/// Virtual guest (`SoftLayer_Virtual_Guest`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VirtualGuest {
    pub id: u64,
    pub hostname: String,
    pub domain: String,
    pub fully_qualified_domain_name: Option<String>,
    pub global_identifier: Option<String>,
    pub start_cpus: Option<u32>,
    pub max_memory: Option<u64>,
    pub datacenter: Option<Datacenter>,
    pub primary_ip_address: Option<String>,
    pub primary_backend_ip_address: Option<String>,
    pub hourly_billing_flag: Option<bool>,
    pub local_disk_flag: Option<bool>,
    pub dedicated_account_host_only_flag: Option<bool>,
    pub private_network_only_flag: Option<bool>,
    pub network_components: Vec<NetworkComponent>,
    pub operating_system_reference_code: Option<String>,
    pub notes: Option<String>,
    pub tag_references: Vec<TagReference>,
    pub active_transaction_count: Option<u32>,
    pub provision_date: Option<String>,
    pub billing_item: Option<BillingItemRef>,
}

/// Template passed to `SoftLayer_Virtual_Guest::createObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualGuestTemplate {
    pub hostname: String,
    pub domain: String,
    pub start_cpus: u32,
    pub max_memory: u64,
    pub datacenter: Datacenter,
    pub hourly_billing_flag: bool,
    pub local_disk_flag: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedicated_account_host_only_flag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_network_only_flag: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system_reference_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_device_template_group: Option<GlobalIdRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub network_components: Vec<NetworkComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_network_component: Option<PrimaryNetworkComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_backend_network_component: Option<PrimaryNetworkComponent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_keys: Vec<IdRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_install_script_uri: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_data: Vec<UserData>,
}

/// Partial object passed to `SoftLayer_Virtual_Guest::editObject`
///
/// Only populated fields are serialized, so unchanged remote attributes are
/// never written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualGuestEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl VirtualGuestEdit {
    pub fn is_empty(&self) -> bool {
        self.hostname.is_none() && self.domain.is_none() && self.notes.is_none()
    }
}

// Bare metal

/// Physical server (`SoftLayer_Hardware`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hardware {
    pub id: u64,
    pub hostname: String,
    pub domain: String,
    pub global_identifier: Option<String>,
    pub provision_date: Option<String>,
    pub datacenter: Option<Datacenter>,
    pub primary_ip_address: Option<String>,
    pub primary_backend_ip_address: Option<String>,
    pub hourly_billing_flag: Option<bool>,
    pub private_network_only_flag: Option<bool>,
    pub network_components: Vec<NetworkComponent>,
    pub operating_system_reference_code: Option<String>,
    pub fixed_configuration_preset: Option<KeyNameRef>,
    pub notes: Option<String>,
    pub tag_references: Vec<TagReference>,
    pub active_transaction_count: Option<u32>,
    pub billing_item: Option<BillingItemRef>,
}

/// Template passed to `SoftLayer_Hardware::createObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareTemplate {
    pub hostname: String,
    pub domain: String,
    pub datacenter: Datacenter,
    pub hourly_billing_flag: bool,
    pub fixed_configuration_preset: KeyNameRef,
    pub operating_system_reference_code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub network_components: Vec<NetworkComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_network_only_flag: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_keys: Vec<IdRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_install_script_uri: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_data: Vec<UserData>,
}

/// Partial object passed to `SoftLayer_Hardware::editObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// Network

/// VLAN (`SoftLayer_Network_Vlan`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkVlan {
    pub id: u64,
    pub vlan_number: Option<u32>,
    pub name: Option<String>,
    pub network_space: Option<String>,
    pub primary_router: Option<Router>,
    pub subnets: Vec<Subnet>,
    pub billing_item: Option<BillingItemRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Router {
    pub hostname: String,
    pub datacenter: Option<Datacenter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subnet {
    pub network_identifier: String,
    pub cidr: u8,
    pub subnet_type: Option<String>,
}

/// Partial object passed to `SoftLayer_Network_Vlan::editObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkVlanEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// Storage

/// File or block volume (`SoftLayer_Network_Storage`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkStorage {
    pub id: u64,
    pub username: Option<String>,
    pub capacity_gb: Option<u32>,
    pub snapshot_capacity_gb: Option<String>,
    pub storage_type: Option<KeyNameRef>,
    pub storage_tier_level: Option<String>,
    pub provisioned_iops: Option<String>,
    pub service_resource_backend_ip_address: Option<String>,
    pub file_network_mount_address: Option<String>,
    pub service_resource: Option<ServiceResource>,
    pub allowed_virtual_guests: Vec<IdRef>,
    pub allowed_hardware: Vec<IdRef>,
    pub active_transaction_count: Option<u32>,
    pub notes: Option<String>,
    pub billing_item: Option<BillingItemRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceResource {
    pub datacenter: Option<Datacenter>,
}

/// Partial object passed to `SoftLayer_Network_Storage::editObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStorageEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// DNS

/// DNS zone (`SoftLayer_Dns_Domain`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsDomain {
    pub id: u64,
    pub name: String,
    pub serial: Option<u64>,
    pub update_date: Option<String>,
    pub resource_records: Vec<DnsRecord>,
}

/// Template passed to `SoftLayer_Dns_Domain::createObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsDomainTemplate {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource_records: Vec<DnsRecordTemplate>,
}

/// DNS record (`SoftLayer_Dns_Domain_ResourceRecord`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsRecord {
    pub id: u64,
    pub domain_id: u64,
    pub host: String,
    pub data: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: u32,
    pub mx_priority: Option<u32>,
    pub priority: Option<u32>,
    pub weight: Option<u32>,
    pub port: Option<u32>,
    pub service: Option<String>,
    pub protocol: Option<String>,
    pub responsible_person: Option<String>,
    pub refresh: Option<u32>,
    pub retry: Option<u32>,
    pub expire: Option<u32>,
    pub minimum: Option<u32>,
}

/// Template passed to `SoftLayer_Dns_Domain_ResourceRecord::createObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecordTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<u64>,
    pub host: String,
    pub data: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mx_priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_person: Option<String>,
}

/// Partial object passed to `SoftLayer_Dns_Domain_ResourceRecord::editObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsRecordEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_nullable")]
    pub mx_priority: Option<Option<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_nullable")]
    pub priority: Option<Option<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_nullable")]
    pub weight: Option<Option<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_nullable")]
    pub port: Option<Option<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_nullable")]
    pub responsible_person: Option<Option<String>>,
}

// Security

/// SSH public key (`SoftLayer_Security_Ssh_Key`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SshKey {
    pub id: u64,
    pub key: String,
    pub label: String,
    pub notes: Option<String>,
    pub fingerprint: Option<String>,
}

/// Template passed to `SoftLayer_Security_Ssh_Key::createObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKeyTemplate {
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial object passed to `SoftLayer_Security_Ssh_Key::editObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshKeyEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// Users

/// Portal user (`SoftLayer_User_Customer`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub office_phone: Option<String>,
    pub timezone_id: Option<u32>,
    pub user_status_id: Option<u32>,
    pub account_id: Option<u64>,
}

/// Template passed to `SoftLayer_User_Customer::createObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTemplate {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company_name: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_phone: Option<String>,
    pub timezone_id: u32,
    pub user_status_id: u32,
}

/// Partial object passed to `SoftLayer_User_Customer::editObject`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEdit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_status_id: Option<u32>,
}

/// Portal permission (`SoftLayer_User_Customer_CustomerPermission_Permission`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permission {
    pub key_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// User status id for active portal users
pub const USER_STATUS_ACTIVE: u32 = 1001;
/// User status id that schedules a user for removal
pub const USER_STATUS_CANCEL_PENDING: u32 = 1021;

// Products and orders

/// Product package (`SoftLayer_Product_Package`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductPackage {
    pub id: u64,
    pub key_name: String,
    pub name: Option<String>,
}

/// Orderable item (`SoftLayer_Product_Item`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductItem {
    pub id: u64,
    pub key_name: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "de_opt_number")]
    pub capacity: Option<f64>,
    pub units: Option<String>,
    pub item_category: Option<ItemCategory>,
    pub prices: Vec<ItemPrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemCategory {
    pub category_code: String,
}

/// Price of an item (`SoftLayer_Product_Item_Price`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemPrice {
    pub id: u64,
    pub location_group_id: Option<u64>,
    pub categories: Vec<ItemCategory>,
    pub capacity_restriction_type: Option<String>,
    #[serde(deserialize_with = "de_opt_number")]
    pub capacity_restriction_minimum: Option<f64>,
    #[serde(deserialize_with = "de_opt_number")]
    pub capacity_restriction_maximum: Option<f64>,
    pub hourly_recurring_fee: Option<String>,
    pub recurring_fee: Option<String>,
}

impl ItemPrice {
    /// True when the price is listed under the given category code
    pub fn has_category(&self, code: &str) -> bool {
        self.categories.iter().any(|c| c.category_code == code)
    }
}

/// Order container passed to `SoftLayer_Product_Order::placeOrder`
///
/// `extra` carries the container-specific properties (`volumeSize`, `iops`,
/// `osFormatType`, ...) so one type serves every complex type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderContainer {
    pub complex_type: String,
    pub package_id: u64,
    pub location: String,
    pub quantity: u32,
    pub prices: Vec<IdRef>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Receipt returned by `placeOrder`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderReceipt {
    pub order_id: u64,
    pub order_date: Option<String>,
}

// Load balancers

/// NetScaler VPX appliance (`SoftLayer_Network_Application_Delivery_Controller`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeliveryController {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub management_ip_address: Option<String>,
    pub primary_ip_address: Option<String>,
    pub datacenter: Option<Datacenter>,
    pub network_vlans: Vec<NetworkVlan>,
    pub billing_item: Option<BillingItemRef>,
}

/// Virtual IP served by a NetScaler (`SoftLayer_Network_LoadBalancer_VirtualIpAddress`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancerVip {
    pub name: String,
    pub virtual_ip_address: String,
    pub source_port: u32,
    #[serde(rename = "type")]
    pub vip_type: String,
    pub load_balancing_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_certificate_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Sparse VIP used with `updateLiveLoadBalancer`; `name` selects the VIP
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerVipEdit {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancing_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_nullable")]
    pub security_certificate_id: Option<Option<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_price_accepts_string_capacities() {
        let price: ItemPrice = serde_json::from_value(serde_json::json!({
            "id": 10,
            "categories": [{"categoryCode": "performance_storage_iops"}],
            "capacityRestrictionType": "STORAGE_SPACE",
            "capacityRestrictionMinimum": "20",
            "capacityRestrictionMaximum": "12000"
        }))
        .unwrap();

        assert_eq!(price.capacity_restriction_minimum, Some(20.0));
        assert_eq!(price.capacity_restriction_maximum, Some(12000.0));
        assert!(price.has_category("performance_storage_iops"));
        assert_eq!(price.location_group_id, None);
    }

    #[test]
    fn test_item_capacity_accepts_numbers_and_fractions() {
        let item: ProductItem = serde_json::from_value(serde_json::json!({
            "id": 1,
            "keyName": "LOW_INTENSITY_TIER",
            "capacity": "0.25"
        }))
        .unwrap();
        assert_eq!(item.capacity, Some(0.25));

        let item: ProductItem =
            serde_json::from_value(serde_json::json!({"id": 2, "capacity": 1000})).unwrap();
        assert_eq!(item.capacity, Some(1000.0));
    }

    #[test]
    fn test_edit_objects_skip_unset_fields() {
        let edit = VirtualGuestEdit {
            notes: Some("rebuilt".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&edit).unwrap(),
            serde_json::json!({"notes": "rebuilt"})
        );
        assert!(!edit.is_empty());
        assert!(VirtualGuestEdit::default().is_empty());
    }

    #[test]
    fn test_order_container_flattens_extra_properties() {
        let mut extra = serde_json::Map::new();
        extra.insert("volumeSize".to_string(), serde_json::json!(20));
        let order = OrderContainer {
            complex_type: "SoftLayer_Container_Product_Order_Network_Storage_AsAService".to_string(),
            package_id: 759,
            location: "dal06".to_string(),
            quantity: 1,
            prices: vec![IdRef { id: 1 }],
            extra,
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["volumeSize"], 20);
        assert_eq!(value["packageId"], 759);
        assert_eq!(value["prices"][0]["id"], 1);
    }

    #[test]
    fn test_billing_item_order_id() {
        let item: BillingItemRef = serde_json::from_value(serde_json::json!({
            "id": 5,
            "orderItem": {"order": {"id": 77}}
        }))
        .unwrap();
        assert_eq!(item.order_id(), Some(77));
        assert_eq!(BillingItemRef::default().order_id(), None);
    }

    #[test]
    fn test_edit_distinguishes_cleared_from_untouched() {
        let edit = DnsRecordEdit {
            ttl: Some(300),
            responsible_person: Some(None),
            ..Default::default()
        };
        let value = serde_json::to_value(&edit).unwrap();
        assert_eq!(value, serde_json::json!({"ttl": 300, "responsiblePerson": null}));

        let parsed: DnsRecordEdit = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, edit);
        assert_eq!(parsed.priority, None);
    }
}
