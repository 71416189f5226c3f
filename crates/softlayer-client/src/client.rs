//! SoftLayer API client
//!
//! Implements the capability traits against the SoftLayer REST endpoint
//! (`{endpoint}/{Service}/{id}/{method}.json`), authenticating every call with
//! HTTP basic auth (username + API key).

use crate::common::{HttpClient, ObjectMask, Query, filter_eq, service_path};
use crate::error::SoftLayerError;
use crate::models::*;
use crate::softlayer_trait::*;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// Default public REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.softlayer.com/rest/v3.1";

const VIRTUAL_GUEST_MASK: &[&str] = &[
    "id",
    "hostname",
    "domain",
    "fullyQualifiedDomainName",
    "globalIdentifier",
    "startCpus",
    "maxMemory",
    "datacenter.name",
    "primaryIpAddress",
    "primaryBackendIpAddress",
    "hourlyBillingFlag",
    "localDiskFlag",
    "dedicatedAccountHostOnlyFlag",
    "privateNetworkOnlyFlag",
    "networkComponents.maxSpeed",
    "operatingSystemReferenceCode",
    "notes",
    "tagReferences.tag.name",
    "activeTransactionCount",
    "provisionDate",
    "billingItem.id",
];

const HARDWARE_MASK: &[&str] = &[
    "id",
    "hostname",
    "domain",
    "globalIdentifier",
    "provisionDate",
    "datacenter.name",
    "primaryIpAddress",
    "primaryBackendIpAddress",
    "hourlyBillingFlag",
    "privateNetworkOnlyFlag",
    "networkComponents.maxSpeed",
    "operatingSystemReferenceCode",
    "fixedConfigurationPreset.keyName",
    "notes",
    "tagReferences.tag.name",
    "activeTransactionCount",
    "billingItem.id",
];

const VLAN_MASK: &[&str] = &[
    "id",
    "vlanNumber",
    "name",
    "networkSpace",
    "primaryRouter.hostname",
    "primaryRouter.datacenter.name",
    "subnets.networkIdentifier",
    "subnets.cidr",
    "subnets.subnetType",
    "billingItem.id",
    "billingItem.orderItem.order.id",
];

const STORAGE_MASK: &[&str] = &[
    "id",
    "username",
    "capacityGb",
    "snapshotCapacityGb",
    "storageType.keyName",
    "storageTierLevel",
    "provisionedIops",
    "serviceResourceBackendIpAddress",
    "fileNetworkMountAddress",
    "serviceResource.datacenter.name",
    "allowedVirtualGuests.id",
    "allowedHardware.id",
    "activeTransactionCount",
    "notes",
    "billingItem.id",
    "billingItem.orderItem.order.id",
];

const DELIVERY_CONTROLLER_MASK: &[&str] = &[
    "id",
    "name",
    "description",
    "managementIpAddress",
    "primaryIpAddress",
    "datacenter.name",
    "networkVlans.id",
    "networkVlans.networkSpace",
    "billingItem.id",
    "billingItem.orderItem.order.id",
];

/// SoftLayer API client
pub struct SoftLayerClient {
    http: HttpClient,
}

impl SoftLayerClient {
    /// Create a new SoftLayer client
    ///
    /// # Arguments
    /// * `endpoint` - REST endpoint (e.g., "https://api.softlayer.com/rest/v3.1")
    /// * `username` - SoftLayer username
    /// * `api_key` - API key for the username
    /// * `timeout` - Per-request HTTP timeout
    pub fn new(
        endpoint: String,
        username: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, SoftLayerError> {
        if username.trim().is_empty() || api_key.trim().is_empty() {
            return Err(SoftLayerError::InvalidRequest(
                "username and api_key are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SoftLayerError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, endpoint, username, api_key),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the credentials by fetching the current user.
    ///
    /// # Returns
    /// * `Ok(())` - Credentials are valid and the endpoint is reachable
    /// * `Err(SoftLayerError)` - Credentials are invalid or the endpoint is unreachable
    pub async fn validate_credentials(&self) -> Result<(), SoftLayerError> {
        debug!("Validating SoftLayer credentials for {}", self.http.username());
        let user = self.get_current_user().await?;
        debug!("Credentials validated for user {} (ID: {})", user.username, user.id);
        Ok(())
    }

    async fn get_object<T: serde::de::DeserializeOwned>(
        &self,
        service: &str,
        id: u64,
        mask: &[&str],
    ) -> Result<T, SoftLayerError> {
        self.http
            .get(
                &service_path(service, Some(id), "getObject"),
                &Query::new().mask(ObjectMask::new(mask)),
            )
            .await
    }

    async fn list_account<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        mask: &[&str],
        filter: Value,
    ) -> Result<Vec<T>, SoftLayerError> {
        self.http
            .get(
                &service_path("SoftLayer_Account", None, method),
                &Query::new().mask(ObjectMask::new(mask)).filter(filter),
            )
            .await
    }

    async fn delete_object(&self, service: &str, id: u64) -> Result<bool, SoftLayerError> {
        self.http.delete(&format!("{}/{}", service, id)).await
    }

    fn to_param<T: serde::Serialize>(value: &T) -> Result<Value, SoftLayerError> {
        serde_json::to_value(value).map_err(SoftLayerError::Serialization)
    }

    fn id_list(ids: &[u64]) -> Value {
        Value::Array(ids.iter().map(|id| json!({ "id": id })).collect())
    }
}

#[async_trait::async_trait]
impl AccountService for SoftLayerClient {
    async fn get_current_user(&self) -> Result<User, SoftLayerError> {
        self.http
            .get("SoftLayer_Account/getCurrentUser", &Query::default())
            .await
    }

    async fn list_hardware(&self, filter: Value) -> Result<Vec<Hardware>, SoftLayerError> {
        self.list_account("getHardware", HARDWARE_MASK, filter).await
    }

    async fn list_network_vlans(&self, filter: Value) -> Result<Vec<NetworkVlan>, SoftLayerError> {
        self.list_account("getNetworkVlans", VLAN_MASK, filter).await
    }

    async fn list_network_storage(&self, filter: Value) -> Result<Vec<NetworkStorage>, SoftLayerError> {
        self.list_account("getNetworkStorage", STORAGE_MASK, filter).await
    }

    async fn list_delivery_controllers(&self, filter: Value) -> Result<Vec<DeliveryController>, SoftLayerError> {
        self.list_account("getApplicationDeliveryControllers", DELIVERY_CONTROLLER_MASK, filter)
            .await
    }
}

#[async_trait::async_trait]
impl VirtualGuestService for SoftLayerClient {
    async fn create_virtual_guest(&self, template: &VirtualGuestTemplate) -> Result<VirtualGuest, SoftLayerError> {
        debug!("Creating virtual guest {}.{}", template.hostname, template.domain);
        self.http
            .post(
                "SoftLayer_Virtual_Guest/createObject",
                vec![Self::to_param(template)?],
            )
            .await
    }

    async fn get_virtual_guest(&self, id: u64) -> Result<VirtualGuest, SoftLayerError> {
        self.get_object("SoftLayer_Virtual_Guest", id, VIRTUAL_GUEST_MASK).await
    }

    async fn edit_virtual_guest(&self, id: u64, edit: &VirtualGuestEdit) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Virtual_Guest", Some(id), "editObject"),
                vec![Self::to_param(edit)?],
            )
            .await
    }

    async fn set_virtual_guest_tags(&self, id: u64, tags: &str) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Virtual_Guest", Some(id), "setTags"),
                vec![json!(tags)],
            )
            .await
    }

    async fn delete_virtual_guest(&self, id: u64) -> Result<bool, SoftLayerError> {
        self.delete_object("SoftLayer_Virtual_Guest", id).await
    }
}

#[async_trait::async_trait]
impl HardwareService for SoftLayerClient {
    async fn create_hardware(&self, template: &HardwareTemplate) -> Result<Hardware, SoftLayerError> {
        debug!("Creating hardware {}.{}", template.hostname, template.domain);
        self.http
            .post("SoftLayer_Hardware/createObject", vec![Self::to_param(template)?])
            .await
    }

    async fn get_hardware(&self, id: u64) -> Result<Hardware, SoftLayerError> {
        self.get_object("SoftLayer_Hardware", id, HARDWARE_MASK).await
    }

    async fn edit_hardware(&self, id: u64, edit: &HardwareEdit) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Hardware", Some(id), "editObject"),
                vec![Self::to_param(edit)?],
            )
            .await
    }

    async fn set_hardware_tags(&self, id: u64, tags: &str) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Hardware", Some(id), "setTags"),
                vec![json!(tags)],
            )
            .await
    }
}

#[async_trait::async_trait]
impl NetworkVlanService for SoftLayerClient {
    async fn get_network_vlan(&self, id: u64) -> Result<NetworkVlan, SoftLayerError> {
        self.get_object("SoftLayer_Network_Vlan", id, VLAN_MASK).await
    }

    async fn edit_network_vlan(&self, id: u64, edit: &NetworkVlanEdit) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Network_Vlan", Some(id), "editObject"),
                vec![Self::to_param(edit)?],
            )
            .await
    }
}

#[async_trait::async_trait]
impl NetworkStorageService for SoftLayerClient {
    async fn get_network_storage(&self, id: u64) -> Result<NetworkStorage, SoftLayerError> {
        self.get_object("SoftLayer_Network_Storage", id, STORAGE_MASK).await
    }

    async fn edit_network_storage(&self, id: u64, edit: &NetworkStorageEdit) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Network_Storage", Some(id), "editObject"),
                vec![Self::to_param(edit)?],
            )
            .await
    }

    async fn allow_access_from_virtual_guests(&self, id: u64, guest_ids: &[u64]) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Network_Storage", Some(id), "allowAccessFromVirtualGuestList"),
                vec![Self::id_list(guest_ids)],
            )
            .await
    }

    async fn remove_access_from_virtual_guests(&self, id: u64, guest_ids: &[u64]) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Network_Storage", Some(id), "removeAccessFromVirtualGuestList"),
                vec![Self::id_list(guest_ids)],
            )
            .await
    }

    async fn allow_access_from_hardware(&self, id: u64, hardware_ids: &[u64]) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Network_Storage", Some(id), "allowAccessFromHardwareList"),
                vec![Self::id_list(hardware_ids)],
            )
            .await
    }

    async fn remove_access_from_hardware(&self, id: u64, hardware_ids: &[u64]) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Network_Storage", Some(id), "removeAccessFromHardwareList"),
                vec![Self::id_list(hardware_ids)],
            )
            .await
    }
}

#[async_trait::async_trait]
impl DnsService for SoftLayerClient {
    async fn create_dns_domain(&self, template: &DnsDomainTemplate) -> Result<DnsDomain, SoftLayerError> {
        debug!("Creating DNS domain {}", template.name);
        self.http
            .post("SoftLayer_Dns_Domain/createObject", vec![Self::to_param(template)?])
            .await
    }

    async fn get_dns_domain(&self, id: u64) -> Result<DnsDomain, SoftLayerError> {
        self.get_object(
            "SoftLayer_Dns_Domain",
            id,
            &["id", "name", "serial", "updateDate", "resourceRecords"],
        )
        .await
    }

    async fn delete_dns_domain(&self, id: u64) -> Result<bool, SoftLayerError> {
        self.delete_object("SoftLayer_Dns_Domain", id).await
    }

    async fn create_dns_record(&self, template: &DnsRecordTemplate) -> Result<DnsRecord, SoftLayerError> {
        debug!("Creating {} record {} -> {}", template.record_type, template.host, template.data);
        self.http
            .post(
                "SoftLayer_Dns_Domain_ResourceRecord/createObject",
                vec![Self::to_param(template)?],
            )
            .await
    }

    async fn get_dns_record(&self, id: u64) -> Result<DnsRecord, SoftLayerError> {
        self.http
            .get(
                &service_path("SoftLayer_Dns_Domain_ResourceRecord", Some(id), "getObject"),
                &Query::default(),
            )
            .await
    }

    async fn edit_dns_record(&self, id: u64, edit: &DnsRecordEdit) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Dns_Domain_ResourceRecord", Some(id), "editObject"),
                vec![Self::to_param(edit)?],
            )
            .await
    }

    async fn delete_dns_record(&self, id: u64) -> Result<bool, SoftLayerError> {
        self.delete_object("SoftLayer_Dns_Domain_ResourceRecord", id).await
    }
}

#[async_trait::async_trait]
impl SshKeyService for SoftLayerClient {
    async fn create_ssh_key(&self, template: &SshKeyTemplate) -> Result<SshKey, SoftLayerError> {
        debug!("Creating SSH key {}", template.label);
        self.http
            .post("SoftLayer_Security_Ssh_Key/createObject", vec![Self::to_param(template)?])
            .await
    }

    async fn get_ssh_key(&self, id: u64) -> Result<SshKey, SoftLayerError> {
        self.http
            .get(
                &service_path("SoftLayer_Security_Ssh_Key", Some(id), "getObject"),
                &Query::default(),
            )
            .await
    }

    async fn edit_ssh_key(&self, id: u64, edit: &SshKeyEdit) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_Security_Ssh_Key", Some(id), "editObject"),
                vec![Self::to_param(edit)?],
            )
            .await
    }

    async fn delete_ssh_key(&self, id: u64) -> Result<bool, SoftLayerError> {
        self.delete_object("SoftLayer_Security_Ssh_Key", id).await
    }
}

#[async_trait::async_trait]
impl UserService for SoftLayerClient {
    async fn create_user(&self, template: &UserTemplate, password: Option<&str>) -> Result<User, SoftLayerError> {
        debug!("Creating user {}", template.username);
        let mut parameters = vec![Self::to_param(template)?];
        if let Some(password) = password {
            parameters.push(json!(password));
        }
        self.http
            .post("SoftLayer_User_Customer/createObject", parameters)
            .await
    }

    async fn get_user(&self, id: u64) -> Result<User, SoftLayerError> {
        self.http
            .get(
                &service_path("SoftLayer_User_Customer", Some(id), "getObject"),
                &Query::default(),
            )
            .await
    }

    async fn edit_user(&self, id: u64, edit: &UserEdit) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path("SoftLayer_User_Customer", Some(id), "editObject"),
                vec![Self::to_param(edit)?],
            )
            .await
    }

    async fn get_user_permissions(&self, id: u64) -> Result<Vec<Permission>, SoftLayerError> {
        self.http
            .get(
                &service_path("SoftLayer_User_Customer", Some(id), "getPermissions"),
                &Query::default(),
            )
            .await
    }

    async fn add_user_permissions(&self, id: u64, key_names: &[String]) -> Result<bool, SoftLayerError> {
        let permissions: Vec<Value> = key_names.iter().map(|k| json!({ "keyName": k })).collect();
        self.http
            .post(
                &service_path("SoftLayer_User_Customer", Some(id), "addBulkPortalPermission"),
                vec![Value::Array(permissions)],
            )
            .await
    }

    async fn remove_user_permissions(&self, id: u64, key_names: &[String]) -> Result<bool, SoftLayerError> {
        let permissions: Vec<Value> = key_names.iter().map(|k| json!({ "keyName": k })).collect();
        self.http
            .post(
                &service_path("SoftLayer_User_Customer", Some(id), "removeBulkPortalPermission"),
                vec![Value::Array(permissions)],
            )
            .await
    }
}

#[async_trait::async_trait]
impl ProductService for SoftLayerClient {
    async fn find_package(&self, key_name: &str) -> Result<Option<ProductPackage>, SoftLayerError> {
        let mut packages: Vec<ProductPackage> = self
            .http
            .get(
                "SoftLayer_Product_Package/getAllObjects",
                &Query::new()
                    .mask(ObjectMask::new(&["id", "keyName", "name"]))
                    .filter(filter_eq("keyName", key_name)),
            )
            .await?;
        Ok(if packages.is_empty() { None } else { Some(packages.remove(0)) })
    }

    async fn get_package_items(&self, package_id: u64) -> Result<Vec<ProductItem>, SoftLayerError> {
        debug!("Fetching items for package {}", package_id);
        self.http
            .get(
                &service_path("SoftLayer_Product_Package", Some(package_id), "getItems"),
                &Query::new().mask(ObjectMask::new(&[
                    "id",
                    "keyName",
                    "description",
                    "capacity",
                    "units",
                    "itemCategory.categoryCode",
                    "prices.id",
                    "prices.locationGroupId",
                    "prices.categories.categoryCode",
                    "prices.capacityRestrictionType",
                    "prices.capacityRestrictionMinimum",
                    "prices.capacityRestrictionMaximum",
                    "prices.hourlyRecurringFee",
                    "prices.recurringFee",
                ])),
            )
            .await
    }

    async fn find_datacenter(&self, name: &str) -> Result<Option<Datacenter>, SoftLayerError> {
        let mut datacenters: Vec<Datacenter> = self
            .http
            .get(
                "SoftLayer_Location_Datacenter/getDatacenters",
                &Query::new()
                    .mask(ObjectMask::new(&["id", "name", "longName"]))
                    .filter(filter_eq("name", name)),
            )
            .await?;
        Ok(if datacenters.is_empty() { None } else { Some(datacenters.remove(0)) })
    }

    async fn place_order(&self, order: &OrderContainer) -> Result<OrderReceipt, SoftLayerError> {
        debug!("Placing {} order for package {}", order.complex_type, order.package_id);
        self.http
            .post(
                "SoftLayer_Product_Order/placeOrder",
                vec![Self::to_param(order)?, json!(false)],
            )
            .await
    }
}

#[async_trait::async_trait]
impl BillingService for SoftLayerClient {
    async fn cancel_service(&self, billing_item_id: u64) -> Result<bool, SoftLayerError> {
        debug!("Cancelling billing item {}", billing_item_id);
        self.http
            .get(
                &service_path("SoftLayer_Billing_Item", Some(billing_item_id), "cancelService"),
                &Query::default(),
            )
            .await
    }

    async fn cancel_item(&self, billing_item_id: u64, immediate: bool, reason: &str) -> Result<bool, SoftLayerError> {
        debug!("Cancelling billing item {} (immediate: {})", billing_item_id, immediate);
        self.http
            .post(
                &service_path("SoftLayer_Billing_Item", Some(billing_item_id), "cancelItem"),
                vec![json!(immediate), json!(true), json!(reason), json!("")],
            )
            .await
    }
}

#[async_trait::async_trait]
impl LoadBalancerService for SoftLayerClient {
    async fn get_delivery_controller(&self, id: u64) -> Result<DeliveryController, SoftLayerError> {
        self.get_object(
            "SoftLayer_Network_Application_Delivery_Controller",
            id,
            DELIVERY_CONTROLLER_MASK,
        )
        .await
    }

    async fn list_virtual_ips(&self, nadc_id: u64) -> Result<Vec<LoadBalancerVip>, SoftLayerError> {
        self.http
            .get(
                &service_path(
                    "SoftLayer_Network_Application_Delivery_Controller",
                    Some(nadc_id),
                    "getLoadBalancers",
                ),
                &Query::default(),
            )
            .await
    }

    async fn create_virtual_ip(&self, nadc_id: u64, vip: &LoadBalancerVip) -> Result<bool, SoftLayerError> {
        debug!("Creating VIP {} on NADC {}", vip.name, nadc_id);
        self.http
            .post(
                &service_path(
                    "SoftLayer_Network_Application_Delivery_Controller",
                    Some(nadc_id),
                    "createLiveLoadBalancer",
                ),
                vec![Self::to_param(vip)?],
            )
            .await
    }

    async fn update_virtual_ip(&self, nadc_id: u64, vip: &LoadBalancerVipEdit) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path(
                    "SoftLayer_Network_Application_Delivery_Controller",
                    Some(nadc_id),
                    "updateLiveLoadBalancer",
                ),
                vec![Self::to_param(vip)?],
            )
            .await
    }

    async fn delete_virtual_ip(&self, nadc_id: u64, name: &str) -> Result<bool, SoftLayerError> {
        self.http
            .post(
                &service_path(
                    "SoftLayer_Network_Application_Delivery_Controller",
                    Some(nadc_id),
                    "deleteLiveLoadBalancer",
                ),
                vec![json!({ "name": name })],
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_missing_credentials() {
        let result = SoftLayerClient::new(
            DEFAULT_ENDPOINT.to_string(),
            String::new(),
            "key".to_string(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(SoftLayerError::InvalidRequest(_))));
    }

    #[test]
    fn test_new_trims_endpoint() {
        let client = SoftLayerClient::new(
            format!("{}/", DEFAULT_ENDPOINT),
            "user".to_string(),
            "key".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_id_list_shape() {
        assert_eq!(
            SoftLayerClient::id_list(&[1, 2]),
            json!([{ "id": 1 }, { "id": 2 }])
        );
    }
}
