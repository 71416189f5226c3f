//! `softlayer_vlan`: ordered public or private VLANs with a primary subnet

use crate::crud::{self, Cancellation, parse_id, read_or_clear};
use crate::error::ProviderError;
use crate::pricing::{self, PriceQuery};
use crate::resource::Resource;
use crate::wait::{Timing, wait_for_order};
use provider_schema::{Attribute, AttributeType, ResourceData, Schema, validators};
use softlayer_client::{
    AccountService, BillingService, NetworkVlan, NetworkVlanEdit, NetworkVlanService, ProductService, filter_eq,
};
use std::sync::Arc;
use tracing::{info, warn};

pub const TYPE_NAME: &str = "softlayer_vlan";

const PACKAGE_KEY: &str = "ADDITIONAL_SERVICES_NETWORK_VLAN";
const ORDER_TYPE: &str = "SoftLayer_Container_Product_Order_Network_Vlan";

fn schema() -> Schema {
    Schema::new()
        .attribute(
            "type",
            Attribute::string()
                .required()
                .force_new()
                .validate_with(validators::one_of(&["PUBLIC", "PRIVATE"])),
        )
        .attribute("datacenter", Attribute::string().required().force_new())
        .attribute(
            "subnet_size",
            Attribute::int()
                .required()
                .force_new()
                .description("Addresses in the primary subnet")
                .validate_with(validators::int_one_of(&[8, 16, 32, 64])),
        )
        .attribute("name", Attribute::string().optional())
        .attribute("vlan_number", Attribute::int().computed())
        .attribute("router_hostname", Attribute::string().computed())
        .attribute("subnets", Attribute::list(AttributeType::String).computed())
}

pub struct VlanResource<C: ?Sized> {
    client: Arc<C>,
    schema: Schema,
    timing: Timing,
}

impl<C: ?Sized> VlanResource<C> {
    pub fn new(client: Arc<C>, timing: Timing) -> Self {
        Self {
            client,
            schema: schema(),
            timing,
        }
    }
}

/// Item key name and subnet category for a VLAN of the given network space
fn vlan_items(vlan_type: &str) -> (String, &'static str) {
    let subnet_category = if vlan_type == "PUBLIC" {
        "sov_sec_ip_addresses_pub"
    } else {
        "sov_sec_ip_addresses_priv"
    };
    (format!("{}_NETWORK_VLAN", vlan_type), subnet_category)
}

fn apply_vlan(data: &mut ResourceData, vlan: &NetworkVlan) {
    data.set_opt("type", vlan.network_space.clone());
    if let Some(datacenter) = vlan.primary_router.as_ref().and_then(|r| r.datacenter.as_ref()) {
        data.set("datacenter", datacenter.name.clone());
    }
    data.set_opt("name", vlan.name.clone().filter(|n| !n.is_empty()));
    data.set("vlan_number", vlan.vlan_number.unwrap_or_default());
    data.set(
        "router_hostname",
        vlan.primary_router.as_ref().map(|r| r.hostname.clone()).unwrap_or_default(),
    );

    let primary = vlan
        .subnets
        .iter()
        .find(|s| s.subnet_type.as_deref() == Some("PRIMARY"))
        .or_else(|| vlan.subnets.first());
    if let Some(subnet) = primary.filter(|s| s.cidr <= 32) {
        data.set("subnet_size", 1u64 << (32 - u32::from(subnet.cidr)));
    }
    let subnets: Vec<String> = vlan
        .subnets
        .iter()
        .map(|s| format!("{}/{}", s.network_identifier, s.cidr))
        .collect();
    data.set("subnets", subnets);
}

#[async_trait::async_trait]
impl<C> Resource for VlanResource<C>
where
    C: NetworkVlanService + AccountService + ProductService + BillingService + ?Sized + 'static,
{
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let vlan_type = data.require_str("type")?.to_string();
        let datacenter = data.require_str("datacenter")?.to_string();
        let subnet_size = data.require_i64("subnet_size")?;

        let (package, items) = pricing::package_items(self.client.as_ref(), PACKAGE_KEY).await?;
        let location = pricing::datacenter_id(self.client.as_ref(), &datacenter).await?;
        let (vlan_key, subnet_category) = vlan_items(&vlan_type);
        let prices = vec![
            pricing::select_price(&items, &PriceQuery::category("network_vlan").key_name(&vlan_key))?,
            pricing::select_price(
                &items,
                &PriceQuery::category(subnet_category).capacity(subnet_size as f64),
            )?,
        ];

        let order = pricing::order_container(ORDER_TYPE, package.id, location, prices);
        let receipt = self.client.place_order(&order).await?;
        info!(
            "Placed order {} for a {} VLAN in {} with {} addresses",
            receipt.order_id, vlan_type, datacenter, subnet_size
        );

        let filter = filter_eq("networkVlans.billingItem.orderItem.order.id", receipt.order_id);
        let vlan = wait_for_order("VLAN order", receipt.order_id, &self.timing.create, || {
            self.client.list_network_vlans(filter.clone())
        })
        .await?;
        data.set_id(vlan.id.to_string());
        info!("VLAN {} provisioned by order {}", vlan.id, receipt.order_id);

        if let Some(name) = data.get_str("name") {
            let edit = NetworkVlanEdit {
                name: Some(name.to_string()),
            };
            self.client.edit_network_vlan(vlan.id, &edit).await?;
        }

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        if let Some(vlan) = read_or_clear(data, TYPE_NAME, self.client.get_network_vlan(id)).await? {
            apply_vlan(data, &vlan);
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        if data.has_change("name") {
            let edit = NetworkVlanEdit {
                name: Some(data.get_str("name").unwrap_or_default().to_string()),
            };
            self.client.edit_network_vlan(id, &edit).await?;
            info!("Renamed VLAN {}", id);
        }
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let vlan = match self.client.get_network_vlan(id).await {
            Ok(vlan) => vlan,
            Err(e) if e.is_not_found() => {
                data.clear_id();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        match vlan.billing_item {
            Some(billing_item) => {
                crud::cancel_billing_item(self.client.as_ref(), billing_item.id, Cancellation::Service).await?
            }
            // Automatically assigned VLANs are not billed and go away with their hosts
            None => warn!("VLAN {} has no billing item, leaving it to SoftLayer", id),
        }
        data.clear_id();
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let id = parse_id(data)?;
        crud::exists_by_id(self.client.get_network_vlan(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{config, fast_timing};
    use serde_json::{Map, Value, json};
    use softlayer_client::MockSoftLayerClient;
    use softlayer_client::mock::{MOCK_DATACENTER_ID, VLAN_PACKAGE_ID};

    fn resource(client: &MockSoftLayerClient) -> VlanResource<MockSoftLayerClient> {
        VlanResource::new(Arc::new(client.clone()), fast_timing())
    }

    fn vlan_config(vlan_type: &str) -> Map<String, Value> {
        config(json!({
            "type": vlan_type,
            "datacenter": "dal06",
            "subnet_size": 16,
            "name": "app-tier"
        }))
    }

    #[tokio::test]
    async fn test_create_orders_and_waits_for_vlan() {
        let client = MockSoftLayerClient::with_catalog();
        client.set_provisioning_polls(3);
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vlan_config("PUBLIC"));

        resource.create(&mut data).await.unwrap();

        let orders = client.calls_to("SoftLayer_Product_Order::placeOrder");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0]["packageId"], VLAN_PACKAGE_ID);
        assert_eq!(orders[0]["location"], MOCK_DATACENTER_ID.to_string());
        assert_eq!(orders[0]["prices"].as_array().unwrap().len(), 2);
        assert!(client.calls_to("SoftLayer_Account::getNetworkVlans").len() >= 3);

        assert_eq!(data.get_str("type"), Some("PUBLIC"));
        assert_eq!(data.get_str("name"), Some("app-tier"));
        assert_eq!(data.get_i64("subnet_size"), Some(16));
        assert!(data.get_str("router_hostname").unwrap().starts_with("fcr01a"));
        assert_eq!(data.get_strings("subnets").len(), 1);
        assert!(data.missing_computed(resource.schema()).is_empty());
    }

    #[tokio::test]
    async fn test_private_vlan_uses_portable_private_subnet() {
        let client = MockSoftLayerClient::with_catalog();
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vlan_config("PRIVATE"));

        resource.create(&mut data).await.unwrap();
        assert!(data.get_str("router_hostname").unwrap().starts_with("bcr01a"));
        assert_eq!(data.get_str("type"), Some("PRIVATE"));
    }

    #[tokio::test]
    async fn test_unknown_datacenter_fails_before_ordering() {
        let client = MockSoftLayerClient::with_catalog();
        let resource = resource(&client);
        let mut cfg = vlan_config("PUBLIC");
        cfg.insert("datacenter".to_string(), json!("nowhere01"));
        let mut data = ResourceData::create(resource.schema(), cfg);

        let err = resource.create(&mut data).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation { .. }));
        assert!(client.calls_to("SoftLayer_Product_Order::placeOrder").is_empty());
    }

    #[tokio::test]
    async fn test_rename_and_cancel() {
        let client = MockSoftLayerClient::with_catalog();
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vlan_config("PUBLIC"));
        resource.create(&mut data).await.unwrap();

        let mut cfg = vlan_config("PUBLIC");
        cfg.insert("name".to_string(), json!("web-tier"));
        let mut data = ResourceData::update(resource.schema(), data.id().unwrap(), data.state(), cfg);
        assert!(data.force_new_changes(resource.schema()).is_empty());
        resource.update(&mut data).await.unwrap();
        assert_eq!(data.get_str("name"), Some("web-tier"));

        resource.delete(&mut data).await.unwrap();
        assert_eq!(data.id(), None);
        assert_eq!(client.calls_to("SoftLayer_Billing_Item::cancelService").len(), 1);
    }

    #[tokio::test]
    async fn test_delete_forgives_pending_cancellation() {
        let client = MockSoftLayerClient::with_catalog();
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vlan_config("PUBLIC"));
        resource.create(&mut data).await.unwrap();

        client.fail_next(
            "SoftLayer_Billing_Item::cancelService",
            "SoftLayer_Exception_Public",
            "A cancellation request already exists for this billing item.",
            1,
        );
        resource.delete(&mut data).await.unwrap();
        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_order_timeout_reports_last_state() {
        let client = MockSoftLayerClient::with_catalog();
        client.set_provisioning_polls(10_000);
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vlan_config("PUBLIC"));

        match resource.create(&mut data).await {
            Err(ProviderError::Timeout { last_state, .. }) => assert!(last_state.contains("not yet fulfilled")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
