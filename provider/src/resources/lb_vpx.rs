//! `softlayer_lb_vpx`: Citrix NetScaler VPX appliances
//!
//! The appliance is ordered from the `NETSCALER_VPX` package; the ordered
//! item encodes version, bandwidth and plan in its key name. Those attributes
//! are fixed for the life of the appliance, so they all force a new one.

use crate::crud::{self, Cancellation, parse_id, read_or_clear};
use crate::error::ProviderError;
use crate::pricing::{self, PriceQuery};
use crate::resource::Resource;
use crate::wait::{Timing, wait_for_order};
use provider_schema::{Attribute, ResourceData, Schema, validators};
use softlayer_client::{
    AccountService, BillingService, DeliveryController, LoadBalancerService, ProductService, filter_eq,
};
use std::sync::Arc;
use tracing::{info, warn};

pub const TYPE_NAME: &str = "softlayer_lb_vpx";

const PACKAGE_KEY: &str = "NETSCALER_VPX";
const ORDER_TYPE: &str = "SoftLayer_Container_Product_Order_Network_Application_Delivery_Controller";

fn schema() -> Schema {
    Schema::new()
        .attribute("datacenter", Attribute::string().required().force_new())
        .attribute(
            "speed",
            Attribute::int()
                .required()
                .force_new()
                .description("Bandwidth in Mbps")
                .validate_with(validators::int_one_of(&[10, 200, 1000])),
        )
        .attribute(
            "version",
            Attribute::string()
                .required()
                .force_new()
                .validate_with(validators::one_of(&["10.1", "10.5"])),
        )
        .attribute(
            "plan",
            Attribute::string()
                .optional()
                .force_new()
                .default("Standard")
                .validate_with(validators::one_of(&["Standard", "Platinum"])),
        )
        .attribute(
            "ip_count",
            Attribute::int()
                .required()
                .force_new()
                .description("Static public IP addresses for virtual IPs")
                .validate_with(validators::int_one_of(&[2, 4, 8, 16])),
        )
        .attribute("name", Attribute::string().computed())
        .attribute("management_ip_address", Attribute::string().computed())
        .attribute("primary_ip_address", Attribute::string().computed())
        .attribute("front_end_vlan_id", Attribute::int().computed())
        .attribute("back_end_vlan_id", Attribute::int().computed())
}

pub struct LbVpxResource<C: ?Sized> {
    client: Arc<C>,
    schema: Schema,
    timing: Timing,
}

impl<C: ?Sized> LbVpxResource<C> {
    pub fn new(client: Arc<C>, timing: Timing) -> Self {
        Self {
            client,
            schema: schema(),
            timing,
        }
    }
}

/// Key name of the appliance item, e.g. `CITRIX_NETSCALER_VPX_10_5_200MBPS_PLATINUM`
fn appliance_key(version: &str, speed: i64, plan: &str) -> String {
    format!(
        "CITRIX_NETSCALER_VPX_{}_{}MBPS_{}",
        version.replace('.', "_"),
        speed,
        plan.to_uppercase()
    )
}

fn apply_controller(data: &mut ResourceData, controller: &DeliveryController) {
    data.set("name", controller.name.clone());
    if let Some(datacenter) = &controller.datacenter {
        data.set("datacenter", datacenter.name.clone());
    }
    data.set(
        "management_ip_address",
        controller.management_ip_address.clone().unwrap_or_default(),
    );
    data.set(
        "primary_ip_address",
        controller.primary_ip_address.clone().unwrap_or_default(),
    );

    let vlan = |space: &str| {
        controller
            .network_vlans
            .iter()
            .find(|v| v.network_space.as_deref() == Some(space))
            .map(|v| v.id)
    };
    data.set_opt("front_end_vlan_id", vlan("PUBLIC"));
    data.set_opt("back_end_vlan_id", vlan("PRIVATE"));
}

#[async_trait::async_trait]
impl<C> Resource for LbVpxResource<C>
where
    C: LoadBalancerService + AccountService + ProductService + BillingService + ?Sized + 'static,
{
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let datacenter = data.require_str("datacenter")?.to_string();
        let speed = data.require_i64("speed")?;
        let version = data.require_str("version")?.to_string();
        let plan = data.get_str("plan").unwrap_or("Standard").to_string();
        let ip_count = data.require_i64("ip_count")?;

        let (package, items) = pricing::package_items(self.client.as_ref(), PACKAGE_KEY).await?;
        let location = pricing::datacenter_id(self.client.as_ref(), &datacenter).await?;
        let appliance = appliance_key(&version, speed, &plan);
        let addresses = format!("{}_PUBLIC_IP_ADDRESSES", ip_count);
        let prices = vec![
            pricing::select_price(
                &items,
                &PriceQuery::category("application_delivery_controller").key_name(&appliance),
            )?,
            pricing::select_price(
                &items,
                &PriceQuery::category("sov_sec_ip_addresses_pub").key_name(&addresses),
            )?,
        ];

        let order = pricing::order_container(ORDER_TYPE, package.id, location, prices);
        let receipt = self.client.place_order(&order).await?;
        info!("Placed order {} for {} in {}", receipt.order_id, appliance, datacenter);

        let filter = filter_eq(
            "applicationDeliveryControllers.billingItem.orderItem.order.id",
            receipt.order_id,
        );
        let controller = wait_for_order("NetScaler VPX order", receipt.order_id, &self.timing.create, || {
            self.client.list_delivery_controllers(filter.clone())
        })
        .await?;
        data.set_id(controller.id.to_string());
        info!("NetScaler VPX {} (ID: {}) provisioned", controller.name, controller.id);

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        if let Some(controller) = read_or_clear(data, TYPE_NAME, self.client.get_delivery_controller(id)).await? {
            apply_controller(data, &controller);
        }
        Ok(())
    }

    /// Nothing on an appliance can change in place
    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let controller = match self.client.get_delivery_controller(id).await {
            Ok(controller) => controller,
            Err(e) if e.is_not_found() => {
                data.clear_id();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        match controller.billing_item {
            Some(billing_item) => {
                crud::cancel_billing_item(self.client.as_ref(), billing_item.id, Cancellation::Service).await?
            }
            None => warn!("NetScaler VPX {} has no billing item, nothing to cancel", id),
        }
        data.clear_id();
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let id = parse_id(data)?;
        crud::exists_by_id(self.client.get_delivery_controller(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{config, fast_timing};
    use serde_json::{Map, Value, json};
    use softlayer_client::MockSoftLayerClient;
    use softlayer_client::mock::VPX_PACKAGE_ID;

    fn resource(client: &MockSoftLayerClient) -> LbVpxResource<MockSoftLayerClient> {
        LbVpxResource::new(Arc::new(client.clone()), fast_timing())
    }

    fn vpx_config() -> Map<String, Value> {
        config(json!({
            "datacenter": "dal06",
            "speed": 200,
            "version": "10.5",
            "plan": "Platinum",
            "ip_count": 4
        }))
    }

    #[test]
    fn test_appliance_key() {
        assert_eq!(
            appliance_key("10.1", 10, "Standard"),
            "CITRIX_NETSCALER_VPX_10_1_10MBPS_STANDARD"
        );
    }

    #[tokio::test]
    async fn test_create_orders_appliance_and_addresses() {
        let client = MockSoftLayerClient::with_catalog();
        client.set_provisioning_polls(2);
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vpx_config());

        resource.create(&mut data).await.unwrap();

        let order = &client.calls_to("SoftLayer_Product_Order::placeOrder")[0];
        assert_eq!(order["packageId"], VPX_PACKAGE_ID);
        assert_eq!(order["prices"].as_array().unwrap().len(), 2);

        let id = data.id().unwrap().to_string();
        assert_eq!(data.get_str("name"), Some(format!("SLADC{}", id).as_str()));
        assert_ne!(data.get_i64("front_end_vlan_id"), data.get_i64("back_end_vlan_id"));
        assert_eq!(data.get_str("plan"), Some("Platinum"));
        assert!(data.missing_computed(resource.schema()).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_plan_combination_has_no_price() {
        let client = MockSoftLayerClient::with_catalog();
        let resource = resource(&client);
        let mut cfg = vpx_config();
        cfg.insert("ip_count".to_string(), json!(32));
        let mut data = ResourceData::create(resource.schema(), cfg);

        let err = resource.create(&mut data).await.unwrap_err();
        assert!(matches!(err, ProviderError::NoMatchingPrice(_)));
        assert!(client.calls_to("SoftLayer_Product_Order::placeOrder").is_empty());
    }

    #[tokio::test]
    async fn test_delete_cancels_service() {
        let client = MockSoftLayerClient::with_catalog();
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vpx_config());
        resource.create(&mut data).await.unwrap();
        let id = data.id().unwrap().to_string();

        resource.delete(&mut data).await.unwrap();
        assert_eq!(client.calls_to("SoftLayer_Billing_Item::cancelService").len(), 1);

        let mut stale = ResourceData::from_state(resource.schema(), id, Map::new());
        resource.read(&mut stale).await.unwrap();
        assert_eq!(stale.id(), None);
    }
}
