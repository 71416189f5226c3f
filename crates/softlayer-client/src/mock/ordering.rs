//! Ordering operations for MockSoftLayerClient
//!
//! Handles the product catalog, order placement and billing cancellation

use super::{MockSoftLayerClient, network, storage};
use crate::error::SoftLayerError;
use crate::models::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn find_package(client: &MockSoftLayerClient, key_name: &str) -> Result<Option<ProductPackage>, SoftLayerError> {
    client.enter("SoftLayer_Product_Package::getAllObjects", json!(key_name))?;
    Ok(client
        .packages
        .lock()
        .unwrap()
        .values()
        .find(|(package, _)| package.key_name == key_name)
        .map(|(package, _)| package.clone()))
}

pub fn get_package_items(client: &MockSoftLayerClient, package_id: u64) -> Result<Vec<ProductItem>, SoftLayerError> {
    client.enter("SoftLayer_Product_Package::getItems", json!(package_id))?;
    client
        .packages
        .lock()
        .unwrap()
        .get(&package_id)
        .map(|(_, items)| items.clone())
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Product_Package", package_id))
}

pub fn find_datacenter(client: &MockSoftLayerClient, name: &str) -> Result<Option<Datacenter>, SoftLayerError> {
    client.enter("SoftLayer_Location_Datacenter::getDatacenters", json!(name))?;
    Ok(client.datacenters.lock().unwrap().get(name).cloned())
}

fn invalid_order(message: impl Into<String>) -> SoftLayerError {
    SoftLayerError::api(500, "SoftLayer_Exception_Order_InvalidConfiguration", message)
}

/// Resolve the priced items of an order, rejecting prices from other packages
fn ordered_items(client: &MockSoftLayerClient, order: &OrderContainer) -> Result<Vec<ProductItem>, SoftLayerError> {
    let packages = client.packages.lock().unwrap();
    let (_, items) = packages
        .get(&order.package_id)
        .ok_or_else(|| invalid_order(format!("Package {} does not exist.", order.package_id)))?;

    order
        .prices
        .iter()
        .map(|wanted| {
            items
                .iter()
                .find_map(|item| {
                    item.prices.iter().find(|p| p.id == wanted.id).map(|price| ProductItem {
                        prices: vec![price.clone()],
                        ..item.clone()
                    })
                })
                .ok_or_else(|| {
                    invalid_order(format!(
                        "Price {} is not valid for package {}.",
                        wanted.id, order.package_id
                    ))
                })
        })
        .collect()
}

fn order_datacenter(client: &MockSoftLayerClient, location: &str) -> Result<Datacenter, SoftLayerError> {
    client
        .datacenters
        .lock()
        .unwrap()
        .values()
        .find(|dc| dc.name == location || dc.id.map(|id| id.to_string()).as_deref() == Some(location))
        .cloned()
        .ok_or_else(|| invalid_order(format!("Location {} is not available.", location)))
}

pub fn place_order(client: &MockSoftLayerClient, order: &OrderContainer) -> Result<OrderReceipt, SoftLayerError> {
    client.enter(
        "SoftLayer_Product_Order::placeOrder",
        serde_json::to_value(order)?,
    )?;

    let items = ordered_items(client, order)?;
    let datacenter = order_datacenter(client, &order.location)?;
    let order_id = client.next_id();

    match order.complex_type.as_str() {
        "SoftLayer_Container_Product_Order_Network_Vlan" => {
            network::provision_vlan(client, order_id, datacenter, &items)?
        }
        "SoftLayer_Container_Product_Order_Network_Storage_AsAService" => {
            storage::provision_volume(client, order, order_id, datacenter, &items)?
        }
        "SoftLayer_Container_Product_Order_Network_Application_Delivery_Controller" => {
            network::provision_delivery_controller(client, order_id, datacenter, &items)?
        }
        other => {
            return Err(invalid_order(format!(
                "Unsupported order container {}.",
                other
            )));
        }
    }

    client.orders.lock().unwrap().insert(order_id, order.clone());
    Ok(OrderReceipt {
        order_id,
        order_date: Some(chrono::Utc::now().to_rfc3339()),
    })
}

fn remove_billed<T>(
    store: &Arc<Mutex<HashMap<u64, T>>>,
    billing_item_id: u64,
    billing: impl Fn(&T) -> Option<&BillingItemRef>,
) -> bool {
    let mut store = store.lock().unwrap();
    let found = store
        .iter()
        .find(|(_, object)| billing(object).map(|b| b.id) == Some(billing_item_id))
        .map(|(id, _)| *id);
    match found {
        Some(id) => {
            store.remove(&id);
            true
        }
        None => false,
    }
}

/// Cancel a billing item, removing the object it bills for
pub fn cancel(client: &MockSoftLayerClient, method: &str, billing_item_id: u64) -> Result<bool, SoftLayerError> {
    client.enter(method, json!(billing_item_id))?;

    if client
        .cancelled_billing_items
        .lock()
        .unwrap()
        .contains(&billing_item_id)
    {
        return Err(SoftLayerError::api(
            500,
            "SoftLayer_Exception_Public",
            "A cancellation request already exists for this billing item.",
        ));
    }

    let removed = remove_billed(&client.hardware, billing_item_id, |h| h.billing_item.as_ref())
        || remove_billed(&client.vlans, billing_item_id, |v| v.billing_item.as_ref())
        || remove_billed(&client.storage, billing_item_id, |s| s.billing_item.as_ref())
        || remove_billed(&client.delivery_controllers, billing_item_id, |c| c.billing_item.as_ref())
        || remove_billed(&client.virtual_guests, billing_item_id, |g| g.billing_item.as_ref());
    if !removed {
        return Err(MockSoftLayerClient::not_found("SoftLayer_Billing_Item", billing_item_id));
    }

    client
        .cancelled_billing_items
        .lock()
        .unwrap()
        .insert(billing_item_id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::helpers::{MOCK_DATACENTER_ID, VLAN_PACKAGE_ID};
    use crate::softlayer_trait::{AccountService, BillingService, ProductService};

    fn vlan_order(client: &MockSoftLayerClient) -> OrderContainer {
        let packages = client.packages.lock().unwrap();
        let (_, items) = packages.get(&VLAN_PACKAGE_ID).unwrap();
        let vlan = items.iter().find(|i| i.key_name == "PUBLIC_NETWORK_VLAN").unwrap();
        let subnet = items
            .iter()
            .find(|i| i.key_name == "16_STATIC_PUBLIC_IP_ADDRESSES")
            .unwrap();
        OrderContainer {
            complex_type: "SoftLayer_Container_Product_Order_Network_Vlan".to_string(),
            package_id: VLAN_PACKAGE_ID,
            location: MOCK_DATACENTER_ID.to_string(),
            quantity: 1,
            prices: vec![IdRef { id: vlan.prices[0].id }, IdRef { id: subnet.prices[0].id }],
            extra: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_ordered_vlan_appears_after_polls() {
        let client = MockSoftLayerClient::with_catalog();
        client.set_provisioning_polls(2);
        let receipt = client.place_order(&vlan_order(&client)).await.unwrap();

        let filter = crate::common::filter_eq(
            "networkVlans.billingItem.orderItem.order.id",
            receipt.order_id,
        );
        assert!(client.list_network_vlans(filter.clone()).await.unwrap().is_empty());
        let vlans = client.list_network_vlans(filter).await.unwrap();
        assert_eq!(vlans.len(), 1);
        assert_eq!(vlans[0].network_space.as_deref(), Some("PUBLIC"));
        assert_eq!(vlans[0].subnets[0].cidr, 28);
    }

    #[tokio::test]
    async fn test_foreign_price_rejected() {
        let client = MockSoftLayerClient::with_catalog();
        let mut order = vlan_order(&client);
        order.prices.push(IdRef { id: 1 });
        assert!(client.place_order(&order).await.is_err());
    }

    #[tokio::test]
    async fn test_second_cancel_reports_already_cancelled() {
        let client = MockSoftLayerClient::with_catalog();
        let receipt = client.place_order(&vlan_order(&client)).await.unwrap();
        let vlans = client
            .list_network_vlans(crate::common::filter_eq(
                "networkVlans.billingItem.orderItem.order.id",
                receipt.order_id,
            ))
            .await
            .unwrap();
        let billing_id = vlans[0].billing_item.as_ref().unwrap().id;

        client.cancel_service(billing_id).await.unwrap();
        let err = client.cancel_service(billing_id).await.unwrap_err();
        assert!(err.is_already_cancelled());
        assert!(client.cancelled_billing_items().contains(&billing_id));
    }
}
