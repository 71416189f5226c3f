//! Network operations for MockSoftLayerClient
//!
//! Handles VLANs, NetScaler VPX appliances and their virtual IPs

use super::MockSoftLayerClient;
use super::helpers::{address, billing_item, filtered_order_id};
use crate::error::SoftLayerError;
use crate::models::*;
use serde_json::{Value, json};

/// Create the VLAN an order asked for; visible once provisioning settles
pub(crate) fn provision_vlan(
    client: &MockSoftLayerClient,
    order_id: u64,
    datacenter: Datacenter,
    items: &[ProductItem],
) -> Result<(), SoftLayerError> {
    let vlan_item = items
        .iter()
        .find(|i| i.key_name.ends_with("_NETWORK_VLAN"))
        .ok_or_else(|| {
            SoftLayerError::api(
                500,
                "SoftLayer_Exception_Order_InvalidConfiguration",
                "A network_vlan price is required.",
            )
        })?;
    let public = vlan_item.key_name.starts_with("PUBLIC");
    let subnet_size = items
        .iter()
        .filter(|i| i.key_name.contains("IP_ADDRESSES"))
        .find_map(|i| i.capacity)
        .unwrap_or(8.0);

    let id = client.next_id();
    let router_prefix = if public { "fcr01a" } else { "bcr01a" };
    let vlan = NetworkVlan {
        id,
        vlan_number: Some(800 + (id % 400) as u32),
        name: None,
        network_space: Some(if public { "PUBLIC" } else { "PRIVATE" }.to_string()),
        primary_router: Some(Router {
            hostname: format!("{}.{}", router_prefix, datacenter.name),
            datacenter: Some(datacenter),
        }),
        subnets: vec![Subnet {
            network_identifier: address(if public { "169.50" } else { "10.50" }, id * 64),
            cidr: 32 - subnet_size.log2() as u8,
            subnet_type: Some("PRIMARY".to_string()),
        }],
        billing_item: Some(billing_item(client.next_id(), Some(order_id))),
    };

    client.start_provisioning("vlan", id);
    client.vlans.lock().unwrap().insert(id, vlan);
    Ok(())
}

pub fn list_network_vlans(client: &MockSoftLayerClient, filter: Value) -> Result<Vec<NetworkVlan>, SoftLayerError> {
    client.enter("SoftLayer_Account::getNetworkVlans", filter.clone())?;
    let order_id = filtered_order_id(&filter, "networkVlans");

    let candidates: Vec<NetworkVlan> = client
        .vlans
        .lock()
        .unwrap()
        .values()
        .filter(|v| order_id.is_none() || v.billing_item.as_ref().and_then(|b| b.order_id()) == order_id)
        .cloned()
        .collect();

    let mut visible: Vec<NetworkVlan> = candidates
        .into_iter()
        .filter(|v| client.poll_settled("vlan", v.id))
        .collect();
    visible.sort_by_key(|v| v.id);
    Ok(visible)
}

pub fn get_network_vlan(client: &MockSoftLayerClient, id: u64) -> Result<NetworkVlan, SoftLayerError> {
    client.enter("SoftLayer_Network_Vlan::getObject", json!(id))?;
    client
        .vlans
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Network_Vlan", id))
}

pub fn edit_network_vlan(client: &MockSoftLayerClient, id: u64, edit: &NetworkVlanEdit) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_Network_Vlan::editObject",
        json!({ "id": id, "template": serde_json::to_value(edit)? }),
    )?;
    let mut vlans = client.vlans.lock().unwrap();
    let vlan = vlans
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Network_Vlan", id))?;
    if let Some(name) = &edit.name {
        vlan.name = Some(name.clone());
    }
    Ok(true)
}

/// Create the NetScaler an order asked for; visible once provisioning settles
pub(crate) fn provision_delivery_controller(
    client: &MockSoftLayerClient,
    order_id: u64,
    datacenter: Datacenter,
    items: &[ProductItem],
) -> Result<(), SoftLayerError> {
    let appliance = items
        .iter()
        .find(|i| i.key_name.starts_with("CITRIX_NETSCALER_VPX"))
        .ok_or_else(|| {
            SoftLayerError::api(
                500,
                "SoftLayer_Exception_Order_InvalidConfiguration",
                "An application_delivery_controller price is required.",
            )
        })?;

    let id = client.next_id();
    let controller = DeliveryController {
        id,
        name: format!("SLADC{}", id),
        description: appliance.description.clone(),
        management_ip_address: Some(address("10.60", id)),
        primary_ip_address: Some(address("169.60", id)),
        datacenter: Some(datacenter),
        network_vlans: vec![
            NetworkVlan {
                id: client.next_id(),
                network_space: Some("PUBLIC".to_string()),
                ..Default::default()
            },
            NetworkVlan {
                id: client.next_id(),
                network_space: Some("PRIVATE".to_string()),
                ..Default::default()
            },
        ],
        billing_item: Some(billing_item(client.next_id(), Some(order_id))),
    };

    client.start_provisioning("nadc", id);
    client.delivery_controllers.lock().unwrap().insert(id, controller);
    client.virtual_ips.lock().unwrap().insert(id, Vec::new());
    Ok(())
}

pub fn list_delivery_controllers(client: &MockSoftLayerClient, filter: Value) -> Result<Vec<DeliveryController>, SoftLayerError> {
    client.enter(
        "SoftLayer_Account::getApplicationDeliveryControllers",
        filter.clone(),
    )?;
    let order_id = filtered_order_id(&filter, "applicationDeliveryControllers");

    let candidates: Vec<DeliveryController> = client
        .delivery_controllers
        .lock()
        .unwrap()
        .values()
        .filter(|c| order_id.is_none() || c.billing_item.as_ref().and_then(|b| b.order_id()) == order_id)
        .cloned()
        .collect();

    let mut visible: Vec<DeliveryController> = candidates
        .into_iter()
        .filter(|c| client.poll_settled("nadc", c.id))
        .collect();
    visible.sort_by_key(|c| c.id);
    Ok(visible)
}

pub fn get_delivery_controller(client: &MockSoftLayerClient, id: u64) -> Result<DeliveryController, SoftLayerError> {
    client.enter(
        "SoftLayer_Network_Application_Delivery_Controller::getObject",
        json!(id),
    )?;
    client
        .delivery_controllers
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .ok_or_else(|| {
            MockSoftLayerClient::not_found("SoftLayer_Network_Application_Delivery_Controller", id)
        })
}

pub fn list_virtual_ips(client: &MockSoftLayerClient, nadc_id: u64) -> Result<Vec<LoadBalancerVip>, SoftLayerError> {
    client.enter(
        "SoftLayer_Network_Application_Delivery_Controller::getLoadBalancers",
        json!(nadc_id),
    )?;
    client
        .virtual_ips
        .lock()
        .unwrap()
        .get(&nadc_id)
        .cloned()
        .ok_or_else(|| {
            MockSoftLayerClient::not_found("SoftLayer_Network_Application_Delivery_Controller", nadc_id)
        })
}

pub fn create_virtual_ip(client: &MockSoftLayerClient, nadc_id: u64, vip: &LoadBalancerVip) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_Network_Application_Delivery_Controller::createLiveLoadBalancer",
        json!({ "nadcId": nadc_id, "vip": serde_json::to_value(vip)? }),
    )?;
    let mut vips = client.virtual_ips.lock().unwrap();
    let existing = vips.get_mut(&nadc_id).ok_or_else(|| {
        MockSoftLayerClient::not_found("SoftLayer_Network_Application_Delivery_Controller", nadc_id)
    })?;
    if existing.iter().any(|v| v.name == vip.name) {
        return Err(SoftLayerError::api(
            500,
            "SoftLayer_Exception_Public",
            format!("A virtual IP named {} already exists.", vip.name),
        ));
    }
    existing.push(vip.clone());
    Ok(true)
}

pub fn update_virtual_ip(client: &MockSoftLayerClient, nadc_id: u64, edit: &LoadBalancerVipEdit) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_Network_Application_Delivery_Controller::updateLiveLoadBalancer",
        json!({ "nadcId": nadc_id, "vip": serde_json::to_value(edit)? }),
    )?;
    let mut vips = client.virtual_ips.lock().unwrap();
    let vip = vips
        .get_mut(&nadc_id)
        .and_then(|list| list.iter_mut().find(|v| v.name == edit.name))
        .ok_or_else(|| {
            SoftLayerError::NotFound(format!("virtual IP {} on NADC {}", edit.name, nadc_id))
        })?;
    if let Some(port) = edit.source_port {
        vip.source_port = port;
    }
    if let Some(method) = &edit.load_balancing_method {
        vip.load_balancing_method = method.clone();
    }
    if let Some(persistence) = &edit.persistence {
        vip.persistence = Some(persistence.clone());
    }
    if let Some(certificate) = edit.security_certificate_id {
        vip.security_certificate_id = certificate;
    }
    if let Some(limit) = edit.connection_limit {
        vip.connection_limit = Some(limit);
    }
    if let Some(notes) = &edit.notes {
        vip.notes = Some(notes.clone());
    }
    Ok(true)
}

pub fn delete_virtual_ip(client: &MockSoftLayerClient, nadc_id: u64, name: &str) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_Network_Application_Delivery_Controller::deleteLiveLoadBalancer",
        json!({ "nadcId": nadc_id, "name": name }),
    )?;
    let mut vips = client.virtual_ips.lock().unwrap();
    let list = vips.get_mut(&nadc_id).ok_or_else(|| {
        MockSoftLayerClient::not_found("SoftLayer_Network_Application_Delivery_Controller", nadc_id)
    })?;
    let before = list.len();
    list.retain(|v| v.name != name);
    if list.len() == before {
        return Err(SoftLayerError::NotFound(format!(
            "virtual IP {} on NADC {}",
            name, nadc_id
        )));
    }
    Ok(true)
}
