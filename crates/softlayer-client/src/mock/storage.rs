//! Storage operations for MockSoftLayerClient
//!
//! Handles file and block volumes ordered through storage-as-a-service

use super::MockSoftLayerClient;
use super::helpers::{address, billing_item, filtered_order_id};
use crate::error::SoftLayerError;
use crate::models::*;
use serde_json::{Value, json};

/// Which allowed-host list an access call changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessChange {
    AllowGuests,
    RemoveGuests,
    AllowHardware,
    RemoveHardware,
}

impl AccessChange {
    fn method(self) -> &'static str {
        match self {
            Self::AllowGuests => "SoftLayer_Network_Storage::allowAccessFromVirtualGuestList",
            Self::RemoveGuests => "SoftLayer_Network_Storage::removeAccessFromVirtualGuestList",
            Self::AllowHardware => "SoftLayer_Network_Storage::allowAccessFromHardwareList",
            Self::RemoveHardware => "SoftLayer_Network_Storage::removeAccessFromHardwareList",
        }
    }
}

fn has_category(items: &[ProductItem], code: &str) -> bool {
    items
        .iter()
        .any(|i| i.item_category.as_ref().map(|c| c.category_code.as_str()) == Some(code))
}

fn category_item<'a>(items: &'a [ProductItem], code: &str) -> Option<&'a ProductItem> {
    items
        .iter()
        .find(|i| i.item_category.as_ref().map(|c| c.category_code.as_str()) == Some(code))
}

/// Create the volume an order asked for; visible once provisioning settles
pub(crate) fn provision_volume(
    client: &MockSoftLayerClient,
    order: &OrderContainer,
    order_id: u64,
    datacenter: Datacenter,
    items: &[ProductItem],
) -> Result<(), SoftLayerError> {
    let file = has_category(items, "storage_file");
    if !file && !has_category(items, "storage_block") {
        return Err(SoftLayerError::api(
            500,
            "SoftLayer_Exception_Order_InvalidConfiguration",
            "A storage_file or storage_block price is required.",
        ));
    }
    let size = order
        .extra
        .get("volumeSize")
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            SoftLayerError::api(
                500,
                "SoftLayer_Exception_Order_InvalidConfiguration",
                "volumeSize is required.",
            )
        })?;

    let tier = category_item(items, "storage_tier_level");
    let (storage_type, provisioned_iops) = match tier {
        Some(tier) => (
            "ENDURANCE",
            tier.capacity.map(|per_gb| ((size as f64) * per_gb) as u64),
        ),
        None => (
            "PERFORMANCE",
            order.extra.get("iops").and_then(Value::as_u64),
        ),
    };
    let protocol = if file { "FILE" } else { "BLOCK" };

    let id = client.next_id();
    let mut volume = NetworkStorage {
        id,
        username: Some(format!("SL01SEV278444_{}", id)),
        capacity_gb: Some(size as u32),
        snapshot_capacity_gb: category_item(items, "storage_snapshot_space")
            .and_then(|i| i.capacity)
            .map(|c| (c as u64).to_string()),
        storage_type: Some(KeyNameRef {
            key_name: format!("{}_{}_STORAGE", storage_type, protocol),
        }),
        storage_tier_level: tier.map(|t| t.key_name.clone()),
        provisioned_iops: provisioned_iops.map(|iops| iops.to_string()),
        service_resource_backend_ip_address: Some(address("10.70", id)),
        file_network_mount_address: file.then(|| {
            format!(
                "fsf-{}-fz.service.softlayer.com:/SL01SEV278444_{}/data01",
                datacenter.name, id
            )
        }),
        service_resource: Some(ServiceResource {
            datacenter: Some(datacenter),
        }),
        allowed_virtual_guests: Vec::new(),
        allowed_hardware: Vec::new(),
        active_transaction_count: Some(1),
        notes: None,
        billing_item: Some(billing_item(client.next_id(), Some(order_id))),
    };

    client.start_provisioning("storage", id);
    client.start_provisioning("storage_transaction", id);
    if client.settles_immediately() {
        volume.active_transaction_count = Some(0);
    }
    client.storage.lock().unwrap().insert(id, volume);
    Ok(())
}

pub fn list_network_storage(client: &MockSoftLayerClient, filter: Value) -> Result<Vec<NetworkStorage>, SoftLayerError> {
    client.enter("SoftLayer_Account::getNetworkStorage", filter.clone())?;
    let order_id = filtered_order_id(&filter, "networkStorage");

    let candidates: Vec<NetworkStorage> = client
        .storage
        .lock()
        .unwrap()
        .values()
        .filter(|s| order_id.is_none() || s.billing_item.as_ref().and_then(|b| b.order_id()) == order_id)
        .cloned()
        .collect();

    let mut visible: Vec<NetworkStorage> = candidates
        .into_iter()
        .filter(|s| client.poll_settled("storage", s.id))
        .collect();
    visible.sort_by_key(|s| s.id);
    Ok(visible)
}

pub fn get_network_storage(client: &MockSoftLayerClient, id: u64) -> Result<NetworkStorage, SoftLayerError> {
    client.enter("SoftLayer_Network_Storage::getObject", json!(id))?;
    if !client.storage.lock().unwrap().contains_key(&id) {
        return Err(MockSoftLayerClient::not_found("SoftLayer_Network_Storage", id));
    }

    let settled = client.poll_settled("storage_transaction", id);
    let mut store = client.storage.lock().unwrap();
    let volume = store
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Network_Storage", id))?;
    if settled && volume.active_transaction_count.unwrap_or(0) > 0 {
        volume.active_transaction_count = Some(0);
    }
    Ok(volume.clone())
}

pub fn edit_network_storage(client: &MockSoftLayerClient, id: u64, edit: &NetworkStorageEdit) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_Network_Storage::editObject",
        json!({ "id": id, "template": serde_json::to_value(edit)? }),
    )?;
    let mut store = client.storage.lock().unwrap();
    let volume = store
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Network_Storage", id))?;
    if let Some(notes) = &edit.notes {
        volume.notes = Some(notes.clone());
    }
    Ok(true)
}

pub fn change_access(client: &MockSoftLayerClient, id: u64, change: AccessChange, host_ids: &[u64]) -> Result<bool, SoftLayerError> {
    client.enter(change.method(), json!({ "id": id, "hosts": host_ids }))?;
    let mut store = client.storage.lock().unwrap();
    let volume = store
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Network_Storage", id))?;

    let list = match change {
        AccessChange::AllowGuests | AccessChange::RemoveGuests => &mut volume.allowed_virtual_guests,
        AccessChange::AllowHardware | AccessChange::RemoveHardware => &mut volume.allowed_hardware,
    };
    match change {
        AccessChange::AllowGuests | AccessChange::AllowHardware => {
            for host in host_ids {
                if !list.iter().any(|r| r.id == *host) {
                    list.push(IdRef { id: *host });
                }
            }
        }
        AccessChange::RemoveGuests | AccessChange::RemoveHardware => {
            list.retain(|r| !host_ids.contains(&r.id));
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::softlayer_trait::NetworkStorageService;

    #[tokio::test]
    async fn test_access_lists_are_idempotent() {
        let client = MockSoftLayerClient::new();
        client.add_network_storage(NetworkStorage {
            id: 3,
            ..Default::default()
        });

        client.allow_access_from_virtual_guests(3, &[1, 2]).await.unwrap();
        client.allow_access_from_virtual_guests(3, &[2]).await.unwrap();
        client.allow_access_from_hardware(3, &[7]).await.unwrap();
        client.remove_access_from_virtual_guests(3, &[1]).await.unwrap();

        let volume = client.get_network_storage(3).await.unwrap();
        assert_eq!(volume.allowed_virtual_guests, vec![IdRef { id: 2 }]);
        assert_eq!(volume.allowed_hardware, vec![IdRef { id: 7 }]);
    }

    #[tokio::test]
    async fn test_mass_access_fault_can_be_scripted() {
        let client = MockSoftLayerClient::new();
        client.add_network_storage(NetworkStorage {
            id: 3,
            ..Default::default()
        });
        client.fail_next(
            "SoftLayer_Network_Storage::allowAccessFromHardwareList",
            "SoftLayer_Exception_Network_Storage_Group_MassAccessControlModification",
            "A mass access control modification is in progress",
            1,
        );

        let err = client.allow_access_from_hardware(3, &[7]).await.unwrap_err();
        assert!(err.is_transient());
        assert!(client.allow_access_from_hardware(3, &[7]).await.is_ok());
    }
}
