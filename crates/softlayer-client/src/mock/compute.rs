//! Compute operations for MockSoftLayerClient
//!
//! Handles virtual guests and bare metal hardware

use super::MockSoftLayerClient;
use super::helpers::{address, billing_item};
use crate::common::filter_operation;
use crate::error::SoftLayerError;
use crate::models::*;
use serde_json::{Value, json};

fn parse_tags(tags: &str) -> Vec<TagReference> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|name| TagReference {
            tag: Tag {
                name: name.to_string(),
            },
        })
        .collect()
}

fn settle_guest(guest: &mut VirtualGuest) {
    guest.active_transaction_count = Some(0);
    guest.primary_backend_ip_address = Some(address("10.40", guest.id));
    if guest.private_network_only_flag != Some(true) {
        guest.primary_ip_address = Some(address("169.45", guest.id));
    }
    guest.provision_date = Some(chrono::Utc::now().to_rfc3339());
}

pub fn create_virtual_guest(client: &MockSoftLayerClient, template: &VirtualGuestTemplate) -> Result<VirtualGuest, SoftLayerError> {
    client.enter(
        "SoftLayer_Virtual_Guest::createObject",
        serde_json::to_value(template)?,
    )?;

    if template.hostname.is_empty() || template.domain.is_empty() {
        return Err(SoftLayerError::api(
            500,
            "SoftLayer_Exception_MissingCreationProperty",
            "Property 'hostname' and 'domain' must be set for creation.",
        ));
    }

    let id = client.next_id();
    let mut guest = VirtualGuest {
        id,
        hostname: template.hostname.clone(),
        domain: template.domain.clone(),
        fully_qualified_domain_name: Some(format!("{}.{}", template.hostname, template.domain)),
        global_identifier: Some(uuid::Uuid::new_v4().to_string()),
        start_cpus: Some(template.start_cpus),
        max_memory: Some(template.max_memory),
        datacenter: Some(template.datacenter.clone()),
        primary_ip_address: None,
        primary_backend_ip_address: None,
        hourly_billing_flag: Some(template.hourly_billing_flag),
        local_disk_flag: Some(template.local_disk_flag),
        dedicated_account_host_only_flag: Some(template.dedicated_account_host_only_flag.unwrap_or(false)),
        private_network_only_flag: Some(template.private_network_only_flag.unwrap_or(false)),
        network_components: template.network_components.clone(),
        operating_system_reference_code: template.operating_system_reference_code.clone(),
        notes: None,
        tag_references: Vec::new(),
        active_transaction_count: Some(1),
        provision_date: None,
        billing_item: Some(billing_item(client.next_id(), None)),
    };

    client.start_provisioning("guest", id);
    if client.settles_immediately() {
        settle_guest(&mut guest);
    }

    client.virtual_guests.lock().unwrap().insert(id, guest.clone());
    Ok(guest)
}

pub fn get_virtual_guest(client: &MockSoftLayerClient, id: u64) -> Result<VirtualGuest, SoftLayerError> {
    client.enter("SoftLayer_Virtual_Guest::getObject", json!(id))?;
    if !client.virtual_guests.lock().unwrap().contains_key(&id) {
        return Err(MockSoftLayerClient::not_found("SoftLayer_Virtual_Guest", id));
    }

    let settled = client.poll_settled("guest", id);
    let mut guests = client.virtual_guests.lock().unwrap();
    let guest = guests
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Virtual_Guest", id))?;
    if settled && guest.active_transaction_count.unwrap_or(0) > 0 {
        settle_guest(guest);
    }
    Ok(guest.clone())
}

pub fn edit_virtual_guest(client: &MockSoftLayerClient, id: u64, edit: &VirtualGuestEdit) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_Virtual_Guest::editObject",
        json!({ "id": id, "template": serde_json::to_value(edit)? }),
    )?;
    let mut guests = client.virtual_guests.lock().unwrap();
    let guest = guests
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Virtual_Guest", id))?;
    if let Some(hostname) = &edit.hostname {
        guest.hostname = hostname.clone();
    }
    if let Some(domain) = &edit.domain {
        guest.domain = domain.clone();
    }
    if let Some(notes) = &edit.notes {
        guest.notes = Some(notes.clone());
    }
    guest.fully_qualified_domain_name = Some(format!("{}.{}", guest.hostname, guest.domain));
    Ok(true)
}

pub fn set_virtual_guest_tags(client: &MockSoftLayerClient, id: u64, tags: &str) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_Virtual_Guest::setTags",
        json!({ "id": id, "tags": tags }),
    )?;
    let mut guests = client.virtual_guests.lock().unwrap();
    let guest = guests
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Virtual_Guest", id))?;
    guest.tag_references = parse_tags(tags);
    Ok(true)
}

pub fn delete_virtual_guest(client: &MockSoftLayerClient, id: u64) -> Result<bool, SoftLayerError> {
    client.enter("SoftLayer_Virtual_Guest::deleteObject", json!(id))?;
    let mut guests = client.virtual_guests.lock().unwrap();
    match guests.get(&id) {
        None => Err(MockSoftLayerClient::not_found("SoftLayer_Virtual_Guest", id)),
        Some(guest) if guest.active_transaction_count.unwrap_or(0) > 0 => Err(SoftLayerError::api(
            500,
            "SoftLayer_Exception_Public",
            "There is currently an active transaction for this guest.",
        )),
        Some(_) => {
            guests.remove(&id);
            Ok(true)
        }
    }
}

fn settle_hardware(hardware: &mut Hardware) {
    hardware.provision_date = Some(chrono::Utc::now().to_rfc3339());
    hardware.active_transaction_count = Some(0);
    hardware.primary_backend_ip_address = Some(address("10.41", hardware.id));
    if hardware.private_network_only_flag != Some(true) {
        hardware.primary_ip_address = Some(address("169.46", hardware.id));
    }
}

/// `createObject` answers with the global identifier only; the numeric id
/// shows up once the server is visible in the account's hardware list.
pub fn create_hardware(client: &MockSoftLayerClient, template: &HardwareTemplate) -> Result<Hardware, SoftLayerError> {
    client.enter(
        "SoftLayer_Hardware::createObject",
        serde_json::to_value(template)?,
    )?;

    let id = client.next_id();
    let global_identifier = uuid::Uuid::new_v4().to_string();
    let mut hardware = Hardware {
        id,
        hostname: template.hostname.clone(),
        domain: template.domain.clone(),
        global_identifier: Some(global_identifier.clone()),
        provision_date: None,
        datacenter: Some(template.datacenter.clone()),
        primary_ip_address: None,
        primary_backend_ip_address: None,
        hourly_billing_flag: Some(template.hourly_billing_flag),
        private_network_only_flag: Some(template.private_network_only_flag.unwrap_or(false)),
        network_components: template.network_components.clone(),
        operating_system_reference_code: Some(template.operating_system_reference_code.clone()),
        fixed_configuration_preset: Some(template.fixed_configuration_preset.clone()),
        notes: None,
        tag_references: Vec::new(),
        active_transaction_count: Some(1),
        billing_item: Some(billing_item(client.next_id(), None)),
    };

    client.start_provisioning("hardware", id);
    if client.settles_immediately() {
        settle_hardware(&mut hardware);
    }
    client.hardware.lock().unwrap().insert(id, hardware.clone());

    Ok(Hardware {
        id: 0,
        global_identifier: Some(global_identifier),
        hostname: hardware.hostname,
        domain: hardware.domain,
        ..Default::default()
    })
}

pub fn list_hardware(client: &MockSoftLayerClient, filter: Value) -> Result<Vec<Hardware>, SoftLayerError> {
    client.enter("SoftLayer_Account::getHardware", filter.clone())?;
    let wanted = filter_operation(&filter, "hardware.globalIdentifier")
        .and_then(Value::as_str)
        .map(str::to_string);

    let ids: Vec<u64> = client
        .hardware
        .lock()
        .unwrap()
        .values()
        .filter(|h| wanted.is_none() || h.global_identifier == wanted)
        .map(|h| h.id)
        .collect();
    let settled: Vec<(u64, bool)> = ids
        .into_iter()
        .map(|id| (id, client.poll_settled("hardware", id)))
        .collect();

    let mut store = client.hardware.lock().unwrap();
    let mut result = Vec::new();
    for (id, settled) in settled {
        if let Some(hardware) = store.get_mut(&id) {
            if settled && hardware.provision_date.is_none() {
                settle_hardware(hardware);
            }
            result.push(hardware.clone());
        }
    }
    result.sort_by_key(|h| h.id);
    Ok(result)
}

pub fn get_hardware(client: &MockSoftLayerClient, id: u64) -> Result<Hardware, SoftLayerError> {
    client.enter("SoftLayer_Hardware::getObject", json!(id))?;
    client
        .hardware
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Hardware", id))
}

pub fn edit_hardware(client: &MockSoftLayerClient, id: u64, edit: &HardwareEdit) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_Hardware::editObject",
        json!({ "id": id, "template": serde_json::to_value(edit)? }),
    )?;
    let mut store = client.hardware.lock().unwrap();
    let hardware = store
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Hardware", id))?;
    if let Some(notes) = &edit.notes {
        hardware.notes = Some(notes.clone());
    }
    Ok(true)
}

pub fn set_hardware_tags(client: &MockSoftLayerClient, id: u64, tags: &str) -> Result<bool, SoftLayerError> {
    client.enter("SoftLayer_Hardware::setTags", json!({ "id": id, "tags": tags }))?;
    let mut store = client.hardware.lock().unwrap();
    let hardware = store
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Hardware", id))?;
    hardware.tag_references = parse_tags(tags);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::softlayer_trait::{AccountService, HardwareService, VirtualGuestService};

    fn template() -> VirtualGuestTemplate {
        VirtualGuestTemplate {
            hostname: "web01".to_string(),
            domain: "example.com".to_string(),
            start_cpus: 1,
            max_memory: 1024,
            datacenter: Datacenter::named("dal06"),
            hourly_billing_flag: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_guest_settles_after_polls() {
        let client = MockSoftLayerClient::new();
        client.set_provisioning_polls(2);
        let guest = client.create_virtual_guest(&template()).await.unwrap();
        assert_eq!(guest.active_transaction_count, Some(1));
        assert!(guest.primary_ip_address.is_none());

        let first = client.get_virtual_guest(guest.id).await.unwrap();
        assert_eq!(first.active_transaction_count, Some(1));
        let second = client.get_virtual_guest(guest.id).await.unwrap();
        assert_eq!(second.active_transaction_count, Some(0));
        assert!(second.primary_ip_address.is_some());
        assert!(second.primary_backend_ip_address.is_some());
    }

    #[tokio::test]
    async fn test_delete_busy_guest_fails() {
        let client = MockSoftLayerClient::new();
        client.set_provisioning_polls(5);
        let guest = client.create_virtual_guest(&template()).await.unwrap();
        let err = client.delete_virtual_guest(guest.id).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_hardware_visible_by_global_identifier() {
        let client = MockSoftLayerClient::new();
        let created = client
            .create_hardware(&HardwareTemplate {
                hostname: "db01".to_string(),
                domain: "example.com".to_string(),
                datacenter: Datacenter::named("dal06"),
                fixed_configuration_preset: KeyNameRef {
                    key_name: "S1270_8GB_2X1TBSATA_NORAID".to_string(),
                },
                operating_system_reference_code: "UBUNTU_LATEST".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created.id, 0);

        let gid = created.global_identifier.clone().unwrap();
        let listed = client
            .list_hardware(crate::common::filter_eq("hardware.globalIdentifier", gid.as_str()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].provision_date.is_some());
        assert!(listed[0].id > 0);
    }
}
