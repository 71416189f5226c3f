//! Lifecycle tests driving handlers through the provider registry
//!
//! Each test plays the plugin host: validate the configuration, create, read
//! back, plan an update, apply it and destroy, all against
//! `MockSoftLayerClient` with provisioning delays simulated.

use provider_schema::{ResourceData, has_errors};
use serde_json::{Map, Value, json};
use softlayer_client::MockSoftLayerClient;
use softlayer_provider::{Provider, ProviderError, Resource, Timing};
use std::sync::Arc;
use std::time::Duration;

fn provider(client: &MockSoftLayerClient) -> Provider {
    Provider::with_client(Arc::new(client.clone()))
        .with_timing(Timing::uniform(Duration::from_millis(500), Duration::from_millis(2)))
}

fn config(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// Validate the configuration, then create
async fn create(resource: &dyn Resource, cfg: Map<String, Value>) -> ResourceData {
    let diagnostics = resource.validate(&cfg);
    assert!(!has_errors(&diagnostics), "{}: {:?}", resource.type_name(), diagnostics);

    let mut data = ResourceData::create(resource.schema(), cfg);
    resource.create(&mut data).await.unwrap();
    assert!(data.id().is_some(), "{} has no ID after create", resource.type_name());
    data
}

/// Refresh from persisted state the way a host does on the next plan
async fn refresh(resource: &dyn Resource, data: &ResourceData) -> ResourceData {
    let mut fresh = ResourceData::from_state(resource.schema(), data.id().unwrap(), data.state());
    resource.read(&mut fresh).await.unwrap();
    fresh
}

async fn destroy(resource: &dyn Resource, data: ResourceData) {
    let id = data.id().unwrap().to_string();
    let state = data.state();
    let mut data = ResourceData::from_state(resource.schema(), id.clone(), state.clone());
    resource.delete(&mut data).await.unwrap();
    assert_eq!(data.id(), None);
    assert!(
        !resource
            .exists(&ResourceData::from_state(resource.schema(), id, state))
            .await
            .unwrap(),
        "{} still exists after delete",
        resource.type_name()
    );
}

#[tokio::test]
async fn test_virtual_guest_lifecycle() {
    let client = MockSoftLayerClient::with_catalog();
    client.set_provisioning_polls(3);
    let provider = provider(&client);
    let guests = provider.resource("softlayer_virtual_guest").unwrap();

    let cfg = config(json!({
        "hostname": "web01",
        "domain": "example.com",
        "datacenter": "dal06",
        "cores": 2,
        "memory": 4096,
        "os_reference_code": "UBUNTU_LATEST",
        "tags": ["web"]
    }));
    let data = create(guests.as_ref(), cfg.clone()).await;
    assert!(data.missing_computed(guests.schema()).is_empty());

    // A refresh with nothing changed plans no update
    let data = refresh(guests.as_ref(), &data).await;
    let planned = ResourceData::update(guests.schema(), data.id().unwrap(), data.state(), cfg.clone());
    assert!(planned.force_new_changes(guests.schema()).is_empty());
    for key in ["hostname", "domain", "notes", "tags"] {
        assert!(!planned.has_change(key), "{} shows a spurious change", key);
    }

    // Changing cores needs a replacement, not an update
    let mut bigger = cfg.clone();
    bigger.insert("cores".to_string(), json!(4));
    let planned = ResourceData::update(guests.schema(), data.id().unwrap(), data.state(), bigger);
    assert_eq!(planned.force_new_changes(guests.schema()), vec!["cores".to_string()]);

    let mut renamed = cfg;
    renamed.insert("hostname".to_string(), json!("web02"));
    let mut planned = ResourceData::update(guests.schema(), data.id().unwrap(), data.state(), renamed);
    guests.update(&mut planned).await.unwrap();
    let edits = client.calls_to("SoftLayer_Virtual_Guest::editObject");
    assert_eq!(edits.last().unwrap()["template"], json!({"hostname": "web02"}));

    destroy(guests.as_ref(), planned).await;
}

#[tokio::test]
async fn test_read_clears_id_when_object_was_deleted_elsewhere() {
    let client = MockSoftLayerClient::with_catalog();
    let provider = provider(&client);
    let guests = provider.resource("softlayer_virtual_guest").unwrap();
    let data = create(
        guests.as_ref(),
        config(json!({
            "hostname": "batch01",
            "domain": "example.com",
            "datacenter": "dal06",
            "cores": 1,
            "memory": 2048,
            "os_reference_code": "CENTOS_LATEST"
        })),
    )
    .await;

    client.remove_virtual_guest(data.id().unwrap().parse().unwrap());

    let mut stale = ResourceData::from_state(guests.schema(), data.id().unwrap(), data.state());
    guests.read(&mut stale).await.unwrap();
    assert_eq!(stale.id(), None);
}

#[tokio::test]
async fn test_provisioning_wait_respects_timeout() {
    let client = MockSoftLayerClient::with_catalog();
    client.set_provisioning_polls(1_000_000);
    let provider = Provider::with_client(Arc::new(client.clone()))
        .with_timing(Timing::uniform(Duration::from_millis(50), Duration::from_millis(5)));
    let storage = provider.resource("softlayer_file_storage").unwrap();
    let mut data = ResourceData::create(
        storage.schema(),
        config(json!({"type": "Endurance", "datacenter": "dal06", "capacity": 20, "iops": 0.25})),
    );

    let started = std::time::Instant::now();
    let err = storage.create(&mut data).await.unwrap_err();
    assert!(matches!(err, ProviderError::Timeout { .. }), "got {:?}", err);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_ordered_resources_lifecycle() {
    let client = MockSoftLayerClient::with_catalog();
    client.set_provisioning_polls(2);
    let provider = provider(&client);

    let vlans = provider.resource("softlayer_vlan").unwrap();
    let vlan = create(
        vlans.as_ref(),
        config(json!({"type": "PRIVATE", "datacenter": "dal06", "subnet_size": 8})),
    )
    .await;

    let block = provider.resource("softlayer_block_storage").unwrap();
    let volume = create(
        block.as_ref(),
        config(json!({
            "type": "Endurance",
            "datacenter": "dal06",
            "capacity": 40,
            "iops": 4,
            "snapshot_capacity": 20
        })),
    )
    .await;
    assert_eq!(volume.get_str("os_format_type"), Some("LINUX"));
    assert!(volume.get_str("volumename").is_some());

    let vpx = provider.resource("softlayer_lb_vpx").unwrap();
    let appliance = create(
        vpx.as_ref(),
        config(json!({"datacenter": "dal06", "speed": 10, "version": "10.1", "ip_count": 2})),
    )
    .await;
    assert!(appliance.get_i64("front_end_vlan_id").is_some());

    let vips = provider.resource("softlayer_lb_vpx_vip").unwrap();
    let nadc_id: u64 = appliance.id().unwrap().parse().unwrap();
    let vip = create(
        vips.as_ref(),
        config(json!({
            "nad_controller_id": nadc_id,
            "name": "api",
            "virtual_ip_address": appliance.get_str("primary_ip_address").unwrap(),
            "source_port": 443,
            "type": "TCP",
            "load_balancing_method": "rr"
        })),
    )
    .await;

    destroy(vips.as_ref(), vip).await;
    destroy(vpx.as_ref(), appliance).await;
    destroy(block.as_ref(), volume).await;
    destroy(vlans.as_ref(), vlan).await;
    assert_eq!(client.cancelled_billing_items().len(), 3);
}

#[tokio::test]
async fn test_account_resources_lifecycle() {
    let client = MockSoftLayerClient::new();
    let provider = provider(&client);

    let domains = provider.resource("softlayer_dns_domain").unwrap();
    let domain = create(domains.as_ref(), config(json!({"name": "example.net"}))).await;

    let records = provider.resource("softlayer_dns_domain_record").unwrap();
    let domain_id: u64 = domain.id().unwrap().parse().unwrap();
    let record_cfg = config(json!({
        "domain_id": domain_id,
        "host": "www",
        "data": "169.45.1.20",
        "type": "a"
    }));
    let record = create(records.as_ref(), record_cfg.clone()).await;

    let mut longer = record_cfg;
    longer.insert("ttl".to_string(), json!(3600));
    let mut planned = ResourceData::update(records.schema(), record.id().unwrap(), record.state(), longer);
    records.update(&mut planned).await.unwrap();
    let edits = client.calls_to("SoftLayer_Dns_Domain_ResourceRecord::editObject");
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0]["template"], json!({"ttl": 3600}));

    let keys = provider.resource("softlayer_ssh_key").unwrap();
    let key = create(
        keys.as_ref(),
        config(json!({"label": "deploy", "public_key": "ssh-ed25519 AAAAC3Nza deploy@ci"})),
    )
    .await;
    assert!(key.get_str("fingerprint").is_some());

    destroy(records.as_ref(), planned).await;
    destroy(domains.as_ref(), domain).await;
    destroy(keys.as_ref(), key).await;
}

#[tokio::test]
async fn test_invalid_configuration_is_caught_before_any_call() {
    let client = MockSoftLayerClient::with_catalog();
    let provider = provider(&client);

    let guests = provider.resource("softlayer_virtual_guest").unwrap();
    let diagnostics = guests.validate(&config(json!({
        "hostname": "web01",
        "domain": "example.com",
        "datacenter": "dal06",
        "cores": 2,
        "memory": 4096,
        "os_reference_code": "UBUNTU_LATEST",
        "image_id": "0b1c-4e7d",
        "network_speed": 25
    })));
    let attributes: Vec<String> = diagnostics.into_iter().filter_map(|d| d.attribute).collect();
    assert!(attributes.contains(&"network_speed".to_string()));
    assert!(attributes.contains(&"image_id".to_string()) || attributes.contains(&"os_reference_code".to_string()));

    let records = provider.resource("softlayer_dns_domain_record").unwrap();
    let diagnostics = records.validate(&config(json!({
        "domain_id": 1, "host": "@", "data": "mail.example.net", "type": "mx"
    })));
    assert!(has_errors(&diagnostics));

    assert!(client.calls_to("SoftLayer_Virtual_Guest::createObject").is_empty());
}

#[tokio::test]
async fn test_update_clears_removed_optional_attributes() {
    let client = MockSoftLayerClient::with_catalog();
    let provider = provider(&client);

    let guests = provider.resource("softlayer_virtual_guest").unwrap();
    let guest_cfg = config(json!({
        "hostname": "web03",
        "domain": "example.com",
        "datacenter": "dal06",
        "cores": 1,
        "memory": 1024,
        "os_reference_code": "UBUNTU_LATEST"
    }));
    let mut annotated = guest_cfg.clone();
    annotated.insert("notes".to_string(), json!("frontend"));
    annotated.insert("tags".to_string(), json!(["web"]));
    let guest = create(guests.as_ref(), annotated).await;
    assert_eq!(guest.get_str("notes"), Some("frontend"));

    let mut guest = ResourceData::update(guests.schema(), guest.id().unwrap(), guest.state(), guest_cfg);
    guests.update(&mut guest).await.unwrap();
    let edits = client.calls_to("SoftLayer_Virtual_Guest::editObject");
    assert_eq!(edits.last().unwrap()["template"], json!({"notes": ""}));
    assert_eq!(client.calls_to("SoftLayer_Virtual_Guest::setTags").last().unwrap()["tags"], "");
    let guest = refresh(guests.as_ref(), &guest).await;
    assert_eq!(guest.get_str("notes"), None);
    assert!(guest.get_strings("tags").is_empty());

    let files = provider.resource("softlayer_file_storage").unwrap();
    let volume_cfg = config(json!({"type": "Endurance", "datacenter": "dal06", "capacity": 20, "iops": 2}));
    let mut annotated = volume_cfg.clone();
    annotated.insert("notes".to_string(), json!("shared uploads"));
    let volume = create(files.as_ref(), annotated).await;
    assert_eq!(volume.get_str("notes"), Some("shared uploads"));

    let mut volume = ResourceData::update(files.schema(), volume.id().unwrap(), volume.state(), volume_cfg);
    files.update(&mut volume).await.unwrap();
    let edits = client.calls_to("SoftLayer_Network_Storage::editObject");
    assert_eq!(edits.last().unwrap()["template"], json!({"notes": ""}));
    assert_eq!(refresh(files.as_ref(), &volume).await.get_str("notes"), None);

    let vlans = provider.resource("softlayer_vlan").unwrap();
    let vlan_cfg = config(json!({"type": "PUBLIC", "datacenter": "dal06", "subnet_size": 8}));
    let mut named = vlan_cfg.clone();
    named.insert("name".to_string(), json!("app-tier"));
    let vlan = create(vlans.as_ref(), named).await;
    assert_eq!(vlan.get_str("name"), Some("app-tier"));

    let mut vlan = ResourceData::update(vlans.schema(), vlan.id().unwrap(), vlan.state(), vlan_cfg);
    vlans.update(&mut vlan).await.unwrap();
    let edits = client.calls_to("SoftLayer_Network_Vlan::editObject");
    assert_eq!(edits.last().unwrap()["template"], json!({"name": ""}));
    assert_eq!(refresh(vlans.as_ref(), &vlan).await.get_str("name"), None);
}
