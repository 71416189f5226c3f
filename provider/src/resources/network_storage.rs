//! `softlayer_file_storage` and `softlayer_block_storage`: storage-as-a-service volumes
//!
//! Both resources are ordered from the `STORAGE_AS_A_SERVICE` package and
//! differ only in the protocol price and a few attributes, so one handler
//! serves both, parameterized by [`StorageKind`].
//!
//! Endurance volumes are sized by an IOPS-per-GB tier; performance volumes by
//! an absolute IOPS figure. Host authorization is managed through the
//! allowed virtual guest and hardware lists.

use crate::crud::{self, Cancellation, changed_fields, parse_id, read_or_clear};
use crate::error::ProviderError;
use crate::pricing::{self, PriceQuery};
use crate::resource::Resource;
use crate::retry::retry_transient;
use crate::wait::{Poll, Timing, wait_for, wait_for_order};
use provider_schema::{Attribute, AttributeType, Diagnostic, ResourceData, Schema, validators};
use serde_json::{Map, Value, json};
use softlayer_client::{
    AccountService, BillingService, IdRef, NetworkStorage, NetworkStorageEdit, NetworkStorageService, ProductService,
    filter_eq,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const FILE_TYPE_NAME: &str = "softlayer_file_storage";
pub const BLOCK_TYPE_NAME: &str = "softlayer_block_storage";

const PACKAGE_KEY: &str = "STORAGE_AS_A_SERVICE";
const ORDER_TYPE: &str = "SoftLayer_Container_Product_Order_Network_Storage_AsAService";

/// Endurance tiers: IOPS per GB, tier item key name, `STORAGE_TIER_LEVEL` restriction value
const ENDURANCE_TIERS: &[(f64, &str, f64)] = &[
    (0.25, "LOW_INTENSITY_TIER", 100.0),
    (2.0, "READHEAVY_TIER", 200.0),
    (4.0, "WRITEHEAVY_TIER", 300.0),
    (10.0, "10_IOPS_PER_GB", 1000.0),
];

const OS_FORMAT_TYPES: &[&str] = &[
    "LINUX",
    "VMWARE",
    "XEN",
    "HYPER_V",
    "WINDOWS",
    "WINDOWS_2008",
    "WINDOWS_GPT",
];

/// File (NFS) or block (iSCSI) storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    File,
    Block,
}

impl StorageKind {
    pub fn type_name(self) -> &'static str {
        match self {
            Self::File => FILE_TYPE_NAME,
            Self::Block => BLOCK_TYPE_NAME,
        }
    }

    /// Category code of the protocol price
    fn category(self) -> &'static str {
        match self {
            Self::File => "storage_file",
            Self::Block => "storage_block",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::File => "file storage",
            Self::Block => "block storage",
        }
    }
}

fn schema(kind: StorageKind) -> Schema {
    let schema = Schema::new()
        .attribute(
            "type",
            Attribute::string()
                .required()
                .force_new()
                .validate_with(validators::one_of(&["Endurance", "Performance"])),
        )
        .attribute("datacenter", Attribute::string().required().force_new())
        .attribute(
            "capacity",
            Attribute::int()
                .required()
                .force_new()
                .description("Volume size in GB"),
        )
        .attribute(
            "iops",
            Attribute::float()
                .required()
                .force_new()
                .description("IOPS per GB for Endurance volumes, total IOPS for Performance volumes"),
        )
        .attribute(
            "snapshot_capacity",
            Attribute::int()
                .optional()
                .force_new()
                .description("Snapshot space in GB"),
        )
        .attribute("allowed_virtual_guest_ids", Attribute::set(AttributeType::Int).optional())
        .attribute("allowed_hardware_ids", Attribute::set(AttributeType::Int).optional())
        .attribute("notes", Attribute::string().optional())
        .attribute("volumename", Attribute::string().computed())
        .attribute("hostname", Attribute::string().computed());

    match kind {
        StorageKind::File => schema.attribute("mountpoint", Attribute::string().computed()),
        StorageKind::Block => schema.attribute(
            "os_format_type",
            Attribute::string()
                .optional()
                .force_new()
                .default("LINUX")
                .validate_with(validators::one_of(OS_FORMAT_TYPES)),
        ),
    }
}

pub struct NetworkStorageResource<C: ?Sized> {
    client: Arc<C>,
    kind: StorageKind,
    schema: Schema,
    timing: Timing,
}

impl<C: ?Sized> NetworkStorageResource<C> {
    pub fn new(client: Arc<C>, kind: StorageKind, timing: Timing) -> Self {
        Self {
            client,
            kind,
            schema: schema(kind),
            timing,
        }
    }
}

fn endurance_tier(iops_per_gb: f64) -> Option<&'static (f64, &'static str, f64)> {
    ENDURANCE_TIERS
        .iter()
        .find(|(per_gb, _, _)| (per_gb - iops_per_gb).abs() < 1e-6)
}

/// Problems with the type/iops/capacity combination, as (attribute, message)
fn check_sizing(storage_type: &str, iops: f64, capacity: i64) -> Option<(&'static str, String)> {
    match storage_type {
        "Endurance" if endurance_tier(iops).is_none() => Some((
            "iops",
            format!("{} is not an Endurance tier; use one of 0.25, 2, 4 or 10", iops),
        )),
        "Performance" if iops < 100.0 || iops.fract() != 0.0 => Some((
            "iops",
            format!("Performance volumes need a whole number of at least 100 IOPS, got {}", iops),
        )),
        _ if capacity <= 0 => Some(("capacity", "capacity must be positive".to_string())),
        _ => None,
    }
}

/// Host ids in a set attribute, as the `u64`s the access calls take
fn host_ids(values: Option<&Value>) -> BTreeSet<u64> {
    values
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default()
}

/// `iops = 2` and `iops = 2.0` are the same tier; keep whichever form was configured
fn set_iops(data: &mut ResourceData, iops: f64) {
    let same = data.get_f64("iops").is_some_and(|current| (current - iops).abs() < 1e-6);
    if !same {
        data.set("iops", iops);
    }
}

fn apply_volume(data: &mut ResourceData, kind: StorageKind, volume: &NetworkStorage) {
    let storage_type = volume.storage_type.as_ref().map(|t| t.key_name.as_str()).unwrap_or_default();
    if storage_type.starts_with("ENDURANCE") {
        data.set("type", "Endurance");
        let tier = volume
            .storage_tier_level
            .as_deref()
            .and_then(|key| ENDURANCE_TIERS.iter().find(|(_, tier_key, _)| *tier_key == key));
        if let Some((per_gb, _, _)) = tier {
            set_iops(data, *per_gb);
        }
    } else if storage_type.starts_with("PERFORMANCE") {
        data.set("type", "Performance");
        if let Some(iops) = volume.provisioned_iops.as_deref().and_then(|v| v.parse::<f64>().ok()) {
            set_iops(data, iops);
        }
    }

    if let Some(datacenter) = volume.service_resource.as_ref().and_then(|r| r.datacenter.as_ref()) {
        data.set("datacenter", datacenter.name.clone());
    }
    data.set_opt("capacity", volume.capacity_gb);
    data.set_opt(
        "snapshot_capacity",
        volume
            .snapshot_capacity_gb
            .as_deref()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|gb| *gb > 0),
    );
    data.set_opt("notes", volume.notes.clone().filter(|n| !n.is_empty()));
    data.set("volumename", volume.username.clone().unwrap_or_default());
    data.set(
        "hostname",
        volume.service_resource_backend_ip_address.clone().unwrap_or_default(),
    );
    if kind == StorageKind::File {
        data.set("mountpoint", volume.file_network_mount_address.clone().unwrap_or_default());
    }

    let ids = |refs: &[IdRef]| -> Value {
        if refs.is_empty() {
            Value::Null
        } else {
            refs.iter().map(|r| r.id).collect::<BTreeSet<_>>().into_iter().collect::<Vec<_>>().into()
        }
    };
    data.set("allowed_virtual_guest_ids", ids(&volume.allowed_virtual_guests));
    data.set("allowed_hardware_ids", ids(&volume.allowed_hardware));
}

impl<C> NetworkStorageResource<C>
where
    C: AccountService + NetworkStorageService + ProductService + BillingService + ?Sized,
{
    /// Price ids for the configured volume
    async fn order_prices(
        &self,
        storage_type: &str,
        capacity: f64,
        iops: f64,
        snapshot: Option<f64>,
    ) -> Result<(u64, Vec<IdRef>), ProviderError> {
        let (package, items) = pricing::package_items(self.client.as_ref(), PACKAGE_KEY).await?;
        let mut prices = vec![
            pricing::select_price(&items, &PriceQuery::category("storage_as_a_service"))?,
            pricing::select_price(&items, &PriceQuery::category(self.kind.category()))?,
        ];

        match storage_type {
            "Endurance" => {
                let (per_gb, _, level) = endurance_tier(iops)
                    .ok_or_else(|| ProviderError::validation("iops", format!("{} is not an Endurance tier", iops)))?;
                prices.push(pricing::select_price(
                    &items,
                    &PriceQuery::category("storage_tier_level").capacity(*per_gb),
                )?);
                prices.push(pricing::select_price(
                    &items,
                    &PriceQuery::category("performance_storage_space")
                        .capacity(capacity)
                        .restricted("STORAGE_TIER_LEVEL", *level),
                )?);
                if let Some(snapshot) = snapshot {
                    prices.push(pricing::select_price(
                        &items,
                        &PriceQuery::category("storage_snapshot_space")
                            .capacity(snapshot)
                            .restricted("STORAGE_TIER_LEVEL", *level),
                    )?);
                }
            }
            _ => {
                prices.push(pricing::select_price(
                    &items,
                    &PriceQuery::category("performance_storage_space")
                        .capacity(capacity)
                        .restricted("IOPS", iops),
                )?);
                prices.push(pricing::select_price(
                    &items,
                    &PriceQuery::category("performance_storage_iops")
                        .capacity(iops)
                        .restricted("STORAGE_SPACE", capacity),
                )?);
                if let Some(snapshot) = snapshot {
                    prices.push(pricing::select_price(
                        &items,
                        &PriceQuery::category("storage_snapshot_space")
                            .capacity(snapshot)
                            .restricted("IOPS", iops),
                    )?);
                }
            }
        }
        Ok((package.id, prices))
    }

    /// Ready once the volume has no active transaction
    async fn poll_settled(&self, id: u64) -> Result<Poll<()>, ProviderError> {
        let volume = self.client.get_network_storage(id).await?;
        match volume.active_transaction_count.unwrap_or(0) {
            0 => Ok(Poll::Ready(())),
            n => Ok(Poll::Pending(format!("{} active transactions", n))),
        }
    }

    /// Authorize and deauthorize hosts so the volume matches the configured lists
    async fn sync_access(&self, id: u64, data: &ResourceData) -> Result<(), ProviderError> {
        let client = self.client.as_ref();
        for key in ["allowed_virtual_guest_ids", "allowed_hardware_ids"] {
            let (old, new) = data.get_change(key);
            let (old, new) = (host_ids(old), host_ids(new));
            let added: Vec<u64> = new.difference(&old).copied().collect();
            let removed: Vec<u64> = old.difference(&new).copied().collect();
            let guests = key == "allowed_virtual_guest_ids";

            if !added.is_empty() {
                debug!("Authorizing {:?} on volume {}", added, id);
                let action = format!("authorize hosts on volume {}", id);
                let hosts = added.as_slice();
                retry_transient(&action, &self.timing.retry, move || async move {
                    if guests {
                        client.allow_access_from_virtual_guests(id, hosts).await
                    } else {
                        client.allow_access_from_hardware(id, hosts).await
                    }
                })
                .await?;
            }
            if !removed.is_empty() {
                debug!("Revoking {:?} from volume {}", removed, id);
                let action = format!("revoke hosts on volume {}", id);
                let hosts = removed.as_slice();
                retry_transient(&action, &self.timing.retry, move || async move {
                    if guests {
                        client.remove_access_from_virtual_guests(id, hosts).await
                    } else {
                        client.remove_access_from_hardware(id, hosts).await
                    }
                })
                .await?;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<C> Resource for NetworkStorageResource<C>
where
    C: AccountService + NetworkStorageService + ProductService + BillingService + ?Sized + 'static,
{
    fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn validate(&self, config: &Map<String, Value>) -> Vec<Diagnostic> {
        let mut diagnostics = self.schema.validate(config);
        let storage_type = config.get("type").and_then(Value::as_str);
        let iops = config.get("iops").and_then(Value::as_f64);
        let capacity = config.get("capacity").and_then(Value::as_i64);
        if let (Some(storage_type), Some(iops), Some(capacity)) = (storage_type, iops, capacity) {
            if let Some((attribute, message)) = check_sizing(storage_type, iops, capacity) {
                diagnostics.push(Diagnostic::error(attribute, message));
            }
        }
        diagnostics
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let storage_type = data.require_str("type")?.to_string();
        let datacenter = data.require_str("datacenter")?.to_string();
        let capacity = data.require_i64("capacity")?;
        let iops = data
            .get_f64("iops")
            .ok_or_else(|| ProviderError::validation("iops", "iops is required"))?;
        if let Some((attribute, message)) = check_sizing(&storage_type, iops, capacity) {
            return Err(ProviderError::validation(attribute, message));
        }
        let snapshot = data.get_i64("snapshot_capacity").map(|gb| gb as f64);

        let (package_id, prices) = self.order_prices(&storage_type, capacity as f64, iops, snapshot).await?;
        let location = pricing::datacenter_id(self.client.as_ref(), &datacenter).await?;
        let mut order = pricing::order_container(ORDER_TYPE, package_id, location, prices);
        order.extra.insert("volumeSize".to_string(), json!(capacity));
        if storage_type == "Performance" {
            order.extra.insert("iops".to_string(), json!(iops as u64));
        }
        if let Some(os_format) = data.get_str("os_format_type") {
            order.extra.insert("osFormatType".to_string(), json!({ "keyName": os_format }));
        }

        let receipt = self.client.place_order(&order).await?;
        info!(
            "Placed order {} for {} GB of {} {} in {}",
            receipt.order_id,
            capacity,
            storage_type,
            self.kind.label(),
            datacenter
        );

        let filter = filter_eq("networkStorage.billingItem.orderItem.order.id", receipt.order_id);
        let volume = wait_for_order("storage order", receipt.order_id, &self.timing.create, || {
            self.client.list_network_storage(filter.clone())
        })
        .await?;
        data.set_id(volume.id.to_string());

        wait_for("volume provisioning", &volume.id.to_string(), &self.timing.create, || {
            self.poll_settled(volume.id)
        })
        .await?;
        info!("Volume {} ready", volume.id);

        if let Some(notes) = data.get_str("notes") {
            let edit = NetworkStorageEdit {
                notes: Some(notes.to_string()),
            };
            self.client.edit_network_storage(volume.id, &edit).await?;
        }
        self.sync_access(volume.id, data).await?;

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        if let Some(volume) = read_or_clear(data, self.kind.type_name(), self.client.get_network_storage(id)).await? {
            apply_volume(data, self.kind, &volume);
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let changed = changed_fields(data, &["notes", "allowed_virtual_guest_ids", "allowed_hardware_ids"]);
        debug!("Updating volume {}: changed {:?}", id, changed);

        if changed.contains(&"notes") {
            let edit = NetworkStorageEdit {
                notes: Some(data.get_str("notes").unwrap_or_default().to_string()),
            };
            self.client.edit_network_storage(id, &edit).await?;
        }
        if changed.iter().any(|key| key.starts_with("allowed_")) {
            self.sync_access(id, data).await?;
        }
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let volume = match self.client.get_network_storage(id).await {
            Ok(volume) => volume,
            Err(e) if e.is_not_found() => {
                data.clear_id();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        match volume.billing_item {
            Some(billing_item) => {
                crud::cancel_billing_item(
                    self.client.as_ref(),
                    billing_item.id,
                    Cancellation::Immediate("No longer needed"),
                )
                .await?
            }
            None => warn!("Volume {} has no billing item, it is already being reclaimed", id),
        }
        info!("Cancelled volume {}", id);
        data.clear_id();
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let id = parse_id(data)?;
        crud::exists_by_id(self.client.get_network_storage(id)).await
    }
}
