//! `softlayer_bare_metal`: hourly bare metal servers built from a fixed preset
//!
//! `SoftLayer_Hardware::createObject` answers before the server has a
//! numeric id. The handler finds the server again through the account's
//! hardware list, filtered by the global identifier the create call returned,
//! and only then sets the resource ID.

use crate::crud::{self, Cancellation, parse_id, read_or_clear, tags_param};
use crate::error::ProviderError;
use crate::resource::Resource;
use crate::wait::{Poll, Timing, wait_for};
use provider_schema::{Attribute, AttributeType, ResourceData, Schema, validators};
use serde_json::Value;
use softlayer_client::{
    AccountService, BillingService, Datacenter, Hardware, HardwareEdit, HardwareService, HardwareTemplate, IdRef,
    KeyNameRef, NetworkComponent, UserData, filter_eq, tag_names,
};
use std::sync::Arc;
use tracing::{info, warn};

pub const TYPE_NAME: &str = "softlayer_bare_metal";

const CANCEL_REASON: &str = "No longer needed";

fn schema() -> Schema {
    Schema::new()
        .attribute("hostname", Attribute::string().required().force_new())
        .attribute("domain", Attribute::string().required().force_new())
        .attribute("datacenter", Attribute::string().required().force_new())
        .attribute(
            "fixed_config_preset",
            Attribute::string()
                .required()
                .force_new()
                .description("Preset key name, e.g. S1270_32GB_1X1TBSATA_NORAID"),
        )
        .attribute("os_reference_code", Attribute::string().required().force_new())
        .attribute("hourly_billing", Attribute::bool().optional().force_new().default(true))
        .attribute("private_network_only", Attribute::bool().optional().force_new().default(false))
        .attribute(
            "network_speed",
            Attribute::int()
                .optional()
                .force_new()
                .default(100)
                .validate_with(validators::int_one_of(&[10, 100, 1000])),
        )
        .attribute("ssh_key_ids", Attribute::list(AttributeType::Int).optional().force_new())
        .attribute("user_data", Attribute::string().optional().force_new())
        .attribute("post_install_script_uri", Attribute::string().optional().force_new())
        .attribute("notes", Attribute::string().optional())
        .attribute("tags", Attribute::set(AttributeType::String).optional())
        .attribute("global_identifier", Attribute::string().computed())
        .attribute("public_ipv4_address", Attribute::string().computed())
        .attribute("private_ipv4_address", Attribute::string().computed())
        .attribute("provision_date", Attribute::string().computed())
}

pub struct BareMetalResource<C: ?Sized> {
    client: Arc<C>,
    schema: Schema,
    timing: Timing,
}

impl<C: ?Sized> BareMetalResource<C> {
    pub fn new(client: Arc<C>, timing: Timing) -> Self {
        Self {
            client,
            schema: schema(),
            timing,
        }
    }
}

fn build_template(data: &ResourceData) -> Result<HardwareTemplate, ProviderError> {
    Ok(HardwareTemplate {
        hostname: data.require_str("hostname")?.to_string(),
        domain: data.require_str("domain")?.to_string(),
        datacenter: Datacenter::named(data.require_str("datacenter")?),
        hourly_billing_flag: data.get_bool("hourly_billing").unwrap_or(true),
        fixed_configuration_preset: KeyNameRef {
            key_name: data.require_str("fixed_config_preset")?.to_string(),
        },
        operating_system_reference_code: data.require_str("os_reference_code")?.to_string(),
        network_components: crud::opt_u32(data, "network_speed")?
            .map(|max_speed| vec![NetworkComponent { max_speed }])
            .unwrap_or_default(),
        private_network_only_flag: data.get_bool("private_network_only"),
        ssh_keys: crud::id_list(data, "ssh_key_ids")?
            .into_iter()
            .map(|id| IdRef { id })
            .collect(),
        post_install_script_uri: data.get_str("post_install_script_uri").map(str::to_string),
        user_data: data
            .get_str("user_data")
            .map(|value| {
                vec![UserData {
                    value: value.to_string(),
                }]
            })
            .unwrap_or_default(),
    })
}

fn apply_hardware(data: &mut ResourceData, hardware: &Hardware) {
    data.set("hostname", hardware.hostname.clone());
    data.set("domain", hardware.domain.clone());
    if let Some(datacenter) = &hardware.datacenter {
        data.set("datacenter", datacenter.name.clone());
    }
    if let Some(preset) = &hardware.fixed_configuration_preset {
        data.set("fixed_config_preset", preset.key_name.clone());
    }
    data.set_opt("os_reference_code", hardware.operating_system_reference_code.clone());
    data.set_opt("hourly_billing", hardware.hourly_billing_flag);
    data.set_opt("private_network_only", hardware.private_network_only_flag);
    if let Some(speed) = hardware.network_components.iter().map(|c| c.max_speed).max() {
        data.set("network_speed", speed);
    }
    data.set_opt("notes", hardware.notes.clone().filter(|n| !n.is_empty()));

    let tags = tag_names(&hardware.tag_references);
    if tags.is_empty() {
        data.set("tags", Value::Null);
    } else {
        data.set("tags", tags);
    }

    data.set("global_identifier", hardware.global_identifier.clone().unwrap_or_default());
    data.set("public_ipv4_address", hardware.primary_ip_address.clone().unwrap_or_default());
    data.set(
        "private_ipv4_address",
        hardware.primary_backend_ip_address.clone().unwrap_or_default(),
    );
    data.set("provision_date", hardware.provision_date.clone().unwrap_or_default());
}

impl<C> BareMetalResource<C>
where
    C: AccountService + ?Sized,
{
    /// Ready once the server is listed with a provision date
    async fn poll_provisioned(&self, global_identifier: &str) -> Result<Poll<u64>, ProviderError> {
        let filter = filter_eq("hardware.globalIdentifier", global_identifier);
        let found = self.client.list_hardware(filter).await?;
        match found.as_slice() {
            [] => Ok(Poll::Pending("server not listed yet".to_string())),
            [hardware] if hardware.provision_date.is_some() => Ok(Poll::Ready(hardware.id)),
            [hardware] => Ok(Poll::Pending(format!(
                "server {} provisioning",
                hardware.id
            ))),
            many => Err(ProviderError::UnexpectedResponse(format!(
                "{} servers share global identifier {}",
                many.len(),
                global_identifier
            ))),
        }
    }
}

#[async_trait::async_trait]
impl<C> Resource for BareMetalResource<C>
where
    C: HardwareService + AccountService + BillingService + ?Sized + 'static,
{
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let template = build_template(data)?;
        info!(
            "Ordering bare metal server {}.{} ({})",
            template.hostname, template.domain, template.fixed_configuration_preset.key_name
        );

        let created = self.client.create_hardware(&template).await?;
        let global_identifier = created.global_identifier.ok_or_else(|| {
            ProviderError::UnexpectedResponse("createObject returned no global identifier".to_string())
        })?;

        let id = wait_for("provisioning", &global_identifier, &self.timing.create, || {
            self.poll_provisioned(&global_identifier)
        })
        .await?;
        data.set_id(id.to_string());
        info!("Bare metal server {} provisioned as {}", global_identifier, id);

        if let Some(notes) = data.get_str("notes") {
            let edit = HardwareEdit {
                notes: Some(notes.to_string()),
            };
            self.client.edit_hardware(id, &edit).await?;
        }
        let tags = tags_param(data);
        if !tags.is_empty() {
            self.client.set_hardware_tags(id, &tags).await?;
        }

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        if let Some(hardware) = read_or_clear(data, TYPE_NAME, self.client.get_hardware(id)).await? {
            apply_hardware(data, &hardware);
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        if data.has_change("notes") {
            let edit = HardwareEdit {
                notes: Some(data.get_str("notes").unwrap_or_default().to_string()),
            };
            self.client.edit_hardware(id, &edit).await?;
        }
        if data.has_change("tags") {
            self.client.set_hardware_tags(id, &tags_param(data)).await?;
        }
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let hardware = match self.client.get_hardware(id).await {
            Ok(hardware) => hardware,
            Err(e) if e.is_not_found() => {
                data.clear_id();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        match hardware.billing_item {
            Some(billing_item) => {
                info!("Cancelling bare metal server {} (billing item {})", id, billing_item.id);
                crud::cancel_billing_item(self.client.as_ref(), billing_item.id, Cancellation::Immediate(CANCEL_REASON))
                    .await?;
            }
            None => warn!("Bare metal server {} has no billing item, assuming it is already cancelled", id),
        }
        data.clear_id();
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let id = parse_id(data)?;
        crud::exists_by_id(self.client.get_hardware(id)).await
    }
}
