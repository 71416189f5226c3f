//! `softlayer_virtual_guest`: hourly or monthly virtual servers

use crate::crud::{self, changed_fields, parse_id, read_or_clear, tags_param};
use crate::error::ProviderError;
use crate::resource::Resource;
use crate::retry::retry_transient;
use crate::wait::{Poll, Timing, wait_for};
use provider_schema::{Attribute, AttributeType, Diagnostic, ResourceData, Schema, validators};
use serde_json::{Map, Value};
use softlayer_client::{
    Datacenter, GlobalIdRef, IdRef, NetworkComponent, PrimaryNetworkComponent, UserData, VirtualGuest,
    VirtualGuestEdit, VirtualGuestService, VirtualGuestTemplate, tag_names,
};
use std::sync::Arc;
use tracing::{debug, info};

pub const TYPE_NAME: &str = "softlayer_virtual_guest";

fn schema() -> Schema {
    Schema::new()
        .attribute("hostname", Attribute::string().required().validate_with(validators::non_empty()))
        .attribute("domain", Attribute::string().required().validate_with(validators::non_empty()))
        .attribute("datacenter", Attribute::string().required().force_new())
        .attribute(
            "cores",
            Attribute::int()
                .required()
                .force_new()
                .validate_with(validators::int_between(1, 56)),
        )
        .attribute(
            "memory",
            Attribute::int()
                .required()
                .force_new()
                .description("Memory in MB")
                .validate_with(validators::int_between(1024, 1_048_576)),
        )
        .attribute(
            "os_reference_code",
            Attribute::string()
                .optional()
                .force_new()
                .conflicts_with(&["image_id"]),
        )
        .attribute(
            "image_id",
            Attribute::string()
                .optional()
                .force_new()
                .conflicts_with(&["os_reference_code"])
                .description("Global identifier of an image template"),
        )
        .attribute("hourly_billing", Attribute::bool().optional().force_new().default(true))
        .attribute("local_disk", Attribute::bool().optional().force_new().default(true))
        .attribute("dedicated_acct_host_only", Attribute::bool().optional().force_new().default(false))
        .attribute("private_network_only", Attribute::bool().optional().force_new().default(false))
        .attribute(
            "network_speed",
            Attribute::int()
                .optional()
                .force_new()
                .default(100)
                .validate_with(validators::int_one_of(&[10, 100, 1000])),
        )
        .attribute("public_vlan_id", Attribute::int().optional().force_new())
        .attribute("private_vlan_id", Attribute::int().optional().force_new())
        .attribute("ssh_key_ids", Attribute::list(AttributeType::Int).optional().force_new())
        .attribute("user_data", Attribute::string().optional().force_new())
        .attribute("post_install_script_uri", Attribute::string().optional().force_new())
        .attribute("notes", Attribute::string().optional())
        .attribute("tags", Attribute::set(AttributeType::String).optional())
        .attribute("ipv4_address", Attribute::string().computed())
        .attribute("ipv4_address_private", Attribute::string().computed())
        .attribute("global_identifier", Attribute::string().computed())
        .attribute("provision_date", Attribute::string().computed())
}

/// Virtual guest handler
pub struct VirtualGuestResource<C: ?Sized> {
    client: Arc<C>,
    schema: Schema,
    timing: Timing,
}

impl<C: ?Sized> VirtualGuestResource<C> {
    pub fn new(client: Arc<C>, timing: Timing) -> Self {
        Self {
            client,
            schema: schema(),
            timing,
        }
    }
}

fn vlan_component(data: &ResourceData, key: &str) -> Result<Option<PrimaryNetworkComponent>, ProviderError> {
    data.get_i64(key)
        .map(|id| {
            u64::try_from(id)
                .map(|id| PrimaryNetworkComponent {
                    network_vlan: IdRef { id },
                })
                .map_err(|_| ProviderError::validation(key, format!("{} is not a valid VLAN id", id)))
        })
        .transpose()
}

fn build_template(data: &ResourceData) -> Result<VirtualGuestTemplate, ProviderError> {
    let os_reference_code = data.get_str("os_reference_code").map(str::to_string);
    let image = data.get_str("image_id").map(|id| GlobalIdRef {
        global_identifier: id.to_string(),
    });
    if os_reference_code.is_none() && image.is_none() {
        return Err(ProviderError::validation(
            "os_reference_code",
            "one of os_reference_code or image_id must be set",
        ));
    }

    Ok(VirtualGuestTemplate {
        hostname: data.require_str("hostname")?.to_string(),
        domain: data.require_str("domain")?.to_string(),
        start_cpus: crud::req_u32(data, "cores")?,
        max_memory: crud::req_u32(data, "memory")?.into(),
        datacenter: Datacenter::named(data.require_str("datacenter")?),
        hourly_billing_flag: data.get_bool("hourly_billing").unwrap_or(true),
        local_disk_flag: data.get_bool("local_disk").unwrap_or(true),
        dedicated_account_host_only_flag: data.get_bool("dedicated_acct_host_only"),
        private_network_only_flag: data.get_bool("private_network_only"),
        operating_system_reference_code: os_reference_code,
        block_device_template_group: image,
        network_components: crud::opt_u32(data, "network_speed")?
            .map(|max_speed| vec![NetworkComponent { max_speed }])
            .unwrap_or_default(),
        primary_network_component: vlan_component(data, "public_vlan_id")?,
        primary_backend_network_component: vlan_component(data, "private_vlan_id")?,
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

/// Copy a fetched guest into the attribute bag
fn apply_guest(data: &mut ResourceData, guest: &VirtualGuest) {
    data.set("hostname", guest.hostname.clone());
    data.set("domain", guest.domain.clone());
    if let Some(datacenter) = &guest.datacenter {
        data.set("datacenter", datacenter.name.clone());
    }
    data.set_opt("cores", guest.start_cpus);
    data.set_opt("memory", guest.max_memory);
    data.set_opt("hourly_billing", guest.hourly_billing_flag);
    data.set_opt("local_disk", guest.local_disk_flag);
    data.set_opt("dedicated_acct_host_only", guest.dedicated_account_host_only_flag);
    data.set_opt("private_network_only", guest.private_network_only_flag);
    if let Some(speed) = guest.network_components.iter().map(|c| c.max_speed).max() {
        data.set("network_speed", speed);
    }
    // Guests built from an image also report an OS code; keeping it would
    // conflict with image_id
    if data.get("image_id").is_none() {
        data.set_opt("os_reference_code", guest.operating_system_reference_code.clone());
    }
    data.set_opt("notes", guest.notes.clone().filter(|n| !n.is_empty()));

    let tags = tag_names(&guest.tag_references);
    if tags.is_empty() {
        data.set("tags", Value::Null);
    } else {
        data.set("tags", tags);
    }

    data.set("ipv4_address", guest.primary_ip_address.clone().unwrap_or_default());
    data.set(
        "ipv4_address_private",
        guest.primary_backend_ip_address.clone().unwrap_or_default(),
    );
    data.set("global_identifier", guest.global_identifier.clone().unwrap_or_default());
    data.set("provision_date", guest.provision_date.clone().unwrap_or_default());
}

impl<C> VirtualGuestResource<C>
where
    C: VirtualGuestService + ?Sized,
{
    /// Ready once no transaction runs and the expected addresses are assigned
    async fn poll_provisioned(&self, id: u64, private_only: bool) -> Result<Poll<()>, ProviderError> {
        let guest = self.client.get_virtual_guest(id).await?;
        let transactions = guest.active_transaction_count.unwrap_or(0);
        if transactions > 0 {
            return Ok(Poll::Pending(format!("{} active transactions", transactions)));
        }
        if guest.primary_backend_ip_address.is_none() {
            return Ok(Poll::Pending("waiting for private IP address".to_string()));
        }
        if !private_only && guest.primary_ip_address.is_none() {
            return Ok(Poll::Pending("waiting for public IP address".to_string()));
        }
        Ok(Poll::Ready(()))
    }

    /// Ready once no transaction runs; `true` when the guest is already gone
    async fn poll_idle(&self, id: u64) -> Result<Poll<bool>, ProviderError> {
        match self.client.get_virtual_guest(id).await {
            Ok(guest) => match guest.active_transaction_count.unwrap_or(0) {
                0 => Ok(Poll::Ready(false)),
                n => Ok(Poll::Pending(format!("{} active transactions", n))),
            },
            Err(e) if e.is_not_found() => Ok(Poll::Ready(true)),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl<C> Resource for VirtualGuestResource<C>
where
    C: VirtualGuestService + ?Sized + 'static,
{
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn validate(&self, config: &Map<String, Value>) -> Vec<Diagnostic> {
        let mut diagnostics = self.schema.validate(config);
        let set = |key: &str| config.get(key).is_some_and(|v| !v.is_null());
        if !set("os_reference_code") && !set("image_id") {
            diagnostics.push(Diagnostic::error(
                "os_reference_code",
                "one of os_reference_code or image_id must be set",
            ));
        }
        diagnostics
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let template = build_template(data)?;
        info!("Creating virtual guest {}.{}", template.hostname, template.domain);

        let guest = self.client.create_virtual_guest(&template).await?;
        data.set_id(guest.id.to_string());
        info!("Created virtual guest {} (ID: {}), waiting for provisioning", guest.hostname, guest.id);

        let private_only = template.private_network_only_flag.unwrap_or(false);
        wait_for("provisioning", &guest.id.to_string(), &self.timing.create, || {
            self.poll_provisioned(guest.id, private_only)
        })
        .await?;

        if let Some(notes) = data.get_str("notes") {
            let edit = VirtualGuestEdit {
                notes: Some(notes.to_string()),
                ..Default::default()
            };
            self.client.edit_virtual_guest(guest.id, &edit).await?;
        }
        let tags = tags_param(data);
        if !tags.is_empty() {
            self.client.set_virtual_guest_tags(guest.id, &tags).await?;
        }

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        if let Some(guest) = read_or_clear(data, TYPE_NAME, self.client.get_virtual_guest(id)).await? {
            apply_guest(data, &guest);
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let changed = changed_fields(data, &["hostname", "domain", "notes", "tags"]);
        debug!("Updating virtual guest {}: changed {:?}", id, changed);

        let mut edit = VirtualGuestEdit::default();
        if data.has_change("hostname") {
            edit.hostname = Some(data.require_str("hostname")?.to_string());
        }
        if data.has_change("domain") {
            edit.domain = Some(data.require_str("domain")?.to_string());
        }
        if data.has_change("notes") {
            edit.notes = Some(data.get_str("notes").unwrap_or_default().to_string());
        }
        if !edit.is_empty() {
            self.client.edit_virtual_guest(id, &edit).await?;
            info!("Updated virtual guest {}", id);
        }
        if data.has_change("tags") {
            self.client.set_virtual_guest_tags(id, &tags_param(data)).await?;
        }

        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let gone = wait_for("transactions to finish", &id.to_string(), &self.timing.delete, || {
            self.poll_idle(id)
        })
        .await?;

        if !gone {
            info!("Deleting virtual guest {}", id);
            match retry_transient("delete virtual guest", &self.timing.retry, || {
                self.client.delete_virtual_guest(id)
            })
            .await
            {
                Ok(_) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        data.clear_id();
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let id = parse_id(data)?;
        crud::exists_by_id(self.client.get_virtual_guest(id)).await
    }
}
