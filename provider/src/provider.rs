//! The provider: configuration plus the registry of resource handlers
//!
//! A host builds one `Provider`, calls [`Provider::configure`] with the
//! provider block, then looks handlers up by resource type name. Every
//! handler shares the one client built during configuration.

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::resource::Resource;
use crate::resources::{
    BareMetalResource, DnsDomainResource, DnsRecordResource, LbVpxResource, LbVpxVipResource,
    NetworkStorageResource, SshKeyResource, StorageKind, UserResource, VirtualGuestResource, VlanResource,
    bare_metal, dns_domain, dns_record, lb_vpx, lb_vpx_vip, network_storage, ssh_key, user, virtual_guest, vlan,
};
use crate::wait::Timing;
use provider_schema::{Attribute, Schema, has_errors};
use serde_json::{Map, Value};
use softlayer_client::{SoftLayerApi, SoftLayerClient};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Every resource type the provider serves
pub const RESOURCE_TYPES: &[&str] = &[
    virtual_guest::TYPE_NAME,
    bare_metal::TYPE_NAME,
    vlan::TYPE_NAME,
    network_storage::FILE_TYPE_NAME,
    network_storage::BLOCK_TYPE_NAME,
    dns_domain::TYPE_NAME,
    dns_record::TYPE_NAME,
    ssh_key::TYPE_NAME,
    user::TYPE_NAME,
    lb_vpx::TYPE_NAME,
    lb_vpx_vip::TYPE_NAME,
];

fn schema() -> Schema {
    Schema::new()
        .attribute(
            "username",
            Attribute::string()
                .optional()
                .description("SoftLayer username; defaults to SOFTLAYER_USERNAME"),
        )
        .attribute(
            "api_key",
            Attribute::string()
                .optional()
                .sensitive()
                .description("API key for the username; defaults to SOFTLAYER_API_KEY"),
        )
        .attribute(
            "endpoint_url",
            Attribute::string()
                .optional()
                .description("REST endpoint; defaults to SOFTLAYER_ENDPOINT_URL or the public endpoint"),
        )
        .attribute(
            "timeout",
            Attribute::int()
                .optional()
                .description("Per-request timeout in seconds; defaults to SOFTLAYER_TIMEOUT or 60"),
        )
}

/// SoftLayer provider
pub struct Provider {
    schema: Schema,
    client: Option<Arc<dyn SoftLayerApi>>,
    timing: Timing,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider {
    /// An unconfigured provider; call [`Provider::configure`] before use
    pub fn new() -> Self {
        Self {
            schema: schema(),
            client: None,
            timing: Timing::default(),
        }
    }

    /// A provider using an already built client, skipping `configure`
    pub fn with_client(client: Arc<dyn SoftLayerApi>) -> Self {
        Self {
            client: Some(client),
            ..Self::new()
        }
    }

    /// Replace the waits and retries handed to every handler
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Build the client from the provider block and check the credentials
    pub async fn configure(&mut self, attributes: &Map<String, Value>) -> Result<(), ProviderError> {
        let diagnostics = self.schema.validate(attributes);
        if has_errors(&diagnostics) {
            let problems: Vec<String> = diagnostics.iter().map(ToString::to_string).collect();
            return Err(ProviderError::InvalidConfig(problems.join("; ")));
        }

        let mut config = ProviderConfig::from_env()?;
        config.merge_attributes(attributes)?;
        config.validate()?;

        let client = SoftLayerClient::new(
            config.endpoint_url.clone(),
            config.username.clone(),
            config.api_key.clone(),
            config.timeout(),
        )?;

        info!("Validating SoftLayer credentials against {}", config.endpoint_url);
        client.validate_credentials().await.map_err(|e| {
            error!("Failed to validate SoftLayer credentials: {}", e);
            error!("Check that username and api_key are set correctly and that {} is reachable", config.endpoint_url);
            ProviderError::from(e)
        })?;
        info!("SoftLayer provider configured for {}", config.username);

        self.client = Some(Arc::new(client));
        Ok(())
    }

    /// Resource type names, in registration order
    pub fn resource_types() -> &'static [&'static str] {
        RESOURCE_TYPES
    }

    /// Every resource handler keyed by type name
    pub fn resources(&self) -> Result<HashMap<&'static str, Box<dyn Resource>>, ProviderError> {
        let client = self.client()?;
        Ok(RESOURCE_TYPES
            .iter()
            .filter_map(|name| build(name, client, &self.timing).map(|resource| (*name, resource)))
            .collect())
    }

    /// The handler for one resource type
    pub fn resource(&self, name: &str) -> Result<Box<dyn Resource>, ProviderError> {
        let client = self.client()?;
        build(name, client, &self.timing).ok_or_else(|| ProviderError::UnknownResource(name.to_string()))
    }

    fn client(&self) -> Result<&Arc<dyn SoftLayerApi>, ProviderError> {
        self.client
            .as_ref()
            .ok_or_else(|| ProviderError::InvalidConfig("provider is not configured".to_string()))
    }
}

fn build(name: &str, client: &Arc<dyn SoftLayerApi>, timing: &Timing) -> Option<Box<dyn Resource>> {
    let client = Arc::clone(client);
    let timing = timing.clone();
    let resource: Box<dyn Resource> = match name {
        virtual_guest::TYPE_NAME => Box::new(VirtualGuestResource::new(client, timing)),
        bare_metal::TYPE_NAME => Box::new(BareMetalResource::new(client, timing)),
        vlan::TYPE_NAME => Box::new(VlanResource::new(client, timing)),
        network_storage::FILE_TYPE_NAME => Box::new(NetworkStorageResource::new(client, StorageKind::File, timing)),
        network_storage::BLOCK_TYPE_NAME => {
            Box::new(NetworkStorageResource::new(client, StorageKind::Block, timing))
        }
        dns_domain::TYPE_NAME => Box::new(DnsDomainResource::new(client)),
        dns_record::TYPE_NAME => Box::new(DnsRecordResource::new(client)),
        ssh_key::TYPE_NAME => Box::new(SshKeyResource::new(client)),
        user::TYPE_NAME => Box::new(UserResource::new(client)),
        lb_vpx::TYPE_NAME => Box::new(LbVpxResource::new(client, timing)),
        lb_vpx_vip::TYPE_NAME => Box::new(LbVpxVipResource::new(client, timing)),
        _ => return None,
    };
    Some(resource)
}
