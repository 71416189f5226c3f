//! `softlayer_lb_vpx_vip`: virtual IPs on a NetScaler VPX
//!
//! VIPs have no id of their own; they are addressed by name on their
//! appliance, so the resource ID is `<nadc id>:<name>`. The appliance rejects
//! concurrent changes with "Operation already in progress", which every
//! mutating call retries.

use crate::crud::{self, changed_fields};
use crate::error::ProviderError;
use crate::resource::Resource;
use crate::retry::retry_transient;
use crate::wait::Timing;
use provider_schema::{Attribute, ResourceData, Schema, validators};
use softlayer_client::{LoadBalancerService, LoadBalancerVip, LoadBalancerVipEdit};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const TYPE_NAME: &str = "softlayer_lb_vpx_vip";

fn schema() -> Schema {
    Schema::new()
        .attribute("nad_controller_id", Attribute::int().required().force_new())
        .attribute(
            "name",
            Attribute::string()
                .required()
                .force_new()
                .validate_with(validators::non_empty()),
        )
        .attribute("virtual_ip_address", Attribute::string().required().force_new())
        .attribute(
            "source_port",
            Attribute::int()
                .required()
                .validate_with(validators::int_between(1, 65535)),
        )
        .attribute(
            "type",
            Attribute::string()
                .required()
                .force_new()
                .validate_with(validators::one_of(&["HTTP", "FTP", "TCP", "UDP", "DNS"])),
        )
        .attribute(
            "load_balancing_method",
            Attribute::string()
                .required()
                .description("rr (round robin), lc (least connections), sr (shortest response), sh (source hash)")
                .validate_with(validators::one_of(&["rr", "lc", "sr", "sh"])),
        )
        .attribute(
            "persistence",
            Attribute::string()
                .optional()
                .validate_with(validators::one_of(&["SOURCEIP", "COOKIEINSERT", "SSLSESSION", "DESTIP", "SRCIPDESTIP"])),
        )
        .attribute("security_certificate_id", Attribute::int().optional())
        .attribute(
            "connection_limit",
            Attribute::int()
                .optional()
                .validate_with(validators::int_between(0, 4_294_967_294)),
        )
        .attribute("notes", Attribute::string().optional())
}

pub struct LbVpxVipResource<C: ?Sized> {
    client: Arc<C>,
    schema: Schema,
    timing: Timing,
}

impl<C: ?Sized> LbVpxVipResource<C> {
    pub fn new(client: Arc<C>, timing: Timing) -> Self {
        Self {
            client,
            schema: schema(),
            timing,
        }
    }
}

/// Split `<nadc id>:<name>`
fn parse_vip_id(data: &ResourceData) -> Result<(u64, String), ProviderError> {
    let id = data.id().ok_or(ProviderError::MissingId)?;
    let invalid = || ProviderError::InvalidId(format!("{:?} is not of the form <nadc id>:<name>", id));
    let (nadc, name) = id.split_once(':').ok_or_else(invalid)?;
    let nadc = nadc.parse().map_err(|_| invalid())?;
    if name.is_empty() {
        return Err(invalid());
    }
    Ok((nadc, name.to_string()))
}

fn build_vip(data: &ResourceData) -> Result<LoadBalancerVip, ProviderError> {
    Ok(LoadBalancerVip {
        name: data.require_str("name")?.to_string(),
        virtual_ip_address: data.require_str("virtual_ip_address")?.to_string(),
        source_port: crud::req_u32(data, "source_port")?,
        vip_type: data.require_str("type")?.to_string(),
        load_balancing_method: data.require_str("load_balancing_method")?.to_string(),
        persistence: data.get_str("persistence").map(str::to_string),
        security_certificate_id: data.get_i64("security_certificate_id").and_then(|v| u64::try_from(v).ok()),
        connection_limit: crud::opt_u32(data, "connection_limit")?,
        notes: data.get_str("notes").map(str::to_string),
    })
}

fn build_edit(data: &ResourceData, name: String) -> Result<LoadBalancerVipEdit, ProviderError> {
    let mut edit = LoadBalancerVipEdit {
        name,
        ..Default::default()
    };
    let fields = [
        "source_port",
        "load_balancing_method",
        "persistence",
        "security_certificate_id",
        "connection_limit",
        "notes",
    ];
    for key in changed_fields(data, &fields) {
        match key {
            "source_port" => edit.source_port = Some(crud::req_u32(data, key)?),
            "load_balancing_method" => edit.load_balancing_method = Some(data.require_str(key)?.to_string()),
            "persistence" => edit.persistence = Some(data.get_str(key).unwrap_or("NONE").to_string()),
            // null detaches the certificate
            "security_certificate_id" => {
                edit.security_certificate_id = Some(data.get_i64(key).and_then(|v| u64::try_from(v).ok()))
            }
            "connection_limit" => edit.connection_limit = Some(crud::opt_u32(data, key)?.unwrap_or(0)),
            "notes" => edit.notes = Some(data.get_str(key).unwrap_or_default().to_string()),
            _ => {}
        }
    }
    Ok(edit)
}

fn apply_vip(data: &mut ResourceData, nadc_id: u64, vip: &LoadBalancerVip) {
    data.set("nad_controller_id", nadc_id);
    data.set("name", vip.name.clone());
    data.set("virtual_ip_address", vip.virtual_ip_address.clone());
    data.set("source_port", vip.source_port);
    data.set("type", vip.vip_type.clone());
    data.set("load_balancing_method", vip.load_balancing_method.clone());
    data.set_opt("persistence", vip.persistence.clone().filter(|p| p != "NONE"));
    data.set_opt("security_certificate_id", vip.security_certificate_id);
    data.set_opt("connection_limit", vip.connection_limit.filter(|limit| *limit > 0));
    data.set_opt("notes", vip.notes.clone().filter(|n| !n.is_empty()));
}

impl<C> LbVpxVipResource<C>
where
    C: LoadBalancerService + ?Sized,
{
    /// The VIP by name; `None` when it or its appliance is gone
    async fn find_vip(&self, nadc_id: u64, name: &str) -> Result<Option<LoadBalancerVip>, ProviderError> {
        match self.client.list_virtual_ips(nadc_id).await {
            Ok(vips) => Ok(vips.into_iter().find(|v| v.name == name)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl<C> Resource for LbVpxVipResource<C>
where
    C: LoadBalancerService + ?Sized + 'static,
{
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let nadc_id = data
            .require_i64("nad_controller_id")
            .map_err(ProviderError::from)
            .and_then(|v| {
                u64::try_from(v).map_err(|_| ProviderError::validation("nad_controller_id", "must be positive"))
            })?;
        let vip = build_vip(data)?;

        let client = self.client.as_ref();
        let template = &vip;
        retry_transient(
            &format!("create virtual IP {} on {}", vip.name, nadc_id),
            &self.timing.retry,
            move || client.create_virtual_ip(nadc_id, template),
        )
        .await?;
        data.set_id(format!("{}:{}", nadc_id, vip.name));
        info!("Created virtual IP {} on NetScaler {}", vip.name, nadc_id);

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let (nadc_id, name) = parse_vip_id(data)?;
        match self.find_vip(nadc_id, &name).await? {
            Some(vip) => apply_vip(data, nadc_id, &vip),
            None => {
                warn!(
                    "{} {}:{} no longer exists (drift detected), removing from state",
                    TYPE_NAME, nadc_id, name
                );
                data.clear_id();
            }
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let (nadc_id, name) = parse_vip_id(data)?;
        let edit = build_edit(data, name.clone())?;
        let unchanged = LoadBalancerVipEdit {
            name: name.clone(),
            ..Default::default()
        };
        if edit != unchanged {
            debug!("Updating virtual IP {} on {}: {:?}", name, nadc_id, edit);
            let client = self.client.as_ref();
            let edit = &edit;
            retry_transient(
                &format!("update virtual IP {} on {}", name, nadc_id),
                &self.timing.retry,
                move || client.update_virtual_ip(nadc_id, edit),
            )
            .await?;
            info!("Updated virtual IP {} on NetScaler {}", name, nadc_id);
        }
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let (nadc_id, name) = parse_vip_id(data)?;
        let client = self.client.as_ref();
        let vip_name = name.as_str();
        let result = retry_transient(
            &format!("delete virtual IP {} on {}", name, nadc_id),
            &self.timing.retry,
            move || client.delete_virtual_ip(nadc_id, vip_name),
        )
        .await;
        match result {
            Ok(_) => info!("Deleted virtual IP {} on NetScaler {}", name, nadc_id),
            Err(e) if e.is_not_found() => debug!("Virtual IP {} on {} already gone", name, nadc_id),
            Err(e) => return Err(e),
        }
        data.clear_id();
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let (nadc_id, name) = parse_vip_id(data)?;
        Ok(self.find_vip(nadc_id, &name).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{config, fast_timing};
    use serde_json::{Map, Value, json};
    use softlayer_client::{DeliveryController, MockSoftLayerClient};

    const NADC: u64 = 77;
    const IN_PROGRESS: &str = "Operation already in progress";

    fn resource(client: &MockSoftLayerClient) -> LbVpxVipResource<MockSoftLayerClient> {
        LbVpxVipResource::new(Arc::new(client.clone()), fast_timing())
    }

    fn client_with_nadc() -> MockSoftLayerClient {
        let client = MockSoftLayerClient::new();
        client.add_delivery_controller(DeliveryController {
            id: NADC,
            name: format!("SLADC{}", NADC),
            ..Default::default()
        });
        client
    }

    fn vip_config() -> Map<String, Value> {
        config(json!({
            "nad_controller_id": NADC,
            "name": "web",
            "virtual_ip_address": "169.60.0.77",
            "source_port": 80,
            "type": "HTTP",
            "load_balancing_method": "lc",
            "persistence": "SOURCEIP"
        }))
    }

    #[tokio::test]
    async fn test_create_retries_operation_in_progress() {
        let client = client_with_nadc();
        client.fail_next(
            "SoftLayer_Network_Application_Delivery_Controller::createLiveLoadBalancer",
            "SoftLayer_Exception_Public",
            IN_PROGRESS,
            2,
        );
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vip_config());

        resource.create(&mut data).await.unwrap();

        assert_eq!(data.id(), Some("77:web"));
        assert_eq!(
            client
                .calls_to("SoftLayer_Network_Application_Delivery_Controller::createLiveLoadBalancer")
                .len(),
            3
        );
        assert_eq!(data.get_str("persistence"), Some("SOURCEIP"));
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_timeout() {
        let client = client_with_nadc();
        client.fail_next(
            "SoftLayer_Network_Application_Delivery_Controller::createLiveLoadBalancer",
            "SoftLayer_Exception_Public",
            IN_PROGRESS,
            u32::MAX,
        );
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vip_config());

        let err = resource.create(&mut data).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let client = client_with_nadc();
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vip_config());
        resource.create(&mut data).await.unwrap();

        let mut cfg = vip_config();
        cfg.insert("load_balancing_method".to_string(), json!("rr"));
        cfg.insert("connection_limit".to_string(), json!(500));
        let mut data = ResourceData::update(resource.schema(), data.id().unwrap(), data.state(), cfg);
        resource.update(&mut data).await.unwrap();

        let updates = client.calls_to("SoftLayer_Network_Application_Delivery_Controller::updateLiveLoadBalancer");
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0]["vip"],
            json!({"name": "web", "loadBalancingMethod": "rr", "connectionLimit": 500})
        );
        assert_eq!(data.get_str("load_balancing_method"), Some("rr"));
        assert_eq!(data.get_i64("connection_limit"), Some(500));
    }

    #[tokio::test]
    async fn test_update_detaches_removed_certificate() {
        let client = client_with_nadc();
        let resource = resource(&client);
        let mut with_cert = vip_config();
        with_cert.insert("security_certificate_id".to_string(), json!(5));
        let mut data = ResourceData::create(resource.schema(), with_cert);
        resource.create(&mut data).await.unwrap();
        assert_eq!(data.get_i64("security_certificate_id"), Some(5));

        let mut data = ResourceData::update(resource.schema(), data.id().unwrap(), data.state(), vip_config());
        assert!(data.has_change("security_certificate_id"));
        resource.update(&mut data).await.unwrap();

        let updates = client.calls_to("SoftLayer_Network_Application_Delivery_Controller::updateLiveLoadBalancer");
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0]["vip"], json!({"name": "web", "securityCertificateId": null}));
        assert_eq!(data.get_i64("security_certificate_id"), None);
    }

    #[tokio::test]
    async fn test_delete_and_drift() {
        let client = client_with_nadc();
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), vip_config());
        resource.create(&mut data).await.unwrap();
        let id = data.id().unwrap().to_string();

        resource.delete(&mut data).await.unwrap();
        assert_eq!(data.id(), None);

        let mut stale = ResourceData::from_state(resource.schema(), id.clone(), Map::new());
        assert!(!resource.exists(&stale).await.unwrap());
        resource.read(&mut stale).await.unwrap();
        assert_eq!(stale.id(), None);

        // Deleting again is not an error
        let mut stale = ResourceData::from_state(resource.schema(), id, Map::new());
        resource.delete(&mut stale).await.unwrap();
    }

    #[test]
    fn test_parse_vip_id() {
        let schema = schema();
        let data = ResourceData::from_state(&schema, "77:web", Map::new());
        assert_eq!(parse_vip_id(&data).unwrap(), (77, "web".to_string()));

        for bad in ["web", "x:web", "77:"] {
            let data = ResourceData::from_state(&schema, bad, Map::new());
            assert!(matches!(parse_vip_id(&data), Err(ProviderError::InvalidId(_))));
        }
    }
}
