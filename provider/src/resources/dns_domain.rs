//! `softlayer_dns_domain`: a hosted DNS zone

use crate::crud::{self, parse_id, read_or_clear};
use crate::error::ProviderError;
use crate::resource::Resource;
use provider_schema::{Attribute, ResourceData, Schema, validators};
use softlayer_client::{DnsDomain, DnsDomainTemplate, DnsRecordTemplate, DnsService};
use std::sync::Arc;
use tracing::info;

pub const TYPE_NAME: &str = "softlayer_dns_domain";

/// TTL of the apex record created from `target`
const APEX_TTL: u32 = 86400;

fn schema() -> Schema {
    Schema::new()
        .attribute(
            "name",
            Attribute::string()
                .required()
                .force_new()
                .validate_with(validators::non_empty()),
        )
        .attribute(
            "target",
            Attribute::string()
                .optional()
                .force_new()
                .description("Address for an A record at the zone apex"),
        )
        .attribute("serial", Attribute::int().computed())
        .attribute("update_date", Attribute::string().computed())
}

pub struct DnsDomainResource<C: ?Sized> {
    client: Arc<C>,
    schema: Schema,
}

impl<C: ?Sized> DnsDomainResource<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            schema: schema(),
        }
    }
}

fn apply_domain(data: &mut ResourceData, domain: &DnsDomain) {
    data.set("name", domain.name.clone());
    data.set("serial", domain.serial.unwrap_or_default());
    data.set("update_date", domain.update_date.clone().unwrap_or_default());

    // Only track the apex record when the zone was created with one
    if data.get("target").is_some() {
        let apex = domain
            .resource_records
            .iter()
            .find(|r| r.host == "@" && r.record_type.eq_ignore_ascii_case("a"))
            .map(|r| r.data.clone());
        data.set_opt("target", apex);
    }
}

#[async_trait::async_trait]
impl<C> Resource for DnsDomainResource<C>
where
    C: DnsService + ?Sized + 'static,
{
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let name = data.require_str("name")?.to_string();
        let resource_records = data
            .get_str("target")
            .map(|target| {
                vec![DnsRecordTemplate {
                    host: "@".to_string(),
                    data: target.to_string(),
                    record_type: "a".to_string(),
                    ttl: APEX_TTL,
                    ..Default::default()
                }]
            })
            .unwrap_or_default();

        let domain = self
            .client
            .create_dns_domain(&DnsDomainTemplate {
                name: name.clone(),
                resource_records,
            })
            .await?;
        data.set_id(domain.id.to_string());
        info!("Created DNS domain {} (ID: {})", name, domain.id);

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        if let Some(domain) = read_or_clear(data, TYPE_NAME, self.client.get_dns_domain(id)).await? {
            apply_domain(data, &domain);
        }
        Ok(())
    }

    /// Every configurable attribute forces a new zone
    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        crud::ignore_not_found(self.client.delete_dns_domain(id).await)?;
        info!("Deleted DNS domain {}", id);
        data.clear_id();
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let id = parse_id(data)?;
        crud::exists_by_id(self.client.get_dns_domain(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::config;
    use serde_json::{Map, json};
    use softlayer_client::MockSoftLayerClient;

    fn resource(client: &MockSoftLayerClient) -> DnsDomainResource<MockSoftLayerClient> {
        DnsDomainResource::new(Arc::new(client.clone()))
    }

    #[tokio::test]
    async fn test_create_with_apex_record() {
        let client = MockSoftLayerClient::new();
        let resource = resource(&client);
        let mut data = ResourceData::create(
            resource.schema(),
            config(json!({"name": "example.com", "target": "169.45.1.10"})),
        );

        resource.create(&mut data).await.unwrap();

        let created = &client.calls_to("SoftLayer_Dns_Domain::createObject")[0];
        assert_eq!(created["resourceRecords"][0]["host"], "@");
        assert_eq!(data.get_str("target"), Some("169.45.1.10"));
        assert!(data.get_i64("serial").unwrap() > 0);
        assert!(data.missing_computed(resource.schema()).is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_zone_is_an_error() {
        let client = MockSoftLayerClient::new();
        let resource = resource(&client);
        let cfg = config(json!({"name": "example.com"}));
        resource
            .create(&mut ResourceData::create(resource.schema(), cfg.clone()))
            .await
            .unwrap();

        let mut second = ResourceData::create(resource.schema(), cfg);
        let err = resource.create(&mut second).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(second.id(), None);
    }

    #[tokio::test]
    async fn test_delete_then_read_clears_id() {
        let client = MockSoftLayerClient::new();
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), config(json!({"name": "example.org"})));
        resource.create(&mut data).await.unwrap();
        let id = data.id().unwrap().to_string();

        resource.delete(&mut data).await.unwrap();
        assert_eq!(data.id(), None);

        let mut stale = ResourceData::from_state(resource.schema(), id.clone(), Map::new());
        resource.read(&mut stale).await.unwrap();
        assert_eq!(stale.id(), None);

        // Deleting a zone that is already gone succeeds
        let mut stale = ResourceData::from_state(resource.schema(), id, Map::new());
        resource.delete(&mut stale).await.unwrap();
    }
}
