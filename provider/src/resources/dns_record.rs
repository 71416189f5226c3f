//! `softlayer_dns_domain_record`: a resource record inside a hosted zone
//!
//! MX records need `mx_priority`; SRV records need `service`, `protocol`,
//! `priority`, `weight` and `port`. Both rules are checked in `validate` and
//! again before the create call.

use crate::crud::{self, changed_fields, parse_id, read_or_clear};
use crate::error::ProviderError;
use crate::resource::Resource;
use provider_schema::{Attribute, Diagnostic, ResourceData, Schema, validators};
use serde_json::{Map, Value};
use softlayer_client::{DnsRecord, DnsRecordEdit, DnsRecordTemplate, DnsService};
use std::sync::Arc;
use tracing::{debug, info};

pub const TYPE_NAME: &str = "softlayer_dns_domain_record";

const RECORD_TYPES: &[&str] = &["a", "aaaa", "cname", "mx", "ns", "ptr", "soa", "spf", "srv", "txt"];
const SRV_FIELDS: &[&str] = &["service", "protocol", "priority", "weight", "port"];

fn schema() -> Schema {
    Schema::new()
        .attribute("domain_id", Attribute::int().required().force_new())
        .attribute("host", Attribute::string().required())
        .attribute("data", Attribute::string().required())
        .attribute(
            "type",
            Attribute::string()
                .required()
                .force_new()
                .description("Lower case record type")
                .validate_with(validators::one_of(RECORD_TYPES)),
        )
        .attribute(
            "ttl",
            Attribute::int()
                .optional()
                .default(900)
                .validate_with(validators::int_between(60, 2_147_483_647)),
        )
        .attribute("mx_priority", Attribute::int().optional().validate_with(validators::int_between(0, 65535)))
        .attribute("service", Attribute::string().optional().force_new())
        .attribute("protocol", Attribute::string().optional().force_new())
        .attribute("priority", Attribute::int().optional().validate_with(validators::int_between(0, 65535)))
        .attribute("weight", Attribute::int().optional().validate_with(validators::int_between(0, 65535)))
        .attribute("port", Attribute::int().optional().validate_with(validators::int_between(0, 65535)))
        .attribute("responsible_person", Attribute::string().optional())
}

pub struct DnsRecordResource<C: ?Sized> {
    client: Arc<C>,
    schema: Schema,
}

impl<C: ?Sized> DnsRecordResource<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            schema: schema(),
        }
    }
}

/// Attributes a record type needs beyond the common ones
fn required_for(record_type: &str) -> &'static [&'static str] {
    match record_type {
        "mx" => &["mx_priority"],
        "srv" => SRV_FIELDS,
        _ => &[],
    }
}

fn check_type_fields(record_type: &str, is_set: impl Fn(&str) -> bool) -> Vec<(&'static str, String)> {
    required_for(record_type)
        .iter()
        .filter(|&&key| !is_set(key))
        .map(|key| (*key, format!("is required for {} records", record_type.to_uppercase())))
        .collect()
}

fn apply_record(data: &mut ResourceData, record: &DnsRecord) {
    data.set("domain_id", record.domain_id);
    data.set("host", record.host.clone());
    data.set("data", record.data.clone());
    data.set("type", record.record_type.to_lowercase());
    data.set("ttl", record.ttl);
    data.set_opt("mx_priority", record.mx_priority);
    data.set_opt("service", record.service.clone());
    data.set_opt("protocol", record.protocol.clone());
    data.set_opt("priority", record.priority);
    data.set_opt("weight", record.weight);
    data.set_opt("port", record.port);
    data.set_opt("responsible_person", record.responsible_person.clone());
}

fn build_edit(data: &ResourceData) -> Result<DnsRecordEdit, ProviderError> {
    let mut edit = DnsRecordEdit::default();
    for key in changed_fields(
        data,
        &["host", "data", "ttl", "mx_priority", "priority", "weight", "port", "responsible_person"],
    ) {
        match key {
            "host" => edit.host = Some(data.require_str("host")?.to_string()),
            "data" => edit.data = Some(data.require_str("data")?.to_string()),
            "ttl" => edit.ttl = Some(crud::req_u32(data, "ttl")?),
            // Removed optional fields are sent as null so the record drops them
            "mx_priority" => edit.mx_priority = Some(crud::opt_u32(data, "mx_priority")?),
            "priority" => edit.priority = Some(crud::opt_u32(data, "priority")?),
            "weight" => edit.weight = Some(crud::opt_u32(data, "weight")?),
            "port" => edit.port = Some(crud::opt_u32(data, "port")?),
            "responsible_person" => {
                edit.responsible_person = Some(data.get_str("responsible_person").map(str::to_string))
            }
            _ => {}
        }
    }
    Ok(edit)
}

#[async_trait::async_trait]
impl<C> Resource for DnsRecordResource<C>
where
    C: DnsService + ?Sized + 'static,
{
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn validate(&self, config: &Map<String, Value>) -> Vec<Diagnostic> {
        let mut diagnostics = self.schema.validate(config);
        if let Some(record_type) = config.get("type").and_then(Value::as_str) {
            let is_set = |key: &str| config.get(key).is_some_and(|v| !v.is_null());
            diagnostics.extend(
                check_type_fields(record_type, is_set)
                    .into_iter()
                    .map(|(key, message)| Diagnostic::error(key, message)),
            );
        }
        diagnostics
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let record_type = data.require_str("type")?.to_lowercase();
        if let Some((key, message)) = check_type_fields(&record_type, |key| data.get(key).is_some())
            .into_iter()
            .next()
        {
            return Err(ProviderError::validation(key, message));
        }

        let domain_id = u64::try_from(data.require_i64("domain_id")?)
            .map_err(|_| ProviderError::validation("domain_id", "must be a positive id"))?;
        let template = DnsRecordTemplate {
            domain_id: Some(domain_id),
            host: data.require_str("host")?.to_string(),
            data: data.require_str("data")?.to_string(),
            record_type,
            ttl: crud::req_u32(data, "ttl")?,
            mx_priority: crud::opt_u32(data, "mx_priority")?,
            priority: crud::opt_u32(data, "priority")?,
            weight: crud::opt_u32(data, "weight")?,
            port: crud::opt_u32(data, "port")?,
            service: data.get_str("service").map(str::to_string),
            protocol: data.get_str("protocol").map(str::to_string),
            responsible_person: data.get_str("responsible_person").map(str::to_string),
        };

        let record = self.client.create_dns_record(&template).await?;
        data.set_id(record.id.to_string());
        info!(
            "Created {} record {} in domain {} (ID: {})",
            template.record_type.to_uppercase(),
            template.host,
            domain_id,
            record.id
        );

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        if let Some(record) = read_or_clear(data, TYPE_NAME, self.client.get_dns_record(id)).await? {
            apply_record(data, &record);
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let edit = build_edit(data)?;
        if edit == DnsRecordEdit::default() {
            debug!("DNS record {} unchanged", id);
        } else {
            self.client.edit_dns_record(id, &edit).await?;
            info!("Updated DNS record {}", id);
        }
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        crud::ignore_not_found(self.client.delete_dns_record(id).await)?;
        data.clear_id();
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let id = parse_id(data)?;
        crud::exists_by_id(self.client.get_dns_record(id)).await
    }
}
