//! DNS operations for MockSoftLayerClient

use super::MockSoftLayerClient;
use crate::error::SoftLayerError;
use crate::models::*;
use serde_json::json;

fn serial() -> u64 {
    chrono::Utc::now()
        .format("%Y%m%d01")
        .to_string()
        .parse()
        .unwrap_or(1)
}

fn record_from(id: u64, domain_id: u64, template: &DnsRecordTemplate) -> DnsRecord {
    DnsRecord {
        id,
        domain_id,
        host: template.host.clone(),
        data: template.data.clone(),
        record_type: template.record_type.clone(),
        ttl: template.ttl,
        mx_priority: template.mx_priority,
        priority: template.priority,
        weight: template.weight,
        port: template.port,
        service: template.service.clone(),
        protocol: template.protocol.clone(),
        responsible_person: template.responsible_person.clone(),
        ..Default::default()
    }
}

pub fn create_dns_domain(client: &MockSoftLayerClient, template: &DnsDomainTemplate) -> Result<DnsDomain, SoftLayerError> {
    client.enter(
        "SoftLayer_Dns_Domain::createObject",
        serde_json::to_value(template)?,
    )?;

    if client
        .dns_domains
        .lock()
        .unwrap()
        .values()
        .any(|d| d.name == template.name)
    {
        return Err(SoftLayerError::api(
            500,
            "SoftLayer_Exception_Dns_Domain_DuplicateZone",
            format!("The zone {} already exists.", template.name),
        ));
    }

    let id = client.next_id();
    let records: Vec<DnsRecord> = template
        .resource_records
        .iter()
        .map(|r| record_from(client.next_id(), id, r))
        .collect();
    {
        let mut store = client.dns_records.lock().unwrap();
        for record in &records {
            store.insert(record.id, record.clone());
        }
    }

    let domain = DnsDomain {
        id,
        name: template.name.clone(),
        serial: Some(serial()),
        update_date: Some(chrono::Utc::now().to_rfc3339()),
        resource_records: Vec::new(),
    };
    client.dns_domains.lock().unwrap().insert(id, domain.clone());

    Ok(DnsDomain {
        resource_records: records,
        ..domain
    })
}

pub fn get_dns_domain(client: &MockSoftLayerClient, id: u64) -> Result<DnsDomain, SoftLayerError> {
    client.enter("SoftLayer_Dns_Domain::getObject", json!(id))?;
    let mut domain = client
        .dns_domains
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Dns_Domain", id))?;

    let mut records: Vec<DnsRecord> = client
        .dns_records
        .lock()
        .unwrap()
        .values()
        .filter(|r| r.domain_id == id)
        .cloned()
        .collect();
    records.sort_by_key(|r| r.id);
    domain.resource_records = records;
    Ok(domain)
}

pub fn delete_dns_domain(client: &MockSoftLayerClient, id: u64) -> Result<bool, SoftLayerError> {
    client.enter("SoftLayer_Dns_Domain::deleteObject", json!(id))?;
    if client.dns_domains.lock().unwrap().remove(&id).is_none() {
        return Err(MockSoftLayerClient::not_found("SoftLayer_Dns_Domain", id));
    }
    client
        .dns_records
        .lock()
        .unwrap()
        .retain(|_, r| r.domain_id != id);
    Ok(true)
}

pub fn create_dns_record(client: &MockSoftLayerClient, template: &DnsRecordTemplate) -> Result<DnsRecord, SoftLayerError> {
    client.enter(
        "SoftLayer_Dns_Domain_ResourceRecord::createObject",
        serde_json::to_value(template)?,
    )?;
    let domain_id = template.domain_id.ok_or_else(|| {
        SoftLayerError::api(
            500,
            "SoftLayer_Exception_MissingCreationProperty",
            "Property 'domainId' must be set for creation.",
        )
    })?;
    if !client.dns_domains.lock().unwrap().contains_key(&domain_id) {
        return Err(MockSoftLayerClient::not_found("SoftLayer_Dns_Domain", domain_id));
    }

    let record = record_from(client.next_id(), domain_id, template);
    client
        .dns_records
        .lock()
        .unwrap()
        .insert(record.id, record.clone());
    Ok(record)
}

pub fn get_dns_record(client: &MockSoftLayerClient, id: u64) -> Result<DnsRecord, SoftLayerError> {
    client.enter("SoftLayer_Dns_Domain_ResourceRecord::getObject", json!(id))?;
    client
        .dns_records
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Dns_Domain_ResourceRecord", id))
}

pub fn edit_dns_record(client: &MockSoftLayerClient, id: u64, edit: &DnsRecordEdit) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_Dns_Domain_ResourceRecord::editObject",
        json!({ "id": id, "template": serde_json::to_value(edit)? }),
    )?;
    let mut store = client.dns_records.lock().unwrap();
    let record = store
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Dns_Domain_ResourceRecord", id))?;
    if let Some(host) = &edit.host {
        record.host = host.clone();
    }
    if let Some(data) = &edit.data {
        record.data = data.clone();
    }
    if let Some(ttl) = edit.ttl {
        record.ttl = ttl;
    }
    if let Some(mx_priority) = edit.mx_priority {
        record.mx_priority = mx_priority;
    }
    if let Some(priority) = edit.priority {
        record.priority = priority;
    }
    if let Some(weight) = edit.weight {
        record.weight = weight;
    }
    if let Some(port) = edit.port {
        record.port = port;
    }
    if let Some(person) = &edit.responsible_person {
        record.responsible_person = person.clone();
    }
    Ok(true)
}

pub fn delete_dns_record(client: &MockSoftLayerClient, id: u64) -> Result<bool, SoftLayerError> {
    client.enter("SoftLayer_Dns_Domain_ResourceRecord::deleteObject", json!(id))?;
    client
        .dns_records
        .lock()
        .unwrap()
        .remove(&id)
        .map(|_| true)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Dns_Domain_ResourceRecord", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::softlayer_trait::DnsService;

    #[tokio::test]
    async fn test_domain_with_initial_record() {
        let client = MockSoftLayerClient::new();
        let domain = client
            .create_dns_domain(&DnsDomainTemplate {
                name: "example.com".to_string(),
                resource_records: vec![DnsRecordTemplate {
                    host: "@".to_string(),
                    data: "169.45.1.1".to_string(),
                    record_type: "a".to_string(),
                    ttl: 86400,
                    ..Default::default()
                }],
            })
            .await
            .unwrap();

        let fetched = client.get_dns_domain(domain.id).await.unwrap();
        assert_eq!(fetched.resource_records.len(), 1);
        assert_eq!(fetched.resource_records[0].host, "@");

        assert!(client
            .create_dns_domain(&DnsDomainTemplate {
                name: "example.com".to_string(),
                resource_records: vec![],
            })
            .await
            .is_err());

        client.delete_dns_domain(domain.id).await.unwrap();
        assert!(client.get_dns_domain(domain.id).await.unwrap_err().is_not_found());
        assert!(client.dns_records.lock().unwrap().is_empty());
    }
}
