//! `softlayer_ssh_key`: public keys stored on the account

use crate::crud::{self, parse_id, read_or_clear};
use crate::error::ProviderError;
use crate::resource::Resource;
use provider_schema::{Attribute, ResourceData, Schema, validators};
use softlayer_client::{SshKey, SshKeyEdit, SshKeyService, SshKeyTemplate};
use std::sync::Arc;
use tracing::info;

pub const TYPE_NAME: &str = "softlayer_ssh_key";

fn schema() -> Schema {
    Schema::new()
        .attribute("label", Attribute::string().required().validate_with(validators::non_empty()))
        .attribute(
            "public_key",
            Attribute::string()
                .required()
                .force_new()
                .validate_with(validators::non_empty()),
        )
        .attribute("notes", Attribute::string().optional())
        .attribute("fingerprint", Attribute::string().computed())
}

pub struct SshKeyResource<C: ?Sized> {
    client: Arc<C>,
    schema: Schema,
}

impl<C: ?Sized> SshKeyResource<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            schema: schema(),
        }
    }
}

fn apply_key(data: &mut ResourceData, key: &SshKey) {
    data.set("label", key.label.clone());
    // Keys read from files carry a trailing newline the API strips
    let unchanged = data
        .get_str("public_key")
        .is_some_and(|configured| configured.trim() == key.key.trim());
    if !unchanged {
        data.set("public_key", key.key.clone());
    }
    data.set_opt("notes", key.notes.clone().filter(|n| !n.is_empty()));
    data.set("fingerprint", key.fingerprint.clone().unwrap_or_default());
}

#[async_trait::async_trait]
impl<C> Resource for SshKeyResource<C>
where
    C: SshKeyService + ?Sized + 'static,
{
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let template = SshKeyTemplate {
            key: data.require_str("public_key")?.trim().to_string(),
            label: data.require_str("label")?.to_string(),
            notes: data.get_str("notes").map(str::to_string),
        };
        let key = self.client.create_ssh_key(&template).await?;
        data.set_id(key.id.to_string());
        info!("Created SSH key {} (ID: {})", key.label, key.id);

        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        if let Some(key) = read_or_clear(data, TYPE_NAME, self.client.get_ssh_key(id)).await? {
            apply_key(data, &key);
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let mut edit = SshKeyEdit::default();
        if data.has_change("label") {
            edit.label = Some(data.require_str("label")?.to_string());
        }
        if data.has_change("notes") {
            edit.notes = Some(data.get_str("notes").unwrap_or_default().to_string());
        }
        if edit != SshKeyEdit::default() {
            self.client.edit_ssh_key(id, &edit).await?;
            info!("Updated SSH key {}", id);
        }
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        crud::ignore_not_found(self.client.delete_ssh_key(id).await)?;
        data.clear_id();
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let id = parse_id(data)?;
        crud::exists_by_id(self.client.get_ssh_key(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::config;
    use serde_json::json;
    use softlayer_client::MockSoftLayerClient;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGx0 ops@example.com\n";

    fn resource(client: &MockSoftLayerClient) -> SshKeyResource<MockSoftLayerClient> {
        SshKeyResource::new(Arc::new(client.clone()))
    }

    #[tokio::test]
    async fn test_create_trims_key_and_keeps_configured_value() {
        let client = MockSoftLayerClient::new();
        let resource = resource(&client);
        let mut data = ResourceData::create(resource.schema(), config(json!({"label": "ops", "public_key": KEY})));

        resource.create(&mut data).await.unwrap();

        let sent = &client.calls_to("SoftLayer_Security_Ssh_Key::createObject")[0];
        assert_eq!(sent["key"], KEY.trim());
        assert_eq!(data.get_str("public_key"), Some(KEY));
        assert!(!data.get_str("fingerprint").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_label_only() {
        let client = MockSoftLayerClient::new();
        let resource = resource(&client);
        let cfg = config(json!({"label": "ops", "public_key": KEY, "notes": "team key"}));
        let mut data = ResourceData::create(resource.schema(), cfg.clone());
        resource.create(&mut data).await.unwrap();

        let mut changed = cfg;
        changed.insert("label".to_string(), json!("ops-2026"));
        let mut data = ResourceData::update(resource.schema(), data.id().unwrap(), data.state(), changed);
        resource.update(&mut data).await.unwrap();

        let edits = client.calls_to("SoftLayer_Security_Ssh_Key::editObject");
        assert_eq!(edits[0]["template"], json!({"label": "ops-2026"}));
        assert_eq!(data.get_str("label"), Some("ops-2026"));
        assert_eq!(data.get_str("notes"), Some("team key"));
    }

    #[tokio::test]
    async fn test_duplicate_key_fails_without_id() {
        let client = MockSoftLayerClient::new();
        let resource = resource(&client);
        let cfg = config(json!({"label": "ops", "public_key": KEY}));
        resource
            .create(&mut ResourceData::create(resource.schema(), cfg.clone()))
            .await
            .unwrap();

        let mut second = ResourceData::create(resource.schema(), cfg);
        assert!(resource.create(&mut second).await.is_err());
        assert!(second.is_new());
    }
}
