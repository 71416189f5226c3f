//! Account operations for MockSoftLayerClient
//!
//! Handles the session user, portal users with their permissions, and SSH keys

use super::MockSoftLayerClient;
use crate::error::SoftLayerError;
use crate::models::*;
use serde_json::json;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Account id every mock object belongs to
const ACCOUNT_ID: u64 = 278444;

pub fn get_current_user(client: &MockSoftLayerClient) -> Result<User, SoftLayerError> {
    client.enter("SoftLayer_Account::getCurrentUser", json!(null))?;
    Ok(User {
        id: 1,
        username: "mock-user".to_string(),
        account_id: Some(ACCOUNT_ID),
        user_status_id: Some(USER_STATUS_ACTIVE),
        ..Default::default()
    })
}

fn fingerprint(key: &str) -> String {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher
        .finish()
        .to_be_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

pub fn create_ssh_key(client: &MockSoftLayerClient, template: &SshKeyTemplate) -> Result<SshKey, SoftLayerError> {
    client.enter(
        "SoftLayer_Security_Ssh_Key::createObject",
        serde_json::to_value(template)?,
    )?;
    if client
        .ssh_keys
        .lock()
        .unwrap()
        .values()
        .any(|k| k.key == template.key)
    {
        return Err(SoftLayerError::api(
            500,
            "SoftLayer_Exception_Public",
            "The SSH key already exists on this account.",
        ));
    }

    let key = SshKey {
        id: client.next_id(),
        key: template.key.clone(),
        label: template.label.clone(),
        notes: template.notes.clone(),
        fingerprint: Some(fingerprint(&template.key)),
    };
    client.ssh_keys.lock().unwrap().insert(key.id, key.clone());
    Ok(key)
}

pub fn get_ssh_key(client: &MockSoftLayerClient, id: u64) -> Result<SshKey, SoftLayerError> {
    client.enter("SoftLayer_Security_Ssh_Key::getObject", json!(id))?;
    client
        .ssh_keys
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Security_Ssh_Key", id))
}

pub fn edit_ssh_key(client: &MockSoftLayerClient, id: u64, edit: &SshKeyEdit) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_Security_Ssh_Key::editObject",
        json!({ "id": id, "template": serde_json::to_value(edit)? }),
    )?;
    let mut keys = client.ssh_keys.lock().unwrap();
    let key = keys
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Security_Ssh_Key", id))?;
    if let Some(label) = &edit.label {
        key.label = label.clone();
    }
    if let Some(notes) = &edit.notes {
        key.notes = Some(notes.clone());
    }
    Ok(true)
}

pub fn delete_ssh_key(client: &MockSoftLayerClient, id: u64) -> Result<bool, SoftLayerError> {
    client.enter("SoftLayer_Security_Ssh_Key::deleteObject", json!(id))?;
    client
        .ssh_keys
        .lock()
        .unwrap()
        .remove(&id)
        .map(|_| true)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_Security_Ssh_Key", id))
}

pub fn create_user(client: &MockSoftLayerClient, template: &UserTemplate, password: Option<&str>) -> Result<User, SoftLayerError> {
    client.enter(
        "SoftLayer_User_Customer::createObject",
        json!({
            "template": serde_json::to_value(template)?,
            "passwordSet": password.is_some(),
        }),
    )?;
    if client
        .users
        .lock()
        .unwrap()
        .values()
        .any(|u| u.username == template.username)
    {
        return Err(SoftLayerError::api(
            500,
            "SoftLayer_Exception_User_Customer_DuplicateUsername",
            format!("Username {} is already in use.", template.username),
        ));
    }

    let user = User {
        id: client.next_id(),
        username: template.username.clone(),
        first_name: Some(template.first_name.clone()),
        last_name: Some(template.last_name.clone()),
        email: Some(template.email.clone()),
        company_name: Some(template.company_name.clone()),
        address1: Some(template.address1.clone()),
        address2: template.address2.clone(),
        city: Some(template.city.clone()),
        state: Some(template.state.clone()),
        country: Some(template.country.clone()),
        postal_code: template.postal_code.clone(),
        office_phone: template.office_phone.clone(),
        timezone_id: Some(template.timezone_id),
        user_status_id: Some(template.user_status_id),
        account_id: Some(ACCOUNT_ID),
    };
    client.users.lock().unwrap().insert(user.id, user.clone());
    client.permissions.lock().unwrap().insert(user.id, Vec::new());
    Ok(user)
}

pub fn get_user(client: &MockSoftLayerClient, id: u64) -> Result<User, SoftLayerError> {
    client.enter("SoftLayer_User_Customer::getObject", json!(id))?;
    client
        .users
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_User_Customer", id))
}

pub fn edit_user(client: &MockSoftLayerClient, id: u64, edit: &UserEdit) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_User_Customer::editObject",
        json!({ "id": id, "template": serde_json::to_value(edit)? }),
    )?;
    let mut users = client.users.lock().unwrap();
    let user = users
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_User_Customer", id))?;

    fn apply(target: &mut Option<String>, value: &Option<String>) {
        if value.is_some() {
            *target = value.clone();
        }
    }
    apply(&mut user.first_name, &edit.first_name);
    apply(&mut user.last_name, &edit.last_name);
    apply(&mut user.email, &edit.email);
    apply(&mut user.company_name, &edit.company_name);
    apply(&mut user.address1, &edit.address1);
    apply(&mut user.address2, &edit.address2);
    apply(&mut user.city, &edit.city);
    apply(&mut user.state, &edit.state);
    apply(&mut user.country, &edit.country);
    apply(&mut user.postal_code, &edit.postal_code);
    apply(&mut user.office_phone, &edit.office_phone);
    if edit.timezone_id.is_some() {
        user.timezone_id = edit.timezone_id;
    }
    if edit.user_status_id.is_some() {
        user.user_status_id = edit.user_status_id;
    }
    Ok(true)
}

pub fn get_user_permissions(client: &MockSoftLayerClient, id: u64) -> Result<Vec<Permission>, SoftLayerError> {
    client.enter("SoftLayer_User_Customer::getPermissions", json!(id))?;
    let permissions = client.permissions.lock().unwrap();
    let keys = permissions
        .get(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_User_Customer", id))?;
    Ok(keys
        .iter()
        .map(|key| Permission {
            key_name: key.clone(),
            name: None,
        })
        .collect())
}

pub fn add_user_permissions(client: &MockSoftLayerClient, id: u64, key_names: &[String]) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_User_Customer::addBulkPortalPermission",
        json!({ "id": id, "permissions": key_names }),
    )?;
    let mut permissions = client.permissions.lock().unwrap();
    let keys = permissions
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_User_Customer", id))?;
    for key in key_names {
        if !keys.contains(key) {
            keys.push(key.clone());
        }
    }
    Ok(true)
}

pub fn remove_user_permissions(client: &MockSoftLayerClient, id: u64, key_names: &[String]) -> Result<bool, SoftLayerError> {
    client.enter(
        "SoftLayer_User_Customer::removeBulkPortalPermission",
        json!({ "id": id, "permissions": key_names }),
    )?;
    let mut permissions = client.permissions.lock().unwrap();
    let keys = permissions
        .get_mut(&id)
        .ok_or_else(|| MockSoftLayerClient::not_found("SoftLayer_User_Customer", id))?;
    keys.retain(|k| !key_names.contains(k));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::softlayer_trait::{SshKeyService, UserService};

    #[tokio::test]
    async fn test_duplicate_ssh_key_rejected() {
        let client = MockSoftLayerClient::new();
        let template = SshKeyTemplate {
            key: "ssh-rsa AAAAB3Nza test@example".to_string(),
            label: "test".to_string(),
            notes: None,
        };
        let key = client.create_ssh_key(&template).await.unwrap();
        assert_eq!(key.fingerprint.as_deref().map(|f| f.split(':').count()), Some(8));
        assert!(client.create_ssh_key(&template).await.is_err());
    }

    #[tokio::test]
    async fn test_permissions_add_and_remove() {
        let client = MockSoftLayerClient::new();
        let user = client
            .create_user(
                &UserTemplate {
                    username: "jdoe".to_string(),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        client
            .add_user_permissions(user.id, &["TICKET_VIEW".to_string(), "SERVER_ADD".to_string()])
            .await
            .unwrap();
        client
            .remove_user_permissions(user.id, &["SERVER_ADD".to_string()])
            .await
            .unwrap();

        let keys: Vec<String> = client
            .get_user_permissions(user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.key_name)
            .collect();
        assert_eq!(keys, vec!["TICKET_VIEW".to_string()]);
    }
}
