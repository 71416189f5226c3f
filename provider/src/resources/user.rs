//! `softlayer_user`: portal users and their permissions
//!
//! Users cannot be deleted through the API. Delete moves the user to
//! `CANCEL_PENDING`, and Read treats a user in that state as gone.

use crate::crud::{self, changed_fields, parse_id, read_or_clear};
use crate::error::ProviderError;
use crate::resource::Resource;
use provider_schema::{Attribute, AttributeType, ResourceData, Schema, validators};
use serde_json::Value;
use softlayer_client::{
    USER_STATUS_ACTIVE, USER_STATUS_CANCEL_PENDING, User, UserEdit, UserService, UserTemplate,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const TYPE_NAME: &str = "softlayer_user";

/// `SoftLayer_User_Customer_Status` ids a practitioner may choose
const USER_STATUSES: &[(&str, u32)] = &[
    ("ACTIVE", USER_STATUS_ACTIVE),
    ("DISABLED", 1002),
    ("INACTIVE", 1003),
    ("VPN_ONLY", 1022),
];

/// Profile attributes sent through `editObject` when changed
const PROFILE_FIELDS: &[&str] = &[
    "first_name",
    "last_name",
    "email",
    "company_name",
    "address1",
    "address2",
    "city",
    "state",
    "country",
    "postal_code",
    "office_phone",
    "timezone_id",
    "user_status",
];

fn schema() -> Schema {
    let profile = || Attribute::string().required().validate_with(validators::non_empty());
    Schema::new()
        .attribute("username", Attribute::string().required().force_new())
        .attribute("first_name", profile())
        .attribute("last_name", profile())
        .attribute("email", profile())
        .attribute("company_name", profile())
        .attribute("address1", profile())
        .attribute("address2", Attribute::string().optional())
        .attribute("city", profile())
        .attribute("state", profile())
        .attribute("country", profile().description("ISO 3166 two letter code"))
        .attribute("postal_code", Attribute::string().optional())
        .attribute("office_phone", Attribute::string().optional())
        .attribute(
            "timezone_id",
            Attribute::int()
                .required()
                .description("SoftLayer_Locale_Timezone id"),
        )
        .attribute(
            "user_status",
            Attribute::string()
                .optional()
                .default("ACTIVE")
                .validate_with(validators::one_of(&["ACTIVE", "DISABLED", "INACTIVE", "VPN_ONLY"])),
        )
        .attribute(
            "password",
            Attribute::string()
                .optional()
                .sensitive()
                .description("Initial portal password; only used when the user is created"),
        )
        .attribute("permissions", Attribute::set(AttributeType::String).optional())
        .attribute("account_id", Attribute::int().computed())
}

pub struct UserResource<C: ?Sized> {
    client: Arc<C>,
    schema: Schema,
}

impl<C: ?Sized> UserResource<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            schema: schema(),
        }
    }
}

fn status_id(name: &str) -> Result<u32, ProviderError> {
    USER_STATUSES
        .iter()
        .find(|(status, _)| *status == name)
        .map(|(_, id)| *id)
        .ok_or_else(|| ProviderError::validation("user_status", format!("unknown status {:?}", name)))
}

fn status_name(id: u32) -> Option<&'static str> {
    USER_STATUSES.iter().find(|(_, status)| *status == id).map(|(name, _)| *name)
}

fn optional(data: &ResourceData, key: &str) -> Option<String> {
    data.get_str(key).map(str::to_string)
}

fn required(data: &ResourceData, key: &str) -> Result<String, ProviderError> {
    Ok(data.require_str(key)?.to_string())
}

fn build_template(data: &ResourceData) -> Result<UserTemplate, ProviderError> {
    Ok(UserTemplate {
        username: required(data, "username")?,
        first_name: required(data, "first_name")?,
        last_name: required(data, "last_name")?,
        email: required(data, "email")?,
        company_name: required(data, "company_name")?,
        address1: required(data, "address1")?,
        address2: optional(data, "address2"),
        city: required(data, "city")?,
        state: required(data, "state")?,
        country: required(data, "country")?,
        postal_code: optional(data, "postal_code"),
        office_phone: optional(data, "office_phone"),
        timezone_id: crud::req_u32(data, "timezone_id")?,
        user_status_id: status_id(data.get_str("user_status").unwrap_or("ACTIVE"))?,
    })
}

fn build_edit(data: &ResourceData) -> Result<UserEdit, ProviderError> {
    let mut edit = UserEdit::default();
    for key in changed_fields(data, PROFILE_FIELDS) {
        // Cleared optional fields are sent as empty strings
        let text = || Some(data.get_str(key).unwrap_or_default().to_string());
        match key {
            "first_name" => edit.first_name = text(),
            "last_name" => edit.last_name = text(),
            "email" => edit.email = text(),
            "company_name" => edit.company_name = text(),
            "address1" => edit.address1 = text(),
            "address2" => edit.address2 = text(),
            "city" => edit.city = text(),
            "state" => edit.state = text(),
            "country" => edit.country = text(),
            "postal_code" => edit.postal_code = text(),
            "office_phone" => edit.office_phone = text(),
            "timezone_id" => edit.timezone_id = Some(crud::req_u32(data, "timezone_id")?),
            "user_status" => {
                edit.user_status_id = Some(status_id(data.get_str("user_status").unwrap_or("ACTIVE"))?)
            }
            _ => {}
        }
    }
    Ok(edit)
}

fn apply_user(data: &mut ResourceData, user: &User) {
    data.set("username", user.username.clone());
    let profile = [
        ("first_name", &user.first_name),
        ("last_name", &user.last_name),
        ("email", &user.email),
        ("company_name", &user.company_name),
        ("address1", &user.address1),
        ("address2", &user.address2),
        ("city", &user.city),
        ("state", &user.state),
        ("country", &user.country),
        ("postal_code", &user.postal_code),
        ("office_phone", &user.office_phone),
    ];
    for (key, value) in profile {
        data.set_opt(key, value.clone().filter(|v| !v.is_empty()));
    }
    data.set_opt("timezone_id", user.timezone_id);
    if let Some(status) = user.user_status_id.and_then(status_name) {
        data.set("user_status", status);
    }
    data.set("account_id", user.account_id.unwrap_or_default());
}

/// Sorted permission key names
fn permission_set(keys: Vec<String>) -> BTreeSet<String> {
    keys.into_iter().collect()
}

impl<C> UserResource<C>
where
    C: UserService + ?Sized,
{
    async fn sync_permissions(&self, id: u64, data: &ResourceData) -> Result<(), ProviderError> {
        let (old, _) = data.get_change("permissions");
        let old = permission_set(
            old.and_then(Value::as_array)
                .map(|items| items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default(),
        );
        let new = permission_set(data.get_strings("permissions"));

        let added: Vec<String> = new.difference(&old).cloned().collect();
        let removed: Vec<String> = old.difference(&new).cloned().collect();
        if !added.is_empty() {
            debug!("Granting {:?} to user {}", added, id);
            self.client.add_user_permissions(id, &added).await?;
        }
        if !removed.is_empty() {
            debug!("Revoking {:?} from user {}", removed, id);
            self.client.remove_user_permissions(id, &removed).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl<C> Resource for UserResource<C>
where
    C: UserService + ?Sized + 'static,
{
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn create(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let template = build_template(data)?;
        let user = self
            .client
            .create_user(&template, data.get_str("password"))
            .await?;
        data.set_id(user.id.to_string());
        info!("Created user {} (ID: {})", user.username, user.id);

        self.sync_permissions(user.id, data).await?;
        self.read(data).await
    }

    async fn read(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let Some(user) = read_or_clear(data, TYPE_NAME, self.client.get_user(id)).await? else {
            return Ok(());
        };
        if user.user_status_id == Some(USER_STATUS_CANCEL_PENDING) {
            warn!("User {} is pending cancellation, removing from state", id);
            data.clear_id();
            return Ok(());
        }
        apply_user(data, &user);

        let keys: Vec<String> = self
            .client
            .get_user_permissions(id)
            .await?
            .into_iter()
            .map(|p| p.key_name)
            .collect();
        if keys.is_empty() {
            data.set("permissions", Value::Null);
        } else {
            data.set("permissions", permission_set(keys).into_iter().collect::<Vec<_>>());
        }
        Ok(())
    }

    async fn update(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let edit = build_edit(data)?;
        if edit != UserEdit::default() {
            self.client.edit_user(id, &edit).await?;
            info!("Updated user {}", id);
        }
        if data.has_change("permissions") {
            self.sync_permissions(id, data).await?;
        }
        self.read(data).await
    }

    async fn delete(&self, data: &mut ResourceData) -> Result<(), ProviderError> {
        let id = parse_id(data)?;
        let edit = UserEdit {
            user_status_id: Some(USER_STATUS_CANCEL_PENDING),
            ..Default::default()
        };
        crud::ignore_not_found(self.client.edit_user(id, &edit).await)?;
        info!("User {} marked for cancellation", id);
        data.clear_id();
        Ok(())
    }

    async fn exists(&self, data: &ResourceData) -> Result<bool, ProviderError> {
        let id = parse_id(data)?;
        match self.client.get_user(id).await {
            Ok(user) => Ok(user.user_status_id != Some(USER_STATUS_CANCEL_PENDING)),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
