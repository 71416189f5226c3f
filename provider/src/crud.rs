//! Helper functions for common callback patterns
//!
//! Every resource reads by ID, treats a missing object as drift, cancels
//! billing items on delete and sends only changed fields on update. These
//! helpers keep that behaviour in one place.

use crate::error::ProviderError;
use provider_schema::ResourceData;
use softlayer_client::{BillingService, SoftLayerError};
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Parse the numeric SoftLayer id stored as the resource ID
pub fn parse_id(data: &ResourceData) -> Result<u64, ProviderError> {
    let id = data.id().ok_or(ProviderError::MissingId)?;
    id.parse()
        .map_err(|_| ProviderError::InvalidId(format!("{:?} is not a numeric SoftLayer id", id)))
}

/// Fetch the remote object, clearing the ID when it no longer exists
///
/// Returns:
/// - `Ok(Some(object))` if the object exists
/// - `Ok(None)` if it was deleted outside the provider (drift); the ID is cleared
/// - `Err(e)` for any other error, which must not be mistaken for deletion
pub async fn read_or_clear<T, Fut>(
    data: &mut ResourceData,
    resource_name: &str,
    get: Fut,
) -> Result<Option<T>, ProviderError>
where
    Fut: Future<Output = Result<T, SoftLayerError>>,
{
    match get.await {
        Ok(object) => Ok(Some(object)),
        Err(e) if e.is_not_found() => {
            warn!(
                "{} {} no longer exists (drift detected), removing from state",
                resource_name,
                data.id().unwrap_or("?")
            );
            data.clear_id();
            Ok(None)
        }
        Err(e) => {
            error!("Failed to read {} {}: {}", resource_name, data.id().unwrap_or("?"), e);
            Err(e.into())
        }
    }
}

/// Map a fetch result to existence; only not-found means absent
pub async fn exists_by_id<T, Fut>(get: Fut) -> Result<bool, ProviderError>
where
    Fut: Future<Output = Result<T, SoftLayerError>>,
{
    match get.await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Treat a not-found error from a delete call as success
pub fn ignore_not_found<T>(result: Result<T, SoftLayerError>) -> Result<(), ProviderError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!("Object already gone: {}", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Keys among `keys` whose value changed since the prior state
pub fn changed_fields<'a>(data: &ResourceData, keys: &[&'a str]) -> Vec<&'a str> {
    keys.iter().copied().filter(|key| data.has_change(key)).collect()
}

/// How a billing item is cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancellation<'a> {
    /// `cancelService`: ends at the close of the billing cycle
    Service,
    /// `cancelItem` with immediate effect and a reason
    Immediate(&'a str),
}

/// Cancel a billing item
///
/// A billing item that is already cancelled, or already gone, counts as
/// cancelled. This is the single place deletes forgive those faults.
pub async fn cancel_billing_item<C>(
    client: &C,
    billing_item_id: u64,
    how: Cancellation<'_>,
) -> Result<(), ProviderError>
where
    C: BillingService + ?Sized,
{
    let result = match how {
        Cancellation::Service => client.cancel_service(billing_item_id).await,
        Cancellation::Immediate(reason) => client.cancel_item(billing_item_id, true, reason).await,
    };
    match result {
        Ok(_) => {
            info!("Cancelled billing item {}", billing_item_id);
            Ok(())
        }
        Err(e) if e.is_already_cancelled() => {
            info!("Billing item {} already cancelled: {}", billing_item_id, e);
            Ok(())
        }
        Err(e) => {
            error!("Failed to cancel billing item {}: {}", billing_item_id, e);
            Err(e.into())
        }
    }
}

/// Tags as the comma separated string `setTags` expects, sorted for stability
pub fn tags_param(data: &ResourceData) -> String {
    let mut tags = data.get_strings("tags");
    tags.sort();
    tags.dedup();
    tags.join(",")
}

/// Convert an optional configured integer to `u32`, rejecting out of range values
pub fn opt_u32(data: &ResourceData, key: &str) -> Result<Option<u32>, ProviderError> {
    data.get_i64(key)
        .map(|value| {
            u32::try_from(value).map_err(|_| ProviderError::validation(key, format!("{} is out of range", value)))
        })
        .transpose()
}

/// Convert a required configured integer to `u32`
pub fn req_u32(data: &ResourceData, key: &str) -> Result<u32, ProviderError> {
    let value = data.require_i64(key)?;
    u32::try_from(value).map_err(|_| ProviderError::validation(key, format!("{} is out of range", value)))
}

/// Configured integer ids (`ssh_key_ids`, allowed host ids) as `u64`
pub fn id_list(data: &ResourceData, key: &str) -> Result<Vec<u64>, ProviderError> {
    data.get_ints(key)
        .into_iter()
        .map(|id| u64::try_from(id).map_err(|_| ProviderError::validation(key, format!("{} is not a valid id", id))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use provider_schema::{Attribute, AttributeType, Schema};
    use serde_json::{Map, Value, json};
    use softlayer_client::MockSoftLayerClient;

    fn schema() -> Schema {
        Schema::new()
            .attribute("name", Attribute::string().optional())
            .attribute("notes", Attribute::string().optional())
            .attribute("tags", Attribute::set(AttributeType::String).optional())
            .attribute("ids", Attribute::list(AttributeType::Int).optional())
    }

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_parse_id() {
        let data = ResourceData::from_state(&schema(), "42", Map::new());
        assert_eq!(parse_id(&data).unwrap(), 42);

        let data = ResourceData::from_state(&schema(), "abc", Map::new());
        assert!(matches!(parse_id(&data), Err(ProviderError::InvalidId(_))));

        let data = ResourceData::create(&schema(), Map::new());
        assert!(matches!(parse_id(&data), Err(ProviderError::MissingId)));
    }

    #[tokio::test]
    async fn test_read_or_clear_on_not_found() {
        let mut data = ResourceData::from_state(&schema(), "7", Map::new());
        let result: Option<()> = read_or_clear(&mut data, "softlayer_test", async {
            Err(SoftLayerError::NotFound("gone".to_string()))
        })
        .await
        .unwrap();
        assert!(result.is_none());
        assert_eq!(data.id(), None);
    }

    #[tokio::test]
    async fn test_read_or_clear_keeps_id_on_other_errors() {
        let mut data = ResourceData::from_state(&schema(), "7", Map::new());
        let result: Result<Option<()>, _> = read_or_clear(&mut data, "softlayer_test", async {
            Err(SoftLayerError::Authentication("bad key".to_string()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(data.id(), Some("7"));
    }

    #[tokio::test]
    async fn test_exists_by_id() {
        assert!(exists_by_id(async { Ok::<_, SoftLayerError>(1) }).await.unwrap());
        assert!(
            !exists_by_id(async { Err::<(), _>(SoftLayerError::NotFound("x".to_string())) })
                .await
                .unwrap()
        );
        assert!(
            exists_by_id(async { Err::<(), _>(SoftLayerError::InvalidRequest("x".to_string())) })
                .await
                .is_err()
        );
    }

    #[test]
    fn test_changed_fields_and_tags() {
        let state = map(json!({"name": "a", "notes": "n", "tags": ["b", "a"]}));
        let config = map(json!({"name": "a", "notes": "m", "tags": ["a", "b", "a"]}));
        let data = ResourceData::update(&schema(), "1", state, config);

        assert_eq!(changed_fields(&data, &["name", "notes", "tags"]), vec!["notes"]);
        assert_eq!(tags_param(&data), "a,b");
    }

    #[test]
    fn test_integer_conversions() {
        let data = ResourceData::create(&schema(), map(json!({"ids": [1, 2]})));
        assert_eq!(id_list(&data, "ids").unwrap(), vec![1, 2]);

        let data = ResourceData::create(&schema(), map(json!({"ids": [-1]})));
        assert!(id_list(&data, "ids").is_err());
    }

    #[tokio::test]
    async fn test_cancel_is_forgiving_when_already_cancelled() {
        let client = MockSoftLayerClient::with_catalog();
        client.fail_next(
            "SoftLayer_Billing_Item::cancelService",
            "SoftLayer_Exception_Public",
            "A cancellation request already exists for this billing item.",
            1,
        );
        assert!(cancel_billing_item(&client, 5, Cancellation::Service).await.is_ok());

        // Unknown billing items count as already gone
        assert!(
            cancel_billing_item(&client, 999_999, Cancellation::Immediate("unused"))
                .await
                .is_ok()
        );

        client.fail_next("SoftLayer_Billing_Item::cancelItem", "SoftLayer_Exception_Public", "Access denied", 1);
        assert!(
            cancel_billing_item(&client, 5, Cancellation::Immediate("unused"))
                .await
                .is_err()
        );
    }
}
