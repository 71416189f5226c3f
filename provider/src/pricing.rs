//! Product and price matching
//!
//! Ordered resources (VLANs, storage volumes, NetScaler VPX) are bought by
//! listing price ids in a `SoftLayer_Product_Order` container. The price ids
//! come from a product package: find the package by key name, list its items,
//! then pick one price per line item by key name, category code, item capacity
//! and the price's capacity restriction window.
//!
//! Only standard prices are considered. Prices carrying a `locationGroupId`
//! are regional overrides and are rejected by `placeOrder` unless the order
//! location belongs to that group.

use crate::error::ProviderError;
use softlayer_client::{IdRef, OrderContainer, ProductItem, ProductPackage, ProductService};
use tracing::debug;

/// Capacities are compared with this tolerance (tiers like 0.25 IOPS/GB)
const CAPACITY_EPSILON: f64 = 1e-6;

/// What a line item must look like
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuery<'a> {
    /// Category code the price is listed under
    pub category: &'a str,
    /// Exact item key name, when known
    pub key_name: Option<&'a str>,
    /// Item capacity (GB, IOPS, IP count, IOPS per GB)
    pub capacity: Option<f64>,
    /// Capacity restriction type and the value that must fall in its window
    pub restriction: Option<(&'a str, f64)>,
}

impl<'a> PriceQuery<'a> {
    pub fn category(category: &'a str) -> Self {
        Self {
            category,
            key_name: None,
            capacity: None,
            restriction: None,
        }
    }

    pub fn key_name(mut self, key_name: &'a str) -> Self {
        self.key_name = Some(key_name);
        self
    }

    pub fn capacity(mut self, capacity: f64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Require a price whose `restriction_type` window contains `value`
    pub fn restricted(mut self, restriction_type: &'a str, value: f64) -> Self {
        self.restriction = Some((restriction_type, value));
        self
    }

    fn matches_item(&self, item: &ProductItem) -> bool {
        if self.key_name.is_some_and(|key| key != item.key_name) {
            return false;
        }
        if let Some(wanted) = self.capacity {
            match item.capacity {
                Some(capacity) if (capacity - wanted).abs() < CAPACITY_EPSILON => {}
                _ => return false,
            }
        }
        true
    }
}

/// Pick the first standard price matching `query`
pub fn select_price(items: &[ProductItem], query: &PriceQuery<'_>) -> Result<IdRef, ProviderError> {
    let found = items
        .iter()
        .filter(|item| query.matches_item(item))
        .flat_map(|item| item.prices.iter().map(move |price| (item, price)))
        .find(|(_, price)| {
            if price.location_group_id.is_some() || !price.has_category(query.category) {
                return false;
            }
            match query.restriction {
                None => true,
                Some((kind, value)) => {
                    price.capacity_restriction_type.as_deref() == Some(kind)
                        && price.capacity_restriction_minimum.is_some_and(|min| min <= value)
                        && price.capacity_restriction_maximum.is_some_and(|max| value <= max)
                }
            }
        });

    match found {
        Some((item, price)) => {
            debug!("Selected price {} ({}) for {}", price.id, item.key_name, query.category);
            Ok(IdRef { id: price.id })
        }
        None => Err(ProviderError::NoMatchingPrice(describe(query))),
    }
}

fn describe(query: &PriceQuery<'_>) -> String {
    let mut parts = vec![format!("category {}", query.category)];
    if let Some(key) = query.key_name {
        parts.push(format!("item {}", key));
    }
    if let Some(capacity) = query.capacity {
        parts.push(format!("capacity {}", capacity));
    }
    if let Some((kind, value)) = query.restriction {
        parts.push(format!("{} {}", kind, value));
    }
    parts.join(", ")
}

/// Find a package by key name and list its items
pub async fn package_items<C>(client: &C, key_name: &str) -> Result<(ProductPackage, Vec<ProductItem>), ProviderError>
where
    C: ProductService + ?Sized,
{
    let package = client
        .find_package(key_name)
        .await?
        .ok_or_else(|| ProviderError::PackageNotFound(key_name.to_string()))?;
    let items = client.get_package_items(package.id).await?;
    debug!("Package {} ({}) has {} items", key_name, package.id, items.len());
    Ok((package, items))
}

/// Resolve a datacenter short name (`dal06`) to its location id
pub async fn datacenter_id<C>(client: &C, name: &str) -> Result<u64, ProviderError>
where
    C: ProductService + ?Sized,
{
    let datacenter = client
        .find_datacenter(name)
        .await?
        .ok_or_else(|| ProviderError::validation("datacenter", format!("no datacenter named {}", name)))?;
    datacenter
        .id
        .ok_or_else(|| ProviderError::UnexpectedResponse(format!("datacenter {} has no id", name)))
}

/// Order container for a single item placed in one location
pub fn order_container(
    complex_type: &str,
    package_id: u64,
    location_id: u64,
    prices: Vec<IdRef>,
) -> OrderContainer {
    OrderContainer {
        complex_type: complex_type.to_string(),
        package_id,
        location: location_id.to_string(),
        quantity: 1,
        prices,
        extra: serde_json::Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use softlayer_client::mock::{MOCK_DATACENTER, MOCK_DATACENTER_ID, STORAGE_PACKAGE_ID};
    use softlayer_client::{ItemCategory, ItemPrice, MockSoftLayerClient};

    fn price(id: u64, location_group_id: Option<u64>, restriction: Option<(&str, f64, f64)>) -> ItemPrice {
        ItemPrice {
            id,
            location_group_id,
            categories: vec![ItemCategory {
                category_code: "performance_storage_space".to_string(),
            }],
            capacity_restriction_type: restriction.map(|(kind, _, _)| kind.to_string()),
            capacity_restriction_minimum: restriction.map(|(_, min, _)| min),
            capacity_restriction_maximum: restriction.map(|(_, _, max)| max),
            ..Default::default()
        }
    }

    fn space_item() -> ProductItem {
        ProductItem {
            id: 1,
            key_name: "20_GB_STORAGE_SPACE".to_string(),
            capacity: Some(20.0),
            prices: vec![
                price(1, Some(503), Some(("STORAGE_TIER_LEVEL", 100.0, 1000.0))),
                price(2, None, Some(("STORAGE_TIER_LEVEL", 100.0, 300.0))),
                price(3, None, Some(("STORAGE_TIER_LEVEL", 1000.0, 1000.0))),
                price(4, None, Some(("IOPS", 100.0, 6000.0))),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_selects_standard_price_in_window() {
        let items = vec![space_item()];
        let query = PriceQuery::category("performance_storage_space").capacity(20.0);

        assert_eq!(select_price(&items, &query.restricted("STORAGE_TIER_LEVEL", 200.0)).unwrap().id, 2);
        assert_eq!(select_price(&items, &query.restricted("STORAGE_TIER_LEVEL", 1000.0)).unwrap().id, 3);
        assert_eq!(select_price(&items, &query.restricted("IOPS", 1000.0)).unwrap().id, 4);
    }

    #[test]
    fn test_location_group_prices_are_never_selected() {
        let mut item = space_item();
        item.prices.truncate(1);
        let query = PriceQuery::category("performance_storage_space").restricted("STORAGE_TIER_LEVEL", 200.0);
        assert!(matches!(
            select_price(&[item], &query),
            Err(ProviderError::NoMatchingPrice(_))
        ));
    }

    #[test]
    fn test_capacity_and_key_name_must_match() {
        let items = vec![space_item()];
        let wrong_size = PriceQuery::category("performance_storage_space").capacity(40.0);
        let err = select_price(&items, &wrong_size).unwrap_err();
        assert!(err.to_string().contains("capacity 40"));

        let wrong_key = PriceQuery::category("performance_storage_space").key_name("40_GB_STORAGE_SPACE");
        assert!(select_price(&items, &wrong_key).is_err());

        let right_key = PriceQuery::category("performance_storage_space").key_name("20_GB_STORAGE_SPACE");
        assert_eq!(select_price(&items, &right_key).unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_package_and_datacenter_lookup() {
        let client = MockSoftLayerClient::with_catalog();
        let (package, items) = package_items(&client, "STORAGE_AS_A_SERVICE").await.unwrap();
        assert_eq!(package.id, STORAGE_PACKAGE_ID);
        assert!(!items.is_empty());

        let tier = select_price(&items, &PriceQuery::category("storage_tier_level").capacity(0.25));
        assert!(tier.is_ok());

        assert!(matches!(
            package_items(&client, "NO_SUCH_PACKAGE").await,
            Err(ProviderError::PackageNotFound(_))
        ));
        assert_eq!(datacenter_id(&client, MOCK_DATACENTER).await.unwrap(), MOCK_DATACENTER_ID);
        assert!(matches!(
            datacenter_id(&client, "nowhere01").await,
            Err(ProviderError::Validation { .. })
        ));
    }

    #[test]
    fn test_order_container_uses_location_id() {
        let order = order_container("SoftLayer_Container_Product_Order_Network_Vlan", 571, 154820, vec![IdRef { id: 9 }]);
        assert_eq!(order.location, "154820");
        assert_eq!(order.quantity, 1);
        assert!(order.extra.is_empty());
    }
}
