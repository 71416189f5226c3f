//! Catalog fixtures and object builders for MockSoftLayerClient

use super::MockSoftLayerClient;
use crate::common::filter_operation;
use crate::models::*;
use serde_json::Value;

/// Datacenter seeded by [`MockSoftLayerClient::with_catalog`]
pub const MOCK_DATACENTER: &str = "dal06";
/// Id of [`MOCK_DATACENTER`]
pub const MOCK_DATACENTER_ID: u64 = 154820;
/// `ADDITIONAL_SERVICES_NETWORK_VLAN` package id
pub const VLAN_PACKAGE_ID: u64 = 571;
/// `STORAGE_AS_A_SERVICE` package id
pub const STORAGE_PACKAGE_ID: u64 = 759;
/// `NETSCALER_VPX` package id
pub const VPX_PACKAGE_ID: u64 = 192;

const STORAGE_SIZES: &[u32] = &[20, 40, 80, 100, 250, 500, 1000, 2000, 4000, 12000];
const SNAPSHOT_SIZES: &[u32] = &[5, 10, 20, 40, 80, 100, 250, 500, 1000];
const IOPS_LEVELS: &[u32] = &[100, 500, 1000, 2000, 4000, 6000];

/// Hands out price ids while the catalog is built
struct PriceIds(u64);

impl PriceIds {
    fn next(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }
}

pub(crate) fn item(id: u64, key_name: &str, category: &str, capacity: Option<f64>, prices: Vec<ItemPrice>) -> ProductItem {
    ProductItem {
        id,
        key_name: key_name.to_string(),
        description: Some(key_name.replace('_', " ").to_lowercase()),
        capacity,
        units: None,
        item_category: Some(ItemCategory {
            category_code: category.to_string(),
        }),
        prices,
    }
}

pub(crate) fn price(id: u64, category: &str, restriction: Option<(&str, f64, f64)>) -> ItemPrice {
    ItemPrice {
        id,
        location_group_id: None,
        categories: vec![ItemCategory {
            category_code: category.to_string(),
        }],
        capacity_restriction_type: restriction.map(|(kind, _, _)| kind.to_string()),
        capacity_restriction_minimum: restriction.map(|(_, min, _)| min),
        capacity_restriction_maximum: restriction.map(|(_, _, max)| max),
        hourly_recurring_fee: Some("0".to_string()),
        recurring_fee: Some("0".to_string()),
    }
}

fn vlan_items(ids: &mut PriceIds) -> Vec<ProductItem> {
    let mut items = vec![
        item(1, "PUBLIC_NETWORK_VLAN", "network_vlan", None, vec![price(ids.next(), "network_vlan", None)]),
        item(2, "PRIVATE_NETWORK_VLAN", "network_vlan", None, vec![price(ids.next(), "network_vlan", None)]),
    ];
    for (n, size) in [8u32, 16, 32, 64].iter().enumerate() {
        items.push(item(
            10 + n as u64,
            &format!("{}_STATIC_PUBLIC_IP_ADDRESSES", size),
            "sov_sec_ip_addresses_pub",
            Some(f64::from(*size)),
            vec![price(ids.next(), "sov_sec_ip_addresses_pub", None)],
        ));
        items.push(item(
            20 + n as u64,
            &format!("{}_PORTABLE_PRIVATE_IP_ADDRESSES", size),
            "sov_sec_ip_addresses_priv",
            Some(f64::from(*size)),
            vec![price(ids.next(), "sov_sec_ip_addresses_priv", None)],
        ));
    }
    items
}

fn storage_items(ids: &mut PriceIds) -> Vec<ProductItem> {
    let mut items = vec![
        item(100, "STORAGE_AS_A_SERVICE", "storage_as_a_service", None, vec![price(ids.next(), "storage_as_a_service", None)]),
        item(101, "FILE_STORAGE_2", "storage_file", None, vec![price(ids.next(), "storage_file", None)]),
        item(102, "BLOCK_STORAGE_2", "storage_block", None, vec![price(ids.next(), "storage_block", None)]),
        item(110, "LOW_INTENSITY_TIER", "storage_tier_level", Some(0.25), vec![price(ids.next(), "storage_tier_level", None)]),
        item(111, "READHEAVY_TIER", "storage_tier_level", Some(2.0), vec![price(ids.next(), "storage_tier_level", None)]),
        item(112, "WRITEHEAVY_TIER", "storage_tier_level", Some(4.0), vec![price(ids.next(), "storage_tier_level", None)]),
        item(113, "10_IOPS_PER_GB", "storage_tier_level", Some(10.0), vec![price(ids.next(), "storage_tier_level", None)]),
    ];

    for (n, size) in STORAGE_SIZES.iter().enumerate() {
        let mut location_price = price(ids.next(), "performance_storage_space", Some(("STORAGE_TIER_LEVEL", 100.0, 1000.0)));
        location_price.location_group_id = Some(503);
        items.push(item(
            200 + n as u64,
            &format!("{}_GB_STORAGE_SPACE", size),
            "performance_storage_space",
            Some(f64::from(*size)),
            vec![
                location_price,
                price(ids.next(), "performance_storage_space", Some(("STORAGE_TIER_LEVEL", 100.0, 300.0))),
                price(ids.next(), "performance_storage_space", Some(("STORAGE_TIER_LEVEL", 1000.0, 1000.0))),
                price(ids.next(), "performance_storage_space", Some(("IOPS", 100.0, 6000.0))),
            ],
        ));
    }

    for (n, iops) in IOPS_LEVELS.iter().enumerate() {
        let min_size = if *iops >= 2000 { 100.0 } else { 20.0 };
        items.push(item(
            300 + n as u64,
            &format!("{}_IOPS", iops),
            "performance_storage_iops",
            Some(f64::from(*iops)),
            vec![price(ids.next(), "performance_storage_iops", Some(("STORAGE_SPACE", min_size, 12000.0)))],
        ));
    }

    for (n, size) in SNAPSHOT_SIZES.iter().enumerate() {
        items.push(item(
            400 + n as u64,
            &format!("{}_GB_STORAGE_SPACE", size),
            "storage_snapshot_space",
            Some(f64::from(*size)),
            vec![price(ids.next(), "storage_snapshot_space", Some(("STORAGE_TIER_LEVEL", 100.0, 1000.0)))],
        ));
    }

    items
}

fn vpx_items(ids: &mut PriceIds) -> Vec<ProductItem> {
    let mut items = Vec::new();
    let mut item_id = 500;
    for version in ["10.1", "10.5"] {
        for speed in [10u32, 200, 1000] {
            for plan in ["STANDARD", "PLATINUM"] {
                item_id += 1;
                items.push(item(
                    item_id,
                    &format!("CITRIX_NETSCALER_VPX_{}_{}MBPS_{}", version.replace('.', "_"), speed, plan),
                    "application_delivery_controller",
                    None,
                    vec![price(ids.next(), "application_delivery_controller", None)],
                ));
            }
        }
    }
    for count in [2u32, 4, 8, 16] {
        item_id += 1;
        items.push(item(
            item_id,
            &format!("{}_PUBLIC_IP_ADDRESSES", count),
            "sov_sec_ip_addresses_pub",
            Some(f64::from(count)),
            vec![price(ids.next(), "sov_sec_ip_addresses_pub", None)],
        ));
    }
    items
}

/// Seed the datacenter and the VLAN, storage and VPX packages
pub(crate) fn seed_catalog(client: &MockSoftLayerClient) {
    let mut ids = PriceIds(10_000);

    client.add_datacenter(Datacenter {
        id: Some(MOCK_DATACENTER_ID),
        name: MOCK_DATACENTER.to_string(),
        long_name: Some("Dallas 6".to_string()),
    });
    client.add_package(
        ProductPackage {
            id: VLAN_PACKAGE_ID,
            key_name: "ADDITIONAL_SERVICES_NETWORK_VLAN".to_string(),
            name: Some("Network VLAN".to_string()),
        },
        vlan_items(&mut ids),
    );
    client.add_package(
        ProductPackage {
            id: STORAGE_PACKAGE_ID,
            key_name: "STORAGE_AS_A_SERVICE".to_string(),
            name: Some("Storage As A Service (StaaS)".to_string()),
        },
        storage_items(&mut ids),
    );
    client.add_package(
        ProductPackage {
            id: VPX_PACKAGE_ID,
            key_name: "NETSCALER_VPX".to_string(),
            name: Some("Citrix NetScaler VPX".to_string()),
        },
        vpx_items(&mut ids),
    );
}

/// Order id an account listing filter asks for, rooted at `root`
pub(crate) fn filtered_order_id(filter: &Value, root: &str) -> Option<u64> {
    filter_operation(filter, &format!("{}.billingItem.orderItem.order.id", root)).and_then(Value::as_u64)
}

/// Billing item pointing back at the order that created an object
pub(crate) fn billing_item(id: u64, order_id: Option<u64>) -> BillingItemRef {
    BillingItemRef {
        id,
        cancellation_date: None,
        order_item: order_id.map(|id| OrderItemRef {
            order: Some(OrderRef { id }),
        }),
    }
}

/// Deterministic address in a /16 derived from an object id
pub(crate) fn address(prefix: &str, id: u64) -> String {
    format!("{}.{}.{}", prefix, (id / 256) % 256, id % 256)
}
