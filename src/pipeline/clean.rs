use super::load::Tables;
use crate::model::{Aisle, Department, LineItem, Order, Product};
use ahash::{AHashMap, AHashSet, RandomState};
use dashmap::DashMap;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use std::hash::Hash;
use tracing::warn;

/// Name substituted for a missing product name.
pub const UNKNOWN_PRODUCT_NAME: &str = "Unknown";
/// Sentinel substituted for a missing aisle or department id.
pub const MISSING_ID_SENTINEL: i32 = -1;
/// The aisle/department slot where null-name products are expected to live.
pub const UNKNOWN_NAME_AISLE_ID: i32 = 100;
pub const UNKNOWN_NAME_DEPARTMENT_ID: i32 = 21;
/// Cart positions are only recorded up to this many items; a missing cart
/// position on a smaller order is a data-quality exception.
pub const CART_POSITION_LIMIT: usize = 64;

/// Cleaned derivatives of the raw tables. The raw `Tables` are left intact so
/// before/after row counts can be compared.
#[derive(Debug, Clone)]
pub struct CleanedTables {
    pub orders: Vec<Order>,
    pub line_items: Vec<LineItem>,
    pub products: Vec<Product>,
    pub aisles: Vec<Aisle>,
    pub departments: Vec<Department>,
}

/// Duplicate counts for one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableReport {
    pub rows_in: usize,
    pub full_duplicates: usize,
    pub key_duplicates: usize,
    pub rows_out: usize,
}

/// Every anomaly the cleaner finds. Findings are counted, never fatal, and
/// apart from the documented fill policies nothing is auto-corrected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub orders: TableReport,
    pub line_items: TableReport,
    pub products: TableReport,
    pub aisles: TableReport,
    pub departments: TableReport,

    /// Rows participating in a case-insensitive product-name collision,
    /// counted over non-missing names only. Informational; never a drop.
    pub product_name_ci_duplicates: usize,
    pub missing_product_names: usize,
    /// Null-name products outside the expected aisle 100 / department 21 slot.
    pub missing_name_slot_exceptions: usize,
    pub missing_aisle_ids: usize,
    pub missing_department_ids: usize,

    pub dow_out_of_range: usize,
    pub hour_out_of_range: usize,
    pub missing_days_since_prior: usize,
    /// Null days_since_prior_order on an order that is not the customer's
    /// first. Surfaced as a warning, never auto-fixed.
    pub days_since_prior_null_on_repeat: usize,

    pub missing_cart_positions: usize,
    /// Orders with a missing cart position but at most CART_POSITION_LIMIT
    /// items. Expected to be zero.
    pub short_orders_with_missing_cart_position: usize,
}

pub fn clean_tables(tables: &Tables) -> (CleanedTables, CleanReport) {
    let mut report = CleanReport::default();

    let orders = clean_table(&tables.orders, |order| order.order_id, &mut report.orders);
    let line_items = clean_table(
        &tables.line_items,
        |item| (item.order_id, item.product_id),
        &mut report.line_items,
    );
    let products = clean_table(&tables.products, |product| product.product_id, &mut report.products);
    let aisles = clean_table(&tables.aisles, |aisle| aisle.aisle_id, &mut report.aisles);
    let departments = clean_table(
        &tables.departments,
        |department| department.department_id,
        &mut report.departments,
    );

    report.product_name_ci_duplicates = count_ci_name_duplicates(&products);
    let products = fill_product_sentinels(products, &mut report);

    check_orders(&orders, &mut report);
    check_line_items(&line_items, &mut report);

    (
        CleanedTables {
            orders,
            line_items,
            products,
            aisles,
            departments,
        },
        report,
    )
}

/// Full-row dedupe followed by primary-key dedupe, first occurrence kept for
/// both, input order preserved.
fn clean_table<T, K>(rows: &[T], key_of: impl Fn(&T) -> K, report: &mut TableReport) -> Vec<T>
where
    T: Clone + Eq + Hash + Sync,
    K: Eq + Hash,
{
    report.rows_in = rows.len();
    let (rows, full_duplicates) = drop_full_duplicates(rows);
    report.full_duplicates = full_duplicates;
    let (rows, key_duplicates) = drop_key_duplicates(rows, key_of);
    report.key_duplicates = key_duplicates;
    report.rows_out = rows.len();
    rows
}

/// Drops rows that are identical across all columns, keeping the first
/// occurrence. Rows are hashed in parallel into buckets, then each bucket is
/// resolved by real equality so hash collisions can never drop a distinct row.
fn drop_full_duplicates<T>(rows: &[T]) -> (Vec<T>, usize)
where
    T: Clone + Eq + Hash + Sync,
{
    let hasher = RandomState::new();
    let buckets: DashMap<u64, Vec<usize>, RandomState> = DashMap::with_hasher(RandomState::new());

    rows.par_iter().enumerate().for_each(|(index, row)| {
        let digest = hasher.hash_one(row);
        buckets.entry(digest).or_default().push(index);
    });

    let mut drop_indices: AHashSet<usize> = AHashSet::new();
    for entry in buckets.iter() {
        let bucket = entry.value();
        if bucket.len() < 2 {
            continue;
        }
        let mut ordered = bucket.clone();
        ordered.sort_unstable();
        let mut firsts: Vec<usize> = Vec::new();
        for index in ordered {
            if firsts.iter().any(|&first| rows[first] == rows[index]) {
                drop_indices.insert(index);
            } else {
                firsts.push(index);
            }
        }
    }

    let kept = rows
        .iter()
        .enumerate()
        .filter(|(index, _)| !drop_indices.contains(index))
        .map(|(_, row)| row.clone())
        .collect();
    (kept, drop_indices.len())
}

/// Drops rows whose primary key was already seen, keeping the first.
fn drop_key_duplicates<T, K>(rows: Vec<T>, key_of: impl Fn(&T) -> K) -> (Vec<T>, usize)
where
    K: Eq + Hash,
{
    let mut seen: AHashSet<K> = AHashSet::with_capacity(rows.len());
    let mut kept = Vec::with_capacity(rows.len());
    let mut dropped = 0usize;
    for row in rows {
        if seen.insert(key_of(&row)) {
            kept.push(row);
        } else {
            dropped += 1;
        }
    }
    (kept, dropped)
}

/// Counts rows whose lower-cased product name collides with another row's.
/// Missing names are skipped; they are a separate finding.
fn count_ci_name_duplicates(products: &[Product]) -> usize {
    let mut groups: AHashMap<String, usize> = AHashMap::new();
    for product in products {
        if let Some(name) = &product.product_name {
            *groups.entry(name.to_lowercase()).or_insert(0) += 1;
        }
    }
    groups.values().filter(|&&count| count > 1).sum()
}

fn fill_product_sentinels(products: Vec<Product>, report: &mut CleanReport) -> Vec<Product> {
    products
        .into_iter()
        .map(|mut product| {
            if product.product_name.is_none() {
                report.missing_product_names += 1;
                // Diagnostic only: null names are expected to sit in the
                // "missing" aisle/department slot.
                let in_expected_slot = product.aisle_id == Some(UNKNOWN_NAME_AISLE_ID)
                    && product.department_id == Some(UNKNOWN_NAME_DEPARTMENT_ID);
                if !in_expected_slot {
                    report.missing_name_slot_exceptions += 1;
                    warn!(
                        "product {} has a null name outside aisle {}/department {}",
                        product.product_id, UNKNOWN_NAME_AISLE_ID, UNKNOWN_NAME_DEPARTMENT_ID
                    );
                }
                product.product_name = Some(UNKNOWN_PRODUCT_NAME.to_string());
            }
            if product.aisle_id.is_none() {
                report.missing_aisle_ids += 1;
                product.aisle_id = Some(MISSING_ID_SENTINEL);
            }
            if product.department_id.is_none() {
                report.missing_department_ids += 1;
                product.department_id = Some(MISSING_ID_SENTINEL);
            }
            product
        })
        .collect()
}

/// Range and nullness checks on orders. Violations are counted and passed
/// through unchanged; downstream aggregates must not assume the ranges hold.
fn check_orders(orders: &[Order], report: &mut CleanReport) {
    for order in orders {
        if !(0..=6).contains(&order.order_dow) {
            report.dow_out_of_range += 1;
        }
        if !(0..=23).contains(&order.order_hour_of_day) {
            report.hour_out_of_range += 1;
        }
        if order.days_since_prior_order.is_none() {
            report.missing_days_since_prior += 1;
            if order.order_number != 1 {
                report.days_since_prior_null_on_repeat += 1;
                warn!(
                    "order {} has null days_since_prior_order but order_number {}",
                    order.order_id, order.order_number
                );
            }
        }
    }
}

fn check_line_items(line_items: &[LineItem], report: &mut CleanReport) {
    let mut order_sizes: AHashMap<u32, usize> = AHashMap::new();
    for item in line_items {
        *order_sizes.entry(item.order_id).or_insert(0) += 1;
    }

    let mut orders_with_missing: AHashSet<u32> = AHashSet::new();
    for item in line_items {
        if item.add_to_cart_order.is_none() {
            report.missing_cart_positions += 1;
            orders_with_missing.insert(item.order_id);
        }
    }

    for order_id in orders_with_missing {
        if order_sizes[&order_id] <= CART_POSITION_LIMIT {
            report.short_orders_with_missing_cart_position += 1;
            warn!(
                "order {} has a missing cart position but only {} items",
                order_id, order_sizes[&order_id]
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(order_id: u32, user_id: u32, order_number: u32, dow: i16, hour: i16, days: Option<u32>) -> Order {
        Order {
            order_id,
            user_id,
            order_number,
            order_dow: dow,
            order_hour_of_day: hour,
            days_since_prior_order: days,
        }
    }

    fn product(product_id: u32, name: Option<&str>, aisle_id: Option<i32>, department_id: Option<i32>) -> Product {
        Product {
            product_id,
            product_name: name.map(str::to_string),
            aisle_id,
            department_id,
        }
    }

    fn item(order_id: u32, product_id: u32, cart: Option<u32>, reordered: u8) -> LineItem {
        LineItem {
            order_id,
            product_id,
            add_to_cart_order: cart,
            reordered,
        }
    }

    fn tables_with_orders(orders: Vec<Order>) -> Tables {
        Tables {
            orders,
            line_items: vec![],
            products: vec![],
            aisles: vec![],
            departments: vec![],
        }
    }

    #[test]
    fn test_full_duplicates_dropped_first_kept() {
        let rows = vec![
            order(1, 7, 1, 3, 2, None),
            order(2, 7, 2, 3, 2, Some(5)),
            order(1, 7, 1, 3, 2, None),
            order(1, 7, 1, 3, 2, None),
        ];
        let (kept, dropped) = drop_full_duplicates(&rows);
        assert_eq!(dropped, 2);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].order_id, 1);
        assert_eq!(kept[1].order_id, 2);
    }

    #[test]
    fn test_key_duplicates_keep_first_occurrence() {
        let rows = vec![
            order(1, 7, 1, 3, 2, None),
            order(1, 8, 4, 5, 9, Some(3)),
            order(2, 7, 2, 3, 2, Some(5)),
        ];
        let (kept, dropped) = drop_key_duplicates(rows, |o| o.order_id);
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 2);
        // the first row for order_id 1 survives
        assert_eq!(kept[0].user_id, 7);
    }

    #[test]
    fn test_line_item_pair_key() {
        let tables = Tables {
            orders: vec![],
            line_items: vec![
                item(1, 10, Some(1), 0),
                item(1, 10, Some(2), 0),
                item(1, 20, Some(3), 1),
            ],
            products: vec![],
            aisles: vec![],
            departments: vec![],
        };
        let (cleaned, report) = clean_tables(&tables);
        assert_eq!(report.line_items.key_duplicates, 1);
        assert_eq!(cleaned.line_items.len(), 2);
    }

    #[test]
    fn test_ci_name_duplicates_counted_not_dropped() {
        let products = vec![
            product(1, Some("Organic Milk"), Some(1), Some(2)),
            product(2, Some("organic milk"), Some(1), Some(2)),
            product(3, Some("Bananas"), Some(1), Some(2)),
            product(4, None, Some(100), Some(21)),
        ];
        assert_eq!(count_ci_name_duplicates(&products), 2);

        let tables = Tables {
            orders: vec![],
            line_items: vec![],
            products,
            aisles: vec![],
            departments: vec![],
        };
        let (cleaned, report) = clean_tables(&tables);
        assert_eq!(report.product_name_ci_duplicates, 2);
        // both spellings still present
        assert_eq!(cleaned.products.len(), 4);
    }

    #[test]
    fn test_missing_name_filled_with_unknown() {
        let tables = Tables {
            orders: vec![],
            line_items: vec![],
            products: vec![
                product(1, None, Some(100), Some(21)),
                product(2, None, Some(3), Some(21)),
                product(3, Some("Bread"), None, None),
            ],
            aisles: vec![],
            departments: vec![],
        };
        let (cleaned, report) = clean_tables(&tables);

        assert_eq!(report.missing_product_names, 2);
        // product 2 sits outside the aisle 100 / department 21 slot
        assert_eq!(report.missing_name_slot_exceptions, 1);
        assert_eq!(report.missing_aisle_ids, 1);
        assert_eq!(report.missing_department_ids, 1);

        assert_eq!(cleaned.products[0].product_name.as_deref(), Some("Unknown"));
        assert_eq!(cleaned.products[1].product_name.as_deref(), Some("Unknown"));
        assert_eq!(cleaned.products[2].aisle_id, Some(MISSING_ID_SENTINEL));
        assert_eq!(cleaned.products[2].department_id, Some(MISSING_ID_SENTINEL));
    }

    #[test]
    fn test_out_of_range_values_reported_not_clamped() {
        let tables = tables_with_orders(vec![
            order(1, 7, 1, 3, 2, None),
            order(2, 7, 2, 9, 26, Some(5)),
        ]);
        let (cleaned, report) = clean_tables(&tables);
        assert_eq!(report.dow_out_of_range, 1);
        assert_eq!(report.hour_out_of_range, 1);
        // values pass through unchanged
        assert_eq!(cleaned.orders[1].order_dow, 9);
        assert_eq!(cleaned.orders[1].order_hour_of_day, 26);
    }

    #[test]
    fn test_null_days_since_prior_on_repeat_order_warned() {
        let tables = tables_with_orders(vec![
            order(1, 7, 1, 3, 2, None),
            order(2, 7, 4, 3, 2, None),
        ]);
        let (cleaned, report) = clean_tables(&tables);
        assert_eq!(report.missing_days_since_prior, 2);
        assert_eq!(report.days_since_prior_null_on_repeat, 1);
        // never auto-fixed
        assert_eq!(cleaned.orders[1].days_since_prior_order, None);
    }

    #[test]
    fn test_missing_cart_position_threshold_diagnostic() {
        // order 1 has 2 items, one missing its cart position -> exception;
        // order 2 has 65 items with one missing -> structurally expected.
        let mut line_items = vec![item(1, 10, Some(1), 0), item(1, 11, None, 0)];
        for product_id in 0..64 {
            line_items.push(item(2, 100 + product_id, Some(product_id + 1), 0));
        }
        line_items.push(item(2, 999, None, 0));

        let tables = Tables {
            orders: vec![],
            line_items,
            products: vec![],
            aisles: vec![],
            departments: vec![],
        };
        let (cleaned, report) = clean_tables(&tables);
        assert_eq!(report.missing_cart_positions, 2);
        assert_eq!(report.short_orders_with_missing_cart_position, 1);
        // nulls retained
        assert!(cleaned.line_items.iter().any(|i| i.add_to_cart_order.is_none()));
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let tables = Tables {
            orders: vec![
                order(1, 7, 1, 3, 2, None),
                order(1, 7, 1, 3, 2, None),
                order(2, 7, 2, 3, 2, Some(5)),
            ],
            line_items: vec![item(1, 10, Some(1), 0), item(1, 10, Some(1), 0)],
            products: vec![product(1, None, Some(100), Some(21))],
            aisles: vec![Aisle { aisle_id: 100, aisle: "missing".into() }],
            departments: vec![Department { department_id: 21, department: "missing".into() }],
        };
        let (first, first_report) = clean_tables(&tables);
        assert!(first_report.orders.full_duplicates > 0);

        let again = Tables {
            orders: first.orders.clone(),
            line_items: first.line_items.clone(),
            products: first.products.clone(),
            aisles: first.aisles.clone(),
            departments: first.departments.clone(),
        };
        let (second, second_report) = clean_tables(&again);

        for table in [
            &second_report.orders,
            &second_report.line_items,
            &second_report.products,
            &second_report.aisles,
            &second_report.departments,
        ] {
            assert_eq!(table.full_duplicates, 0);
            assert_eq!(table.key_duplicates, 0);
        }
        assert_eq!(second_report.missing_product_names, 0);
        assert_eq!(second.orders, first.orders);
        assert_eq!(second.products, first.products);
    }
}
