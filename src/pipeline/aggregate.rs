use crate::model::{LineItem, Order, Product};
use ahash::AHashMap;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// One row of a product ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedProduct {
    pub product_id: u32,
    pub product_name: String,
    pub count: u64,
}

/// A top-N product ranking, descending by count with ties broken by ascending
/// product_id so output is reproducible. Line items whose product_id has no
/// catalog entry are excluded and counted in `unmatched_line_items`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductRanking {
    pub rows: Vec<RankedProduct>,
    pub unmatched_line_items: usize,
}

/// Reorder share for one product.
#[derive(Debug, Clone, PartialEq)]
pub struct ReorderShare {
    pub product_name: String,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductReorderShares {
    pub by_product: BTreeMap<u32, ReorderShare>,
    pub unmatched_line_items: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomerReorderShares {
    pub by_customer: BTreeMap<u32, f64>,
    /// Line items whose order_id is absent from the orders table.
    pub unmatched_line_items: usize,
}

/// Basket-size histogram plus descriptive statistics over the sizes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderSizeDistribution {
    pub by_size: BTreeMap<usize, u64>,
    pub stats: DescriptiveStats,
}

/// Standard descriptive statistics (mean, sample standard deviation and
/// linearly interpolated quartiles).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Orders per hour of day. The 24 in-range buckets are always present, even
/// at zero; out-of-range hours (a reported data-quality finding) show up as
/// extra keys rather than being silently folded in.
pub fn orders_by_hour(orders: &[Order]) -> BTreeMap<i16, u64> {
    let mut counts: BTreeMap<i16, u64> = (0..24).map(|hour| (hour, 0)).collect();
    for order in orders {
        *counts.entry(order.order_hour_of_day).or_insert(0) += 1;
    }
    counts
}

/// Orders per day of week, all 7 in-range buckets present.
pub fn orders_by_dow(orders: &[Order]) -> BTreeMap<i16, u64> {
    let mut counts: BTreeMap<i16, u64> = (0..7).map(|dow| (dow, 0)).collect();
    for order in orders {
        *counts.entry(order.order_dow).or_insert(0) += 1;
    }
    counts
}

/// Hourly distribution restricted to one day of week, for comparing shopping
/// curves (e.g. Wednesday against Saturday).
pub fn orders_by_hour_for_dow(orders: &[Order], dow: i16) -> BTreeMap<i16, u64> {
    let mut counts: BTreeMap<i16, u64> = (0..24).map(|hour| (hour, 0)).collect();
    for order in orders.iter().filter(|order| order.order_dow == dow) {
        *counts.entry(order.order_hour_of_day).or_insert(0) += 1;
    }
    counts
}

/// Distribution of the gap in days between consecutive orders, nulls
/// (first orders) excluded.
pub fn days_since_prior_distribution(orders: &[Order]) -> BTreeMap<u32, u64> {
    let mut counts = BTreeMap::new();
    for days in orders.iter().filter_map(|order| order.days_since_prior_order) {
        *counts.entry(days).or_insert(0) += 1;
    }
    counts
}

/// Number of orders each customer has placed, taken as max(order_number).
pub fn orders_per_customer(orders: &[Order]) -> BTreeMap<u32, u32> {
    let mut counts: BTreeMap<u32, u32> = BTreeMap::new();
    for order in orders {
        let entry = counts.entry(order.user_id).or_insert(0);
        *entry = (*entry).max(order.order_number);
    }
    counts
}

/// The n most ordered products.
pub fn top_products_by_order_count(
    line_items: &[LineItem],
    products: &[Product],
    n: usize,
) -> ProductRanking {
    rank_products(line_items.iter(), products, n)
}

/// The n most reordered products (reordered line items only).
pub fn top_reordered_products(
    line_items: &[LineItem],
    products: &[Product],
    n: usize,
) -> ProductRanking {
    rank_products(line_items.iter().filter(|item| item.reordered == 1), products, n)
}

/// The n products most often added to the cart first. Line items with no
/// recorded cart position are excluded by definition.
pub fn top_first_added_products(
    line_items: &[LineItem],
    products: &[Product],
    n: usize,
) -> ProductRanking {
    rank_products(
        line_items.iter().filter(|item| item.add_to_cart_order == Some(1)),
        products,
        n,
    )
}

/// For each product appearing in the line items, the proportion of its rows
/// that are reorders. Always in [0,1]; a product with no line items has no
/// entry, so the denominator is never zero.
pub fn reorder_proportion_by_product(
    line_items: &[LineItem],
    products: &[Product],
) -> ProductReorderShares {
    let names = name_lookup(products);
    let mut totals: AHashMap<u32, (u64, u64)> = AHashMap::new();
    let mut unmatched = 0usize;

    for item in line_items {
        if !names.contains_key(&item.product_id) {
            unmatched += 1;
            continue;
        }
        let entry = totals.entry(item.product_id).or_insert((0, 0));
        entry.0 += 1;
        if item.reordered == 1 {
            entry.1 += 1;
        }
    }

    let by_product = totals
        .into_iter()
        .map(|(product_id, (total, reorders))| {
            let share = ReorderShare {
                product_name: names[&product_id].to_string(),
                proportion: reorders as f64 / total as f64,
            };
            (product_id, share)
        })
        .collect();

    ProductReorderShares {
        by_product,
        unmatched_line_items: unmatched,
    }
}

/// For each customer, the proportion of their ordered products that are
/// reorders. Line items are joined to orders on order_id to obtain user_id;
/// items referencing an unknown order are excluded and counted.
pub fn reorder_proportion_by_customer(
    line_items: &[LineItem],
    orders: &[Order],
) -> CustomerReorderShares {
    let users: AHashMap<u32, u32> = orders
        .iter()
        .map(|order| (order.order_id, order.user_id))
        .collect();

    let mut totals: AHashMap<u32, (u64, u64)> = AHashMap::new();
    let mut unmatched = 0usize;
    for item in line_items {
        let Some(&user_id) = users.get(&item.order_id) else {
            unmatched += 1;
            continue;
        };
        let entry = totals.entry(user_id).or_insert((0, 0));
        entry.0 += 1;
        if item.reordered == 1 {
            entry.1 += 1;
        }
    }

    let by_customer = totals
        .into_iter()
        .map(|(user_id, (total, reorders))| (user_id, reorders as f64 / total as f64))
        .collect();

    CustomerReorderShares {
        by_customer,
        unmatched_line_items: unmatched,
    }
}

/// How many line items each order contains, as a size histogram plus summary
/// statistics over the per-order sizes.
pub fn order_size_distribution(line_items: &[LineItem]) -> OrderSizeDistribution {
    let mut sizes: AHashMap<u32, usize> = AHashMap::new();
    for item in line_items {
        *sizes.entry(item.order_id).or_insert(0) += 1;
    }

    let mut by_size: BTreeMap<usize, u64> = BTreeMap::new();
    for &size in sizes.values() {
        *by_size.entry(size).or_insert(0) += 1;
    }

    let values: Vec<f64> = sizes.values().map(|&size| size as f64).collect();
    OrderSizeDistribution {
        by_size,
        stats: describe(&values),
    }
}

pub fn describe(values: &[f64]) -> DescriptiveStats {
    if values.is_empty() {
        return DescriptiveStats::default();
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = if count > 1 {
        let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        (sum_sq / (count - 1) as f64).sqrt()
    } else {
        0.0
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("sizes are finite"));

    DescriptiveStats {
        count,
        mean,
        std,
        min: sorted[0],
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted[count - 1],
    }
}

/// Linearly interpolated quantile over sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    if low == high {
        sorted[low]
    } else {
        sorted[low] + (position - low as f64) * (sorted[high] - sorted[low])
    }
}

fn name_lookup(products: &[Product]) -> AHashMap<u32, &str> {
    products
        .iter()
        .map(|product| {
            (
                product.product_id,
                product.product_name.as_deref().unwrap_or(super::clean::UNKNOWN_PRODUCT_NAME),
            )
        })
        .collect()
}

fn rank_products<'a>(
    line_items: impl Iterator<Item = &'a LineItem>,
    products: &[Product],
    n: usize,
) -> ProductRanking {
    let names = name_lookup(products);
    let mut counts: AHashMap<u32, u64> = AHashMap::new();
    let mut unmatched = 0usize;

    for item in line_items {
        if names.contains_key(&item.product_id) {
            *counts.entry(item.product_id).or_insert(0) += 1;
        } else {
            unmatched += 1;
        }
    }

    let mut rows: Vec<RankedProduct> = counts
        .into_iter()
        .map(|(product_id, count)| RankedProduct {
            product_id,
            product_name: names[&product_id].to_string(),
            count,
        })
        .collect();
    rows.sort_by_key(|row| (Reverse(row.count), row.product_id));
    rows.truncate(n);

    ProductRanking {
        rows,
        unmatched_line_items: unmatched,
    }
}
