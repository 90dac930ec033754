use super::aggregate::{
    CustomerReorderShares, DescriptiveStats, OrderSizeDistribution, ProductRanking,
    ProductReorderShares,
};
use super::clean::{CleanReport, TableReport, CART_POSITION_LIMIT};
use crate::error::Error;
use crate::model::LineItem;
use colored::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub fn print_clean_report(report: &CleanReport) {
    print_table_report("orders", &report.orders);
    print_table_report("order_products", &report.line_items);
    print_table_report("products", &report.products);
    print_table_report("aisles", &report.aisles);
    print_table_report("departments", &report.departments);

    info!(
        "products: {} case-insensitive name duplicates (informational)",
        count_colored(report.product_name_ci_duplicates)
    );
    info!(
        "products: {} missing names filled with \"Unknown\" ({} outside the expected aisle/department slot), {} missing aisle ids, {} missing department ids",
        count_colored(report.missing_product_names),
        count_colored(report.missing_name_slot_exceptions),
        count_colored(report.missing_aisle_ids),
        count_colored(report.missing_department_ids),
    );
    info!(
        "orders: {} dow out of [0,6], {} hour out of [0,23], {} null days_since_prior_order ({} on non-first orders)",
        count_colored(report.dow_out_of_range),
        count_colored(report.hour_out_of_range),
        count_colored(report.missing_days_since_prior),
        count_colored(report.days_since_prior_null_on_repeat),
    );
    info!(
        "order_products: {} missing cart positions, {} affected orders at or under {} items",
        count_colored(report.missing_cart_positions),
        count_colored(report.short_orders_with_missing_cart_position),
        CART_POSITION_LIMIT,
    );
}

fn print_table_report(table: &str, report: &TableReport) {
    info!(
        "{}: {} rows in, {} full duplicates, {} key duplicates, {} rows out",
        table,
        report.rows_in,
        count_colored(report.full_duplicates),
        count_colored(report.key_duplicates),
        report.rows_out,
    );
}

fn count_colored(count: usize) -> ColoredString {
    if count == 0 {
        count.to_string().green()
    } else {
        count.to_string().red()
    }
}

pub fn print_bucket_counts(title: &str, counts: &BTreeMap<i16, u64>) {
    println!("{}", title.bold());
    for (bucket, count) in counts {
        println!("  {:>3}  {}", bucket, count);
    }
}

pub fn print_gap_distribution(counts: &BTreeMap<u32, u64>) {
    println!("{}", "Days between orders".bold());
    for (days, count) in counts {
        println!("  {:>3}  {}", days, count);
    }
}

pub fn print_ranking(title: &str, ranking: &ProductRanking) {
    println!("{}", title.bold());
    for row in &ranking.rows {
        println!("  {:>8}  {:<50}  {}", row.product_id, row.product_name, row.count);
    }
    if ranking.unmatched_line_items > 0 {
        info!(
            "{} line items excluded (product_id missing from catalog)",
            ranking.unmatched_line_items.to_string().red()
        );
    }
}

pub fn print_order_sizes(distribution: &OrderSizeDistribution) {
    println!("{}", "Items per order".bold());
    print_stats(&distribution.stats);
}

fn print_stats(stats: &DescriptiveStats) {
    println!("  count  {}", stats.count);
    println!("  mean   {:.2}", stats.mean);
    println!("  std    {:.2}", stats.std);
    println!("  min    {}", stats.min);
    println!("  25%    {}", stats.q25);
    println!("  50%    {}", stats.median);
    println!("  75%    {}", stats.q75);
    println!("  max    {}", stats.max);
}

pub fn print_reorder_shares(shares: &ProductReorderShares, top_n: usize) {
    println!("{}", "Reorder proportion by product".bold());
    let mut rows: Vec<_> = shares.by_product.iter().collect();
    rows.sort_by(|(id_a, a), (id_b, b)| {
        b.proportion
            .partial_cmp(&a.proportion)
            .expect("proportions are finite")
            .then(id_a.cmp(id_b))
    });
    for (product_id, share) in rows.into_iter().take(top_n) {
        println!(
            "  {:>8}  {:<50}  {:.3}",
            product_id, share.product_name, share.proportion
        );
    }
    if shares.unmatched_line_items > 0 {
        info!(
            "{} line items excluded (product_id missing from catalog)",
            shares.unmatched_line_items.to_string().red()
        );
    }
}

pub fn print_customer_reorder_shares(shares: &CustomerReorderShares) {
    let customers = shares.by_customer.len();
    let mean = if customers > 0 {
        shares.by_customer.values().sum::<f64>() / customers as f64
    } else {
        0.0
    };
    println!("{}", "Reorder proportion by customer".bold());
    println!("  customers  {}", customers);
    println!("  mean       {:.3}", mean);
    if shares.unmatched_line_items > 0 {
        info!(
            "{} line items excluded (order_id missing from orders)",
            shares.unmatched_line_items.to_string().red()
        );
    }
}

/// Writes the distinct order_ids that have at least one missing cart
/// position, ascending, as a one-column CSV. Returns the number of order ids
/// written.
pub fn write_missing_cart_orders<P: AsRef<Path>>(
    path: P,
    line_items: &[LineItem],
) -> Result<usize, Error> {
    let mut order_ids: Vec<u32> = line_items
        .iter()
        .filter(|item| item.add_to_cart_order.is_none())
        .map(|item| item.order_id)
        .collect();
    order_ids.sort_unstable();
    order_ids.dedup();

    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record(["order_id"])?;
    for order_id in &order_ids {
        writer.write_record([order_id.to_string()])?;
    }
    writer.flush()?;
    Ok(order_ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(order_id: u32, product_id: u32, cart: Option<u32>) -> LineItem {
        LineItem {
            order_id,
            product_id,
            add_to_cart_order: cart,
            reordered: 0,
        }
    }

    #[test]
    fn test_write_missing_cart_orders_sorted_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let items = vec![
            item(9, 1, None),
            item(2, 1, None),
            item(9, 2, None),
            item(5, 1, Some(1)),
        ];
        let written = write_missing_cart_orders(&path, &items).unwrap();
        assert_eq!(written, 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "order_id\n2\n9\n");
    }
}
