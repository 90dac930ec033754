use crate::config::AppConfig;
use crate::error::Error;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub mod aggregate;
pub mod clean;
pub mod load;
pub mod report;

use clean::CleanReport;

pub struct Runner {
    config: AppConfig,
}

#[derive(Debug)]
pub struct RunSummary {
    pub load_duration: Duration,
    pub clean_duration: Duration,
    pub aggregate_duration: Duration,
    pub report: CleanReport,
    pub orders_analyzed: usize,
    pub line_items_analyzed: usize,
    pub missing_cart_orders_exported: Option<usize>,
}

impl Runner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run the full analysis pipeline:
    /// 1. Load the five tables from disk
    /// 2. Clean (dedupe, fill policies, data-quality findings)
    /// 3. Compute and print the aggregates
    pub fn run(&self) -> Result<RunSummary, Error> {
        let (tables, cleaned, clean_report, load_duration, clean_duration) = self.load_and_clean()?;
        report::print_clean_report(&clean_report);

        /*
            Aggregate
        */
        info!("Computing aggregates...");
        let aggregate_start = Instant::now();
        let top_n = self.config.top_n;

        report::print_bucket_counts("Orders by hour of day", &aggregate::orders_by_hour(&cleaned.orders));
        report::print_bucket_counts("Orders by day of week", &aggregate::orders_by_dow(&cleaned.orders));
        report::print_bucket_counts(
            "Orders by hour, Wednesday",
            &aggregate::orders_by_hour_for_dow(&cleaned.orders, 3),
        );
        report::print_bucket_counts(
            "Orders by hour, Saturday",
            &aggregate::orders_by_hour_for_dow(&cleaned.orders, 6),
        );
        report::print_gap_distribution(&aggregate::days_since_prior_distribution(&cleaned.orders));

        let per_customer = aggregate::orders_per_customer(&cleaned.orders);
        println!("Customers: {}", per_customer.len());

        report::print_ranking(
            "Top products by order count",
            &aggregate::top_products_by_order_count(&cleaned.line_items, &cleaned.products, top_n),
        );
        report::print_ranking(
            "Top reordered products",
            &aggregate::top_reordered_products(&cleaned.line_items, &cleaned.products, top_n),
        );
        report::print_ranking(
            "Top first-added products",
            &aggregate::top_first_added_products(&cleaned.line_items, &cleaned.products, top_n),
        );
        report::print_reorder_shares(
            &aggregate::reorder_proportion_by_product(&cleaned.line_items, &cleaned.products),
            top_n,
        );
        report::print_customer_reorder_shares(&aggregate::reorder_proportion_by_customer(
            &cleaned.line_items,
            &cleaned.orders,
        ));
        report::print_order_sizes(&aggregate::order_size_distribution(&cleaned.line_items));

        let aggregate_duration = aggregate_start.elapsed();
        debug!(
            "Aggregation completed in {:.2}s",
            aggregate_duration.as_secs_f64()
        );

        /*
            Optional export: orders with a missing cart position. Nulls are
            detected on the raw table so the artifact reflects the input file.
        */
        let missing_cart_orders_exported = match &self.config.missing_cart_export {
            Some(path) => {
                let written = report::write_missing_cart_orders(path, &tables.line_items)?;
                info!("Wrote {} order ids with missing cart positions to {}", written, path);
                Some(written)
            }
            None => None,
        };

        Ok(RunSummary {
            load_duration,
            clean_duration,
            aggregate_duration,
            report: clean_report,
            orders_analyzed: cleaned.orders.len(),
            line_items_analyzed: cleaned.line_items.len(),
            missing_cart_orders_exported,
        })
    }

    /// Load and clean only, printing the data-quality report.
    pub fn check(&self) -> Result<CleanReport, Error> {
        let (_, _, clean_report, _, _) = self.load_and_clean()?;
        report::print_clean_report(&clean_report);
        Ok(clean_report)
    }

    fn load_and_clean(
        &self,
    ) -> Result<(load::Tables, clean::CleanedTables, CleanReport, Duration, Duration), Error> {
        info!("Loading tables...");
        let load_start = Instant::now();
        let tables = load::load_tables(
            &self.config.orders_path,
            &self.config.order_products_path,
            &self.config.products_path,
            &self.config.aisles_path,
            &self.config.departments_path,
        )?;
        let load_duration = load_start.elapsed();
        debug!(
            "Load completed in {:.2}s — {} orders, {} line items, {} products",
            load_duration.as_secs_f64(),
            tables.orders.len(),
            tables.line_items.len(),
            tables.products.len(),
        );

        info!("Cleaning tables...");
        let clean_start = Instant::now();
        let (cleaned, clean_report) = clean::clean_tables(&tables);
        let clean_duration = clean_start.elapsed();
        debug!("Clean completed in {:.2}s", clean_duration.as_secs_f64());

        Ok((tables, cleaned, clean_report, load_duration, clean_duration))
    }
}
