use crate::error::Error;
use crate::model::{Aisle, Department, LineItem, Order, Product};
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::debug;

/// The five raw tables, exactly as read from disk.
#[derive(Debug, Clone)]
pub struct Tables {
    pub orders: Vec<Order>,
    pub line_items: Vec<LineItem>,
    pub products: Vec<Product>,
    pub aisles: Vec<Aisle>,
    pub departments: Vec<Department>,
}

const ORDER_COLUMNS: &[&str] = &[
    "order_id",
    "user_id",
    "order_number",
    "order_dow",
    "order_hour_of_day",
    "days_since_prior_order",
];
const LINE_ITEM_COLUMNS: &[&str] = &["order_id", "product_id", "add_to_cart_order", "reordered"];
const PRODUCT_COLUMNS: &[&str] = &["product_id", "product_name", "aisle_id", "department_id"];
const AISLE_COLUMNS: &[&str] = &["aisle_id", "aisle"];
const DEPARTMENT_COLUMNS: &[&str] = &["department_id", "department"];

pub fn load_tables(
    orders_path: &str,
    order_products_path: &str,
    products_path: &str,
    aisles_path: &str,
    departments_path: &str,
) -> Result<Tables, Error> {
    let orders = read_table(orders_path, ORDER_COLUMNS)?;
    let line_items = read_table(order_products_path, LINE_ITEM_COLUMNS)?;
    let products = read_table(products_path, PRODUCT_COLUMNS)?;
    let aisles = read_table(aisles_path, AISLE_COLUMNS)?;
    let departments = read_table(departments_path, DEPARTMENT_COLUMNS)?;

    Ok(Tables {
        orders,
        line_items,
        products,
        aisles,
        departments,
    })
}

/// Reads one semicolon-delimited table, validating that every required column
/// is present in the header before deserializing rows. Fields are trimmed of
/// surrounding whitespace so stray-whitespace rows compare equal later.
fn read_table<T, P>(path: P, required_columns: &[&str]) -> Result<Vec<T>, Error>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    for column in required_columns {
        if !headers.iter().any(|header| header == *column) {
            return Err(Error::MissingColumn {
                file: path.display().to_string(),
                column: (*column).to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &tempfile::TempDir, name: &str, contents: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // header lacks `reordered`
        let path = write_fixture(&dir, "order_products.csv", "order_id;product_id;add_to_cart_order\n1;10;1\n");
        let result: Result<Vec<crate::model::LineItem>, _> =
            read_table(&path, LINE_ITEM_COLUMNS);
        match result {
            Err(Error::MissingColumn { column, .. }) => assert_eq!(column, "reordered"),
            other => panic!("expected MissingColumn, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_unreadable_file_is_fatal() {
        let result: Result<Vec<crate::model::Aisle>, _> =
            read_table("/nonexistent/aisles.csv", AISLE_COLUMNS);
        assert!(result.is_err());
    }

    #[test]
    fn test_reads_trimmed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(&dir, "aisles.csv", "aisle_id;aisle\n100; missing \n");
        let aisles: Vec<crate::model::Aisle> = read_table(&path, AISLE_COLUMNS).unwrap();
        assert_eq!(aisles.len(), 1);
        assert_eq!(aisles[0].aisle, "missing");
    }
}
