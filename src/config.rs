use config::{Config, ConfigError, File as ConfigFile};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub orders_path: String,
    pub order_products_path: String,
    pub products_path: String,
    pub aisles_path: String,
    pub departments_path: String,
    /// How many rows to keep in each top-N ranking.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Where to write the order_ids that have a missing cart position.
    /// No file is written when unset.
    #[serde(default)]
    pub missing_cart_export: Option<String>,
}

fn default_top_n() -> usize {
    20
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_n_defaults_to_twenty() {
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                r#"
                orders_path = "data/instacart_orders.csv"
                order_products_path = "data/order_products.csv"
                products_path = "data/products.csv"
                aisles_path = "data/aisles.csv"
                departments_path = "data/departments.csv"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.top_n, 20);
        assert!(config.missing_cart_export.is_none());
    }
}
