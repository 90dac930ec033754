use serde::{Deserialize, Deserializer};

/// One placed order. `days_since_prior_order` is null on a customer's first
/// order; the raw files carry it as an integral float ("5.0").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Order {
    pub order_id: u32,
    pub user_id: u32,
    pub order_number: u32,
    pub order_dow: i16,
    pub order_hour_of_day: i16,
    #[serde(deserialize_with = "de_opt_whole_u32")]
    pub days_since_prior_order: Option<u32>,
}

/// One product instance inside an order. `add_to_cart_order` is null when the
/// cart position was not recorded (very large carts).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct LineItem {
    pub order_id: u32,
    pub product_id: u32,
    #[serde(deserialize_with = "de_opt_whole_u32")]
    pub add_to_cart_order: Option<u32>,
    pub reordered: u8,
}

/// Catalog entry. All three non-key columns are nullable in the raw file;
/// the cleaner fills them with sentinels ("Unknown" / -1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Product {
    pub product_id: u32,
    pub product_name: Option<String>,
    #[serde(deserialize_with = "de_opt_whole_i32")]
    pub aisle_id: Option<i32>,
    #[serde(deserialize_with = "de_opt_whole_i32")]
    pub department_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Aisle {
    pub aisle_id: i32,
    pub aisle: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Department {
    pub department_id: i32,
    pub department: String,
}

/// Parses "", "12" or "12.0" into an optional whole number. A fractional or
/// negative value is malformed input and fails the load.
fn de_opt_whole_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    parse_whole(raw, |v| {
        if (0.0..=u32::MAX as f64).contains(&v) {
            Some(v as u32)
        } else {
            None
        }
    })
}

fn de_opt_whole_i32<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    parse_whole(raw, |v| {
        if (i32::MIN as f64..=i32::MAX as f64).contains(&v) {
            Some(v as i32)
        } else {
            None
        }
    })
}

fn parse_whole<T, E>(raw: Option<String>, convert: impl Fn(f64) -> Option<T>) -> Result<Option<T>, E>
where
    E: serde::de::Error,
{
    let text = match raw.as_deref().map(str::trim) {
        None | Some("") => return Ok(None),
        Some(text) => text,
    };
    let value: f64 = text
        .parse()
        .map_err(|_| E::custom(format!("expected a number, got `{}`", text)))?;
    if value.fract() != 0.0 {
        return Err(E::custom(format!("expected a whole number, got `{}`", text)));
    }
    convert(value)
        .map(Some)
        .ok_or_else(|| E::custom(format!("number out of range: `{}`", text)))
}
