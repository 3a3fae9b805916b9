//! Transaction loading and raw-field cleaning using Polars
//!
//! Raw e-commerce exports are messy: prices carry currency symbols and
//! thousands separators, discounts carry a trailing `%`, ratings are sometimes
//! text, and a consumer-id field can pack several comma-separated ids. The
//! cleaning functions here turn each field into something the aggregation in
//! [`crate::profile`] can work with.

use anyhow::Context;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

/// First numeric token in a string, optionally with a decimal part
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.?\d*").expect("numeric token pattern"));

/// One raw purchase event, cleaned at load time and immutable afterwards
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Consumer identifier; `"Unknown"` when missing
    pub user_id: String,
    /// Product identifier; `"Unknown"` when missing
    pub product_id: String,
    /// Cleaned sale price (the price actually paid)
    pub sale_price: f64,
    /// Cleaned listed price before discount
    pub listed_price: f64,
    /// Cleaned discount percentage
    pub discount_pct: f64,
    /// Star rating when it parsed as a number
    pub rating: Option<f64>,
    /// Most general segment of the pipe-delimited category path
    pub main_category: String,
}

/// Strip currency symbols and thousands separators, then take the first
/// numeric token. Missing or unparseable input yields 0.0.
pub fn clean_price(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else { return 0.0 };
    let cleaned = raw.replace('₹', "").replace(',', "");
    NUMBER_RE
        .find(cleaned.trim())
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// Extract the first numeric token from a discount string such as `"64%"`.
/// Missing input yields 0.0.
pub fn clean_discount(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else { return 0.0 };
    NUMBER_RE
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// First segment of a pipe-delimited category path; `"Unknown"` when missing
pub fn extract_main_category(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => raw.split('|').next().unwrap_or("Unknown").to_string(),
        None => "Unknown".to_string(),
    }
}

/// Clean a consumer identifier: missing becomes `"Unknown"` and a
/// comma-packed list of ids keeps only the first one
pub fn clean_user_id(raw: Option<&str>) -> String {
    match raw {
        Some(raw) => raw.split(',').next().unwrap_or("Unknown").to_string(),
        None => "Unknown".to_string(),
    }
}

/// Coerce a rating to a number; non-numeric ratings become `None`
pub fn parse_rating(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|r| r.trim().parse().ok())
}

/// Load the transactions CSV and clean every field.
///
/// Fails if the file is absent or unreadable, if any required column is
/// missing, or if no rows survive — all fatal per the single-pass batch model.
pub fn load_transactions(path: &str) -> crate::Result<Vec<Transaction>> {
    let df = CsvReader::from_path(path)
        .with_context(|| format!("transactions file not found: {path}"))?
        .has_header(true)
        .finish()
        .with_context(|| format!("failed to read transactions file: {path}"))?;

    if df.height() == 0 {
        anyhow::bail!("no transactions found in {path}");
    }

    let user_ids = str_column(&df, "user_id")?;
    let product_ids = str_column(&df, "product_id")?;
    let sale_prices = str_column(&df, "discounted_price")?;
    let listed_prices = str_column(&df, "actual_price")?;
    let discounts = str_column(&df, "discount_percentage")?;
    let ratings = str_column(&df, "rating")?;
    let categories = str_column(&df, "category")?;

    let transactions = (0..df.height())
        .map(|i| Transaction {
            user_id: clean_user_id(user_ids[i].as_deref()),
            product_id: product_ids[i].clone().unwrap_or_else(|| "Unknown".to_string()),
            sale_price: clean_price(sale_prices[i].as_deref()),
            listed_price: clean_price(listed_prices[i].as_deref()),
            discount_pct: clean_discount(discounts[i].as_deref()),
            rating: parse_rating(ratings[i].as_deref()),
            main_category: extract_main_category(categories[i].as_deref()),
        })
        .collect();

    Ok(transactions)
}

/// Extract a column as optional strings, casting numeric columns on the way
fn str_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    let series = df
        .column(name)
        .with_context(|| format!("missing required column '{name}'"))?
        .cast(&DataType::String)
        .with_context(|| format!("column '{name}' cannot be read as text"))?;

    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}
