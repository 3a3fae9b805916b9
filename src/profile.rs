//! Per-consumer aggregation of transaction records
//!
//! Groups the raw rows by consumer identifier and condenses each group into a
//! single [`ConsumerProfile`]: purchase counts, price/discount/rating
//! statistics, the favorite top-level category, a derived price range, three
//! behavioral flags benchmarked against the population, and one purchase-count
//! entry per observed category.

use crate::data::Transaction;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One row per unique consumer, derived by aggregation. Immutable after
/// construction; cluster labels are carried separately.
#[derive(Debug, Clone)]
pub struct ConsumerProfile {
    pub user_id: String,
    /// Number of purchases
    pub total_products: usize,
    pub avg_price: f64,
    pub total_spent: f64,
    pub price_std: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_discount: f64,
    pub discount_std: f64,
    pub max_discount: f64,
    pub avg_rating: f64,
    pub rating_std: f64,
    /// Number of purchases with a numeric rating
    pub rating_count: usize,
    /// Most frequent top-level category, ties broken by first encounter
    pub favorite_category: String,
    /// max_price - min_price
    pub price_range: f64,
    /// Average discount strictly above the population median
    pub discount_seeker: bool,
    /// Total spend strictly above the population 75th percentile
    pub high_spender: bool,
    /// Purchase count strictly above the population median
    pub frequent_buyer: bool,
    /// Purchase counts aligned to [`ProfileTable::categories`]
    pub category_counts: Vec<usize>,
}

/// Consumer profile table plus the ordered list of observed categories the
/// per-profile counts are aligned to
#[derive(Debug, Clone)]
pub struct ProfileTable {
    pub profiles: Vec<ConsumerProfile>,
    pub categories: Vec<String>,
}

/// Aggregate transactions into one profile per consumer identifier.
///
/// Profiles come out ordered by consumer id, so repeated runs on the same
/// input produce the same table.
pub fn build_profiles(transactions: &[Transaction]) -> ProfileTable {
    // Ordered grouping keeps the output deterministic
    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        groups.entry(&tx.user_id).or_default().push(tx);
    }

    let categories: Vec<String> = transactions
        .iter()
        .map(|tx| tx.main_category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut profiles: Vec<ConsumerProfile> = groups
        .iter()
        .map(|(user_id, txs)| aggregate_group(user_id, txs, &categories))
        .collect();

    apply_population_flags(&mut profiles);

    ProfileTable { profiles, categories }
}

/// Condense one consumer's transactions into a profile (population flags are
/// filled in afterwards)
fn aggregate_group(user_id: &str, txs: &[&Transaction], categories: &[String]) -> ConsumerProfile {
    let prices: Vec<f64> = txs.iter().map(|t| t.sale_price).collect();
    let discounts: Vec<f64> = txs.iter().map(|t| t.discount_pct).collect();
    let ratings: Vec<f64> = txs.iter().filter_map(|t| t.rating).collect();

    let min_price = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max_price = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let category_counts = categories
        .iter()
        .map(|cat| txs.iter().filter(|t| &t.main_category == cat).count())
        .collect();

    ConsumerProfile {
        user_id: user_id.to_string(),
        total_products: txs.len(),
        avg_price: mean(&prices),
        total_spent: prices.iter().sum(),
        price_std: sample_std(&prices),
        min_price,
        max_price,
        avg_discount: mean(&discounts),
        discount_std: sample_std(&discounts),
        max_discount: discounts.iter().copied().fold(0.0, f64::max),
        avg_rating: mean(&ratings),
        rating_std: sample_std(&ratings),
        rating_count: ratings.len(),
        favorite_category: mode_first_encountered(txs.iter().map(|t| t.main_category.as_str())),
        price_range: max_price - min_price,
        discount_seeker: false,
        high_spender: false,
        frequent_buyer: false,
        category_counts,
    }
}

/// Fill in the three behavioral flags, each a strict comparison of a
/// consumer's aggregate against a population-wide statistic
fn apply_population_flags(profiles: &mut [ConsumerProfile]) {
    let discount_median = percentile(&collect(profiles, |p| p.avg_discount), 0.5);
    let spend_p75 = percentile(&collect(profiles, |p| p.total_spent), 0.75);
    let products_median = percentile(&collect(profiles, |p| p.total_products as f64), 0.5);

    for p in profiles.iter_mut() {
        p.discount_seeker = p.avg_discount > discount_median;
        p.high_spender = p.total_spent > spend_p75;
        p.frequent_buyer = (p.total_products as f64) > products_median;
    }
}

fn collect(profiles: &[ConsumerProfile], f: impl Fn(&ConsumerProfile) -> f64) -> Vec<f64> {
    profiles.iter().map(f).collect()
}

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 divisor); 0.0 for fewer than two values
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Linearly interpolated percentile, q in [0, 1]; 0.0 for an empty slice
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Statistical mode with ties broken by first-encountered order
fn mode_first_encountered<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, value) in values.enumerate() {
        let entry = counts.entry(value).or_insert((0, idx));
        entry.0 += 1;
    }

    counts
        .into_iter()
        .min_by_key(|(_, (count, first_idx))| (std::cmp::Reverse(*count), *first_idx))
        .map(|(value, _)| value.to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}
