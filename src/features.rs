//! Feature matrix construction from consumer profiles
//!
//! Selects the clustering features (mean price and mean discount are
//! mandatory, favorite-category indicators are appended when available),
//! drops near-constant columns, and standardizes the survivors to zero mean
//! and unit variance. The fitted scaler is retained so new profiles can be
//! projected into the same space.

use crate::profile::{ConsumerProfile, ProfileTable};
use ndarray::{Array2, Axis};
use std::collections::BTreeSet;

/// Features that must be present for clustering to make sense
pub const REQUIRED_FEATURES: [&str; 2] = ["avg_price", "avg_discount"];

/// Near-zero variance threshold below which a column carries no signal
const VARIANCE_THRESHOLD: f64 = 1e-8;

/// Column-wise standardizer fitted on the feature matrix itself
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit means and (population) standard deviations per column
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows() as f64;
        let means: Vec<f64> = x.axis_iter(Axis(1)).map(|col| col.sum() / n).collect();
        let stds: Vec<f64> = x
            .axis_iter(Axis(1))
            .zip(&means)
            .map(|(col, &m)| (col.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n).sqrt())
            .collect();
        Self { means, stds }
    }

    /// Transform using the fitted statistics
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for (j, mut col) in out.axis_iter_mut(Axis(1)).enumerate() {
            col.mapv_inplace(|v| (v - self.means[j]) / self.stds[j]);
        }
        out
    }
}

/// Normalized feature matrix aligned 1:1 with the consumer profile table
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    /// Standardized features, one row per consumer
    pub x: Array2<f64>,
    /// Names of the columns that survived variance filtering
    pub feature_names: Vec<String>,
    /// Scaler fitted on this matrix
    pub scaler: StandardScaler,
}

impl FeatureMatrix {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Build the clustering feature matrix from the profile table.
///
/// Fails with a configuration error if a mandatory feature cannot be
/// resolved, and with a domain error if every candidate column is
/// (near-)constant across consumers.
pub fn prepare_features(table: &ProfileTable) -> crate::Result<FeatureMatrix> {
    let profiles = &table.profiles;
    if profiles.is_empty() {
        anyhow::bail!("cannot build features from an empty profile table");
    }

    let mut feature_names: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();

    for name in REQUIRED_FEATURES {
        let column: Option<Vec<f64>> = profiles
            .iter()
            .map(|p| profile_value(p, name))
            .collect();
        match column {
            Some(values) => {
                feature_names.push(name.to_string());
                columns.push(values);
            }
            None => anyhow::bail!("required feature '{name}' not found in profile table"),
        }
    }

    // One indicator column per observed favorite category
    let favorites: Vec<&str> = profiles
        .iter()
        .map(|p| p.favorite_category.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    for category in favorites {
        feature_names.push(format!("cat_{category}"));
        columns.push(
            profiles
                .iter()
                .map(|p| if p.favorite_category == category { 1.0 } else { 0.0 })
                .collect(),
        );
    }

    let n = profiles.len();
    let mut raw = Array2::zeros((n, columns.len()));
    for (j, column) in columns.iter().enumerate() {
        for (i, &v) in column.iter().enumerate() {
            raw[[i, j]] = v;
        }
    }

    // Constant columns cannot separate anyone; drop them before scaling
    let keep: Vec<usize> = (0..raw.ncols())
        .filter(|&j| population_variance(&raw.column(j).to_vec()) > VARIANCE_THRESHOLD)
        .collect();

    if keep.is_empty() {
        anyhow::bail!("all candidate features have near-zero variance");
    }

    // select(Axis(1), ..) yields a column-stacked array; linfa-nn's KdTree
    // needs rows to be contiguous slices, so force standard (row-major) layout
    let filtered = raw.select(Axis(1), &keep).as_standard_layout().to_owned();
    let feature_names: Vec<String> = keep.iter().map(|&j| feature_names[j].clone()).collect();

    let scaler = StandardScaler::fit(&filtered);
    let mut x = scaler.transform(&filtered);

    // Guards zero-variance edge cases from floating-point drift
    x.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });

    Ok(FeatureMatrix {
        x,
        feature_names,
        scaler,
    })
}

/// Resolve a profile aggregate by column name; `None` for unknown names
fn profile_value(p: &ConsumerProfile, name: &str) -> Option<f64> {
    match name {
        "total_products" => Some(p.total_products as f64),
        "avg_price" => Some(p.avg_price),
        "total_spent" => Some(p.total_spent),
        "price_std" => Some(p.price_std),
        "min_price" => Some(p.min_price),
        "max_price" => Some(p.max_price),
        "avg_discount" => Some(p.avg_discount),
        "discount_std" => Some(p.discount_std),
        "max_discount" => Some(p.max_discount),
        "avg_rating" => Some(p.avg_rating),
        "rating_std" => Some(p.rating_std),
        "rating_count" => Some(p.rating_count as f64),
        "price_range" => Some(p.price_range),
        _ => None,
    }
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Rank retained features by the sum of their absolute pairwise correlations.
/// Highly correlated features dominate the geometry of the scaled space.
pub fn feature_importance(matrix: &FeatureMatrix) -> Vec<(String, f64)> {
    let x = &matrix.x;
    let k = x.ncols();
    let mut scores: Vec<(String, f64)> = (0..k)
        .map(|j| {
            let score: f64 = (0..k)
                .map(|other| pearson(&x.column(j).to_vec(), &x.column(other).to_vec()).abs())
                .sum();
            (matrix.feature_names[j].clone(), score)
        })
        .collect();
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scores
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - mean_a) * (y - mean_b)).sum();
    let var_a: f64 = a.iter().map(|x| (x - mean_a).powi(2)).sum();
    let var_b: f64 = b.iter().map(|y| (y - mean_b).powi(2)).sum();
    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        cov / denom
    }
}
