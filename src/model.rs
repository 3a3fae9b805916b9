//! Clustering parameter search over K-Means and DBSCAN
//!
//! Both searches take the feature matrix as input and return a fresh,
//! independent [`ClusterRun`] with no retained state, so the two algorithm
//! families can be run side by side. Every K-Means fit is seeded from the
//! [`SearchConfig`], making repeated runs on identical input reproduce
//! identical labels and scores.

use crate::labels::NOISE;
use crate::metrics::{count_clusters, evaluate_partition, silhouette_score};
use linfa::prelude::*;
use linfa_clustering::{Dbscan, KMeans};
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_isaac::Isaac64Rng;

/// Per-candidate sentinel for a k that produced no scorable partition
const INVALID_SCORE: f64 = -1.0;

/// Explicit knobs for both hyperparameter searches
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Seed for every K-Means initialization
    pub seed: u64,
    /// Upper bound of the automatic cluster-count search
    pub max_clusters: usize,
    /// K-Means restarts per candidate, to avoid bad local optima
    pub n_runs: usize,
    pub max_iterations: u64,
    pub tolerance: f64,
    /// DBSCAN neighborhood radii to try
    pub eps_grid: Vec<f64>,
    /// DBSCAN minimum neighbor counts to try
    pub min_samples_grid: Vec<usize>,
    /// Radius used when no grid combination is viable
    pub fallback_eps: f64,
    /// Minimum neighbor count used when no grid combination is viable
    pub fallback_min_samples: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_clusters: 10,
            n_runs: 10,
            max_iterations: 300,
            tolerance: 1e-4,
            // 0.3 to 2.0 exclusive in steps of 0.1
            eps_grid: (3..20).map(|i| f64::from(i) / 10.0).collect(),
            min_samples_grid: vec![3, 5, 7, 10, 15],
            fallback_eps: 0.8,
            fallback_min_samples: 5,
        }
    }
}

/// Parameters the search settled on
#[derive(Debug, Clone, PartialEq)]
pub enum RunParams {
    KMeans { n_clusters: usize },
    Dbscan { eps: f64, min_samples: usize },
}

impl std::fmt::Display for RunParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunParams::KMeans { n_clusters } => write!(f, "k-means, k={n_clusters}"),
            RunParams::Dbscan { eps, min_samples } => {
                write!(f, "dbscan, eps={eps:.2}, min_samples={min_samples}")
            }
        }
    }
}

/// One finished clustering run: raw labels plus the chosen parameters
#[derive(Debug, Clone)]
pub struct ClusterRun {
    /// Raw label per feature-matrix row; [`NOISE`] marks outliers
    pub labels: Vec<i64>,
    pub params: RunParams,
}

/// Fit K-Means at the given (or searched) cluster count.
///
/// When `n_clusters` is not supplied, the count is searched over the closed
/// range `[2, min(max_clusters, n/2)]` by silhouette score.
pub fn apply_kmeans(
    x: &Array2<f64>,
    n_clusters: Option<usize>,
    config: &SearchConfig,
) -> crate::Result<ClusterRun> {
    let k = n_clusters.unwrap_or_else(|| find_optimal_k(x, config));
    let labels = fit_kmeans_once(x, k, config)?;
    Ok(ClusterRun {
        labels,
        params: RunParams::KMeans { n_clusters: k },
    })
}

/// Search the cluster count with the best silhouette.
///
/// Candidates that fail to fit or collapse to a single label are recorded
/// with a sentinel score and skipped; if every candidate scores below zero
/// the smallest candidate count wins.
pub fn find_optimal_k(x: &Array2<f64>, config: &SearchConfig) -> usize {
    let k_min = 2;
    let k_max = config.max_clusters.min(x.nrows() / 2);

    let mut best_k = k_min;
    let mut best_score = f64::NEG_INFINITY;
    for k in k_min..=k_max {
        let score = match fit_kmeans_once(x, k, config) {
            Ok(labels) if count_clusters(&labels) >= 2 => silhouette_score(x.view(), &labels),
            // a failed fit or a degenerate single-label result stays in the
            // scoreboard as invalid; the search continues
            _ => INVALID_SCORE,
        };
        if score > best_score {
            best_score = score;
            best_k = k;
        }
    }

    if best_score < 0.0 {
        k_min
    } else {
        best_k
    }
}

/// One deterministic seeded K-Means fit
fn fit_kmeans_once(x: &Array2<f64>, k: usize, config: &SearchConfig) -> crate::Result<Vec<i64>> {
    let n = x.nrows();
    if n < k {
        anyhow::bail!("cannot split {n} consumers into {k} clusters");
    }

    let dataset = Dataset::new(x.clone(), Array1::<usize>::zeros(n));
    let rng = Isaac64Rng::seed_from_u64(config.seed);
    let model = KMeans::params_with(k, rng, L2Dist)
        .max_n_iterations(config.max_iterations)
        .n_runs(config.n_runs)
        .tolerance(config.tolerance)
        .fit(&dataset)?;

    let assignments: Array1<usize> = model.predict(x);
    Ok(assignments.iter().map(|&l| l as i64).collect())
}

/// Run DBSCAN at the given (or grid-searched) parameters
pub fn apply_dbscan(
    x: &Array2<f64>,
    eps: Option<f64>,
    min_samples: Option<usize>,
    config: &SearchConfig,
) -> crate::Result<ClusterRun> {
    let (eps, min_samples) = match (eps, min_samples) {
        (Some(eps), Some(min_samples)) => (eps, min_samples),
        _ => find_optimal_dbscan_params(x, config),
    };

    let labels = run_dbscan_once(x, eps, min_samples)?;
    Ok(ClusterRun {
        labels,
        params: RunParams::Dbscan { eps, min_samples },
    })
}

/// Grid-search (eps, min_samples) by silhouette over non-outlier points.
///
/// A combination is a candidate only if it forms at least two clusters,
/// marks less than half the points as outliers, and keeps at least twice as
/// many points as clusters. Strictly higher silhouette wins; an exact tie
/// prefers more clusters. With no viable combination the fixed fallback
/// parameters are returned unscored.
pub fn find_optimal_dbscan_params(x: &Array2<f64>, config: &SearchConfig) -> (f64, usize) {
    let mut best_score = INVALID_SCORE;
    let mut best_n_clusters = 0;
    let mut best = None;

    for &eps in &config.eps_grid {
        for &min_samples in &config.min_samples_grid {
            let Ok(labels) = run_dbscan_once(x, eps, min_samples) else {
                // a single bad combination must never abort the search
                continue;
            };

            let n_noise = labels.iter().filter(|&&l| l == NOISE).count();
            let noise_ratio = n_noise as f64 / labels.len().max(1) as f64;
            if noise_ratio >= 0.5 {
                continue;
            }

            // evaluate_partition applies the remaining viability conditions
            let scored = evaluate_partition(x, &labels);
            let Some(score) = scored.silhouette else { continue };

            if score > best_score || (score == best_score && scored.n_clusters > best_n_clusters) {
                best_score = score;
                best_n_clusters = scored.n_clusters;
                best = Some((eps, min_samples));
            }
        }
    }

    best.unwrap_or((config.fallback_eps, config.fallback_min_samples))
}

/// One DBSCAN run; unassigned points come back as [`NOISE`]
fn run_dbscan_once(x: &Array2<f64>, eps: f64, min_samples: usize) -> crate::Result<Vec<i64>> {
    let assignments = Dbscan::params(min_samples).tolerance(eps).transform(x)?;
    Ok(assignments
        .iter()
        .map(|a| match a {
            Some(cluster) => *cluster as i64,
            None => NOISE,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `per_blob` points around each of the given centers, deterministic
    fn blobs(centers: &[(f64, f64)], per_blob: usize, spread: f64) -> Array2<f64> {
        let mut rows = Vec::new();
        for &(cx, cy) in centers {
            for i in 0..per_blob {
                // small deterministic jitter, no RNG needed
                let dx = spread * ((i % 5) as f64 - 2.0) / 2.0;
                let dy = spread * ((i % 3) as f64 - 1.0);
                rows.extend_from_slice(&[cx + dx, cy + dy]);
            }
        }
        Array2::from_shape_vec((centers.len() * per_blob, 2), rows).unwrap()
    }

    #[test]
    fn test_find_optimal_k_two_blobs() {
        let x = blobs(&[(0.0, 0.0), (8.0, 8.0)], 10, 0.2);
        let config = SearchConfig::default();
        assert_eq!(find_optimal_k(&x, &config), 2);
    }

    #[test]
    fn test_optimal_k_stays_within_bounds() {
        let x = blobs(&[(0.0, 0.0), (8.0, 8.0)], 5, 0.2);
        let config = SearchConfig::default();
        let k = find_optimal_k(&x, &config);
        assert!(k >= 2);
        assert!(k <= x.nrows() / 2);
    }

    #[test]
    fn test_apply_kmeans_is_deterministic() {
        let x = blobs(&[(0.0, 0.0), (8.0, 8.0), (0.0, 8.0)], 8, 0.3);
        let config = SearchConfig::default();

        let first = apply_kmeans(&x, Some(3), &config).unwrap();
        let second = apply_kmeans(&x, Some(3), &config).unwrap();
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.params, RunParams::KMeans { n_clusters: 3 });
    }

    #[test]
    fn test_apply_kmeans_searches_when_k_missing() {
        let x = blobs(&[(0.0, 0.0), (8.0, 8.0)], 10, 0.2);
        let config = SearchConfig::default();
        let run = apply_kmeans(&x, None, &config).unwrap();

        assert_eq!(run.params, RunParams::KMeans { n_clusters: 2 });
        assert_eq!(count_clusters(&run.labels), 2);
        assert_eq!(run.labels.len(), x.nrows());
    }

    #[test]
    fn test_dbscan_finds_dense_blobs() {
        let x = blobs(&[(0.0, 0.0), (5.0, 5.0)], 12, 0.3);
        let config = SearchConfig::default();
        let run = apply_dbscan(&x, None, None, &config).unwrap();

        assert_eq!(count_clusters(&run.labels), 2);
        let n_noise = run.labels.iter().filter(|&&l| l == NOISE).count();
        assert!(n_noise < x.nrows() / 2);
    }

    #[test]
    fn test_dbscan_fallback_params() {
        // points too sparse for any grid combination to form clusters
        let mut rows = Vec::new();
        for i in 0..10 {
            rows.extend_from_slice(&[(i * 10) as f64, (i * 10) as f64]);
        }
        let x = Array2::from_shape_vec((10, 2), rows).unwrap();

        let config = SearchConfig::default();
        let (eps, min_samples) = find_optimal_dbscan_params(&x, &config);
        assert_eq!(eps, 0.8);
        assert_eq!(min_samples, 5);
    }

    #[test]
    fn test_dbscan_with_explicit_params_skips_search() {
        let x = blobs(&[(0.0, 0.0), (5.0, 5.0)], 10, 0.3);
        let config = SearchConfig::default();
        let run = apply_dbscan(&x, Some(1.0), Some(3), &config).unwrap();

        assert_eq!(
            run.params,
            RunParams::Dbscan { eps: 1.0, min_samples: 3 }
        );
    }

    #[test]
    fn test_kmeans_more_clusters_than_samples_fails() {
        let x = blobs(&[(0.0, 0.0)], 3, 0.1);
        let config = SearchConfig::default();
        assert!(apply_kmeans(&x, Some(10), &config).is_err());
    }
}
