//! Internal validation metrics for cluster partitions
//!
//! Scores a label assignment against the feature matrix with three standard
//! internal metrics: silhouette (higher better, [-1, 1]), Davies-Bouldin
//! (lower better) and Calinski-Harabasz (higher better). Outlier points are
//! excluded from all three. A metric that cannot be computed is reported as
//! an explicit `None` rather than a magic number; the sentinel accessors
//! reproduce the conventional fallback values for display.

use crate::labels::NOISE;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::collections::BTreeSet;

/// Scores and counts for one label assignment
#[derive(Debug, Clone)]
pub struct ClusterMetrics {
    /// `None` when the partition has no meaningful structure to score
    pub silhouette: Option<f64>,
    pub davies_bouldin: Option<f64>,
    pub calinski_harabasz: Option<f64>,
    /// Cluster count, outlier sentinel excluded
    pub n_clusters: usize,
    pub n_noise: usize,
    pub noise_ratio: f64,
}

impl ClusterMetrics {
    /// Silhouette with the "no structure" sentinel 0.0
    pub fn silhouette_or_sentinel(&self) -> f64 {
        self.silhouette.unwrap_or(0.0)
    }

    /// Davies-Bouldin with the "no structure" sentinel +inf
    pub fn davies_bouldin_or_sentinel(&self) -> f64 {
        self.davies_bouldin.unwrap_or(f64::INFINITY)
    }

    /// Calinski-Harabasz with the "no structure" sentinel 0.0
    pub fn calinski_harabasz_or_sentinel(&self) -> f64 {
        self.calinski_harabasz.unwrap_or(0.0)
    }
}

/// Evaluate a label assignment against the feature matrix.
///
/// The three quality metrics are only computed when the partition is viable:
/// at least two non-outlier clusters and at least twice as many non-outlier
/// points as clusters. Counts are reported regardless. A metric that comes
/// out non-finite is dropped individually without affecting the others.
pub fn evaluate_partition(x: &Array2<f64>, labels: &[i64]) -> ClusterMetrics {
    let n_clusters = count_clusters(labels);
    let n_noise = labels.iter().filter(|&&l| l == NOISE).count();
    let noise_ratio = if labels.is_empty() {
        0.0
    } else {
        n_noise as f64 / labels.len() as f64
    };

    let (valid_x, valid_labels) = mask_noise(x, labels);
    let n_valid = valid_labels.len();

    let (silhouette, davies_bouldin, calinski_harabasz) = if n_clusters > 1 && n_valid >= n_clusters * 2 {
        (
            finite_or_none(silhouette_score(valid_x.view(), &valid_labels)),
            finite_or_none(davies_bouldin_score(valid_x.view(), &valid_labels)),
            finite_or_none(calinski_harabasz_score(valid_x.view(), &valid_labels)),
        )
    } else {
        (None, None, None)
    };

    ClusterMetrics {
        silhouette,
        davies_bouldin,
        calinski_harabasz,
        n_clusters,
        n_noise,
        noise_ratio,
    }
}

/// Number of distinct labels, outlier sentinel excluded
pub fn count_clusters(labels: &[i64]) -> usize {
    labels
        .iter()
        .filter(|&&l| l != NOISE)
        .collect::<BTreeSet<_>>()
        .len()
}

/// Rows and labels with the outlier points removed
fn mask_noise(x: &Array2<f64>, labels: &[i64]) -> (Array2<f64>, Vec<i64>) {
    let keep: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, &l)| l != NOISE)
        .map(|(i, _)| i)
        .collect();
    let valid_labels = keep.iter().map(|&i| labels[i]).collect();
    (x.select(Axis(0), &keep), valid_labels)
}

fn finite_or_none(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn euclidean_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Mean silhouette coefficient over all points.
///
/// s(i) = (b(i) - a(i)) / max(a(i), b(i)) with a(i) the mean distance to the
/// point's own cluster and b(i) the mean distance to the nearest other one.
pub fn silhouette_score(x: ArrayView2<f64>, labels: &[i64]) -> f64 {
    let n = x.nrows();
    if n < 2 {
        return 0.0;
    }

    let clusters: Vec<i64> = labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    if clusters.len() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..n {
        let point = x.row(i);
        let own = labels[i];

        let mut same_sum = 0.0;
        let mut same_count = 0usize;
        let mut other_sums: Vec<(f64, usize)> = vec![(0.0, 0); clusters.len()];

        for j in 0..n {
            if i == j {
                continue;
            }
            let distance = euclidean_distance(&point, &x.row(j));
            if labels[j] == own {
                same_sum += distance;
                same_count += 1;
            } else if let Ok(pos) = clusters.binary_search(&labels[j]) {
                other_sums[pos].0 += distance;
                other_sums[pos].1 += 1;
            }
        }

        // a singleton cluster contributes a zero coefficient
        if same_count == 0 {
            continue;
        }

        let a_i = same_sum / same_count as f64;
        let b_i = other_sums
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(sum, count)| sum / *count as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a_i.max(b_i);
        if b_i.is_finite() && denom > 0.0 {
            total += (b_i - a_i) / denom;
        }
    }

    total / n as f64
}

/// Davies-Bouldin index: mean over clusters of the worst
/// (compactness_i + compactness_j) / separation_ij ratio. Lower is better.
pub fn davies_bouldin_score(x: ArrayView2<f64>, labels: &[i64]) -> f64 {
    let (clusters, centroids, scatters) = cluster_shapes(x, labels);
    let k = clusters.len();
    if k < 2 {
        return f64::INFINITY;
    }

    let mut total = 0.0;
    for i in 0..k {
        let mut worst: f64 = 0.0;
        for j in 0..k {
            if i == j {
                continue;
            }
            let separation = euclidean_distance(&centroids.row(i), &centroids.row(j));
            let ratio = if separation > 0.0 {
                (scatters[i] + scatters[j]) / separation
            } else {
                f64::INFINITY
            };
            worst = worst.max(ratio);
        }
        total += worst;
    }
    total / k as f64
}

/// Calinski-Harabasz index: between-cluster dispersion over within-cluster
/// dispersion, scaled by the degrees of freedom. Higher is better.
pub fn calinski_harabasz_score(x: ArrayView2<f64>, labels: &[i64]) -> f64 {
    let (clusters, centroids, _) = cluster_shapes(x, labels);
    let n = x.nrows();
    let k = clusters.len();
    if k < 2 || n <= k {
        return 0.0;
    }

    let grand_mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(x.ncols()));

    let mut between = 0.0;
    let mut within = 0.0;
    for (idx, &cluster) in clusters.iter().enumerate() {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == cluster)
            .map(|(i, _)| i)
            .collect();
        let centroid = centroids.row(idx);
        between += members.len() as f64 * euclidean_distance(&centroid, &grand_mean.view()).powi(2);
        within += members
            .iter()
            .map(|&i| euclidean_distance(&x.row(i), &centroid).powi(2))
            .sum::<f64>();
    }

    if within == 0.0 {
        1.0
    } else {
        between / within * (n - k) as f64 / (k - 1) as f64
    }
}

/// Per-cluster centroids and mean member-to-centroid distances
fn cluster_shapes(x: ArrayView2<f64>, labels: &[i64]) -> (Vec<i64>, Array2<f64>, Vec<f64>) {
    let clusters: Vec<i64> = labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let mut centroids = Array2::zeros((clusters.len(), x.ncols()));
    let mut scatters = vec![0.0; clusters.len()];

    for (idx, &cluster) in clusters.iter().enumerate() {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == cluster)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }

        let mut centroid = Array1::zeros(x.ncols());
        for &i in &members {
            centroid += &x.row(i);
        }
        centroid /= members.len() as f64;

        scatters[idx] = members
            .iter()
            .map(|&i| euclidean_distance(&x.row(i), &centroid.view()))
            .sum::<f64>()
            / members.len() as f64;
        centroids.row_mut(idx).assign(&centroid);
    }

    (clusters, centroids, scatters)
}
