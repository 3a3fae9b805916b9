//! Canonical renumbering of cluster labels
//!
//! K-Means and DBSCAN hand back whatever label values fall out of the
//! algorithm. The presentation layer wants a small dense ordered set, so raw
//! labels are remapped to consecutive integers starting at 1, with the
//! outlier sentinel always last.

use std::collections::BTreeMap;

/// Label value for points not assigned to any cluster
pub const NOISE: i64 = -1;

/// Remap arbitrary cluster labels to consecutive integers starting at 1.
///
/// New numbers are assigned in ascending order of the original label values,
/// so the result is deterministic regardless of which algorithm produced the
/// input. The outlier sentinel, when present, becomes one value higher than
/// the last real cluster.
pub fn normalize_cluster_labels(labels: &[i64]) -> Vec<i64> {
    let mapping: BTreeMap<i64, i64> = labels
        .iter()
        .filter(|&&l| l != NOISE)
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .zip(1i64..)
        .map(|(&old, new)| (old, new))
        .collect();

    let noise_label = mapping.len() as i64 + 1;
    labels
        .iter()
        .map(|&l| if l == NOISE { noise_label } else { mapping[&l] })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_normalized_input() {
        assert_eq!(normalize_cluster_labels(&[1, 2, 3, -1]), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_non_contiguous_labels() {
        // cluster 2 -> 1, cluster 5 -> 2, outlier -> 3
        assert_eq!(normalize_cluster_labels(&[5, 5, 2, -1, 2]), vec![2, 2, 1, 3, 1]);
    }

    #[test]
    fn test_zero_based_kmeans_labels() {
        assert_eq!(normalize_cluster_labels(&[0, 1, 0, 2]), vec![1, 2, 1, 3]);
    }

    #[test]
    fn test_no_noise_present() {
        assert_eq!(normalize_cluster_labels(&[7, 3, 3, 7]), vec![2, 1, 1, 2]);
    }

    #[test]
    fn test_all_noise() {
        assert_eq!(normalize_cluster_labels(&[-1, -1, -1]), vec![1, 1, 1]);
    }

    #[test]
    fn test_idempotent_on_normalized_output() {
        let raw = vec![9, -1, 4, 4, 9];
        let once = normalize_cluster_labels(&raw);
        // a second pass only has to renumber the former noise bucket, which
        // is now an ordinary (last) cluster
        assert_eq!(once, vec![2, 3, 1, 1, 2]);
        assert_eq!(normalize_cluster_labels(&once), once);
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize_cluster_labels(&[]).is_empty());
    }
}
