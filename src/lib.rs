//! Segmint: consumer segmentation from e-commerce transaction records
//!
//! This library turns raw purchase rows into per-consumer feature vectors,
//! clusters consumers with K-Means and DBSCAN, scores the partitions with
//! internal validation metrics, and renders the resulting segments.

pub mod cli;
pub mod data;
pub mod features;
pub mod labels;
pub mod metrics;
pub mod model;
pub mod profile;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_transactions, Transaction};
pub use features::{prepare_features, FeatureMatrix};
pub use labels::{normalize_cluster_labels, NOISE};
pub use metrics::{evaluate_partition, ClusterMetrics};
pub use model::{apply_dbscan, apply_kmeans, ClusterRun, RunParams, SearchConfig};
pub use profile::{build_profiles, ConsumerProfile, ProfileTable};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
