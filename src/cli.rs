//! Command-line interface definitions and argument parsing

use clap::Parser;

/// Consumer segmentation CLI using K-Means and DBSCAN on transaction data
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input transactions CSV file
    #[arg(short, long, default_value = "data/transactions.csv")]
    pub input: String,

    /// Base output path for the generated charts (PNG)
    #[arg(short, long, default_value = "segments.png")]
    pub output: String,

    /// Fixed number of clusters for K-Means (searched automatically if omitted)
    #[arg(short = 'k', long)]
    pub clusters: Option<usize>,

    /// Upper bound for the automatic K-Means cluster-count search
    #[arg(long, default_value = "10")]
    pub max_clusters: usize,

    /// DBSCAN neighborhood radius (grid-searched together with min-samples if omitted)
    #[arg(long)]
    pub eps: Option<f64>,

    /// DBSCAN minimum neighbor count (grid-searched together with eps if omitted)
    #[arg(long)]
    pub min_samples: Option<usize>,

    /// Seed for the K-Means random initialization
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Search configuration derived from the command-line flags
    pub fn search_config(&self) -> crate::model::SearchConfig {
        crate::model::SearchConfig {
            seed: self.seed,
            max_clusters: self.max_clusters,
            ..crate::model::SearchConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["segmint"]);
        assert_eq!(args.input, "data/transactions.csv");
        assert_eq!(args.max_clusters, 10);
        assert_eq!(args.seed, 42);
        assert!(args.clusters.is_none());
        assert!(args.eps.is_none());
    }

    #[test]
    fn test_search_config_from_args() {
        let args = Args::parse_from(["segmint", "--seed", "7", "--max-clusters", "6"]);
        let config = args.search_config();
        assert_eq!(config.seed, 7);
        assert_eq!(config.max_clusters, 6);
    }
}
