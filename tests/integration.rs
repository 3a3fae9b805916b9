//! Integration tests for the segmentation pipeline

use segmint::{
    build_profiles, evaluate_partition, load_transactions, model, normalize_cluster_labels,
    prepare_features, RunParams, SearchConfig, NOISE,
};
use std::collections::BTreeSet;
use std::io::Write;
use tempfile::NamedTempFile;

const HEADER: &str =
    "product_id,user_id,discounted_price,actual_price,discount_percentage,rating,category";

/// Small messy CSV in the shape of a real e-commerce export
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();

    // U001: two electronics purchases, moderate discounts
    writeln!(file, "P001,U001,\"₹399\",\"₹1,099\",64%,4.2,Electronics|Cables|USB").unwrap();
    writeln!(file, "P002,U001,\"₹1,499\",\"₹2,999\",50%,4.0,Electronics|Audio|Headphones").unwrap();
    // U002: single cheap home purchase, comma-packed id
    writeln!(file, "P003,\"U002,U777\",\"₹149\",\"₹349\",57%,3.9,Home|Kitchen").unwrap();
    // U003: expensive purchases, low discount, textual rating on one row
    writeln!(file, "P004,U003,\"₹15,999\",\"₹19,999\",20%,4.5,Electronics|Computers").unwrap();
    writeln!(file, "P005,U003,\"₹12,499\",\"₹13,999\",11%,not rated,Electronics|Computers").unwrap();
    // missing user id lands in the Unknown bucket
    writeln!(file, "P006,,\"₹299\",\"₹599\",50%,4.1,Home|Decor").unwrap();

    file
}

/// 100 synthetic consumers forming two well-separated behavioral groups:
/// bargain hunters (cheap, heavily discounted) and premium buyers
fn create_two_segment_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();

    for i in 0..50 {
        let price = 100 + (i % 10) * 5;
        let discount = 60 + (i % 5);
        writeln!(
            file,
            "P{i},BARGAIN{i:03},₹{price},₹{},{discount}%,4.0,Home|Kitchen",
            price * 3
        )
        .unwrap();
    }
    for i in 0..50 {
        let price = 20000 + (i % 10) * 500;
        let discount = 5 + (i % 5);
        writeln!(
            file,
            "P{},PREMIUM{i:03},\"₹{price}\",\"₹{}\",{discount}%,4.5,Electronics|Computers",
            i + 50,
            price + 2000
        )
        .unwrap();
    }

    file
}

#[test]
fn test_consumer_bijection() {
    let file = create_test_csv();
    let transactions = load_transactions(file.path().to_str().unwrap()).unwrap();
    let table = build_profiles(&transactions);

    // every raw consumer id appears exactly once in the profile table
    let raw_ids: BTreeSet<&str> = transactions.iter().map(|t| t.user_id.as_str()).collect();
    let profile_ids: Vec<&str> = table.profiles.iter().map(|p| p.user_id.as_str()).collect();
    let unique_profile_ids: BTreeSet<&str> = profile_ids.iter().copied().collect();

    assert_eq!(profile_ids.len(), unique_profile_ids.len());
    assert_eq!(raw_ids, unique_profile_ids);
    // the missing id landed in the Unknown bucket
    assert!(unique_profile_ids.contains("Unknown"));
}

#[test]
fn test_feature_matrix_invariants() {
    let file = create_test_csv();
    let transactions = load_transactions(file.path().to_str().unwrap()).unwrap();
    let table = build_profiles(&transactions);
    let matrix = prepare_features(&table).unwrap();

    assert_eq!(matrix.n_samples(), table.profiles.len());
    assert!(matrix.x.iter().all(|v| v.is_finite()));

    // retained columns keep real variance
    for j in 0..matrix.n_features() {
        let col: Vec<f64> = matrix.x.column(j).to_vec();
        let mean = col.iter().sum::<f64>() / col.len() as f64;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
        assert!(var > 1e-8, "column {j} has near-zero variance");
    }
}

#[test]
fn test_two_segments_end_to_end() {
    let file = create_two_segment_csv();
    let transactions = load_transactions(file.path().to_str().unwrap()).unwrap();
    let table = build_profiles(&transactions);
    assert_eq!(table.profiles.len(), 100);

    let matrix = prepare_features(&table).unwrap();
    let config = SearchConfig::default();

    // with two well-separated groups the search should settle on k=2
    let run = model::apply_kmeans(&matrix.x, None, &config).unwrap();
    assert_eq!(run.params, RunParams::KMeans { n_clusters: 2 });

    let metrics = evaluate_partition(&matrix.x, &run.labels);
    assert!(metrics.silhouette.unwrap() > 0.5);

    // the two segments never mix bargain hunters and premium buyers
    let normalized = normalize_cluster_labels(&run.labels);
    let bargain_labels: BTreeSet<i64> = table
        .profiles
        .iter()
        .zip(&normalized)
        .filter(|(p, _)| p.user_id.starts_with("BARGAIN"))
        .map(|(_, &l)| l)
        .collect();
    let premium_labels: BTreeSet<i64> = table
        .profiles
        .iter()
        .zip(&normalized)
        .filter(|(p, _)| p.user_id.starts_with("PREMIUM"))
        .map(|(_, &l)| l)
        .collect();
    assert_eq!(bargain_labels.len(), 1);
    assert_eq!(premium_labels.len(), 1);
    assert_ne!(bargain_labels, premium_labels);
}

#[test]
fn test_pipeline_is_deterministic() {
    let file = create_two_segment_csv();
    let path = file.path().to_str().unwrap();

    let run = |path: &str| {
        let transactions = load_transactions(path).unwrap();
        let table = build_profiles(&transactions);
        let matrix = prepare_features(&table).unwrap();
        let config = SearchConfig::default();
        let kmeans = model::apply_kmeans(&matrix.x, None, &config).unwrap();
        let dbscan = model::apply_dbscan(&matrix.x, None, None, &config).unwrap();
        (kmeans.labels, kmeans.params, dbscan.labels, dbscan.params)
    };

    let first = run(path);
    let second = run(path);
    assert_eq!(first.0, second.0);
    assert_eq!(first.1, second.1);
    assert_eq!(first.2, second.2);
    assert_eq!(first.3, second.3);
}

#[test]
fn test_dbscan_end_to_end() {
    let file = create_two_segment_csv();
    let transactions = load_transactions(file.path().to_str().unwrap()).unwrap();
    let table = build_profiles(&transactions);
    let matrix = prepare_features(&table).unwrap();

    let config = SearchConfig::default();
    let run = model::apply_dbscan(&matrix.x, None, None, &config).unwrap();
    let metrics = evaluate_partition(&matrix.x, &run.labels);

    // counts always reported, label array aligned to the matrix
    assert_eq!(run.labels.len(), matrix.n_samples());
    assert_eq!(
        metrics.n_noise,
        run.labels.iter().filter(|&&l| l == NOISE).count()
    );

    // normalized labels form a dense 1-based set
    let normalized = normalize_cluster_labels(&run.labels);
    let distinct: BTreeSet<i64> = normalized.iter().copied().collect();
    let expected: BTreeSet<i64> = (1..=distinct.len() as i64).collect();
    assert_eq!(distinct, expected);
}

#[test]
fn test_identical_consumers_fail_with_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for i in 0..10 {
        writeln!(file, "P{i},U{i:03},₹100,₹200,50%,4.0,Electronics|Audio").unwrap();
    }

    let transactions = load_transactions(file.path().to_str().unwrap()).unwrap();
    let table = build_profiles(&transactions);
    let result = prepare_features(&table);

    let err = result.unwrap_err().to_string();
    assert!(err.contains("variance"), "unexpected error: {err}");
}

#[test]
fn test_missing_column_is_fatal() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "product_id,user_id,discounted_price").unwrap();
    writeln!(file, "P001,U001,₹399").unwrap();

    let result = load_transactions(file.path().to_str().unwrap());
    assert!(result.is_err());
}
