//! Segmint: consumer segmentation CLI
//!
//! Orchestrates the full pipeline: load transactions, aggregate consumer
//! profiles, build the feature matrix, cluster with K-Means and DBSCAN,
//! score both partitions, normalize the labels, and render the reports.

use anyhow::Result;
use clap::Parser;
use segmint::{
    build_profiles, evaluate_partition, features, load_transactions, model, normalize_cluster_labels,
    prepare_features, viz, Args,
};
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        println!("Segmint - Consumer Segmentation with K-Means and DBSCAN");
        println!("=======================================================\n");
    }

    run_pipeline(&args)
}

fn run_pipeline(args: &Args) -> Result<()> {
    let start_time = Instant::now();
    let config = args.search_config();

    // Step 1: load and clean the raw transactions
    if args.verbose {
        println!("Step 1: Loading transactions");
        println!("  Input file: {}", args.input);
    }
    let load_start = Instant::now();
    let transactions = load_transactions(&args.input)?;
    println!("✓ Loaded {} transactions", transactions.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", load_start.elapsed().as_secs_f64());
    }

    // Step 2: aggregate into consumer profiles and build the feature matrix
    if args.verbose {
        println!("\nStep 2: Building consumer profiles");
    }
    let table = build_profiles(&transactions);
    let matrix = prepare_features(&table)?;
    println!(
        "✓ Profiles built: {} consumers, {} features",
        matrix.n_samples(),
        matrix.n_features()
    );
    if args.verbose {
        println!("  Features: {}", matrix.feature_names.join(", "));
        println!("  Observed categories: {}", table.categories.len());
        println!("  Feature importance:");
        for (name, score) in features::feature_importance(&matrix) {
            println!("    {name}: {score:.3}");
        }
    }

    // Step 3: K-Means search and evaluation
    if args.verbose {
        println!("\nStep 3: K-Means partitioning");
    }
    let kmeans_start = Instant::now();
    let kmeans_run = model::apply_kmeans(&matrix.x, args.clusters, &config)?;
    let kmeans_metrics = evaluate_partition(&matrix.x, &kmeans_run.labels);
    let kmeans_labels = normalize_cluster_labels(&kmeans_run.labels);

    println!("✓ K-Means finished: {}", kmeans_run.params);
    println!(
        "  Silhouette: {:.3}",
        kmeans_metrics.silhouette_or_sentinel()
    );
    println!("  Distribution: {:?}", viz::segment_sizes(&kmeans_labels));
    if args.verbose {
        println!("  Search time: {:.2}s", kmeans_start.elapsed().as_secs_f64());
    }

    // Step 4: DBSCAN search and evaluation, independent of the K-Means run
    if args.verbose {
        println!("\nStep 4: DBSCAN partitioning");
    }
    let dbscan_start = Instant::now();
    let dbscan_run = model::apply_dbscan(&matrix.x, args.eps, args.min_samples, &config)?;
    let dbscan_metrics = evaluate_partition(&matrix.x, &dbscan_run.labels);
    let dbscan_labels = normalize_cluster_labels(&dbscan_run.labels);

    println!("✓ DBSCAN finished: {}", dbscan_run.params);
    println!(
        "  Silhouette: {:.3}",
        dbscan_metrics.silhouette_or_sentinel()
    );
    println!(
        "  Outliers: {} ({:.1}%)",
        dbscan_metrics.n_noise,
        dbscan_metrics.noise_ratio * 100.0
    );
    println!("  Distribution: {:?}", viz::segment_sizes(&dbscan_labels));
    if args.verbose {
        println!("  Search time: {:.2}s", dbscan_start.elapsed().as_secs_f64());
    }

    // Step 5: render both reports
    if args.verbose {
        println!("\nStep 5: Rendering segment reports");
    }
    viz::generate_segment_report(
        &matrix,
        &table,
        &kmeans_labels,
        &kmeans_metrics,
        "KMeans",
        &args.output,
    )?;
    viz::generate_segment_report(
        &matrix,
        &table,
        &dbscan_labels,
        &dbscan_metrics,
        "DBSCAN",
        &args.output,
    )?;

    println!("\n=== Pipeline Complete ===");
    println!(
        "Total processing time: {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
