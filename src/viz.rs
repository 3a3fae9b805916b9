//! Chart rendering and console summaries for computed segments
//!
//! Read-only over the labeled profiles and metrics: renders a scatter of the
//! first two feature dimensions colored by segment, a segment-size bar chart,
//! and per-segment summary tables, for each algorithm side by side.

use crate::features::FeatureMatrix;
use crate::metrics::ClusterMetrics;
use crate::profile::ProfileTable;
use plotters::prelude::*;
use std::collections::BTreeMap;

/// Color palette for different segments
const SEGMENT_COLORS: [RGBColor; 8] = [RED, BLUE, GREEN, MAGENTA, CYAN, YELLOW, BLACK, RGBColor(255, 140, 0)];

fn segment_color(label: i64) -> RGBColor {
    // normalized labels start at 1
    let idx = (label.max(1) - 1) as usize % SEGMENT_COLORS.len();
    SEGMENT_COLORS[idx]
}

/// Number of consumers per segment, ordered by label
pub fn segment_sizes(labels: &[i64]) -> BTreeMap<i64, usize> {
    let mut sizes = BTreeMap::new();
    for &label in labels {
        *sizes.entry(label).or_insert(0) += 1;
    }
    sizes
}

/// Scatter plot of the first two feature dimensions colored by segment
pub fn create_segment_scatter(
    matrix: &FeatureMatrix,
    labels: &[i64],
    output_path: &str,
    title: &str,
) -> crate::Result<()> {
    if matrix.n_features() < 2 {
        println!("Skipping scatter plot: fewer than two feature dimensions");
        return Ok(());
    }

    let xs: Vec<f64> = matrix.x.column(0).to_vec();
    let ys: Vec<f64> = matrix.x.column(1).to_vec();

    let x_min = xs.iter().copied().fold(f64::INFINITY, f64::min) - 0.5;
    let x_max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max) + 0.5;
    let y_min = ys.iter().copied().fold(f64::INFINITY, f64::min) - 0.5;
    let y_max = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max) + 0.5;

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc(format!("{} (normalized)", matrix.feature_names[0]))
        .y_desc(format!("{} (normalized)", matrix.feature_names[1]))
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, (&x, &y)) in xs.iter().zip(ys.iter()).enumerate() {
        let color = segment_color(labels[i]);
        chart.draw_series(std::iter::once(Circle::new((x, y), 4, color.filled())))?;
    }

    root.present()?;
    println!("Segment scatter saved to: {output_path}");
    Ok(())
}

/// Bar chart of segment sizes
pub fn create_segment_size_chart(labels: &[i64], output_path: &str, title: &str) -> crate::Result<()> {
    let sizes = segment_sizes(labels);
    let max_size = sizes.values().copied().max().unwrap_or(1) as f64;
    let max_label = sizes.keys().copied().max().unwrap_or(1) as f64;

    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..(max_label + 1.0), 0.0..(max_size * 1.1))?;

    chart
        .configure_mesh()
        .x_desc("Segment")
        .y_desc("Number of Consumers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (&label, &size) in &sizes {
        let color = segment_color(label);
        let center = label as f64;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(center - 0.4, 0.0), (center + 0.4, size as f64)],
            color.filled(),
        )))?;
    }

    root.present()?;
    println!("Segment size chart saved to: {output_path}");
    Ok(())
}

/// Print per-segment summary tables and quality metrics to the console
pub fn print_segment_summary(
    table: &ProfileTable,
    labels: &[i64],
    metrics: &ClusterMetrics,
    algorithm: &str,
) {
    println!("\n=== {algorithm} Segments ===");
    println!("Clusters: {}", metrics.n_clusters);
    println!(
        "Outliers: {} ({:.1}%)",
        metrics.n_noise,
        metrics.noise_ratio * 100.0
    );
    println!("Silhouette: {:.3}", metrics.silhouette_or_sentinel());
    println!("Davies-Bouldin: {:.3}", metrics.davies_bouldin_or_sentinel());
    println!(
        "Calinski-Harabasz: {:.1}",
        metrics.calinski_harabasz_or_sentinel()
    );

    println!("\n  Segment |  Size |  Share | Avg Price | Avg Discount | Top Category");
    println!("  --------|-------|--------|-----------|--------------|-------------");
    for (&label, &size) in &segment_sizes(labels) {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == label)
            .map(|(i, _)| i)
            .collect();

        let avg_price = members.iter().map(|&i| table.profiles[i].avg_price).sum::<f64>()
            / members.len() as f64;
        let avg_discount = members
            .iter()
            .map(|&i| table.profiles[i].avg_discount)
            .sum::<f64>()
            / members.len() as f64;

        let mut category_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for &i in &members {
            *category_counts
                .entry(table.profiles[i].favorite_category.as_str())
                .or_insert(0) += 1;
        }
        let top_category = category_counts
            .iter()
            .max_by_key(|(_, &count)| count)
            .map(|(cat, _)| *cat)
            .unwrap_or("Unknown");

        let share = size as f64 / labels.len() as f64 * 100.0;
        println!(
            "  {label:7} | {size:5} | {share:5.1}% | {avg_price:9.2} | {avg_discount:12.2} | {top_category}"
        );
    }
}

/// Render charts and console summaries for one algorithm's results
pub fn generate_segment_report(
    matrix: &FeatureMatrix,
    table: &ProfileTable,
    labels: &[i64],
    metrics: &ClusterMetrics,
    algorithm: &str,
    base_output_path: &str,
) -> crate::Result<()> {
    let tag = algorithm.to_lowercase();
    let scatter_path = base_output_path.replace(".png", &format!("_{tag}.png"));
    let sizes_path = base_output_path.replace(".png", &format!("_{tag}_sizes.png"));

    create_segment_scatter(
        matrix,
        labels,
        &scatter_path,
        &format!("Consumer Segments ({algorithm})"),
    )?;
    create_segment_size_chart(labels, &sizes_path, &format!("Segment Sizes ({algorithm})"))?;
    print_segment_summary(table, labels, metrics, algorithm);

    Ok(())
}
