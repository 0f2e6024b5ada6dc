//! gch1-network: interactive multi-tumor correlation network centred on GCH1
//!
//! Reads one correlation table per tumor type, keeps genes whose |PCC| with
//! the hub gene passes a threshold, and writes a standalone vis-network page:
//! hub -> tumor types -> correlated genes, with genes shared by several tumors
//! drawn once as diamond nodes.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

mod classify;
mod config;
mod error;
mod filter;
mod graph;
mod loader;
mod render;

use crate::config::Config;
use crate::graph::{Network, NodeKind};
use crate::render::RunInfo;

/// Build the GCH1 multi-tumor correlation network
#[derive(Parser, Debug)]
#[command(name = "gch1-network")]
#[command(version)]
#[command(about = "Generate an interactive GCH1-centred gene correlation network from per-tumor CSV files")]
struct Args {
    /// Directory with one CSV per tumor type (file stem = tumor id)
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Output file (.html page, or .json payload)
    #[arg(short, long, default_value = "output/multi_tumor_network.html")]
    output: PathBuf,

    /// YAML configuration file (palette, physics, column names, ...)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Minimum |PCC| to keep a gene (overrides config)
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Maximum genes per tumor, strongest first (overrides config)
    #[arg(long)]
    max_genes: Option<usize>,

    /// Page title (overrides config)
    #[arg(long)]
    title: Option<String>,

    /// Open the generated file in the default browser
    #[arg(long)]
    open: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    info!("gch1-network v{}", env!("CARGO_PKG_VERSION"));

    let start_time = std::time::Instant::now();
    let config = resolve_config(&args)?;

    let (network, run) = run_pipeline(&args.data_dir, &config)?;
    log_stats(&network, &run);

    render::write_network(&network, &config, &run, &args.output)
        .with_context(|| format!("Failed to write network to {}", args.output.display()))?;

    info!(
        "Visualization created in {:.2} seconds: {}",
        start_time.elapsed().as_secs_f64(),
        args.output.display()
    );

    if args.open {
        let target = args
            .output
            .canonicalize()
            .unwrap_or_else(|_| args.output.clone());
        if webbrowser::open(&target.to_string_lossy()).is_err() {
            warn!(
                "Could not open browser automatically. Please open: {}",
                target.display()
            );
        }
    }

    Ok(())
}

/// Config file (or defaults) with command-line overrides applied
fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration: {}", path.display());
            Config::from_yaml(path)?
        }
        None => Config::default(),
    };

    if let Some(threshold) = args.threshold {
        config.min_correlation = threshold;
    }
    if let Some(max_genes) = args.max_genes {
        config.max_genes_per_tumor = max_genes;
    }
    if let Some(title) = &args.title {
        config.title = title.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Load, filter, classify and build. Partial input is accepted; no usable tumor is an error.
fn run_pipeline(data_dir: &std::path::Path, config: &Config) -> Result<(Network, RunInfo)> {
    let loaded = loader::load_all(data_dir, config)?;
    if loaded.tumors.is_empty() {
        anyhow::bail!("No tumor data could be loaded from {}", data_dir.display());
    }

    let filtered = filter::filter_tumors(
        loaded.tumors,
        config.min_correlation,
        config.max_genes_per_tumor,
    );
    if filtered.tumors.is_empty() {
        anyhow::bail!(
            "No gene passes |PCC| >= {} in any tumor of {}",
            config.min_correlation,
            data_dir.display()
        );
    }

    let classification = classify::classify(&filtered.tumors);
    let network = graph::build_network(&filtered.tumors, &classification, config);
    network.check_invariants()?;

    if network.stats.tumor_gene_counts.is_empty() {
        anyhow::bail!(
            "No tumor of {} has a gene distinct from the hub and tumor ids",
            data_dir.display()
        );
    }

    // tumors whose genes were all dropped by the builder
    let mut empty = filtered.empty;
    for tumor in &filtered.tumors {
        if !network.nodes_of_kind(NodeKind::Tumor).any(|n| n.id == tumor.id) {
            empty.push(tumor.id.clone());
        }
    }

    let run = RunInfo {
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        data_dir: data_dir.display().to_string(),
        skipped: loaded.skipped,
        empty,
    };

    Ok((network, run))
}

fn log_stats(network: &Network, run: &RunInfo) {
    let stats = &network.stats;
    info!("Gene network statistics:");
    info!("  Total genes: {}", stats.total_genes);
    info!("  Tumor-specific genes: {}", stats.specific_genes);
    info!("  Cross-tumor genes: {}", stats.cross_tumor_genes);
    for (tumor, count) in &stats.tumor_gene_counts {
        info!("  {}: {} genes", tumor, count);
    }
    info!(
        "  {} nodes, {} edges ({} tumor-gene links)",
        network.nodes.len(),
        network.edges.len(),
        stats.total_gene_edges()
    );

    for skipped in &run.skipped {
        warn!("Not shown: {} ({})", skipped.id, skipped.reason);
    }
    for empty in &run.empty {
        warn!("Not shown: {} (no gene left after filtering)", empty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("BLCA Tumor.csv"),
            "Gene Symbol,PCC\nIRF1,0.62\nLAP3,0.55\nIFNG,-0.51\nXYZ,0.3\nBAD,oops\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("CESC Tumor.csv"),
            "Gene Symbol,PCC\nUGT2A1,0.71\nCXCL9,0.64\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("SKCM Tumor.csv"),
            "Gene Symbol,PCC\nUGT2A1,0.58\nGBP4,0.2\n",
        )
        .unwrap();
        fs::write(dir.path().join("OV Tumor.csv"), "Gene Symbol,PCC\nLOW,0.1\n").unwrap();
        fs::write(dir.path().join("PAAD Tumor.csv"), "Symbol,Value\nA,0.9\n").unwrap();
        dir
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let dir = fixture();
        let (network, run) = run_pipeline(dir.path(), &Config::default()).unwrap();

        let tumors: Vec<&str> = network
            .nodes_of_kind(NodeKind::Tumor)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(tumors, vec!["BLCA Tumor", "CESC Tumor", "SKCM Tumor"]);

        assert_eq!(run.skipped.len(), 1);
        assert_eq!(run.skipped[0].id, "PAAD Tumor");
        assert_eq!(run.empty, vec!["OV Tumor".to_string()]);

        let ugt = network.node("UGT2A1").unwrap();
        assert_eq!(ugt.kind, NodeKind::GeneCrossTumor);
        assert_eq!(network.incoming("UGT2A1").len(), 2);
        assert_eq!(network.nodes_of_kind(NodeKind::GeneSpecific).count(), 4);
        assert!(network.node("XYZ").is_none());
        assert!(network.node("GBP4").is_none());
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let dir = fixture();
        let (a, _) = run_pipeline(dir.path(), &Config::default()).unwrap();
        let (b, _) = run_pipeline(dir.path(), &Config::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pipeline_fails_without_usable_data() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("OV Tumor.csv"), "Gene Symbol,PCC\nLOW,0.1\n").unwrap();
        assert!(run_pipeline(dir.path(), &Config::default()).is_err());

        let empty = tempfile::tempdir().unwrap();
        assert!(run_pipeline(empty.path(), &Config::default()).is_err());
    }

    #[test]
    fn test_tumor_with_only_colliding_genes_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("BLCA Tumor.csv"),
            "Gene Symbol,PCC\nGCH1,0.9\nCESC Tumor,0.8\n",
        )
        .unwrap();
        fs::write(dir.path().join("CESC Tumor.csv"), "Gene Symbol,PCC\nCXCL9,0.64\n").unwrap();

        let (network, run) = run_pipeline(dir.path(), &Config::default()).unwrap();
        assert!(network.node("BLCA Tumor").is_none());
        assert_eq!(run.empty, vec!["BLCA Tumor".to_string()]);
    }

    #[test]
    fn test_pipeline_fails_when_only_hub_remains() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("BLCA Tumor.csv"), "Gene Symbol,PCC\nGCH1,1.0\n").unwrap();
        assert!(run_pipeline(dir.path(), &Config::default()).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "gch1-network",
            "--threshold",
            "0.6",
            "--max-genes",
            "25",
            "--title",
            "BLCA only",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.min_correlation, 0.6);
        assert_eq!(config.max_genes_per_tumor, 25);
        assert_eq!(config.title, "BLCA only");

        let bad = Args::parse_from(["gch1-network", "--threshold", "2"]);
        assert!(resolve_config(&bad).is_err());
    }
}
