//! Configuration for network generation
//!
//! Every field has a default, so an empty YAML file (or no file at all) gives
//! the stock multi-tumor GCH1 network.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Id and label of the central node
    pub hub_id: String,

    /// Page title
    pub title: String,

    /// Line shown under the title
    pub subtitle: String,

    /// Minimum |PCC| for a gene to be kept
    pub min_correlation: f64,

    /// Cap on genes kept per tumor (strongest |PCC| first)
    pub max_genes_per_tumor: usize,

    /// Header of the gene symbol column
    pub gene_column: String,

    /// Header of the correlation column
    pub correlation_column: String,

    /// Tumor ids to load, in display order. Empty means every CSV in the data directory.
    pub tumors: Vec<String>,

    pub hub_color: String,

    /// Tumor id -> colour
    pub tumor_colors: BTreeMap<String, String>,

    /// Colour for tumors missing from `tumor_colors`
    pub default_tumor_color: String,

    pub cross_tumor_color: String,
    pub cross_tumor_border: String,

    /// Gene node size range in pixels
    pub node_size_range: (f64, f64),

    /// Tumor -> gene edge width range
    pub edge_width_range: (f64, f64),

    pub hub_size: f64,
    pub tumor_size: f64,

    /// Distance of tumor seed positions from the hub
    pub tumor_radius: f64,

    pub physics: PhysicsConfig,

    pub canvas: CanvasConfig,
}

/// forceAtlas2Based solver settings, passed straight through to vis-network
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub enabled: bool,
    pub solver: String,
    pub gravitational_constant: f64,
    pub central_gravity: f64,
    pub spring_length: f64,
    pub spring_constant: f64,
    pub damping: f64,
    pub avoid_overlap: f64,
    pub stabilization_iterations: u32,
    pub update_interval: u32,
}

/// Size and background of the network canvas
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: String,
    pub height: String,
    pub background: String,
}

impl Default for Config {
    fn default() -> Self {
        let tumor_colors = [
            ("BLCA Tumor", "#3D9970"),
            ("CESC Tumor", "#0074D9"),
            ("LIHC Tumor", "#FFDC00"),
            ("OV Tumor", "#FF4081"),
            ("PAAD Tumor", "#01FF70"),
            ("SARC Tumor", "#B10DC9"),
            ("SKCM Tumor", "#7FDBFF"),
            ("STAD Tumor", "#FF851B"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            hub_id: "GCH1".to_string(),
            title: "Multi-Tumor Network with GCH1 as Central Node".to_string(),
            subtitle: "Visualization of GCH1 gene correlations with multiple tumor types and associated genes"
                .to_string(),
            min_correlation: 0.5,
            max_genes_per_tumor: 1000,
            gene_column: "Gene Symbol".to_string(),
            correlation_column: "PCC".to_string(),
            tumors: Vec::new(),
            hub_color: "#FF4136".to_string(),
            tumor_colors,
            default_tumor_color: "#FF9800".to_string(),
            cross_tumor_color: "#FF9800".to_string(),
            cross_tumor_border: "#E65100".to_string(),
            node_size_range: (5.0, 12.0),
            edge_width_range: (0.3, 2.0),
            hub_size: 25.0,
            tumor_size: 15.0,
            tumor_radius: 300.0,
            physics: PhysicsConfig::default(),
            canvas: CanvasConfig::default(),
        }
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            solver: "forceAtlas2Based".to_string(),
            gravitational_constant: -100.0,
            central_gravity: 0.1,
            spring_length: 150.0,
            spring_constant: 0.08,
            damping: 0.3,
            avoid_overlap: 0.2,
            stabilization_iterations: 3000,
            update_interval: 25,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: "1000px".to_string(),
            height: "800px".to_string(),
            background: "#ffffff".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.hub_id.trim().is_empty() {
            anyhow::bail!("hub_id must not be empty");
        }

        if !(0.0..=1.0).contains(&self.min_correlation) {
            anyhow::bail!(
                "min_correlation must be within [0, 1], got {}",
                self.min_correlation
            );
        }

        if self.max_genes_per_tumor == 0 {
            anyhow::bail!("max_genes_per_tumor must be at least 1");
        }

        let (size_min, size_max) = self.node_size_range;
        if !(size_min > 0.0 && size_min <= size_max) {
            anyhow::bail!(
                "node_size_range must satisfy 0 < min <= max, got ({}, {})",
                size_min,
                size_max
            );
        }

        let (width_min, width_max) = self.edge_width_range;
        if !(width_min > 0.0 && width_min <= width_max) {
            anyhow::bail!(
                "edge_width_range must satisfy 0 < min <= max, got ({}, {})",
                width_min,
                width_max
            );
        }

        if self.gene_column.trim().is_empty() || self.correlation_column.trim().is_empty() {
            anyhow::bail!("gene_column and correlation_column must be set");
        }

        Ok(())
    }

    /// Colour for a tumor id.
    ///
    /// `"BLCA"` and `"BLCA Tumor"` resolve to the same palette entry.
    pub fn tumor_color(&self, tumor_id: &str) -> &str {
        if let Some(color) = self.tumor_colors.get(tumor_id) {
            return color;
        }
        let code = tumor_code(tumor_id);
        self.tumor_colors
            .iter()
            .find(|(key, _)| tumor_code(key).eq_ignore_ascii_case(code))
            .map(|(_, color)| color.as_str())
            .unwrap_or(&self.default_tumor_color)
    }
}

fn tumor_code(id: &str) -> &str {
    id.trim().strip_suffix(" Tumor").unwrap_or(id.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml() {
        let yaml = r##"
min_correlation: 0.6
max_genes_per_tumor: 25
tumors: ["BLCA Tumor", "CESC Tumor"]
tumor_colors:
  BLCA Tumor: "#123456"
physics:
  spring_length: 80
"##;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.min_correlation, 0.6);
        assert_eq!(config.max_genes_per_tumor, 25);
        assert_eq!(config.tumors.len(), 2);
        assert_eq!(config.tumor_color("BLCA Tumor"), "#123456");
        assert_eq!(config.physics.spring_length, 80.0);
        // untouched fields keep their defaults
        assert_eq!(config.hub_id, "GCH1");
        assert_eq!(config.physics.damping, 0.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.min_correlation, 0.5);
        assert_eq!(config.max_genes_per_tumor, 1000);
        assert_eq!(config.tumor_colors.len(), 8);
    }

    #[test]
    fn test_tumor_color_lookup() {
        let config = Config::default();
        assert_eq!(config.tumor_color("CESC Tumor"), "#0074D9");
        assert_eq!(config.tumor_color("CESC"), "#0074D9");
        assert_eq!(config.tumor_color("cesc"), "#0074D9");
        assert_eq!(config.tumor_color("GBM Tumor"), "#FF9800");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.min_correlation = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_genes_per_tumor = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.node_size_range = (12.0, 5.0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.hub_id = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
