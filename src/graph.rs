//! Three-tier network construction: hub -> tumor -> gene
//!
//! Construction is deterministic. Node and edge order follow tumor order,
//! then gene strength, so the same input always yields the same payload.

use crate::classify::{Classification, CrossTumorGene, SpecificGene};
use crate::config::Config;
use crate::loader::TumorGenes;
use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::PI;

const HUB_EDGE_WEIGHT: f64 = 1.0;
const HUB_EDGE_WIDTH: f64 = 2.0;
const HUB_EDGE_COLOR: &str = "rgba(150,150,150,0.8)";
const GENES_PER_SPIRAL_TURN: f64 = 20.0;
const CROSS_TUMOR_PULL: f64 = 0.6;

/// Node category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Hub,
    Tumor,
    GeneSpecific,
    GeneCrossTumor,
}

impl NodeKind {
    /// Tier in the hub -> tumor -> gene hierarchy
    pub fn tier(&self) -> usize {
        match self {
            NodeKind::Hub => 0,
            NodeKind::Tumor => 1,
            NodeKind::GeneSpecific | NodeKind::GeneCrossTumor => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    Dot,
    Diamond,
}

impl std::fmt::Display for NodeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeShape::Dot => write!(f, "dot"),
            NodeShape::Diamond => write!(f, "diamond"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeColor {
    pub background: String,
    pub border: String,
}

impl NodeColor {
    fn solid(color: &str) -> Self {
        Self {
            background: color.to_string(),
            border: color.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub size: f64,
    pub color: NodeColor,
    pub shape: NodeShape,
    /// Tooltip, one entry per line
    pub title: Vec<String>,
    pub border_width: f64,
    pub font_size: u32,
    /// Seed position for the layout
    pub x: Option<f64>,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    /// |PCC|, or 1.0 for hub edges
    pub weight: f64,
    pub width: f64,
    pub color: String,
    pub opacity: f64,
    pub title: Option<String>,
}

/// Counts reported after a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NetworkStats {
    pub total_genes: usize,
    pub specific_genes: usize,
    pub cross_tumor_genes: usize,
    /// Gene edges per tumor, in tumor order
    pub tumor_gene_counts: Vec<(String, usize)>,
}

impl NetworkStats {
    pub fn total_gene_edges(&self) -> usize {
        self.tumor_gene_counts.iter().map(|(_, n)| n).sum()
    }
}

/// Complete node/edge set handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Network {
    pub hub_id: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub stats: NetworkStats,
}

/// Linear size scale for gene nodes over `[threshold, 1]`
fn node_size(strength: f64, threshold: f64, range: (f64, f64)) -> f64 {
    let (lo, hi) = range;
    if threshold >= 1.0 {
        return hi;
    }
    let size = lo + (strength - threshold) * (hi - lo) / (1.0 - threshold);
    size.clamp(lo, hi)
}

/// Linear width scale over the observed gene edge weights
struct WidthScale {
    weight_min: f64,
    weight_max: f64,
    range: (f64, f64),
}

impl WidthScale {
    fn new<I: IntoIterator<Item = f64>>(weights: I, range: (f64, f64)) -> Self {
        let (weight_min, weight_max) = weights
            .into_iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), w| (lo.min(w), hi.max(w)));
        Self {
            weight_min,
            weight_max,
            range,
        }
    }

    fn width(&self, weight: f64) -> f64 {
        let (lo, hi) = self.range;
        let span = self.weight_max - self.weight_min;
        if !span.is_finite() || span <= f64::EPSILON {
            return hi;
        }
        (lo + (weight - self.weight_min) / span * (hi - lo)).clamp(lo, hi)
    }
}

/// Build the network from filtered tumors and their gene classification.
///
/// `tumors` fixes tumor order and colours; only tumors that still own at
/// least one gene get a node.
pub fn build_network(tumors: &[TumorGenes], classification: &Classification, config: &Config) -> Network {
    let hub_id = config.hub_id.clone();

    // gene ids may not shadow the hub or a tumor
    let mut reserved: HashSet<&str> = tumors.iter().map(|t| t.id.as_str()).collect();
    reserved.insert(hub_id.as_str());

    let specific: Vec<&SpecificGene> = classification
        .specific
        .iter()
        .filter(|g| keep_gene(&g.gene, &reserved))
        .collect();
    let cross: Vec<&CrossTumorGene> = classification
        .cross
        .iter()
        .filter(|g| keep_gene(&g.gene, &reserved))
        .collect();

    let populated: HashSet<&str> = specific
        .iter()
        .map(|g| g.association.tumor.as_str())
        .chain(cross.iter().flat_map(|g| g.associations.iter().map(|a| a.tumor.as_str())))
        .collect();
    let active: Vec<&TumorGenes> = tumors
        .iter()
        .filter(|t| populated.contains(t.id.as_str()))
        .collect();
    for t in tumors.iter().filter(|t| !populated.contains(t.id.as_str())) {
        warn!("{}: no gene left once id collisions are removed, tumor omitted", t.id);
    }

    let widths = WidthScale::new(
        specific
            .iter()
            .map(|g| g.association.strength())
            .chain(cross.iter().flat_map(|g| g.associations.iter().map(|a| a.strength()))),
        config.edge_width_range,
    );

    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    // 1. hub
    nodes.push(GraphNode {
        id: hub_id.clone(),
        kind: NodeKind::Hub,
        label: hub_id.clone(),
        size: config.hub_size,
        color: NodeColor::solid(&config.hub_color),
        shape: NodeShape::Dot,
        title: vec![format!("{} (Central Gene)", hub_id)],
        border_width: 2.0,
        font_size: 18,
        x: Some(0.0),
        y: Some(0.0),
    });

    // 2. tumors on a circle around the hub
    let mut positions: HashMap<&str, (f64, f64)> = HashMap::new();
    let mut colors: HashMap<&str, &str> = HashMap::new();
    for (idx, tumor) in active.iter().enumerate() {
        let angle = 2.0 * PI * idx as f64 / active.len() as f64;
        let (x, y) = (config.tumor_radius * angle.cos(), config.tumor_radius * angle.sin());
        positions.insert(tumor.id.as_str(), (x, y));
        colors.insert(tumor.id.as_str(), tumor.color.as_str());

        nodes.push(GraphNode {
            id: tumor.id.clone(),
            kind: NodeKind::Tumor,
            label: tumor.id.clone(),
            size: config.tumor_size,
            color: NodeColor::solid(&tumor.color),
            shape: NodeShape::Dot,
            title: vec![tumor.id.clone()],
            border_width: 2.0,
            font_size: 14,
            x: Some(x),
            y: Some(y),
        });
        edges.push(GraphEdge {
            source: hub_id.clone(),
            target: tumor.id.clone(),
            weight: HUB_EDGE_WEIGHT,
            width: HUB_EDGE_WIDTH,
            color: HUB_EDGE_COLOR.to_string(),
            opacity: 0.8,
            title: None,
        });
    }

    let mut gene_counts: HashMap<&str, usize> = HashMap::new();

    // 3. tumor-specific genes, strongest first within each tumor
    for tumor in &active {
        let (tx, ty) = positions[tumor.id.as_str()];
        let mut genes: Vec<&SpecificGene> = specific
            .iter()
            .copied()
            .filter(|g| g.association.tumor == tumor.id)
            .collect();
        genes.sort_by(|a, b| b.association.strength().total_cmp(&a.association.strength()));

        info!("{}: adding {} tumor-specific genes", tumor.id, genes.len());

        for (i, gene) in genes.iter().enumerate() {
            let weight = gene.association.strength();
            let r = gene.association.correlation;
            let angle = 2.0 * PI * i as f64 / GENES_PER_SPIRAL_TURN;
            let distance = 50.0 + 0.4 * i as f64;

            nodes.push(GraphNode {
                id: gene.gene.clone(),
                kind: NodeKind::GeneSpecific,
                label: gene.gene.clone(),
                size: node_size(weight, config.min_correlation, config.node_size_range),
                color: NodeColor::solid(&tumor.color),
                shape: NodeShape::Dot,
                title: vec![
                    gene.gene.clone(),
                    format!("PCC: {:.3}", r),
                    format!("Tumor: {}", tumor.id),
                ],
                border_width: 1.0,
                font_size: 8,
                x: Some(tx + distance * angle.cos()),
                y: Some(ty + distance * angle.sin()),
            });
            edges.push(GraphEdge {
                source: tumor.id.clone(),
                target: gene.gene.clone(),
                weight,
                width: widths.width(weight),
                color: tumor.color.clone(),
                opacity: 0.5,
                title: Some(format!("PCC: {:.3}", r)),
            });
            *gene_counts.entry(tumor.id.as_str()).or_default() += 1;
        }
    }

    // 4. cross-tumor genes, one shared node each
    for gene in &cross {
        let strength = gene.strength();
        let (mx, my) = positions
            .get(gene.main_tumor())
            .copied()
            .unwrap_or((0.0, 0.0));

        let mut title = vec![
            gene.gene.clone(),
            "Cross-tumor gene".to_string(),
            format!("Present in: {}", gene.tumors().join(", ")),
        ];
        title.extend(
            gene.associations
                .iter()
                .map(|a| format!("{}: PCC={:.3}", a.tumor, a.correlation)),
        );

        nodes.push(GraphNode {
            id: gene.gene.clone(),
            kind: NodeKind::GeneCrossTumor,
            label: gene.gene.clone(),
            size: node_size(strength, config.min_correlation, config.node_size_range),
            color: NodeColor {
                background: config.cross_tumor_color.clone(),
                border: config.cross_tumor_border.clone(),
            },
            shape: NodeShape::Diamond,
            title,
            border_width: 2.0,
            font_size: 9,
            x: Some(mx * CROSS_TUMOR_PULL),
            y: Some(my * CROSS_TUMOR_PULL),
        });

        for a in &gene.associations {
            let color = colors
                .get(a.tumor.as_str())
                .copied()
                .unwrap_or(config.default_tumor_color.as_str());
            edges.push(GraphEdge {
                source: a.tumor.clone(),
                target: gene.gene.clone(),
                weight: a.strength(),
                width: widths.width(a.strength()),
                color: color.to_string(),
                opacity: 0.6,
                title: Some(format!("{} - {}: PCC={:.3}", a.tumor, gene.gene, a.correlation)),
            });
            *gene_counts.entry(a.tumor.as_str()).or_default() += 1;
        }

        debug!(
            "{}: cross-tumor node linked to {}",
            gene.gene,
            gene.tumors().join(", ")
        );
    }

    let stats = NetworkStats {
        total_genes: specific.len() + cross.len(),
        specific_genes: specific.len(),
        cross_tumor_genes: cross.len(),
        tumor_gene_counts: active
            .iter()
            .map(|t| (t.id.clone(), gene_counts.get(t.id.as_str()).copied().unwrap_or(0)))
            .collect(),
    };

    Network {
        hub_id,
        nodes,
        edges,
        stats,
    }
}

fn keep_gene(gene: &str, reserved: &HashSet<&str>) -> bool {
    if reserved.contains(gene) {
        warn!("Gene {} collides with a hub or tumor id and is left out", gene);
        return false;
    }
    true
}

impl Network {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Edges ending at `id`
    pub fn incoming(&self, id: &str) -> Vec<&GraphEdge> {
        self.edges.iter().filter(|e| e.target == id).collect()
    }

    /// Breadth-first depth of every node reachable from the hub
    pub fn depths(&self) -> HashMap<&str, usize> {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for e in &self.edges {
            adjacency.entry(e.source.as_str()).or_default().push(e.target.as_str());
        }

        let mut depths = HashMap::new();
        let mut queue = VecDeque::new();
        depths.insert(self.hub_id.as_str(), 0usize);
        queue.push_back(self.hub_id.as_str());

        while let Some(id) = queue.pop_front() {
            let d = depths[id];
            for &next in adjacency.get(id).map(Vec::as_slice).unwrap_or(&[]) {
                if !depths.contains_key(next) {
                    depths.insert(next, d + 1);
                    queue.push_back(next);
                }
            }
        }
        depths
    }

    /// Check the structural guarantees of the builder
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for n in &self.nodes {
            if !seen.insert(n.id.as_str()) {
                anyhow::bail!("duplicate node id: {}", n.id);
            }
        }

        let kinds: HashMap<&str, NodeKind> =
            self.nodes.iter().map(|n| (n.id.as_str(), n.kind)).collect();

        for e in &self.edges {
            let (Some(src), Some(dst)) = (kinds.get(e.source.as_str()), kinds.get(e.target.as_str())) else {
                anyhow::bail!("edge {} -> {} references an unknown node", e.source, e.target);
            };
            if dst.tier() != src.tier() + 1 {
                anyhow::bail!("edge {} -> {} skips or reverses a tier", e.source, e.target);
            }
        }

        let depths = self.depths();
        for n in &self.nodes {
            match depths.get(n.id.as_str()) {
                Some(&d) if d == n.kind.tier() => {}
                Some(&d) => anyhow::bail!("node {} sits at depth {} instead of {}", n.id, d, n.kind.tier()),
                None => anyhow::bail!("node {} is not reachable from {}", n.id, self.hub_id),
            }

            let incoming = self.incoming(&n.id).len();
            let ok = match n.kind {
                NodeKind::Hub => incoming == 0,
                NodeKind::Tumor => {
                    incoming == 1 && self.incoming(&n.id)[0].source == self.hub_id
                }
                NodeKind::GeneSpecific => incoming == 1,
                NodeKind::GeneCrossTumor => incoming >= 2,
            };
            if !ok {
                anyhow::bail!("node {} ({:?}) has {} incoming edges", n.id, n.kind, incoming);
            }
        }

        Ok(())
    }
}
