//! vis-network payload and HTML output
//!
//! The page loads vis-network and html2canvas from a CDN; everything else
//! (payload, styles, controls) is embedded so the file stands alone.

use crate::config::Config;
use crate::error::WriteError;
use crate::graph::{GraphEdge, GraphNode, Network, NetworkStats, NodeKind};
use crate::loader::SkippedTumor;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const VIS_NETWORK_JS: &str = "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";
const HTML2CANVAS_JS: &str = "https://html2canvas.hertzen.com/dist/html2canvas.min.js";

const NETWORK_CSS: &str = include_str!("../assets/network.css");
const CONTROLS_JS: &str = include_str!("../assets/controls.js");

/// What happened during the run, shown next to the network
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunInfo {
    pub generated_at: String,
    pub data_dir: String,
    /// Tumors that could not be loaded
    pub skipped: Vec<SkippedTumor>,
    /// Tumors with no gene above the threshold
    pub empty: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisColor {
    pub background: String,
    pub border: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisFont {
    pub size: u32,
    pub face: &'static str,
    pub color: &'static str,
    #[serde(rename = "strokeWidth")]
    pub stroke_width: u32,
    #[serde(rename = "strokeColor")]
    pub stroke_color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisNode {
    pub id: String,
    pub label: String,
    pub title: String,
    pub group: NodeKind,
    pub size: f64,
    pub color: VisColor,
    pub shape: String,
    #[serde(rename = "borderWidth")]
    pub border_width: f64,
    pub font: VisFont,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisEdgeColor {
    pub color: String,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisEdge {
    pub from: String,
    pub to: String,
    pub weight: f64,
    pub width: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub color: VisEdgeColor,
}

/// Everything vis-network needs: `new vis.Network(el, {nodes, edges}, options)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisPayload {
    pub nodes: Vec<VisNode>,
    pub edges: Vec<VisEdge>,
    pub options: Value,
}

/// JSON export: payload plus run metadata
#[derive(Debug, Serialize)]
struct NetworkDocument<'a> {
    hub: &'a str,
    min_correlation: f64,
    max_genes_per_tumor: usize,
    stats: &'a NetworkStats,
    run: &'a RunInfo,
    network: VisPayload,
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn tooltip(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| escape_html(l))
        .collect::<Vec<_>>()
        .join("<br>")
}

fn vis_node(node: &GraphNode) -> VisNode {
    let font = match node.kind {
        NodeKind::Hub | NodeKind::Tumor => VisFont {
            size: node.font_size,
            face: "Arial",
            color: "white",
            stroke_width: if node.kind == NodeKind::Hub { 3 } else { 2 },
            stroke_color: "#000000",
        },
        NodeKind::GeneSpecific | NodeKind::GeneCrossTumor => VisFont {
            size: node.font_size,
            face: "Arial",
            color: "black",
            stroke_width: 1,
            stroke_color: "#ffffff",
        },
    };

    VisNode {
        id: node.id.clone(),
        label: node.label.clone(),
        title: tooltip(&node.title),
        group: node.kind,
        size: node.size,
        color: VisColor {
            background: node.color.background.clone(),
            border: node.color.border.clone(),
        },
        shape: node.shape.to_string(),
        border_width: node.border_width,
        font,
        x: node.x,
        y: node.y,
    }
}

fn vis_edge(edge: &GraphEdge) -> VisEdge {
    VisEdge {
        from: edge.source.clone(),
        to: edge.target.clone(),
        weight: edge.weight,
        width: edge.width,
        title: edge.title.as_deref().map(escape_html),
        color: VisEdgeColor {
            color: edge.color.clone(),
            opacity: edge.opacity,
        },
    }
}

/// vis-network options built from the configured physics settings
pub fn vis_options(config: &Config) -> Value {
    let p = &config.physics;
    let mut physics = json!({
        "enabled": p.enabled,
        "solver": p.solver,
        "stabilization": {
            "enabled": true,
            "iterations": p.stabilization_iterations,
            "updateInterval": p.update_interval,
            "fit": true
        }
    });
    physics[p.solver.as_str()] = json!({
        "gravitationalConstant": p.gravitational_constant,
        "centralGravity": p.central_gravity,
        "springLength": p.spring_length,
        "springConstant": p.spring_constant,
        "damping": p.damping,
        "avoidOverlap": p.avoid_overlap
    });

    json!({
        "nodes": {
            "borderWidth": 1,
            "borderWidthSelected": 2,
            "opacity": 0.9,
            "font": { "face": "Arial", "size": 11, "strokeWidth": 1, "strokeColor": "#ffffff" }
        },
        "edges": {
            "color": { "inherit": false, "opacity": 0.7 },
            "smooth": { "enabled": true, "type": "continuous", "roundness": 0.5 },
            "arrows": { "to": { "enabled": false }, "from": { "enabled": false } }
        },
        "physics": physics,
        "interaction": {
            "dragNodes": true,
            "dragView": true,
            "zoomView": true,
            "hover": true,
            "hideEdgesOnDrag": false,
            "navigationButtons": false,
            "keyboard": {
                "enabled": true,
                "speed": { "x": 10, "y": 10, "zoom": 0.1 },
                "bindToWindow": true
            }
        },
        "configure": { "enabled": false }
    })
}

/// Convert the network into the vis-network data model
pub fn build_payload(network: &Network, config: &Config) -> VisPayload {
    VisPayload {
        nodes: network.nodes.iter().map(vis_node).collect(),
        edges: network.edges.iter().map(vis_edge).collect(),
        options: vis_options(config),
    }
}

/// Write the network to `path`; `.json` gets the JSON document, anything else the HTML page.
///
/// The parent directory is created when missing.
pub fn write_network(network: &Network, config: &Config, run: &RunInfo, path: &Path) -> Result<(), WriteError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| WriteError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let content = match ext.as_str() {
        "json" => render_json(network, config, run)?,
        _ => render_html(network, config, run)?,
    };

    let file = File::create(path).map_err(|source| WriteError::CreateFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(content.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    log::info!("Network written to: {}", path.display());
    Ok(())
}

/// Pretty JSON document with payload and run metadata
pub fn render_json(network: &Network, config: &Config, run: &RunInfo) -> Result<String, WriteError> {
    let doc = NetworkDocument {
        hub: &network.hub_id,
        min_correlation: config.min_correlation,
        max_genes_per_tumor: config.max_genes_per_tumor,
        stats: &network.stats,
        run,
        network: build_payload(network, config),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// JSON that is safe inside a `<script>` element
fn script_json<T: Serialize>(value: &T) -> Result<String, WriteError> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

/// Full standalone HTML page
pub fn render_html(network: &Network, config: &Config, run: &RunInfo) -> Result<String, WriteError> {
    use std::fmt::Write as _;

    let payload = script_json(&build_payload(network, config))?;
    let title = escape_html(&config.title);
    let subtitle = escape_html(&config.subtitle);
    let file_base = script_json(&file_stem_for(&config.title))?;

    // writing into a String cannot fail
    let mut html = String::with_capacity(payload.len() + 16 * 1024);
    let _ = write!(
        html,
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="{vis}"></script>
    <script src="{h2c}"></script>
    <style>
{css}
        #mynetwork {{ width: {width}; height: {height}; background-color: {bg}; }}
    </style>
</head>
<body>
<div class="network-container">
    <div class="header-container">
        <h1 class="main-title">{title}</h1>
        <p class="subtitle">{subtitle}</p>
    </div>
    <div id="mynetwork"></div>
    <footer>{genes} genes ({cross} cross-tumor) across {tumors} tumor types &middot; generated {generated}</footer>
</div>
"##,
        title = title,
        subtitle = subtitle,
        vis = VIS_NETWORK_JS,
        h2c = HTML2CANVAS_JS,
        css = NETWORK_CSS,
        width = escape_html(&config.canvas.width),
        height = escape_html(&config.canvas.height),
        bg = escape_html(&config.canvas.background),
        genes = network.stats.total_genes,
        cross = network.stats.cross_tumor_genes,
        tumors = network.stats.tumor_gene_counts.len(),
        generated = escape_html(&run.generated_at),
    );

    write_legend(&mut html, network, config, run);

    let _ = write!(
        html,
        r##"<div id="physics-status" class="status-indicator active">Physics: Active</div>
<div class="control-buttons">
    <button id="cluster-btn">Cluster Nodes</button>
    <button id="expand-btn">Expand Nodes</button>
    <button id="reset-btn">Reset Layout</button>
    <button id="freeze-btn">Freeze Positions</button>
    <button id="unfreeze-btn">Unfreeze Positions</button>
</div>
<div class="download-buttons">
    <button id="download-btn">Download PNG</button>
    <button id="download-hires-btn">Download Hi-Res PNG</button>
</div>
<script>
window.networkPayload = {payload};
window.networkFile = {file_base};
</script>
<script>
{controls}
</script>
</body>
</html>
"##,
        payload = payload,
        file_base = file_base,
        controls = CONTROLS_JS,
    );

    Ok(html)
}

fn write_legend(html: &mut String, network: &Network, config: &Config, run: &RunInfo) {
    use std::fmt::Write as _;

    let hub_color = network
        .node(&network.hub_id)
        .map(|n| n.color.background.as_str())
        .unwrap_or(config.hub_color.as_str());

    let _ = write!(
        html,
        r#"<div class="legend-container">
    <div class="legend-title">Legend</div>
    <div class="legend-item"><div class="legend-color" style="background-color: {};"></div><span>{} (Central)</span></div>
    <div class="legend-section">Cancer Types:</div>
"#,
        escape_html(hub_color),
        escape_html(&network.hub_id),
    );

    for tumor in network.nodes_of_kind(NodeKind::Tumor) {
        let _ = writeln!(
            html,
            r#"    <div class="legend-item"><div class="legend-color" style="background-color: {};"></div><span>{}</span></div>"#,
            escape_html(&tumor.color.background),
            escape_html(&tumor.label),
        );
    }

    if network.stats.cross_tumor_genes > 0 {
        let _ = writeln!(
            html,
            r#"    <div class="legend-item"><div class="legend-color diamond" style="background-color: {};"></div><span>Cross-tumor gene</span></div>"#,
            escape_html(&config.cross_tumor_color),
        );
    }

    let _ = write!(
        html,
        r#"    <div class="legend-info">
        <div>Node size: PCC correlation strength</div>
        <div>Edge width: Connection strength</div>
        <div>Minimum |correlation|: {}</div>
        <div>Diamond shape: Cross-tumor genes</div>
    </div>
"#,
        config.min_correlation,
    );

    let omitted: Vec<String> = run
        .skipped
        .iter()
        .map(|s| s.id.clone())
        .chain(run.empty.iter().cloned())
        .collect();
    if !omitted.is_empty() {
        let _ = writeln!(
            html,
            r#"    <div class="legend-omitted">Not shown: {}</div>"#,
            escape_html(&omitted.join(", "))
        );
    }

    html.push_str(
        r#"    <div class="legend-controls">
        <div class="controls-title">Interactive Controls:</div>
        <div>- Drag nodes to rearrange</div>
        <div>- Scroll to zoom in/out</div>
        <div>- Hover over nodes for details</div>
        <div>- Use buttons below for layout control</div>
    </div>
</div>
"#,
    );
}

/// Base name for downloaded PNGs
fn file_stem_for(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let stem = stem
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if stem.is_empty() {
        "network".to_string()
    } else {
        stem
    }
}
