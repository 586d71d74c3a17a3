// Diagram export for crawl graphs

use crate::viewer::DiagramViewer;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use spelunk_scanner::{LinkGraph, NodeId, NodeStatus};
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

const LABEL_MAX_CHARS: usize = 40;
const NODE_WIDTH: usize = 300;
const NODE_HEIGHT: usize = 28;
const H_GAP: usize = 20;
const V_GAP: usize = 60;
const MARGIN: usize = 20;

/// Graphviz layout program used for raster and PDF output.
const GRAPHVIZ_PROGRAM: &str = "dot";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported diagram format: {0}")]
    UnsupportedFormat(String),

    #[error("A destination file is required for {0} output")]
    MissingDestination(DiagramFormat),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Viewer error: {0}")]
    Viewer(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramFormat {
    /// Open in a viewer instead of keeping a file
    Interactive,
    Svg,
    Png,
    Pdf,
    Dot,
}

impl DiagramFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "view" | "show" | "interactive" => Some(DiagramFormat::Interactive),
            "svg" => Some(DiagramFormat::Svg),
            "png" => Some(DiagramFormat::Png),
            "pdf" => Some(DiagramFormat::Pdf),
            "dot" | "gv" => Some(DiagramFormat::Dot),
            _ => None,
        }
    }

    /// Infer the file format from a destination's extension.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                ExportError::UnsupportedFormat(format!("no file extension on {}", path.display()))
            })?;

        match Self::parse(ext) {
            Some(DiagramFormat::Interactive) | None => {
                Err(ExportError::UnsupportedFormat(format!(".{}", ext)))
            }
            Some(format) => Ok(format),
        }
    }

    fn graphviz_type(self) -> Option<&'static str> {
        match self {
            DiagramFormat::Png => Some("png"),
            DiagramFormat::Pdf => Some("pdf"),
            _ => None,
        }
    }
}

impl fmt::Display for DiagramFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagramFormat::Interactive => "interactive",
            DiagramFormat::Svg => "svg",
            DiagramFormat::Png => "png",
            DiagramFormat::Pdf => "pdf",
            DiagramFormat::Dot => "dot",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramStatus {
    Fetched,
    Unreachable,
    Skipped,
}

impl DiagramStatus {
    fn of(status: &NodeStatus) -> Self {
        match status {
            NodeStatus::Fetched => DiagramStatus::Fetched,
            NodeStatus::Unreachable(_) => DiagramStatus::Unreachable,
            NodeStatus::Skipped(_) => DiagramStatus::Skipped,
        }
    }

    fn class(self) -> &'static str {
        match self {
            DiagramStatus::Fetched => "fetched",
            DiagramStatus::Unreachable => "unreachable",
            DiagramStatus::Skipped => "skipped",
        }
    }

    fn fill(self) -> &'static str {
        match self {
            DiagramStatus::Fetched => "#c8e6c9",
            DiagramStatus::Unreachable => "#ffcdd2",
            DiagramStatus::Skipped => "#eeeeee",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiagramNode {
    pub id: NodeId,
    pub uri: String,
    pub label: String,
    pub status: DiagramStatus,
}

impl fmt::Display for DiagramNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Parent → child relation in the expansion tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiagramEdge;

impl fmt::Display for DiagramEdge {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

pub type Diagram = DiGraph<DiagramNode, DiagramEdge>;

/// Host plus path, shortened for display.
pub fn node_label(uri: &str) -> String {
    let label = Url::parse(uri)
        .ok()
        .map(|u| {
            let host = u.host_str().unwrap_or("unknown");
            match (u.path(), u.query()) {
                ("/", None) => host.to_string(),
                (path, None) => format!("{}{}", host, path),
                (path, Some(query)) => format!("{}{}?{}", host, path, query),
            }
        })
        .unwrap_or_else(|| uri.to_string());

    if label.chars().count() > LABEL_MAX_CHARS {
        let head: String = label.chars().take(LABEL_MAX_CHARS - 1).collect();
        format!("{}…", head)
    } else {
        label
    }
}

/// Everything reachable from `from` through `children`: one diagram node
/// per page, one edge per parent → child relation.
pub fn build_diagram(graph: &LinkGraph, from: NodeId) -> Diagram {
    let mut diagram = Diagram::new();
    let mut indices: HashMap<NodeId, NodeIndex> = HashMap::new();

    for id in graph.walk(from) {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let index = diagram.add_node(DiagramNode {
            id,
            uri: node.uri.clone(),
            label: node_label(&node.uri),
            status: DiagramStatus::of(&node.status),
        });
        indices.insert(id, index);
    }

    for (parent, child) in graph.edges(from) {
        if let (Some(&a), Some(&b)) = (indices.get(&parent), indices.get(&child)) {
            diagram.add_edge(a, b, DiagramEdge);
        }
    }

    diagram
}

fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Graphviz DOT source for the subtree under `from`.
pub fn to_dot(graph: &LinkGraph, from: NodeId) -> String {
    let diagram = build_diagram(graph, from);
    let content = Dot::with_attr_getters(
        &diagram,
        &[Config::EdgeNoLabel, Config::NodeNoLabel, Config::GraphContentOnly],
        &|_, _| String::new(),
        &|_, (_, node)| {
            format!(
                "label = \"{}\" tooltip = \"{}\" style = filled fillcolor = \"{}\" ",
                escape_dot(&node.label),
                escape_dot(&node.uri),
                node.status.fill()
            )
        },
    );

    let mut dot = String::new();
    dot.push_str("digraph spelunk {\n");
    dot.push_str("    rankdir=LR;\n");
    dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n");
    let _ = write!(dot, "{}", content);
    dot.push_str("}\n");
    dot
}

/// Standalone SVG with a top-down tree layout. Needs no external tools.
pub fn to_svg(graph: &LinkGraph, from: NodeId) -> String {
    let diagram = build_diagram(graph, from);
    let count = diagram.node_count();

    // nodes were added in pre-order, so parents precede their children
    let mut level = vec![0usize; count];
    for edge in diagram.raw_edges() {
        level[edge.target().index()] = level[edge.source().index()] + 1;
    }

    let children = |i: usize| -> Vec<usize> {
        let mut kids: Vec<usize> = diagram
            .neighbors(NodeIndex::new(i))
            .map(|n| n.index())
            .collect();
        kids.sort_unstable();
        kids
    };

    // leaves take consecutive slots, parents sit centred over their children
    let mut slot = vec![0f64; count];
    let mut next_leaf = 0usize;
    for (i, s) in slot.iter_mut().enumerate() {
        if diagram.neighbors(NodeIndex::new(i)).next().is_none() {
            *s = next_leaf as f64;
            next_leaf += 1;
        }
    }
    for i in (0..count).rev() {
        let kids = children(i);
        if let (Some(first), Some(last)) = (kids.first(), kids.last()) {
            slot[i] = (slot[*first] + slot[*last]) / 2.0;
        }
    }

    let columns = next_leaf.max(1);
    let rows = level.iter().copied().max().unwrap_or(0) + 1;
    let width = MARGIN * 2 + columns * NODE_WIDTH + (columns - 1) * H_GAP;
    let height = MARGIN * 2 + rows * NODE_HEIGHT + (rows - 1) * V_GAP;

    let x_of = |i: usize| MARGIN as f64 + slot[i] * (NODE_WIDTH + H_GAP) as f64;
    let y_of = |i: usize| (MARGIN + level[i] * (NODE_HEIGHT + V_GAP)) as f64;

    let mut svg = String::new();
    svg.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         viewBox=\"0 0 {width} {height}\" font-family=\"monospace\" font-size=\"12\">"
    );
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");

    svg.push_str("  <g class=\"edges\" stroke=\"#555555\" stroke-width=\"1\">\n");
    for edge in diagram.raw_edges() {
        let (s, t) = (edge.source().index(), edge.target().index());
        let _ = writeln!(
            svg,
            "    <line class=\"edge\" x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\"/>",
            x_of(s) + NODE_WIDTH as f64 / 2.0,
            y_of(s) + NODE_HEIGHT as f64,
            x_of(t) + NODE_WIDTH as f64 / 2.0,
            y_of(t)
        );
    }
    svg.push_str("  </g>\n");

    svg.push_str("  <g class=\"nodes\">\n");
    for index in diagram.node_indices() {
        let i = index.index();
        let node = &diagram[index];
        let stroke_width = if i == 0 { 2 } else { 1 };
        let _ = writeln!(
            svg,
            "    <g class=\"node\" data-status=\"{}\">",
            node.status.class()
        );
        let _ = writeln!(svg, "      <title>{}</title>", escape_xml(&node.uri));
        let _ = writeln!(
            svg,
            "      <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{NODE_WIDTH}\" height=\"{NODE_HEIGHT}\" rx=\"4\" \
             fill=\"{}\" stroke=\"#333333\" stroke-width=\"{stroke_width}\"/>",
            x_of(i),
            y_of(i),
            node.status.fill()
        );
        let _ = writeln!(
            svg,
            "      <text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text>",
            x_of(i) + NODE_WIDTH as f64 / 2.0,
            y_of(i) + NODE_HEIGHT as f64 / 2.0,
            escape_xml(&node.label)
        );
        svg.push_str("    </g>\n");
    }
    svg.push_str("  </g>\n");
    svg.push_str("</svg>\n");
    svg
}

fn render_with_graphviz(
    program: &str,
    dot: &str,
    format: &str,
    destination: &Path,
) -> Result<(), ExportError> {
    debug!("Rendering {} via {} into {}", format, program, destination.display());
    let mut child = Command::new(program)
        .arg(format!("-T{}", format))
        .arg("-o")
        .arg(destination)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            ExportError::Render(format!(
                "could not run Graphviz '{}' ({}); install Graphviz or export to .svg",
                program, e
            ))
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(dot.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(ExportError::Render(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

/// The destination's extension has to agree with what will be written into it.
/// `Interactive` always writes SVG.
fn check_destination(format: DiagramFormat, destination: &Path) -> Result<(), ExportError> {
    let written = match format {
        DiagramFormat::Interactive => DiagramFormat::Svg,
        other => other,
    };
    if DiagramFormat::from_path(destination)? != written {
        return Err(ExportError::UnsupportedFormat(format!(
            "{} output cannot be written to {}",
            written,
            destination.display()
        )));
    }
    Ok(())
}

fn write_file(
    graph: &LinkGraph,
    from: NodeId,
    format: DiagramFormat,
    destination: &Path,
) -> Result<(), ExportError> {
    match format {
        DiagramFormat::Svg => fs::write(destination, to_svg(graph, from))?,
        DiagramFormat::Dot => fs::write(destination, to_dot(graph, from))?,
        DiagramFormat::Png | DiagramFormat::Pdf => {
            let kind = format
                .graphviz_type()
                .ok_or_else(|| ExportError::UnsupportedFormat(format.to_string()))?;
            render_with_graphviz(GRAPHVIZ_PROGRAM, &to_dot(graph, from), kind, destination)?;
        }
        DiagramFormat::Interactive => {
            return Err(ExportError::UnsupportedFormat(format.to_string()));
        }
    }
    Ok(())
}

/// Render the subtree under `from` in `format`.
///
/// File formats need a `destination`. `Interactive` writes an SVG (to
/// `destination` if given, else a kept temp file) and hands it to `viewer`.
/// Returns the path of the written file.
pub fn export(
    graph: &LinkGraph,
    from: NodeId,
    format: DiagramFormat,
    destination: Option<&Path>,
    viewer: &dyn DiagramViewer,
) -> Result<PathBuf, ExportError> {
    if format == DiagramFormat::Interactive {
        let path = match destination {
            Some(path) => {
                check_destination(format, path)?;
                fs::write(path, to_svg(graph, from))?;
                path.to_path_buf()
            }
            None => {
                let mut file = tempfile::Builder::new()
                    .prefix("spelunk-")
                    .suffix(".svg")
                    .tempfile()?;
                file.write_all(to_svg(graph, from).as_bytes())?;
                let (_, path) = file.keep().map_err(|e| ExportError::Io(e.error))?;
                path
            }
        };
        viewer.show(&path)?;
        return Ok(path);
    }

    let destination = destination.ok_or(ExportError::MissingDestination(format))?;
    check_destination(format, destination)?;
    write_file(graph, from, format, destination)?;
    info!("Diagram written to {}", destination.display());
    Ok(destination.to_path_buf())
}

/// [`export`] with the format taken from the destination's extension.
pub fn export_to_path(
    graph: &LinkGraph,
    from: NodeId,
    destination: &Path,
) -> Result<PathBuf, ExportError> {
    let format = DiagramFormat::from_path(destination)?;
    write_file(graph, from, format, destination)?;
    info!("Diagram written to {}", destination.display());
    Ok(destination.to_path_buf())
}
