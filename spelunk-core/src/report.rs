// Console listings of a finished crawl

use colored::Colorize;
use spelunk_scanner::{LinkGraph, NodeId, NodeStatus};

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Fixed-width tag shown in front of every listed URL.
pub fn status_tag(status: &NodeStatus) -> &'static str {
    match status {
        NodeStatus::Fetched => "[ OK ]",
        NodeStatus::Unreachable(_) => "[DEAD]",
        NodeStatus::Skipped(_) => "[SKIP]",
    }
}

fn status_note(status: &NodeStatus) -> Option<String> {
    match status {
        NodeStatus::Fetched => None,
        NodeStatus::Unreachable(err) => Some(err.to_string()),
        NodeStatus::Skipped(reason) => Some(reason.to_string()),
    }
}

fn plain(_: &NodeStatus, text: String) -> String {
    text
}

fn painted(status: &NodeStatus, text: String) -> String {
    match status {
        NodeStatus::Fetched => text.green().to_string(),
        NodeStatus::Unreachable(_) => text.red().to_string(),
        NodeStatus::Skipped(_) => text.bright_black().to_string(),
    }
}

fn render_children_with(
    graph: &LinkGraph,
    id: NodeId,
    paint: fn(&NodeStatus, String) -> String,
) -> String {
    let Some(node) = graph.node(id) else {
        return "  (unknown node)\n".to_string();
    };

    let mut report = String::new();
    report.push_str(&format!("{}\n", node.uri));
    report.push_str(&format!("  {} children\n", node.children.len()));
    if !graph.is_complete() {
        report.push_str("  (partial: crawl was cancelled)\n");
    }
    report.push('\n');

    if node.children.is_empty() {
        report.push_str("  (no children)\n");
        return report;
    }

    for (_, child) in graph.children(id) {
        let mut line = format!("  {} {}", status_tag(&child.status), child.uri);
        if let Some(note) = status_note(&child.status) {
            line.push_str(&format!("  ({})", note));
        }
        report.push_str(&paint(&child.status, line));
        report.push('\n');
    }

    report
}

/// One line per immediate child of `id`, tagged with its fetch status.
/// Does not descend further.
pub fn render_children(graph: &LinkGraph, id: NodeId) -> String {
    render_children_with(graph, id, plain)
}

/// Same as [`render_children`] with ANSI colours per status.
pub fn render_children_colored(graph: &LinkGraph, id: NodeId) -> String {
    render_children_with(graph, id, painted)
}

pub fn render_emails(emails: &[String]) -> String {
    if emails.is_empty() {
        return "No email addresses found.\n".to_string();
    }

    let mut report = format!("{} email address(es):\n", emails.len());
    for email in emails {
        report.push_str(&format!("  {}\n", email));
    }
    report
}

pub fn render_summary(graph: &LinkGraph) -> String {
    let (mut fetched, mut unreachable, mut skipped) = (0, 0, 0);
    for (_, node) in graph.iter() {
        match node.status {
            NodeStatus::Fetched => fetched += 1,
            NodeStatus::Unreachable(_) => unreachable += 1,
            NodeStatus::Skipped(_) => skipped += 1,
        }
    }

    let mut report = String::new();
    report.push_str(DIVIDER);
    report.push_str("\n\n# Summary:\n");
    report.push_str(&format!("  Seed: {}\n", graph.root_node().uri));
    report.push_str(&format!("  Pages registered: {}\n", graph.len()));
    report.push_str(&format!("  Fetched: {}\n", fetched));
    report.push_str(&format!("  Unreachable: {}\n", unreachable));
    report.push_str(&format!("  Skipped: {}\n", skipped));
    report.push_str(&format!("  Distinct links found: {}\n", graph.all_links().len()));
    report.push_str(&format!("  Distinct emails found: {}\n", graph.all_emails().len()));
    if !graph.is_complete() {
        report.push_str("  Result is PARTIAL (crawl cancelled)\n");
    }
    report.push('\n');
    report.push_str(DIVIDER);
    report.push('\n');
    report
}
