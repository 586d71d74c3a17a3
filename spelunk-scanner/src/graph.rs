use crate::error::ScanError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Index of a node inside a [`LinkGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Fetched fine but not HTML, so nothing was parsed.
    NotHtml(String),
    /// The crawl was aborted before this page was fetched.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotHtml(content_type) => write!(f, "not HTML ({})", content_type),
            SkipReason::Cancelled => write!(f, "crawl cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeStatus {
    Fetched,
    Unreachable(ScanError),
    Skipped(SkipReason),
}

impl NodeStatus {
    pub fn is_fetched(&self) -> bool {
        matches!(self, NodeStatus::Fetched)
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, NodeStatus::Unreachable(_))
    }

    pub fn failure(&self) -> Option<&ScanError> {
        match self {
            NodeStatus::Unreachable(err) => Some(err),
            _ => None,
        }
    }
}

/// One fetched (or attempted) page.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub uri: String,
    /// Distance from the seed along `children` edges.
    pub depth: usize,
    pub status: NodeStatus,
    pub links: Vec<String>,
    pub emails: Vec<String>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(uri: String, depth: usize, status: NodeStatus) -> Self {
        Self {
            uri,
            depth,
            status,
            links: Vec::new(),
            emails: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Arena of nodes produced by one crawl, keyed by normalized URL.
///
/// `children` edges form a tree rooted at [`LinkGraph::root`]; links to pages
/// that were already claimed by another parent stay in `links` only.
#[derive(Debug, Clone, Serialize)]
pub struct LinkGraph {
    nodes: Vec<Node>,
    #[serde(skip)]
    index: HashMap<String, NodeId>,
    root: NodeId,
    complete: bool,
}

impl LinkGraph {
    pub(crate) fn from_parts(nodes: Vec<Node>, root: NodeId, complete: bool) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.uri.clone(), NodeId(i)))
            .collect();
        Self {
            nodes,
            index,
            root,
            complete,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &Node {
        &self.nodes[self.root.0]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Look a node up by URL; the URL is normalized first.
    pub fn get(&self, uri: &str) -> Option<&Node> {
        let key = crate::parser::normalize_url(uri)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| uri.to_string());
        self.index.get(&key).and_then(|id| self.node(*id))
    }

    pub fn id_of(&self, uri: &str) -> Option<NodeId> {
        self.get(uri).and_then(|node| self.index.get(&node.uri).copied())
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node)> {
        self.node(id)
            .into_iter()
            .flat_map(|node| node.children.iter())
            .filter_map(move |child| self.node(*child).map(|n| (*child, n)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// `false` when the crawl was cancelled and this is a partial result.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Pre-order walk over `children` starting at `from`. Every node is
    /// yielded at most once.
    pub fn walk(&self, from: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![from];

        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }

        order
    }

    /// Parent → child pairs of the subtree under `from`, in walk order.
    pub fn edges(&self, from: NodeId) -> Vec<(NodeId, NodeId)> {
        self.walk(from)
            .into_iter()
            .flat_map(move |parent| {
                self.nodes[parent.0]
                    .children
                    .iter()
                    .map(move |child| (parent, *child))
            })
            .collect()
    }

    /// Every distinct email found anywhere in the crawl, first-seen order.
    pub fn all_emails(&self) -> Vec<String> {
        dedup(self.nodes.iter().flat_map(|n| n.emails.iter()))
    }

    /// Every distinct link found anywhere in the crawl, first-seen order.
    pub fn all_links(&self) -> Vec<String> {
        dedup(self.nodes.iter().flat_map(|n| n.links.iter()))
    }
}

fn dedup<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&'a String> = HashSet::new();
    values.filter(|v| seen.insert(*v)).cloned().collect()
}
