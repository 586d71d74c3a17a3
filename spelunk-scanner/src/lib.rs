pub mod crawler;
pub mod error;
pub mod graph;
pub mod parser;
pub mod transport;

pub use crawler::{Crawler, ProgressCallback};
pub use error::ScanError;
pub use graph::{LinkGraph, Node, NodeId, NodeStatus, SkipReason};
pub use parser::{ParsedPage, normalize_url, parse_page};
pub use transport::{Page, ProxyConfig, Transport, TransportConfig};
pub use tokio_util::sync::CancellationToken;
