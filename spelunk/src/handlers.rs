use clap::ArgMatches;
use spelunk_core::map::{self, DiagramFormat, ExportError};
use spelunk_core::persist::{self, PersistError};
use spelunk_core::report;
use spelunk_core::viewer::DiagramViewer;
use spelunk_scanner::{LinkGraph, ProxyConfig, TransportConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // Try to parse as-is
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    // Try adding http://
    let with_scheme = format!("http://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.has_host()
    {
        return Some(with_scheme);
    }

    None
}

/// Proxy and timeout settings from the command line.
pub fn build_transport_config(
    ip: &str,
    port: u16,
    no_proxy: bool,
    timeout_secs: u64,
) -> TransportConfig {
    let config = TransportConfig::direct().with_timeout(Duration::from_secs(timeout_secs));
    if no_proxy {
        config
    } else {
        config.with_proxy(ProxyConfig::new(ip, port))
    }
}

/// `--depth` value: a level count, or `all` for no bound.
pub fn parse_depth(value: &str) -> Result<Option<usize>, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    value
        .parse::<usize>()
        .map(Some)
        .map_err(|_| format!("expected a number of levels or 'all', got '{}'", value))
}

/// The one thing to do with a finished crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    PrintChildren,
    ShowDiagram,
    SaveDiagram(PathBuf),
    ListEmails,
}

impl RenderTarget {
    /// `--mail` wins over `--visualize`, which wins over `--download`.
    pub fn from_flags(mail: bool, visualize: bool, download: Option<PathBuf>) -> Self {
        if mail {
            RenderTarget::ListEmails
        } else if visualize {
            RenderTarget::ShowDiagram
        } else if let Some(path) = download {
            RenderTarget::SaveDiagram(path)
        } else {
            RenderTarget::PrintChildren
        }
    }

    /// Reject a diagram destination before any crawling happens.
    pub fn validate(&self) -> Result<(), ExportError> {
        if let RenderTarget::SaveDiagram(path) = self {
            DiagramFormat::from_path(path)?;
        }
        Ok(())
    }

    pub fn from_args(args: &ArgMatches) -> Self {
        let download = args
            .get_one::<PathBuf>("download")
            .map(|p| PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()));
        Self::from_flags(args.get_flag("mail"), args.get_flag("visualize"), download)
    }
}

/// Run `target` against the root of `graph` and return what should be
/// printed to stdout.
pub fn dispatch(
    graph: &LinkGraph,
    target: &RenderTarget,
    colored: bool,
    viewer: &dyn DiagramViewer,
) -> Result<String, ExportError> {
    let root = graph.root();
    match target {
        RenderTarget::PrintChildren if colored => Ok(report::render_children_colored(graph, root)),
        RenderTarget::PrintChildren => Ok(report::render_children(graph, root)),
        RenderTarget::ListEmails => Ok(report::render_emails(&graph.root_node().emails)),
        RenderTarget::ShowDiagram => {
            let path = map::export(graph, root, DiagramFormat::Interactive, None, viewer)?;
            Ok(format!("Diagram opened from {}\n", path.display()))
        }
        RenderTarget::SaveDiagram(destination) => {
            let path = map::export_to_path(graph, root, destination)?;
            Ok(format!("Diagram saved to {}\n", path.display()))
        }
    }
}

/// `--save`: the seed page's emails in mail mode, its links otherwise.
pub fn save_results(
    graph: &LinkGraph,
    target: &RenderTarget,
    dir: &Path,
) -> Result<PathBuf, PersistError> {
    let seed = graph.root_node();
    match target {
        RenderTarget::ListEmails => persist::save_json(dir, "emails", &seed.emails),
        _ => persist::save_json(dir, "links", &seed.links),
    }
}
