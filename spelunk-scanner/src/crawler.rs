use crate::error::{Result, ScanError};
use crate::graph::{LinkGraph, Node, NodeId, NodeStatus, SkipReason};
use crate::parser::{normalize_url, parse_page};
use crate::transport::{Transport, TransportConfig};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

pub const DEFAULT_WORKERS: usize = 8;

/// Which discovered links may become children.
#[derive(Debug, Clone, Default)]
struct ExpansionPolicy {
    max_depth: Option<usize>,
    /// host suffixes without the leading dot, lowercased
    extensions: Vec<String>,
}

impl ExpansionPolicy {
    fn expands(&self, depth: usize) -> bool {
        self.max_depth.is_none_or(|max| depth < max)
    }

    fn allows(&self, url: &Url) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.extensions
            .iter()
            .any(|ext| host == *ext || host.ends_with(&format!(".{}", ext)))
    }
}

fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    (!ext.is_empty()).then_some(ext)
}

struct Job {
    id: NodeId,
    url: Url,
    depth: usize,
}

enum Visit {
    Parsed {
        links: Vec<String>,
        emails: Vec<String>,
    },
    NotHtml(String),
    Failed(ScanError),
}

/// Nodes and the visited index of a crawl in progress.
///
/// Registered nodes start out as `Skipped(Cancelled)` and are overwritten
/// when their fetch settles, so anything left over after an abort is
/// already labelled correctly.
#[derive(Clone, Default)]
struct Arena {
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
}

impl Arena {
    /// Register `uri` if nobody has yet. Returns `None` for visited URLs.
    fn claim(&mut self, uri: &str, depth: usize) -> Option<NodeId> {
        if self.index.contains_key(uri) {
            return None;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(
            uri.to_string(),
            depth,
            NodeStatus::Skipped(SkipReason::Cancelled),
        ));
        self.index.insert(uri.to_string(), id);
        Some(id)
    }

    fn settle(&mut self, id: NodeId, visit: &Visit) {
        let node = &mut self.nodes[id.index()];
        match visit {
            Visit::Parsed { links, emails } => {
                node.status = NodeStatus::Fetched;
                node.links = links.clone();
                node.emails = emails.clone();
            }
            Visit::NotHtml(content_type) => {
                node.status = NodeStatus::Skipped(SkipReason::NotHtml(content_type.clone()));
            }
            Visit::Failed(err) => {
                node.status = NodeStatus::Unreachable(err.clone());
            }
        }
    }
}

/// Builds a [`LinkGraph`] from a seed URL with a bounded pool of fetch tasks.
pub struct Crawler {
    transport: Transport,
    policy: ExpansionPolicy,
    workers: usize,
    progress_callback: Option<ProgressCallback>,
}

impl Crawler {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            policy: ExpansionPolicy::default(),
            workers: DEFAULT_WORKERS,
            progress_callback: None,
        }
    }

    pub fn with_config(config: TransportConfig) -> Result<Self> {
        Ok(Self::new(Transport::new(config)?))
    }

    /// `None` expands until nothing new is reachable.
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.policy.max_depth = depth;
        self
    }

    /// Only links whose host ends in one of these suffixes are expanded.
    /// Empty means everything is eligible.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.policy.extensions = extensions
            .into_iter()
            .filter_map(|ext| normalize_extension(ext.as_ref()))
            .collect();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub async fn crawl(&self, seed_url: &str) -> Result<LinkGraph> {
        self.crawl_with_cancel(seed_url, CancellationToken::new())
            .await
    }

    /// Crawl from `seed_url` until the frontier is empty or `cancel` fires.
    ///
    /// Only a malformed seed is an error. Pages that fail to load end up as
    /// `Unreachable` nodes. When cancelled, the graph built so far is
    /// returned with [`LinkGraph::is_complete`] set to `false`.
    pub async fn crawl_with_cancel(
        &self,
        seed_url: &str,
        cancel: CancellationToken,
    ) -> Result<LinkGraph> {
        let seed = normalize_url(seed_url)?;
        info!("Starting crawl of {} with {} workers", seed, self.workers);

        let mut arena = Arena::default();
        let root = arena
            .claim(seed.as_str(), 0)
            .ok_or_else(|| ScanError::InvalidUrl(seed.to_string()))?;
        let arena = Arc::new(Mutex::new(arena));
        let policy = Arc::new(self.policy.clone());

        let mut queue = VecDeque::from([Job {
            id: root,
            url: seed,
            depth: 0,
        }]);
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, NodeId> = HashMap::new();
        let mut cancelled = false;

        loop {
            while tasks.len() < self.workers {
                let Some(job) = queue.pop_front() else {
                    break;
                };
                let id = job.id;
                let handle = tasks.spawn(Self::visit_static(
                    self.transport.clone(),
                    arena.clone(),
                    policy.clone(),
                    self.progress_callback.clone(),
                    job,
                ));
                in_flight.insert(handle.id(), id);
            }

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Crawl cancelled with {} fetches in flight", tasks.len());
                    cancelled = true;
                    tasks.shutdown().await;
                    break;
                }
                joined = tasks.join_next_with_id() => match joined {
                    Some(Ok((task_id, new_jobs))) => {
                        in_flight.remove(&task_id);
                        queue.extend(new_jobs);
                    }
                    Some(Err(e)) => {
                        warn!("Crawl worker failed: {}", e);
                        if let Some(id) = in_flight.remove(&e.id()) {
                            arena.lock().await.settle(
                                id,
                                &Visit::Failed(ScanError::ConnectionFailed(format!(
                                    "worker failed: {}",
                                    e
                                ))),
                            );
                        }
                    }
                    None => break,
                }
            }
        }
        drop(tasks);

        let arena = match Arc::try_unwrap(arena) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        info!(
            "Crawl {}. Registered {} pages",
            if cancelled { "aborted" } else { "complete" },
            arena.nodes.len()
        );

        Ok(LinkGraph::from_parts(arena.nodes, root, !cancelled))
    }

    /// Fetch and parse one page, record the outcome and claim its children.
    /// Returns the newly claimed pages that still need fetching.
    async fn visit_static(
        transport: Transport,
        arena: Arc<Mutex<Arena>>,
        policy: Arc<ExpansionPolicy>,
        progress_callback: Option<ProgressCallback>,
        job: Job,
    ) -> Vec<Job> {
        if let Some(callback) = &progress_callback {
            callback(job.url.to_string());
        }

        let visit = match transport.fetch(&job.url).await {
            Ok(page) if page.is_html() => {
                let parsed = parse_page(&page.body, &page.url);
                if let Some(degraded) = parsed.degraded() {
                    warn!("{}: {}", job.url, degraded);
                }
                Visit::Parsed {
                    links: parsed.links,
                    emails: parsed.emails,
                }
            }
            Ok(page) => Visit::NotHtml(page.content_type.unwrap_or_default()),
            Err(e) => {
                warn!("{} unreachable: {}", job.url, e);
                Visit::Failed(e)
            }
        };

        // claim-and-append happens under one lock so two parents racing for
        // the same URL cannot both adopt it
        let mut arena = arena.lock().await;
        arena.settle(job.id, &visit);

        let Visit::Parsed { links, .. } = &visit else {
            return Vec::new();
        };
        if !policy.expands(job.depth) {
            return Vec::new();
        }

        let mut jobs = Vec::new();
        for link in links {
            let Ok(url) = Url::parse(link) else {
                continue;
            };
            if !policy.allows(&url) {
                debug!("  -> {} filtered by extension allow-list", link);
                continue;
            }
            match arena.claim(link, job.depth + 1) {
                Some(child) => {
                    arena.nodes[job.id.index()].children.push(child);
                    jobs.push(Job {
                        id: child,
                        url,
                        depth: job.depth + 1,
                    });
                }
                None => debug!("  -> {} already visited", link),
            }
        }

        jobs
    }
}
