use indicatif::{ProgressBar, ProgressStyle};
use spelunk_scanner::{Crawler, LinkGraph, ScanError, TransportConfig, crawler::DEFAULT_WORKERS};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Options for configuring a crawl operation
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub url: String,
    /// Host suffixes eligible for expansion; empty means any host.
    pub extensions: Vec<String>,
    /// `None` for no depth bound.
    pub max_depth: Option<usize>,
    pub workers: usize,
    pub transport: TransportConfig,
    pub show_progress: bool,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extensions: Vec::new(),
            max_depth: Some(1),
            workers: DEFAULT_WORKERS,
            transport: TransportConfig::default(),
            show_progress: false,
        }
    }
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Starting crawl...");
    pb
}

/// Crawl from `options.url` until the frontier is exhausted or `cancel`
/// fires. A cancelled crawl still returns the partial graph.
///
/// Only failures that prevent any crawl at all (bad seed, unusable proxy
/// settings) are returned as errors.
pub async fn execute_crawl(
    options: CrawlOptions,
    cancel: CancellationToken,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<LinkGraph, ScanError> {
    let CrawlOptions {
        url,
        extensions,
        max_depth,
        workers,
        transport,
        show_progress,
    } = options;

    let progress_bar = show_progress.then(|| Arc::new(spinner()));
    let processed = Arc::new(AtomicUsize::new(0));

    let pb = progress_bar.clone();
    let count = processed.clone();
    let external = progress_callback.clone();
    let internal: spelunk_scanner::ProgressCallback = Arc::new(move |url: String| {
        let n = count.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(pb) = &pb {
            pb.set_message(format!("Crawling... {} pages visited ({})", n, url));
        }
        if let Some(cb) = &external {
            cb(url);
        }
    });

    let crawler = Crawler::with_config(transport)?
        .with_max_depth(max_depth)
        .with_extensions(extensions)
        .with_workers(workers)
        .with_progress_callback(internal);

    let result = crawler.crawl_with_cancel(&url, cancel).await;

    let total = processed.load(Ordering::Relaxed);
    if let Some(pb) = &progress_bar {
        match &result {
            Ok(graph) if graph.is_complete() => {
                pb.finish_with_message(format!("Crawl complete! {} pages visited", total))
            }
            Ok(_) => pb.finish_with_message(format!("Crawl cancelled after {} pages", total)),
            Err(_) => pb.finish_and_clear(),
        }
    }

    if let Ok(graph) = &result {
        info!(
            "Crawl of {} finished: {} nodes, complete={}",
            url,
            graph.len(),
            graph.is_complete()
        );
    }

    result
}
