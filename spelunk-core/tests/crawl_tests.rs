// Tests for crawl orchestration

use spelunk_core::crawl::{CrawlOptions, CrawlProgressCallback, execute_crawl};
use spelunk_scanner::{CancellationToken, NodeStatus, ScanError, TransportConfig};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|l| format!("<a href=\"{}\">{}</a>", l, l))
        .collect();
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_bytes(format!("<html><body>{}</body></html>", anchors))
}

async fn mount(server: &MockServer, at: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html(links))
        .mount(server)
        .await;
}

fn options(server: &MockServer) -> CrawlOptions {
    CrawlOptions {
        max_depth: None,
        workers: 4,
        transport: TransportConfig::direct(),
        ..CrawlOptions::new(format!("{}/", server.uri()))
    }
}

// ============================================================================
// Defaults
// ============================================================================

#[test]
fn test_crawl_options_defaults() {
    let options = CrawlOptions::new("http://example.onion");
    assert_eq!(options.max_depth, Some(1));
    assert!(options.extensions.is_empty());
    assert!(options.transport.proxy.is_some());
    assert!(!options.show_progress);
}

// ============================================================================
// Execution
// ============================================================================

#[tokio::test]
async fn test_execute_crawl_builds_graph() {
    let server = MockServer::start().await;
    mount(&server, "/", &["/a", "/b"]).await;
    mount(&server, "/a", &["/"]).await;
    mount(&server, "/b", &[]).await;

    let graph = execute_crawl(options(&server), CancellationToken::new(), None)
        .await
        .unwrap();

    assert!(graph.is_complete());
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.root_node().children.len(), 2);
    assert!(graph.iter().all(|(_, n)| n.status.is_fetched()));
}

#[tokio::test]
async fn test_execute_crawl_respects_depth() {
    let server = MockServer::start().await;
    mount(&server, "/", &["/a"]).await;
    mount(&server, "/a", &["/deeper"]).await;
    Mock::given(method("GET"))
        .and(path("/deeper"))
        .respond_with(html(&[]))
        .expect(0)
        .mount(&server)
        .await;

    let opts = CrawlOptions {
        max_depth: Some(1),
        ..options(&server)
    };
    let graph = execute_crawl(opts, CancellationToken::new(), None)
        .await
        .unwrap();

    assert_eq!(graph.len(), 2);
    let a = graph.get(&format!("{}/a", server.uri())).unwrap();
    assert_eq!(a.links.len(), 1);
    assert!(a.children.is_empty());
}

#[tokio::test]
async fn test_execute_crawl_reports_progress() {
    let server = MockServer::start().await;
    mount(&server, "/", &["/a"]).await;
    mount(&server, "/a", &[]).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: CrawlProgressCallback = Arc::new(move |url| sink.lock().unwrap().push(url));

    execute_crawl(options(&server), CancellationToken::new(), Some(callback))
        .await
        .unwrap();

    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_execute_crawl_marks_dead_pages() {
    let server = MockServer::start().await;
    mount(&server, "/", &["/gone"]).await;

    let graph = execute_crawl(options(&server), CancellationToken::new(), None)
        .await
        .unwrap();

    let gone = graph.get(&format!("{}/gone", server.uri())).unwrap();
    assert_eq!(gone.status, NodeStatus::Unreachable(ScanError::HttpError(404)));
}

#[tokio::test]
async fn test_execute_crawl_rejects_bad_seed() {
    let opts = CrawlOptions {
        transport: TransportConfig::direct(),
        ..CrawlOptions::new("not a url")
    };
    let err = execute_crawl(opts, CancellationToken::new(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidUrl(_)));
}

#[tokio::test]
async fn test_execute_crawl_cancelled_returns_partial() {
    let server = MockServer::start().await;
    mount(&server, "/", &["/a"]).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let graph = execute_crawl(options(&server), cancel, None).await.unwrap();

    assert!(!graph.is_complete());
    assert_eq!(graph.len(), 1);
}
