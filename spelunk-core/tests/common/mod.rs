// Shared mock site for the integration tests

#![allow(dead_code)]

use spelunk_core::crawl::{CrawlOptions, execute_crawl};
use spelunk_scanner::{CancellationToken, LinkGraph, TransportConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_bytes(format!("<html><body>{}</body></html>", body))
}

pub async fn mount(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html(body))
        .mount(server)
        .await;
}

/// `/` -> `/a`, `/gone` (404), `/b`; `/a` -> `/c`, `/`; `/b` -> `/a`.
pub async fn small_site() -> MockServer {
    let server = MockServer::start().await;
    mount(
        &server,
        "/",
        r#"<a href="/a">a</a> <a href="/gone">gone</a> <a href="/b">b</a>
           <a href="mailto:admin@example.onion">mail</a>"#,
    )
    .await;
    mount(
        &server,
        "/a",
        r#"<a href="/c">c</a> <a href="/">home</a> contact: ops@example.onion"#,
    )
    .await;
    mount(&server, "/b", r#"<a href="/a">a again</a>"#).await;
    mount(&server, "/c", "leaf").await;
    server
}

pub async fn crawl(server: &MockServer) -> LinkGraph {
    let options = CrawlOptions {
        max_depth: None,
        workers: 4,
        transport: TransportConfig::direct(),
        ..CrawlOptions::new(format!("{}/", server.uri()))
    };
    execute_crawl(options, CancellationToken::new(), None)
        .await
        .unwrap()
}

pub async fn single_page() -> (MockServer, LinkGraph) {
    let server = MockServer::start().await;
    mount(&server, "/", "nothing to see").await;
    let graph = crawl(&server).await;
    (server, graph)
}
