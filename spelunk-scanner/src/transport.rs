use crate::error::{Result, ScanError};
use reqwest::{Client, Proxy};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_PROXY_HOST: &str = "127.0.0.1";
pub const DEFAULT_PROXY_PORT: u16 = 9050;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// SOCKS5 proxy endpoint. Hostnames are resolved on the proxy side, which
/// is what makes `.onion` addresses reachable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

impl ProxyConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn url(&self) -> String {
        format!("socks5h://{}:{}", self.host, self.port)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_HOST, DEFAULT_PROXY_PORT)
    }
}

impl fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub proxy: Option<ProxyConfig>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl TransportConfig {
    /// Talk to targets directly, without a proxy.
    pub fn direct() -> Self {
        Self {
            proxy: None,
            ..Self::default()
        }
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            proxy: Some(ProxyConfig::default()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!(
                "Spelunk/{} (https://github.com/trapdoorsec/spelunk)",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

/// A successfully retrieved response.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Page {
    /// Missing content types are treated as HTML; hidden services often omit the header.
    pub fn is_html(&self) -> bool {
        is_html_type(self.content_type.as_deref())
    }
}

fn is_html_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text/html") || ct.contains("application/xhtml")
        })
        .unwrap_or(true)
}

/// HTTP(S) GET client bound to one proxy configuration. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    config: TransportConfig,
}

impl Transport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5));

        if let Some(proxy) = &config.proxy {
            let proxy = Proxy::all(proxy.url())
                .map_err(|e| ScanError::Client(format!("Invalid proxy {}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        } else {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| ScanError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Single GET, no retries. Non-2xx statuses are reported as `HttpError`.
    /// The body is only read for HTML responses.
    pub async fn fetch(&self, url: &Url) -> Result<Page> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScanError::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                url
            )));
        }

        debug!("Fetching {}", url);
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            debug!("{} answered {}", url, status);
            return Err(ScanError::HttpError(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let final_url = response.url().clone();
        // only HTML bodies are parsed
        let body = if is_html_type(content_type.as_deref()) {
            response.text().await?
        } else {
            debug!("{} is {:?}, body not read", url, content_type);
            String::new()
        };

        Ok(Page {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[test]
    fn test_proxy_url_uses_remote_dns() {
        let proxy = ProxyConfig::new("10.0.0.2", 9150);
        assert_eq!(proxy.url(), "socks5h://10.0.0.2:9150");
        assert_eq!(ProxyConfig::default().to_string(), "127.0.0.1:9050");
    }

    #[test]
    fn test_default_config_goes_through_local_proxy() {
        let config = TransportConfig::default();
        assert_eq!(config.proxy, Some(ProxyConfig::default()));
        assert!(TransportConfig::direct().proxy.is_none());
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_bytes("<html>hi</html>"),
            )
            .mount(&mock_server)
            .await;

        let transport = Transport::new(TransportConfig::direct()).unwrap();
        let url = Url::parse(&mock_server.uri()).unwrap();
        let page = transport.fetch(&url).await.unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<html>hi</html>");
        assert!(page.is_html());
    }

    #[tokio::test]
    async fn test_fetch_skips_non_html_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(vec![b'%'; 64 * 1024]),
            )
            .mount(&mock_server)
            .await;

        let transport = Transport::new(TransportConfig::direct()).unwrap();
        let url = Url::parse(&format!("{}/doc.pdf", mock_server.uri())).unwrap();
        let page = transport.fetch(&url).await.unwrap();

        assert_eq!(page.content_type.as_deref(), Some("application/pdf"));
        assert!(!page.is_html());
        assert!(page.body.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_maps_non_success_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let transport = Transport::new(TransportConfig::direct()).unwrap();
        let url = Url::parse(&format!("{}/missing", mock_server.uri())).unwrap();

        assert_eq!(transport.fetch(&url).await.unwrap_err(), ScanError::HttpError(404));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&mock_server)
            .await;

        let config = TransportConfig::direct().with_timeout(Duration::from_millis(200));
        let transport = Transport::new(config).unwrap();
        let url = Url::parse(&mock_server.uri()).unwrap();

        assert_eq!(transport.fetch(&url).await.unwrap_err(), ScanError::Timeout);
    }

    #[tokio::test]
    async fn test_fetch_refuses_closed_port() {
        // bind then drop so the port is known to be closed
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = Transport::new(TransportConfig::direct()).unwrap();
        let url = Url::parse(&format!("http://{}/", addr)).unwrap();

        assert!(matches!(
            transport.fetch(&url).await.unwrap_err(),
            ScanError::ConnectionFailed(_)
        ));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_scheme() {
        let transport = Transport::new(TransportConfig::direct()).unwrap();
        let url = Url::parse("ftp://example.com/file").unwrap();

        assert!(matches!(
            transport.fetch(&url).await.unwrap_err(),
            ScanError::InvalidUrl(_)
        ));
    }

    #[test]
    fn test_missing_content_type_counts_as_html() {
        let page = Page {
            url: Url::parse("http://example.onion/").unwrap(),
            status: 200,
            content_type: None,
            body: String::new(),
        };
        assert!(page.is_html());

        let pdf = Page {
            content_type: Some("application/pdf".to_string()),
            ..page
        };
        assert!(!pdf.is_html());
    }
}
