//! Page fetching over HTTP
//!
//! A single GET per URL with the run-wide user agent, extra headers, proxy
//! settings, and timeout. There are no retries: the next scheduled run is the
//! retry.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::config::FetchSettings;

/// Errors that can occur during fetching
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server responded with status {0}")]
    Status(u16),
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Response body is empty")]
    EmptyBody,
    #[error("Invalid fetch configuration: {0}")]
    Config(String),
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Response body
    pub body: String,
    /// Time taken to fetch
    pub fetch_duration: Duration,
}

/// Source of page content for the orchestrator
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher
pub struct FetchEngine {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl FetchEngine {
    /// Build a fetcher from run-wide settings
    pub fn new(settings: &FetchSettings) -> Result<Self, FetchError> {
        let timeout = settings.timeout();

        let mut headers = HeaderMap::new();
        for (name, value) in &settings.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::Config(format!("header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::Config(format!("header '{}' value: {}", name, e)))?;
            headers.insert(name, value);
        }

        // Proxies come only from settings, which already folded in the environment
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .user_agent(&settings.user_agent)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .no_proxy();

        let bypass = settings
            .no_proxy
            .as_deref()
            .and_then(reqwest::NoProxy::from_string);
        if let Some(proxy) = &settings.http_proxy {
            builder = builder.proxy(
                reqwest::Proxy::http(proxy)
                    .map_err(|e| FetchError::Config(format!("http_proxy '{}': {}", proxy, e)))?
                    .no_proxy(bypass.clone()),
            );
        }
        if let Some(proxy) = &settings.https_proxy {
            builder = builder.proxy(
                reqwest::Proxy::https(proxy)
                    .map_err(|e| FetchError::Config(format!("https_proxy '{}': {}", proxy, e)))?
                    .no_proxy(bypass),
            );
        }

        Ok(Self {
            http_client: builder.build()?,
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Http(err)
        }
    }
}

#[async_trait]
impl PageFetcher for FetchEngine {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let start = Instant::now();

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let final_url = response.url().to_string();

        let body = response.text().await.map_err(|e| self.classify(e))?;
        if body.trim().is_empty() {
            return Err(FetchError::EmptyBody);
        }

        debug!("Successfully fetched {} ({} bytes)", url, body.len());
        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            body,
            fetch_duration: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::response::Html;
    use axum::routing::get;
    use axum::Router;

    async fn serve() -> String {
        let app = Router::new()
            .route("/page", get(|| async { Html("<html><body><p>Hello</p></body></html>") }))
            .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }))
            .route("/empty", get(|| async { "   " }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    "late"
                }),
            )
            .route(
                "/echo",
                get(|headers: AxumHeaders| async move {
                    let ua = headers
                        .get("user-agent")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    let extra = headers
                        .get("x-monitor")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default();
                    format!("{}|{}", ua, extra)
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn fetches_page_body_and_status() {
        let base = serve().await;
        let engine = FetchEngine::new(&FetchSettings::default()).unwrap();

        let page = engine.fetch(&format!("{}/page", base)).await.unwrap();
        assert_eq!(page.status_code, 200);
        assert!(page.body.contains("<p>Hello</p>"));
        assert!(page.final_url.ends_with("/page"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let base = serve().await;
        let engine = FetchEngine::new(&FetchSettings::default()).unwrap();

        let err = engine.fetch(&format!("{}/missing", base)).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)), "got {:?}", err);
    }

    #[tokio::test]
    async fn blank_body_is_an_error() {
        let base = serve().await;
        let engine = FetchEngine::new(&FetchSettings::default()).unwrap();

        let err = engine.fetch(&format!("{}/empty", base)).await.unwrap_err();
        assert!(matches!(err, FetchError::EmptyBody));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let base = serve().await;
        let settings = FetchSettings {
            timeout_secs: 1,
            ..Default::default()
        };
        let engine = FetchEngine::new(&settings).unwrap();

        let err = engine.fetch(&format!("{}/slow", base)).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn sends_configured_user_agent_and_headers() {
        let base = serve().await;
        let mut settings = FetchSettings {
            user_agent: "pagewatch-test/1.0".to_string(),
            ..Default::default()
        };
        settings.headers.insert("X-Monitor".to_string(), "yes".to_string());
        let engine = FetchEngine::new(&settings).unwrap();

        let page = engine.fetch(&format!("{}/echo", base)).await.unwrap();
        assert_eq!(page.body, "pagewatch-test/1.0|yes");
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let engine = FetchEngine::new(&FetchSettings::default()).unwrap();
        // Port 9 (discard) on localhost is closed in test environments
        let result = engine.fetch("http://127.0.0.1:9/").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn no_proxy_hosts_bypass_the_proxy() {
        let base = serve().await;
        let closed_proxy = Some("http://127.0.0.1:9".to_string());

        let proxied = FetchEngine::new(&FetchSettings {
            http_proxy: closed_proxy.clone(),
            ..Default::default()
        })
        .unwrap();
        assert!(proxied.fetch(&format!("{}/page", base)).await.is_err());

        let bypassed = FetchEngine::new(&FetchSettings {
            http_proxy: closed_proxy,
            no_proxy: Some("localhost,127.0.0.1".to_string()),
            ..Default::default()
        })
        .unwrap();
        let page = bypassed.fetch(&format!("{}/page", base)).await.unwrap();
        assert_eq!(page.status_code, 200);
    }

    #[test]
    fn invalid_header_is_a_config_error() {
        let mut settings = FetchSettings::default();
        settings.headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(FetchEngine::new(&settings), Err(FetchError::Config(_))));
    }
}
