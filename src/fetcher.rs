use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use tracing::debug;

use crate::error::FetchError;

/// Raw result of a successful page fetch.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
    pub latency_ms: u64,
}

/// Anything that can hand back the markup behind a URL.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

/// Single-attempt HTTP GET with a bounded timeout and a fixed User-Agent.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

/// Parse and restrict to http(s) before any I/O happens.
pub fn validate_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, raw_url: &str) -> Result<FetchedPage, FetchError> {
        let url = validate_url(raw_url)?;

        let start = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(raw_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(raw_url, e))?;
        let latency_ms = start.elapsed().as_millis() as u64;

        debug!(
            final_url = %final_url,
            status = status.as_u16(),
            bytes = body.len(),
            latency_ms,
            "Fetched page"
        );

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
            latency_ms,
        })
    }
}

// ── Tests ──
