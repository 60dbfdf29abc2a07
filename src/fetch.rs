//! Thin HTTP fetch capability.
//!
//! The orchestrator only needs "give me a status code and a body for this
//! URL"; everything else about transport lives behind [`PageFetcher`] so
//! tests can substitute a recording stub.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::crawler::CrawlError;

/// User agent for outbound requests.
pub const USER_AGENT: &str = "webharvest/0.4 (research crawler)";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What a fetch produces: a status code and the raw body bytes.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status_code: u16,
    pub body: Vec<u8>,
}

/// The fetch capability consumed by crawl strategies.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, CrawlError>;
}

/// reqwest-backed fetcher.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, CrawlError> {
        let response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(FetchResponse { status_code, body })
    }
}
