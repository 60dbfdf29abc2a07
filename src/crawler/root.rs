//! The fetch-and-record crawl strategy.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use super::config::CrawlConfig;
use super::paths::path_from_url;
use super::rate_limiter::DomainRateLimiter;
use super::templated_url::TemplatedUrl;
use super::variables::VariableBinding;
use super::CrawlError;
use crate::fetch::PageFetcher;
use crate::ledger::Ledger;
use crate::storage::FileWriter;

/// For each binding, resolves every templated URL the definition declares,
/// skips those the ledger already has (when the URL opts into caching),
/// fetches the rest, persists the payload, and records a version row.
pub struct RootCrawl {
    name: String,
    source_file: PathBuf,
    templated_urls: Vec<TemplatedUrl>,
    ledger: Ledger,
    fetcher: Arc<dyn PageFetcher>,
    writer: FileWriter,
    limiter: DomainRateLimiter,
}

impl RootCrawl {
    pub fn new(
        config: &CrawlConfig,
        ledger: Ledger,
        fetcher: Arc<dyn PageFetcher>,
        writer: FileWriter,
        limiter: DomainRateLimiter,
    ) -> Self {
        Self {
            name: config.name.clone(),
            source_file: config.path.clone(),
            templated_urls: config.urls.iter().map(TemplatedUrl::from).collect(),
            ledger,
            fetcher,
            writer,
            limiter,
        }
    }

    /// Process one binding: resolve and handle each templated URL in
    /// declaration order.
    pub async fn process(&mut self, binding: &VariableBinding) -> Result<(), CrawlError> {
        for index in 0..self.templated_urls.len() {
            let templated = self.templated_urls[index].clone();
            let url = templated.resolve(binding)?;
            if self.should_load(&url, templated.cache).await? {
                self.download(&url).await?;
            } else {
                info!("will not download '{}', as it is already downloaded", url);
            }
        }
        Ok(())
    }

    /// Whether a URL needs fetching. Uncached URLs always do; cached URLs
    /// only when the ledger has no prior version, however old.
    async fn should_load(&self, url: &str, cache: bool) -> Result<bool, CrawlError> {
        if !cache {
            return Ok(true);
        }
        let url_id = self.ledger.register_web_page(url).await?;
        Ok(self.ledger.latest_download(url_id).await?.is_none())
    }

    /// Fetch a URL and record the outcome.
    async fn download(&mut self, url: &str) -> Result<(), CrawlError> {
        // register_web_page rather than a bare lookup: the cache=false path
        // reaches here without ever touching the ledger.
        let url_id = self.ledger.register_web_page(url).await?;
        let relative = path_from_url(url)?;
        info!("downloading '{}' to '{}'", url, relative.display());

        self.limiter.limit(url).await;
        let response = self.fetcher.fetch(url).await?;
        let stored = self.writer.write(&relative, &response.body)?;

        self.ledger
            .register_download(
                url_id,
                &self.name,
                &self.source_file.to_string_lossy(),
                &relative.to_string_lossy(),
                &stored.to_string_lossy(),
                Some(response.status_code as i32),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::config::TemplatedUrlConfig;
    use crate::fetch::FetchResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Records every fetched URL; always succeeds with a 200.
    #[derive(Default)]
    struct StubFetcher {
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchResponse, CrawlError> {
            self.calls.lock().unwrap().push(url.to_string());
            Ok(FetchResponse {
                status_code: 200,
                body: b"stub body".to_vec(),
            })
        }
    }

    fn test_config(cache: bool) -> CrawlConfig {
        CrawlConfig {
            name: "filings".to_string(),
            inputs: vec![],
            variables: vec![],
            loop_variables: vec![],
            urls: vec![TemplatedUrlConfig {
                name: "filing-index".to_string(),
                url: "/filings/{ticker}".to_string(),
                cache,
            }],
            path: PathBuf::from("configs/filings.yaml"),
        }
    }

    fn test_binding() -> VariableBinding {
        let mut binding = VariableBinding::new();
        binding.set_scalar("url", json!("https://example.com"));
        binding.set_scalar("ticker", json!("ACME"));
        binding
    }

    async fn test_crawl(cache: bool) -> (RootCrawl, Arc<StubFetcher>, Ledger, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ledger = Ledger::open(&dir.path().join("ledger.db")).await.unwrap();
        let fetcher = Arc::new(StubFetcher::default());
        let crawl = RootCrawl::new(
            &test_config(cache),
            ledger.clone(),
            fetcher.clone(),
            FileWriter::new(dir.path().join("downloads")),
            DomainRateLimiter::new(Duration::ZERO),
        );
        (crawl, fetcher, ledger, dir)
    }

    #[tokio::test]
    async fn first_fetch_records_one_version() {
        let (mut crawl, fetcher, ledger, _dir) = test_crawl(true).await;

        crawl.process(&test_binding()).await.unwrap();

        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(ledger.version_count().await.unwrap(), 1);

        let url_id = ledger
            .get_url_id("https://example.com/filings/ACME")
            .await
            .unwrap()
            .expect("page registered");
        let latest = ledger.latest_download(url_id).await.unwrap().unwrap();
        assert_eq!(latest.dataset_name.as_deref(), Some("example/com/filings/ACME"));
        let stored = latest.content_file_path.unwrap();
        assert_eq!(std::fs::read(&stored).unwrap(), b"stub body");
    }

    #[tokio::test]
    async fn cached_url_with_prior_download_skips_the_fetch() {
        let (mut crawl, fetcher, ledger, _dir) = test_crawl(true).await;

        let url_id = ledger
            .register_web_page("https://example.com/filings/ACME")
            .await
            .unwrap();
        ledger
            .register_download(
                url_id,
                "filings",
                "configs/filings.yaml",
                "example/com/filings/ACME",
                "/data/prior",
                Some(200),
            )
            .await
            .unwrap();

        crawl.process(&test_binding()).await.unwrap();

        assert_eq!(fetcher.call_count(), 0);
        assert_eq!(ledger.version_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn uncached_url_fetches_every_time() {
        let (mut crawl, fetcher, ledger, _dir) = test_crawl(false).await;

        let binding = test_binding();
        crawl.process(&binding).await.unwrap();
        crawl.process(&binding).await.unwrap();

        assert_eq!(fetcher.call_count(), 2);
        assert_eq!(ledger.version_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn template_error_aborts_without_fetching() {
        let (mut crawl, fetcher, _ledger, _dir) = test_crawl(true).await;

        let mut binding = VariableBinding::new();
        binding.set_scalar("url", json!("https://example.com"));
        // No `ticker` value for the template.
        let err = crawl.process(&binding).await.unwrap_err();
        assert!(matches!(err, CrawlError::MissingVariable { name, .. } if name == "ticker"));
        assert_eq!(fetcher.call_count(), 0);
    }

    #[tokio::test]
    async fn version_row_carries_definition_name_and_file() {
        let (mut crawl, _fetcher, ledger, _dir) = test_crawl(false).await;

        crawl.process(&test_binding()).await.unwrap();

        let rows = ledger.latest_downloads().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_name, "filings");
        assert_eq!(rows[0].source_file, "configs/filings.yaml");
        assert_eq!(rows[0].status_code, Some(200));
    }
}
