//! Sequential page fetcher with retry, backoff, and a per-run page cache.
//!
//! Every page of a run is requested at most once: the general page is parsed
//! for both the category table and the sub-source links, and sub-source pages
//! are fetched one after another in link order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use rosterwatch_shared::{FetchConfig, Result, RosterwatchError, RowBatch, SourceTables};

use crate::tables::{self, GeneralPage};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("rosterwatch/", env!("CARGO_PKG_VERSION"));

/// Upper bound for a single backoff sleep.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Why a single attempt failed.
enum AttemptError {
    /// Worth another try (connect error, timeout, 5xx, 429).
    Transient(String),
    /// Retrying will not help (4xx, unreadable body).
    Permanent(String),
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// HTTP fetcher used for one reconciliation run.
pub struct Fetcher {
    config: FetchConfig,
    client: Client,
    cache: Mutex<HashMap<String, String>>,
    requests: AtomicUsize,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RosterwatchError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            cache: Mutex::new(HashMap::new()),
            requests: AtomicUsize::new(0),
        })
    }

    /// Number of HTTP requests issued so far (cache hits excluded, retries included).
    pub fn requests_made(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Fetch a page body, serving repeated URLs from the run cache.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch(&self, url: &Url) -> Result<String> {
        if let Some(body) = self.cache.lock().await.get(url.as_str()) {
            debug!("page cache hit");
            return Ok(body.clone());
        }

        let body = self.fetch_with_retry(url).await?;
        self.cache
            .lock()
            .await
            .insert(url.to_string(), body.clone());
        Ok(body)
    }

    /// Fetch and parse the general-information page.
    pub async fn fetch_general(&self, url: &Url) -> Result<GeneralPage> {
        let body = self.fetch(url).await?;
        tables::parse_general_page(&body, url)
    }

    /// Fetch and parse one participant sub-source.
    pub async fn fetch_sub_source(&self, url: &Url) -> Result<RowBatch> {
        let body = self.fetch(url).await?;
        tables::parse_sub_source(&body, url.as_str())
    }

    /// Fetch the general page and every sub-source it links to, in order.
    ///
    /// Any failed sub-source aborts the whole scrape: skipping one would shift
    /// every later category back-fill.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_all(&self, url: &Url) -> Result<SourceTables> {
        let general = self.fetch_general(url).await?;
        info!(links = general.links.len(), "general table fetched");

        let mut sub_sources = Vec::with_capacity(general.links.len());
        for link in &general.links {
            sub_sources.push(self.fetch_sub_source(link).await?);
        }

        info!(
            sub_sources = sub_sources.len(),
            requests = self.requests_made(),
            "source tables fetched"
        );

        Ok(SourceTables {
            general: general.table,
            sub_sources,
        })
    }

    async fn fetch_with_retry(&self, url: &Url) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(AttemptError::Transient(reason)) if attempt < self.config.retries => {
                    let delay = backoff_delay(self.config.backoff_ms, attempt);
                    warn!(
                        %url,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        %reason,
                        "fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(AttemptError::Transient(reason)) | Err(AttemptError::Permanent(reason)) => {
                    return Err(RosterwatchError::source_unavailable(
                        url.as_str(),
                        format!("{reason} (after {} attempt(s))", attempt + 1),
                    ));
                }
            }
        }
    }

    async fn attempt(&self, url: &Url) -> std::result::Result<String, AttemptError> {
        let previous = self.requests.fetch_add(1, Ordering::Relaxed);
        if previous > 0 && self.config.rate_limit_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.rate_limit_ms)).await;
        }

        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = format!("HTTP {status}");
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                AttemptError::Transient(reason)
            } else {
                AttemptError::Permanent(reason)
            });
        }

        response
            .text()
            .await
            .map_err(|e| AttemptError::Permanent(format!("body read failed: {e}")))
    }
}

/// Exponential backoff: `base * 2^attempt`, capped.
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS))
}
