//! Structured scholarly-bridge client (first-choice source)
//!
//! Queries a JSON API wrapping the scholar site: resolve the author profile
//! for its aggregate indices, then fetch the publication list and take its
//! length. The backing service is a black box and rate-limited; every failure
//! is folded into a `FetchError` and handled by the orchestrator.
//!
//! Inside a CI sandbox the client opportunistically reroutes through a
//! configured proxy after the first transport failure, as a mitigation for
//! IP-based blocking rather than a correctness requirement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::classify_status;
use crate::config::Config;
use crate::types::{FetchError, StatsRecord, StatsSource};

const USER_AGENT: &str = concat!("scholar-sync/", env!("CARGO_PKG_VERSION"));

pub struct ScholarApiClient {
    base_url: String,
    direct: Client,
    proxied: Option<Client>,
    use_proxy: AtomicBool,
    in_ci: bool,
}

/// Author document returned by `GET {base}/author/{id}`
#[derive(Debug, Deserialize)]
struct AuthorDocument {
    #[serde(default)]
    cited_by: u64,
    #[serde(default)]
    h_index: u64,
    #[serde(default)]
    i10_index: u64,
}

/// One entry of `GET {base}/author/{id}/publications`; only the list length
/// is consumed.
#[derive(Debug, Deserialize)]
struct PublicationEntry {
    #[serde(default)]
    #[allow(dead_code)]
    title: String,
}

impl ScholarApiClient {
    /// Build the client if the bridge endpoint is configured. `Ok(None)`
    /// means "not configured, skip the source"; `Err` means the source is
    /// configured but cannot operate (e.g. malformed proxy URL).
    pub fn from_config(config: &Config) -> Result<Option<Self>, FetchError> {
        let Some(base_url) = config.api_base_url.clone() else {
            return Ok(None);
        };

        let timeout = Duration::from_secs(config.request_timeout_secs);
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));

        let direct = Client::builder()
            .timeout(timeout)
            .default_headers(headers.clone())
            .build()
            .map_err(|e| FetchError::NotAvailable(format!("HTTP client build failed: {}", e)))?;

        let proxied = match &config.proxy_url {
            Some(url) => {
                let proxy = reqwest::Proxy::all(url)
                    .map_err(|e| FetchError::NotAvailable(format!("bad proxy URL {}: {}", url, e)))?;
                Some(
                    Client::builder()
                        .timeout(timeout)
                        .default_headers(headers)
                        .proxy(proxy)
                        .build()
                        .map_err(|e| {
                            FetchError::NotAvailable(format!("proxied client build failed: {}", e))
                        })?,
                )
            }
            None => None,
        };

        Ok(Some(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            direct,
            proxied,
            use_proxy: AtomicBool::new(false),
            in_ci: Config::in_ci_sandbox(),
        }))
    }

    fn client(&self) -> &Client {
        if self.use_proxy.load(Ordering::Relaxed) {
            self.proxied.as_ref().unwrap_or(&self.direct)
        } else {
            &self.direct
        }
    }

    /// Flip later attempts onto the proxy after a transport failure in CI.
    fn note_transport_failure(&self) {
        if self.in_ci && self.proxied.is_some() && !self.use_proxy.swap(true, Ordering::Relaxed) {
            warn!("structured API request failed in CI sandbox; rerouting retries through proxy");
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self
            .client()
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotAvailable(format!("author not found at {}", url)));
        }
        classify_status(status)?;

        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::Parse(format!("decoding {}: {}", url, e)))
    }

    async fn resolve_and_fill(&self, author_id: &str) -> Result<StatsRecord, FetchError> {
        let author: AuthorDocument = self
            .get_json(&format!("{}/author/{}", self.base_url, author_id))
            .await?;
        let publications: Vec<PublicationEntry> = self
            .get_json(&format!("{}/author/{}/publications", self.base_url, author_id))
            .await?;

        debug!(
            cited_by = author.cited_by,
            h_index = author.h_index,
            i10_index = author.i10_index,
            publications = publications.len(),
            "structured API resolution complete"
        );

        Ok(StatsRecord::new(
            author.cited_by,
            publications.len() as u64,
            author.h_index,
            author.i10_index,
        ))
    }
}

#[async_trait]
impl StatsSource for ScholarApiClient {
    fn name(&self) -> &'static str {
        "scholar-api"
    }

    async fn fetch(&self, author_id: &str) -> Result<StatsRecord, FetchError> {
        let result = self.resolve_and_fill(author_id).await;
        if matches!(result, Err(FetchError::Transport(_))) {
            self.note_transport_failure();
        }
        result
    }
}
