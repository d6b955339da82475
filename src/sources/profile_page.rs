//! Direct profile-page retrieval and field extraction (fallback source)
//!
//! Fetches the author's public profile page with browser-like headers and a
//! User-Agent drawn from a small fixed pool, then pulls the stat cells out of
//! the markup. The page structure is an external collaborator that can change
//! without notice: a missing table degrades to zero-valued fields instead of
//! failing the strategy.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::{header, Client};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::classify_status;
use crate::config::Config;
use crate::types::{FetchError, StatsRecord, StatsSource};

/// Rotating through a handful of desktop browser identities blunts the most
/// trivial bot fingerprinting.
const USER_AGENT_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Version/17.1 Safari/605.1.15",
];

pub struct ProfilePageClient {
    client: Client,
    base_url: String,
}

impl ProfilePageClient {
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| FetchError::NotAvailable(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.profile_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn profile_url(&self, author_id: &str) -> String {
        format!("{}/citations?user={}&hl=en", self.base_url, author_id)
    }
}

#[async_trait]
impl StatsSource for ProfilePageClient {
    fn name(&self) -> &'static str {
        "profile-page"
    }

    async fn fetch(&self, author_id: &str) -> Result<StatsRecord, FetchError> {
        let url = self.profile_url(author_id);
        let user_agent = *USER_AGENT_POOL
            .choose(&mut rand::thread_rng())
            .expect("non-empty pool");
        debug!(%url, user_agent, "fetching profile page");

        let response = self
            .client
            .get(&url)
            .header(header::USER_AGENT, user_agent)
            .header(
                header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("request to {} failed: {}", url, e)))?;

        // A denial status short-circuits before the body is read.
        classify_status(response.status())?;

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("reading profile page body: {}", e)))?;

        let counts = extract_counts(&body);
        if counts == PageCounts::default() {
            warn!("profile page yielded no recognizable stats");
        }

        Ok(StatsRecord::new(
            counts.citations,
            counts.publications,
            counts.h_index,
            counts.i10_index,
        ))
    }
}

/// Raw counts pulled out of the profile markup
#[derive(Debug, Default, PartialEq)]
pub(crate) struct PageCounts {
    pub citations: u64,
    pub h_index: u64,
    pub i10_index: u64,
    pub publications: u64,
}

/// Extract the stat cells and publication-row count from profile markup.
///
/// The stats table is located by its structural marker; its cells are read in
/// fixed position order (0 = citations, 2 = h-index, 4 = i10-index, the odd
/// positions being the "since year" variants). Absent table or cells degrade
/// to zero. The publication-row count is taken regardless of table presence.
pub(crate) fn extract_counts(html: &str) -> PageCounts {
    let document = Html::parse_document(html);
    let table = Selector::parse("table#gsc_rsb_st").expect("static selector");
    let cell = Selector::parse("td.gsc_rsb_std").expect("static selector");
    let row = Selector::parse("tr.gsc_a_tr").expect("static selector");

    let mut counts = PageCounts::default();

    if let Some(stats_table) = document.select(&table).next() {
        let cells: Vec<String> = stats_table
            .select(&cell)
            .map(|c| c.text().collect::<String>())
            .collect();
        counts.citations = parse_count(cells.first());
        counts.h_index = parse_count(cells.get(2));
        counts.i10_index = parse_count(cells.get(4));
    }

    counts.publications = document.select(&row).count() as u64;
    counts
}

/// Parse one stat cell, stripping thousands separators. Anything unparsable
/// counts as zero.
fn parse_count(cell: Option<&String>) -> u64 {
    cell.map(|text| text.replace(',', ""))
        .and_then(|text| text.trim().parse().ok())
        .unwrap_or(0)
}
