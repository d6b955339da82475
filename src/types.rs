//! Core types shared across scholar-sync
//!
//! Defines the five-field stats snapshot, the source trait both fetch
//! strategies implement, and the fetch-layer error kinds.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One snapshot of an author profile's citation metrics.
///
/// Serialized keys match the JSON file consumed by the site:
/// `citations`, `publications`, `hIndex`, `i10Index`, `lastUpdated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    pub citations: u64,
    pub publications: u64,
    pub h_index: u64,
    pub i10_index: u64,
    /// Date the record was created, not the date the metrics changed.
    pub last_updated: NaiveDate,
}

impl StatsRecord {
    /// Build a record stamped with today's local date.
    pub fn new(citations: u64, publications: u64, h_index: u64, i10_index: u64) -> Self {
        Self {
            citations,
            publications,
            h_index,
            i10_index,
            last_updated: chrono::Local::now().date_naive(),
        }
    }

    /// An all-zero citations/publications record reads like a failed scrape,
    /// not a real profile. Persistence compares it against existing data
    /// before accepting it.
    pub fn is_empty(&self) -> bool {
        self.citations == 0 && self.publications == 0
    }
}

/// Fetch-layer error kinds
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network communication error (DNS, timeout, non-2xx)
    #[error("network error: {0}")]
    Transport(String),

    /// Explicit access-denial from the remote. Not worth retrying within
    /// this run; a later scheduled run may succeed.
    #[error("access denied by remote (HTTP {0})")]
    Blocked(u16),

    /// Response arrived but did not decode into the expected shape
    #[error("unexpected response shape: {0}")]
    Parse(String),

    /// Source cannot be used at all (missing endpoint, client build failure,
    /// unknown author)
    #[error("source not available: {0}")]
    NotAvailable(String),
}

/// One self-contained way of obtaining a stats record for an author profile.
///
/// Implementations never panic past this boundary; every failure is folded
/// into a `FetchError`.
#[async_trait]
pub trait StatsSource: Send + Sync {
    /// Source name for log lines
    fn name(&self) -> &'static str;

    /// Fetch the current stats for `author_id`.
    async fn fetch(&self, author_id: &str) -> Result<StatsRecord, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(citations: u64, publications: u64) -> StatsRecord {
        StatsRecord {
            citations,
            publications,
            h_index: 45,
            i10_index: 12,
            last_updated: NaiveDate::from_ymd_opt(2026, 8, 4).unwrap(),
        }
    }

    #[test]
    fn serializes_with_site_facing_keys() {
        let json = serde_json::to_value(record(1234, 56)).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 5);
        for key in ["citations", "publications", "hIndex", "i10Index", "lastUpdated"] {
            assert!(obj.contains_key(key), "missing key {}", key);
        }
        assert_eq!(obj["hIndex"], 45);
        assert_eq!(obj["lastUpdated"], "2026-08-04");
    }

    #[test]
    fn round_trips_without_loss() {
        let original = record(1234, 56);
        let json = serde_json::to_string_pretty(&original).unwrap();
        let reread: StatsRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(original, reread);
    }

    #[test]
    fn empty_means_no_citations_and_no_publications() {
        assert!(record(0, 0).is_empty());
        assert!(!record(0, 3).is_empty());
        assert!(!record(7, 0).is_empty());
    }
}
