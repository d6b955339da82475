//! Fetch strategies for scholar stats
//!
//! Two interchangeable sources: a structured scholarly-bridge API client and
//! a direct profile-page scrape. Eligibility is decided once at startup; an
//! ineligible source never enters the retry loop.

pub mod profile_page;
pub mod scholar_api;

pub use profile_page::ProfilePageClient;
pub use scholar_api::ScholarApiClient;

use reqwest::StatusCode;
use tracing::{info, warn};

use crate::config::Config;
use crate::types::{FetchError, StatsSource};

/// Capability check, performed once per run: build every source that can
/// actually operate with the current configuration, in preference order.
pub fn eligible_sources(config: &Config) -> Vec<Box<dyn StatsSource>> {
    let mut sources: Vec<Box<dyn StatsSource>> = Vec::new();

    match ScholarApiClient::from_config(config) {
        Ok(Some(client)) => sources.push(Box::new(client)),
        Ok(None) => info!("structured API source not configured; skipping"),
        Err(e) => warn!(error = %e, "structured API source unavailable; skipping"),
    }

    match ProfilePageClient::from_config(config) {
        Ok(client) => sources.push(Box::new(client)),
        Err(e) => warn!(error = %e, "profile page source unavailable; skipping"),
    }

    sources
}

/// Map a response status to the fetch-layer failure it represents.
///
/// Access-denial statuses are a distinct failure mode: the caller must not
/// read the body and must not retry the source within this run.
pub(crate) fn classify_status(status: StatusCode) -> Result<(), FetchError> {
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::Blocked(status.as_u16()));
    }
    if !status.is_success() {
        return Err(FetchError::Transport(format!(
            "unexpected HTTP status {}",
            status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_statuses_classify_as_blocked() {
        for code in [403u16, 429] {
            let status = StatusCode::from_u16(code).unwrap();
            match classify_status(status) {
                Err(FetchError::Blocked(got)) => assert_eq!(got, code),
                other => panic!("expected Blocked for {}, got {:?}", code, other),
            }
        }
    }

    #[test]
    fn other_failures_classify_as_transport() {
        for code in [404u16, 500, 503] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(matches!(
                classify_status(status),
                Err(FetchError::Transport(_))
            ));
        }
    }

    #[test]
    fn success_passes_through() {
        assert!(classify_status(StatusCode::OK).is_ok());
    }

    #[test]
    fn only_page_source_without_api_endpoint() {
        // The page source only needs a base URL, which has a default, so the
        // structured source is the one gated on configuration.
        let config = Config::default();
        let sources = eligible_sources(&config);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "profile-page");
    }
}
