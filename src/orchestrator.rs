//! Run control: strategy order, retries, and backoff
//!
//! Walks the eligible sources in preference order, giving each a bounded
//! number of attempts with linearly increasing backoff, and stops at the
//! first valid record. An all-zero record never wins outright but is carried
//! along as a suspect candidate for persistence to weigh against existing
//! data.

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::types::{FetchError, StatsRecord, StatsSource};

pub struct Orchestrator {
    sources: Vec<Box<dyn StatsSource>>,
    max_attempts: u32,
    backoff_unit: Duration,
    delay_bounds: (u64, u64),
}

impl Orchestrator {
    pub fn new(config: &Config, sources: Vec<Box<dyn StatsSource>>) -> Self {
        Self {
            sources,
            max_attempts: config.max_attempts,
            backoff_unit: Duration::from_secs(config.backoff_unit_secs),
            delay_bounds: (config.delay_min_secs, config.delay_max_secs),
        }
    }

    /// Run the full fetch sequence for one scheduled invocation.
    ///
    /// Returns the first valid record, or the last empty (suspect) record if
    /// nothing better appeared, or `None` when every attempt failed outright.
    pub async fn run(&self, author_id: &str) -> Option<StatsRecord> {
        if self.sources.is_empty() {
            return None;
        }

        self.initial_delay().await;

        let mut suspect: Option<StatsRecord> = None;
        for source in &self.sources {
            if let Some(record) = self.try_source(source.as_ref(), author_id, &mut suspect).await {
                return Some(record);
            }
        }

        if suspect.is_some() {
            info!("no source produced a non-empty record; carrying the empty result to persistence");
        }
        suspect
    }

    /// Randomized pause before the first request, desynchronizing runs that
    /// external schedulers kick off at the same wall-clock instant.
    async fn initial_delay(&self) {
        let (min, max) = self.delay_bounds;
        if max == 0 {
            return;
        }
        let secs = rand::thread_rng().gen_range(min..=max);
        info!(delay_secs = secs, "waiting before first request");
        sleep(Duration::from_secs(secs)).await;
    }

    /// Give one source its bounded attempts. Returns the first valid record,
    /// `None` once the source is exhausted or blocked.
    async fn try_source(
        &self,
        source: &dyn StatsSource,
        author_id: &str,
        suspect: &mut Option<StatsRecord>,
    ) -> Option<StatsRecord> {
        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let backoff = self.backoff_unit * (attempt - 1);
                info!(
                    source = source.name(),
                    attempt,
                    backoff_secs = backoff.as_secs(),
                    "retrying after backoff"
                );
                sleep(backoff).await;
            }

            match source.fetch(author_id).await {
                Ok(record) if !record.is_empty() => {
                    info!(
                        source = source.name(),
                        attempt,
                        citations = record.citations,
                        publications = record.publications,
                        "fetched stats"
                    );
                    return Some(record);
                }
                Ok(record) => {
                    warn!(
                        source = source.name(),
                        attempt, "fetch returned an empty record; not accepting it as-is"
                    );
                    *suspect = Some(record);
                }
                Err(FetchError::Blocked(status)) => {
                    warn!(
                        source = source.name(),
                        status, "access denied; abandoning this source for the current run"
                    );
                    return None;
                }
                Err(err) => {
                    warn!(source = source.name(), attempt, error = %err, "fetch attempt failed");
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    /// Source that replays a scripted sequence of outcomes.
    struct ScriptedSource {
        name: &'static str,
        script: Mutex<VecDeque<Result<StatsRecord, FetchError>>>,
        calls: Arc<AtomicU32>,
    }

    impl ScriptedSource {
        fn new(
            name: &'static str,
            script: Vec<Result<StatsRecord, FetchError>>,
        ) -> Self {
            Self {
                name,
                script: Mutex::new(script.into()),
                calls: Arc::new(AtomicU32::new(0)),
            }
        }
    }

    #[async_trait]
    impl StatsSource for ScriptedSource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _author_id: &str) -> Result<StatsRecord, FetchError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(FetchError::Transport("script exhausted".to_string())))
        }
    }

    fn quick_config() -> Config {
        Config {
            max_attempts: 2,
            backoff_unit_secs: 0,
            delay_min_secs: 0,
            delay_max_secs: 0,
            ..Config::default()
        }
    }

    fn valid_record() -> StatsRecord {
        StatsRecord::new(120, 30, 18, 25)
    }

    fn empty_record() -> StatsRecord {
        StatsRecord::new(0, 0, 0, 0)
    }

    fn transport() -> Result<StatsRecord, FetchError> {
        Err(FetchError::Transport("connection reset".to_string()))
    }

    #[tokio::test]
    async fn first_valid_record_stops_the_run() {
        let primary = ScriptedSource::new("primary", vec![Ok(valid_record())]);
        let fallback = ScriptedSource::new("fallback", vec![Ok(valid_record())]);
        let orchestrator = Orchestrator::new(
            &quick_config(),
            vec![Box::new(primary), Box::new(fallback)],
        );

        let result = orchestrator.run("id").await;
        assert_eq!(result, Some(valid_record()));
    }

    #[tokio::test]
    async fn fallback_source_runs_after_primary_exhausts_retries() {
        let primary = ScriptedSource::new("primary", vec![transport(), transport()]);
        let fallback = ScriptedSource::new("fallback", vec![Ok(valid_record())]);
        let orchestrator = Orchestrator::new(
            &quick_config(),
            vec![Box::new(primary), Box::new(fallback)],
        );

        let result = orchestrator.run("id").await;
        assert_eq!(result, Some(valid_record()));
    }

    #[tokio::test]
    async fn transient_failure_is_retried_on_the_same_source() {
        let primary = ScriptedSource::new("primary", vec![transport(), Ok(valid_record())]);
        let orchestrator = Orchestrator::new(&quick_config(), vec![Box::new(primary)]);

        let result = orchestrator.run("id").await;
        assert_eq!(result, Some(valid_record()));
    }

    #[tokio::test]
    async fn blocked_abandons_remaining_attempts_for_that_source() {
        let primary = ScriptedSource::new("primary", vec![Err(FetchError::Blocked(403))]);
        let fallback = ScriptedSource::new("fallback", vec![Ok(valid_record())]);
        let primary_calls = Arc::clone(&primary.calls);

        let orchestrator = Orchestrator::new(
            &quick_config(),
            vec![Box::new(primary), Box::new(fallback)],
        );
        let result = orchestrator.run("id").await;

        assert_eq!(result, Some(valid_record()));
        // One call, not max_attempts: the block short-circuits the retries.
        assert_eq!(primary_calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn all_failures_yield_none() {
        let primary = ScriptedSource::new("primary", vec![transport(), transport()]);
        let fallback = ScriptedSource::new("fallback", vec![transport(), transport()]);
        let orchestrator = Orchestrator::new(
            &quick_config(),
            vec![Box::new(primary), Box::new(fallback)],
        );

        assert_eq!(orchestrator.run("id").await, None);
    }

    #[tokio::test]
    async fn empty_record_is_carried_when_nothing_valid_appears() {
        let primary = ScriptedSource::new("primary", vec![Ok(empty_record()), transport()]);
        let orchestrator = Orchestrator::new(&quick_config(), vec![Box::new(primary)]);

        let result = orchestrator.run("id").await;
        assert_eq!(result, Some(empty_record()));
    }

    #[tokio::test]
    async fn valid_record_from_fallback_beats_earlier_empty_record() {
        let primary = ScriptedSource::new("primary", vec![Ok(empty_record()), Ok(empty_record())]);
        let fallback = ScriptedSource::new("fallback", vec![Ok(valid_record())]);
        let orchestrator = Orchestrator::new(
            &quick_config(),
            vec![Box::new(primary), Box::new(fallback)],
        );

        let result = orchestrator.run("id").await;
        assert_eq!(result, Some(valid_record()));
    }

    #[tokio::test]
    async fn no_sources_means_no_record() {
        let orchestrator = Orchestrator::new(&quick_config(), Vec::new());
        assert_eq!(orchestrator.run("id").await, None);
    }
}
