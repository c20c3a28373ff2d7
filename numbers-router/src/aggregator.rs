//! Fans a request out to every upstream and merges what comes back.

use crate::config::ExecutionMode;
use crate::errors::FetchError;
use crate::fetcher::Fetcher;
use crate::metrics_defs::UPSTREAM_FETCH;
use std::collections::HashMap;
use std::fmt;
use tokio::task::JoinSet;

type FetchResult = Result<Vec<i64>, FetchError>;

/// A single upstream that contributed nothing.
#[derive(Debug)]
pub struct FetchFailure {
    pub url: String,
    pub cause: FetchError,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.url, self.cause)
    }
}

/// Outcome of one aggregation, consumed by the handler.
#[derive(Debug, Default)]
pub struct Aggregation {
    /// Union of all successful upstreams, ascending and without duplicates
    pub numbers: Vec<i64>,
    /// True iff no upstream succeeded
    pub all_failed: bool,
    /// One entry per failed upstream, kept for logging
    pub failures: Vec<FetchFailure>,
}

impl Aggregation {
    /// Reduces per-upstream outcomes. An empty outcome list counts as all failed.
    pub fn from_outcomes(outcomes: Vec<(String, FetchResult)>) -> Self {
        let total = outcomes.len();
        let mut numbers = Vec::new();
        let mut failures = Vec::new();

        for (url, result) in outcomes {
            match result {
                Ok(found) => {
                    shared::counter!(UPSTREAM_FETCH, "outcome" => "success").increment(1);
                    numbers.extend(found);
                }
                Err(cause) => {
                    shared::counter!(UPSTREAM_FETCH, "outcome" => cause.kind()).increment(1);
                    failures.push(FetchFailure { url, cause });
                }
            }
        }

        let all_failed = failures.len() == total;
        if all_failed {
            numbers.clear();
        }

        Self {
            numbers: sort_dedup(numbers),
            all_failed,
            failures,
        }
    }

    /// All failure causes joined into a single loggable line.
    pub fn failure_summary(&self) -> String {
        self.failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Sorts ascending and drops repeated values.
pub fn sort_dedup(mut numbers: Vec<i64>) -> Vec<i64> {
    numbers.sort_unstable();
    numbers.dedup();
    numbers
}

/// Drives the fetcher over a full set of upstream URLs.
#[derive(Clone, Debug)]
pub struct Aggregator {
    fetcher: Fetcher,
    mode: ExecutionMode,
}

impl Aggregator {
    pub fn new(fetcher: Fetcher, mode: ExecutionMode) -> Self {
        Self { fetcher, mode }
    }

    /// Fetches every URL, waits for all of them, then reduces.
    ///
    /// Callers must pass at least one URL.
    pub async fn aggregate(&self, urls: &[String]) -> Aggregation {
        let outcomes = match self.mode {
            ExecutionMode::Parallel => self.fetch_parallel(urls).await,
            ExecutionMode::Sequential => self.fetch_sequential(urls).await,
        };

        Aggregation::from_outcomes(outcomes)
    }

    async fn fetch_sequential(&self, urls: &[String]) -> Vec<(String, FetchResult)> {
        let mut outcomes = Vec::with_capacity(urls.len());
        for url in urls {
            let result = self.fetcher.fetch(url).await;
            log_outcome(url, &result);
            outcomes.push((url.clone(), result));
        }
        outcomes
    }

    /// One task per URL. Each task reports its own slot index, so results
    /// are placed without any shared collection.
    async fn fetch_parallel(&self, urls: &[String]) -> Vec<(String, FetchResult)> {
        let mut join_set = JoinSet::new();
        let mut task_slots = HashMap::new();

        for (index, url) in urls.iter().enumerate() {
            let fetcher = self.fetcher.clone();
            let url = url.clone();

            let abort_handle = join_set.spawn(async move {
                let result = fetcher.fetch(&url).await;
                log_outcome(&url, &result);
                (index, result)
            });

            task_slots.insert(abort_handle.id(), index);
        }

        let mut slots: Vec<Option<FetchResult>> = urls.iter().map(|_| None).collect();

        while let Some(join_result) = join_set.join_next().await {
            match join_result {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => {
                    tracing::error!("Task failed: {e}");
                    if let Some(&index) = task_slots.get(&e.id()) {
                        slots[index] = Some(Err(FetchError::TaskFailed(e.to_string())));
                    }
                }
            }
        }

        urls.iter()
            .cloned()
            .zip(slots)
            .map(|(url, slot)| {
                let result = slot
                    .unwrap_or_else(|| Err(FetchError::TaskFailed("no result".to_string())));
                (url, result)
            })
            .collect()
    }
}

fn log_outcome(url: &str, result: &FetchResult) {
    match result {
        Ok(numbers) => tracing::debug!(url, count = numbers.len(), "Fetched numbers"),
        Err(e) => tracing::debug!(url, error = %e, "Bypassing failed upstream"),
    }
}
