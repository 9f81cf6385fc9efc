//! Role Usage Enrichment
//!
//! Fills in `last_used_at` for a listing by calling
//! [`IamApi::fetch_last_used`] once per role from a fixed pool of worker
//! tasks.
//!
//! ## Layout
//!
//! - A dispatcher feeds role indices into a shared work queue.
//! - `N` workers pull indices, perform the lookup and send an
//!   [`EnrichmentResult`] to a single result channel.
//! - The collector (the calling task) is the only writer of the output
//!   vector and places each result at its index, so the listing order is
//!   kept regardless of completion order.
//!
//! A failed lookup leaves the role without last-used data and is logged;
//! it never fails the batch. Cancelling the token stops dispatching,
//! aborts in-flight lookups and keeps whatever was already collected.
//! An optional timeout starts when the lookups start and cancels only
//! this run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::describe;
use crate::iam::IamApi;
use crate::progress::{NoProgress, ProgressSink};
use crate::role::Role;

/// Default number of concurrent lookups
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Outcome of one lookup, addressed by listing position
#[derive(Debug)]
struct EnrichmentResult {
    index: usize,
    outcome: anyhow::Result<Option<DateTime<Utc>>>,
}

/// Enriched listing plus what could not be resolved
#[derive(Debug, Default)]
pub struct Enrichment {
    /// Roles in listing order
    pub roles: Vec<Role>,
    /// Roles whose lookup returned an error
    pub failed: Vec<String>,
    /// Roles never looked up because the run was cancelled
    pub unresolved: Vec<String>,
    /// Whether cancellation fired before all lookups finished
    pub cancelled: bool,
}

impl Enrichment {
    /// Every role received a lookup result
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.unresolved.is_empty()
    }
}

/// Concurrent last-used lookup over a role listing
pub struct Enricher {
    api: Arc<dyn IamApi>,
    concurrency: usize,
    progress: Arc<dyn ProgressSink>,
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl Enricher {
    pub fn new(api: Arc<dyn IamApi>) -> Self {
        Self {
            api,
            concurrency: DEFAULT_CONCURRENCY,
            progress: Arc::new(NoProgress),
            cancel: CancellationToken::new(),
            timeout: None,
        }
    }

    /// Set the worker count (at least one)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Use an externally owned token (timeout, Ctrl-C)
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Deadline for one `enrich` call, counted from its first lookup
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Look up last-used data for every role.
    ///
    /// Incoming `last_used_at` values are overwritten.
    pub async fn enrich(&self, mut roles: Vec<Role>) -> Enrichment {
        let total = roles.len();
        if total == 0 {
            return Enrichment {
                roles,
                ..Enrichment::default()
            };
        }

        let workers = self.concurrency.clamp(1, total);
        let names: Arc<Vec<String>> = Arc::new(roles.iter().map(|r| r.name.clone()).collect());

        info!(roles = total, workers, "Fetching role usage data");
        self.progress.start(total as u64);

        // Child token: the timeout stops this run without cancelling the caller's token
        let cancel = self.cancel.child_token();
        let (job_tx, job_rx) = async_channel::bounded::<usize>(workers);
        let (result_tx, mut result_rx) = mpsc::channel::<EnrichmentResult>(workers);
        let mut tasks = JoinSet::new();

        if let Some(timeout) = self.timeout {
            tasks.spawn(expire(timeout, cancel.clone()));
        }
        tasks.spawn(dispatch(total, job_tx, cancel.clone()));

        for worker_id in 0..workers {
            tasks.spawn(run_worker(
                worker_id,
                Arc::clone(&self.api),
                Arc::clone(&names),
                job_rx.clone(),
                result_tx.clone(),
                cancel.clone(),
            ));
        }
        // Workers hold the remaining handles; the channels close when they exit
        drop(job_rx);
        drop(result_tx);

        let mut resolved = vec![false; total];
        let mut failed = Vec::new();
        let mut cancelled = false;

        loop {
            let next = tokio::select! {
                result = result_rx.recv() => result,
                _ = cancel.cancelled() => {
                    cancelled = true;
                    None
                }
            };

            let Some(result) = next else { break };
            self.collect(result, &mut roles, &mut resolved, &mut failed);
        }

        if cancelled {
            // Keep lookups that finished before cancellation was observed
            result_rx.close();
            while let Some(result) = result_rx.recv().await {
                self.collect(result, &mut roles, &mut resolved, &mut failed);
            }
        }

        tasks.shutdown().await;
        self.progress.finish();

        let unresolved: Vec<String> = resolved
            .iter()
            .zip(names.iter())
            .filter(|(done, _)| !**done)
            .map(|(_, name)| name.clone())
            .collect();

        if !unresolved.is_empty() {
            warn!(
                count = unresolved.len(),
                "Enrichment stopped early; some roles have no usage data"
            );
        }

        let cancelled = cancelled || self.cancel.is_cancelled() || !unresolved.is_empty();

        Enrichment {
            roles,
            failed,
            unresolved,
            cancelled,
        }
    }

    /// Single writer for the output vector
    fn collect(
        &self,
        result: EnrichmentResult,
        roles: &mut [Role],
        resolved: &mut [bool],
        failed: &mut Vec<String>,
    ) {
        let EnrichmentResult { index, outcome } = result;
        let role = &mut roles[index];

        match outcome {
            Ok(last_used_at) => role.last_used_at = last_used_at,
            Err(e) => {
                warn!(
                    role = %role.name,
                    error = %describe(&e),
                    "Failed to get last used info; treating role as never used"
                );
                role.last_used_at = None;
                failed.push(role.name.clone());
            }
        }

        resolved[index] = true;
        self.progress.advance();
    }
}

async fn expire(timeout: Duration, cancel: CancellationToken) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = tokio::time::sleep(timeout) => {
            warn!(
                timeout_secs = timeout.as_secs_f64(),
                "Timeout reached; stopping role usage lookups"
            );
            cancel.cancel();
        }
    }
}

/// Feed indices to the workers until done or cancelled
async fn dispatch(total: usize, jobs: async_channel::Sender<usize>, cancel: CancellationToken) {
    for index in 0..total {
        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = jobs.send(index) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
    jobs.close();
}

async fn run_worker(
    worker_id: usize,
    api: Arc<dyn IamApi>,
    names: Arc<Vec<String>>,
    jobs: async_channel::Receiver<usize>,
    results: mpsc::Sender<EnrichmentResult>,
    cancel: CancellationToken,
) {
    while let Ok(index) = jobs.recv().await {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = api.fetch_last_used(&names[index]) => outcome,
        };

        let result = EnrichmentResult { index, outcome };
        let result = match results.try_send(result) {
            Ok(()) => continue,
            Err(TrySendError::Closed(_)) => break,
            Err(TrySendError::Full(result)) => result,
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = results.send(result) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    debug!(worker_id, "Enrichment worker exiting");
}
