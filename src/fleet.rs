//! Waiting on, and watching, several resources at once.
//!
//! Each resource gets its own [`ReadinessPoller`] on its own task. Tasks
//! share the fetcher and configuration read-only and a parent cancellation
//! token; nothing else crosses between them.
//!
//! [`Fleet::wait_all`] stops per resource once it is ready. [`Fleet::monitor`]
//! keeps checking on a fixed interval, for a bounded duration or until
//! cancelled.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use graphwatch_types::{HealthReport, HealthVerdict, ResourceId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::poller::{instant_after, PollError, PollerConfig, ReadinessPoller};
use crate::source::{FetchError, StatusFetcher};

/// Result of waiting on one resource.
#[derive(Debug)]
pub struct FleetOutcome {
    /// The resource waited on.
    pub resource: ResourceId,
    /// How the wait ended.
    pub result: Result<HealthReport, PollError>,
}

impl FleetOutcome {
    /// Whether the resource became ready with a Healthy verdict.
    pub fn is_healthy(&self) -> bool {
        matches!(&self.result, Ok(report) if report.verdict == HealthVerdict::Healthy)
    }
}

/// Result of monitoring one resource.
#[derive(Debug, Clone)]
pub struct MonitorOutcome {
    /// The resource monitored.
    pub resource: ResourceId,
    /// Check cycles started, including ones whose fetch failed.
    pub cycles: u64,
    /// Cycles whose fetch failed.
    pub fetch_errors: u64,
    /// The most recent successful classification.
    pub last_report: Option<HealthReport>,
}

impl MonitorOutcome {
    fn new(resource: ResourceId) -> Self {
        Self {
            resource,
            cycles: 0,
            fetch_errors: 0,
            last_report: None,
        }
    }
}

/// Concurrent pollers over a shared status source.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use graphwatch::{Classifier, Fleet, PollerConfig, ScriptedSource};
/// use graphwatch::types::{AggregateState, RawStatus};
///
/// # tokio_test::block_on(async {
/// let source = ScriptedSource::new()
///     .with_status(RawStatus::builder("a").state(AggregateState::Online).complete(true).build())
///     .with_status(RawStatus::builder("b").state(AggregateState::Online).complete(true).build());
///
/// let fleet = Fleet::new(Arc::new(source), Classifier::default(), PollerConfig::default());
/// let outcomes = fleet.wait_all(vec!["a".into(), "b".into()]).await;
/// assert!(outcomes.iter().all(|o| o.is_healthy()));
/// # });
/// ```
#[derive(Debug)]
pub struct Fleet<F> {
    fetcher: Arc<F>,
    classifier: Classifier,
    config: PollerConfig,
    cancel: CancellationToken,
    updates: Option<mpsc::UnboundedSender<HealthReport>>,
}

impl<F> Fleet<F>
where
    F: StatusFetcher + 'static,
{
    /// Create a fleet with its own cancellation token.
    pub fn new(fetcher: Arc<F>, classifier: Classifier, config: PollerConfig) -> Self {
        Self {
            fetcher,
            classifier,
            config,
            cancel: CancellationToken::new(),
            updates: None,
        }
    }

    /// Cancel every wait when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Forward every successful classification to `sender`.
    pub fn with_updates(mut self, sender: mpsc::UnboundedSender<HealthReport>) -> Self {
        self.updates = Some(sender);
        self
    }

    /// Token that cancels every wait in the fleet.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for every resource concurrently.
    ///
    /// Outcomes come back in the order of `ids`. A failure on one resource
    /// does not stop the others.
    pub async fn wait_all(&self, ids: Vec<ResourceId>) -> Vec<FleetOutcome> {
        let handles: Vec<(ResourceId, JoinHandle<Result<HealthReport, PollError>>)> = ids
            .into_iter()
            .map(|id| {
                let poller = self.poller();
                let updates = self.updates.clone();
                let task_id = id.clone();
                let handle = tokio::spawn(async move {
                    poller
                        .wait_until_ready_with_callback(&task_id, move |report| {
                            if let Some(tx) = &updates {
                                let _ = tx.send(report.clone());
                            }
                        })
                        .await
                });
                (id, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (resource, handle) in handles {
            let result = join(handle).await.unwrap_or_else(|| {
                debug!(resource = %resource, "poller task aborted");
                Err(PollError::Cancelled { last_report: None })
            });
            outcomes.push(FleetOutcome { resource, result });
        }
        outcomes
    }

    /// Fetch and classify every resource once, concurrently.
    pub async fn check_all(
        &self,
        ids: Vec<ResourceId>,
    ) -> Vec<(ResourceId, Result<HealthReport, FetchError>)> {
        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let poller = self.poller();
                let task_id = id.clone();
                (id, tokio::spawn(async move { poller.check(&task_id).await }))
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (resource, handle) in handles {
            let result = join(handle).await.unwrap_or_else(|| {
                Err(FetchError::Unavailable("check task aborted".to_string()))
            });
            results.push((resource, result));
        }
        results
    }

    /// Check every resource once per `interval` until `duration` has
    /// elapsed, or until cancelled when `duration` is `None`.
    ///
    /// Unlike [`wait_all`](Self::wait_all) nothing ends a resource's loop
    /// early: failed verdicts and fetch errors are reported and the next
    /// cycle runs as scheduled. Reports go to the update channel as they
    /// arrive. A fetch still pending when the duration runs out is dropped.
    pub async fn monitor(
        &self,
        ids: Vec<ResourceId>,
        interval: Duration,
        duration: Option<Duration>,
    ) -> Vec<MonitorOutcome> {
        let started = Instant::now();
        let end = duration.map(|d| instant_after(started, d));

        let handles: Vec<(ResourceId, JoinHandle<MonitorOutcome>)> = ids
            .into_iter()
            .map(|id| {
                let poller = self.poller();
                let updates = self.updates.clone();
                let task_id = id.clone();
                let handle = tokio::spawn(async move {
                    monitor_one(poller, task_id, interval, end, updates).await
                });
                (id, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (resource, handle) in handles {
            let outcome = join(handle).await.unwrap_or_else(|| {
                debug!(resource = %resource, "monitor task aborted");
                MonitorOutcome::new(resource)
            });
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Look up display titles, leaving out resources without one.
    pub async fn titles(&self, ids: &[ResourceId]) -> HashMap<ResourceId, String> {
        let mut titles = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(title) = self.fetcher.title(id).await {
                titles.insert(id.clone(), title);
            }
        }
        titles
    }

    fn poller(&self) -> ReadinessPoller<Arc<F>> {
        ReadinessPoller::new(
            Arc::clone(&self.fetcher),
            self.classifier.clone(),
            self.config.clone(),
        )
        .with_cancellation(self.cancel.child_token())
    }
}

/// Wait for every resource with a fresh fleet and no update channel.
pub async fn wait_all<F>(
    fetcher: Arc<F>,
    classifier: Classifier,
    config: PollerConfig,
    ids: Vec<ResourceId>,
) -> Vec<FleetOutcome>
where
    F: StatusFetcher + 'static,
{
    Fleet::new(fetcher, classifier, config).wait_all(ids).await
}

async fn monitor_one<F: StatusFetcher>(
    poller: ReadinessPoller<F>,
    id: ResourceId,
    interval: Duration,
    end: Option<Instant>,
    updates: Option<mpsc::UnboundedSender<HealthReport>>,
) -> MonitorOutcome {
    let cancel = poller.cancellation_token();
    let end = end.unwrap_or_else(|| instant_after(Instant::now(), Duration::MAX));
    let mut outcome = MonitorOutcome::new(id);

    info!(
        resource = %outcome.resource,
        source = poller.fetcher().description(),
        "monitoring resource"
    );

    loop {
        if cancel.is_cancelled() || Instant::now() >= end {
            break;
        }
        outcome.cycles += 1;

        let checked = tokio::select! {
            _ = cancel.cancelled() => break,
            checked = tokio::time::timeout_at(end, poller.check(&outcome.resource)) => checked,
        };
        let Ok(checked) = checked else {
            debug!(resource = %outcome.resource, "monitoring window closed during fetch");
            break;
        };

        match checked {
            Ok(report) => {
                let changed = outcome
                    .last_report
                    .as_ref()
                    .is_some_and(|prev| prev.verdict != report.verdict);
                if changed {
                    info!(resource = %report.resource, to = %report.verdict, "verdict changed");
                }
                debug!(resource = %report.resource, cycle = outcome.cycles, "{}", report);
                if let Some(tx) = &updates {
                    let _ = tx.send(report.clone());
                }
                outcome.last_report = Some(report);
            }
            Err(e) => {
                outcome.fetch_errors += 1;
                warn!(
                    resource = %outcome.resource,
                    cycle = outcome.cycles,
                    transient = e.is_transient(),
                    error = %e,
                    "status fetch failed"
                );
            }
        }

        let now = Instant::now();
        if now >= end {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval.min(end - now)) => {}
        }
    }

    debug!(resource = %outcome.resource, cycles = outcome.cycles, "monitoring stopped");
    outcome
}

// Panics in a poller task propagate to the caller
async fn join<T>(handle: JoinHandle<T>) -> Option<T> {
    match handle.await {
        Ok(value) => Some(value),
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(_) => None,
    }
}
