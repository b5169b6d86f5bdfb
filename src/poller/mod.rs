//! Readiness polling.
//!
//! A [`ReadinessPoller`] repeatedly fetches and classifies one resource
//! until it is ready, fails, runs out of time or is cancelled.
//!
//! ```text
//! ┌────────┐  fetch   ┌───────────────┐ classify ┌────────────┐
//! │  loop  │─────────▶│ StatusFetcher │─────────▶│ Classifier │
//! └───▲────┘          └───────────────┘          └─────┬──────┘
//!     │ sleep interval / retry delay                   │ HealthReport
//!     └────────────────────────────────────────────────┤
//!                         ready ─▶ Ok, Failed ─▶ Err ◀──┘
//! ```
//!
//! Sleeps are clamped to the time left before the deadline and are
//! interrupted by cancellation.

mod config;
mod error;

pub use config::{
    PollerConfig, DEFAULT_FAILURE_TOLERANCE, DEFAULT_LOG_EVERY, DEFAULT_POLL_INTERVAL,
    DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT,
};
pub use error::PollError;

use std::time::Duration;

use graphwatch_types::{HealthReport, HealthVerdict, ResourceId};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::duration::format_elapsed;
use crate::source::{FetchError, StatusFetcher};

/// Waits for a resource to become ready.
///
/// # Example
///
/// ```
/// use graphwatch::{Classifier, PollerConfig, ReadinessPoller, ScriptedSource};
/// use graphwatch::types::{AggregateState, RawStatus};
///
/// # tokio_test::block_on(async {
/// let source = ScriptedSource::new().with_status(
///     RawStatus::builder("gm").state(AggregateState::Online).complete(true).build(),
/// );
/// let poller = ReadinessPoller::new(source, Classifier::default(), PollerConfig::default());
///
/// let report = poller.wait_until_ready(&"gm".into()).await.unwrap();
/// assert!(report.is_ready());
/// # });
/// ```
#[derive(Debug)]
pub struct ReadinessPoller<F> {
    fetcher: F,
    classifier: Classifier,
    config: PollerConfig,
    cancel: CancellationToken,
}

impl<F: StatusFetcher> ReadinessPoller<F> {
    /// Create a poller with its own cancellation token.
    pub fn new(fetcher: F, classifier: Classifier, config: PollerConfig) -> Self {
        Self {
            fetcher,
            classifier,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels waits on this poller.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The poller's timing configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// The classifier applied to each fetched status.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The status source.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch and classify once, without waiting or retrying.
    pub async fn check(&self, id: &ResourceId) -> Result<HealthReport, FetchError> {
        let raw = self.fetcher.fetch(id).await?;
        Ok(self.classifier.classify(&raw))
    }

    /// Wait with the configured timeout and interval.
    pub async fn wait_until_ready(&self, id: &ResourceId) -> Result<HealthReport, PollError> {
        self.wait_until_ready_with_callback(id, |_| {}).await
    }

    /// Wait with the configured timeout and interval, calling `on_cycle`
    /// with each successful classification.
    pub async fn wait_until_ready_with_callback<C>(
        &self,
        id: &ResourceId,
        on_cycle: C,
    ) -> Result<HealthReport, PollError>
    where
        C: FnMut(&HealthReport) + Send,
    {
        self.wait_until_ready_with(id, self.config.timeout, self.config.poll_interval, on_cycle)
            .await
    }

    /// Wait until `id` is ready or `timeout` elapses, polling every
    /// `interval`.
    ///
    /// `on_cycle` runs exactly once per successful fetch, before the report
    /// is acted on. It is not called for failed fetches.
    pub async fn wait_until_ready_with<C>(
        &self,
        id: &ResourceId,
        timeout: Duration,
        interval: Duration,
        mut on_cycle: C,
    ) -> Result<HealthReport, PollError>
    where
        C: FnMut(&HealthReport) + Send,
    {
        let started = Instant::now();
        let deadline = instant_after(started, timeout);
        let mut next_progress = instant_after(started, self.config.log_every);
        let mut last_report: Option<HealthReport> = None;
        let mut failures: u32 = 0;
        let mut cycle: u64 = 0;

        info!(
            resource = %id,
            source = self.fetcher.description(),
            timeout = %format_elapsed(timeout),
            "waiting for resource to become ready"
        );

        loop {
            if self.cancel.is_cancelled() {
                info!(resource = %id, "wait cancelled");
                return Err(PollError::Cancelled { last_report });
            }
            cycle += 1;

            let fetched = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!(resource = %id, "wait cancelled");
                    return Err(PollError::Cancelled { last_report });
                }
                fetched = tokio::time::timeout_at(deadline, self.fetcher.fetch(id)) => fetched,
            };
            let fetched = match fetched {
                Ok(fetched) => fetched,
                Err(_) => {
                    let elapsed = started.elapsed();
                    warn!(resource = %id, elapsed = %format_elapsed(elapsed), "status fetch still pending at deadline");
                    return Err(PollError::TimeoutExceeded {
                        last_report,
                        elapsed,
                    });
                }
            };

            let delay = match fetched {
                Err(cause) => {
                    failures += 1;
                    if failures > self.config.failure_tolerance {
                        warn!(resource = %id, attempts = failures, error = %cause, "giving up after repeated fetch failures");
                        return Err(PollError::Fetch {
                            cause,
                            attempts: failures,
                        });
                    }
                    warn!(
                        resource = %id,
                        attempt = failures,
                        tolerance = self.config.failure_tolerance,
                        transient = cause.is_transient(),
                        error = %cause,
                        "status fetch failed, retrying"
                    );
                    self.config.retry_delay
                }
                Ok(raw) => {
                    failures = 0;
                    let report = self.classifier.classify(&raw);
                    on_cycle(&report);
                    log_cycle(cycle, &report, last_report.as_ref());

                    if report.verdict == HealthVerdict::Failed {
                        warn!(resource = %id, summary = ?report.error_summary, "resource failed");
                        return Err(PollError::ResourceFailed { report });
                    }
                    if report.is_ready() {
                        info!(
                            resource = %id,
                            verdict = %report.verdict,
                            elapsed = %format_elapsed(started.elapsed()),
                            "resource is ready"
                        );
                        return Ok(report);
                    }
                    last_report = Some(report);
                    interval
                }
            };

            let now = Instant::now();
            if now >= deadline {
                let elapsed = now - started;
                warn!(resource = %id, elapsed = %format_elapsed(elapsed), "timed out waiting for resource");
                return Err(PollError::TimeoutExceeded {
                    last_report,
                    elapsed,
                });
            }

            if now >= next_progress {
                info!(
                    resource = %id,
                    elapsed = %format_elapsed(now - started),
                    state = last_report.as_ref().map(|r| r.state.label()).unwrap_or("unknown"),
                    "still waiting"
                );
                next_progress = instant_after(now, self.config.log_every);
            }

            let sleep = delay.min(deadline - now);
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!(resource = %id, "wait cancelled");
                    return Err(PollError::Cancelled { last_report });
                }
                _ = tokio::time::sleep(sleep) => {}
            }
        }
    }
}

// Durations too large for `Instant` saturate to a point no wait will reach.
pub(crate) fn instant_after(from: Instant, span: Duration) -> Instant {
    from.checked_add(span)
        .unwrap_or_else(|| from + Duration::from_secs(FAR_FUTURE_SECS))
}

const FAR_FUTURE_SECS: u64 = 30 * 365 * 24 * 60 * 60;

fn log_cycle(cycle: u64, report: &HealthReport, previous: Option<&HealthReport>) {
    if let Some(prev) = previous.filter(|prev| prev.verdict != report.verdict) {
        info!(
            resource = %report.resource,
            from = %prev.verdict,
            to = %report.verdict,
            "verdict changed"
        );
    }
    debug!(resource = %report.resource, cycle, "{}", report);
}
