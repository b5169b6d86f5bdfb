//! End-to-end waits against scripted statuses.
//!
//! Time is paused, so sleeps advance the clock instantly and elapsed times
//! are exact.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graphwatch::types::{AggregateState, HealthVerdict, RawStatus, ResourceId};
use graphwatch::{
    Classifier, FetchError, PollError, PollerConfig, ReadinessPoller, ScriptedSource,
    StatusFetcher,
};
use tokio::time::Instant;

const GM: &str = "http://example.com/graphmart/sales";

fn online_complete() -> RawStatus {
    RawStatus::builder(GM)
        .state(AggregateState::Online)
        .complete(true)
        .build()
}

fn activating() -> RawStatus {
    RawStatus::builder(GM)
        .state(AggregateState::Activating)
        .complete(false)
        .build()
}

fn poller(source: ScriptedSource) -> ReadinessPoller<ScriptedSource> {
    ReadinessPoller::new(source, Classifier::default(), PollerConfig::default())
}

#[tokio::test(start_paused = true)]
async fn ready_on_first_cycle() {
    let poller = poller(ScriptedSource::new().with_status(online_complete()));
    let started = Instant::now();

    let report = poller.wait_until_ready(&GM.into()).await.unwrap();

    assert_eq!(report.verdict, HealthVerdict::Healthy);
    assert!(report.is_ready());
    assert_eq!(poller.fetcher().fetch_count(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn ready_after_activation() {
    let source = ScriptedSource::new()
        .with_status_repeated(activating(), 3)
        .with_status(online_complete());
    let poller = poller(source);
    let started = Instant::now();

    let report = poller.wait_until_ready(&GM.into()).await.unwrap();

    assert!(report.is_ready());
    assert_eq!(poller.fetcher().fetch_count(), 4);
    // three interval sleeps of 5s
    assert_eq!(started.elapsed(), Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn offline_fails_fast() {
    let source = ScriptedSource::new().with_status(
        RawStatus::builder(GM)
            .state(AggregateState::Offline)
            .build(),
    );
    let poller = poller(source);

    let err = poller.wait_until_ready(&GM.into()).await.unwrap_err();

    match err {
        PollError::ResourceFailed { report } => {
            assert_eq!(report.verdict, HealthVerdict::Failed);
            assert_eq!(report.error_summary.as_deref(), Some("resource is Offline"));
        }
        other => panic!("expected ResourceFailed, got {:?}", other),
    }
    assert_eq!(poller.fetcher().fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_fetch_errors_are_absorbed() {
    let source = ScriptedSource::new()
        .with_error(GM, "connection reset")
        .with_error(GM, "connection reset")
        .with_status(online_complete());
    let poller = poller(source);
    let started = Instant::now();

    let report = poller.wait_until_ready(&GM.into()).await.unwrap();

    assert!(report.is_ready());
    assert_eq!(poller.fetcher().fetch_count(), 3);
    // two retry delays of 30s
    assert_eq!(started.elapsed(), Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn fetch_errors_past_tolerance_fail() {
    let source = ScriptedSource::new()
        .with_error(GM, "e1")
        .with_error(GM, "e2")
        .with_error(GM, "e3")
        .with_error(GM, "e4")
        .with_status(online_complete());
    let config = PollerConfig::default()
        .with_failure_tolerance(3)
        .with_timeout(Duration::from_secs(1000));
    let poller = ReadinessPoller::new(source, Classifier::default(), config);

    let err = poller.wait_until_ready(&GM.into()).await.unwrap_err();

    match err {
        PollError::Fetch { cause, attempts } => {
            assert_eq!(attempts, 4);
            assert_eq!(cause.to_string(), "transport error: e4");
        }
        other => panic!("expected Fetch, got {:?}", other),
    }
    assert_eq!(poller.fetcher().fetch_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn timeout_carries_last_report() {
    let poller = poller(ScriptedSource::new().with_status(activating()));
    let started = Instant::now();

    let err = poller
        .wait_until_ready_with(
            &GM.into(),
            Duration::from_secs(20),
            Duration::from_secs(5),
            |_| {},
        )
        .await
        .unwrap_err();

    match err {
        PollError::TimeoutExceeded {
            last_report,
            elapsed,
        } => {
            let report = last_report.expect("a report was classified");
            assert_eq!(report.state, AggregateState::Activating);
            assert_ne!(report.verdict, HealthVerdict::Failed);
            assert!(!report.is_ready());
            assert_eq!(elapsed, Duration::from_secs(20));
        }
        other => panic!("expected TimeoutExceeded, got {:?}", other),
    }
    assert_eq!(started.elapsed(), Duration::from_secs(20));
    assert_eq!(poller.fetcher().fetch_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn timeout_without_any_report() {
    let source = ScriptedSource::new()
        .with_error(GM, "e1")
        .with_error(GM, "e2");
    let config = PollerConfig::default()
        .with_timeout(Duration::from_secs(45))
        .with_retry_delay(Duration::from_secs(30));
    let poller = ReadinessPoller::new(source, Classifier::default(), config);

    let err = poller.wait_until_ready(&GM.into()).await.unwrap_err();

    // failures at 0s, 30s and 45s stay within tolerance; the deadline ends it
    match err {
        PollError::TimeoutExceeded { last_report, .. } => assert!(last_report.is_none()),
        PollError::Fetch { .. } => panic!("tolerance should not be exhausted"),
        other => panic!("expected TimeoutExceeded, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn callback_runs_once_per_successful_cycle() {
    let source = ScriptedSource::new()
        .with_status(activating())
        .with_error(GM, "blip")
        .with_status(activating())
        .with_status(online_complete());
    let poller = poller(source);
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    poller
        .wait_until_ready_with_callback(&GM.into(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    assert_eq!(poller.fetcher().fetch_count(), 4);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn callback_sees_failing_report() {
    let source = ScriptedSource::new().with_status(
        RawStatus::builder(GM)
            .state(AggregateState::Failed)
            .build(),
    );
    let poller = poller(source);
    let mut verdicts = Vec::new();

    let err = poller
        .wait_until_ready_with_callback(&GM.into(), |report| verdicts.push(report.verdict))
        .await
        .unwrap_err();

    assert!(matches!(err, PollError::ResourceFailed { .. }));
    assert_eq!(verdicts, vec![HealthVerdict::Failed]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_sleep() {
    let poller = poller(ScriptedSource::new().with_status(activating()));
    let token = poller.cancellation_token();
    let started = Instant::now();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        token.cancel();
    });

    let err = poller.wait_until_ready(&GM.into()).await.unwrap_err();

    match err {
        PollError::Cancelled { last_report } => {
            assert_eq!(
                last_report.map(|r| r.state),
                Some(AggregateState::Activating)
            );
        }
        other => panic!("expected Cancelled, got {:?}", other),
    }
    assert_eq!(started.elapsed(), Duration::from_secs(7));
    assert_eq!(poller.fetcher().fetch_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_never_fetches() {
    let poller = poller(ScriptedSource::new().with_status(online_complete()));
    poller.cancellation_token().cancel();

    let err = poller.wait_until_ready(&GM.into()).await.unwrap_err();

    assert!(matches!(err, PollError::Cancelled { last_report: None }));
    assert_eq!(poller.fetcher().fetch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn degraded_while_converging_keeps_waiting() {
    let source = ScriptedSource::new()
        .with_status(
            RawStatus::builder(GM)
                .state(AggregateState::Online)
                .complete(false)
                .component("load", |c| c.dirty(true))
                .build(),
        )
        .with_status(online_complete());
    let poller = poller(source);
    let mut verdicts = Vec::new();

    let report = poller
        .wait_until_ready_with_callback(&GM.into(), |r| verdicts.push(r.verdict))
        .await
        .unwrap();

    assert_eq!(verdicts, vec![HealthVerdict::Degraded, HealthVerdict::Healthy]);
    assert_eq!(report.verdict, HealthVerdict::Healthy);
}

/// A server that accepts the request and never answers.
struct HungSource;

#[async_trait]
impl StatusFetcher for HungSource {
    async fn fetch(&self, _id: &ResourceId) -> Result<RawStatus, FetchError> {
        std::future::pending().await
    }

    fn description(&self) -> &str {
        "hung"
    }
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_is_cut_off_at_deadline() {
    let poller = ReadinessPoller::new(HungSource, Classifier::default(), PollerConfig::default());
    let started = Instant::now();

    let err = poller
        .wait_until_ready_with(
            &GM.into(),
            Duration::from_secs(60),
            Duration::from_secs(5),
            |_| {},
        )
        .await
        .unwrap_err();

    match err {
        PollError::TimeoutExceeded {
            last_report,
            elapsed,
        } => {
            assert!(last_report.is_none());
            assert_eq!(elapsed, Duration::from_secs(60));
        }
        other => panic!("expected TimeoutExceeded, got {:?}", other),
    }
    assert_eq!(started.elapsed(), Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn hung_fetch_after_progress_keeps_last_report() {
    let source = Arc::new(ScriptedSource::new().with_status(activating()));
    let flaky = StallAfterFirst {
        inner: Arc::clone(&source),
        calls: AtomicUsize::new(0),
    };
    let poller = ReadinessPoller::new(flaky, Classifier::default(), PollerConfig::default());

    let err = poller
        .wait_until_ready_with(
            &GM.into(),
            Duration::from_secs(30),
            Duration::from_secs(5),
            |_| {},
        )
        .await
        .unwrap_err();

    match err {
        PollError::TimeoutExceeded {
            last_report,
            elapsed,
        } => {
            assert_eq!(
                last_report.map(|r| r.state),
                Some(AggregateState::Activating)
            );
            assert_eq!(elapsed, Duration::from_secs(30));
        }
        other => panic!("expected TimeoutExceeded, got {:?}", other),
    }
    assert_eq!(source.fetch_count(), 1);
}

/// Answers once, then hangs on every later request.
struct StallAfterFirst {
    inner: Arc<ScriptedSource>,
    calls: AtomicUsize,
}

#[async_trait]
impl StatusFetcher for StallAfterFirst {
    async fn fetch(&self, id: &ResourceId) -> Result<RawStatus, FetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return self.inner.fetch(id).await;
        }
        std::future::pending().await
    }

    fn description(&self) -> &str {
        "stalls after first"
    }
}
