//! Example: Waiting on several graphmarts at once
//!
//! Each graphmart gets its own poller task. Reports stream back over a
//! channel while the waits run, and a [`ReportHistory`] picks out verdict
//! changes.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example watch_fleet
//! ```

use std::sync::Arc;
use std::time::Duration;

use graphwatch::types::{AggregateState, RawStatus};
use graphwatch::{Classifier, Fleet, PollerConfig, ReportHistory, ScriptedSource};
use tokio::sync::mpsc;

fn status(id: &str, state: AggregateState, complete: bool) -> RawStatus {
    RawStatus::builder(id).state(state).complete(complete).build()
}

#[tokio::main]
async fn main() {
    let sales = "http://example.com/graphmart/sales";
    let hr = "http://example.com/graphmart/hr";
    let legacy = "http://example.com/graphmart/legacy";

    let source = ScriptedSource::new()
        .with_status_repeated(status(sales, AggregateState::Activating, false), 2)
        .with_status(status(sales, AggregateState::Online, true))
        .with_status(
            RawStatus::builder(hr)
                .state(AggregateState::Online)
                .complete(true)
                .component("layer/people", |c| c.error("LDAP bind failed: invalid credentials"))
                .build(),
        )
        .with_status(status(legacy, AggregateState::Activating, false))
        .with_status(status(legacy, AggregateState::Offline, false));

    let config = PollerConfig::default()
        .with_poll_interval(Duration::from_millis(200))
        .with_timeout(Duration::from_secs(10));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let fleet = Fleet::new(Arc::new(source), Classifier::default(), config).with_updates(tx);

    let watcher = tokio::spawn(async move {
        let mut history = ReportHistory::new();
        while let Some(report) = rx.recv().await {
            let id = report.resource.clone();
            if let Some(change) = history.record(report) {
                println!("{}: {} -> {}", id, change.from, change.to);
            }
        }
    });

    let outcomes = fleet
        .wait_all(vec![sales.into(), hr.into(), legacy.into()])
        .await;
    drop(fleet);
    let _ = watcher.await;

    println!();
    for outcome in outcomes {
        match outcome.result {
            Ok(report) => println!("ready   {}", report),
            Err(e) => println!("stopped {}: {}", outcome.resource, e),
        }
    }
}
