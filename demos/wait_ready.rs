//! Example: Waiting for a graphmart to come online
//!
//! This example drives a [`ReadinessPoller`] with scripted statuses, so it
//! runs without a server. A graphmart activates, reloads a dirty layer,
//! then comes online with one failed step.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --example wait_ready
//! ```

use std::time::Duration;

use graphwatch::types::{AggregateState, RawStatus};
use graphwatch::{Classifier, PollError, PollerConfig, ReadinessPoller, ScriptedSource};

const GRAPHMART: &str = "http://example.com/graphmart/sales";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let source = ScriptedSource::new()
        .with_status(
            RawStatus::builder(GRAPHMART)
                .state(AggregateState::Activating)
                .build(),
        )
        .with_error(GRAPHMART, "connection reset by peer")
        .with_status(
            RawStatus::builder(GRAPHMART)
                .state(AggregateState::Online)
                .component("layer/base", |c| c.title("Base data"))
                .component("layer/enrich", |c| c.title("Enrichment").dirty(true))
                .build(),
        )
        .with_status(
            RawStatus::builder(GRAPHMART)
                .state(AggregateState::Online)
                .complete(true)
                .component("layer/base", |c| c.title("Base data"))
                .component("layer/enrich", |c| {
                    c.title("Enrichment").child("step/index", |s| {
                        s.title("Index to search")
                            .error("Elasticsearch cluster unreachable: connection refused")
                    })
                })
                .build(),
        );

    let config = PollerConfig::default()
        .with_poll_interval(Duration::from_millis(500))
        .with_retry_delay(Duration::from_secs(1))
        .with_timeout(Duration::from_secs(30));
    let poller = ReadinessPoller::new(source, Classifier::default(), config);

    let result = poller
        .wait_until_ready_with_callback(&GRAPHMART.into(), |report| {
            println!("cycle: {}", report);
        })
        .await;

    match result {
        Ok(report) => {
            println!("\nready with verdict {}", report.verdict);
            for (category, count) in &report.attribution.categories {
                println!("  {} error(s) look like {}", count, category);
            }
        }
        Err(PollError::TimeoutExceeded { last_report, .. }) => {
            println!("\ntimed out; last report: {:?}", last_report);
        }
        Err(e) => println!("\nwait failed: {}", e),
    }
}
