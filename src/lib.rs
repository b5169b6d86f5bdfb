//! # graphwatch
//!
//! Readiness polling and health classification for graphmarts hosted on a
//! graph platform's management API.
//!
//! A graphmart reports an aggregate state plus a tree of layers and steps,
//! each of which may carry error text or be dirty. This crate turns that
//! raw status into a [`HealthReport`](types::HealthReport) and waits, with
//! bounded patience, for a graphmart to become ready.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          graphwatch                              │
//! │  ┌───────────┐  RawStatus  ┌────────────┐  HealthReport          │
//! │  │  source   │────────────▶│  classify  │──────────┐             │
//! │  │ (fetcher) │             │  (pure)    │          ▼             │
//! │  └─────▲─────┘             └────────────┘   ┌─────────────┐      │
//! │        │                                    │   poller    │      │
//! │        └────────────── fetch ───────────────│ (wait loop) │      │
//! │                                             └──────┬──────┘      │
//! │                                                    ▼             │
//! │                                    fleet (one task per resource) │
//! └──────────────────────────────────────────────────────────────────┘
//!         ▲
//!         │ HttpFetcher ◀── graphwatch-adapters (REST client)
//! ```
//!
//! - **[`source`]**: the [`StatusFetcher`] trait, an HTTP implementation and
//!   a scripted one for demos and tests
//! - **[`classify`]**: pure mapping from raw status to verdict, counts,
//!   summary and dependency attribution
//! - **[`poller`]**: the wait loop with timeout, retry tolerance and
//!   cancellation
//! - **[`fleet`]**: concurrent waits and interval monitoring over many
//!   resources
//! - **[`history`]**: recent reports per resource for transition logging
//! - **[`config`]**: layered settings from file and environment
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # One-shot health check
//! graphwatch check http://example.com/graphmart/sales
//!
//! # Wait up to 20 minutes for two graphmarts
//! graphwatch --config graphwatch.toml wait --timeout 20m \
//!     http://example.com/graphmart/sales http://example.com/graphmart/hr
//!
//! # Check every minute for an hour, printing changes as they happen
//! graphwatch watch --interval 60s --duration 1h http://example.com/graphmart/sales
//! ```
//!
//! ### As a library
//!
//! ```
//! use graphwatch::{Classifier, PollerConfig, ReadinessPoller, ScriptedSource};
//! use graphwatch::types::{AggregateState, HealthVerdict, RawStatus};
//!
//! # tokio_test::block_on(async {
//! let source = ScriptedSource::new().with_status(
//!     RawStatus::builder("gm")
//!         .state(AggregateState::Online)
//!         .complete(true)
//!         .component("load", |c| c.dirty(true))
//!         .build(),
//! );
//!
//! let poller = ReadinessPoller::new(source, Classifier::default(), PollerConfig::default());
//! let report = poller.wait_until_ready(&"gm".into()).await.unwrap();
//! assert_eq!(report.verdict, HealthVerdict::Degraded);
//! # });
//! ```

pub mod classify;
pub mod config;
pub mod duration;
pub mod fleet;
pub mod history;
pub mod poller;
pub mod source;

pub use graphwatch_types as types;

#[cfg(feature = "anzo")]
pub use graphwatch_adapters as adapters;

// Re-export main types for convenience
pub use classify::{classify, CategoryKeywords, Classifier};
pub use config::{ConfigError, Settings};
pub use fleet::{Fleet, FleetOutcome, MonitorOutcome};
pub use history::{ReportHistory, Transition};
pub use poller::{PollError, PollerConfig, ReadinessPoller};
pub use source::{FetchError, ScriptedSource, StatusFetcher};

#[cfg(feature = "anzo")]
pub use source::HttpFetcher;
