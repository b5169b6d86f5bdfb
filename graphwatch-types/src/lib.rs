//! # graphwatch-types
//!
//! Core types for monitoring a remote resource that converges asynchronously,
//! such as a graphmart being reloaded on a graph-data platform. This crate
//! defines the raw status model fetched from the remote side and the health
//! report derived from it.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature for JSON export
//! - **Transport agnostic**: Any client that can produce a [`RawStatus`] can be monitored
//! - **Ergonomic builders**: Fluent API for constructing statuses in tests and adapters
//!
//! ## Example
//!
//! ```rust
//! use graphwatch_types::{AggregateState, RawStatus};
//!
//! let status = RawStatus::builder("http://example.org/graphmart/sales")
//!     .state(AggregateState::Online)
//!     .complete(true)
//!     .component("layer-ingest", |c| {
//!         c.title("Ingest")
//!          .child("step-load", |s| s.error("Connection to Elasticsearch timed out"))
//!     })
//!     .component("layer-views", |c| c.dirty(true))
//!     .build();
//!
//! assert_eq!(status.components.len(), 2);
//! assert!(status.components[0].has_error_in_tree());
//! ```

mod id;
mod report;
mod state;
mod status;

pub use id::*;
pub use report::*;
pub use state::*;
pub use status::*;

/// Get current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
