//! # graphwatch-adapters
//!
//! Status clients that fetch the raw state of a monitored resource from a
//! platform's management API and convert it to graphwatch format.
//!
//! ## Supported Systems
//!
//! - **Anzo / Altair Graph Studio** (`anzo` feature) - Fetches graphmart
//!   status, completion and per-layer/step errors via the graphmart REST API
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graphwatch_adapters::anzo::GraphmartStatusClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GraphmartStatusClient::builder()
//!         .endpoint("https://anzo.example.com:8443")
//!         .credentials("admin", "secret")
//!         .build()?;
//!
//!     let status = client
//!         .fetch_status("http://cambridgesemantics.com/graphmart/sales")
//!         .await?;
//!
//!     println!("{} is {}", status.resource, status.state);
//!     Ok(())
//! }
//! ```

pub mod error;

#[cfg(feature = "anzo")]
pub mod anzo;

pub use error::AdapterError;

// Re-export types for convenience
pub use graphwatch_types::{AggregateState, RawStatus, ResourceId, SubComponentStatus};
