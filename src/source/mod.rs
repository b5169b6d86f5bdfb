//! Status source abstraction: the one collaborator the poller talks to.
//!
//! The poller learns about a resource only through [`StatusFetcher::fetch`].
//! Implementations wrap a real management API client or, for demos and
//! tests, replay a script of statuses.

#[cfg(feature = "anzo")]
mod http;
mod scripted;

#[cfg(feature = "anzo")]
pub use http::HttpFetcher;
pub use scripted::ScriptedSource;

use std::sync::Arc;

use async_trait::async_trait;
use graphwatch_types::{RawStatus, ResourceId};
use thiserror::Error;

/// Failure to obtain a status from the remote system.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The management API client reported an error.
    #[cfg(feature = "anzo")]
    #[error(transparent)]
    Api(#[from] graphwatch_adapters::AdapterError),

    /// Transport-level failure outside a specific API client.
    #[error("transport error: {0}")]
    Transport(String),

    /// The status could not be produced for another reason.
    #[error("status unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Whether a later fetch could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            #[cfg(feature = "anzo")]
            FetchError::Api(err) => err.is_transient(),
            FetchError::Transport(_) => true,
            FetchError::Unavailable(_) => false,
        }
    }
}

/// Trait for fetching the raw status of a resource.
///
/// Fetches are read-only against the remote system. Implementations must be
/// shareable across tasks so that independent pollers can use one client.
///
/// # Example
///
/// ```
/// use graphwatch::{ScriptedSource, StatusFetcher};
/// use graphwatch::types::{AggregateState, RawStatus};
///
/// # tokio_test::block_on(async {
/// let source = ScriptedSource::new()
///     .with_status(RawStatus::builder("gm").state(AggregateState::Online).build());
///
/// let status = source.fetch(&"gm".into()).await.unwrap();
/// assert_eq!(status.state, AggregateState::Online);
/// # });
/// ```
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    /// Fetch the current status of `id`.
    async fn fetch(&self, id: &ResourceId) -> Result<RawStatus, FetchError>;

    /// Look up the display title of `id`.
    ///
    /// Titles are cosmetic, so lookups are best-effort: `None` means the
    /// caller should fall back to the identifier.
    async fn title(&self, _id: &ResourceId) -> Option<String> {
        None
    }

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str {
        "status fetcher"
    }
}

#[async_trait]
impl<T: StatusFetcher + ?Sized> StatusFetcher for Arc<T> {
    async fn fetch(&self, id: &ResourceId) -> Result<RawStatus, FetchError> {
        (**self).fetch(id).await
    }

    async fn title(&self, id: &ResourceId) -> Option<String> {
        (**self).title(id).await
    }

    fn description(&self) -> &str {
        (**self).description()
    }
}
