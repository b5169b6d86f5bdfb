//! Scripted status source.
//!
//! Replays a predetermined sequence of statuses and failures per resource.
//! This is useful for demos, dry runs and tests of code that drives a
//! [`ReadinessPoller`](crate::ReadinessPoller) without a live server.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use graphwatch_types::{RawStatus, ResourceId};
use parking_lot::Mutex;

use super::{FetchError, StatusFetcher};

#[derive(Debug, Clone)]
enum Step {
    Status(RawStatus),
    Error(String),
}

#[derive(Debug, Default)]
struct Script {
    steps: VecDeque<Step>,
    last: Option<RawStatus>,
    fetches: usize,
}

/// A status source that replays scripted responses.
///
/// Each resource has its own script. Statuses are queued under the
/// resource they name; failures are queued explicitly. Once a script is
/// exhausted the last status is repeated, so a resource that reached a
/// steady state stays there.
///
/// # Example
///
/// ```
/// use graphwatch::{ScriptedSource, StatusFetcher};
/// use graphwatch::types::{AggregateState, RawStatus};
///
/// # tokio_test::block_on(async {
/// let source = ScriptedSource::new()
///     .with_error("gm", "connection reset")
///     .with_status(RawStatus::builder("gm").state(AggregateState::Online).build());
///
/// assert!(source.fetch(&"gm".into()).await.is_err());
/// assert!(source.fetch(&"gm".into()).await.is_ok());
/// assert!(source.fetch(&"gm".into()).await.is_ok());
/// assert_eq!(source.fetch_count(), 3);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<ResourceId, Script>>,
    titles: Mutex<HashMap<ResourceId, String>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a status for the resource it names.
    pub fn with_status(self, status: RawStatus) -> Self {
        self.push_status(status);
        self
    }

    /// Queue the same status `times` times.
    pub fn with_status_repeated(self, status: RawStatus, times: usize) -> Self {
        for _ in 0..times {
            self.push_status(status.clone());
        }
        self
    }

    /// Queue a fetch failure for a resource.
    pub fn with_error(self, id: impl Into<ResourceId>, message: impl Into<String>) -> Self {
        self.push_error(id, message);
        self
    }

    /// Give a resource a display title.
    pub fn with_title(self, id: impl Into<ResourceId>, title: impl Into<String>) -> Self {
        self.titles.lock().insert(id.into(), title.into());
        self
    }

    /// Queue a status while the source is in use.
    pub fn push_status(&self, status: RawStatus) {
        let mut scripts = self.scripts.lock();
        scripts
            .entry(status.resource.clone())
            .or_default()
            .steps
            .push_back(Step::Status(status));
    }

    /// Queue a fetch failure while the source is in use.
    pub fn push_error(&self, id: impl Into<ResourceId>, message: impl Into<String>) {
        let mut scripts = self.scripts.lock();
        scripts
            .entry(id.into())
            .or_default()
            .steps
            .push_back(Step::Error(message.into()));
    }

    /// Total number of fetches served, across all resources.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of fetches served for one resource.
    pub fn fetch_count_for(&self, id: &ResourceId) -> usize {
        self.scripts.lock().get(id).map_or(0, |s| s.fetches)
    }

    fn next(&self, id: &ResourceId) -> Result<RawStatus, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let mut scripts = self.scripts.lock();
        let script = scripts.entry(id.clone()).or_default();
        script.fetches += 1;

        match script.steps.pop_front() {
            Some(Step::Status(status)) => {
                script.last = Some(status.clone());
                Ok(status)
            }
            Some(Step::Error(message)) => Err(FetchError::Transport(message)),
            None => script
                .last
                .clone()
                .ok_or_else(|| FetchError::Unavailable(format!("no status scripted for {}", id))),
        }
    }
}

#[async_trait]
impl StatusFetcher for ScriptedSource {
    async fn fetch(&self, id: &ResourceId) -> Result<RawStatus, FetchError> {
        self.next(id)
    }

    async fn title(&self, id: &ResourceId) -> Option<String> {
        self.titles.lock().get(id).cloned()
    }

    fn description(&self) -> &str {
        "scripted"
    }
}
