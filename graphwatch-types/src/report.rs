//! Health reports derived from a raw status.

use std::collections::BTreeMap;
use std::fmt;

use crate::{AggregateState, ResourceId};

/// Three-level health verdict.
///
/// Ordered so that the worst of several verdicts is their `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum HealthVerdict {
    Healthy,
    Degraded,
    Failed,
}

impl HealthVerdict {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            HealthVerdict::Healthy => "OK",
            HealthVerdict::Degraded => "WARN",
            HealthVerdict::Failed => "FAIL",
        }
    }
}

impl fmt::Display for HealthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthVerdict::Healthy => "healthy",
            HealthVerdict::Degraded => "degraded",
            HealthVerdict::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Best-effort attribution of error text to likely root-cause dependencies.
///
/// This is heuristic keyword matching and never contributes to the verdict.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attribution {
    /// Number of error texts matching each category.
    pub categories: BTreeMap<String, usize>,

    /// Number of error texts that matched no category.
    pub unattributed: usize,
}

impl Attribution {
    /// Whether no error text was seen at all.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.unattributed == 0
    }

    /// Count for a category (zero when absent).
    pub fn count(&self, category: &str) -> usize {
        self.categories.get(category).copied().unwrap_or(0)
    }
}

/// Result of classifying one [`RawStatus`](crate::RawStatus).
///
/// Produced once per poll cycle; callers may retain a history of them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealthReport {
    /// The resource that was evaluated.
    pub resource: ResourceId,

    /// Derived verdict.
    pub verdict: HealthVerdict,

    /// Aggregate state seen in the raw status.
    pub state: AggregateState,

    /// Processing-complete flag seen in the raw status.
    pub complete: bool,

    /// Number of enabled top-level components with errors.
    pub failed: usize,

    /// Number of enabled top-level components that are dirty but not failed.
    pub dirty: usize,

    /// Human-readable summary of what is wrong, if anything.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub error_summary: Option<String>,

    /// Auxiliary dependency attribution.
    #[cfg_attr(feature = "serde", serde(default))]
    pub attribution: Attribution,

    /// Graph engine the resource is bound to, if reported.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub engine: Option<String>,

    /// Unix timestamp in milliseconds when the report was evaluated.
    pub evaluated_at_ms: u64,
}

impl HealthReport {
    /// Whether the resource is online, done processing and not failed.
    pub fn is_ready(&self) -> bool {
        self.state.is_online() && self.complete && self.verdict != HealthVerdict::Failed
    }

    /// Whether the verdict is `Healthy`.
    pub fn is_healthy(&self) -> bool {
        self.verdict == HealthVerdict::Healthy
    }

    /// Compare two reports ignoring the evaluation timestamp.
    pub fn same_assessment(&self, other: &HealthReport) -> bool {
        self.resource == other.resource
            && self.verdict == other.verdict
            && self.state == other.state
            && self.complete == other.complete
            && self.failed == other.failed
            && self.dirty == other.dirty
            && self.error_summary == other.error_summary
            && self.attribution == other.attribution
            && self.engine == other.engine
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}, complete={}, failed={}, dirty={})",
            self.verdict.symbol(),
            self.resource,
            self.state,
            self.complete,
            self.failed,
            self.dirty
        )?;
        if let Some(engine) = &self.engine {
            write!(f, " on {}", engine)?;
        }
        if let Some(summary) = &self.error_summary {
            write!(f, ": {}", summary)?;
        }
        Ok(())
    }
}
