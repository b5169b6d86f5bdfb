//! Recent report history for transition logging.

use std::collections::{BTreeMap, HashMap, VecDeque};

use graphwatch_types::{HealthReport, HealthVerdict, ResourceId};

/// Default number of reports kept per resource.
pub const DEFAULT_HISTORY_SIZE: usize = 60;

/// A verdict change between two consecutive reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Verdict of the earlier report.
    pub from: HealthVerdict,
    /// Verdict of the later report.
    pub to: HealthVerdict,
}

impl Transition {
    /// Whether the verdict got worse.
    pub fn is_regression(&self) -> bool {
        self.to > self.from
    }
}

/// Bounded per-resource history of health reports.
///
/// The oldest report is dropped once a resource holds `capacity` reports.
#[derive(Debug, Clone)]
pub struct ReportHistory {
    reports: HashMap<ResourceId, VecDeque<HealthReport>>,
    capacity: usize,
}

impl Default for ReportHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportHistory {
    /// Create an empty history with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    /// Create an empty history keeping at most `capacity` reports per
    /// resource (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            reports: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a report and return the verdict change it caused, if any.
    pub fn record(&mut self, report: HealthReport) -> Option<Transition> {
        let id = report.resource.clone();
        let reports = self.reports.entry(id.clone()).or_default();
        reports.push_back(report);
        if reports.len() > self.capacity {
            reports.pop_front();
        }
        self.transition(&id)
    }

    /// Most recent report for a resource.
    pub fn latest(&self, id: &ResourceId) -> Option<&HealthReport> {
        self.reports.get(id)?.back()
    }

    /// Report before the most recent one.
    pub fn previous(&self, id: &ResourceId) -> Option<&HealthReport> {
        let reports = self.reports.get(id)?;
        reports.get(reports.len().checked_sub(2)?)
    }

    /// Verdict change between the last two reports.
    pub fn transition(&self, id: &ResourceId) -> Option<Transition> {
        let from = self.previous(id)?.verdict;
        let to = self.latest(id)?.verdict;
        (from != to).then_some(Transition { from, to })
    }

    /// How many retained reports carried each verdict.
    pub fn verdict_counts(&self, id: &ResourceId) -> BTreeMap<HealthVerdict, usize> {
        let mut counts = BTreeMap::new();
        for report in self.reports.get(id).into_iter().flatten() {
            *counts.entry(report.verdict).or_default() += 1;
        }
        counts
    }

    /// Number of reports retained for a resource.
    pub fn len(&self, id: &ResourceId) -> usize {
        self.reports.get(id).map_or(0, VecDeque::len)
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Resources with at least one report, in no particular order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceId> {
        self.reports.keys()
    }
}
