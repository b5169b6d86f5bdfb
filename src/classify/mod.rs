//! Health classification of raw statuses.
//!
//! Classification is a pure function of a [`RawStatus`]: no I/O, no state
//! carried between calls. The verdict is derived in this precedence order:
//!
//! ```text
//! aggregate state is terminal-failure ──────────────▶ Failed
//! failed or dirty components ─┬─ failed > threshold ─▶ Failed
//!                             └─ otherwise ──────────▶ Degraded
//! otherwise ────────────────────────────────────────▶ Healthy
//! ```
//!
//! Keyword attribution of error text runs alongside and is reported in
//! [`HealthReport::attribution`], but never influences the verdict.

mod categories;

pub use categories::{
    CategoryKeywords, AUTH_DEPENDENCY, GRAPH_ENGINE_DEPENDENCY, SEARCH_INDEX_DEPENDENCY,
};

use graphwatch_types::{
    current_timestamp_ms, AggregateState, Attribution, HealthReport, HealthVerdict, RawStatus,
    SubComponentStatus,
};

/// Maximum characters of error text carried into a summary.
const SUMMARY_ERROR_CHARS: usize = 200;

/// Maximum lines of error text carried into a summary.
const SUMMARY_ERROR_LINES: usize = 5;

/// Classify a raw status with the given keyword categories and no
/// escalation threshold.
pub fn classify(raw: &RawStatus, categories: &CategoryKeywords) -> HealthReport {
    Classifier::new(categories.clone()).classify(raw)
}

/// Classifier configuration: keyword categories plus the optional
/// failed-component threshold above which an online resource is Failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classifier {
    categories: CategoryKeywords,
    failed_threshold: Option<usize>,
}

impl Classifier {
    /// Create a classifier without an escalation threshold.
    pub fn new(categories: CategoryKeywords) -> Self {
        Self {
            categories,
            failed_threshold: None,
        }
    }

    /// Escalate to Failed when more than `threshold` components fail.
    ///
    /// `None` (the default) never escalates: failures on a resource whose
    /// aggregate state is not a failure state stay Degraded.
    pub fn with_failed_threshold(mut self, threshold: Option<usize>) -> Self {
        self.failed_threshold = threshold;
        self
    }

    /// The keyword categories in use.
    pub fn categories(&self) -> &CategoryKeywords {
        &self.categories
    }

    /// The configured escalation threshold.
    pub fn failed_threshold(&self) -> Option<usize> {
        self.failed_threshold
    }

    /// Classify a raw status, stamping the report with the current time.
    pub fn classify(&self, raw: &RawStatus) -> HealthReport {
        self.classify_at(raw, current_timestamp_ms())
    }

    /// Classify a raw status with an explicit evaluation timestamp.
    pub fn classify_at(&self, raw: &RawStatus, evaluated_at_ms: u64) -> HealthReport {
        let mut failed = 0;
        let mut dirty = 0;
        for component in raw.enabled_components() {
            if component.has_error_in_tree() {
                failed += 1;
            } else if component.is_dirty_in_tree() {
                dirty += 1;
            }
        }

        let verdict = self.verdict(&raw.state, failed, dirty);

        HealthReport {
            resource: raw.resource.clone(),
            verdict,
            state: raw.state.clone(),
            complete: raw.complete,
            failed,
            dirty,
            error_summary: summarize(raw, failed, dirty),
            attribution: self.attribute(raw),
            engine: raw.engine.clone(),
            evaluated_at_ms,
        }
    }

    fn verdict(&self, state: &AggregateState, failed: usize, dirty: usize) -> HealthVerdict {
        if state.is_terminal_failure() {
            return HealthVerdict::Failed;
        }
        if failed > 0 || dirty > 0 {
            let escalate = self.failed_threshold.is_some_and(|t| failed > t);
            return if escalate {
                HealthVerdict::Failed
            } else {
                HealthVerdict::Degraded
            };
        }
        HealthVerdict::Healthy
    }

    fn attribute(&self, raw: &RawStatus) -> Attribution {
        let mut attribution = Attribution::default();
        for component in &raw.components {
            component.walk_enabled(&mut |node| {
                let Some(text) = node.error_text() else {
                    return;
                };
                let matched = self.categories.matching(text);
                if matched.is_empty() {
                    attribution.unattributed += 1;
                }
                for category in matched {
                    *attribution
                        .categories
                        .entry(category.to_string())
                        .or_default() += 1;
                }
            });
        }
        attribution
    }
}

fn summarize(raw: &RawStatus, failed: usize, dirty: usize) -> Option<String> {
    if raw.state.is_terminal_failure() {
        return Some(format!("resource is {}", raw.state));
    }
    if failed > 0 {
        let mut summary = format!("{} sub-component(s) failed", failed);
        if let Some((node, text)) = first_error(raw) {
            summary.push_str(&format!("; first: '{}': {}", node.display_name(), excerpt(text)));
        }
        return Some(summary);
    }
    if dirty > 0 {
        return Some(format!("{} sub-component(s) dirty", dirty));
    }
    if !raw.state.is_online() {
        return Some(format!("resource is {}", raw.state));
    }
    if !raw.complete {
        return Some("processing in progress".to_string());
    }
    None
}

fn first_error(raw: &RawStatus) -> Option<(&SubComponentStatus, &str)> {
    let mut found = None;
    for component in &raw.components {
        component.walk_enabled(&mut |node| {
            if found.is_none() {
                if let Some(text) = node.error_text() {
                    found = Some((node, text));
                }
            }
        });
        if found.is_some() {
            break;
        }
    }
    found
}

// First few lines of an error, capped in length
fn excerpt(text: &str) -> String {
    let lines: Vec<&str> = text.trim().lines().map(str::trim).collect();
    let mut joined = lines
        .iter()
        .take(SUMMARY_ERROR_LINES)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let mut truncated = lines.len() > SUMMARY_ERROR_LINES;
    if joined.chars().count() > SUMMARY_ERROR_CHARS {
        joined = joined.chars().take(SUMMARY_ERROR_CHARS).collect();
        truncated = true;
    }
    if truncated {
        joined.push_str("...");
    }
    joined
}
