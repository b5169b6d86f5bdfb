use std::time::Duration;

use graphwatch_types::HealthReport;
use thiserror::Error;

use crate::duration::format_elapsed;
use crate::source::FetchError;

/// Terminal outcome of a wait that did not end ready.
#[derive(Debug, Error)]
pub enum PollError {
    /// The deadline passed before the resource became ready.
    #[error("not ready after {}{}", format_elapsed(*elapsed), last_seen(last_report))]
    TimeoutExceeded {
        /// Last successful classification, if any fetch succeeded.
        last_report: Option<HealthReport>,
        /// Time spent waiting.
        elapsed: Duration,
    },

    /// A cycle classified the resource as Failed.
    #[error("resource failed: {report}")]
    ResourceFailed {
        /// The failing classification.
        report: HealthReport,
    },

    /// Fetch failures exceeded the tolerance.
    #[error("status fetch failed {attempts} times in a row: {cause}")]
    Fetch {
        /// The last fetch error.
        #[source]
        cause: FetchError,
        /// Consecutive failures observed.
        attempts: u32,
    },

    /// The wait was cancelled.
    #[error("wait cancelled{}", last_seen(last_report))]
    Cancelled {
        /// Last successful classification, if any fetch succeeded.
        last_report: Option<HealthReport>,
    },
}

impl PollError {
    /// The most recent report known when the wait ended.
    pub fn last_report(&self) -> Option<&HealthReport> {
        match self {
            PollError::TimeoutExceeded { last_report, .. }
            | PollError::Cancelled { last_report } => last_report.as_ref(),
            PollError::ResourceFailed { report } => Some(report),
            PollError::Fetch { .. } => None,
        }
    }
}

fn last_seen(report: &Option<HealthReport>) -> String {
    match report {
        Some(report) => format!("; last seen {}", report),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphwatch_types::{AggregateState, Attribution, HealthVerdict};

    fn report() -> HealthReport {
        HealthReport {
            resource: "gm".into(),
            verdict: HealthVerdict::Healthy,
            state: AggregateState::Activating,
            complete: false,
            failed: 0,
            dirty: 0,
            error_summary: Some("resource is Activating".to_string()),
            attribution: Attribution::default(),
            engine: None,
            evaluated_at_ms: 0,
        }
    }

    #[test]
    fn timeout_message_includes_last_report() {
        let err = PollError::TimeoutExceeded {
            last_report: Some(report()),
            elapsed: Duration::from_secs(65),
        };
        let message = err.to_string();
        assert!(message.starts_with("not ready after 0:01:05; last seen [OK] gm"));
        assert!(err.last_report().is_some());
    }

    #[test]
    fn fetch_error_has_no_report() {
        let err = PollError::Fetch {
            cause: FetchError::Transport("reset".to_string()),
            attempts: 4,
        };
        assert_eq!(
            err.to_string(),
            "status fetch failed 4 times in a row: transport error: reset"
        );
        assert!(err.last_report().is_none());
    }

    #[test]
    fn cancelled_without_report() {
        let err = PollError::Cancelled { last_report: None };
        assert_eq!(err.to_string(), "wait cancelled");
    }
}
