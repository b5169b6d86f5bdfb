//! Aggregate resource state.

use std::fmt;

/// Aggregate state reported by the remote system for a whole resource.
///
/// The management API reports states as ontology IRIs such as
/// `http://cambridgesemantics.com/ontologies/Graphmarts#Online`; only the
/// fragment after `#` is significant. Unknown values are preserved in
/// [`AggregateState::Other`] and treated as still converging.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AggregateState {
    Online,
    Offline,
    Activating,
    Deactivating,
    Failed,
    Other(String),
    #[default]
    Unknown,
}

impl AggregateState {
    /// Parse a state value as returned by the API.
    ///
    /// Matching is case-insensitive and ignores any IRI prefix.
    pub fn parse(raw: &str) -> Self {
        let fragment = raw.rsplit('#').next().unwrap_or(raw).trim();
        match fragment.to_ascii_lowercase().as_str() {
            "online" => AggregateState::Online,
            "offline" => AggregateState::Offline,
            "activating" | "reloading" | "refreshing" => AggregateState::Activating,
            "deactivating" => AggregateState::Deactivating,
            "failed" | "error" => AggregateState::Failed,
            "" | "unknown" => AggregateState::Unknown,
            _ => AggregateState::Other(fragment.to_string()),
        }
    }

    /// Whether the resource will not recover from this state without
    /// external intervention.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, AggregateState::Offline | AggregateState::Failed)
    }

    /// Whether the resource reports itself as serving.
    pub fn is_online(&self) -> bool {
        matches!(self, AggregateState::Online)
    }

    /// Short label for display.
    pub fn label(&self) -> &str {
        match self {
            AggregateState::Online => "Online",
            AggregateState::Offline => "Offline",
            AggregateState::Activating => "Activating",
            AggregateState::Deactivating => "Deactivating",
            AggregateState::Failed => "Failed",
            AggregateState::Other(s) => s,
            AggregateState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AggregateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_strips_iri_prefix() {
        assert_eq!(
            AggregateState::parse("http://cambridgesemantics.com/ontologies/Graphmarts#Online"),
            AggregateState::Online
        );
        assert_eq!(
            AggregateState::parse("http://cambridgesemantics.com/ontologies/Graphmarts#Offline"),
            AggregateState::Offline
        );
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(AggregateState::parse("ONLINE"), AggregateState::Online);
        assert_eq!(AggregateState::parse("activating"), AggregateState::Activating);
        assert_eq!(AggregateState::parse(" Failed "), AggregateState::Failed);
    }

    #[test]
    fn parse_keeps_unrecognised_values() {
        assert_eq!(
            AggregateState::parse("#Provisioning"),
            AggregateState::Other("Provisioning".to_string())
        );
        assert_eq!(AggregateState::parse(""), AggregateState::Unknown);
    }

    #[test]
    fn terminal_failure_states() {
        assert!(AggregateState::Offline.is_terminal_failure());
        assert!(AggregateState::Failed.is_terminal_failure());
        assert!(!AggregateState::Online.is_terminal_failure());
        assert!(!AggregateState::Activating.is_terminal_failure());
        assert!(!AggregateState::Other("x".into()).is_terminal_failure());
        assert!(!AggregateState::Unknown.is_terminal_failure());
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(AggregateState::Online.to_string(), "Online");
        assert_eq!(AggregateState::Other("Paused".into()).to_string(), "Paused");
    }
}
