//! Keyword categories for attributing error text to dependencies.
//!
//! The remote API exposes no direct health signal for the services a
//! graphmart depends on (search index, graph engine, directory service).
//! Failures in those services surface only as free text on layers and
//! steps, so we scan for keywords. This is a best-effort hint.

use std::collections::{BTreeMap, BTreeSet};

/// Search index (Elasticsearch) failures.
pub const SEARCH_INDEX_DEPENDENCY: &str = "search-index-dependency";

/// Graph engine (AnzoGraph / lakehouse) failures.
pub const GRAPH_ENGINE_DEPENDENCY: &str = "graph-engine-dependency";

/// Directory / authentication (LDAP) failures.
pub const AUTH_DEPENDENCY: &str = "auth-dependency";

const SEARCH_INDEX_KEYWORDS: &[&str] = &[
    "elasticsearch",
    "elastic",
    "es index",
    "es indexing",
    "indexing service",
    "search index",
];

const GRAPH_ENGINE_KEYWORDS: &[&str] = &["anzograph", "azg", "lakehouse"];

const AUTH_KEYWORDS: &[&str] = &["ldap", "authentication", "unauthorized"];

/// Mapping of category name to keyword set.
///
/// Keywords are stored lowercased and matched as case-insensitive substrings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryKeywords {
    categories: BTreeMap<String, BTreeSet<String>>,
}

impl CategoryKeywords {
    /// A map with no categories; every error text is unattributed.
    pub fn empty() -> Self {
        Self {
            categories: BTreeMap::new(),
        }
    }

    /// Build from a plain map, e.g. one loaded from configuration.
    pub fn from_map(map: BTreeMap<String, Vec<String>>) -> Self {
        let mut keywords = Self::empty();
        for (category, words) in map {
            keywords.insert(category, words);
        }
        keywords
    }

    /// Add keywords to a category, creating it if needed.
    ///
    /// Blank keywords are ignored since they would match everything.
    pub fn insert<I, S>(&mut self, category: impl Into<String>, keywords: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.categories.entry(category.into()).or_default();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() {
                entry.insert(keyword);
            }
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_category<I, S>(mut self, category: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert(category, keywords);
        self
    }

    /// Merge another map into this one.
    pub fn extend(&mut self, other: CategoryKeywords) {
        for (category, words) in other.categories {
            self.categories.entry(category).or_default().extend(words);
        }
    }

    /// Category names, in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Keywords of a category.
    pub fn keywords(&self, category: &str) -> Option<&BTreeSet<String>> {
        self.categories.get(category)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether there are no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Categories with at least one keyword occurring in `text`.
    pub fn matching(&self, text: &str) -> Vec<&str> {
        let text = text.to_lowercase();
        self.categories
            .iter()
            .filter(|(_, words)| words.iter().any(|w| text.contains(w.as_str())))
            .map(|(category, _)| category.as_str())
            .collect()
    }
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        Self::empty()
            .with_category(SEARCH_INDEX_DEPENDENCY, SEARCH_INDEX_KEYWORDS)
            .with_category(GRAPH_ENGINE_DEPENDENCY, GRAPH_ENGINE_KEYWORDS)
            .with_category(AUTH_DEPENDENCY, AUTH_KEYWORDS)
    }
}
