//! Raw status - what a single fetch from the remote system returns.

use crate::{AggregateState, ResourceId};

/// The raw structured response from one status fetch.
///
/// A `RawStatus` is fetched fresh on every poll cycle and is never cached
/// beyond the last value. Health is always recomputed from it.
///
/// # Example
///
/// ```rust
/// use graphwatch_types::{AggregateState, RawStatus};
///
/// let status = RawStatus::builder("gm-1")
///     .state(AggregateState::Activating)
///     .component("layer-1", |c| c)
///     .build();
///
/// assert!(!status.complete);
/// assert_eq!(status.state, AggregateState::Activating);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawStatus {
    /// The resource this status describes.
    pub resource: ResourceId,

    /// Aggregate state of the whole resource.
    pub state: AggregateState,

    /// Whether the remote side reports processing as complete.
    pub complete: bool,

    /// Graph engine the resource is bound to, when the API reports one.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub engine: Option<String>,

    /// Top-level sub-components (layers), in API order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub components: Vec<SubComponentStatus>,
}

impl RawStatus {
    /// Create an empty status with the given state.
    pub fn new(resource: impl Into<ResourceId>, state: AggregateState) -> Self {
        Self {
            resource: resource.into(),
            state,
            complete: false,
            engine: None,
            components: Vec::new(),
        }
    }

    /// Create a builder for constructing statuses.
    pub fn builder(resource: impl Into<ResourceId>) -> RawStatusBuilder {
        RawStatusBuilder::new(resource)
    }

    /// Whether the resource is online and done processing.
    pub fn is_ready(&self) -> bool {
        self.state.is_online() && self.complete
    }

    /// Iterate over enabled top-level components.
    pub fn enabled_components(&self) -> impl Iterator<Item = &SubComponentStatus> {
        self.components.iter().filter(|c| c.enabled)
    }
}

/// Status of a nested constituent of a resource (a layer or a step).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubComponentStatus {
    /// Identifier of the component (URI for layers and steps).
    pub id: String,

    /// Human readable title, when the API provides one.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub title: Option<String>,

    /// Disabled components are not evaluated.
    pub enabled: bool,

    /// Stale state that has not been refreshed yet.
    #[cfg_attr(feature = "serde", serde(default))]
    pub dirty: bool,

    /// Error text reported for the component, if any.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub error: Option<String>,

    /// Nested children (steps of a layer).
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub children: Vec<SubComponentStatus>,
}

impl SubComponentStatus {
    /// Create an enabled, clean component with no children.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            enabled: true,
            dirty: false,
            error: None,
            children: Vec::new(),
        }
    }

    /// Create a builder for a component.
    pub fn builder(id: impl Into<String>) -> SubComponentBuilder {
        SubComponentBuilder::new(id)
    }

    /// Title if present, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }

    /// Error text, treating blank text as absent.
    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.trim().is_empty())
    }

    /// Whether this component or any enabled child carries an error.
    pub fn has_error_in_tree(&self) -> bool {
        self.enabled
            && (self.error_text().is_some() || self.children.iter().any(|c| c.has_error_in_tree()))
    }

    /// Whether this component or any enabled child is dirty.
    pub fn is_dirty_in_tree(&self) -> bool {
        self.enabled && (self.dirty || self.children.iter().any(|c| c.is_dirty_in_tree()))
    }

    /// Visit this component and its enabled descendants, depth first.
    ///
    /// Disabled components are skipped together with their subtree.
    pub fn walk_enabled<'a>(&'a self, visit: &mut impl FnMut(&'a SubComponentStatus)) {
        if !self.enabled {
            return;
        }
        visit(self);
        for child in &self.children {
            child.walk_enabled(visit);
        }
    }
}

/// Builder for constructing `RawStatus` instances.
#[derive(Debug)]
pub struct RawStatusBuilder {
    resource: ResourceId,
    state: AggregateState,
    complete: bool,
    engine: Option<String>,
    components: Vec<SubComponentStatus>,
}

impl RawStatusBuilder {
    /// Create a new builder. The state defaults to `Unknown`.
    pub fn new(resource: impl Into<ResourceId>) -> Self {
        Self {
            resource: resource.into(),
            state: AggregateState::Unknown,
            complete: false,
            engine: None,
            components: Vec::new(),
        }
    }

    /// Set the aggregate state.
    pub fn state(mut self, state: AggregateState) -> Self {
        self.state = state;
        self
    }

    /// Set the processing-complete flag.
    pub fn complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    /// Set the graph engine the resource is bound to.
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Add a component configured by a closure.
    pub fn component<F>(mut self, id: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(SubComponentBuilder) -> SubComponentBuilder,
    {
        self.components.push(f(SubComponentBuilder::new(id)).build());
        self
    }

    /// Add a pre-built component.
    pub fn component_status(mut self, component: SubComponentStatus) -> Self {
        self.components.push(component);
        self
    }

    /// Build the status.
    pub fn build(self) -> RawStatus {
        RawStatus {
            resource: self.resource,
            state: self.state,
            complete: self.complete,
            engine: self.engine,
            components: self.components,
        }
    }
}

/// Builder for `SubComponentStatus`.
#[derive(Debug)]
pub struct SubComponentBuilder {
    inner: SubComponentStatus,
}

impl SubComponentBuilder {
    /// Create a builder for an enabled, clean component.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            inner: SubComponentStatus::new(id),
        }
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.inner.title = Some(title.into());
        self
    }

    /// Set the enabled flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.inner.enabled = enabled;
        self
    }

    /// Set the dirty flag.
    pub fn dirty(mut self, dirty: bool) -> Self {
        self.inner.dirty = dirty;
        self
    }

    /// Set the error text.
    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.inner.error = Some(error.into());
        self
    }

    /// Add a child configured by a closure.
    pub fn child<F>(mut self, id: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(SubComponentBuilder) -> SubComponentBuilder,
    {
        self.inner.children.push(f(SubComponentBuilder::new(id)).build());
        self
    }

    /// Build the component.
    pub fn build(self) -> SubComponentStatus {
        self.inner
    }
}
