//! Managed endpoints and the descriptors they are configured from.

use serde::Deserialize;

use super::state::NodeState;

/// One managed endpoint.
///
/// The state field is only written by the dispatch path (optimistic) and the
/// reconcile path (authoritative); outside the crate it is read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    identity: String,
    enabled: bool,
    state: NodeState,
    config_ref: String,
}

impl Node {
    /// Creates an enabled node in [`NodeState::Unknown`].
    pub fn new(identity: impl Into<String>, config_ref: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            enabled: true,
            state: NodeState::Unknown,
            config_ref: config_ref.into(),
        }
    }

    /// Sets the initial enabled flag.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Unique identity of the endpoint.
    #[inline]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Disabled nodes are skipped by dispatch, reconcile and aggregation.
    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Last known state.
    #[inline]
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Reference to the settings loaded on `Configure`.
    #[inline]
    pub fn config_ref(&self) -> &str {
        &self.config_ref
    }

    pub(crate) fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_config_ref(&mut self, config_ref: String) {
        self.config_ref = config_ref;
    }
}

impl From<NodeDescriptor> for Node {
    fn from(d: NodeDescriptor) -> Self {
        Node::new(d.identity, d.config_ref).with_enabled(d.enabled)
    }
}

/// Node entry as produced by a [`ConfigStore`](crate::ConfigStore).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeDescriptor {
    /// Unique identity of the endpoint.
    pub identity: String,
    /// Whether the node takes part in dispatch and aggregation.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Settings reference sent on `Configure`.
    #[serde(default)]
    pub config_ref: String,
}

fn enabled_by_default() -> bool {
    true
}

impl NodeDescriptor {
    pub fn new(identity: impl Into<String>, config_ref: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            enabled: true,
            config_ref: config_ref.into(),
        }
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
