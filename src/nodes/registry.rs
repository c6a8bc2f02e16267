//! # NodeRegistry: ordered, identity-indexed set of endpoints.
//!
//! The registry keeps nodes in insertion order (the order endpoints are
//! switched on) and an identity index for constant-time lookup.
//!
//! ## Rules
//! - Identities are unique; inserting a duplicate fails.
//! - [`Direction::Forward`] visits nodes in insertion order, [`Direction::Reverse`]
//!   visits exactly the reverse. Enable/disable toggles never reorder.
//! - [`NodeRegistry::merge`] keeps the last known state of every surviving
//!   identity; new identities start as `Unknown`.
//! - No locking: the registry is owned by the single supervisory loop.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::node::{Node, NodeDescriptor};
use super::state::NodeState;

/// Visiting order for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Registry order (start-up).
    Forward,
    /// Reverse registry order (shutdown).
    Reverse,
}

/// Registry mutation errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Identity already present.
    #[error("duplicate node identity '{identity}'")]
    Duplicate { identity: String },

    /// Identity not present.
    #[error("unknown node '{identity}'")]
    NotFound { identity: String },
}

/// Outcome of [`NodeRegistry::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Identities that were not registered before.
    pub added: Vec<String>,
    /// Identities dropped because the new node set no longer lists them.
    pub removed: Vec<String>,
    /// Identities that kept their last known state.
    pub kept: Vec<String>,
}

/// Ordered mapping `identity -> Node`.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from descriptors, preserving their order.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = NodeDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut reg = Self::new();
        for d in descriptors {
            reg.insert(Node::from(d))?;
        }
        Ok(reg)
    }

    /// Appends a node at the end of the order.
    pub fn insert(&mut self, node: Node) -> Result<(), RegistryError> {
        if self.index.contains_key(node.identity()) {
            return Err(RegistryError::Duplicate {
                identity: node.identity().to_string(),
            });
        }
        self.index.insert(node.identity().to_string(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn get(&self, identity: &str) -> Option<&Node> {
        self.index.get(identity).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains_key(identity)
    }

    /// Nodes in registry order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Enabled nodes in registry order.
    pub fn enabled(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.enabled())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Identities of enabled nodes in the given direction.
    pub fn order(&self, direction: Direction) -> Vec<Arc<str>> {
        self.order_where(direction, |_| true)
    }

    /// Like [`order`](Self::order), keeping only nodes for which `select` holds.
    pub fn order_where<F>(&self, direction: Direction, select: F) -> Vec<Arc<str>>
    where
        F: Fn(&Node) -> bool,
    {
        let ids = self
            .enabled()
            .filter(|n| select(n))
            .map(|n| Arc::<str>::from(n.identity()));
        match direction {
            Direction::Forward => ids.collect(),
            Direction::Reverse => ids.rev().collect(),
        }
    }

    /// Enables or disables a node. Its state is left as is.
    pub fn set_enabled(&mut self, identity: &str, enabled: bool) -> Result<(), RegistryError> {
        let node = self.node_mut(identity)?;
        node.set_enabled(enabled);
        Ok(())
    }

    /// Replaces the node set, keeping the state of surviving identities.
    ///
    /// The registry adopts the order of `descriptors`. On error the registry
    /// is left untouched.
    pub fn merge(
        &mut self,
        descriptors: impl IntoIterator<Item = NodeDescriptor>,
    ) -> Result<MergeSummary, RegistryError> {
        let mut next = NodeRegistry::new();
        let mut summary = MergeSummary::default();

        for d in descriptors {
            let node = match self.get(&d.identity) {
                Some(prev) => {
                    let mut node = prev.clone();
                    node.set_enabled(d.enabled);
                    node.set_config_ref(d.config_ref);
                    summary.kept.push(node.identity().to_string());
                    node
                }
                None => {
                    summary.added.push(d.identity.clone());
                    Node::from(d)
                }
            };
            next.insert(node)?;
        }

        summary.removed = self
            .nodes
            .iter()
            .filter(|n| !next.contains(n.identity()))
            .map(|n| n.identity().to_string())
            .collect();

        *self = next;
        Ok(summary)
    }

    pub(crate) fn set_state(&mut self, identity: &str, state: NodeState) -> Option<NodeState> {
        let node = self.node_mut(identity).ok()?;
        let prev = node.state();
        node.set_state(state);
        Some(prev)
    }

    fn node_mut(&mut self, identity: &str) -> Result<&mut Node, RegistryError> {
        match self.index.get(identity) {
            Some(&i) => Ok(&mut self.nodes[i]),
            None => Err(RegistryError::NotFound {
                identity: identity.to_string(),
            }),
        }
    }
}
