use crate::nodes::{Command, NodeState};

/// Predicate on the aggregate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Accepted in every aggregate state.
    Any,
    /// Accepted only in the listed states.
    OneOf(&'static [NodeState]),
}

impl Precondition {
    #[inline]
    pub fn holds(&self, aggregate: NodeState) -> bool {
        match self {
            Precondition::Any => true,
            Precondition::OneOf(states) => states.contains(&aggregate),
        }
    }
}

/// One row of the command catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub command: Command,
    /// Aggregate state the command asks for.
    pub demand: NodeState,
    pub precondition: Precondition,
    /// `(from, to)` pairs applied to a node after a successful send.
    pub transitions: &'static [(NodeState, NodeState)],
}

impl CatalogEntry {
    /// Transitional state reached from `state`, or `Unknown` when no row applies.
    pub fn next(&self, state: NodeState) -> NodeState {
        self.transitions
            .iter()
            .find(|(from, _)| *from == state)
            .map(|(_, to)| *to)
            .unwrap_or(NodeState::Unknown)
    }
}
