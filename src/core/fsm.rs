//! # SupervisorFsm: the aggregate state machine.
//!
//! Holds the supervisor-level view of the fleet:
//! - `aggregate`: derived state of all enabled nodes (see [`Monitor`](super::monitor::Monitor))
//! - `demand`: state asked for by the last accepted command
//! - `loading` / `target`: progress of a staged load sequence
//!
//! ```text
//!                    submit(cmd) ─► precondition(cmd, aggregate)?
//!                                        │ no  → CommandRejected
//!                                        │ yes
//!                                        ▼
//!        demand = demand(cmd); aggregate = next_transitional(aggregate, cmd) or unchanged
//!
//!   Unknown ──Configure──► Off ──TurnOn──► Standby ◄──► Shoulder ◄──► Peak
//!      ▲                    ▲                  │            │           │
//!      │                    └──── TurnOff / Recover ────────┴───────────┘
//!      └── any node Error/Unknown ──► Error ──Recover, then reconcile──► Off
//! ```
//!
//! Accepting a command never moves a faulted aggregate; only
//! [`set_aggregate`](SupervisorFsm::set_aggregate) (reconciliation, escalation) does.
//!
//! Created with `aggregate = Unknown`; lives for the process lifetime; no
//! terminal state.

use crate::catalog::{CatalogEntry, CommandCatalog};
use crate::error::ControlError;
use crate::nodes::{Command, NodeState};

/// Aggregate state, demand, and load progress of one supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorFsm {
    aggregate: NodeState,
    demand: Option<NodeState>,
    loading: bool,
    target: Option<NodeState>,
}

impl Default for SupervisorFsm {
    fn default() -> Self {
        Self::new()
    }
}

impl SupervisorFsm {
    pub fn new() -> Self {
        Self {
            aggregate: NodeState::Unknown,
            demand: None,
            loading: false,
            target: None,
        }
    }

    #[inline]
    pub fn aggregate(&self) -> NodeState {
        self.aggregate
    }

    #[inline]
    pub fn demand(&self) -> Option<NodeState> {
        self.demand
    }

    #[inline]
    pub fn loading(&self) -> bool {
        self.loading
    }

    #[inline]
    pub fn target(&self) -> Option<NodeState> {
        self.target
    }

    /// Checks `command` against the catalog and the current aggregate.
    pub fn check(&self, catalog: &CommandCatalog, command: Command) -> Result<CatalogEntry, ControlError> {
        let entry = *catalog.entry(command)?;
        if !entry.precondition.holds(self.aggregate) {
            return Err(ControlError::CommandRejected {
                command,
                state: self.aggregate,
            });
        }
        Ok(entry)
    }

    /// Records an accepted command. Returns the aggregate before the change.
    ///
    /// Any accepted command supersedes a running load sequence. A faulted
    /// aggregate (`Error`, `Unknown`) is left for reconciliation to clear.
    pub(crate) fn accept(&mut self, entry: &CatalogEntry) -> NodeState {
        let before = self.aggregate;
        self.demand = Some(entry.demand);
        self.cancel_load();

        if before.is_faulted() {
            return before;
        }
        let next = entry.next(before);
        if next != NodeState::Unknown {
            self.aggregate = next;
        }
        before
    }

    /// Replaces the aggregate. Returns the previous value.
    pub(crate) fn set_aggregate(&mut self, state: NodeState) -> NodeState {
        std::mem::replace(&mut self.aggregate, state)
    }

    pub(crate) fn begin_load(&mut self, target: NodeState) {
        self.loading = true;
        self.target = Some(target);
        self.demand = Some(target);
    }

    /// Load reached its target.
    pub(crate) fn finish_load(&mut self) {
        self.loading = false;
    }

    /// Load abandoned; the target is dropped.
    pub(crate) fn cancel_load(&mut self) {
        self.loading = false;
        self.target = None;
    }
}
