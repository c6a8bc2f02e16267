//! # Distributor: one command to every enabled node.
//!
//! The distributor walks the enabled nodes in registry order (or exactly
//! reversed), sends the command through the [`Link`] and applies the
//! **optimistic** update: on success the node moves to the transitional state
//! the catalog names, so the supervisor knows a ramp is underway before the
//! endpoint confirms it.
//!
//! ```text
//! for node in order(direction) where enabled && selected:
//!     send(node, command) bounded by send_timeout
//!       ├─ Ok        → state = next_transitional(state, command)   (Unknown ⇒ untouched)
//!       ├─ Err(e)    → state = Unknown, failures += node, degraded = true, continue
//!       └─ Err(Fault)→ state = Unknown, disarm, skipped = rest, stop
//! ```
//!
//! ## Rules
//! - Only transitional states are written here; stable states come from the Monitor.
//! - A single node failure never stops the walk; a transport fault does.
//! - While disarmed every dispatch fails fast with [`ControlError::LinkFault`]
//!   and nothing is sent.
//! - The distributor never touches the aggregate; the supervisor escalates on
//!   a degraded report.

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::CommandCatalog;
use crate::error::ControlError;
use crate::link::{Link, LinkError, send_bounded};
use crate::nodes::{Command, Direction, Node, NodeRegistry, NodeState};

/// One node that could not be reached during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub node: Arc<str>,
    /// State the node had before it was marked Unknown.
    pub previous: NodeState,
    pub error: LinkError,
}

/// Outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub command: Command,
    pub direction: Direction,
    /// Nodes that acknowledged the command, in visiting order.
    pub sent: Vec<Arc<str>>,
    /// Nodes that failed (the faulted node included), in visiting order.
    pub failures: Vec<NodeFailure>,
    /// True when at least one node was marked Unknown.
    pub degraded: bool,
    /// Nodes not visited because of a link fault.
    pub skipped: Vec<Arc<str>>,
    /// The transport fault that stopped the walk.
    pub link_fault: Option<NodeFailure>,
}

impl DispatchReport {
    fn new(command: Command, direction: Direction) -> Self {
        Self {
            command,
            direction,
            sent: Vec::new(),
            failures: Vec::new(),
            degraded: false,
            skipped: Vec::new(),
            link_fault: None,
        }
    }

    /// True when every visited node acknowledged.
    pub fn is_clean(&self) -> bool {
        !self.degraded && self.link_fault.is_none()
    }

    /// Per-node failures as [`ControlError::SendFailure`] values.
    pub fn errors(&self) -> impl Iterator<Item = ControlError> + '_ {
        self.failures.iter().cloned().map(ControlError::from)
    }
}

impl From<NodeFailure> for ControlError {
    fn from(f: NodeFailure) -> Self {
        ControlError::SendFailure {
            node: f.node.to_string(),
            source: f.error,
        }
    }
}

/// Sends commands to enabled nodes and applies optimistic state updates.
pub struct Distributor {
    link: Arc<dyn Link>,
    catalog: Arc<CommandCatalog>,
    send_timeout: Duration,
    /// Set on a transport fault; cleared by [`rearm`](Self::rearm).
    fault: Option<(Arc<str>, String)>,
}

impl Distributor {
    pub fn new(link: Arc<dyn Link>, catalog: Arc<CommandCatalog>, send_timeout: Duration) -> Self {
        Self {
            link,
            catalog,
            send_timeout,
            fault: None,
        }
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.fault.is_none()
    }

    /// Re-enables dispatch after a link fault. Returns `true` if it was disarmed.
    pub fn rearm(&mut self) -> bool {
        self.fault.take().is_some()
    }

    /// The error every dispatch returns while disarmed.
    pub fn disarmed_error(&self) -> Option<ControlError> {
        self.fault.as_ref().map(|(node, reason)| ControlError::LinkFault {
            node: node.to_string(),
            reason: reason.clone(),
        })
    }

    /// Sends `command` to every enabled node in `direction` order.
    ///
    /// `Configure` without a payload sends each node's `config_ref`.
    pub async fn dispatch(
        &mut self,
        command: Command,
        payload: Option<&str>,
        registry: &mut NodeRegistry,
        direction: Direction,
    ) -> Result<DispatchReport, ControlError> {
        self.dispatch_where(command, payload, registry, direction, |_| true)
            .await
    }

    /// Like [`dispatch`](Self::dispatch), restricted to nodes for which `select` holds.
    ///
    /// The selection is evaluated once, before the first send.
    pub async fn dispatch_where<F>(
        &mut self,
        command: Command,
        payload: Option<&str>,
        registry: &mut NodeRegistry,
        direction: Direction,
        select: F,
    ) -> Result<DispatchReport, ControlError>
    where
        F: Fn(&Node) -> bool,
    {
        let entry = *self.catalog.entry(command)?;
        if let Some(err) = self.disarmed_error() {
            return Err(err);
        }

        let order = registry.order_where(direction, select);

        let mut report = DispatchReport::new(command, direction);
        let mut pending = order.into_iter();

        while let Some(id) = pending.next() {
            let Some(node) = registry.get(&id) else {
                continue;
            };
            let previous = node.state();
            let config_ref = node.config_ref().to_string();
            let payload = match (command, payload) {
                (Command::Configure, None) => Some(config_ref.as_str()),
                (_, p) => p,
            };

            match send_bounded(self.link.as_ref(), &id, command, payload, self.send_timeout).await {
                Ok(()) => {
                    let next = entry.next(previous);
                    if next != NodeState::Unknown {
                        registry.set_state(&id, next);
                    }
                    report.sent.push(id);
                }
                Err(error) => {
                    registry.set_state(&id, NodeState::Unknown);
                    report.degraded = true;

                    let failure = NodeFailure {
                        node: Arc::clone(&id),
                        previous,
                        error,
                    };
                    if failure.error.is_fault() {
                        self.fault = Some((Arc::clone(&id), failure.error.to_string()));
                        report.failures.push(failure.clone());
                        report.link_fault = Some(failure);
                        report.skipped = pending.by_ref().collect();
                        break;
                    }
                    report.failures.push(failure);
                }
            }
        }
        Ok(report)
    }
}
