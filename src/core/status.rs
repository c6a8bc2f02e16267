//! # Status snapshots.
//!
//! [`Status`] is the read-only view the supervisor publishes on a
//! `tokio::sync::watch` channel after every state-affecting step. It can be
//! flattened into named attributes for telemetry/GUI layers:
//!
//! ```text
//! aggregate.state    = "peak"
//! aggregate.demand   = "peak"
//! aggregate.loading  = "false"
//! aggregate.target   = "peak"
//! dispatch.armed     = "true"
//! node.hv-01.state   = "peak"
//! node.hv-01.enabled = "true"
//! ```

use crate::nodes::NodeState;

/// Per-node part of a [`Status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub identity: String,
    pub enabled: bool,
    pub state: NodeState,
}

/// Snapshot of one supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub aggregate: NodeState,
    pub demand: Option<NodeState>,
    pub loading: bool,
    pub target: Option<NodeState>,
    /// False after a link fault until re-armed.
    pub armed: bool,
    /// Nodes in registry order.
    pub nodes: Vec<NodeStatus>,
}

impl Status {
    /// Looks up one node by identity.
    pub fn node(&self, identity: &str) -> Option<&NodeStatus> {
        self.nodes.iter().find(|n| n.identity == identity)
    }

    /// Flattens the snapshot into `(name, value)` attributes.
    pub fn attributes(&self) -> Vec<(String, String)> {
        fn opt(s: Option<NodeState>) -> String {
            s.map(|s| s.as_str().to_string()).unwrap_or_default()
        }

        let mut out = Vec::with_capacity(5 + 2 * self.nodes.len());
        out.push(("aggregate.state".into(), self.aggregate.as_str().into()));
        out.push(("aggregate.demand".into(), opt(self.demand)));
        out.push(("aggregate.loading".into(), self.loading.to_string()));
        out.push(("aggregate.target".into(), opt(self.target)));
        out.push(("dispatch.armed".into(), self.armed.to_string()));
        for n in &self.nodes {
            out.push((format!("node.{}.state", n.identity), n.state.as_str().into()));
            out.push((format!("node.{}.enabled", n.identity), n.enabled.to_string()));
        }
        out
    }
}
