//! # Messaging collaborator: the link to the endpoints.
//!
//! [`Link`] is the seam between the supervisor and whatever transport talks to
//! the hardware controllers. The supervisor only needs two operations:
//! ```text
//! send(node, command, payload) -> Ok(()) | Err(LinkError)
//! query(node)                  -> Ok(NodeState) | Err(LinkError)
//! ```
//!
//! ## Rules
//! - Implementations may use concurrent I/O internally; the supervisor awaits
//!   completions on its own loop, so node state updates stay linearizable.
//! - The supervisor bounds every call with its own timeout
//!   ([`Config::send_timeout`](crate::Config::send_timeout),
//!   [`Config::query_timeout`](crate::Config::query_timeout)); an implementation
//!   that never answers is reported as [`LinkError::Timeout`].
//! - Ordinary failures are plain data ([`LinkError`]), never panics.
//! - [`LinkError::Fault`] means the transport itself is broken. The
//!   dispatch path stops and disarms on it.
//!
//! [`MemoryLink`] is an in-process simulated fleet for tests and demos.

mod memory;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::nodes::{Command, NodeState};

pub use memory::MemoryLink;

/// Failure of one send or query.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// No reply within the bound.
    #[error("no reply within {timeout:?}")]
    Timeout {
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// Endpoint not reachable (no route, not registered on the bus, ...).
    #[error("unreachable: {reason}")]
    Unreachable {
        /// Transport detail.
        reason: String,
    },

    /// Endpoint answered with a negative acknowledgement.
    #[error("refused: {reason}")]
    Refused {
        /// Reason given by the endpoint.
        reason: String,
    },

    /// Protocol-level fault of the messaging layer itself.
    #[error("link fault: {reason}")]
    Fault {
        /// Fault description.
        reason: String,
    },
}

impl LinkError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LinkError::Timeout { .. } => "link_timeout",
            LinkError::Unreachable { .. } => "link_unreachable",
            LinkError::Refused { .. } => "link_refused",
            LinkError::Fault { .. } => "link_fault",
        }
    }

    /// True for transport-level faults (as opposed to a single missed reply).
    pub fn is_fault(&self) -> bool {
        matches!(self, LinkError::Fault { .. })
    }
}

/// Outbound messaging to the endpoints.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use fleetvisor::{Command, Link, LinkError, NodeState};
///
/// struct AlwaysOff;
///
/// #[async_trait]
/// impl Link for AlwaysOff {
///     async fn send(&self, _node: &str, _cmd: Command, _payload: Option<&str>) -> Result<(), LinkError> {
///         Ok(())
///     }
///     async fn query(&self, _node: &str) -> Result<NodeState, LinkError> {
///         Ok(NodeState::Off)
///     }
/// }
/// ```
#[async_trait]
pub trait Link: Send + Sync + 'static {
    /// Delivers `command` (with an optional payload) to one endpoint.
    async fn send(&self, node: &str, command: Command, payload: Option<&str>)
    -> Result<(), LinkError>;

    /// Reads the live state of one endpoint.
    async fn query(&self, node: &str) -> Result<NodeState, LinkError>;
}

/// `send` bounded by `timeout`; an elapsed bound becomes [`LinkError::Timeout`].
pub(crate) async fn send_bounded(
    link: &dyn Link,
    node: &str,
    command: Command,
    payload: Option<&str>,
    timeout: Duration,
) -> Result<(), LinkError> {
    match tokio::time::timeout(timeout, link.send(node, command, payload)).await {
        Ok(res) => res,
        Err(_elapsed) => Err(LinkError::Timeout { timeout }),
    }
}

/// `query` bounded by `timeout`; an elapsed bound becomes [`LinkError::Timeout`].
pub(crate) async fn query_bounded(
    link: &dyn Link,
    node: &str,
    timeout: Duration,
) -> Result<NodeState, LinkError> {
    match tokio::time::timeout(timeout, link.query(node)).await {
        Ok(res) => res,
        Err(_elapsed) => Err(LinkError::Timeout { timeout }),
    }
}
