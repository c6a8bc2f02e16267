//! Error types used by the fleetvisor control path.
//!
//! This module defines [`ControlError`], the error returned by every
//! operator-facing operation (submit, load, reconfigure, ...).
//!
//! Per-node communication failures are **not** errors of the control path:
//! they are recorded on the node and in [`DispatchReport`](crate::DispatchReport)
//! as [`LinkError`] values, and surfaced as events. Only cross-cutting failures
//! (`LinkFault`, `Orchestration`) stop a higher-level sequence.
//!
//! Like the other error enums of the crate, [`ControlError`] provides
//! [`as_label`](ControlError::as_label) for logs/metrics.

use thiserror::Error;

use crate::link::LinkError;
use crate::nodes::{Command, NodeState, RegistryError};
use crate::store::ConfigError;

/// # Errors produced by the supervisory control path.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// The command's precondition does not hold for the current aggregate.
    ///
    /// Recoverable: resubmit once the aggregate has moved.
    #[error("command {command} rejected in aggregate state {state}")]
    CommandRejected {
        /// Rejected command.
        command: Command,
        /// Aggregate at the time of rejection.
        state: NodeState,
    },

    /// The command is not registered in the catalog.
    #[error("command {command} is not registered")]
    InvalidCommand {
        /// Unregistered command.
        command: Command,
    },

    /// One node could not be reached while sending a command.
    #[error("send to '{node}' failed: {source}")]
    SendFailure {
        /// Node identity.
        node: String,
        /// Underlying link failure.
        source: LinkError,
    },

    /// A node was Error/Unknown during the load sequence; the ramp was aborted.
    #[error("load sequence aborted: node '{node}' is {state}")]
    Orchestration {
        /// First blocking node in registry order.
        node: String,
        /// Its state.
        state: NodeState,
    },

    /// The messaging layer raised a transport-level fault; dispatch is disarmed
    /// until an operator re-arms it.
    #[error("link fault on '{node}': {reason}; dispatch disarmed")]
    LinkFault {
        /// Node on which the fault was observed.
        node: String,
        /// Fault description.
        reason: String,
    },

    /// Load target is not a powered stable state.
    #[error("invalid load target {state}")]
    InvalidTarget {
        /// Requested target.
        state: NodeState,
    },

    /// Node set or node toggle error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Node set could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The supervisory loop is gone.
    #[error("supervisor closed")]
    Closed,
}

impl ControlError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use fleetvisor::{Command, ControlError, NodeState};
    ///
    /// let err = ControlError::CommandRejected { command: Command::Peak, state: NodeState::Off };
    /// assert_eq!(err.as_label(), "command_rejected");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ControlError::CommandRejected { .. } => "command_rejected",
            ControlError::InvalidCommand { .. } => "invalid_command",
            ControlError::SendFailure { .. } => "send_failure",
            ControlError::Orchestration { .. } => "orchestration_error",
            ControlError::LinkFault { .. } => "link_fault",
            ControlError::InvalidTarget { .. } => "invalid_target",
            ControlError::Registry(_) => "registry_error",
            ControlError::Config(_) => "config_error",
            ControlError::Closed => "closed",
        }
    }

    /// Indicates whether resubmitting later may succeed without operator action.
    ///
    /// `LinkFault` and `Orchestration` need an operator (re-arm / Recover).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ControlError::CommandRejected { .. } | ControlError::SendFailure { .. }
        )
    }
}
