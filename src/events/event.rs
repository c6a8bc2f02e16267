//! # Supervisor events.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Node events**: one endpoint was lost, recovered, or changed behind our back
//! - **Aggregate events**: the derived fleet state moved, degraded, or became ready
//! - **Command events**: operator requests accepted or rejected, link faults
//! - **Runtime events**: reconfiguration, shutdown, subscriber health
//!
//! The [`Event`] struct carries optional metadata such as the node identity,
//! command, and a `from -> to` state pair.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events produced by one supervisor are published from its single loop, so `seq`
//! order equals causal order for that supervisor.
//!
//! ## Example
//! ```rust
//! use fleetvisor::{Event, EventKind, NodeState};
//!
//! let ev = Event::new(EventKind::StateChangedExternally)
//!     .with_node("hv-07")
//!     .with_transition(NodeState::Peak, NodeState::Error);
//!
//! assert_eq!(ev.kind, EventKind::StateChangedExternally);
//! assert_eq!(ev.node.as_deref(), Some("hv-07"));
//! assert_eq!(ev.to, Some(NodeState::Error));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::nodes::{Command, NodeState};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Node events ===
    /// A node in `Unknown` answered a live-state query again.
    ///
    /// Sets: `node`, `from` (= Unknown), `to` (queried state)
    NodeRecovered,

    /// A node stopped answering (failed send or failed query).
    ///
    /// Sets: `node`, `from` (last known state), `reason`, optionally `command`
    NodeLost,

    /// A live query disagreed with the last known state; the live value won.
    ///
    /// Sets: `node`, `from`, `to`
    StateChangedExternally,

    // === Aggregate events ===
    /// The aggregate state changed.
    ///
    /// Sets: `from`, `to`
    AggregateTransitioned,

    /// The aggregate entered `Error`. Emitted once per entry, not per tick.
    ///
    /// Sets: `from`, `reason`
    Degraded,

    /// The load sequence brought every enabled node to its target.
    ///
    /// Sets: `to` (target)
    Ready,

    /// The load sequence was aborted by a node in `Error`/`Unknown`.
    ///
    /// Sets: `node`, `from` (blocking node state), `to` (abandoned target)
    OrchestrationError,

    /// A load sequence was started.
    ///
    /// Sets: `to` (target)
    LoadStarted,

    // === Command events ===
    /// A command passed validation and was dispatched.
    ///
    /// Sets: `command`, `from` (aggregate before), `to` (demanded state)
    CommandAccepted,

    /// A command failed validation.
    ///
    /// Sets: `command`, `from` (aggregate), `reason`
    CommandRejected,

    /// The messaging layer raised a transport fault; dispatch is disarmed.
    ///
    /// Sets: `node`, `command`, `reason`
    LinkFault,

    /// An operator re-armed dispatch after a link fault.
    DispatchRearmed,

    // === Runtime events ===
    /// The node set was reloaded.
    ///
    /// Sets: `reason` (summary `added=.. removed=.. kept=..`)
    Reconfigured,

    /// Shutdown requested (OS signal or cancellation).
    ShutdownRequested,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `node` (subscriber name), `reason`
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `node` (subscriber name), `reason`
    SubscriberPanicked,
}

impl EventKind {
    /// Short stable label (snake_case) for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::NodeRecovered => "node_recovered",
            EventKind::NodeLost => "node_lost",
            EventKind::StateChangedExternally => "state_changed_externally",
            EventKind::AggregateTransitioned => "aggregate_transitioned",
            EventKind::Degraded => "degraded",
            EventKind::Ready => "ready",
            EventKind::OrchestrationError => "orchestration_error",
            EventKind::LoadStarted => "load_started",
            EventKind::CommandAccepted => "command_accepted",
            EventKind::CommandRejected => "command_rejected",
            EventKind::LinkFault => "link_fault",
            EventKind::DispatchRearmed => "dispatch_rearmed",
            EventKind::Reconfigured => "reconfigured",
            EventKind::ShutdownRequested => "shutdown_requested",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::SubscriberPanicked => "subscriber_panicked",
        }
    }
}

/// Supervisor event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Node identity (or subscriber name for subscriber events).
    pub node: Option<Arc<str>>,
    /// Command involved, if any.
    pub command: Option<Command>,
    /// State before the change.
    pub from: Option<NodeState>,
    /// State after the change (or the target).
    pub to: Option<NodeState>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            node: None,
            command: None,
            from: None,
            to: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_node(mut self, node: impl Into<Arc<str>>) -> Self {
        self.node = Some(node.into());
        self
    }

    #[inline]
    pub fn with_command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    #[inline]
    pub fn with_from(mut self, state: NodeState) -> Self {
        self.from = Some(state);
        self
    }

    #[inline]
    pub fn with_to(mut self, state: NodeState) -> Self {
        self.to = Some(state);
        self
    }

    /// Attaches a `from -> to` state pair.
    #[inline]
    pub fn with_transition(self, from: NodeState, to: NodeState) -> Self {
        self.with_from(from).with_to(to)
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_node(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_node(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::Ready);
        let b = Event::new(EventKind::Ready);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_fill_fields() {
        let ev = Event::new(EventKind::CommandRejected)
            .with_command(Command::Peak)
            .with_from(NodeState::Off)
            .with_reason("precondition");
        assert_eq!(ev.command, Some(Command::Peak));
        assert_eq!(ev.from, Some(NodeState::Off));
        assert_eq!(ev.to, None);
        assert_eq!(ev.reason.as_deref(), Some("precondition"));
        assert!(!ev.is_subscriber_event());
        assert!(Event::subscriber_overflow("log", "full").is_subscriber_event());
    }
}
