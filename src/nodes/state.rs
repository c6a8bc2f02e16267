//! # Node states and operator commands.
//!
//! [`NodeState`] covers both what a single endpoint reports and the aggregate
//! the supervisor derives from all of them. [`Command`] is the closed set of
//! operator requests understood by every endpoint.
//!
//! ## State ladder
//! ```text
//!   Off ──TurnOn──► TurningOn ──► Standby ──Shoulder/Peak──► RampingUp ──► Shoulder / Peak
//!    ▲                               │ ▲                                      │
//!    └──────── TurningOff ◄──TurnOff─┘ └────────── RampingDown ◄──Standby─────┘
//!
//!   Unknown : no trustworthy reading (never queried, or unreachable)
//!   Error   : the endpoint reported a fault
//! ```
//!
//! ## Ordering
//! Only stable states are ordered: `Off < Standby < Shoulder < Peak`.
//! `partial_cmp` returns `None` whenever a transitional state, `Unknown` or
//! `Error` is compared against a different state.

use std::cmp::Ordering;
use std::fmt;

/// State of one endpoint, or of the whole fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// No trustworthy reading.
    Unknown,
    /// Output disabled.
    Off,
    /// Switching on, heading for `Standby`.
    TurningOn,
    /// Switching off, heading for `Off`.
    TurningOff,
    /// Powered at the standby level.
    Standby,
    /// Ramping towards a higher stable level.
    RampingUp,
    /// Ramping towards a lower stable level.
    RampingDown,
    /// Powered at the intermediate level.
    Shoulder,
    /// Powered at the operating level.
    Peak,
    /// The endpoint reported a fault.
    Error,
}

impl NodeState {
    /// All stable states, lowest first.
    pub const STABLE: [NodeState; 4] = [
        NodeState::Off,
        NodeState::Standby,
        NodeState::Shoulder,
        NodeState::Peak,
    ];

    /// Position on the stable ladder (`Off = 0` .. `Peak = 3`).
    ///
    /// Returns `None` for transitional states, `Unknown` and `Error`.
    #[inline]
    pub fn rank(self) -> Option<u8> {
        match self {
            NodeState::Off => Some(0),
            NodeState::Standby => Some(1),
            NodeState::Shoulder => Some(2),
            NodeState::Peak => Some(3),
            _ => None,
        }
    }

    /// True for `Off`, `Standby`, `Shoulder` and `Peak`.
    #[inline]
    pub fn is_stable(self) -> bool {
        self.rank().is_some()
    }

    /// True for the short-lived states between two stable ones.
    #[inline]
    pub fn is_transitional(self) -> bool {
        matches!(
            self,
            NodeState::TurningOn
                | NodeState::TurningOff
                | NodeState::RampingUp
                | NodeState::RampingDown
        )
    }

    /// True for `Unknown` and `Error`: states that block readiness.
    #[inline]
    pub fn is_faulted(self) -> bool {
        matches!(self, NodeState::Unknown | NodeState::Error)
    }

    /// Short stable label (snake_case) for logs, attributes and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeState::Unknown => "unknown",
            NodeState::Off => "off",
            NodeState::TurningOn => "turning_on",
            NodeState::TurningOff => "turning_off",
            NodeState::Standby => "standby",
            NodeState::RampingUp => "ramping_up",
            NodeState::RampingDown => "ramping_down",
            NodeState::Shoulder => "shoulder",
            NodeState::Peak => "peak",
            NodeState::Error => "error",
        }
    }
}

impl PartialOrd for NodeState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator command understood by every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Load the endpoint's settings (payload or the node's `config_ref`).
    Configure,
    /// Switch the output on; the endpoint settles at `Standby`.
    TurnOn,
    /// Switch the output off.
    TurnOff,
    /// Go to the standby level.
    Standby,
    /// Go to the intermediate level.
    Shoulder,
    /// Go to the operating level.
    Peak,
    /// Clear faults and return to `Off`.
    Recover,
}

impl Command {
    /// Every command, in declaration order.
    pub const ALL: [Command; 7] = [
        Command::Configure,
        Command::TurnOn,
        Command::TurnOff,
        Command::Standby,
        Command::Shoulder,
        Command::Peak,
        Command::Recover,
    ];

    /// Command that moves a powered endpoint to the given stable level.
    ///
    /// `Off` maps to [`Command::TurnOff`]; non-stable states have no level command.
    pub fn for_level(level: NodeState) -> Option<Command> {
        match level {
            NodeState::Off => Some(Command::TurnOff),
            NodeState::Standby => Some(Command::Standby),
            NodeState::Shoulder => Some(Command::Shoulder),
            NodeState::Peak => Some(Command::Peak),
            _ => None,
        }
    }

    /// Short stable label (snake_case) for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Configure => "configure",
            Command::TurnOn => "turn_on",
            Command::TurnOff => "turn_off",
            Command::Standby => "standby",
            Command::Shoulder => "shoulder",
            Command::Peak => "peak",
            Command::Recover => "recover",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
