//! # CommandCatalog: table-driven command semantics.
//!
//! For every registered [`Command`] the catalog answers three questions:
//! - **demand**: which aggregate state the command asks for;
//! - **precondition**: whether the command may be accepted in the current aggregate;
//! - **next_transitional**: which state a node is optimistically moved to right
//!   after a successful send.
//!
//! ## Standard table
//! ```text
//! command    demand    accepted when aggregate is   node transitions
//! ---------  --------  ---------------------------  -----------------------------------------
//! Configure  Off       Unknown, Off                 (none)
//! TurnOn     Standby   Off                          Off -> TurningOn
//! TurnOff    Off       Standby, Shoulder, Peak      Standby|Shoulder|Peak -> TurningOff
//! Standby    Standby   Shoulder, Peak               Shoulder|Peak -> RampingDown
//! Shoulder   Shoulder  Standby, Peak                Standby -> RampingUp, Peak -> RampingDown
//! Peak       Peak      Standby, Shoulder            Standby|Shoulder -> RampingUp
//! Recover    Off       any                          every powered/faulted state -> TurningOff
//! ```
//!
//! `next_transitional` returns [`NodeState::Unknown`] when no row applies; the
//! caller must then leave the node's state unchanged.

mod entry;

use std::collections::HashMap;

use crate::error::ControlError;
use crate::nodes::{Command, NodeState};

pub use entry::{CatalogEntry, Precondition};

use NodeState::{
    Error, Off, Peak, RampingDown, RampingUp, Shoulder, Standby, TurningOff, TurningOn, Unknown,
};

const STANDARD: [CatalogEntry; 7] = [
    CatalogEntry {
        command: Command::Configure,
        demand: Off,
        precondition: Precondition::OneOf(&[Unknown, Off]),
        transitions: &[],
    },
    CatalogEntry {
        command: Command::TurnOn,
        demand: Standby,
        precondition: Precondition::OneOf(&[Off]),
        transitions: &[(Off, TurningOn)],
    },
    CatalogEntry {
        command: Command::TurnOff,
        demand: Off,
        precondition: Precondition::OneOf(&[Standby, Shoulder, Peak]),
        transitions: &[
            (Standby, TurningOff),
            (Shoulder, TurningOff),
            (Peak, TurningOff),
        ],
    },
    CatalogEntry {
        command: Command::Standby,
        demand: Standby,
        precondition: Precondition::OneOf(&[Shoulder, Peak]),
        transitions: &[(Shoulder, RampingDown), (Peak, RampingDown)],
    },
    CatalogEntry {
        command: Command::Shoulder,
        demand: Shoulder,
        precondition: Precondition::OneOf(&[Standby, Peak]),
        transitions: &[(Standby, RampingUp), (Peak, RampingDown)],
    },
    CatalogEntry {
        command: Command::Peak,
        demand: Peak,
        precondition: Precondition::OneOf(&[Standby, Shoulder]),
        transitions: &[(Standby, RampingUp), (Shoulder, RampingUp)],
    },
    CatalogEntry {
        command: Command::Recover,
        demand: Off,
        precondition: Precondition::Any,
        transitions: &[
            (Error, TurningOff),
            (Standby, TurningOff),
            (Shoulder, TurningOff),
            (Peak, TurningOff),
            (TurningOn, TurningOff),
            (RampingUp, TurningOff),
            (RampingDown, TurningOff),
        ],
    },
];

/// Lookup table `Command -> CatalogEntry`.
#[derive(Debug, Clone)]
pub struct CommandCatalog {
    entries: HashMap<Command, CatalogEntry>,
}

impl CommandCatalog {
    /// Catalog with every command of the standard table.
    pub fn standard() -> Self {
        Self::from_entries(STANDARD)
    }

    /// Empty catalog; register entries with [`register`](Self::register).
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Builds a catalog from explicit entries (later entries win).
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut cat = Self::empty();
        for e in entries {
            cat.register(e);
        }
        cat
    }

    /// Registers or replaces the entry of `entry.command`.
    pub fn register(&mut self, entry: CatalogEntry) -> &mut Self {
        self.entries.insert(entry.command, entry);
        self
    }

    /// Full entry of a command.
    pub fn entry(&self, command: Command) -> Result<&CatalogEntry, ControlError> {
        self.entries
            .get(&command)
            .ok_or(ControlError::InvalidCommand { command })
    }

    /// Aggregate state demanded by `command`.
    pub fn demand(&self, command: Command) -> Result<NodeState, ControlError> {
        Ok(self.entry(command)?.demand)
    }

    /// Whether `command` may be accepted while the aggregate is `aggregate`.
    pub fn precondition(&self, command: Command, aggregate: NodeState) -> Result<bool, ControlError> {
        Ok(self.entry(command)?.precondition.holds(aggregate))
    }

    /// Optimistic state of a node after `command` was sent successfully.
    ///
    /// Returns [`NodeState::Unknown`] when the command does not apply from `state`.
    pub fn next_transitional(
        &self,
        state: NodeState,
        command: Command,
    ) -> Result<NodeState, ControlError> {
        Ok(self.entry(command)?.next(state))
    }

    pub fn contains(&self, command: Command) -> bool {
        self.entries.contains_key(&command)
    }
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [NodeState; 10] = [
        Unknown,
        Off,
        TurningOn,
        TurningOff,
        Standby,
        RampingUp,
        RampingDown,
        Shoulder,
        Peak,
        Error,
    ];

    #[test]
    fn examples_from_the_ladder() {
        let cat = CommandCatalog::standard();
        assert_eq!(cat.next_transitional(Off, Command::TurnOn).unwrap(), TurningOn);
        assert_eq!(cat.next_transitional(Standby, Command::Peak).unwrap(), RampingUp);
        assert_eq!(cat.next_transitional(Peak, Command::Standby).unwrap(), RampingDown);
        assert_eq!(cat.next_transitional(Peak, Command::TurnOn).unwrap(), Unknown);
        assert_eq!(cat.next_transitional(Off, Command::Configure).unwrap(), Unknown);
    }

    #[test]
    fn transitions_only_yield_transitional_or_unknown() {
        let cat = CommandCatalog::standard();
        for cmd in Command::ALL {
            for s in ALL_STATES {
                let next = cat.next_transitional(s, cmd).unwrap();
                assert!(
                    next == Unknown || next.is_transitional(),
                    "{cmd} from {s} -> {next}"
                );
            }
        }
    }

    #[test]
    fn recover_is_always_accepted_and_demands_off() {
        let cat = CommandCatalog::standard();
        for s in ALL_STATES {
            assert!(cat.precondition(Command::Recover, s).unwrap());
        }
        assert_eq!(cat.demand(Command::Recover).unwrap(), Off);
    }

    #[test]
    fn transitional_aggregate_only_accepts_recover() {
        let cat = CommandCatalog::standard();
        for cmd in Command::ALL {
            let ok = cat.precondition(cmd, RampingUp).unwrap();
            assert_eq!(ok, cmd == Command::Recover, "{cmd}");
        }
    }

    #[test]
    fn unregistered_command_is_invalid() {
        let mut cat = CommandCatalog::empty();
        cat.register(STANDARD[1]);
        assert!(cat.contains(Command::TurnOn));
        assert_eq!(
            cat.demand(Command::Peak),
            Err(ControlError::InvalidCommand {
                command: Command::Peak
            })
        );
        assert!(matches!(
            cat.next_transitional(Off, Command::Recover),
            Err(ControlError::InvalidCommand { .. })
        ));
    }
}
