//! # Orchestrator: staged load sequence.
//!
//! Brings every enabled node to one stable target (`Standby`, `Shoulder` or
//! `Peak`) over several supervisor ticks. Each tick the orchestrator looks at
//! the reconciled node states and issues one *round* of commands:
//!
//! ```text
//! any enabled node Error/Unknown ─► abort: OrchestrationError, loading = false
//! every enabled node == target   ─► Ready, aggregate = target, loading = false
//! otherwise one round (forward order):
//!     Off                  → TurnOn
//!     stable, ≠ target     → for_level(target)    (ramps up or down)
//!     transitional         → wait for the endpoint
//! ```
//!
//! ## Rules
//! - `Ready` is never reported while any enabled node differs from the target.
//! - A transport fault during a round abandons the sequence.
//! - When no sequence is running `step` is a no-op returning [`LoadProgress::Idle`].

use crate::error::ControlError;
use crate::events::{Bus, Event, EventKind};
use crate::nodes::{Command, Direction, NodeRegistry, NodeState};

use super::distributor::{DispatchReport, Distributor};
use super::fsm::SupervisorFsm;

/// Outcome of one orchestrator step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadProgress {
    /// Every enabled node reached the target; the sequence is over.
    Ready,
    /// No sequence is running.
    Idle,
    /// One round was dispatched (possibly empty while nodes are ramping).
    Round {
        /// Commands sent this round, in dispatch order.
        commands: Vec<Command>,
        /// One report per command.
        reports: Vec<DispatchReport>,
    },
}

/// Drives the load sequence stored in a [`SupervisorFsm`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Orchestrator;

impl Orchestrator {
    pub fn new() -> Self {
        Self
    }

    /// Level command that ramps a node towards `target`.
    ///
    /// Fails with [`ControlError::InvalidTarget`] unless `target` is a powered stable state.
    pub fn target_command(target: NodeState) -> Result<Command, ControlError> {
        match Command::for_level(target) {
            Some(cmd) if target != NodeState::Off => Ok(cmd),
            _ => Err(ControlError::InvalidTarget { state: target }),
        }
    }

    /// Starts a load sequence towards `target`.
    pub fn start(&self, fsm: &mut SupervisorFsm, target: NodeState) -> Result<(), ControlError> {
        Self::target_command(target)?;
        fsm.begin_load(target);
        Ok(())
    }

    /// Runs one step of the current sequence.
    pub async fn step(
        &self,
        fsm: &mut SupervisorFsm,
        registry: &mut NodeRegistry,
        distributor: &mut Distributor,
        bus: &Bus,
    ) -> Result<LoadProgress, ControlError> {
        let Some(target) = fsm.target().filter(|_| fsm.loading()) else {
            return Ok(LoadProgress::Idle);
        };

        if let Some(blocking) = registry.enabled().find(|n| n.state().is_faulted()) {
            let node = blocking.identity().to_string();
            let state = blocking.state();
            fsm.cancel_load();
            bus.publish(
                Event::new(EventKind::OrchestrationError)
                    .with_node(node.as_str())
                    .with_transition(state, target),
            );
            return Err(ControlError::Orchestration { node, state });
        }

        if registry.enabled().all(|n| n.state() == target) {
            fsm.finish_load();
            let before = fsm.set_aggregate(target);
            if before != target {
                bus.publish(
                    Event::new(EventKind::AggregateTransitioned).with_transition(before, target),
                );
            }
            bus.publish(Event::new(EventKind::Ready).with_to(target));
            return Ok(LoadProgress::Ready);
        }

        let level = Self::target_command(target).inspect_err(|_| fsm.cancel_load())?;

        let mut commands = Vec::new();
        let mut reports = Vec::new();

        if registry.enabled().any(|n| n.state() == NodeState::Off) {
            let report = distributor
                .dispatch_where(Command::TurnOn, None, registry, Direction::Forward, |n| {
                    n.state() == NodeState::Off
                })
                .await
                .inspect_err(|_| fsm.cancel_load())?;
            commands.push(Command::TurnOn);
            let faulted = report.link_fault.is_some();
            reports.push(report);
            if faulted {
                fsm.cancel_load();
                return Ok(LoadProgress::Round { commands, reports });
            }
        }

        let off_target = |s: NodeState| s.is_stable() && s != NodeState::Off && s != target;
        if registry.enabled().any(|n| off_target(n.state())) {
            let report = distributor
                .dispatch_where(level, None, registry, Direction::Forward, |n| {
                    off_target(n.state())
                })
                .await
                .inspect_err(|_| fsm.cancel_load())?;
            commands.push(level);
            if report.link_fault.is_some() {
                fsm.cancel_load();
            }
            reports.push(report);
        }

        Ok(LoadProgress::Round { commands, reports })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::catalog::CommandCatalog;
    use crate::link::MemoryLink;
    use crate::nodes::{Node, NodeState::*};

    struct Rig {
        link: Arc<MemoryLink>,
        reg: NodeRegistry,
        dist: Distributor,
        fsm: SupervisorFsm,
        bus: Bus,
    }

    fn rig(states: &[(&str, NodeState)]) -> Rig {
        let link = Arc::new(MemoryLink::new());
        let mut reg = NodeRegistry::new();
        for (id, st) in states {
            link.add_node(id, *st);
            let mut node = Node::new(*id, "");
            node.set_state(*st);
            reg.insert(node).unwrap();
        }
        let dist = Distributor::new(
            link.clone(),
            Arc::new(CommandCatalog::standard()),
            Duration::from_millis(100),
        );
        Rig {
            link,
            reg,
            dist,
            fsm: SupervisorFsm::new(),
            bus: Bus::new(64),
        }
    }

    impl Rig {
        async fn step(&mut self) -> Result<LoadProgress, ControlError> {
            Orchestrator
                .step(&mut self.fsm, &mut self.reg, &mut self.dist, &self.bus)
                .await
        }

        /// Endpoint settles and the registry learns about it (stand-in for a reconcile).
        fn settle(&mut self) {
            self.link.settle();
            let ids: Vec<String> = self.reg.iter().map(|n| n.identity().to_string()).collect();
            for id in ids {
                if let Some(s) = self.link.state(&id) {
                    self.reg.set_state(&id, s);
                }
            }
        }
    }

    #[test]
    fn only_powered_stable_targets_are_valid() {
        let mut fsm = SupervisorFsm::new();
        for bad in [Off, Unknown, Error, RampingUp] {
            assert_eq!(
                Orchestrator.start(&mut fsm, bad),
                Err(ControlError::InvalidTarget { state: bad })
            );
        }
        assert!(!fsm.loading());
        Orchestrator.start(&mut fsm, Shoulder).unwrap();
        assert!(fsm.loading());
        assert_eq!(fsm.target(), Some(Shoulder));
    }

    #[tokio::test]
    async fn idle_without_a_sequence() {
        let mut r = rig(&[("a", Peak)]);
        assert_eq!(r.step().await.unwrap(), LoadProgress::Idle);
        assert!(r.link.sent().is_empty());
    }

    #[tokio::test]
    async fn ramps_through_rounds_until_ready() {
        let mut r = rig(&[("a", Off), ("b", Standby), ("c", Off)]);
        let mut events = r.bus.subscribe();
        Orchestrator.start(&mut r.fsm, Peak).unwrap();

        let first = r.step().await.unwrap();
        assert!(matches!(
            first,
            LoadProgress::Round { ref commands, .. } if commands == &[Command::TurnOn, Command::Peak]
        ));
        assert_eq!(r.reg.get("a").unwrap().state(), TurningOn);
        assert_eq!(r.reg.get("b").unwrap().state(), RampingUp);

        let waiting = r.step().await.unwrap();
        assert!(matches!(waiting, LoadProgress::Round { ref commands, .. } if commands.is_empty()));

        r.settle();
        let second = r.step().await.unwrap();
        assert!(matches!(second, LoadProgress::Round { ref commands, .. } if commands == &[Command::Peak]));
        assert!(r.fsm.loading());

        r.settle();
        assert_eq!(r.step().await.unwrap(), LoadProgress::Ready);
        assert!(!r.fsm.loading());
        assert_eq!(r.fsm.aggregate(), Peak);

        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(kinds, [EventKind::AggregateTransitioned, EventKind::Ready]);

        assert_eq!(r.step().await.unwrap(), LoadProgress::Idle);
    }

    #[tokio::test]
    async fn nodes_above_target_ramp_down() {
        let mut r = rig(&[("a", Peak), ("b", Standby)]);
        Orchestrator.start(&mut r.fsm, Shoulder).unwrap();

        let round = r.step().await.unwrap();
        assert!(matches!(round, LoadProgress::Round { ref commands, .. } if commands == &[Command::Shoulder]));
        assert_eq!(r.reg.get("a").unwrap().state(), RampingDown);
        assert_eq!(r.reg.get("b").unwrap().state(), RampingUp);

        r.settle();
        assert_eq!(r.step().await.unwrap(), LoadProgress::Ready);
    }

    #[tokio::test]
    async fn never_ready_while_one_node_differs() {
        let mut r = rig(&[("a", Standby), ("b", Standby)]);
        Orchestrator.start(&mut r.fsm, Peak).unwrap();
        r.step().await.unwrap();

        r.settle();
        r.link.set_state("b", Shoulder);
        r.reg.set_state("b", Shoulder);

        let progress = r.step().await.unwrap();
        assert_ne!(progress, LoadProgress::Ready);
        assert!(r.fsm.loading());
    }

    #[tokio::test]
    async fn error_node_aborts_sequence() {
        let mut r = rig(&[("a", Standby), ("b", Error)]);
        let mut events = r.bus.subscribe();
        Orchestrator.start(&mut r.fsm, Peak).unwrap();

        let err = r.step().await.unwrap_err();
        assert_eq!(
            err,
            ControlError::Orchestration {
                node: "b".into(),
                state: Error
            }
        );
        assert!(!r.fsm.loading());
        assert_eq!(r.fsm.target(), None);
        assert!(r.link.sent().is_empty());

        let ev = events.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::OrchestrationError);
        assert_eq!(ev.node.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn link_fault_abandons_sequence() {
        let mut r = rig(&[("a", Off), ("b", Off)]);
        r.link.inject_fault("a", true);
        Orchestrator.start(&mut r.fsm, Standby).unwrap();

        let round = r.step().await.unwrap();
        let LoadProgress::Round { reports, .. } = round else {
            panic!("expected a round");
        };
        assert!(reports[0].link_fault.is_some());
        assert!(!r.fsm.loading());
        assert!(!r.dist.is_armed());
    }
}
