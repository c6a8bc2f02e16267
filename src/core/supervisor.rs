//! # Supervisor: the single supervisory loop.
//!
//! The [`Supervisor`] owns every piece of mutable state (registry, FSM,
//! distributor) and changes it only through `&mut self`. Nothing is shared
//! with other tasks except the event bus and the status watch channel, so
//! node state needs no locks.
//!
//! ## High-level architecture
//! ```text
//! SupervisorHandle ──► [request queue] ──┐
//! interval(poll_interval) ───────────────┼──► run() loop (tokio::select!)
//! OS signal / CancellationToken ─────────┘          │
//!                                                   ▼
//!        submit ─► SupervisorFsm::check ─► Distributor::dispatch ─► absorb(report)
//!        tick   ─► Monitor::reconcile ─► Orchestrator::step (while loading)
//!                                                   │
//!                      publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//!                      send_replace(Status) ──► watch ──► SupervisorHandle::status
//!
//! Shutdown path:
//!   token.cancelled() | wait_for_shutdown_signal()
//!             └─► Bus.publish(ShutdownRequested)
//!             └─► listener forwards it and stops
//!             └─► SubscriberSet::shutdown() bounded by Config::grace
//! ```
//!
//! The supervisor can also be driven by hand (`tick`, `submit`, `load`, ...)
//! without `run`; tests and embedded callers do this.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use fleetvisor::{Command, Config, MemoryLink, NodeDescriptor, NodeState, SupervisorBuilder};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), fleetvisor::ControlError> {
//!     let link = Arc::new(MemoryLink::new().with_node("hv-01", NodeState::Off));
//!     let mut sup = SupervisorBuilder::new(Config::default(), link.clone())
//!         .with_nodes(vec![NodeDescriptor::new("hv-01", "sector1")])
//!         .build()?;
//!
//!     sup.tick().await;
//!     assert_eq!(sup.status().aggregate, NodeState::Off);
//!
//!     sup.submit(Command::TurnOn, None).await?;
//!     link.settle();
//!     sup.tick().await;
//!     assert_eq!(sup.status().aggregate, NodeState::Standby);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::catalog::CommandCatalog;
use crate::error::ControlError;
use crate::events::{Bus, Event, EventKind};
use crate::link::Link;
use crate::nodes::{Command, Direction, MergeSummary, NodeDescriptor, NodeRegistry, NodeState};
use crate::store::{ConfigError, ConfigStore};
use crate::subscribers::SubscriberSet;

use super::config::Config;
use super::distributor::{DispatchReport, Distributor};
use super::fsm::SupervisorFsm;
use super::handle::{Request, SupervisorHandle};
use super::monitor::Monitor;
use super::orchestrator::{LoadProgress, Orchestrator};
use super::shutdown;
use super::status::{NodeStatus, Status};

/// Outcome of one [`Supervisor::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Aggregate after the tick.
    pub aggregate: NodeState,
    /// Number of events produced by reconciliation.
    pub changes: usize,
    /// Result of the load step, if a sequence was running.
    pub load: Option<Result<LoadProgress, ControlError>>,
}

/// Everything [`SupervisorBuilder`](crate::SupervisorBuilder) hands over.
pub(crate) struct Parts {
    pub cfg: Config,
    pub bus: Bus,
    pub listener: Option<JoinHandle<Arc<SubscriberSet>>>,
    pub link: Arc<dyn Link>,
    pub catalog: Arc<CommandCatalog>,
    pub registry: NodeRegistry,
    pub store: Option<Arc<dyn ConfigStore>>,
}

/// Supervisory controller for one fleet of nodes.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    listener: Option<JoinHandle<Arc<SubscriberSet>>>,
    link: Arc<dyn Link>,
    catalog: Arc<CommandCatalog>,
    registry: NodeRegistry,
    fsm: SupervisorFsm,
    distributor: Distributor,
    monitor: Monitor,
    orchestrator: Orchestrator,
    store: Option<Arc<dyn ConfigStore>>,
    status_tx: watch::Sender<Status>,
    tx: mpsc::Sender<Request>,
    rx: Option<mpsc::Receiver<Request>>,
}

impl Supervisor {
    pub(crate) fn new_internal(parts: Parts) -> Self {
        let Parts {
            cfg,
            bus,
            listener,
            link,
            catalog,
            registry,
            store,
        } = parts;

        let distributor = Distributor::new(Arc::clone(&link), Arc::clone(&catalog), cfg.send_timeout());
        let monitor = Monitor::new(cfg.query_timeout());
        let (tx, rx) = mpsc::channel(cfg.request_capacity());
        let (status_tx, _) = watch::channel(Status {
            aggregate: NodeState::Unknown,
            demand: None,
            loading: false,
            target: None,
            armed: true,
            nodes: Vec::new(),
        });

        let sup = Self {
            cfg,
            bus,
            listener,
            link,
            catalog,
            registry,
            fsm: SupervisorFsm::new(),
            distributor,
            monitor,
            orchestrator: Orchestrator::new(),
            store,
            status_tx,
            tx,
            rx: Some(rx),
        };
        sup.publish_status();
        sup
    }

    /// Subscribes to the bus and forwards events to the subscriber set until shutdown.
    pub(crate) fn spawn_listener(
        bus: &Bus,
        set: Arc<SubscriberSet>,
    ) -> Option<JoinHandle<Arc<SubscriberSet>>> {
        if set.is_empty() {
            return None;
        }
        let mut rx = bus.subscribe();
        Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        let last = ev.kind == EventKind::ShutdownRequested;
                        set.emit(&ev);
                        if last {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            set
        }))
    }

    // ---- accessors ----

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn fsm(&self) -> &SupervisorFsm {
        &self.fsm
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    pub fn is_armed(&self) -> bool {
        self.distributor.is_armed()
    }

    /// Receiver for every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Request handle for use from other tasks while [`run`](Self::run) is active.
    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle::new(self.tx.clone(), self.status_tx.subscribe())
    }

    /// Current snapshot.
    pub fn status(&self) -> Status {
        Status {
            aggregate: self.fsm.aggregate(),
            demand: self.fsm.demand(),
            loading: self.fsm.loading(),
            target: self.fsm.target(),
            armed: self.distributor.is_armed(),
            nodes: self
                .registry
                .iter()
                .map(|n| NodeStatus {
                    identity: n.identity().to_string(),
                    enabled: n.enabled(),
                    state: n.state(),
                })
                .collect(),
        }
    }

    // ---- operations ----

    /// Reconciles against the endpoints, then advances a running load sequence.
    pub async fn tick(&mut self) -> TickReport {
        let current = self.fsm.aggregate();
        let rec = self
            .monitor
            .reconcile(&mut self.registry, self.link.as_ref(), current)
            .await;
        self.fsm.set_aggregate(rec.aggregate);

        let changes = rec.events.len();
        for ev in rec.events {
            self.bus.publish(ev);
        }

        let load = if self.fsm.loading() {
            Some(self.step_load().await)
        } else {
            None
        };

        self.publish_status();
        TickReport {
            aggregate: self.fsm.aggregate(),
            changes,
            load,
        }
    }

    /// Validates and dispatches one operator command.
    ///
    /// `Recover` is accepted in every state and visits nodes in reverse order;
    /// every other command goes forward. Any accepted command ends a running
    /// load sequence.
    pub async fn submit(
        &mut self,
        command: Command,
        payload: Option<&str>,
    ) -> Result<DispatchReport, ControlError> {
        let res = self.submit_inner(command, payload).await;
        if let Err(err) = &res {
            self.bus.publish(
                Event::new(EventKind::CommandRejected)
                    .with_command(command)
                    .with_from(self.fsm.aggregate())
                    .with_reason(err.to_string()),
            );
        }
        self.publish_status();
        res
    }

    async fn submit_inner(
        &mut self,
        command: Command,
        payload: Option<&str>,
    ) -> Result<DispatchReport, ControlError> {
        self.catalog.entry(command)?;
        if let Some(err) = self.distributor.disarmed_error() {
            return Err(err);
        }
        let entry = self.fsm.check(&self.catalog, command)?;

        let direction = match command {
            Command::Recover => Direction::Reverse,
            _ => Direction::Forward,
        };
        let before = self.fsm.accept(&entry);
        self.bus.publish(
            Event::new(EventKind::CommandAccepted)
                .with_command(command)
                .with_transition(before, entry.demand),
        );
        self.announce_aggregate(before);

        let report = self
            .distributor
            .dispatch(command, payload, &mut self.registry, direction)
            .await?;
        self.absorb(&report);
        Ok(report)
    }

    /// Starts a load sequence towards `target` and runs its first round.
    ///
    /// Rejected while the aggregate is `Error` or dispatch is disarmed.
    pub async fn load(&mut self, target: NodeState) -> Result<LoadProgress, ControlError> {
        let res = self.load_inner(target).await;
        self.publish_status();
        res
    }

    async fn load_inner(&mut self, target: NodeState) -> Result<LoadProgress, ControlError> {
        let command = Orchestrator::target_command(target)?;
        let aggregate = self.fsm.aggregate();

        if aggregate == NodeState::Error || !self.distributor.is_armed() {
            let reason = match self.distributor.disarmed_error() {
                Some(err) => err.to_string(),
                None => "aggregate is error".to_string(),
            };
            self.bus.publish(
                Event::new(EventKind::CommandRejected)
                    .with_command(command)
                    .with_from(aggregate)
                    .with_reason(reason),
            );
            return Err(ControlError::CommandRejected {
                command,
                state: aggregate,
            });
        }

        self.orchestrator.start(&mut self.fsm, target)?;
        self.bus
            .publish(Event::new(EventKind::LoadStarted).with_to(target));
        self.step_load().await
    }

    /// Reloads the node set named `descriptor` from the configured store.
    pub fn reconfigure(&mut self, descriptor: &str) -> Result<MergeSummary, ControlError> {
        let store = self.store.clone().ok_or_else(|| ConfigError::NotFound {
            descriptor: descriptor.to_string(),
        })?;
        let nodes = store.load(descriptor)?;
        self.reconfigure_with(nodes)
    }

    /// Replaces the node set, keeping the last known state of surviving nodes.
    pub fn reconfigure_with(
        &mut self,
        nodes: Vec<NodeDescriptor>,
    ) -> Result<MergeSummary, ControlError> {
        let summary = self.registry.merge(nodes)?;
        self.bus.publish(Event::new(EventKind::Reconfigured).with_reason(format!(
            "added={} removed={} kept={}",
            summary.added.len(),
            summary.removed.len(),
            summary.kept.len()
        )));
        self.rederive_aggregate();
        self.publish_status();
        Ok(summary)
    }

    /// Includes or excludes one node from dispatch and aggregation.
    pub fn set_enabled(&mut self, identity: &str, enabled: bool) -> Result<(), ControlError> {
        self.registry.set_enabled(identity, enabled)?;
        self.rederive_aggregate();
        self.publish_status();
        Ok(())
    }

    /// Re-arms dispatch after a link fault. Returns `true` if it was disarmed.
    pub fn rearm(&mut self) -> bool {
        let was_disarmed = self.distributor.rearm();
        if was_disarmed {
            self.bus.publish(Event::new(EventKind::DispatchRearmed));
            self.publish_status();
        }
        was_disarmed
    }

    // ---- loop ----

    /// Runs the supervisory loop until `token` is cancelled or a termination
    /// signal arrives (when [`Config::handle_signals`] is set).
    pub async fn run(mut self, token: CancellationToken) {
        let Some(mut requests) = self.rx.take() else {
            return;
        };

        let mut ticker = tokio::time::interval(self.cfg.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let signal = shutdown::wait_for_shutdown_signal();
        tokio::pin!(signal);
        let mut listen = self.cfg.handle_signals;

        let reason = loop {
            tokio::select! {
                _ = token.cancelled() => break "cancelled",
                res = &mut signal, if listen => match res {
                    Ok(name) => break name,
                    Err(e) => {
                        listen = false;
                        tracing::warn!(error = %e, "cannot listen for termination signals");
                    }
                },
                Some(req) = requests.recv() => self.serve(req).await,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        };

        drop(requests);
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
        self.drain_subscribers().await;
    }

    async fn serve(&mut self, req: Request) {
        match req {
            Request::Submit {
                command,
                payload,
                reply,
            } => {
                let _ = reply.send(self.submit(command, payload.as_deref()).await);
            }
            Request::Load { target, reply } => {
                let _ = reply.send(self.load(target).await);
            }
            Request::Reconfigure { descriptor, reply } => {
                let _ = reply.send(self.reconfigure(&descriptor));
            }
            Request::SetEnabled {
                identity,
                enabled,
                reply,
            } => {
                let _ = reply.send(self.set_enabled(&identity, enabled));
            }
            Request::Rearm { reply } => {
                let _ = reply.send(self.rearm());
            }
        }
    }

    // ---- internals ----

    async fn step_load(&mut self) -> Result<LoadProgress, ControlError> {
        let res = self
            .orchestrator
            .step(
                &mut self.fsm,
                &mut self.registry,
                &mut self.distributor,
                &self.bus,
            )
            .await;
        if let Ok(LoadProgress::Round { reports, .. }) = &res {
            for report in reports {
                self.absorb(report);
            }
        }
        res
    }

    /// Turns per-node failures of a dispatch into events and escalates the aggregate.
    fn absorb(&mut self, report: &DispatchReport) {
        for f in &report.failures {
            self.bus.publish(
                Event::new(EventKind::NodeLost)
                    .with_node(Arc::clone(&f.node))
                    .with_command(report.command)
                    .with_transition(f.previous, NodeState::Unknown)
                    .with_reason(f.error.to_string()),
            );
        }
        if let Some(fault) = &report.link_fault {
            self.bus.publish(
                Event::new(EventKind::LinkFault)
                    .with_node(Arc::clone(&fault.node))
                    .with_command(report.command)
                    .with_reason(fault.error.to_string()),
            );
        }
        if report.degraded {
            let reason = report
                .failures
                .first()
                .map(|f| format!("{} failed on '{}': {}", report.command, f.node, f.error))
                .unwrap_or_default();
            self.move_aggregate(NodeState::Error, reason);
        }
    }

    /// Recomputes the aggregate from the registry as it stands, without querying.
    fn rederive_aggregate(&mut self) {
        let next = Monitor::aggregate(&self.registry, self.fsm.aggregate());
        let reason = Monitor::fault_reason(&self.registry);
        self.move_aggregate(next, reason);
    }

    /// Sets the aggregate; on a change publishes the transition, and `Degraded` when entering Error.
    fn move_aggregate(&mut self, next: NodeState, reason: String) {
        let before = self.fsm.set_aggregate(next);
        if before == next {
            return;
        }
        self.bus
            .publish(Event::new(EventKind::AggregateTransitioned).with_transition(before, next));
        if next == NodeState::Error {
            self.bus.publish(
                Event::new(EventKind::Degraded)
                    .with_from(before)
                    .with_reason(reason),
            );
        }
    }

    fn announce_aggregate(&self, before: NodeState) {
        let now = self.fsm.aggregate();
        if now != before {
            self.bus
                .publish(Event::new(EventKind::AggregateTransitioned).with_transition(before, now));
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status());
    }

    async fn drain_subscribers(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        let grace = self.cfg.grace;
        let drained = tokio::time::timeout(grace, async move {
            if let Ok(set) = listener.await {
                if let Ok(set) = Arc::try_unwrap(set) {
                    set.shutdown().await;
                }
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(?grace, "subscribers did not drain within grace");
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::core::SupervisorBuilder;
    use crate::link::MemoryLink;
    use crate::store::StaticStore;
    use crate::nodes::NodeState::*;

    fn fleet(ids: &[&str]) -> (Arc<MemoryLink>, Supervisor) {
        let link = Arc::new(MemoryLink::new());
        let mut nodes = Vec::new();
        for id in ids {
            link.add_node(id, Off);
            nodes.push(NodeDescriptor::new(*id, format!("cfg-{id}")));
        }
        let sup = SupervisorBuilder::new(Config::default(), link.clone())
            .with_nodes(nodes)
            .build()
            .unwrap();
        (link, sup)
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    #[tokio::test]
    async fn first_tick_discovers_the_fleet() {
        let (_link, mut sup) = fleet(&["a", "b"]);
        let mut rx = sup.subscribe();

        let report = sup.tick().await;
        assert_eq!(report.aggregate, Off);
        assert_eq!(report.changes, 3);
        assert!(report.load.is_none());
        assert_eq!(
            drain(&mut rx),
            vec![
                EventKind::NodeRecovered,
                EventKind::NodeRecovered,
                EventKind::AggregateTransitioned
            ]
        );
    }

    #[tokio::test]
    async fn load_ramps_off_fleet_to_peak() {
        let (link, mut sup) = fleet(&["a", "b"]);
        sup.tick().await;

        let first = sup.load(Peak).await.unwrap();
        assert!(matches!(first, LoadProgress::Round { ref commands, .. } if commands == &[Command::TurnOn]));
        assert!(sup.fsm().loading());
        assert_eq!(sup.fsm().demand(), Some(Peak));

        link.settle();
        let report = sup.tick().await;
        assert_eq!(report.aggregate, Standby);
        assert!(matches!(report.load, Some(Ok(LoadProgress::Round { ref commands, .. })) if commands == &[Command::Peak]));

        link.settle();
        let report = sup.tick().await;
        assert_eq!(report.load, Some(Ok(LoadProgress::Ready)));
        assert_eq!(report.aggregate, Peak);
        assert!(!sup.fsm().loading());

        let sent: Vec<_> = link.sent().into_iter().map(|(_, c)| c).collect();
        assert_eq!(
            sent,
            vec![Command::TurnOn, Command::TurnOn, Command::Peak, Command::Peak]
        );
    }

    #[tokio::test]
    async fn unreachable_node_degrades_then_recover_brings_fleet_off() {
        let (link, mut sup) = fleet(&["a", "b", "c"]);
        sup.tick().await;
        let mut rx = sup.subscribe();

        link.set_reachable("b", false);
        let report = sup.submit(Command::TurnOn, None).await.unwrap();
        assert_eq!(report.sent.len(), 2);
        assert_eq!(report.failures[0].node.as_ref(), "b");
        assert_eq!(sup.fsm().aggregate(), Error);
        let kinds = drain(&mut rx);
        assert!(kinds.contains(&EventKind::NodeLost));
        assert!(kinds.contains(&EventKind::Degraded));

        let err = sup.submit(Command::TurnOn, None).await.unwrap_err();
        assert!(matches!(err, ControlError::CommandRejected { state: Error, .. }));
        assert!(drain(&mut rx).contains(&EventKind::CommandRejected));

        link.set_reachable("b", true);
        link.clear_sent();
        sup.submit(Command::Recover, None).await.unwrap();
        let order: Vec<_> = link.sent().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["c", "b", "a"]);

        link.settle();
        let report = sup.tick().await;
        assert_eq!(report.aggregate, Off);
        assert!(sup.registry().iter().all(|n| n.state() == Off));
    }

    #[tokio::test]
    async fn external_change_is_reported_and_escalates() {
        let (link, mut sup) = fleet(&["a", "b"]);
        sup.tick().await;
        let mut rx = sup.subscribe();

        link.set_state("b", Error);
        let report = sup.tick().await;
        assert_eq!(report.aggregate, Error);
        assert_eq!(
            drain(&mut rx),
            vec![
                EventKind::StateChangedExternally,
                EventKind::AggregateTransitioned,
                EventKind::Degraded
            ]
        );
    }

    #[tokio::test]
    async fn recover_cancels_a_running_load() {
        let (link, mut sup) = fleet(&["a", "b"]);
        sup.tick().await;
        sup.load(Shoulder).await.unwrap();
        assert!(sup.fsm().loading());

        link.clear_sent();
        sup.submit(Command::Recover, None).await.unwrap();
        assert!(!sup.fsm().loading());
        assert_eq!(sup.fsm().target(), None);
        assert_eq!(sup.fsm().demand(), Some(Off));

        let order: Vec<_> = link.sent().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["b", "a"]);

        link.settle();
        let report = sup.tick().await;
        assert_eq!(report.aggregate, Off);
        assert!(report.load.is_none());
    }

    #[tokio::test]
    async fn recover_keeps_error_while_a_node_is_unknown() {
        let (link, mut sup) = fleet(&["a", "b"]);
        sup.tick().await;

        link.set_reachable("b", false);
        sup.submit(Command::TurnOn, None).await.unwrap();
        assert_eq!(sup.status().aggregate, Error);

        link.set_reachable("b", true);
        sup.submit(Command::Recover, None).await.unwrap();
        let status = sup.status();
        assert_eq!(status.node("b").unwrap().state, Unknown);
        assert_eq!(status.aggregate, Error);
        assert_eq!(status.demand, Some(Off));

        link.settle();
        assert_eq!(sup.tick().await.aggregate, Off);
    }

    #[tokio::test]
    async fn recover_during_load_with_a_faulted_node() {
        let (link, mut sup) = fleet(&["a", "b"]);
        sup.tick().await;
        sup.load(Peak).await.unwrap();

        // a trips after the first round; reconciled, not yet stepped.
        link.set_state("a", Error);
        sup.registry.set_state("a", Error);
        sup.fsm.set_aggregate(Error);
        assert!(sup.fsm().loading());

        link.clear_sent();
        sup.submit(Command::Recover, None).await.unwrap();
        assert!(!sup.fsm().loading());
        assert_eq!(sup.fsm().target(), None);
        assert_eq!(
            link.sent(),
            vec![
                ("b".to_string(), Command::Recover),
                ("a".to_string(), Command::Recover)
            ]
        );
        assert_eq!(sup.registry().get("a").unwrap().state(), TurningOff);
        assert_eq!(sup.registry().get("b").unwrap().state(), TurningOff);

        link.settle();
        let report = sup.tick().await;
        assert_eq!(report.aggregate, Off);
        assert!(report.load.is_none());
    }

    #[tokio::test]
    async fn reconfigure_rederives_the_aggregate() {
        let (_link, mut sup) = fleet(&["a"]);
        sup.tick().await;
        assert_eq!(sup.status().aggregate, Off);
        let mut rx = sup.subscribe();

        sup.reconfigure_with(vec![NodeDescriptor::new("a", "x"), NodeDescriptor::new("new", "y")])
            .unwrap();
        assert_eq!(sup.status().aggregate, Error);
        assert_eq!(
            drain(&mut rx),
            vec![
                EventKind::Reconfigured,
                EventKind::AggregateTransitioned,
                EventKind::Degraded
            ]
        );

        let err = sup.submit(Command::TurnOn, None).await.unwrap_err();
        assert!(matches!(err, ControlError::CommandRejected { state: Error, .. }));
        assert!(sup.load(Standby).await.is_err());
    }

    #[tokio::test]
    async fn set_enabled_rederives_the_aggregate() {
        let (link, mut sup) = fleet(&["a", "b"]);
        sup.tick().await;
        link.set_state("b", Error);
        assert_eq!(sup.tick().await.aggregate, Error);

        sup.set_enabled("b", false).unwrap();
        assert_eq!(sup.status().aggregate, Off);

        let mut rx = sup.subscribe();
        sup.set_enabled("b", true).unwrap();
        assert_eq!(sup.status().aggregate, Error);
        assert_eq!(
            drain(&mut rx),
            vec![EventKind::AggregateTransitioned, EventKind::Degraded]
        );
        let err = sup.submit(Command::TurnOff, None).await.unwrap_err();
        assert!(matches!(err, ControlError::CommandRejected { .. }));
    }

    #[tokio::test]
    async fn link_fault_disarms_until_rearmed() {
        let (link, mut sup) = fleet(&["a", "b"]);
        sup.tick().await;

        link.inject_fault("a", true);
        let report = sup.submit(Command::TurnOn, None).await.unwrap();
        assert!(report.link_fault.is_some());
        assert_eq!(report.skipped.len(), 1);
        assert!(!sup.is_armed());
        assert!(!sup.status().armed);

        let err = sup.submit(Command::Recover, None).await.unwrap_err();
        assert!(matches!(err, ControlError::LinkFault { .. }));
        let err = sup.load(Standby).await.unwrap_err();
        assert!(matches!(err, ControlError::CommandRejected { command: Command::Standby, .. }));

        link.inject_fault("a", false);
        assert!(sup.rearm());
        assert!(!sup.rearm());
        sup.submit(Command::Recover, None).await.unwrap();
        assert!(sup.is_armed());
    }

    #[tokio::test]
    async fn load_rejects_non_level_targets() {
        let (_link, mut sup) = fleet(&["a"]);
        sup.tick().await;
        for target in [Off, Unknown, TurningOn, Error] {
            let err = sup.load(target).await.unwrap_err();
            assert!(matches!(err, ControlError::InvalidTarget { .. }), "{target}");
        }
        assert!(!sup.fsm().loading());
    }

    #[tokio::test]
    async fn reconfigure_keeps_surviving_states() {
        let link = Arc::new(
            MemoryLink::new()
                .with_node("a", Off)
                .with_node("b", Off)
                .with_node("c", Off),
        );
        let store = StaticStore::new()
            .with_set("v1", vec![NodeDescriptor::new("a", "x"), NodeDescriptor::new("b", "y")])
            .with_set("v2", vec![NodeDescriptor::new("a", "x2"), NodeDescriptor::new("c", "z")]);
        let mut sup = SupervisorBuilder::new(Config::default(), link.clone())
            .with_store(Arc::new(store))
            .with_node_set("v1")
            .build()
            .unwrap();
        sup.tick().await;
        sup.submit(Command::TurnOn, None).await.unwrap();
        assert_eq!(sup.registry().get("a").unwrap().state(), TurningOn);

        let summary = sup.reconfigure("v2").unwrap();
        assert_eq!(summary.added, vec!["c".to_string()]);
        assert_eq!(summary.removed, vec!["b".to_string()]);
        assert_eq!(summary.kept, vec!["a".to_string()]);
        assert_eq!(sup.registry().get("a").unwrap().state(), TurningOn);
        assert_eq!(sup.registry().get("c").unwrap().state(), Unknown);
        assert!(sup.registry().get("b").is_none());

        let err = sup.reconfigure("v3").unwrap_err();
        assert!(matches!(err, ControlError::Config(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn disabled_nodes_are_skipped() {
        let (link, mut sup) = fleet(&["a", "b", "c"]);
        sup.tick().await;
        sup.set_enabled("b", false).unwrap();
        assert!(!sup.status().node("b").unwrap().enabled);

        sup.submit(Command::TurnOn, None).await.unwrap();
        let order: Vec<_> = link.sent().into_iter().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["a", "c"]);

        let err = sup.set_enabled("zz", true).unwrap_err();
        assert!(matches!(err, ControlError::Registry(_)));
    }

    #[tokio::test]
    async fn run_serves_handle_requests_until_cancelled() {
        let link = Arc::new(MemoryLink::new().with_node("a", Off));
        let cfg = Config {
            poll_interval: Duration::from_millis(5),
            handle_signals: false,
            ..Config::default()
        };
        let sup = SupervisorBuilder::new(cfg, link.clone())
            .with_nodes(vec![NodeDescriptor::new("a", "cfg-a")])
            .build()
            .unwrap();
        let handle = sup.handle();
        let mut events = sup.subscribe();

        let token = CancellationToken::new();
        let running = tokio::spawn(sup.run(token.clone()));

        let mut status = handle.watch();
        status.wait_for(|s| s.aggregate == Off).await.unwrap();

        handle.submit(Command::TurnOn, None).await.unwrap();
        link.settle();
        status.wait_for(|s| s.aggregate == Standby).await.unwrap();
        assert_eq!(handle.status().demand, Some(Standby));

        token.cancel();
        running.await.unwrap();

        let err = handle.rearm().await.unwrap_err();
        assert!(matches!(err, ControlError::Closed));

        let mut last = None;
        while let Ok(ev) = events.try_recv() {
            last = Some(ev);
        }
        let last = last.unwrap();
        assert_eq!(last.kind, EventKind::ShutdownRequested);
        assert_eq!(last.reason.as_deref(), Some("cancelled"));
    }
}
