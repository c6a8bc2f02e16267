//! # Monitor: authoritative reconciliation.
//!
//! Once per tick the monitor asks every enabled node for its live state and
//! lets the answer win over whatever the distributor assumed.
//!
//! ```text
//! query all enabled nodes concurrently (each bounded by query_timeout)
//!     │
//!     ▼  apply in registry order
//! last known  reply      new state   event
//! ----------  ---------  ----------  ----------------------
//! Unknown     Ok(s)      s           NodeRecovered
//! Unknown     Err        Unknown     -
//! known s     Ok(s)      s           -
//! known s     Ok(t≠s)    t           StateChangedExternally
//! known s     Err        Unknown     NodeLost
//!     │
//!     ▼
//! aggregate: any Error/Unknown → Error
//!            all at one stable state → that state
//!            otherwise (or no enabled node) → unchanged
//! ```
//!
//! ## Rules
//! - Reconciliation is idempotent: without an underlying change a second pass
//!   yields the same aggregate and no events.
//! - `Degraded` is emitted once, on the transition into `Error`.

use std::time::Duration;

use futures::future::join_all;

use crate::events::{Event, EventKind};
use crate::link::{Link, query_bounded};
use crate::nodes::{NodeRegistry, NodeState};

/// Result of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Aggregate after the pass.
    pub aggregate: NodeState,
    /// Events produced by the pass, in the order they happened.
    pub events: Vec<Event>,
}

/// Polls nodes and recomputes the aggregate.
#[derive(Debug, Clone)]
pub struct Monitor {
    query_timeout: Duration,
}

impl Monitor {
    pub fn new(query_timeout: Duration) -> Self {
        Self { query_timeout }
    }

    /// Queries every enabled node, updates the registry and recomputes the aggregate.
    pub async fn reconcile(
        &self,
        registry: &mut NodeRegistry,
        link: &dyn Link,
        current: NodeState,
    ) -> Reconciliation {
        let ids: Vec<String> = registry.enabled().map(|n| n.identity().to_string()).collect();
        let replies = join_all(
            ids.iter()
                .map(|id| query_bounded(link, id, self.query_timeout)),
        )
        .await;

        let mut events = Vec::new();
        for (id, reply) in ids.iter().zip(replies) {
            let Some(known) = registry.get(id).map(|n| n.state()) else {
                continue;
            };
            match (known, reply) {
                (NodeState::Unknown, Ok(live)) if live != NodeState::Unknown => {
                    registry.set_state(id, live);
                    events.push(
                        Event::new(EventKind::NodeRecovered)
                            .with_node(id.as_str())
                            .with_transition(known, live),
                    );
                }
                (NodeState::Unknown, _) => {}
                (_, Ok(live)) if live != known => {
                    registry.set_state(id, live);
                    events.push(
                        Event::new(EventKind::StateChangedExternally)
                            .with_node(id.as_str())
                            .with_transition(known, live),
                    );
                }
                (_, Ok(_)) => {}
                (_, Err(err)) => {
                    registry.set_state(id, NodeState::Unknown);
                    events.push(
                        Event::new(EventKind::NodeLost)
                            .with_node(id.as_str())
                            .with_transition(known, NodeState::Unknown)
                            .with_reason(err.to_string()),
                    );
                }
            }
        }

        let aggregate = Self::aggregate(registry, current);
        if aggregate != current {
            events.push(
                Event::new(EventKind::AggregateTransitioned).with_transition(current, aggregate),
            );
            if aggregate == NodeState::Error {
                let reason = Self::fault_reason(registry);
                events.push(
                    Event::new(EventKind::Degraded)
                        .with_from(current)
                        .with_reason(reason),
                );
            }
        }

        Reconciliation { aggregate, events }
    }

    /// Aggregate of the enabled nodes given the previous value.
    /// Names the first enabled node holding the aggregate in `Error`.
    pub(crate) fn fault_reason(registry: &NodeRegistry) -> String {
        registry
            .enabled()
            .find(|n| n.state().is_faulted())
            .map(|n| format!("node '{}' is {}", n.identity(), n.state()))
            .unwrap_or_default()
    }

    pub fn aggregate(registry: &NodeRegistry, current: NodeState) -> NodeState {
        let mut enabled = registry.enabled().map(|n| n.state()).peekable();
        let Some(&first) = enabled.peek() else {
            return current;
        };

        let mut common = Some(first);
        for s in enabled {
            if s.is_faulted() {
                return NodeState::Error;
            }
            if common != Some(s) {
                common = None;
            }
        }
        match common {
            Some(s) if s.is_stable() => s,
            _ => current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MemoryLink;
    use crate::nodes::{Node, NodeState::*};

    fn fleet(states: &[(&str, NodeState, NodeState)]) -> (MemoryLink, NodeRegistry) {
        let link = MemoryLink::new();
        let mut reg = NodeRegistry::new();
        for (id, known, live) in states {
            link.add_node(id, *live);
            let mut node = Node::new(*id, "");
            node.set_state(*known);
            reg.insert(node).unwrap();
        }
        (link, reg)
    }

    fn kinds(events: &[Event]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[tokio::test]
    async fn live_state_wins_and_aggregate_follows() {
        let (link, mut reg) = fleet(&[("a", RampingUp, Peak), ("b", RampingUp, Peak)]);
        let monitor = Monitor::new(Duration::from_millis(100));

        let rec = monitor.reconcile(&mut reg, &link, RampingUp).await;

        assert_eq!(rec.aggregate, Peak);
        assert_eq!(reg.get("a").unwrap().state(), Peak);
        assert_eq!(
            kinds(&rec.events),
            [
                EventKind::StateChangedExternally,
                EventKind::StateChangedExternally,
                EventKind::AggregateTransitioned
            ]
        );
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let (link, mut reg) = fleet(&[("a", Unknown, Standby), ("b", Standby, Shoulder)]);
        let monitor = Monitor::new(Duration::from_millis(100));

        let first = monitor.reconcile(&mut reg, &link, Unknown).await;
        assert!(!first.events.is_empty());

        let second = monitor.reconcile(&mut reg, &link, first.aggregate).await;
        assert_eq!(second.aggregate, first.aggregate);
        assert!(second.events.is_empty());
    }

    #[tokio::test]
    async fn one_unreachable_node_forces_error_once() {
        let (link, mut reg) = fleet(&[("a", Peak, Peak), ("b", Peak, Peak), ("c", Peak, Peak)]);
        link.set_reachable("b", false);
        let monitor = Monitor::new(Duration::from_millis(100));

        let rec = monitor.reconcile(&mut reg, &link, Peak).await;
        assert_eq!(rec.aggregate, Error);
        assert_eq!(
            kinds(&rec.events),
            [
                EventKind::NodeLost,
                EventKind::AggregateTransitioned,
                EventKind::Degraded
            ]
        );
        assert_eq!(rec.events[0].node.as_deref(), Some("b"));

        let again = monitor.reconcile(&mut reg, &link, rec.aggregate).await;
        assert_eq!(again.aggregate, Error);
        assert!(again.events.is_empty(), "unknown + failure stays silent");
    }

    #[tokio::test]
    async fn recovered_node_clears_error_when_all_agree() {
        let (link, mut reg) = fleet(&[("a", Off, Off), ("b", Unknown, Off)]);
        let monitor = Monitor::new(Duration::from_millis(100));

        let rec = monitor.reconcile(&mut reg, &link, Error).await;
        assert_eq!(rec.aggregate, Off);
        assert_eq!(
            kinds(&rec.events),
            [EventKind::NodeRecovered, EventKind::AggregateTransitioned]
        );
    }

    #[tokio::test]
    async fn mixed_states_keep_previous_aggregate() {
        let (link, mut reg) = fleet(&[("a", Standby, Standby), ("b", Peak, Peak)]);
        let monitor = Monitor::new(Duration::from_millis(100));

        let rec = monitor.reconcile(&mut reg, &link, Shoulder).await;
        assert_eq!(rec.aggregate, Shoulder);
        assert!(rec.events.is_empty());
    }

    #[tokio::test]
    async fn disabled_nodes_are_ignored() {
        let (link, mut reg) = fleet(&[("a", Standby, Standby), ("b", Error, Error)]);
        reg.set_enabled("b", false).unwrap();
        let monitor = Monitor::new(Duration::from_millis(100));

        let rec = monitor.reconcile(&mut reg, &link, Unknown).await;
        assert_eq!(rec.aggregate, Standby);

        reg.set_enabled("a", false).unwrap();
        assert_eq!(Monitor::aggregate(&reg, Standby), Standby);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_query_counts_as_lost() {
        let (link, mut reg) = fleet(&[("a", Standby, Standby)]);
        link.set_hanging("a", true);
        let monitor = Monitor::new(Duration::from_millis(50));

        let rec = monitor.reconcile(&mut reg, &link, Standby).await;
        assert_eq!(reg.get("a").unwrap().state(), Unknown);
        assert_eq!(rec.aggregate, Error);
        assert_eq!(rec.events[0].kind, EventKind::NodeLost);
    }
}
