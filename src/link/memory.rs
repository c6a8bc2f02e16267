//! # MemoryLink: in-process simulated fleet.
//!
//! Each simulated endpoint follows the same ladder as real power-supply
//! controllers: a command moves it into a transitional state and it reaches
//! the requested stable level only when [`MemoryLink::settle`] is called
//! (standing in for the hardware's ramp time).
//!
//! Failure knobs per endpoint:
//! - [`set_reachable`](MemoryLink::set_reachable): `false` → `Unreachable` on send and query
//! - [`inject_fault`](MemoryLink::inject_fault): sends fail with a transport `Fault`
//! - [`set_hanging`](MemoryLink::set_hanging): calls never answer (exercises timeouts)
//!
//! Every accepted send is appended to a journal ([`MemoryLink::sent`]) so tests
//! can check visiting order.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{Link, LinkError};
use crate::nodes::{Command, NodeState};

#[derive(Debug, Clone)]
struct SimNode {
    state: NodeState,
    settle_to: Option<NodeState>,
    reachable: bool,
    fault: bool,
    hanging: bool,
    config: Option<String>,
}

impl SimNode {
    fn new(state: NodeState) -> Self {
        Self {
            state,
            settle_to: None,
            reachable: true,
            fault: false,
            hanging: false,
            config: None,
        }
    }

    fn begin(&mut self, via: NodeState, to: NodeState) {
        self.state = via;
        self.settle_to = Some(to);
    }

    fn apply(&mut self, command: Command, payload: Option<&str>) -> Result<(), LinkError> {
        use NodeState::*;

        match command {
            Command::Configure => {
                self.config = payload.map(str::to_string);
                Ok(())
            }
            Command::TurnOn => match self.state {
                Off => {
                    self.begin(TurningOn, Standby);
                    Ok(())
                }
                other => Err(refused(command, other)),
            },
            Command::TurnOff => match self.state {
                Off => Ok(()),
                Standby | Shoulder | Peak => {
                    self.begin(TurningOff, Off);
                    Ok(())
                }
                other => Err(refused(command, other)),
            },
            Command::Recover => match self.state {
                Off => Ok(()),
                _ => {
                    self.begin(TurningOff, Off);
                    Ok(())
                }
            },
            Command::Standby | Command::Shoulder | Command::Peak => {
                let target = match command {
                    Command::Standby => Standby,
                    Command::Shoulder => Shoulder,
                    _ => Peak,
                };
                match (self.state.rank(), target.rank()) {
                    (Some(cur), Some(want)) if cur > 0 => {
                        if want > cur {
                            self.begin(RampingUp, target);
                        } else if want < cur {
                            self.begin(RampingDown, target);
                        }
                        Ok(())
                    }
                    _ => Err(refused(command, self.state)),
                }
            }
        }
    }
}

fn refused(command: Command, state: NodeState) -> LinkError {
    LinkError::Refused {
        reason: format!("{command} not applicable in {state}"),
    }
}

#[derive(Debug, Default)]
struct Inner {
    nodes: HashMap<String, SimNode>,
    sent: Vec<(String, Command)>,
}

/// Simulated fleet implementing [`Link`].
#[derive(Debug, Default)]
pub struct MemoryLink {
    inner: Mutex<Inner>,
}

impl MemoryLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`add_node`](Self::add_node).
    #[must_use]
    pub fn with_node(self, identity: &str, state: NodeState) -> Self {
        self.add_node(identity, state);
        self
    }

    /// Registers (or resets) a simulated endpoint.
    pub fn add_node(&self, identity: &str, state: NodeState) {
        self.lock()
            .nodes
            .insert(identity.to_string(), SimNode::new(state));
    }

    /// Forces the live state, as if changed by someone else (front panel, interlock).
    pub fn set_state(&self, identity: &str, state: NodeState) {
        if let Some(n) = self.lock().nodes.get_mut(identity) {
            n.state = state;
            n.settle_to = None;
        }
    }

    /// Live state of a simulated endpoint.
    pub fn state(&self, identity: &str) -> Option<NodeState> {
        self.lock().nodes.get(identity).map(|n| n.state)
    }

    /// Last payload received with `Configure`.
    pub fn configured(&self, identity: &str) -> Option<String> {
        self.lock().nodes.get(identity).and_then(|n| n.config.clone())
    }

    pub fn set_reachable(&self, identity: &str, reachable: bool) {
        if let Some(n) = self.lock().nodes.get_mut(identity) {
            n.reachable = reachable;
        }
    }

    /// Makes sends to `identity` fail with [`LinkError::Fault`].
    pub fn inject_fault(&self, identity: &str, fault: bool) {
        if let Some(n) = self.lock().nodes.get_mut(identity) {
            n.fault = fault;
        }
    }

    /// Makes every call to `identity` wait forever.
    pub fn set_hanging(&self, identity: &str, hanging: bool) {
        if let Some(n) = self.lock().nodes.get_mut(identity) {
            n.hanging = hanging;
        }
    }

    /// Completes every pending ramp.
    pub fn settle(&self) {
        for n in self.lock().nodes.values_mut() {
            if let Some(to) = n.settle_to.take() {
                n.state = to;
            }
        }
    }

    /// Completes the pending ramp of one endpoint.
    pub fn settle_node(&self, identity: &str) {
        if let Some(n) = self.lock().nodes.get_mut(identity) {
            if let Some(to) = n.settle_to.take() {
                n.state = to;
            }
        }
    }

    /// Journal of accepted sends, oldest first.
    pub fn sent(&self) -> Vec<(String, Command)> {
        self.lock().sent.clone()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn hangs(&self, identity: &str) -> bool {
        self.lock().nodes.get(identity).is_some_and(|n| n.hanging)
    }
}

#[async_trait]
impl Link for MemoryLink {
    async fn send(
        &self,
        node: &str,
        command: Command,
        payload: Option<&str>,
    ) -> Result<(), LinkError> {
        if self.hangs(node) {
            std::future::pending::<()>().await;
        }

        let mut inner = self.lock();
        let sim = inner.nodes.get_mut(node).ok_or_else(|| LinkError::Unreachable {
            reason: format!("no endpoint '{node}'"),
        })?;

        if !sim.reachable {
            return Err(LinkError::Unreachable {
                reason: format!("'{node}' not responding"),
            });
        }
        if sim.fault {
            return Err(LinkError::Fault {
                reason: format!("protocol error talking to '{node}'"),
            });
        }

        sim.apply(command, payload)?;
        inner.sent.push((node.to_string(), command));
        Ok(())
    }

    async fn query(&self, node: &str) -> Result<NodeState, LinkError> {
        if self.hangs(node) {
            std::future::pending::<()>().await;
        }

        let inner = self.lock();
        match inner.nodes.get(node) {
            Some(sim) if sim.reachable => Ok(sim.state),
            Some(_) => Err(LinkError::Unreachable {
                reason: format!("'{node}' not responding"),
            }),
            None => Err(LinkError::Unreachable {
                reason: format!("no endpoint '{node}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ramps_settle_to_requested_level() {
        let link = MemoryLink::new().with_node("n1", NodeState::Standby);

        link.send("n1", Command::Peak, None).await.unwrap();
        assert_eq!(link.query("n1").await.unwrap(), NodeState::RampingUp);

        link.settle();
        assert_eq!(link.query("n1").await.unwrap(), NodeState::Peak);

        link.send("n1", Command::Shoulder, None).await.unwrap();
        assert_eq!(link.state("n1"), Some(NodeState::RampingDown));
    }

    #[tokio::test]
    async fn inapplicable_command_is_refused() {
        let link = MemoryLink::new().with_node("n1", NodeState::Off);
        let err = link.send("n1", Command::Peak, None).await.unwrap_err();
        assert_eq!(err.as_label(), "link_refused");
        assert!(link.sent().is_empty());
    }

    #[tokio::test]
    async fn fault_and_unreachable_are_distinct() {
        let link = MemoryLink::new()
            .with_node("a", NodeState::Off)
            .with_node("b", NodeState::Off);
        link.inject_fault("a", true);
        link.set_reachable("b", false);

        assert!(link.send("a", Command::TurnOn, None).await.unwrap_err().is_fault());
        assert!(!link.send("b", Command::TurnOn, None).await.unwrap_err().is_fault());
        assert!(link.query("b").await.is_err());
    }
}
