//! # SupervisorHandle: requests into a running supervisor.
//!
//! Each call is one [`Request`] on a bounded mpsc queue with a oneshot reply;
//! the loop serves it between ticks.

use tokio::sync::{mpsc, oneshot, watch};

use crate::error::ControlError;
use crate::nodes::{Command, MergeSummary, NodeState};

use super::distributor::DispatchReport;
use super::orchestrator::LoadProgress;
use super::status::Status;

type Reply<T> = oneshot::Sender<Result<T, ControlError>>;

/// Operator request served by the supervisory loop.
pub(crate) enum Request {
    Submit {
        command: Command,
        payload: Option<String>,
        reply: Reply<DispatchReport>,
    },
    Load {
        target: NodeState,
        reply: Reply<LoadProgress>,
    },
    Reconfigure {
        descriptor: String,
        reply: Reply<MergeSummary>,
    },
    SetEnabled {
        identity: String,
        enabled: bool,
        reply: Reply<()>,
    },
    Rearm {
        reply: oneshot::Sender<bool>,
    },
}

/// Handle for talking to a running [`Supervisor`](crate::Supervisor).
///
/// Every call is queued on the supervisor's request channel and answered from
/// its loop, so requests are serialized with ticks. Once the loop has exited
/// every call fails with [`ControlError::Closed`].
#[derive(Clone)]
pub struct SupervisorHandle {
    tx: mpsc::Sender<Request>,
    status: watch::Receiver<Status>,
}

impl SupervisorHandle {
    pub(crate) fn new(tx: mpsc::Sender<Request>, status: watch::Receiver<Status>) -> Self {
        Self { tx, status }
    }

    /// Submits a command (waits if the request queue is full).
    pub async fn submit(
        &self,
        command: Command,
        payload: Option<String>,
    ) -> Result<DispatchReport, ControlError> {
        self.call(|reply| Request::Submit {
            command,
            payload,
            reply,
        })
        .await
    }

    /// Starts a load sequence towards `target` and runs its first round.
    pub async fn load(&self, target: NodeState) -> Result<LoadProgress, ControlError> {
        self.call(|reply| Request::Load { target, reply }).await
    }

    /// Reloads the node set named `descriptor` from the configured store.
    pub async fn reconfigure(&self, descriptor: impl Into<String>) -> Result<MergeSummary, ControlError> {
        let descriptor = descriptor.into();
        self.call(|reply| Request::Reconfigure { descriptor, reply })
            .await
    }

    pub async fn set_enabled(&self, identity: impl Into<String>, enabled: bool) -> Result<(), ControlError> {
        let identity = identity.into();
        self.call(|reply| Request::SetEnabled {
            identity,
            enabled,
            reply,
        })
        .await
    }

    /// Re-arms dispatch after a link fault. Returns `true` if it was disarmed.
    pub async fn rearm(&self) -> Result<bool, ControlError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Rearm { reply })
            .await
            .map_err(|_| ControlError::Closed)?;
        rx.await.map_err(|_| ControlError::Closed)
    }

    /// Latest published snapshot.
    pub fn status(&self) -> Status {
        self.status.borrow().clone()
    }

    /// Receiver that is notified on every new snapshot.
    pub fn watch(&self) -> watch::Receiver<Status> {
        self.status.clone()
    }

    async fn call<T>(&self, make: impl FnOnce(Reply<T>) -> Request) -> Result<T, ControlError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ControlError::Closed)?;
        rx.await.map_err(|_| ControlError::Closed)?
    }
}
