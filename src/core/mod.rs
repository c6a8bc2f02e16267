//! Supervisory core: the loop and the components it owns.
//!
//! The public entry points are [`SupervisorBuilder`], [`Supervisor`] and
//! [`SupervisorHandle`]; the components are public so they can be driven and
//! tested on their own.
//!
//! Internal modules:
//! - [`distributor`]: sends one command to every enabled node, optimistic update;
//! - [`monitor`]: polls nodes, authoritative update, aggregate recomputation;
//! - [`orchestrator`]: multi-round load sequence towards a target level;
//! - [`fsm`]: aggregate state, demand, load progress;
//! - [`supervisor`]: owns all of the above and serializes every mutation;
//! - `handle`: channel-backed request surface;
//! - `shutdown`: OS termination signals.

mod builder;
mod config;
pub mod distributor;
pub mod fsm;
mod handle;
pub mod monitor;
pub mod orchestrator;
mod shutdown;
mod status;
pub mod supervisor;

pub use builder::SupervisorBuilder;
pub use config::Config;
pub use distributor::{DispatchReport, Distributor, NodeFailure};
pub use fsm::SupervisorFsm;
pub use handle::SupervisorHandle;
pub use monitor::{Monitor, Reconciliation};
pub use orchestrator::{LoadProgress, Orchestrator};
pub use status::{NodeStatus, Status};
pub use supervisor::{Supervisor, TickReport};
