//! # fleetvisor
//!
//! **Fleetvisor** is a supervisory controller for fleets of hardware-control
//! endpoints ("nodes"), such as the high-voltage power supplies of detector
//! modules.
//!
//! It sends commands to every enabled node, keeps an optimistic view of
//! where each node is heading, reconciles that view against the state the
//! endpoints report, derives one aggregate state for the whole fleet, and
//! ramps the fleet up level by level.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   operator ──► SupervisorHandle ──► [request queue]
//!                                           │
//! ┌─────────────────────────────────────────▼─────────────────────────┐
//! │  Supervisor (single loop, owns all mutable state)                 │
//! │  - SupervisorFsm   aggregate / demand / load progress             │
//! │  - CommandCatalog  demand, precondition, transitional per command │
//! │  - NodeRegistry    ordered nodes, identity index                  │
//! │  - Distributor     command → every enabled node (optimistic)      │
//! │  - Monitor         query → every enabled node (authoritative)     │
//! │  - Orchestrator    staged load sequence                           │
//! └──────┬─────────────────────────────┬──────────────────────┬───────┘
//!        │ send / query                │ publish(Event)       │ send_replace(Status)
//!        ▼                             ▼                      ▼
//!   dyn Link (transport)      Bus ──► SubscriberSet      watch::Receiver
//!        │                              ├─► LogWriter
//!        ▼                              └─► custom subscribers
//!   endpoints (hv-01, hv-02, ...)
//! ```
//!
//! ### State ladder
//! ```text
//! Off ──TurnOn──► TurningOn ──► Standby ──► RampingUp ──► Shoulder ──► RampingUp ──► Peak
//!  ▲                               │                         │                        │
//!  └──────── TurningOff ◄──────────┴─────── RampingDown ◄────┴────────────────────────┘
//! Unknown: no answer from the endpoint    Error: endpoint reports a fault
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                          |
//! |-------------------|-------------------------------------------------------------|---------------------------------------------|
//! | **Supervision**   | Serialized control loop, commands, ticks, load sequences.   | [`Supervisor`], [`SupervisorHandle`]        |
//! | **Commands**      | Table-driven command semantics.                             | [`CommandCatalog`], [`CatalogEntry`]        |
//! | **Messaging**     | Seam to the transport, plus a simulated fleet.              | [`Link`], [`MemoryLink`]                    |
//! | **Node sets**     | Ordered registry, reconfiguration from stores.              | [`NodeRegistry`], [`ConfigStore`]           |
//! | **Subscriber API**| Hook into supervisor events (logging, telemetry, alarms).   | [`Subscribe`]                               |
//! | **Errors**        | Typed errors with stable labels.                            | [`ControlError`], [`LinkError`]             |
//! | **Configuration** | Runtime knobs, loadable from TOML.                          | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging` _(default)_: exports [`LogWriter`], a `tracing`-backed subscriber.
//! - `toml-store` _(default)_: exports [`TomlStore`] and `Config::from_toml_str`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use fleetvisor::{Config, MemoryLink, NodeDescriptor, NodeState, SupervisorBuilder};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), fleetvisor::ControlError> {
//!     let link = Arc::new(
//!         MemoryLink::new()
//!             .with_node("hv-01", NodeState::Off)
//!             .with_node("hv-02", NodeState::Off),
//!     );
//!     let cfg = Config {
//!         poll_interval: Duration::from_millis(10),
//!         handle_signals: false,
//!         ..Config::default()
//!     };
//!
//!     let sup = SupervisorBuilder::new(cfg, link.clone())
//!         .with_nodes(vec![
//!             NodeDescriptor::new("hv-01", "sector1"),
//!             NodeDescriptor::new("hv-02", "sector2"),
//!         ])
//!         .build()?;
//!     let handle = sup.handle();
//!
//!     let token = CancellationToken::new();
//!     let running = tokio::spawn(sup.run(token.clone()));
//!
//!     let mut status = handle.watch();
//!     status.wait_for(|s| s.aggregate == NodeState::Off).await.ok();
//!     handle.load(NodeState::Standby).await?;
//!
//!     link.settle();
//!     status.wait_for(|s| s.aggregate == NodeState::Standby).await.ok();
//!
//!     token.cancel();
//!     running.await.ok();
//!     Ok(())
//! }
//! ```

mod catalog;
mod core;
mod error;
mod events;
mod link;
mod nodes;
mod store;
mod subscribers;

// ---- Public re-exports ----

pub use catalog::{CatalogEntry, CommandCatalog, Precondition};
pub use crate::core::{
    Config, DispatchReport, Distributor, LoadProgress, Monitor, NodeFailure, NodeStatus,
    Orchestrator, Reconciliation, Status, Supervisor, SupervisorBuilder, SupervisorFsm,
    SupervisorHandle, TickReport,
};
pub use error::ControlError;
pub use events::{Bus, Event, EventKind};
pub use link::{Link, LinkError, MemoryLink};
pub use nodes::{
    Command, Direction, MergeSummary, Node, NodeDescriptor, NodeRegistry, NodeState,
    RegistryError,
};
pub use store::{ConfigError, ConfigStore, StaticStore};
pub use subscribers::{Subscribe, SubscriberSet};

#[cfg(feature = "toml-store")]
pub use store::TomlStore;

#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
