//! Supervisor events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor` (monitor results, dispatch outcomes,
//!   operator requests), `Orchestrator` (ready/abort), `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: the supervisor's listener task (fans out to
//!   `SubscriberSet`) and any receiver from `Supervisor::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
