//! Data model of managed endpoints.
//!
//! ## Contents
//! - [`NodeState`], [`Command`] state and command enumerations
//! - [`Node`], [`NodeDescriptor`] one endpoint and its configuration entry
//! - [`NodeRegistry`] ordered, identity-indexed node set with [`Direction`]

mod node;
mod registry;
mod state;

pub use node::{Node, NodeDescriptor};
pub use registry::{Direction, MergeSummary, NodeRegistry, RegistryError};
pub use state::{Command, NodeState};
