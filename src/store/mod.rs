//! # Configuration store: where node sets come from.
//!
//! A node set is named by a *descriptor* (e.g. `"arich-hv"`) and resolves to an
//! ordered list of [`NodeDescriptor`]s. The supervisor merges that list into its
//! [`NodeRegistry`](crate::NodeRegistry) at start-up and on every reconfiguration.
//!
//! ## Implementations
//! - [`StaticStore`]: in-memory sets (tests, embedded use)
//! - [`TomlStore`]: one `<descriptor>.toml` file per set (feature `toml-store`)
//!
//! ## Rules
//! - Order is preserved: it becomes the forward dispatch order.
//! - Duplicate identities inside one set are rejected by the store.

mod static_store;
#[cfg(feature = "toml-store")]
mod toml_store;

use std::collections::HashSet;

use thiserror::Error;

use crate::nodes::NodeDescriptor;

pub use static_store::StaticStore;
#[cfg(feature = "toml-store")]
pub use toml_store::TomlStore;

/// Node-set loading errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No node set under that descriptor.
    #[error("node set '{descriptor}' not found")]
    NotFound { descriptor: String },

    /// Descriptor is not a plain name.
    #[error("invalid node set descriptor '{descriptor}'")]
    InvalidDescriptor { descriptor: String },

    /// The backing file could not be read.
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    /// The backing document is malformed.
    #[error("cannot parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// The same identity appears twice in one node set.
    #[error("duplicate node '{identity}' in node set")]
    Duplicate { identity: String },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NotFound { .. } => "config_not_found",
            ConfigError::InvalidDescriptor { .. } => "config_invalid_descriptor",
            ConfigError::Io { .. } => "config_io",
            ConfigError::Parse { .. } => "config_parse",
            ConfigError::Duplicate { .. } => "config_duplicate",
        }
    }
}

/// Source of node sets.
pub trait ConfigStore: Send + Sync + 'static {
    /// Ordered node list of the set named `descriptor`.
    fn load(&self, descriptor: &str) -> Result<Vec<NodeDescriptor>, ConfigError>;
}

/// Rejects node lists that repeat an identity.
pub(crate) fn ensure_unique(nodes: &[NodeDescriptor]) -> Result<(), ConfigError> {
    let mut seen = HashSet::with_capacity(nodes.len());
    for n in nodes {
        if !seen.insert(n.identity.as_str()) {
            return Err(ConfigError::Duplicate {
                identity: n.identity.clone(),
            });
        }
    }
    Ok(())
}
