use std::collections::HashMap;

use super::{ConfigError, ConfigStore, ensure_unique};
use crate::nodes::NodeDescriptor;

/// In-memory node sets keyed by descriptor.
#[derive(Debug, Clone, Default)]
pub struct StaticStore {
    sets: HashMap<String, Vec<NodeDescriptor>>,
}

impl StaticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a node set.
    #[must_use]
    pub fn with_set(mut self, descriptor: &str, nodes: Vec<NodeDescriptor>) -> Self {
        self.sets.insert(descriptor.to_string(), nodes);
        self
    }
}

impl ConfigStore for StaticStore {
    fn load(&self, descriptor: &str) -> Result<Vec<NodeDescriptor>, ConfigError> {
        let nodes = self
            .sets
            .get(descriptor)
            .cloned()
            .ok_or_else(|| ConfigError::NotFound {
                descriptor: descriptor.to_string(),
            })?;
        ensure_unique(&nodes)?;
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_in_order() {
        let store = StaticStore::new().with_set(
            "hv",
            vec![NodeDescriptor::new("b", "x"), NodeDescriptor::new("a", "y")],
        );
        let nodes = store.load("hv").unwrap();
        assert_eq!(nodes[0].identity, "b");
        assert_eq!(nodes[1].identity, "a");
    }

    #[test]
    fn missing_and_duplicate_sets_fail() {
        let store = StaticStore::new().with_set(
            "dup",
            vec![NodeDescriptor::new("a", ""), NodeDescriptor::new("a", "")],
        );
        assert_eq!(store.load("none").unwrap_err().as_label(), "config_not_found");
        assert_eq!(store.load("dup").unwrap_err().as_label(), "config_duplicate");
    }
}
