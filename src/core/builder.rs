//! # SupervisorBuilder: assembles a [`Supervisor`] from its parts.
//!
//! Loads the node set, creates the event bus and starts subscriber workers.

use std::sync::Arc;

use crate::catalog::CommandCatalog;
use crate::error::ControlError;
use crate::events::Bus;
use crate::link::Link;
use crate::nodes::{NodeDescriptor, NodeRegistry};
use crate::store::{ConfigError, ConfigStore};
use crate::subscribers::{Subscribe, SubscriberSet};

use super::config::Config;
use super::supervisor::{Parts, Supervisor};

/// Builder for constructing a [`Supervisor`].
///
/// The node set comes either from [`with_nodes`](Self::with_nodes) or, when
/// [`with_node_set`](Self::with_node_set) is given, from the configured
/// [`ConfigStore`].
pub struct SupervisorBuilder {
    cfg: Config,
    link: Arc<dyn Link>,
    catalog: CommandCatalog,
    nodes: Vec<NodeDescriptor>,
    store: Option<Arc<dyn ConfigStore>>,
    node_set: Option<String>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder talking to the endpoints through `link`.
    pub fn new(cfg: Config, link: Arc<dyn Link>) -> Self {
        Self {
            cfg,
            link,
            catalog: CommandCatalog::standard(),
            nodes: Vec::new(),
            store: None,
            node_set: None,
            subscribers: Vec::new(),
        }
    }

    /// Replaces the standard command catalog.
    pub fn with_catalog(mut self, catalog: CommandCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Initial node set, in dispatch order.
    pub fn with_nodes(mut self, nodes: Vec<NodeDescriptor>) -> Self {
        self.nodes = nodes;
        self
    }

    /// Store used by [`Supervisor::reconfigure`] (and by `build` with a node set name).
    pub fn with_store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Loads the initial node set from the store instead of [`with_nodes`](Self::with_nodes).
    pub fn with_node_set(mut self, descriptor: impl Into<String>) -> Self {
        self.node_set = Some(descriptor.into());
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive supervisor events through dedicated workers with
    /// bounded queues. Spawning them requires a Tokio runtime.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the supervisor: loads the node set, creates the bus and starts
    /// subscriber workers.
    pub fn build(self) -> Result<Supervisor, ControlError> {
        let Self {
            cfg,
            link,
            catalog,
            nodes,
            store,
            node_set,
            subscribers,
        } = self;

        let descriptors = match (node_set, &store) {
            (Some(name), Some(store)) => store.load(&name)?,
            (Some(name), None) => return Err(ConfigError::NotFound { descriptor: name }.into()),
            (None, _) => nodes,
        };
        let registry = NodeRegistry::from_descriptors(descriptors)?;

        let bus = Bus::new(cfg.bus_capacity());
        let subs = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        let listener = Supervisor::spawn_listener(&bus, subs);

        Ok(Supervisor::new_internal(Parts {
            cfg,
            bus,
            listener,
            link,
            catalog: Arc::new(catalog),
            registry,
            store,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MemoryLink;
    use crate::store::StaticStore;

    #[test]
    fn duplicate_nodes_fail_the_build() {
        let err = SupervisorBuilder::new(Config::default(), Arc::new(MemoryLink::new()))
            .with_nodes(vec![NodeDescriptor::new("a", ""), NodeDescriptor::new("a", "")])
            .build()
            .err()
            .unwrap();
        assert_eq!(err.as_label(), "registry_error");
    }

    #[test]
    fn node_set_is_loaded_from_store() {
        let store = StaticStore::new().with_set(
            "arich",
            vec![NodeDescriptor::new("x", "cx"), NodeDescriptor::new("y", "cy").disabled()],
        );
        let sup = SupervisorBuilder::new(Config::default(), Arc::new(MemoryLink::new()))
            .with_store(Arc::new(store))
            .with_node_set("arich")
            .build()
            .unwrap();

        let ids: Vec<_> = sup.registry().iter().map(|n| n.identity()).collect();
        assert_eq!(ids, ["x", "y"]);
        assert!(!sup.registry().get("y").unwrap().enabled());
        assert_eq!(sup.status().nodes.len(), 2);
    }

    #[test]
    fn node_set_without_store_is_not_found() {
        let err = SupervisorBuilder::new(Config::default(), Arc::new(MemoryLink::new()))
            .with_node_set("arich")
            .build()
            .err()
            .unwrap();
        assert_eq!(err.as_label(), "config_error");
    }
}
