//! Process-wide cluster registry.
//!
//! Connection topologies are expensive to build, so clusters are cached by
//! their ordered node list: two adapters configured with the identical list
//! share one [`Cluster`] handle for the life of the process. The key is the
//! descriptor list as given: the same nodes in a different order are a
//! distinct cluster.
//!
//! The registry is an explicitly owned object, created once at startup and
//! passed down to adapters, rather than hidden module-level state.

use crate::backend::Connector;
use crate::cluster::Cluster;
use crate::config::NodeDescriptor;
use crate::error::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Cache of constructed [`Cluster`] handles, keyed by ordered node list.
pub struct ClusterRegistry {
    connector: Box<dyn Connector>,
    clusters: RwLock<HashMap<Vec<NodeDescriptor>, Arc<Cluster>>>,
}

impl ClusterRegistry {
    /// Create a registry that connects nodes through the given connector.
    pub fn new(connector: impl Connector + 'static) -> Self {
        Self {
            connector: Box::new(connector),
            clusters: RwLock::new(HashMap::new()),
        }
    }

    /// Return the cluster for a node list, constructing it on first use.
    ///
    /// Construction happens under the write lock, so concurrent first-time
    /// callers for the same list block and then reuse the winner's cluster;
    /// two clusters are never registered for one key.
    pub fn get_or_create(&self, nodes: &[NodeDescriptor]) -> Result<Arc<Cluster>> {
        {
            let clusters = self.clusters.read().unwrap();
            if let Some(cluster) = clusters.get(nodes) {
                return Ok(Arc::clone(cluster));
            }
        }

        let mut clusters = self.clusters.write().unwrap();
        // Re-check: another caller may have won the race while we waited
        if let Some(cluster) = clusters.get(nodes) {
            return Ok(Arc::clone(cluster));
        }

        let cluster = Arc::new(Cluster::connect(nodes.to_vec(), self.connector.as_ref())?);
        clusters.insert(nodes.to_vec(), Arc::clone(&cluster));
        Ok(cluster)
    }

    /// Number of distinct clusters constructed so far.
    pub fn len(&self) -> usize {
        self.clusters.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
