//! Cluster handles: a fixed set of backend nodes plus the hash ring that
//! routes keys onto them.
//!
//! A [`Cluster`] is created once per distinct node list (see
//! [`ClusterRegistry`](crate::registry::ClusterRegistry)) and its membership
//! never changes afterwards. Single-key calls route through the ring to one
//! node; multi-key calls go through [`BatchRequest`], which groups
//! operations by target node and issues each node's sub-batch as a single
//! pipelined round-trip.

mod batch;

pub use batch::{BatchRequest, BatchResults, OpHandle};

use crate::backend::{Backend, Connector, Op, OpResult};
use crate::config::NodeDescriptor;
use crate::error::{CacheError, Result};
use crate::ring::HashRing;
use std::sync::Arc;
use tracing::{info, warn};

/// A routable set of backend nodes, fixed at creation.
pub struct Cluster {
    descriptors: Vec<NodeDescriptor>,
    backends: Vec<Arc<dyn Backend>>,
    ring: HashRing,
}

impl Cluster {
    /// Connect every descriptor through the connector and build the ring.
    pub(crate) fn connect(
        descriptors: Vec<NodeDescriptor>,
        connector: &dyn Connector,
    ) -> Result<Self> {
        if descriptors.is_empty() {
            return Err(CacheError::Config(
                "a cluster requires at least one node".to_string(),
            ));
        }

        let identities: Vec<String> = descriptors.iter().map(|d| d.identity()).collect();
        info!("creating cache cluster for nodes {:?}", identities);

        let backends = descriptors
            .iter()
            .map(|node| connector.connect(node))
            .collect::<Result<Vec<_>>>()?;
        let ring = HashRing::new(&identities);

        Ok(Self {
            descriptors,
            backends,
            ring,
        })
    }

    /// The configured nodes, in configuration order.
    pub fn descriptors(&self) -> &[NodeDescriptor] {
        &self.descriptors
    }

    /// Index of the node a key routes to.
    pub fn route_index(&self, key: &str) -> usize {
        self.ring.node_for(key.as_bytes())
    }

    /// The backend a key routes to.
    pub fn route(&self, key: &str) -> &Arc<dyn Backend> {
        &self.backends[self.route_index(key)]
    }

    pub(crate) fn descriptor(&self, index: usize) -> &NodeDescriptor {
        &self.descriptors[index]
    }

    pub(crate) fn backend(&self, index: usize) -> &Arc<dyn Backend> {
        &self.backends[index]
    }

    /// Iterate nodes with their backends, in configuration order.
    pub fn nodes(&self) -> impl Iterator<Item = (&NodeDescriptor, &Arc<dyn Backend>)> {
        self.descriptors.iter().zip(self.backends.iter())
    }

    /// Execute a batch: operations are grouped by target node, each node's
    /// sub-batch runs as one pipelined round-trip in submission order, and
    /// results are correlated back to the submitted handles.
    ///
    /// Best-effort across nodes: a failing node does not stop the others.
    /// Failures on `fail_silently` nodes leave their results absent; on
    /// strict nodes the first failure is returned after every node has
    /// been attempted.
    pub fn execute(&self, batch: BatchRequest) -> Result<BatchResults> {
        let mut per_node: Vec<Vec<usize>> = vec![Vec::new(); self.backends.len()];
        for (index, op) in batch.ops.iter().enumerate() {
            per_node[self.ring.node_for(op.key().as_bytes())].push(index);
        }

        let mut results: Vec<Option<OpResult>> = vec![None; batch.ops.len()];
        let mut first_error = None;

        for (node, indices) in per_node.iter().enumerate() {
            if indices.is_empty() {
                continue;
            }

            let sub_batch: Vec<Op> = indices.iter().map(|&i| batch.ops[i].clone()).collect();
            match self.backends[node].pipeline(sub_batch) {
                Ok(node_results) => {
                    for (&index, result) in indices.iter().zip(node_results) {
                        results[index] = Some(result);
                    }
                }
                Err(err) if self.descriptors[node].fail_silently => {
                    warn!(
                        "node {} failed during batch, treating as miss: {}",
                        self.descriptors[node], err
                    );
                }
                Err(err) => {
                    warn!("node {} failed during batch: {}", self.descriptors[node], err);
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(BatchResults { results }),
        }
    }
}
