//! Consistent-hash ring.
//!
//! Each node contributes a number of replica positions on a 64-bit ring;
//! a key is hashed with the same function and routed to the first position
//! clockwise from its hash. This keeps routing deterministic for a fixed
//! node set and bounds remapping if the node set is ever extended, which
//! plain `hash(key) % n` cannot do.
//!
//! Positions are derived from SHA-1 digests so the ring layout is stable
//! across processes and restarts.

use sha1::{Digest, Sha1};
use std::collections::BTreeMap;

/// Replica positions each node contributes to the ring.
pub const DEFAULT_REPLICAS: usize = 40;

/// Ring mapping hash positions to node indices.
#[derive(Debug, Clone)]
pub struct HashRing {
    positions: BTreeMap<u64, usize>,
}

impl HashRing {
    /// Build a ring from node identities (`host:port/db`), one entry per
    /// node, with [`DEFAULT_REPLICAS`] positions each.
    pub fn new(identities: &[String]) -> Self {
        Self::with_replicas(identities, DEFAULT_REPLICAS)
    }

    /// Build a ring with an explicit replica count per node.
    pub fn with_replicas(identities: &[String], replicas: usize) -> Self {
        let mut positions = BTreeMap::new();
        for (index, identity) in identities.iter().enumerate() {
            for replica in 0..replicas {
                let position = hash_position(format!("{}-{}", identity, replica).as_bytes());
                positions.insert(position, index);
            }
        }
        Self { positions }
    }

    /// Route a key to a node index: first ring position clockwise from the
    /// key's hash, wrapping past zero.
    pub fn node_for(&self, key: &[u8]) -> usize {
        let hash = hash_position(key);
        match self
            .positions
            .range(hash..)
            .next()
            .or_else(|| self.positions.iter().next())
        {
            Some((_, &index)) => index,
            // Clusters reject empty node lists, so the ring is never empty
            None => 0,
        }
    }

    /// Number of distinct ring positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// First 8 bytes of the SHA-1 digest as a big-endian u64.
fn hash_position(data: &[u8]) -> u64 {
    let digest = Sha1::digest(data);
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}
