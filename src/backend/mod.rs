//! Backend capability surface.
//!
//! The adapter is agnostic to the backend's wire protocol. Each configured
//! node is represented by one [`Backend`] implementation exposing blocking
//! single-key operations plus a pipelining mode that batches several
//! operations into one round-trip. A [`Connector`] builds one backend per
//! [`NodeDescriptor`], honoring its timeout.
//!
//! [`MemoryBackend`] is the in-process reference implementation used by the
//! test suite.

pub mod memory;

pub use memory::{MemoryBackend, MemoryConnector};

use crate::config::NodeDescriptor;
use crate::error::Result;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// One operation in a pipelined batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Get { key: String },
    Set { key: String, value: Bytes },
    SetWithExpiry { key: String, value: Bytes, ttl: Duration },
    SetIfNotExists { key: String, value: Bytes },
    Expire { key: String, ttl: Duration },
    Delete { key: String },
    Increment { key: String, delta: i64 },
    Decrement { key: String, delta: i64 },
}

impl Op {
    /// The key this operation targets, used for routing.
    pub fn key(&self) -> &str {
        match self {
            Op::Get { key }
            | Op::Set { key, .. }
            | Op::SetWithExpiry { key, .. }
            | Op::SetIfNotExists { key, .. }
            | Op::Expire { key, .. }
            | Op::Delete { key }
            | Op::Increment { key, .. }
            | Op::Decrement { key, .. } => key,
        }
    }
}

/// Per-operation result from a pipelined batch.
#[derive(Debug, Clone, PartialEq)]
pub enum OpResult {
    /// Get: raw payload, `None` when the key is absent
    Value(Option<Bytes>),
    /// Set / SetWithExpiry / Delete: completed
    Done,
    /// SetIfNotExists / Expire: whether the operation took effect
    Flag(bool),
    /// Increment / Decrement: post-operation counter value
    Counter(i64),
}

/// Blocking client for one backend node.
///
/// Implementations must be safe for concurrent use from multiple callers;
/// the same backend handle is shared by every adapter resolving to its
/// cluster. All calls block until the round-trip completes or the node's
/// configured timeout elapses, surfacing the latter as
/// [`CacheError::BackendUnavailable`](crate::error::CacheError::BackendUnavailable).
pub trait Backend: Send + Sync {
    /// Fetch a key's raw payload, `None` when absent.
    fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Unconditionally store a payload.
    fn set(&self, key: &str, value: Bytes) -> Result<()>;

    /// Store a payload with an expiry, atomically in one call.
    fn set_with_expiry(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Store only when absent. Returns whether the store took effect.
    fn set_if_not_exists(&self, key: &str, value: Bytes) -> Result<bool>;

    /// Attach an expiry to an existing key. Returns false when absent.
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Remove a key. Absent keys are not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// Atomically add `delta` to a counter, creating it at 0 when absent,
    /// and return the post-increment value.
    fn increment(&self, key: &str, delta: i64) -> Result<i64>;

    /// Atomically subtract `delta` from a counter, creating it at 0 when
    /// absent, and return the post-decrement value.
    fn decrement(&self, key: &str, delta: i64) -> Result<i64>;

    /// Wipe this node's entire data set, all databases included.
    fn flush_all(&self) -> Result<()>;

    /// Release this node's connection. Later calls may reconnect or fail.
    fn disconnect(&self) -> Result<()>;

    /// Execute one operation.
    fn run(&self, op: Op) -> Result<OpResult> {
        match op {
            Op::Get { key } => self.get(&key).map(OpResult::Value),
            Op::Set { key, value } => self.set(&key, value).map(|_| OpResult::Done),
            Op::SetWithExpiry { key, value, ttl } => {
                self.set_with_expiry(&key, value, ttl).map(|_| OpResult::Done)
            }
            Op::SetIfNotExists { key, value } => {
                self.set_if_not_exists(&key, value).map(OpResult::Flag)
            }
            Op::Expire { key, ttl } => self.expire(&key, ttl).map(OpResult::Flag),
            Op::Delete { key } => self.delete(&key).map(|_| OpResult::Done),
            Op::Increment { key, delta } => self.increment(&key, delta).map(OpResult::Counter),
            Op::Decrement { key, delta } => self.decrement(&key, delta).map(OpResult::Counter),
        }
    }

    /// Execute a batch of operations in submission order.
    ///
    /// The default runs them sequentially; network-backed implementations
    /// should override this to issue the whole batch as a single pipelined
    /// round-trip. Results are positional, one per submitted operation.
    fn pipeline(&self, ops: Vec<Op>) -> Result<Vec<OpResult>> {
        ops.into_iter().map(|op| self.run(op)).collect()
    }
}

/// Factory producing one [`Backend`] per configured node.
///
/// Injected into the [`ClusterRegistry`](crate::registry::ClusterRegistry)
/// so the wire protocol stays opaque to the adapter.
pub trait Connector: Send + Sync {
    fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn Backend>>;
}
