//! Batch-request builder and correlated results.
//!
//! Multi-key operations are built up as a [`BatchRequest`]; each pushed
//! operation yields an [`OpHandle`] that later retrieves that operation's
//! result from the executed [`BatchResults`], regardless of which node
//! serviced it or in what order the per-node pipelines completed.

use crate::backend::{Op, OpResult};

/// Handle to one operation submitted in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpHandle(pub(crate) usize);

/// Ordered collection of operations to fan out across the cluster.
#[derive(Debug, Default)]
pub struct BatchRequest {
    pub(crate) ops: Vec<Op>,
}

impl BatchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an operation, returning its handle.
    pub fn push(&mut self, op: Op) -> OpHandle {
        let handle = OpHandle(self.ops.len());
        self.ops.push(op);
        handle
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Per-operation results of an executed batch, indexed by [`OpHandle`].
///
/// An absent result means the operation's node failed silently; for `Get`
/// operations an [`OpResult::Value(None)`] means the key does not exist.
#[derive(Debug)]
pub struct BatchResults {
    pub(crate) results: Vec<Option<OpResult>>,
}

impl BatchResults {
    /// Take ownership of one operation's result.
    pub fn take(&mut self, handle: OpHandle) -> Option<OpResult> {
        self.results.get_mut(handle.0).and_then(Option::take)
    }

    /// Borrow one operation's result.
    pub fn get(&self, handle: OpHandle) -> Option<&OpResult> {
        self.results.get(handle.0).and_then(Option::as_ref)
    }
}
