//! The public cache adapter.
//!
//! [`ClusterCache`] implements the generic cache contract (`add`, `get`,
//! `set`, `delete`, their multi-key variants, counters, `clear` and `close`)
//! on top of a consistent-hashing [`Cluster`]. Every key is validated for
//! portability before it reaches the network layer, and values pass through
//! the [`Value`] codec so integers stay natively incrementable on the
//! backend.

use crate::cluster::{BatchRequest, Cluster, OpHandle};
use crate::backend::{Op, OpResult};
use crate::config::{parse_servers, NodeDescriptor};
use crate::error::{CacheError, Result};
use crate::registry::ClusterRegistry;
use crate::value::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

/// Maximum accepted key length.
///
/// The backend itself has no such limit; the cap keeps application keys
/// portable to stricter cache protocols (memcached caps keys at 250).
pub const MAX_KEY_LENGTH: usize = 250;

/// Adapter-level options.
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// Expiry applied when a call passes no timeout. `None` (or zero)
    /// means entries never expire by default.
    pub default_timeout: Option<Duration>,
    /// Use a real existence check for `incr`/`decr` instead of the
    /// compatibility heuristic that treats a post-operation value of
    /// 1 (or -1) as "key was absent". Off by default; see [`ClusterCache::incr`].
    pub verified_counters: bool,
}

/// Cache client over a cluster of key/value nodes.
pub struct ClusterCache {
    cluster: std::sync::Arc<Cluster>,
    options: CacheOptions,
}

impl ClusterCache {
    /// Build an adapter from a `host:port/db[;...]` server string,
    /// resolving the cluster through the registry.
    pub fn new(servers: &str, registry: &ClusterRegistry) -> Result<Self> {
        Self::with_options(servers, registry, CacheOptions::default())
    }

    /// Build an adapter with explicit options.
    pub fn with_options(
        servers: &str,
        registry: &ClusterRegistry,
        options: CacheOptions,
    ) -> Result<Self> {
        let nodes = parse_servers(servers)?;
        Self::from_nodes(&nodes, registry, options)
    }

    /// Build an adapter from explicit descriptors, bypassing string
    /// parsing. This is the path for programmatically assembled node
    /// lists, e.g. with per-node `fail_silently` enabled; the string
    /// form always parses the flag as off.
    pub fn from_nodes(
        nodes: &[NodeDescriptor],
        registry: &ClusterRegistry,
        options: CacheOptions,
    ) -> Result<Self> {
        let cluster = registry.get_or_create(nodes)?;
        Ok(Self { cluster, options })
    }

    /// The underlying cluster handle.
    pub fn cluster(&self) -> &std::sync::Arc<Cluster> {
        &self.cluster
    }

    /// Store a value only if the key is absent. Returns whether the store
    /// took effect.
    ///
    /// When a timeout applies, the expiry is attached as a second call
    /// after the conditional set. The two steps are not atomic: a crash
    /// between them leaves the key stored without its intended expiry.
    pub fn add(&self, key: &str, value: &Value, timeout: Option<Duration>) -> Result<bool> {
        validate_key(key)?;
        let node = self.cluster.route_index(key);
        let backend = self.cluster.backend(node);

        let stored = self.silence(
            node,
            backend.set_if_not_exists(key, value.to_wire()),
            false,
        )?;
        if let Some(ttl) = self.effective_timeout(timeout) {
            // Applied even when the conditional set lost, matching the
            // two-step contract
            self.silence(node, backend.expire(key, ttl), false)?;
        }
        Ok(stored)
    }

    /// Fetch and decode a value, `None` when absent.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        validate_key(key)?;
        let node = self.cluster.route_index(key);
        let raw = self.silence(node, self.cluster.backend(node).get(key), None)?;
        Ok(raw.map(Value::from_wire))
    }

    /// Fetch a value, falling back to a default when absent.
    pub fn get_or(&self, key: &str, default: Value) -> Result<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Unconditionally store a value. With an effective timeout the store
    /// and expiry happen atomically in one backend call.
    pub fn set(&self, key: &str, value: &Value, timeout: Option<Duration>) -> Result<()> {
        validate_key(key)?;
        let node = self.cluster.route_index(key);
        let backend = self.cluster.backend(node);
        let wire = value.to_wire();

        let result = match self.effective_timeout(timeout) {
            Some(ttl) => backend.set_with_expiry(key, wire, ttl),
            None => backend.set(key, wire),
        };
        self.silence(node, result, ())
    }

    /// Remove a key. Absent keys are not an error.
    pub fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let node = self.cluster.route_index(key);
        self.silence(node, self.cluster.backend(node).delete(key), ())
    }

    /// Fetch many keys in pipelined per-node round-trips.
    ///
    /// Absent keys are omitted from the result, never present as `None`.
    pub fn get_many(&self, keys: &[&str]) -> Result<HashMap<String, Value>> {
        for key in keys {
            validate_key(key)?;
        }

        let mut batch = BatchRequest::new();
        let handles: Vec<(String, OpHandle)> = keys
            .iter()
            .map(|&key| {
                let handle = batch.push(Op::Get {
                    key: key.to_string(),
                });
                (key.to_string(), handle)
            })
            .collect();

        let mut results = self.cluster.execute(batch)?;
        let mut values = HashMap::new();
        for (key, handle) in handles {
            if let Some(OpResult::Value(Some(raw))) = results.take(handle) {
                values.insert(key, Value::from_wire(raw));
            }
        }
        Ok(values)
    }

    /// Store many entries in pipelined per-node round-trips.
    ///
    /// Best-effort: one node's failure does not prevent the sub-batches on
    /// other nodes from completing, and nothing is rolled back.
    pub fn set_many(
        &self,
        entries: &HashMap<String, Value>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        for key in entries.keys() {
            validate_key(key)?;
        }

        let ttl = self.effective_timeout(timeout);
        let mut batch = BatchRequest::new();
        for (key, value) in entries {
            let op = match ttl {
                Some(ttl) => Op::SetWithExpiry {
                    key: key.clone(),
                    value: value.to_wire(),
                    ttl,
                },
                None => Op::Set {
                    key: key.clone(),
                    value: value.to_wire(),
                },
            };
            batch.push(op);
        }

        self.cluster.execute(batch).map(|_| ())
    }

    /// Delete many keys in pipelined per-node round-trips.
    pub fn delete_many(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            validate_key(key)?;
        }

        let mut batch = BatchRequest::new();
        for &key in keys {
            batch.push(Op::Delete {
                key: key.to_string(),
            });
        }
        self.cluster.execute(batch).map(|_| ())
    }

    /// Atomically increment a counter, returning the new value.
    ///
    /// The backend auto-creates missing counters at 0, so by default a
    /// post-increment result of exactly 1 is read as "key was absent" and
    /// raised as [`CacheError::NotFound`] for compatibility with caches
    /// that error on missing counters. The heuristic misfires when a real
    /// counter legitimately reaches 1; enable
    /// [`CacheOptions::verified_counters`] for a true existence check.
    pub fn incr(&self, key: &str, delta: i64) -> Result<i64> {
        validate_key(key)?;
        let backend = self.cluster.route(key);

        if self.options.verified_counters && backend.get(key)?.is_none() {
            return Err(CacheError::NotFound(key.to_string()));
        }

        let value = backend.increment(key, delta)?;
        if !self.options.verified_counters && value == 1 {
            return Err(CacheError::NotFound(key.to_string()));
        }
        Ok(value)
    }

    /// Atomically decrement a counter, returning the new value.
    ///
    /// Mirror of [`incr`](Self::incr): a result of exactly -1 is read as
    /// "key was absent", with the same caveat.
    pub fn decr(&self, key: &str, delta: i64) -> Result<i64> {
        validate_key(key)?;
        let backend = self.cluster.route(key);

        if self.options.verified_counters && backend.get(key)?.is_none() {
            return Err(CacheError::NotFound(key.to_string()));
        }

        let value = backend.decrement(key, delta)?;
        if !self.options.verified_counters && value == -1 {
            return Err(CacheError::NotFound(key.to_string()));
        }
        Ok(value)
    }

    /// Wipe the entire data set on every node, all databases included.
    /// Irreversible.
    pub fn clear(&self) -> Result<()> {
        self.for_each_node(|backend| backend.flush_all())
    }

    /// Release every node's backend connection.
    pub fn close(&self) -> Result<()> {
        self.for_each_node(|backend| backend.disconnect())
    }

    fn for_each_node(
        &self,
        call: impl Fn(&dyn crate::backend::Backend) -> Result<()>,
    ) -> Result<()> {
        let mut first_error = None;
        for (node, backend) in self.cluster.nodes() {
            match call(backend.as_ref()) {
                Ok(()) => {}
                Err(err) if node.fail_silently => {
                    warn!("node {} failed, ignoring: {}", node, err);
                }
                Err(err) => {
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Downgrade a backend failure to the fallback when the node is
    /// configured to fail silently. Validation errors always surface.
    fn silence<T>(&self, node: usize, result: Result<T>, fallback: T) -> Result<T> {
        match result {
            Err(err @ CacheError::BackendUnavailable(_))
                if self.cluster.descriptor(node).fail_silently =>
            {
                warn!(
                    "node {} failed, treating as miss: {}",
                    self.cluster.descriptor(node),
                    err
                );
                Ok(fallback)
            }
            other => other,
        }
    }

    fn effective_timeout(&self, timeout: Option<Duration>) -> Option<Duration> {
        timeout
            .filter(|t| !t.is_zero())
            .or(self.options.default_timeout)
            .filter(|t| !t.is_zero())
    }
}

/// Reject keys that would not be portable to stricter cache protocols:
/// longer than [`MAX_KEY_LENGTH`], containing control characters
/// (code points below 33) or the delete character (127).
pub fn validate_key(key: &str) -> Result<()> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key is longer than {} bytes: {}",
            MAX_KEY_LENGTH, key
        )));
    }
    for ch in key.chars() {
        let code = ch as u32;
        if code < 33 || code == 127 {
            return Err(CacheError::InvalidKey(format!(
                "key contains non-portable character {:?}: {:?}",
                ch, key
            )));
        }
    }
    Ok(())
}
