//! Shardcache: a consistent-hashing cluster cache client.
//!
//! Shardcache sits between a generic key/value cache interface and a
//! cluster of independent backend nodes. It parses a multi-node server
//! string into a routable cluster, routes each key deterministically to
//! one node via a consistent-hash ring, batches multi-key operations into
//! pipelined per-node round-trips, and special-cases integer values so the
//! backend's atomic increment/decrement stay usable.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          ClusterCache (adapter)             │
//! │  add/get/set/delete, *_many, incr/decr      │
//! └─────────────────────────────────────────────┘
//!                      │
//!         Value codec (Integer | Blob)
//!                      │
//! ┌─────────────────────────────────────────────┐
//! │       Cluster (hash ring + nodes)           │
//! │  route one key / pipeline a batch per node  │
//! └─────────────────────────────────────────────┘
//!                      │
//! ┌─────────────────────────────────────────────┐
//! │     Backend (opaque per-node client)        │
//! │  get, set, setnx, expire, incr, pipeline    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use shardcache::{ClusterCache, ClusterRegistry, MemoryConnector, Value};
//!
//! let registry = ClusterRegistry::new(MemoryConnector::new());
//! let cache = ClusterCache::new("127.0.0.1:6379/0;127.0.0.1:6379/1", &registry).unwrap();
//!
//! cache.set("answer", &Value::from(42), None).unwrap();
//! assert_eq!(cache.get("answer").unwrap(), Some(Value::Integer(42)));
//! ```

pub mod backend;
pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod registry;
pub mod ring;
pub mod value;

pub use backend::{Backend, Connector, MemoryBackend, MemoryConnector, Op, OpResult};
pub use cache::{validate_key, CacheOptions, ClusterCache, MAX_KEY_LENGTH};
pub use cluster::{BatchRequest, BatchResults, Cluster, OpHandle};
pub use config::{parse_servers, DatabaseSelector, NodeDescriptor, DEFAULT_NODE_TIMEOUT};
pub use error::{CacheError, Result};
pub use registry::ClusterRegistry;
pub use ring::HashRing;
pub use value::Value;
