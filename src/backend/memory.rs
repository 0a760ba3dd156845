//! In-process reference backend.
//!
//! Mirrors the observable semantics the adapter relies on from a real
//! key/value node: expiry is lazy, counters auto-create at 0, and
//! increment/decrement operate on the decimal text of the stored payload.

use super::{Backend, Connector};
use crate::config::NodeDescriptor;
use crate::error::{CacheError, Result};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct StoredEntry {
    payload: Bytes,
    expires_at: Option<Instant>,
}

impl StoredEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory [`Backend`] with lazy expiry.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys, for tests and diagnostics.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().unwrap();
        entries.values().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_payload(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        let entries = self.entries.read().unwrap();
        entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .map(|e| e.payload.clone())
    }

    fn add_to_counter(&self, key: &str, delta: i64) -> Result<i64> {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap();

        let current = match entries.get(key).filter(|e| !e.is_expired(now)) {
            // Missing counters start at 0
            None => 0,
            Some(entry) => std::str::from_utf8(&entry.payload)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| {
                    CacheError::Serialization(format!(
                        "counter '{}' holds a non-integer payload",
                        key
                    ))
                })?,
        };

        let next = current + delta;
        entries.insert(
            key.to_string(),
            StoredEntry {
                payload: Bytes::from(next.to_string()),
                expires_at: None,
            },
        );
        Ok(next)
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.live_payload(key))
    }

    fn set(&self, key: &str, value: Bytes) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.to_string(),
            StoredEntry {
                payload: value,
                expires_at: None,
            },
        );
        Ok(())
    }

    fn set_with_expiry(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.insert(
            key.to_string(),
            StoredEntry {
                payload: value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    fn set_if_not_exists(&self, key: &str, value: Bytes) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap();
        match entries.get(key) {
            Some(existing) if !existing.is_expired(now) => Ok(false),
            _ => {
                entries.insert(
                    key.to_string(),
                    StoredEntry {
                        payload: value,
                        expires_at: None,
                    },
                );
                Ok(true)
            }
        }
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap();
        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.remove(key);
        Ok(())
    }

    fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.add_to_counter(key, delta)
    }

    fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.add_to_counter(key, -delta)
    }

    fn flush_all(&self) -> Result<()> {
        let mut entries = self.entries.write().unwrap();
        entries.clear();
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        Ok(())
    }
}

/// [`Connector`] yielding one shared [`MemoryBackend`] per distinct node
/// descriptor, so clusters built over the same nodes observe the same data.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    backends: RwLock<HashMap<NodeDescriptor, Arc<MemoryBackend>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The backend serving a descriptor, if one has been connected.
    pub fn backend_for(&self, node: &NodeDescriptor) -> Option<Arc<MemoryBackend>> {
        let backends = self.backends.read().unwrap();
        backends.get(node).cloned()
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn Backend>> {
        let mut backends = self.backends.write().unwrap();
        let backend = backends
            .entry(node.clone())
            .or_insert_with(|| Arc::new(MemoryBackend::new()))
            .clone();
        Ok(backend)
    }
}
