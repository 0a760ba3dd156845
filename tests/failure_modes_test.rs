use bytes::Bytes;
use shardcache::{
    parse_servers, Backend, CacheError, CacheOptions, ClusterCache, ClusterRegistry, Connector,
    MemoryBackend, NodeDescriptor, Op, OpResult, Result, Value,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Backend wrapper that counts calls and can be switched into a failing
/// state, standing in for an unreachable node.
struct FlakyBackend {
    inner: MemoryBackend,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl FlakyBackend {
    fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(CacheError::BackendUnavailable(
                "connection timed out".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl Backend for FlakyBackend {
    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.check()?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Bytes) -> Result<()> {
        self.check()?;
        self.inner.set(key, value)
    }

    fn set_with_expiry(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.check()?;
        self.inner.set_with_expiry(key, value, ttl)
    }

    fn set_if_not_exists(&self, key: &str, value: Bytes) -> Result<bool> {
        self.check()?;
        self.inner.set_if_not_exists(key, value)
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.check()?;
        self.inner.expire(key, ttl)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.check()?;
        self.inner.delete(key)
    }

    fn increment(&self, key: &str, delta: i64) -> Result<i64> {
        self.check()?;
        self.inner.increment(key, delta)
    }

    fn decrement(&self, key: &str, delta: i64) -> Result<i64> {
        self.check()?;
        self.inner.decrement(key, delta)
    }

    fn flush_all(&self) -> Result<()> {
        self.check()?;
        self.inner.flush_all()
    }

    fn disconnect(&self) -> Result<()> {
        self.check()?;
        self.inner.disconnect()
    }

    fn pipeline(&self, ops: Vec<Op>) -> Result<Vec<OpResult>> {
        self.check()?;
        self.inner.pipeline(ops)
    }
}

struct FlakyConnector {
    backends: Vec<Arc<FlakyBackend>>,
    /// Nodes the connector reports as fail-silently
    silent: bool,
}

impl FlakyConnector {
    fn new(node_count: usize, silent: bool) -> Self {
        Self {
            backends: (0..node_count).map(|_| Arc::new(FlakyBackend::new())).collect(),
            silent,
        }
    }

    fn total_calls(&self) -> usize {
        self.backends
            .iter()
            .map(|b| b.calls.load(Ordering::SeqCst))
            .sum()
    }
}

impl Connector for FlakyConnector {
    fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn Backend>> {
        // Descriptors are n0:6379/0, n1:6379/0, ... in configuration order
        let index: usize = node
            .host
            .trim_start_matches('n')
            .parse()
            .unwrap_or_default();
        Ok(self.backends[index].clone())
    }
}

fn servers(node_count: usize) -> String {
    (0..node_count)
        .map(|i| format!("n{}:6379/0", i))
        .collect::<Vec<_>>()
        .join(";")
}

/// Build a cache whose descriptors optionally carry fail_silently, going
/// through the registry directly since the string form always parses the
/// flag as off.
fn flaky_cache(connector: Arc<FlakyConnector>, node_count: usize) -> ClusterCache {
    let silent = connector.silent;

    struct Shared(Arc<FlakyConnector>);
    impl Connector for Shared {
        fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn Backend>> {
            self.0.connect(node)
        }
    }

    let registry = ClusterRegistry::new(Shared(connector));
    if silent {
        // The string form always parses fail_silently as off, so silent
        // nodes go through explicit descriptors
        let mut nodes = parse_servers(&servers(node_count)).unwrap();
        for node in &mut nodes {
            node.fail_silently = true;
        }
        ClusterCache::from_nodes(&nodes, &registry, CacheOptions::default()).unwrap()
    } else {
        ClusterCache::new(&servers(node_count), &registry).unwrap()
    }
}

#[test]
fn test_invalid_key_rejected_before_any_network_call() {
    let connector = Arc::new(FlakyConnector::new(2, false));
    let cache = flaky_cache(connector.clone(), 2);
    let baseline = connector.total_calls();

    let overlong = "k".repeat(300);
    let invalid = ["bad\0key", overlong.as_str()];

    for key in invalid {
        assert!(matches!(
            cache.get(key),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            cache.set(key, &Value::from(1), None),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            cache.add(key, &Value::from(1), None),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(cache.delete(key), Err(CacheError::InvalidKey(_))));
        assert!(matches!(cache.incr(key, 1), Err(CacheError::InvalidKey(_))));
        assert!(matches!(cache.decr(key, 1), Err(CacheError::InvalidKey(_))));
        assert!(matches!(
            cache.get_many(&[key, "fine"]),
            Err(CacheError::InvalidKey(_))
        ));
        assert!(matches!(
            cache.delete_many(&[key]),
            Err(CacheError::InvalidKey(_))
        ));
    }

    assert_eq!(
        connector.total_calls(),
        baseline,
        "invalid keys must never reach a backend"
    );
}

#[test]
fn test_backend_failure_surfaces_by_default() {
    let connector = Arc::new(FlakyConnector::new(1, false));
    let cache = flaky_cache(connector.clone(), 1);

    connector.backends[0].failing.store(true, Ordering::SeqCst);

    assert!(matches!(
        cache.get("anything"),
        Err(CacheError::BackendUnavailable(_))
    ));
    assert!(matches!(
        cache.set("anything", &Value::from(1), None),
        Err(CacheError::BackendUnavailable(_))
    ));
    assert!(matches!(
        cache.get_many(&["anything"]),
        Err(CacheError::BackendUnavailable(_))
    ));
    assert!(matches!(
        cache.clear(),
        Err(CacheError::BackendUnavailable(_))
    ));
}

#[test]
fn test_fail_silently_downgrades_to_miss() {
    let connector = Arc::new(FlakyConnector::new(1, true));
    let cache = flaky_cache(connector.clone(), 1);

    connector.backends[0].failing.store(true, Ordering::SeqCst);

    // Reads become misses, writes become no-ops
    assert_eq!(cache.get("anything").unwrap(), None);
    cache.set("anything", &Value::from(1), None).unwrap();
    cache.delete("anything").unwrap();
    assert!(!cache.add("anything", &Value::from(1), None).unwrap());
    assert!(cache.get_many(&["anything"]).unwrap().is_empty());
    cache.clear().unwrap();
}

#[test]
fn test_partial_failure_leaves_healthy_nodes_served() {
    let connector = Arc::new(FlakyConnector::new(3, true));
    let cache = flaky_cache(connector.clone(), 3);
    let cluster = cache.cluster();

    // Find keys routed to different nodes, then fail one node
    let keys: Vec<String> = (0..50).map(|i| format!("spread{}", i)).collect();
    let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();

    let mut entries = std::collections::HashMap::new();
    for key in &keys {
        entries.insert(key.clone(), Value::from(1));
    }
    cache.set_many(&entries, None).unwrap();

    let failed_node = 0;
    connector.backends[failed_node]
        .failing
        .store(true, Ordering::SeqCst);

    let values = cache.get_many(&key_refs).unwrap();
    let healthy: usize = keys
        .iter()
        .filter(|k| cluster.route_index(k) != failed_node)
        .count();
    assert_eq!(values.len(), healthy);
    assert!(healthy < keys.len(), "expected some keys on the failed node");
}

#[test]
fn test_verified_counters_use_real_existence_check() {
    let connector = Arc::new(FlakyConnector::new(1, false));

    struct Shared(Arc<FlakyConnector>);
    impl Connector for Shared {
        fn connect(&self, node: &NodeDescriptor) -> Result<Arc<dyn Backend>> {
            self.0.connect(node)
        }
    }

    let registry = ClusterRegistry::new(Shared(connector));
    let cache = ClusterCache::with_options(
        &servers(1),
        &registry,
        CacheOptions {
            verified_counters: true,
            ..CacheOptions::default()
        },
    )
    .unwrap();

    // Absent counter is reported missing without creating it as 1
    assert!(matches!(
        cache.incr("verified", 1),
        Err(CacheError::NotFound(_))
    ));

    // Seed the counter at 0; incrementing to 1 is now a legitimate value,
    // which the heuristic would have misread as absent
    cache.set("verified", &Value::from(0), None).unwrap();
    assert_eq!(cache.incr("verified", 1).unwrap(), 1);
    assert_eq!(cache.incr("verified", 1).unwrap(), 2);
}
