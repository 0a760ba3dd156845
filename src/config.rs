//! Server configuration string parsing.
//!
//! A cluster is configured from a single semicolon-delimited string of node
//! specs, each shaped `host:port/db`:
//!
//! ```text
//! 127.0.0.1:6379/0;127.0.0.1:6379/1;127.0.0.1:6379/2
//! ```
//!
//! The order of appearance is preserved and serves as the stable zero-based
//! node index. The `db` field may be empty or non-numeric; a non-numeric
//! value is carried through as an uninterpreted string rather than rejected.

use crate::error::{CacheError, Result};
use std::fmt;
use std::time::Duration;

/// Per-node operation timeout applied to every parsed descriptor.
pub const DEFAULT_NODE_TIMEOUT: Duration = Duration::from_secs(2);

/// Database selector from the `/db` portion of a node spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatabaseSelector {
    /// No explicit database (`host:port/`)
    None,
    /// Numeric database index
    Index(u64),
    /// Non-numeric selector, passed through uninterpreted
    Raw(String),
}

impl fmt::Display for DatabaseSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseSelector::None => Ok(()),
            DatabaseSelector::Index(db) => write!(f, "{}", db),
            DatabaseSelector::Raw(raw) => write!(f, "{}", raw),
        }
    }
}

/// One configured backend endpoint, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeDescriptor {
    pub host: String,
    pub port: u16,
    pub database: DatabaseSelector,
    /// When set, backend failures on this node downgrade to silent misses.
    /// The string form always produces `false`.
    pub fail_silently: bool,
    /// Per-node connect/operation timeout
    pub timeout: Duration,
}

impl NodeDescriptor {
    /// Canonical `host:port/db` identity used for ring placement and
    /// cluster-registry keying.
    pub fn identity(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identity())
    }
}

/// Parse a semicolon-delimited server string into ordered node descriptors.
///
/// # Errors
///
/// Returns [`CacheError::Config`] when a spec lacks the `/` separator, the
/// `host:port` portion does not contain exactly one `:`, or the port is not
/// a number.
pub fn parse_servers(config: &str) -> Result<Vec<NodeDescriptor>> {
    let mut nodes = Vec::new();

    for spec in config.split(';') {
        let (host_and_port, path) = spec.split_once('/').ok_or_else(|| {
            CacheError::Config(format!("node spec '{}' is missing '/db' portion", spec))
        })?;

        if host_and_port.matches(':').count() != 1 {
            return Err(CacheError::Config(format!(
                "node spec '{}' must contain exactly one ':' before '/'",
                spec
            )));
        }

        // Checked above, split cannot fail
        let (host, port) = host_and_port.split_once(':').unwrap_or((host_and_port, ""));
        let port: u16 = port.parse().map_err(|_| {
            CacheError::Config(format!("node spec '{}' has a non-numeric port", spec))
        })?;

        let db = path.trim_matches('/');
        let database = if db.is_empty() {
            DatabaseSelector::None
        } else if db.bytes().all(|b| b.is_ascii_digit()) {
            // All-digit fields fit u64 in practice; anything larger is
            // carried through raw like other non-indexable selectors.
            db.parse()
                .map(DatabaseSelector::Index)
                .unwrap_or_else(|_| DatabaseSelector::Raw(db.to_string()))
        } else {
            DatabaseSelector::Raw(db.to_string())
        };

        nodes.push(NodeDescriptor {
            host: host.to_string(),
            port,
            database,
            fail_silently: false,
            timeout: DEFAULT_NODE_TIMEOUT,
        });
    }

    Ok(nodes)
}
