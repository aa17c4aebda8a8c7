//! Request identity and compute execution context.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Unique request identifier for log correlation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let id = format!(
            "{:x}-{:x}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos(),
            COUNTER.fetch_add(1, Ordering::Relaxed),
        );
        Self(id)
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an incoming request as supplied by the routing layer.
///
/// Parameters are an ordered mapping: the caller's ordering is preserved
/// here, and key derivation serializes them order-independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestIdentity {
    /// Request path (e.g., "/trade_summary").
    pub path: String,
    /// Query parameters in the order supplied by the caller.
    pub params: Vec<(String, String)>,
}

impl RequestIdentity {
    /// Create an identity with no parameters.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Append a query parameter, preserving insertion order.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Get the first value for a parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Execution context threaded into compute functions.
///
/// Compute functions run both on the calling task (synchronous miss) and on
/// background workers; the scope carries whatever request-derived state they
/// need so neither path relies on ambient globals.
#[derive(Debug, Clone)]
pub struct ComputeScope {
    request_id: RequestId,
    values: HashMap<String, String>,
}

impl ComputeScope {
    /// Create a scope with a freshly generated request ID.
    pub fn new() -> Self {
        Self::for_request(RequestId::generate())
    }

    /// Create a scope bound to an existing request ID.
    pub fn for_request(request_id: RequestId) -> Self {
        Self {
            request_id,
            values: HashMap::new(),
        }
    }

    /// Attach a named value to the scope.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Get a named value.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    /// The request ID this scope belongs to.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}

impl Default for ComputeScope {
    fn default() -> Self {
        Self::new()
    }
}
