//! Cache key derivation from request identity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use swr_core::{CoordinatorConfig, RequestIdentity};

/// A cache key uniquely identifying a cached operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Create a cache key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the in-flight refresh marker for this key is stored.
    pub fn refresh_marker(&self) -> String {
        format!("{}_refreshing", self.0)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derives cache keys from request identity.
///
/// The configured control parameter (the forced-refresh flag) is stripped
/// before serialization, so two requests differing only in that flag map to
/// the same key. Remaining parameters are serialized sorted by name, so the
/// key does not depend on the order the caller supplied them in.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    control_param: String,
}

impl KeyDeriver {
    /// Create a deriver with the given control parameter name.
    pub fn new(control_param: impl Into<String>) -> Self {
        Self {
            control_param: control_param.into(),
        }
    }

    /// Create a deriver from coordinator configuration.
    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(config.control_param.clone())
    }

    /// Derive the cache key for a request.
    ///
    /// Produces the path alone when no parameters remain after stripping the
    /// control parameter, else `path?k1=v1&k2=v2...` with parameters sorted
    /// by name. Duplicate names keep the last value.
    pub fn derive(&self, identity: &RequestIdentity) -> CacheKey {
        let params: BTreeMap<&str, &str> = identity
            .params
            .iter()
            .filter(|(name, _)| *name != self.control_param)
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect();

        if params.is_empty() {
            return CacheKey::new(identity.path.clone());
        }

        let query: Vec<String> = params
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        CacheKey::new(format!("{}?{}", identity.path, query.join("&")))
    }

    /// Whether the request carries a truthy forced-refresh flag.
    pub fn force_refresh(&self, identity: &RequestIdentity) -> bool {
        identity
            .param(&self.control_param)
            .map(is_truthy)
            .unwrap_or(false)
    }

    /// The configured control parameter name.
    pub fn control_param(&self) -> &str {
        &self.control_param
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::from_config(&CoordinatorConfig::default())
    }
}

// Truthy values for the control parameter, matched case-insensitively.
fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
