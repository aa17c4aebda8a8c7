//! Cache operation errors.

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The compute function failed on the synchronous miss path.
    ///
    /// Background refresh failures are logged, never surfaced as this error.
    #[error("compute failed: {0}")]
    Compute(#[source] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_error_preserves_source() {
        let err = CacheError::Compute(anyhow::anyhow!("pricing feed down"));
        assert!(err.to_string().contains("pricing feed down"));
    }
}
