// Error taxonomy shared by every storage backend and entity store.
//
// Stores wrap backend failures with entity context but never retry; the
// device authorization engine is the only layer that translates these into
// protocol-level outcomes.

use tokio_util::sync::CancellationToken;

/// Errors surfaced by storage backends and entity stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A required input was missing or empty. Local precondition violation,
    /// never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No matching row, or a row that is logically expired/deleted. The two
    /// cases are observably identical to callers.
    #[error("{0} not found")]
    NotFound(String),

    /// A conditional write failed: optimistic version mismatch, or an
    /// already-deleted/already-authorized double transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller is operating faster than the advertised cadence.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The backing store could not be reached or provisioned. Fatal at
    /// startup, surfaced to the caller at request time.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The operation's cancellation token fired before the network call was
    /// issued. No partial write was performed.
    #[error("operation cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Check a cancellation token before issuing network I/O.
///
/// Every store and engine operation calls this ahead of each round-trip; once
/// a write has been issued, cancellation does not roll it back.
pub fn check_cancelled(cancel: &CancellationToken) -> StoreResult<()> {
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_cancelled() {
        let token = CancellationToken::new();
        assert!(check_cancelled(&token).is_ok());

        token.cancel();
        assert!(matches!(check_cancelled(&token), Err(StoreError::Cancelled)));
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("application 'a1'".into());
        assert_eq!(err.to_string(), "application 'a1' not found");

        let err = StoreError::Conflict("version mismatch".into());
        assert_eq!(err.to_string(), "conflict: version mismatch");
    }
}
