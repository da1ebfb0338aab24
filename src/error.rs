//! Error type shared across the crate.

use thiserror::Error;

/// Convenience alias used by every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, SumTreeError>;

/// Errors surfaced by tree operations.
///
/// Corruption of stored records and internal invariant violations are not
/// represented here: once accumulated sums can no longer be trusted there is
/// no safe way to continue, so those conditions panic instead (see the
/// `# Panics` sections on [`crate::Tree`] methods).
#[derive(Debug, Error)]
pub enum SumTreeError {
    /// Failure reported by the backing store, surfaced unchanged.
    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A caller-supplied argument was rejected.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
}
