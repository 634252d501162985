use thiserror::Error;

/// Error type for row lock operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The underlying primitive was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    Poisoned(String),
    /// The lock could not be acquired in time.
    #[error("lock acquire timed out for row {0}")]
    Timeout(String),
}
