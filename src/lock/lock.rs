use std::time::Duration;

use super::LockError;

/// A single row lock.
///
/// Implementations provide a bounded blocking acquire, a non-blocking
/// try-acquire, and release. The in-memory lock uses `Mutex` + `Condvar`;
/// a database-backed store would map this onto `SELECT ... FOR UPDATE`.
pub trait Lock: Send + Sync {
    /// Acquire the lock, waiting at most `timeout`.
    /// Returns `Ok(false)` when the wait timed out.
    fn lock_within(&self, timeout: Duration) -> Result<bool, LockError>;

    /// Try to acquire the lock without blocking.
    fn try_lock(&self) -> Result<bool, LockError>;

    /// Release the lock.
    fn unlock(&self) -> Result<(), LockError>;
}
