use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::{Lock, LockError, LockManager};

/// Holds one row lock and releases it when dropped.
pub struct RowGuard {
    key: String,
    lock: Arc<dyn Lock>,
}

impl RowGuard {
    /// Acquire the row lock for `key`, failing with [`LockError::Timeout`]
    /// when another holder keeps it longer than `timeout`.
    pub fn acquire(
        manager: &dyn LockManager,
        key: &str,
        timeout: Duration,
    ) -> Result<Self, LockError> {
        let lock = manager.get_lock(key)?;
        if !lock.lock_within(timeout)? {
            return Err(LockError::Timeout(key.to_string()));
        }
        Ok(Self {
            key: key.to_string(),
            lock,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        if let Err(err) = self.lock.unlock() {
            warn!(row = %self.key, error = %err, "failed to release row lock");
        }
    }
}

impl std::fmt::Debug for RowGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowGuard").field("key", &self.key).finish()
    }
}
