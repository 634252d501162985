use std::sync::Arc;

use super::{Lock, LockError};

/// Factory for per-row locks.
///
/// Repeated calls with the same key must return the same logical lock.
pub trait LockManager: Send + Sync {
    fn get_lock(&self, key: &str) -> Result<Arc<dyn Lock>, LockError>;
}
