use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use super::{Lock, LockError, LockManager};

#[derive(Default)]
struct RowState {
    held: bool,
    waiters: usize,
}

/// Row lock built on `Mutex` + `Condvar`. Releases wake one waiter.
#[derive(Default)]
pub struct InMemoryLock {
    state: Mutex<RowState>,
    released: Condvar,
}

impl InMemoryLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, RowState>, LockError> {
        self.state
            .lock()
            .map_err(|e| LockError::Poisoned(e.to_string()))
    }
}

impl Lock for InMemoryLock {
    fn lock_within(&self, timeout: Duration) -> Result<bool, LockError> {
        let mut state = self.state()?;
        if !state.held {
            state.held = true;
            return Ok(true);
        }

        let deadline = Instant::now() + timeout;
        state.waiters += 1;
        let acquired = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break false;
            }
            state = self
                .released
                .wait_timeout(state, remaining)
                .map_err(|e| LockError::Poisoned(e.to_string()))?
                .0;
            if !state.held {
                break true;
            }
        };
        state.waiters -= 1;
        state.held |= acquired;
        Ok(acquired)
    }

    fn try_lock(&self) -> Result<bool, LockError> {
        let mut state = self.state()?;
        Ok(!std::mem::replace(&mut state.held, true))
    }

    fn unlock(&self) -> Result<(), LockError> {
        let mut state = self.state()?;
        state.held = false;
        if state.waiters > 0 {
            self.released.notify_one();
        }
        Ok(())
    }
}

/// One [`InMemoryLock`] per row key, created on first use.
#[derive(Default)]
pub struct InMemoryLockManager {
    rows: Mutex<HashMap<String, Arc<InMemoryLock>>>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of row keys seen so far.
    pub fn rows(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }
}

impl LockManager for InMemoryLockManager {
    fn get_lock(&self, key: &str) -> Result<Arc<dyn Lock>, LockError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| LockError::Poisoned("row lock map poisoned".into()))?;
        let lock: Arc<InMemoryLock> = Arc::clone(rows.entry(key.to_owned()).or_default());
        Ok(lock)
    }
}
