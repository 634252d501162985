//! Per-row locks for the Ledger Store.
//!
//! A [`LockManager`] hands out one logical lock per row key
//! (`"COLLECTION:id"`). Ledger transactions acquire locks through
//! [`RowGuard`], which releases on drop, and always acquire them in the
//! collection order defined by the ledger so two steps racing on the same
//! card and account cannot deadlock.

mod error;
mod guard;
mod in_memory;
mod lock;
mod lock_manager;

pub use error::LockError;
pub use guard::RowGuard;
pub use in_memory::{InMemoryLock, InMemoryLockManager};
pub use lock::Lock;
pub use lock_manager::LockManager;
