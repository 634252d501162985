//! Ledger Store - persistent state for accounts, cards, agreements,
//! catalogs, operations, withdrawal records and the outbox.
//!
//! Records are serialized to JSON and versioned. Every write goes through
//! a [`WriteBatch`] that the store applies atomically after checking
//! expected versions and unique keys, so a saga step either lands
//! completely or not at all.
//!
//! ## Example
//!
//! ```ignore
//! use deposit_service::ledger::{InMemoryLedgerStore, RecordsExt};
//!
//! let store = InMemoryLedgerStore::new();
//! store.records::<Product>().insert(&product)?;
//! let loaded = store.records::<Product>().get("1")?;
//! ```

mod in_memory;
#[allow(clippy::module_inception)]
mod ledger;
mod records;
mod store;
mod tx;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// A type stored in the Ledger Store.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection (table) name.
    const COLLECTION: &'static str;

    /// Primary key within the collection.
    fn id(&self) -> String;

    /// Secondary keys that must be unique within the collection,
    /// as `(field, value)` pairs.
    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}

/// Record data together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
}

/// Errors raised by a [`LedgerStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("concurrency conflict on {collection}:{id} (expected version {expected}, actual {actual})")]
    Conflict {
        collection: String,
        id: String,
        expected: u64,
        actual: u64,
    },
    #[error("record already exists: {collection}:{id}")]
    Duplicate { collection: String, id: String },
    #[error("unique key {collection}.{field} already holds {value}")]
    UniqueViolation {
        collection: String,
        field: String,
        value: String,
    },
    #[error("record not found: {collection}:{id}")]
    NotFound { collection: String, id: String },
    #[error("record serialization error: {0}")]
    Serde(String),
    #[error("ledger storage poisoned")]
    Poisoned,
}

pub(crate) fn row_key(collection: &str, id: &str) -> String {
    format!("{}:{}", collection, id)
}

pub use in_memory::InMemoryLedgerStore;
pub use ledger::Ledger;
pub use records::{Records, RecordsExt};
pub use store::{LedgerStore, WriteBatch, WriteKind, WriteOp};
pub use tx::LedgerTx;
