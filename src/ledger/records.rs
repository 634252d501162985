//! Typed access to one collection of a [`LedgerStore`].

use std::marker::PhantomData;

use super::{LedgerStore, Record, StoreError, Versioned, WriteBatch};

/// Repository view over the records of type `R`.
pub struct Records<'a, S: ?Sized, R> {
    store: &'a S,
    _record: PhantomData<R>,
}

impl<'a, S: LedgerStore, R: Record> Records<'a, S, R> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    pub fn get(&self, id: &str) -> Result<Option<Versioned<R>>, StoreError> {
        self.store.get_record::<R>(id)
    }

    /// Like [`get`](Self::get), but a missing row is an error.
    pub fn require(&self, id: &str) -> Result<Versioned<R>, StoreError> {
        self.get(id)?.ok_or_else(|| StoreError::NotFound {
            collection: R::COLLECTION.to_string(),
            id: id.to_string(),
        })
    }

    pub fn by_unique(&self, field: &str, value: &str) -> Result<Option<Versioned<R>>, StoreError> {
        self.store.get_by_unique::<R>(field, value)
    }

    pub fn find(&self, predicate: impl Fn(&R) -> bool) -> Result<Vec<R>, StoreError> {
        Ok(self
            .store
            .find_records::<R>(&predicate)?
            .into_iter()
            .map(|v| v.data)
            .collect())
    }

    pub fn all(&self) -> Result<Vec<R>, StoreError> {
        self.find(|_| true)
    }

    pub fn insert(&self, record: &R) -> Result<Versioned<R>, StoreError> {
        let mut batch = WriteBatch::new();
        batch.insert(record)?;
        self.store.commit(batch)?;
        Ok(Versioned {
            data: record.clone(),
            version: 1,
        })
    }

    pub fn update(&self, record: &R, expected_version: u64) -> Result<Versioned<R>, StoreError> {
        let mut batch = WriteBatch::new();
        batch.update(record, expected_version)?;
        self.store.commit(batch)?;
        Ok(Versioned {
            data: record.clone(),
            version: expected_version + 1,
        })
    }
}

/// `store.records::<Card>()` accessor for any [`LedgerStore`].
pub trait RecordsExt: LedgerStore + Sized {
    fn records<R: Record>(&self) -> Records<'_, Self, R> {
        Records::new(self)
    }
}

impl<S: LedgerStore> RecordsExt for S {}
