//! BTreeMap-backed ledger store for tests and the in-process simulation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::{row_key, LedgerStore, Record, StoreError, Versioned, WriteBatch, WriteKind};

struct StoredRecord {
    bytes: Vec<u8>,
    version: u64,
    unique_keys: Vec<String>,
}

#[derive(Default)]
struct Tables {
    rows: BTreeMap<String, StoredRecord>,
    /// `"collection.field=value"` -> row key
    unique: HashMap<String, String>,
}

fn unique_key(collection: &str, field: &str, value: &str) -> String {
    format!("{}.{}={}", collection, field, value)
}

/// In-memory ledger store.
///
/// Row key is `"COLLECTION:id"`. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored in a collection.
    pub fn count(&self, collection: &str) -> Result<usize, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        let prefix = format!("{}:", collection);
        Ok(tables
            .rows
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .count())
    }

    fn decode<R: Record>(stored: &StoredRecord) -> Result<Versioned<R>, StoreError> {
        let data =
            serde_json::from_slice(&stored.bytes).map_err(|e| StoreError::Serde(e.to_string()))?;
        Ok(Versioned {
            data,
            version: stored.version,
        })
    }
}

/// Shadow view of the rows a batch touches, used to validate the batch
/// in order before anything is applied.
struct Shadow<'t> {
    tables: &'t Tables,
    versions: HashMap<String, Option<u64>>,
    uniques_of: HashMap<String, Vec<String>>,
    owners: HashMap<String, Option<String>>,
}

impl<'t> Shadow<'t> {
    fn new(tables: &'t Tables) -> Self {
        Self {
            tables,
            versions: HashMap::new(),
            uniques_of: HashMap::new(),
            owners: HashMap::new(),
        }
    }

    fn version(&self, key: &str) -> Option<u64> {
        match self.versions.get(key) {
            Some(version) => *version,
            None => self.tables.rows.get(key).map(|row| row.version),
        }
    }

    fn uniques(&self, key: &str) -> Vec<String> {
        match self.uniques_of.get(key) {
            Some(keys) => keys.clone(),
            None => self
                .tables
                .rows
                .get(key)
                .map(|row| row.unique_keys.clone())
                .unwrap_or_default(),
        }
    }

    fn owner(&self, unique: &str) -> Option<String> {
        match self.owners.get(unique) {
            Some(owner) => owner.clone(),
            None => self.tables.unique.get(unique).cloned(),
        }
    }

    fn claim_uniques(
        &self,
        key: &str,
        collection: &str,
        keys: &[(&'static str, String)],
    ) -> Result<Vec<String>, StoreError> {
        let mut claimed = Vec::with_capacity(keys.len());
        for (field, value) in keys {
            let unique = unique_key(collection, field, value);
            if let Some(owner) = self.owner(&unique) {
                if owner != key {
                    return Err(StoreError::UniqueViolation {
                        collection: collection.to_string(),
                        field: (*field).to_string(),
                        value: value.clone(),
                    });
                }
            }
            claimed.push(unique);
        }
        Ok(claimed)
    }

    fn release_uniques(&mut self, key: &str) {
        for unique in self.uniques(key) {
            self.owners.insert(unique, None);
        }
        self.uniques_of.insert(key.to_string(), Vec::new());
    }

    fn validate(&mut self, batch: &WriteBatch) -> Result<(), StoreError> {
        for op in batch.ops() {
            let key = op.key();
            let current = self.version(&key);
            match op.kind {
                WriteKind::Insert => {
                    if current.is_some() {
                        return Err(StoreError::Duplicate {
                            collection: op.collection.to_string(),
                            id: op.id.clone(),
                        });
                    }
                    let claimed = self.claim_uniques(&key, op.collection, &op.unique_keys)?;
                    for unique in &claimed {
                        self.owners.insert(unique.clone(), Some(key.clone()));
                    }
                    self.uniques_of.insert(key.clone(), claimed);
                    self.versions.insert(key, Some(1));
                }
                WriteKind::Update { expected_version } | WriteKind::Delete { expected_version } => {
                    let actual = current.ok_or_else(|| StoreError::NotFound {
                        collection: op.collection.to_string(),
                        id: op.id.clone(),
                    })?;
                    if actual != expected_version {
                        return Err(StoreError::Conflict {
                            collection: op.collection.to_string(),
                            id: op.id.clone(),
                            expected: expected_version,
                            actual,
                        });
                    }
                    if matches!(op.kind, WriteKind::Delete { .. }) {
                        self.release_uniques(&key);
                        self.versions.insert(key, None);
                        continue;
                    }
                    let claimed = self.claim_uniques(&key, op.collection, &op.unique_keys)?;
                    self.release_uniques(&key);
                    for unique in &claimed {
                        self.owners.insert(unique.clone(), Some(key.clone()));
                    }
                    self.uniques_of.insert(key.clone(), claimed);
                    self.versions.insert(key, Some(actual + 1));
                }
            }
        }
        Ok(())
    }
}

impl Tables {
    fn remove_row(&mut self, key: &str) -> Option<StoredRecord> {
        let removed = self.rows.remove(key)?;
        for unique in &removed.unique_keys {
            if self.unique.get(unique).map(String::as_str) == Some(key) {
                self.unique.remove(unique);
            }
        }
        Some(removed)
    }

    fn put_row(
        &mut self,
        key: String,
        collection: &str,
        op_keys: &[(&'static str, String)],
        bytes: Vec<u8>,
        version: u64,
    ) {
        let unique_keys: Vec<String> = op_keys
            .iter()
            .map(|(field, value)| unique_key(collection, field, value))
            .collect();
        for unique in &unique_keys {
            self.unique.insert(unique.clone(), key.clone());
        }
        self.rows.insert(
            key,
            StoredRecord {
                bytes,
                version,
                unique_keys,
            },
        );
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn get_record<R: Record>(&self, id: &str) -> Result<Option<Versioned<R>>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        tables
            .rows
            .get(&row_key(R::COLLECTION, id))
            .map(Self::decode::<R>)
            .transpose()
    }

    fn get_by_unique<R: Record>(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Option<Versioned<R>>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        let Some(key) = tables.unique.get(&unique_key(R::COLLECTION, field, value)) else {
            return Ok(None);
        };
        tables.rows.get(key).map(Self::decode::<R>).transpose()
    }

    fn find_records<R: Record>(
        &self,
        predicate: &dyn Fn(&R) -> bool,
    ) -> Result<Vec<Versioned<R>>, StoreError> {
        let tables = self.tables.read().map_err(|_| StoreError::Poisoned)?;
        let prefix = format!("{}:", R::COLLECTION);
        let mut results = Vec::new();

        for (_, stored) in tables
            .rows
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
        {
            let record = Self::decode::<R>(stored)?;
            if predicate(&record.data) {
                results.push(record);
            }
        }

        Ok(results)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        Shadow::new(&tables).validate(&batch)?;

        for op in batch.ops() {
            let key = op.key();
            match op.kind {
                WriteKind::Insert => {
                    tables.put_row(key, op.collection, &op.unique_keys, op.bytes.clone(), 1);
                }
                WriteKind::Update { expected_version } => {
                    tables.remove_row(&key);
                    tables.put_row(
                        key,
                        op.collection,
                        &op.unique_keys,
                        op.bytes.clone(),
                        expected_version + 1,
                    );
                }
                WriteKind::Delete { .. } => {
                    tables.remove_row(&key);
                }
            }
        }

        Ok(())
    }
}
