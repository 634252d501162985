use super::{row_key, Record, StoreError, Versioned};

/// What a single staged write does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Insert,
    Update { expected_version: u64 },
    Delete { expected_version: u64 },
}

/// A type-erased staged write.
#[derive(Debug, Clone)]
pub struct WriteOp {
    pub collection: &'static str,
    pub id: String,
    pub kind: WriteKind,
    /// JSON bytes; empty for deletes.
    pub bytes: Vec<u8>,
    pub unique_keys: Vec<(&'static str, String)>,
}

impl WriteOp {
    pub fn key(&self) -> String {
        row_key(self.collection, &self.id)
    }
}

/// Writes that must be applied together or not at all.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<R: Record>(&mut self, record: &R) -> Result<&mut Self, StoreError> {
        self.push(record, WriteKind::Insert)
    }

    pub fn update<R: Record>(
        &mut self,
        record: &R,
        expected_version: u64,
    ) -> Result<&mut Self, StoreError> {
        self.push(record, WriteKind::Update { expected_version })
    }

    pub fn delete<R: Record>(&mut self, id: &str, expected_version: u64) -> &mut Self {
        self.ops.push(WriteOp {
            collection: R::COLLECTION,
            id: id.to_string(),
            kind: WriteKind::Delete { expected_version },
            bytes: Vec::new(),
            unique_keys: Vec::new(),
        });
        self
    }

    fn push<R: Record>(&mut self, record: &R, kind: WriteKind) -> Result<&mut Self, StoreError> {
        let bytes = serde_json::to_vec(record).map_err(|e| StoreError::Serde(e.to_string()))?;
        self.ops.push(WriteOp {
            collection: R::COLLECTION,
            id: record.id(),
            kind,
            bytes,
            unique_keys: record.unique_keys(),
        });
        Ok(self)
    }

    /// Whether a write for the given row is already staged.
    pub fn touches(&self, collection: &str, id: &str) -> bool {
        self.ops
            .iter()
            .any(|op| op.collection == collection && op.id == id)
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Storage backend for the ledger.
///
/// Reads return versioned copies; all writes go through [`commit`], which
/// must apply the whole batch atomically and reject it entirely when any
/// expected version, primary key or unique key check fails.
///
/// [`commit`]: LedgerStore::commit
pub trait LedgerStore: Send + Sync {
    fn get_record<R: Record>(&self, id: &str) -> Result<Option<Versioned<R>>, StoreError>;

    /// Look a record up by one of its unique keys.
    fn get_by_unique<R: Record>(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Option<Versioned<R>>, StoreError>;

    /// All records of a collection matching `predicate`, in key order.
    fn find_records<R: Record>(
        &self,
        predicate: &dyn Fn(&R) -> bool,
    ) -> Result<Vec<Versioned<R>>, StoreError>;

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}
