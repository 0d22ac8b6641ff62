use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::task::types::TaskRecord;

/// The worker's authoritative mapping from task identity to its last-known
/// record.
///
/// Single-writer discipline is structural: only the reconciliation loop calls
/// [`RecordStore::put`]. Readers clone records out under the read lock, so no
/// reader ever observes a partially written record. Records are never removed;
/// history retention is an external concern.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: RwLock<HashMap<Uuid, TaskRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Uuid) -> Option<TaskRecord> {
        self.read().get(id).cloned()
    }

    /// Overwrite the record for the task identified by `record.task.id`.
    pub fn put(&self, record: TaskRecord) {
        self.write().insert(record.task.id, record);
    }

    pub fn list(&self) -> Vec<TaskRecord> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, TaskRecord>> {
        self.records.read().expect("record store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, TaskRecord>> {
        self.records.write().expect("record store lock poisoned")
    }
}
