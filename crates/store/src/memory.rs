//! In-memory lock record store.

use std::collections::HashMap;

use copydesk_core::LockRecord;

use crate::LockStore;

/// In-process record store keyed by resource id.
///
/// Records for one resource keep their insertion order; empty buckets
/// are dropped on removal.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    records: HashMap<String, Vec<LockRecord>>,
}

impl MemoryLockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of held records across all resources.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// Whether no locks are currently held.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl LockStore for MemoryLockStore {
    fn get_current(&self, resource_id: &str) -> Vec<LockRecord> {
        self.records.get(resource_id).cloned().unwrap_or_default()
    }

    fn get_all(&self) -> Vec<LockRecord> {
        self.records.values().flatten().cloned().collect()
    }

    fn insert(&mut self, record: LockRecord) -> Option<LockRecord> {
        self.records
            .entry(record.resource_id.clone())
            .or_default()
            .push(record.clone());
        Some(record)
    }

    fn remove(&mut self, probe: &LockRecord) -> Option<LockRecord> {
        let bucket = self.records.get_mut(&probe.resource_id)?;
        let index = bucket.iter().position(|r| r.matched_by(probe))?;
        let removed = bucket.remove(index);
        if bucket.is_empty() {
            self.records.remove(&probe.resource_id);
        }
        Some(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
