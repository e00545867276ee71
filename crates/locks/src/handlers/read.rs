//! Handler for non-exclusive read locks.

use copydesk_core::{LockLevel, LockRecord};

use super::LevelHandler;

/// Read locks never conflict: any number of holders, including several
/// on the same document, may coexist, and a read lock never blocks an
/// edit lock.
pub struct ReadLockHandler;

impl LevelHandler for ReadLockHandler {
    fn level(&self) -> LockLevel {
        LockLevel::Read
    }

    fn can_acquire(&self, candidate: &LockRecord, _existing: &[LockRecord]) -> bool {
        self.check_level(candidate);
        true
    }
}
