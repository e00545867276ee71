//! The lock-record store: the authoritative owner of currently-held locks.
//!
//! The engine consumes the [`LockStore`] trait; [`MemoryLockStore`] is the
//! in-process implementation this subsystem ships with. A durable
//! implementation would plug in at the same seam.

pub mod memory;

pub use memory::MemoryLockStore;

use copydesk_core::LockRecord;

/// Contract between the lock engine and the record store.
///
/// The store is only ever accessed while the coordinator holds its
/// exclusion, so the methods take `&mut self` and need no internal
/// synchronization.
pub trait LockStore: Send {
    /// All records currently held for one resource.
    fn get_current(&self, resource_id: &str) -> Vec<LockRecord>;

    /// All records currently held across every resource.
    fn get_all(&self) -> Vec<LockRecord>;

    /// Insert a record. Returns the stored record, or `None` if the
    /// store refused the insert.
    fn insert(&mut self, record: LockRecord) -> Option<LockRecord>;

    /// Remove the record identified by `probe` (holder identity, plus
    /// the probe's session when it carries one). Returns the removed
    /// record, or `None` if nothing matched.
    fn remove(&mut self, probe: &LockRecord) -> Option<LockRecord>;
}
