//! Lock level handlers.
//!
//! One handler per [`LockLevel`]; each encodes the compatibility rule for
//! acquiring a lock of its level against the existing record set. The
//! store/remove mechanics are shared across levels.

mod document;
mod element;
mod read;

pub use document::DocumentLockHandler;
pub use element::ElementLockHandler;
pub use read::ReadLockHandler;

use copydesk_core::{LockActionResult, LockLevel, LockOperation, LockRecord, SessionMatch};
use copydesk_store::LockStore;

// ---------------------------------------------------------------------------
// LevelHandler
// ---------------------------------------------------------------------------

/// Common interface of the three level handlers.
///
/// Each level supplies its own [`can_acquire`](LevelHandler::can_acquire)
/// rule; `acquire`, `release`, and `exists` are provided.
pub trait LevelHandler: Send + Sync {
    /// The level this handler arbitrates.
    fn level(&self) -> LockLevel;

    /// Whether `candidate` is compatible with the existing record set
    /// for its resource.
    fn can_acquire(&self, candidate: &LockRecord, existing: &[LockRecord]) -> bool;

    /// Acquire `candidate` if it is compatible.
    ///
    /// On conflict the store is left untouched and the result carries
    /// the current snapshot so the caller can see who holds the lock.
    fn acquire(&self, candidate: LockRecord, store: &mut dyn LockStore) -> LockActionResult {
        self.check_level(&candidate);
        let existing = store.get_current(&candidate.resource_id);
        if !self.can_acquire(&candidate, &existing) {
            return LockActionResult::new(false, LockOperation::Acquire, Some(candidate), existing);
        }
        match store.insert(candidate.clone()) {
            Some(stored) => {
                let snapshot = store.get_current(&stored.resource_id);
                LockActionResult::new(true, LockOperation::Acquire, Some(stored), snapshot)
            }
            None => {
                let snapshot = store.get_current(&candidate.resource_id);
                LockActionResult::new(false, LockOperation::Acquire, Some(candidate), snapshot)
            }
        }
    }

    /// Unconditionally attempt removal of the record `candidate`
    /// identifies. `success` reflects whether a record was actually
    /// removed.
    fn release(&self, candidate: LockRecord, store: &mut dyn LockStore) -> LockActionResult {
        self.check_level(&candidate);
        let removed = store.remove(&candidate);
        let snapshot = store.get_current(&candidate.resource_id);
        match removed {
            Some(record) => {
                LockActionResult::new(true, LockOperation::Release, Some(record), snapshot)
            }
            None => LockActionResult::new(false, LockOperation::Release, Some(candidate), snapshot),
        }
    }

    /// Scan `existing` for a record held by the same user at this level
    /// (and element), under the given session mode.
    ///
    /// On a hit the result carries the matched record, so an idempotent
    /// acquire can return the original acquisition state.
    fn exists(
        &self,
        candidate: &LockRecord,
        session: SessionMatch<'_>,
        existing: &[LockRecord],
    ) -> LockActionResult {
        self.check_level(candidate);
        let found = existing.iter().find(|r| r.matches(candidate, session));
        LockActionResult::new(
            found.is_some(),
            LockOperation::Exists,
            found.cloned().or_else(|| Some(candidate.clone())),
            existing.to_vec(),
        )
    }

    /// A candidate of another level handed to this handler is a
    /// programming error, not a runtime failure users see.
    fn check_level(&self, candidate: &LockRecord) {
        assert!(
            candidate.level == self.level(),
            "{} handler received a {} candidate",
            self.level().as_str(),
            candidate.level.as_str()
        );
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

static READ_HANDLER: ReadLockHandler = ReadLockHandler;
static DOCUMENT_HANDLER: DocumentLockHandler = DocumentLockHandler;
static ELEMENT_HANDLER: ElementLockHandler = ElementLockHandler;

/// Resolve the handler for a lock level.
pub fn handler_for(level: LockLevel) -> &'static dyn LevelHandler {
    match level {
        LockLevel::Read => &READ_HANDLER,
        LockLevel::Document => &DOCUMENT_HANDLER,
        LockLevel::Element => &ELEMENT_HANDLER,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use copydesk_store::MemoryLockStore;

    fn candidate(level: LockLevel, element: Option<&str>) -> LockRecord {
        LockRecord::new("doc1", "alice", level, element)
            .unwrap()
            .with_session("s1")
            .with_acquired_at(chrono::Utc::now())
    }

    #[test]
    fn registry_resolves_each_level() {
        assert_eq!(handler_for(LockLevel::Read).level(), LockLevel::Read);
        assert_eq!(handler_for(LockLevel::Document).level(), LockLevel::Document);
        assert_eq!(handler_for(LockLevel::Element).level(), LockLevel::Element);
    }

    #[test]
    #[should_panic(expected = "document handler received a read candidate")]
    fn wrong_level_candidate_panics() {
        let mut store = MemoryLockStore::new();
        handler_for(LockLevel::Document).acquire(candidate(LockLevel::Read, None), &mut store);
    }

    #[test]
    fn acquire_then_release_round_trip() {
        let mut store = MemoryLockStore::new();
        let handler = handler_for(LockLevel::Document);

        let acquired = handler.acquire(candidate(LockLevel::Document, None), &mut store);
        assert!(acquired.success);
        assert_eq!(acquired.current_records.len(), 1);
        assert!(acquired.record.as_ref().unwrap().acquired_at.is_some());

        let released = handler.release(candidate(LockLevel::Document, None), &mut store);
        assert!(released.success);
        assert!(released.current_records.is_empty());
        assert!(store.get_current("doc1").is_empty());
    }

    #[test]
    fn release_of_unheld_lock_reports_failure() {
        let mut store = MemoryLockStore::new();
        let result =
            handler_for(LockLevel::Document).release(candidate(LockLevel::Document, None), &mut store);
        assert!(!result.success);
        assert_eq!(result.operation, LockOperation::Release);
    }

    #[test]
    fn exists_returns_matched_record() {
        let mut store = MemoryLockStore::new();
        let handler = handler_for(LockLevel::Element);
        handler.acquire(candidate(LockLevel::Element, Some("art1")), &mut store);

        let probe = LockRecord::new("doc1", "ALICE", LockLevel::Element, Some("art1")).unwrap();
        let existing = store.get_current("doc1");

        let hit = handler.exists(&probe, SessionMatch::Exact("s1"), &existing);
        assert!(hit.success);
        assert_eq!(hit.record.unwrap().user_login, "alice");

        let miss = handler.exists(&probe, SessionMatch::Exact("s2"), &existing);
        assert!(!miss.success);

        let any = handler.exists(&probe, SessionMatch::AnySession, &existing);
        assert!(any.success);
    }

    #[test]
    fn conflicting_acquire_leaves_store_untouched() {
        let mut store = MemoryLockStore::new();
        let handler = handler_for(LockLevel::Document);
        handler.acquire(candidate(LockLevel::Document, None), &mut store);

        let bob = LockRecord::new("doc1", "bob", LockLevel::Document, None)
            .unwrap()
            .with_session("s2");
        let denied = handler.acquire(bob, &mut store);
        assert!(!denied.success);
        assert_eq!(denied.current_records.len(), 1);
        assert_eq!(denied.current_records[0].user_login, "alice");
        assert_eq!(store.get_current("doc1").len(), 1);
    }
}
