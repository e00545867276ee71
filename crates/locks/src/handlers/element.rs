//! Handler for exclusive sub-element locks.

use copydesk_core::{LockLevel, LockRecord};

use super::LevelHandler;

/// An element lock conflicts with any `Document` lock on the resource
/// and with any `Element` lock carrying the same `element_id`. Read
/// locks and element locks on other elements are skipped.
pub struct ElementLockHandler;

impl LevelHandler for ElementLockHandler {
    fn level(&self) -> LockLevel {
        LockLevel::Element
    }

    fn can_acquire(&self, candidate: &LockRecord, existing: &[LockRecord]) -> bool {
        self.check_level(candidate);
        !existing.iter().any(|r| match r.level {
            LockLevel::Document => true,
            LockLevel::Element => r.element_id == candidate.element_id,
            LockLevel::Read => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(user: &str, el: &str) -> LockRecord {
        LockRecord::new("doc1", user, LockLevel::Element, Some(el)).unwrap()
    }

    #[test]
    fn compatible_with_reads_and_other_elements() {
        let handler = ElementLockHandler;
        let existing = vec![
            LockRecord::new("doc1", "bob", LockLevel::Read, None).unwrap(),
            element("carol", "art2"),
        ];
        assert!(handler.can_acquire(&element("alice", "art1"), &existing));
    }

    #[test]
    fn blocked_by_document_lock() {
        let handler = ElementLockHandler;
        let existing = vec![LockRecord::new("doc1", "bob", LockLevel::Document, None).unwrap()];
        assert!(!handler.can_acquire(&element("alice", "art1"), &existing));
    }

    #[test]
    fn blocked_by_same_element() {
        let handler = ElementLockHandler;
        let existing = vec![element("bob", "art1")];
        assert!(!handler.can_acquire(&element("alice", "art1"), &existing));
    }

    #[test]
    fn empty_set_is_compatible() {
        let handler = ElementLockHandler;
        assert!(handler.can_acquire(&element("alice", "art1"), &[]));
    }
}
