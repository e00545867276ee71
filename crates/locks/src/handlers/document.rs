//! Handler for exclusive whole-document edit locks.

use copydesk_core::{LockLevel, LockRecord};

use super::LevelHandler;

/// A document lock conflicts with any other `Document` or `Element`
/// lock on the same resource. Read locks are skipped.
pub struct DocumentLockHandler;

impl LevelHandler for DocumentLockHandler {
    fn level(&self) -> LockLevel {
        LockLevel::Document
    }

    fn can_acquire(&self, candidate: &LockRecord, existing: &[LockRecord]) -> bool {
        self.check_level(candidate);
        !existing
            .iter()
            .any(|r| matches!(r.level, LockLevel::Document | LockLevel::Element))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(user: &str) -> LockRecord {
        LockRecord::new("doc1", user, LockLevel::Document, None).unwrap()
    }

    #[test]
    fn compatible_with_empty_set_and_reads() {
        let handler = DocumentLockHandler;
        assert!(handler.can_acquire(&doc("alice"), &[]));

        let reads = vec![
            LockRecord::new("doc1", "bob", LockLevel::Read, None).unwrap(),
            LockRecord::new("doc1", "carol", LockLevel::Read, None).unwrap(),
        ];
        assert!(handler.can_acquire(&doc("alice"), &reads));
    }

    #[test]
    fn blocked_by_document_lock() {
        let handler = DocumentLockHandler;
        let existing = vec![doc("bob")];
        assert!(!handler.can_acquire(&doc("alice"), &existing));
    }

    #[test]
    fn blocked_by_element_lock() {
        let handler = DocumentLockHandler;
        let existing =
            vec![LockRecord::new("doc1", "bob", LockLevel::Element, Some("art1")).unwrap()];
        assert!(!handler.can_acquire(&doc("alice"), &existing));
    }
}
