//! Copydesk domain core: the types and rules of the document locking
//! subsystem.
//!
//! This crate has no internal dependencies so that the store, the event
//! fan-out, and the lock engine can all reference the same record types,
//! lock levels, and validation rules.

pub mod error;
pub mod locking;
pub mod types;

pub use error::CoreError;
pub use locking::{
    LockActionResult, LockHolder, LockLevel, LockOperation, LockRecord, LockUpdateMessage,
    SessionMatch,
};
