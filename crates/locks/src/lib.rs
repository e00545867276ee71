//! The copydesk lock arbitration engine.
//!
//! Arbitrates concurrent access to shared documents edited by multiple
//! users across multiple sessions:
//!
//! - [`handlers`] — one handler per lock level, each encoding its
//!   compatibility rule against the current record set.
//! - [`service::LockingService`] — the public entry point: validates
//!   requests, makes acquire/release idempotent, serializes all state
//!   mutation, and triggers broadcast on every state change.
//! - [`background`] — periodic audit logging and the forced release
//!   sweep, spawned by the embedding process.

pub mod background;
pub mod handlers;
pub mod service;

pub use handlers::{handler_for, LevelHandler};
pub use service::LockingService;
