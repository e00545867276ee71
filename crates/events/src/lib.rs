//! Lock update fan-out infrastructure.
//!
//! This crate provides the building blocks for pushing lock state changes
//! to interested observers:
//!
//! - [`LockBroadcaster`] — the listener registry and asynchronous
//!   dispatcher. Constructed once by the process lifecycle and handed to
//!   the lock engine by `Arc`.
//! - [`LockUpdateListener`] — the interface observers implement.
//! - [`ChannelListener`] — a ready-made listener that forwards matching
//!   updates into an `mpsc` channel, for the transport layer and tests.

pub mod broadcast;
pub mod channel;

pub use broadcast::{ListenerFilter, ListenerId, LockBroadcaster, LockUpdateListener};
pub use channel::ChannelListener;
