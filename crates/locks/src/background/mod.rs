//! Background tasks and scheduled jobs.
//!
//! Each submodule provides a long-running async function intended to be
//! spawned via `tokio::spawn`. All tasks accept a [`CancellationToken`]
//! for graceful shutdown; the cadence is owned by the embedding process
//! through environment variables.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod audit;
pub mod sweep;
