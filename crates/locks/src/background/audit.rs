//! Periodic audit logging of held locks.
//!
//! Spawns a loop that logs every currently-held lock record (holder,
//! level, acquisition time) on a fixed interval using
//! `tokio::time::interval`. Observation only: no state change and no
//! broadcast.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use copydesk_store::LockStore;

use crate::service::LockingService;

/// Default audit interval: 5 minutes.
const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Run the lock audit loop until `cancel` is triggered.
///
/// The interval is read from `LOCK_AUDIT_INTERVAL_SECS` (defaults to
/// 300).
pub async fn run<S: LockStore + 'static>(
    service: Arc<LockingService<S>>,
    cancel: CancellationToken,
) {
    let interval_secs: u64 = std::env::var("LOCK_AUDIT_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS);

    tracing::info!(interval_secs, "Lock audit job started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Lock audit job stopping");
                break;
            }
            _ = interval.tick() => {
                service.audit_held_locks().await;
            }
        }
    }
}
