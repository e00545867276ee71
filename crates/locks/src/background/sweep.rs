//! Periodic forced release of all held locks.
//!
//! Safety net against lock leaks from crashed sessions: on each tick,
//! every held record is released through its level's handler and the
//! release is broadcast, exactly as an explicit release would be.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use copydesk_store::LockStore;

use crate::service::LockingService;

/// Default sweep interval: 24 hours (nightly).
const DEFAULT_INTERVAL_SECS: u64 = 86_400;

/// Run the forced release sweep until `cancel` is triggered.
///
/// The interval is read from `LOCK_SWEEP_INTERVAL_SECS` (defaults to
/// 86 400).
pub async fn run<S: LockStore + 'static>(
    service: Arc<LockingService<S>>,
    cancel: CancellationToken,
) {
    let interval_secs: u64 = std::env::var("LOCK_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS);

    tracing::info!(interval_secs, "Lock sweep job started");

    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Lock sweep job stopping");
                break;
            }
            _ = interval.tick() => {
                service.force_release_all().await;
            }
        }
    }
}
