//! Recurring background jobs. Call `spawn_all` once during startup.

use crate::services::PaymentService;
use std::time::Duration;

const STALE_PAYMENT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn all background tasks. Tasks are detached via `tokio::spawn`; this
/// function does not block.
pub fn spawn_all(payment_service: PaymentService) {
    // Fail mobile-money payments the provider never called back about
    tokio::spawn(async move {
        loop {
            match payment_service.fail_stale_payments().await {
                Ok(n) if n > 0 => log::info!("Stale mobile-money payments failed: {n}"),
                Ok(_) => {}
                Err(e) => log::error!("Failed to sweep stale payments: {e:?}"),
            }
            tokio::time::sleep(STALE_PAYMENT_SWEEP_INTERVAL).await;
        }
    });
}
