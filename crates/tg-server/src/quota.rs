//! Daily quota reset task
//!
//! This module provides a background task that periodically zeroes every
//! tenant's daily transfer counter.
//!
//! # Reset interval
//!
//! The interval is plain elapsed wall-clock time measured from startup. It
//! is not aligned to midnight in any timezone, so a "day" starts whenever
//! the daemon started. Lifetime totals are never reset.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::registry::Registry;

/// Run the quota reset task until `cancel` fires.
///
/// The first reset happens one full `period` after the task starts.
///
/// # Arguments
///
/// * `registry` - The registry whose counters are reset
/// * `period` - Time between resets
/// * `cancel` - Cancellation token for graceful shutdown
pub async fn run_quota_reset(registry: Arc<Registry>, period: Duration, cancel: CancellationToken) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!("Starting quota reset task (interval: {:?})", period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let count = registry.reset_daily_usage().await;
                tracing::info!("Reset daily transfer counters for {} tenants", count);
            }
            _ = cancel.cancelled() => {
                tracing::info!("Quota reset task shutting down");
                break;
            }
        }
    }
}
