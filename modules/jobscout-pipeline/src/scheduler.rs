//! Polling shell around the cycle runner.
//!
//! One failed cycle is logged and retried on the next interval tick; the
//! shell never crash-loops into an immediate retry. The sleep is chunked so
//! a shutdown request takes effect within a second instead of a full
//! interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::cycle::CycleRunner;

const SHUTDOWN_POLL: Duration = Duration::from_millis(500);

pub struct CycleScheduler {
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl CycleScheduler {
    pub fn new(interval_minutes: u64, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            interval: Duration::from_secs(interval_minutes * 60),
            shutdown,
        }
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Run cycles until shutdown. Sleep time subtracts the cycle's own
    /// elapsed time so the tick cadence stays fixed.
    pub async fn run_forever(&self, runner: &CycleRunner) {
        let mut cycle_num: u64 = 1;
        while !self.shutdown_requested() {
            info!(cycle = cycle_num, "Starting cycle");
            let started = Instant::now();

            if let Err(e) = runner.run_one_cycle().await {
                error!(cycle = cycle_num, error = %e, "Cycle failed; retrying on next tick");
            }

            if self.shutdown_requested() {
                break;
            }

            let sleep_for = self.interval.saturating_sub(started.elapsed());
            if !sleep_for.is_zero() {
                info!(
                    minutes = sleep_for.as_secs() / 60,
                    "Sleeping until next cycle"
                );
                self.interruptible_sleep(sleep_for).await;
            }

            cycle_num += 1;
        }
        info!(cycles = cycle_num, "Scheduler stopped");
    }

    async fn interruptible_sleep(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while Instant::now() < deadline && !self.shutdown_requested() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(remaining.min(SHUTDOWN_POLL)).await;
        }
    }
}
