//! Background sweeper — periodic housekeeping loop.
//!
//! Every cycle it:
//! - drops stale pending alerts and trims rate buckets
//! - expires pending predictions into false positives
//! - applies retention: archives old RESOLVED alerts, deletes old logs
//!
//! All steps are idempotent, so an overdue or doubled cycle is harmless.

use chrono::Utc;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::defaults;
use crate::lifecycle::LifecycleManager;
use crate::pipeline::AlertPipeline;

/// Periodic housekeeping over the pipeline and store.
pub struct Sweeper {
    pipeline: Arc<AlertPipeline>,
    lifecycle: Arc<LifecycleManager>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(pipeline: Arc<AlertPipeline>, lifecycle: Arc<LifecycleManager>) -> Self {
        Self {
            pipeline,
            lifecycle,
            interval: Duration::from_secs(defaults::SWEEP_INTERVAL_SECS),
        }
    }

    /// Override the tick interval (tests).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the sweep loop until cancellation (call from `tokio::spawn`).
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "Background sweeper started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Background sweeper stopping");
                    break;
                }
                () = tokio::time::sleep(self.interval) => {
                    self.run_cycle();
                }
            }
        }
    }

    /// One housekeeping cycle.
    pub fn run_cycle(&self) {
        let now = Utc::now();

        let stale_pending = self.pipeline.sweep(now);
        if stale_pending > 0 {
            debug!(stale_pending, "Swept stale pending alerts");
        }

        let expired = {
            let metrics = self.pipeline.metrics();
            let mut tracker = metrics.lock().unwrap_or_else(PoisonError::into_inner);
            tracker.expire_pending_predictions(now)
        };
        if expired > 0 {
            debug!(expired, "Expired pending predictions to false positives");
        }

        match self.lifecycle.apply_retention(now) {
            Ok((archived, deleted)) => {
                if archived > 0 || deleted > 0 {
                    info!(archived, deleted, "Retention applied");
                }
            }
            Err(e) => {
                warn!(error = %e, "Retention sweep failed; will retry next cycle");
            }
        }
    }
}
