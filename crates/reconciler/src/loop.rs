//! Continuous reconciliation loop.
//!
//! Sweeps every stored resource on a fixed interval. A cycle that asks to
//! be requeued immediately is re-run within the same sweep, up to a limit.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::controller::{Controller, ReconcileOutcome};
use crate::error::{Error, Result};
use crate::resource::ResourceKey;

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Interval between sweeps.
    pub interval: Duration,
    /// Immediate re-runs allowed per resource and sweep.
    pub max_requeues: usize,
    /// Consecutive failed sweeps before stopping.
    pub max_errors: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_requeues: 3,
            max_errors: 10,
        }
    }
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub reconciled: usize,
    pub failed: usize,
}

/// Continuous reconciliation loop.
pub struct ReconciliationLoop {
    controller: Arc<Controller>,
    config: LoopConfig,
    stop_rx: watch::Receiver<bool>,
    stop_tx: watch::Sender<bool>,
}

impl ReconciliationLoop {
    /// Create a new reconciliation loop.
    pub fn new(controller: Arc<Controller>, config: LoopConfig) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            controller,
            config,
            stop_rx,
            stop_tx,
        }
    }

    /// Run until stopped or until too many sweeps fail in a row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReconcileFailed`] once `max_errors` consecutive
    /// sweeps could not list resources.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            interval_ms = self.config.interval.as_millis(),
            "Starting reconciliation loop"
        );

        let mut consecutive_errors = 0usize;
        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.reconcile_all().await {
                        Ok(summary) => {
                            consecutive_errors = 0;
                            debug!(
                                reconciled = summary.reconciled,
                                failed = summary.failed,
                                "Sweep finished"
                            );
                        }
                        Err(e) => {
                            consecutive_errors = consecutive_errors.saturating_add(1);
                            error!(
                                error = %e,
                                consecutive = consecutive_errors,
                                "Sweep failed"
                            );

                            if consecutive_errors >= self.config.max_errors {
                                error!("Max errors reached, stopping loop");
                                return Err(Error::reconcile_failed(format!(
                                    "Max errors ({}) reached",
                                    self.config.max_errors
                                )));
                            }
                        }
                    }
                }
                _ = self.stop_rx.changed() => {
                    if *self.stop_rx.borrow() {
                        info!("Reconciliation loop stopped");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Reconcile every stored resource once.
    ///
    /// Per-resource failures are logged and counted; the next sweep retries
    /// them.
    ///
    /// # Errors
    ///
    /// Returns an error when the resource list cannot be read.
    pub async fn reconcile_all(&self) -> Result<SweepSummary> {
        let keys = self.controller.store().list().await?;
        let mut summary = SweepSummary::default();

        for key in &keys {
            match self.reconcile_key(key).await {
                Ok(_) => summary.reconciled = summary.reconciled.saturating_add(1),
                Err(e) => {
                    summary.failed = summary.failed.saturating_add(1);
                    warn!(
                        resource = %key,
                        error = %e,
                        retryable = e.is_retryable(),
                        "Reconcile failed"
                    );
                }
            }
        }

        Ok(summary)
    }

    /// Reconcile one resource, following immediate requeues.
    ///
    /// # Errors
    ///
    /// Returns the error of the last cycle run.
    pub async fn reconcile_key(&self, key: &ResourceKey) -> Result<ReconcileOutcome> {
        let mut outcome = self.controller.reconcile(key).await?;
        let mut requeues = 0usize;

        while outcome.should_requeue() && requeues < self.config.max_requeues {
            if let Some(delay) = outcome.requeue_after.filter(|d| !d.is_zero()) {
                tokio::time::sleep(delay).await;
            }
            requeues = requeues.saturating_add(1);
            outcome = self.controller.reconcile(key).await?;
        }

        Ok(outcome)
    }

    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }
}

/// Handle to stop a reconciliation loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}
