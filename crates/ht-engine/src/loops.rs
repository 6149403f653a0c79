//! Epoch-based training loop driver.
//!
//! Engines that own their training step can use [`EpochLoop`] to get the
//! observer contract right: hooks fire in the order train iteration, epoch
//! end, validation; the stop flag is honoured right after an iteration, and
//! after the validation pass that closes an epoch.

use ht_types::TrainResult;

use crate::observer::{LoopContext, MetricMap, TrainingObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochLoop {
    max_epochs: u64,
    iters_per_epoch: u64,
    /// Validate every `val_interval` epochs; 0 disables validation.
    val_interval: u64,
}

/// What a finished loop did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub iters_run: u64,
    pub epochs_run: u64,
    pub stopped_early: bool,
}

impl EpochLoop {
    pub fn new(max_epochs: u64, iters_per_epoch: u64) -> Self {
        Self {
            max_epochs,
            iters_per_epoch,
            val_interval: 1,
        }
    }

    pub fn with_val_interval(mut self, val_interval: u64) -> Self {
        self.val_interval = val_interval;
        self
    }

    pub fn max_epochs(&self) -> u64 {
        self.max_epochs
    }

    pub fn iters_per_epoch(&self) -> u64 {
        self.iters_per_epoch
    }

    /// Drive `step` and `validate` through the loop, notifying `observer`.
    ///
    /// `step` returns the log values of one training iteration; `validate`
    /// returns the metrics of one validation pass. An error from either ends
    /// the loop and is returned as is.
    pub fn run<S, V>(
        &self,
        observer: &mut dyn TrainingObserver,
        mut step: S,
        mut validate: V,
    ) -> TrainResult<LoopSummary>
    where
        S: FnMut(&LoopContext) -> TrainResult<MetricMap>,
        V: FnMut(&LoopContext) -> TrainResult<Option<MetricMap>>,
    {
        let mut ctx = LoopContext::new();
        let mut summary = LoopSummary::default();

        for epoch in 0..self.max_epochs {
            ctx.epoch = epoch;
            for local_iter in 0..self.iters_per_epoch {
                ctx.iter = epoch * self.iters_per_epoch + local_iter;
                let logs = step(&ctx)?;
                observer.after_train_iter(&mut ctx, &logs);
                summary.iters_run += 1;
                if ctx.stop_requested() {
                    summary.stopped_early = true;
                    return Ok(summary);
                }
            }

            observer.after_train_epoch(&mut ctx);
            summary.epochs_run += 1;

            if self.val_interval > 0 && (epoch + 1) % self.val_interval == 0 {
                let metrics = validate(&ctx)?;
                observer.after_val_epoch(&mut ctx, metrics.as_ref());
            }

            if ctx.stop_requested() {
                summary.stopped_early = epoch + 1 < self.max_epochs;
                return Ok(summary);
            }
        }

        Ok(summary)
    }
}
