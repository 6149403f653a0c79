//! Event sink interface between a training loop and whoever watches it.

use std::collections::BTreeMap;

/// Named scalar values reported by one iteration or one validation pass.
pub type MetricMap = BTreeMap<String, f64>;

/// Loop position handed to observer hooks, plus the stop flag the loop checks
/// at iteration and epoch boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopContext {
    /// 0-based index of the current epoch.
    pub epoch: u64,
    /// 0-based global index of the current iteration.
    pub iter: u64,
    stop_training: bool,
}

impl LoopContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(epoch: u64, iter: u64) -> Self {
        Self {
            epoch,
            iter,
            stop_training: false,
        }
    }

    /// Ask the loop to stop at the next boundary.
    pub fn request_stop(&mut self) {
        self.stop_training = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_training
    }
}

/// Hooks a training loop invokes synchronously. All default to no-ops.
pub trait TrainingObserver {
    /// After training iteration `ctx.iter` with that iteration's log values.
    fn after_train_iter(&mut self, _ctx: &mut LoopContext, _logs: &MetricMap) {}

    /// After training epoch `ctx.epoch` completes.
    fn after_train_epoch(&mut self, _ctx: &mut LoopContext) {}

    /// After a validation pass for epoch `ctx.epoch`. `None` when the pass
    /// produced no metrics.
    fn after_val_epoch(&mut self, _ctx: &mut LoopContext, _metrics: Option<&MetricMap>) {}

    fn name(&self) -> &'static str {
        "TrainingObserver"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_flag_is_sticky() {
        let mut ctx = LoopContext::at(2, 40);
        assert!(!ctx.stop_requested());
        ctx.request_stop();
        ctx.request_stop();
        assert!(ctx.stop_requested());
        assert_eq!((ctx.epoch, ctx.iter), (2, 40));
    }

    #[test]
    fn default_hooks_do_nothing() {
        struct Silent;
        impl TrainingObserver for Silent {}

        let mut ctx = LoopContext::new();
        let mut observer = Silent;
        observer.after_train_iter(&mut ctx, &MetricMap::new());
        observer.after_train_epoch(&mut ctx);
        observer.after_val_epoch(&mut ctx, None);
        assert!(!ctx.stop_requested());
        assert_eq!(observer.name(), "TrainingObserver");
    }
}
