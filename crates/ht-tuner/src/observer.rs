//! The observer a trial attaches to its training run.

use tracing::debug;

use ht_engine::{LoopContext, MetricMap, TrainingObserver};
use ht_types::{ReportOp, Rule, ScoreError, StopBudget};

use crate::scoreboard::MetricScoreboard;

/// How a trial's monitored metric is collected, stopped on and reduced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPolicy {
    pub monitor: String,
    pub rule: Rule,
    pub budget: StopBudget,
    pub report_op: ReportOp,
}

/// Collects the monitored metric from training logs and validation metrics,
/// and stops the run once the trial budget is spent.
///
/// The metric is read from whichever source reports it; a key absent from a
/// given report is skipped without error.
#[derive(Debug, Clone)]
pub struct ReportingObserver {
    policy: ReportPolicy,
    scoreboard: MetricScoreboard,
}

impl ReportingObserver {
    pub fn new(policy: ReportPolicy) -> Self {
        Self {
            policy,
            scoreboard: MetricScoreboard::new(),
        }
    }

    pub fn policy(&self) -> &ReportPolicy {
        &self.policy
    }

    pub fn scoreboard(&self) -> &MetricScoreboard {
        &self.scoreboard
    }

    /// The trial's score under the policy's reduce operation.
    pub fn report_score(&self) -> Result<f64, ScoreError> {
        self.scoreboard
            .reduce(self.policy.report_op, self.policy.rule)
    }

    pub fn clear_scoreboard(&mut self) {
        self.scoreboard.clear();
    }

    fn collect(&mut self, metrics: &MetricMap) {
        if let Some(value) = metrics.get(&self.policy.monitor) {
            self.scoreboard.append(*value);
        }
    }
}

impl TrainingObserver for ReportingObserver {
    fn after_train_iter(&mut self, ctx: &mut LoopContext, logs: &MetricMap) {
        self.collect(logs);
        if let StopBudget::Iterations(limit) = self.policy.budget {
            if ctx.iter.checked_add(1) == Some(limit) {
                debug!(iter = ctx.iter, limit, "iteration budget spent, stopping run");
                ctx.request_stop();
            }
        }
    }

    fn after_train_epoch(&mut self, ctx: &mut LoopContext) {
        if let StopBudget::Epochs(limit) = self.policy.budget {
            if ctx.epoch.checked_add(1) == Some(limit) {
                debug!(epoch = ctx.epoch, limit, "epoch budget spent, stopping run");
                ctx.request_stop();
            }
        }
    }

    fn after_val_epoch(&mut self, _ctx: &mut LoopContext, metrics: Option<&MetricMap>) {
        if let Some(metrics) = metrics {
            self.collect(metrics);
        }
    }

    fn name(&self) -> &'static str {
        "ReportingObserver"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_engine::{CommandEngine, CommandSpec, EpochLoop, TrainingEngine};
    use ht_types::TrainResult;
    use serde_json::json;

    fn policy(monitor: &str, budget: StopBudget, report_op: ReportOp) -> ReportPolicy {
        ReportPolicy {
            monitor: monitor.to_string(),
            rule: Rule::Less,
            budget,
            report_op,
        }
    }

    fn metrics(key: &str, value: f64) -> MetricMap {
        MetricMap::from([(key.to_string(), value)])
    }

    #[test]
    fn iteration_budget_stops_after_last_counted_iteration() {
        let mut observer =
            ReportingObserver::new(policy("loss", StopBudget::Iterations(3), ReportOp::Latest));

        for iter in 0..2 {
            let mut ctx = LoopContext::at(0, iter);
            observer.after_train_iter(&mut ctx, &metrics("loss", iter as f64));
            assert!(!ctx.stop_requested());
        }
        let mut ctx = LoopContext::at(0, 2);
        observer.after_train_iter(&mut ctx, &metrics("loss", 2.0));
        assert!(ctx.stop_requested());
        assert_eq!(observer.report_score().unwrap(), 2.0);
    }

    #[test]
    fn epoch_budget_only_stops_at_epoch_end() {
        let mut observer =
            ReportingObserver::new(policy("loss", StopBudget::Epochs(1), ReportOp::Latest));

        let mut ctx = LoopContext::at(0, 50);
        observer.after_train_iter(&mut ctx, &metrics("loss", 1.0));
        assert!(!ctx.stop_requested());

        observer.after_train_epoch(&mut ctx);
        assert!(ctx.stop_requested());
    }

    #[test]
    fn absent_monitor_key_is_skipped() {
        let mut observer =
            ReportingObserver::new(policy("acc", StopBudget::Epochs(5), ReportOp::Mean));
        let mut ctx = LoopContext::new();

        observer.after_train_iter(&mut ctx, &metrics("loss", 0.3));
        observer.after_val_epoch(&mut ctx, None);
        assert_eq!(observer.report_score(), Err(ScoreError::EmptyScoreboard));

        observer.after_val_epoch(&mut ctx, Some(&metrics("acc", 0.8)));
        observer.after_val_epoch(&mut ctx, Some(&metrics("acc", 0.6)));
        assert!((observer.report_score().unwrap() - 0.7).abs() < 1e-12);

        observer.clear_scoreboard();
        assert!(observer.scoreboard().is_empty());
    }

    #[test]
    fn drives_an_epoch_loop_to_its_budget() {
        let mut observer =
            ReportingObserver::new(policy("val_loss", StopBudget::Epochs(3), ReportOp::Mean));
        let summary = EpochLoop::new(10, 4)
            .run(
                &mut observer,
                |_ctx| -> TrainResult<MetricMap> { Ok(MetricMap::new()) },
                |ctx| Ok(Some(metrics("val_loss", (ctx.epoch + 1) as f64))),
            )
            .unwrap();

        assert_eq!(summary.epochs_run, 3);
        assert!(summary.stopped_early);
        assert_eq!(observer.scoreboard().len(), 3);
        assert_eq!(observer.report_score().unwrap(), 2.0);
    }

    #[test]
    fn maximal_loop_indices_do_not_overflow() {
        let mut observer =
            ReportingObserver::new(policy("loss", StopBudget::Iterations(3), ReportOp::Latest));
        let mut ctx = LoopContext::at(u64::MAX, u64::MAX);
        observer.after_train_iter(&mut ctx, &metrics("loss", 1.0));
        assert!(!ctx.stop_requested());

        let mut observer =
            ReportingObserver::new(policy("loss", StopBudget::Epochs(3), ReportOp::Latest));
        observer.after_train_epoch(&mut ctx);
        assert!(!ctx.stop_requested());
    }

    #[cfg(unix)]
    #[test]
    fn child_readings_null_is_absent_and_nan_is_a_value() {
        let script = concat!(
            "cat > /dev/null; ",
            "echo '{\"event\":\"val_epoch\",\"epoch\":0,\"metrics\":{\"acc\":NaN}}'; ",
            "echo '{\"event\":\"val_epoch\",\"epoch\":1,\"metrics\":{\"acc\":0.5}}'; ",
            "echo '{\"event\":\"val_epoch\",\"epoch\":2,\"metrics\":{\"acc\":null}}'"
        );
        let engine = CommandEngine::new(CommandSpec::new("sh").with_args(["-c", script]));
        let mut run = engine.build(&json!({})).unwrap();
        let mut observer = ReportingObserver::new(ReportPolicy {
            rule: Rule::Greater,
            ..policy("acc", StopBudget::Epochs(10), ReportOp::Latest)
        });

        run.train(&mut observer).unwrap();

        assert_eq!(observer.scoreboard().len(), 2);
        assert_eq!(observer.report_score().unwrap(), 0.5);
    }
}
