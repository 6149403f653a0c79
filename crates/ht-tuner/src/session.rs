//! The tuning session: owns the searcher and the trial history, and drives
//! one trial after another through the [`TrialRunner`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use ht_dist::ProcessGroup;
use ht_engine::TrainingEngine;
use ht_search::{
    describe, HyperparameterSpec, Searcher, SearcherConfig, SearcherContext, SearcherRegistry,
};
use ht_types::{config_error, validation_error, ReportOp, Rule, StopBudget, TuneResult};

use crate::config::lookup;
use crate::observer::ReportPolicy;
use crate::runner::TrialRunner;
use crate::trial::{select_best, SessionId, TrialRecord, TuneOutcome};

/// Session-wide tuning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneSettings {
    /// Metric key read from training logs and validation metrics.
    pub monitor: String,
    pub rule: Rule,
    pub num_trials: usize,
    #[serde(default)]
    pub tuning_iter: Option<u64>,
    #[serde(default)]
    pub tuning_epoch: Option<u64>,
    #[serde(default)]
    pub report_op: ReportOp,
    pub searcher: SearcherConfig,
}

impl TuneSettings {
    pub fn new(
        monitor: impl Into<String>,
        rule: Rule,
        num_trials: usize,
        searcher: SearcherConfig,
    ) -> Self {
        Self {
            monitor: monitor.into(),
            rule,
            num_trials,
            tuning_iter: None,
            tuning_epoch: None,
            report_op: ReportOp::default(),
            searcher,
        }
    }

    pub fn with_tuning_iter(mut self, n: u64) -> Self {
        self.tuning_iter = Some(n);
        self
    }

    pub fn with_tuning_epoch(mut self, n: u64) -> Self {
        self.tuning_epoch = Some(n);
        self
    }

    pub fn with_report_op(mut self, report_op: ReportOp) -> Self {
        self.report_op = report_op;
        self
    }

    pub fn stop_budget(&self) -> TuneResult<StopBudget> {
        StopBudget::from_limits(self.tuning_iter, self.tuning_epoch)
    }

    fn report_policy(&self) -> TuneResult<ReportPolicy> {
        if self.monitor.is_empty() {
            return Err(config_error!("monitor must name a metric"));
        }
        if self.num_trials == 0 {
            return Err(config_error!("num_trials must be at least 1"));
        }
        Ok(ReportPolicy {
            monitor: self.monitor.clone(),
            rule: self.rule,
            budget: self.stop_budget()?,
            report_op: self.report_op,
        })
    }
}

pub struct TuningSession {
    id: SessionId,
    base_config: Value,
    hparam_spec: HyperparameterSpec,
    policy: ReportPolicy,
    num_trials: usize,
    searcher: Box<dyn Searcher>,
    engine: Arc<dyn TrainingEngine>,
    group: Arc<dyn ProcessGroup>,
    history: Vec<TrialRecord>,
}

impl TuningSession {
    /// Validate the settings against the search space and base config, join
    /// the process group if the config asks for a launcher, and build the
    /// searcher.
    pub fn new(
        base_config: Value,
        hparam_spec: HyperparameterSpec,
        settings: TuneSettings,
        engine: Arc<dyn TrainingEngine>,
        registry: &SearcherRegistry,
        group: Arc<dyn ProcessGroup>,
    ) -> TuneResult<Self> {
        let policy = settings.report_policy()?;

        if hparam_spec.is_empty() {
            return Err(config_error!("hyperparameter spec is empty"));
        }
        hparam_spec.validate()?;
        for path in hparam_spec.paths() {
            lookup(&base_config, path)?;
        }

        init_process_group(&base_config, group.as_ref())?;

        let searcher = registry.build(
            &settings.searcher,
            &SearcherContext {
                rule: settings.rule,
                hparam_spec: hparam_spec.clone(),
                num_trials: settings.num_trials,
            },
        )?;

        let id = Uuid::new_v4();
        info!(
            session = %id,
            rank = group.rank(),
            searcher = searcher.name(),
            engine = engine.name(),
            num_trials = settings.num_trials,
            "Tuner initialized with rule: {} and monitor: {}",
            policy.rule,
            policy.monitor
        );

        Ok(Self {
            id,
            base_config,
            hparam_spec,
            policy,
            num_trials: settings.num_trials,
            searcher,
            engine,
            group,
            history: Vec::new(),
        })
    }

    /// Run every trial in order and return the best candidate seen so far.
    pub fn tune(&mut self) -> TuneResult<TuneOutcome> {
        info!(session = %self.id, "Starting tuning for {} trials...", self.num_trials);

        let runner = TrialRunner::new(
            &self.base_config,
            self.engine.as_ref(),
            self.group.as_ref(),
            &self.policy,
        );
        for trial_number in 0..self.num_trials {
            let record = runner.run(self.searcher.as_mut(), trial_number)?;
            info!(
                session = %self.id,
                trial = trial_number,
                score = record.score,
                "Trial [{}/{}] finished. Score obtained: {} Hyperparameters used: {}",
                trial_number + 1,
                self.num_trials,
                record.score,
                describe(&record.candidate)
            );
            self.history.push(record);
        }

        let best = self
            .best_record()
            .ok_or_else(|| validation_error!("no trial has been run"))?;
        info!(session = %self.id, "Best hyperparameters obtained: {}", describe(&best.candidate));
        info!(session = %self.id, "Best score obtained: {}", best.score);
        info!(session = %self.id, "Tuning completed.");

        Ok(TuneOutcome {
            hparam: best.candidate.clone(),
            score: best.score,
        })
    }

    /// Forget every recorded trial. Settings and the searcher are kept.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Best trial so far. Ties go to the earliest trial.
    pub fn best_record(&self) -> Option<&TrialRecord> {
        select_best(&self.history, self.policy.rule)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn hparam_spec(&self) -> &HyperparameterSpec {
        &self.hparam_spec
    }

    pub fn monitor(&self) -> &str {
        &self.policy.monitor
    }

    pub fn rule(&self) -> Rule {
        self.policy.rule
    }

    pub fn num_trials(&self) -> usize {
        self.num_trials
    }

    pub fn tuning_iter(&self) -> Option<u64> {
        self.policy.budget.tuning_iter()
    }

    pub fn tuning_epoch(&self) -> Option<u64> {
        self.policy.budget.tuning_epoch()
    }

    pub fn stop_budget(&self) -> StopBudget {
        self.policy.budget
    }

    pub fn report_op(&self) -> ReportOp {
        self.policy.report_op
    }

    pub fn searcher_name(&self) -> &str {
        self.searcher.name()
    }

    pub fn history(&self) -> &[TrialRecord] {
        &self.history
    }
}

/// Join the process group named by the config's `launcher`, unless it is
/// `"none"` or the group is already distributed.
fn init_process_group(base_config: &Value, group: &dyn ProcessGroup) -> TuneResult<()> {
    let launcher = base_config
        .get("launcher")
        .and_then(Value::as_str)
        .unwrap_or("none");
    if launcher == "none" || group.is_distributed() {
        debug!(launcher, world_size = group.world_size(), "skipping process group init");
        return Ok(());
    }
    let options = base_config
        .pointer("/env_cfg/dist_cfg")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    info!(launcher, "initializing process group");
    group.init(launcher, &options)?;
    Ok(())
}
