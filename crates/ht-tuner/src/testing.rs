//! Scripted engines and searchers shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use ht_engine::{EpochLoop, LoopContext, MetricMap, TrainingEngine, TrainingObserver, TrainingRun};
use ht_search::{Candidate, ParameterValue, Searcher};
use ht_types::{SearchError, SearchResult, TrainError, TrainResult};

pub(crate) fn base_config() -> Value {
    json!({
        "launcher": "none",
        "model": {"depth": 18},
        "optimizer": {"type": "SGD", "lr": 0.1},
        "train_cfg": {"max_epochs": 12}
    })
}

pub(crate) fn lr_candidate(lr: f64) -> Candidate {
    Candidate::from([("optimizer.lr".to_string(), ParameterValue::Float(lr))])
}

/// What a scripted run reports.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Validation of epoch `e` reports `scores[e]`; later epochs report nothing.
    ValScores(Vec<f64>),
    /// Every validation reports the injected `optimizer.lr` plus `offset`.
    ValFromLr { offset: f64 },
    /// Training iteration `i` logs `i`.
    LossPerIter,
    FailBuild,
    /// The second training iteration errors.
    FailRun,
    /// Trains without ever reporting the monitored metric.
    Silent,
}

pub(crate) struct ScriptedEngine {
    monitor: String,
    script: Script,
    max_epochs: u64,
    iters_per_epoch: u64,
    pub built: Arc<Mutex<Vec<Value>>>,
}

impl ScriptedEngine {
    pub fn new(monitor: &str, script: Script) -> Self {
        Self {
            monitor: monitor.to_string(),
            script,
            max_epochs: 10,
            iters_per_epoch: 4,
            built: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl TrainingEngine for ScriptedEngine {
    fn build(&self, config: &Value) -> TrainResult<Box<dyn TrainingRun>> {
        self.built.lock().push(config.clone());
        if matches!(self.script, Script::FailBuild) {
            return Err(TrainError::build("model type `Nope` is not registered"));
        }
        Ok(Box::new(ScriptedRun {
            monitor: self.monitor.clone(),
            script: self.script.clone(),
            lr: config
                .pointer("/optimizer/lr")
                .and_then(Value::as_f64)
                .unwrap_or(f64::NAN),
            epochs: EpochLoop::new(self.max_epochs, self.iters_per_epoch),
        }))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct ScriptedRun {
    monitor: String,
    script: Script,
    lr: f64,
    epochs: EpochLoop,
}

impl ScriptedRun {
    fn metric(&self, value: f64) -> MetricMap {
        MetricMap::from([(self.monitor.clone(), value)])
    }

    fn step(&self, ctx: &LoopContext) -> TrainResult<MetricMap> {
        match self.script {
            Script::LossPerIter => Ok(self.metric(ctx.iter as f64)),
            Script::FailRun if ctx.iter == 1 => Err(TrainError::execution("loss is NaN")),
            _ => Ok(MetricMap::new()),
        }
    }

    fn validate(&self, ctx: &LoopContext) -> TrainResult<Option<MetricMap>> {
        Ok(match &self.script {
            Script::ValScores(scores) => scores
                .get(ctx.epoch as usize)
                .map(|score| self.metric(*score)),
            Script::ValFromLr { offset } => Some(self.metric(self.lr + offset)),
            _ => None,
        })
    }
}

impl TrainingRun for ScriptedRun {
    fn train(&mut self, observer: &mut dyn TrainingObserver) -> TrainResult<()> {
        let run = &*self;
        run.epochs
            .run(observer, |ctx| run.step(ctx), |ctx| run.validate(ctx))?;
        Ok(())
    }
}

/// Everything a [`RecordingSearcher`] was asked to do.
#[derive(Debug, Default)]
pub(crate) struct SearchLog {
    pub suggested: usize,
    pub recorded: Vec<(Candidate, f64)>,
}

/// Proposes a fixed list of candidates and logs every call.
pub(crate) struct RecordingSearcher {
    queue: VecDeque<Candidate>,
    pub log: Arc<Mutex<SearchLog>>,
}

impl RecordingSearcher {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self::with_log(candidates, Arc::new(Mutex::new(SearchLog::default())))
    }

    pub fn with_log(candidates: Vec<Candidate>, log: Arc<Mutex<SearchLog>>) -> Self {
        Self {
            queue: candidates.into(),
            log,
        }
    }
}

impl Searcher for RecordingSearcher {
    fn suggest(&mut self) -> SearchResult<Candidate> {
        let mut log = self.log.lock();
        let candidate = self.queue.pop_front().ok_or(SearchError::Exhausted {
            suggested: log.suggested,
        })?;
        log.suggested += 1;
        Ok(candidate)
    }

    fn record(&mut self, candidate: &Candidate, score: f64) {
        self.log.lock().recorded.push((candidate.clone(), score));
    }

    fn name(&self) -> &str {
        "recording"
    }
}
