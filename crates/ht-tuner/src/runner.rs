//! Runs one trial across every rank of a process group.
//!
//! Per trial the ranks exchange exactly two broadcasts, both sourced at the
//! coordinator: the candidate before training and the score after it. The
//! searcher is only touched on the coordinator.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use ht_dist::{broadcast_object, ProcessGroup, COORDINATOR_RANK};
use ht_engine::TrainingEngine;
use ht_search::{Candidate, Searcher};
use ht_types::{SearchError, TrialError, TuneResult};

use crate::config::inject_candidate;
use crate::observer::{ReportPolicy, ReportingObserver};
use crate::trial::{Proposal, TrialRecord, TrialStatus, TrialVerdict};

pub struct TrialRunner<'a> {
    base_config: &'a Value,
    engine: &'a dyn TrainingEngine,
    group: &'a dyn ProcessGroup,
    policy: &'a ReportPolicy,
}

impl<'a> TrialRunner<'a> {
    pub fn new(
        base_config: &'a Value,
        engine: &'a dyn TrainingEngine,
        group: &'a dyn ProcessGroup,
        policy: &'a ReportPolicy,
    ) -> Self {
        Self {
            base_config,
            engine,
            group,
            policy,
        }
    }

    /// Run trial `trial_number` and return its record, identical on all ranks.
    ///
    /// Training failures are not errors here: they produce a record scored
    /// with the rule's worst value. Errors are reserved for failures that
    /// leave the ranks unable to continue together.
    pub fn run(&self, searcher: &mut dyn Searcher, trial_number: usize) -> TuneResult<TrialRecord> {
        let candidate = self.agree_on_candidate(searcher)?;
        let started_at = Utc::now();

        let config = inject_candidate(self.base_config, &candidate)?;
        let local = self.settle(trial_number, self.execute(&config));

        let is_main = self.group.is_main_process();
        let verdict: TrialVerdict =
            broadcast_object(self.group, is_main.then_some(local), COORDINATOR_RANK)?;
        if is_main {
            searcher.record(&candidate, verdict.score);
        }

        Ok(TrialRecord {
            trial_number,
            candidate,
            score: verdict.score,
            status: verdict.status,
            error: verdict.error,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// The coordinator suggests, everyone receives. A failed suggestion is
    /// broadcast too, so that no rank is left waiting for a candidate.
    fn agree_on_candidate(&self, searcher: &mut dyn Searcher) -> TuneResult<Candidate> {
        let mut suggest_error = None;
        let proposal = if self.group.is_main_process() {
            Some(match searcher.suggest() {
                Ok(candidate) => Proposal::Candidate(candidate),
                Err(err) => {
                    let message = err.to_string();
                    suggest_error = Some(err);
                    Proposal::Unavailable(message)
                }
            })
        } else {
            None
        };

        match broadcast_object(self.group, proposal, COORDINATOR_RANK)? {
            Proposal::Candidate(candidate) => Ok(candidate),
            Proposal::Unavailable(message) => {
                let err = suggest_error.unwrap_or_else(|| SearchError::SuggestFailed { message });
                Err(err.into())
            }
        }
    }

    fn execute(&self, config: &Value) -> Result<f64, TrialError> {
        debug!(engine = self.engine.name(), rank = self.group.rank(), "building training run");
        let mut run = self.engine.build(config).map_err(TrialError::Build)?;
        let mut observer = ReportingObserver::new(self.policy.clone());
        run.train(&mut observer).map_err(TrialError::Run)?;
        Ok(observer.report_score()?)
    }

    fn settle(&self, trial_number: usize, result: Result<f64, TrialError>) -> TrialVerdict {
        let rule = self.policy.rule;
        match result {
            Ok(score) => TrialVerdict {
                score: rule.sanitize(score),
                status: TrialStatus::Completed,
                error: None,
            },
            Err(err) => {
                warn!(
                    trial = trial_number,
                    rank = self.group.rank(),
                    error = %err,
                    "trial failed, scoring it as {}",
                    rule.worst()
                );
                TrialVerdict {
                    score: rule.worst(),
                    status: TrialStatus::Failed,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
