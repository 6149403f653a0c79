//! Trial records and the tuning outcome.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ht_search::Candidate;
use ht_types::score::serde_score;
use ht_types::Rule;

/// Unique tuning session identifier.
pub type SessionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    /// Training finished and reported a score (possibly sanitized).
    Completed,
    /// Building or training the run failed, or no score was reported. The
    /// trial was scored with the rule's worst value.
    Failed,
}

/// One evaluated candidate, identical on every rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// 0-based position within the session.
    pub trial_number: usize,
    pub candidate: Candidate,
    #[serde(with = "serde_score")]
    pub score: f64,
    pub status: TrialStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TrialRecord {
    pub fn duration(&self) -> Duration {
        self.finished_at - self.started_at
    }

    pub fn is_failed(&self) -> bool {
        self.status == TrialStatus::Failed
    }
}

/// The best candidate found by a session, and its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneOutcome {
    pub hparam: Candidate,
    #[serde(with = "serde_score")]
    pub score: f64,
}

/// Best record under `rule`. Ties go to the earliest record.
pub fn select_best(history: &[TrialRecord], rule: Rule) -> Option<&TrialRecord> {
    history.iter().fold(None, |best, record| match best {
        Some(incumbent) if !rule.is_better(record.score, incumbent.score) => Some(incumbent),
        _ => Some(record),
    })
}

/// Sent by the coordinator before each trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub(crate) enum Proposal {
    Candidate(Candidate),
    Unavailable(String),
}

/// Sent by the coordinator after each trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TrialVerdict {
    #[serde(with = "serde_score")]
    pub score: f64,
    pub status: TrialStatus,
    pub error: Option<String>,
}
