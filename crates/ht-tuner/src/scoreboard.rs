//! Bounded buffer of monitored metric values for one trial.

use std::collections::VecDeque;

use ht_types::{ReportOp, Rule, ScoreError};

/// Maximum number of values a scoreboard keeps. Older values are evicted first.
pub const MAX_SCOREBOARD_LEN: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct MetricScoreboard {
    scores: VecDeque<f64>,
}

impl MetricScoreboard {
    pub fn new() -> Self {
        Self {
            scores: VecDeque::with_capacity(MAX_SCOREBOARD_LEN),
        }
    }

    /// Record a value, evicting the oldest one when full.
    pub fn append(&mut self, score: f64) {
        if self.scores.len() == MAX_SCOREBOARD_LEN {
            self.scores.pop_front();
        }
        self.scores.push_back(score);
    }

    /// Reduce the recorded values to one score.
    ///
    /// `Latest` returns the newest value, `Mean` the arithmetic mean. A
    /// non-finite newest value, or any non-finite value under `Mean`, yields
    /// the rule's worst score instead.
    pub fn reduce(&self, op: ReportOp, rule: Rule) -> Result<f64, ScoreError> {
        let latest = *self.scores.back().ok_or(ScoreError::EmptyScoreboard)?;
        match op {
            ReportOp::Latest => Ok(rule.sanitize(latest)),
            ReportOp::Mean => {
                if self.scores.iter().any(|score| !score.is_finite()) {
                    return Ok(rule.worst());
                }
                let sum: f64 = self.scores.iter().sum();
                Ok(rule.sanitize(sum / self.scores.len() as f64))
            }
        }
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Values in insertion order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.scores.iter().copied()
    }
}
