//! Replays a fixed, user-supplied list of candidates.
//!
//! Useful for re-running a known set of configurations (regression checks,
//! reproducing a past sweep) through the same trial protocol. It never
//! proposes anything on its own.

use tracing::debug;

use ht_types::{SearchError, SearchResult};

use crate::searcher::{Searcher, SearcherConfig, SearcherContext};
use crate::space::Candidate;

#[derive(Debug, Clone)]
pub struct ReplaySearcher {
    candidates: Vec<Candidate>,
    cycle: bool,
    cursor: usize,
    observations: Vec<(Candidate, f64)>,
}

impl ReplaySearcher {
    pub const KIND: &'static str = "replay";

    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            cycle: false,
            cursor: 0,
            observations: Vec::new(),
        }
    }

    /// Start over from the first candidate once the list is used up.
    pub fn cycling(mut self) -> Self {
        self.cycle = true;
        self
    }

    /// Build from `{"type": "replay", "candidates": [...], "cycle": bool}`.
    pub fn from_config(config: &SearcherConfig, context: &SearcherContext) -> SearchResult<Self> {
        let raw = config
            .option("candidates")
            .cloned()
            .ok_or_else(|| SearchError::InvalidOption {
                option: "candidates".into(),
                message: "replay searcher needs a list of candidates".into(),
            })?;
        let candidates: Vec<Candidate> =
            serde_json::from_value(raw).map_err(|e| SearchError::InvalidOption {
                option: "candidates".into(),
                message: e.to_string(),
            })?;
        if candidates.is_empty() {
            return Err(SearchError::InvalidOption {
                option: "candidates".into(),
                message: "list is empty".into(),
            });
        }
        for candidate in &candidates {
            context.hparam_spec.check_candidate(candidate)?;
        }

        let cycle = match config.option("cycle") {
            None => false,
            Some(value) => value.as_bool().ok_or_else(|| SearchError::InvalidOption {
                option: "cycle".into(),
                message: format!("expected a boolean, got {value}"),
            })?,
        };

        let searcher = Self::new(candidates);
        Ok(if cycle { searcher.cycling() } else { searcher })
    }

    /// Every (candidate, score) pair recorded so far.
    pub fn observations(&self) -> &[(Candidate, f64)] {
        &self.observations
    }

    pub fn remaining(&self) -> usize {
        self.candidates.len().saturating_sub(self.cursor)
    }
}

impl Searcher for ReplaySearcher {
    fn suggest(&mut self) -> SearchResult<Candidate> {
        if self.cursor >= self.candidates.len() {
            if !self.cycle || self.candidates.is_empty() {
                return Err(SearchError::Exhausted {
                    suggested: self.cursor,
                });
            }
            self.cursor = 0;
        }
        let candidate = self.candidates[self.cursor].clone();
        self.cursor += 1;
        Ok(candidate)
    }

    fn record(&mut self, candidate: &Candidate, score: f64) {
        debug!(score, "replay searcher recorded observation");
        self.observations.push((candidate.clone(), score));
    }

    fn name(&self) -> &str {
        Self::KIND
    }
}
