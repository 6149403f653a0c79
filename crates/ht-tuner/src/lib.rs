//! # ht-tuner
//!
//! Runs a hyperparameter tuning session on top of a training engine.
//!
//! A [`TuningSession`] asks its searcher for a candidate, injects it into a
//! copy of the base config, trains with a [`ReportingObserver`] attached and
//! feeds the resulting score back to the searcher, once per trial. When the
//! engine runs on several processes, the coordinator's candidate and score
//! are broadcast so every rank keeps the same history.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ht_dist::LocalGroup;
//! use ht_engine::{CommandEngine, CommandSpec};
//! use ht_search::{HyperparameterSpec, SearcherConfig, SearcherRegistry};
//! use ht_tuner::{TuneSettings, TuningSession};
//! use ht_types::Rule;
//!
//! # fn main() -> ht_types::TuneResult<()> {
//! let base = serde_json::json!({"optimizer": {"lr": 0.1}});
//! let spec = HyperparameterSpec::new().add_log_uniform("optimizer.lr", 1e-4, 1.0);
//! let searcher = SearcherConfig::new("replay")
//!     .with_option("candidates", serde_json::json!([{"optimizer.lr": 0.01}]));
//! let settings = TuneSettings::new("acc", Rule::Greater, 1, searcher).with_tuning_epoch(2);
//!
//! let mut session = TuningSession::new(
//!     base,
//!     spec,
//!     settings,
//!     Arc::new(CommandEngine::new(CommandSpec::new("./train.sh"))),
//!     &SearcherRegistry::with_builtins(),
//!     Arc::new(LocalGroup::new()),
//! )?;
//! let outcome = session.tune()?;
//! println!("best {} -> {}", ht_search::describe(&outcome.hparam), outcome.score);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod observer;
mod runner;
mod scoreboard;
mod session;
mod trial;

#[cfg(test)]
mod testing;

pub use config::{inject, inject_candidate, lookup};
pub use observer::{ReportPolicy, ReportingObserver};
pub use runner::TrialRunner;
pub use scoreboard::{MetricScoreboard, MAX_SCOREBOARD_LEN};
pub use session::{TuneSettings, TuningSession};
pub use trial::{select_best, SessionId, TrialRecord, TrialStatus, TuneOutcome};
