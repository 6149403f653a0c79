//! # ht-engine
//!
//! The narrow training-engine contract Hypertune drives: build a run from a
//! resolved config, train it while reporting per-iteration logs, epoch
//! completions and validation metrics to an observer, and stop when the
//! observer asks.
//!
//! Also provides [`EpochLoop`], a loop driver for engines that own their
//! training step, and [`CommandEngine`], which runs each trial as a child
//! process speaking JSON lines.

mod command;
mod engine;
mod loops;
mod observer;

pub use command::{CommandEngine, CommandSpec};
pub use engine::{TrainingEngine, TrainingRun};
pub use loops::{EpochLoop, LoopSummary};
pub use observer::{LoopContext, MetricMap, TrainingObserver};
