//! Training engine contract.

use ht_types::TrainResult;

use crate::observer::TrainingObserver;

/// Builds training runs from a fully resolved run configuration.
pub trait TrainingEngine: Send + Sync {
    /// Construct a run. Errors here count as a failed trial.
    fn build(&self, config: &serde_json::Value) -> TrainResult<Box<dyn TrainingRun>>;

    /// Human-readable engine name.
    fn name(&self) -> &str {
        "engine"
    }
}

/// One runnable training job.
pub trait TrainingRun {
    /// Train to completion, or until the observer requests a stop. Blocks.
    fn train(&mut self, observer: &mut dyn TrainingObserver) -> TrainResult<()>;
}
