use thiserror::Error;

/// Main error type for a tuning session
#[derive(Error, Debug)]
pub enum TuneError {
    #[error("Config injection error: {0}")]
    Inject(#[from] InjectError),

    #[error("Searcher error: {0}")]
    Search(#[from] SearchError),

    #[error("Distributed coordination error: {0}")]
    Dist(#[from] DistError),

    #[error("Training error: {0}")]
    Train(#[from] TrainError),

    #[error("Score error: {0}")]
    Score(#[from] ScoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while walking a dotted path through a config tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InjectError {
    #[error("key `{segment}` is not present at `{path}`")]
    MissingKey { segment: String, path: String },

    #[error("segment `{segment}` at `{path}` is not a sequence index")]
    InvalidIndex { segment: String, path: String },

    #[error("index {index} at `{path}` is out of range for a sequence of length {len}")]
    IndexOutOfRange {
        index: i64,
        len: usize,
        path: String,
    },

    #[error("value at `{path}` is neither a mapping nor a sequence")]
    NotAContainer { path: String },

    #[error("empty hyperparameter path")]
    EmptyPath,
}

/// Searcher construction and suggestion errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("unknown searcher type: {kind}")]
    UnknownSearcher { kind: String },

    #[error("invalid searcher option `{option}`: {message}")]
    InvalidOption { option: String, message: String },

    #[error("candidate references `{path}`, which is not in the hyperparameter spec")]
    UnknownParameter { path: String },

    #[error("invalid domain for `{path}`: {message}")]
    InvalidDomain { path: String, message: String },

    #[error("searcher exhausted after {suggested} candidates")]
    Exhausted { suggested: usize },

    #[error("coordinator failed to suggest a candidate: {message}")]
    SuggestFailed { message: String },
}

/// Process-group errors. These are fatal for the session.
#[derive(Error, Debug)]
pub enum DistError {
    #[error("launcher `{launcher}` is not supported by this process group")]
    Unsupported { launcher: String },

    #[error("source rank {src} is out of range for world size {world_size}")]
    InvalidSource { src: usize, world_size: usize },

    #[error("rank {rank} is the broadcast source but supplied no payload")]
    MissingPayload { rank: usize },

    #[error("peer rank {peer} disconnected during broadcast")]
    Disconnected { peer: usize },

    #[error("broadcast payload could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Failures reported by a training engine
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("failed to build training run: {message}")]
    Build { message: String },

    #[error("training run failed: {message}")]
    Execution { message: String },

    #[error("training process exited with status {code:?}")]
    Exit { code: Option<i32> },

    #[error("malformed training event `{line}`: {message}")]
    Protocol { line: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Scoreboard reduction errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreError {
    #[error("no score was recorded for the monitored metric")]
    EmptyScoreboard,
}

/// Why a trial produced no usable score. Never leaves the trial runner: it is
/// turned into the rule's worst score there.
#[derive(Error, Debug)]
pub enum TrialError {
    #[error(transparent)]
    Build(TrainError),

    #[error(transparent)]
    Run(TrainError),

    #[error(transparent)]
    NoScore(#[from] ScoreError),
}

/// Result type alias for tuning operations
pub type TuneResult<T> = Result<T, TuneError>;

/// Result type alias for searcher operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Result type alias for process-group operations
pub type DistResult<T> = Result<T, DistError>;

/// Result type alias for training engine operations
pub type TrainResult<T> = Result<T, TrainError>;

impl TrainError {
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::TuneError::Validation(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::TuneError::Config(format!($($arg)*))
    };
}
