//! # ht-dist
//!
//! Cross-process agreement for Hypertune. A tuning session runs identically
//! on every process of a distributed training job; the [`ProcessGroup`]
//! contract is how those processes agree on candidates and scores.

mod group;
mod local;
mod thread;

pub use group::{broadcast_object, ProcessGroup, COORDINATOR_RANK};
pub use local::LocalGroup;
pub use thread::ThreadGroup;
