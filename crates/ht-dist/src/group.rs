//! Process-group contract shared by every cooperating process of a run.

use serde::de::DeserializeOwned;
use serde::Serialize;

use ht_types::{DistError, DistResult};

/// Rank that owns the searcher and whose trial score is authoritative.
pub const COORDINATOR_RANK: usize = 0;

/// The cooperating processes that together form one distributed training job.
///
/// Broadcasts are synchronising: every rank must reach the same broadcast
/// call, in the same order, or the group deadlocks.
pub trait ProcessGroup: Send + Sync {
    fn rank(&self) -> usize;

    fn world_size(&self) -> usize;

    fn is_distributed(&self) -> bool {
        self.world_size() > 1
    }

    fn is_main_process(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }

    /// Join the process group through `launcher` (e.g. `"pytorch"`, `"slurm"`).
    fn init(&self, launcher: &str, options: &serde_json::Value) -> DistResult<()>;

    /// Deliver `payload` from rank `src` to every rank. Only `src` has to
    /// supply a payload; the others pass `None` and block until it arrives.
    fn broadcast_bytes(&self, payload: Option<Vec<u8>>, src: usize) -> DistResult<Vec<u8>>;
}

/// Broadcast a serde value from `src`. Every rank, the source included,
/// returns the value decoded from the same bytes.
pub fn broadcast_object<T>(group: &dyn ProcessGroup, value: Option<T>, src: usize) -> DistResult<T>
where
    T: Serialize + DeserializeOwned,
{
    if src >= group.world_size() {
        return Err(DistError::InvalidSource {
            src,
            world_size: group.world_size(),
        });
    }
    let payload = if group.rank() == src {
        let value = value.ok_or(DistError::MissingPayload { rank: src })?;
        Some(serde_json::to_vec(&value)?)
    } else {
        None
    };
    let bytes = group.broadcast_bytes(payload, src)?;
    Ok(serde_json::from_slice(&bytes)?)
}
