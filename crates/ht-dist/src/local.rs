//! Single-process group: rank 0 of 1.

use ht_types::{DistError, DistResult};

use crate::group::ProcessGroup;

/// The group used when training is not distributed. Broadcast is identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGroup;

impl LocalGroup {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessGroup for LocalGroup {
    fn rank(&self) -> usize {
        0
    }

    fn world_size(&self) -> usize {
        1
    }

    fn init(&self, launcher: &str, _options: &serde_json::Value) -> DistResult<()> {
        match launcher {
            "none" => Ok(()),
            other => Err(DistError::Unsupported {
                launcher: other.to_string(),
            }),
        }
    }

    fn broadcast_bytes(&self, payload: Option<Vec<u8>>, src: usize) -> DistResult<Vec<u8>> {
        if src != 0 {
            return Err(DistError::InvalidSource { src, world_size: 1 });
        }
        payload.ok_or(DistError::MissingPayload { rank: 0 })
    }
}
