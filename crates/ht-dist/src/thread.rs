//! In-process process group: N ranks connected by channels, one per thread.
//!
//! Lets the multi-process trial protocol run inside a single process, e.g.
//! when each rank drives a replica on its own thread, and in tests.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

use ht_types::{DistError, DistResult};

use crate::group::ProcessGroup;

/// One rank of an in-process group. Create all ranks together with
/// [`ThreadGroup::spawn_group`] and move each one onto its own thread.
#[derive(Debug)]
pub struct ThreadGroup {
    rank: usize,
    world_size: usize,
    /// `outboxes[dst]` carries payloads from this rank to `dst`.
    outboxes: Vec<Sender<Vec<u8>>>,
    /// `inboxes[src]` carries payloads from `src` to this rank.
    inboxes: Vec<Receiver<Vec<u8>>>,
}

impl ThreadGroup {
    /// Create the ranks `0..world_size` of a fully connected group.
    pub fn spawn_group(world_size: usize) -> Vec<ThreadGroup> {
        let mut outboxes: Vec<Vec<Sender<Vec<u8>>>> =
            (0..world_size).map(|_| Vec::with_capacity(world_size)).collect();
        let mut inboxes: Vec<Vec<Receiver<Vec<u8>>>> =
            (0..world_size).map(|_| Vec::with_capacity(world_size)).collect();

        for src in 0..world_size {
            for dst in 0..world_size {
                let (tx, rx) = unbounded();
                outboxes[src].push(tx);
                inboxes[dst].push(rx);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| ThreadGroup {
                rank,
                world_size,
                outboxes,
                inboxes,
            })
            .collect()
    }
}

impl ProcessGroup for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.world_size
    }

    fn init(&self, launcher: &str, _options: &serde_json::Value) -> DistResult<()> {
        // Channels are wired at construction.
        debug!(rank = self.rank, launcher, "thread group already initialised");
        Ok(())
    }

    fn broadcast_bytes(&self, payload: Option<Vec<u8>>, src: usize) -> DistResult<Vec<u8>> {
        if src >= self.world_size {
            return Err(DistError::InvalidSource {
                src,
                world_size: self.world_size,
            });
        }

        if self.rank == src {
            let bytes = payload.ok_or(DistError::MissingPayload { rank: src })?;
            for (dst, outbox) in self.outboxes.iter().enumerate() {
                if dst == self.rank {
                    continue;
                }
                outbox
                    .send(bytes.clone())
                    .map_err(|_| DistError::Disconnected { peer: dst })?;
            }
            Ok(bytes)
        } else {
            self.inboxes[src]
                .recv()
                .map_err(|_| DistError::Disconnected { peer: src })
        }
    }
}
