//! Deferred work for the authority loop
//!
//! Tasks are plain data. [`crate::war::War::tick`] takes the due ones and runs
//! them on the same thread as every other mutation; each task checks that its
//! precondition still holds and does nothing otherwise.

use std::time::Duration;

use crate::geom::Location;
use crate::host::PlayerId;

#[derive(Debug, Clone, PartialEq)]
pub enum DeferredTask {
    /// Put the real blocks back in a player's view
    Unmask { player: PlayerId, cells: Vec<Location> },
    /// Reset a player who died into the match again
    Respawn { zone: String, player: PlayerId },
}

#[derive(Debug)]
struct Scheduled {
    due_ms: u64,
    seq: u64,
    task: DeferredTask,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: Vec<Scheduled>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_once(&mut self, now_ms: u64, delay: Duration, task: DeferredTask) {
        let due_ms = now_ms.saturating_add(delay.as_millis() as u64);
        self.pending.push(Scheduled {
            due_ms,
            seq: self.next_seq,
            task,
        });
        self.next_seq += 1;
    }

    /// Remove and return tasks due at `now_ms`, earliest first, ties in scheduling order
    pub fn take_due(&mut self, now_ms: u64) -> Vec<DeferredTask> {
        let (mut due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|s| s.due_ms <= now_ms);
        self.pending = later;
        due.sort_by_key(|s| (s.due_ms, s.seq));
        due.into_iter().map(|s| s.task).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
