use crate::data::Snapshot;
use std::collections::VecDeque;

/// Number of snapshots kept in the rolling window.
pub const HISTORY_CAPACITY: usize = 30;

/// Rolling window of the most recent snapshots plus the current point readout.
///
/// Snapshots are kept in arrival order and evicted oldest-first once the
/// window is full. `current` is normally the last appended snapshot, but a
/// failed tick resets it without touching the window.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    window: VecDeque<Snapshot>,
    has_current: bool,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            window: VecDeque::with_capacity(capacity),
            has_current: false,
        }
    }

    pub fn append(&mut self, snapshot: Snapshot) {
        if self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(snapshot);
        self.has_current = true;
    }

    pub fn current(&self) -> Option<&Snapshot> {
        if self.has_current {
            self.window.back()
        } else {
            None
        }
    }

    pub fn clear_current(&mut self) {
        self.has_current = false;
    }

    pub fn window(&self) -> &VecDeque<Snapshot> {
        &self.window
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
