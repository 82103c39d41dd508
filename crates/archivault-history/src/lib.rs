//! Snapshot undo/redo history for Archivault.
//!
//! [`HistoryManager`] stores whole snapshots, not inverse operations. With
//! structurally shared snapshots (see `archivault-vault`) each entry costs a
//! few pointers plus whatever the step actually changed.
//!
//! A batch (`begin_batch` .. `end_batch`) collapses every push in between
//! into one undo step.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sizing of the undo history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of snapshots kept, the current one included.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 50 }
    }
}

/// Linear undo/redo stack over snapshots of type `T`.
#[derive(Clone, Debug)]
pub struct HistoryManager<T> {
    entries: VecDeque<T>,
    cursor: usize,
    max_depth: usize,
    batch_depth: usize,
    pending: Option<T>,
}

impl<T: Clone + PartialEq> HistoryManager<T> {
    /// An empty history.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            max_depth: config.max_depth.max(1),
            batch_depth: 0,
            pending: None,
        }
    }

    /// A history whose only entry is `initial`.
    pub fn with_initial(initial: T, config: HistoryConfig) -> Self {
        let mut history = Self::new(config);
        history.entries.push_back(initial);
        history
    }

    /// The snapshot the document currently shows.
    ///
    /// Inside a batch this is the latest snapshot pushed in the batch.
    pub fn current(&self) -> Option<&T> {
        self.pending.as_ref().or_else(|| self.entries.get(self.cursor))
    }

    /// Record a new snapshot. Returns `false` if it equals the current one
    /// and was ignored.
    ///
    /// Outside a batch this discards every redo step.
    pub fn push(&mut self, snapshot: T) -> bool {
        if self.current() == Some(&snapshot) {
            return false;
        }
        if self.batch_depth > 0 {
            self.pending = Some(snapshot);
            return true;
        }
        self.commit(snapshot);
        true
    }

    fn commit(&mut self, snapshot: T) {
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(snapshot);
        while self.entries.len() > self.max_depth {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    /// Step back one snapshot. No-op (returns `None`) at the oldest entry or
    /// while a batch is open.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        debug!(cursor = self.cursor, "undo");
        self.entries.get(self.cursor)
    }

    /// Step forward one snapshot. No-op (returns `None`) at the newest entry
    /// or while a batch is open.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        debug!(cursor = self.cursor, "redo");
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.batch_depth == 0 && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.batch_depth == 0 && self.cursor + 1 < self.entries.len()
    }

    /// Number of undo steps available.
    pub fn undo_depth(&self) -> usize {
        self.cursor
    }

    /// Number of redo steps available.
    pub fn redo_depth(&self) -> usize {
        self.entries.len().saturating_sub(self.cursor + 1)
    }

    /// Number of snapshots held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all undo and redo steps, keeping only the current snapshot.
    pub fn clear(&mut self) {
        let current = self.current().cloned();
        self.entries.clear();
        self.cursor = 0;
        self.batch_depth = 0;
        self.pending = None;
        if let Some(current) = current {
            self.entries.push_back(current);
        }
    }

    // ---------------------------------------------------------------
    // Batches
    // ---------------------------------------------------------------

    /// Open a batch. Batches nest; only the outermost `end_batch` commits.
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch. When the outermost batch closes, everything pushed
    /// inside it becomes a single undo step. Returns `true` if a step was
    /// recorded.
    pub fn end_batch(&mut self) -> bool {
        match self.batch_depth {
            0 => false,
            1 => {
                self.batch_depth = 0;
                match self.pending.take() {
                    Some(snapshot) if self.entries.get(self.cursor) != Some(&snapshot) => {
                        self.commit(snapshot);
                        debug!(len = self.entries.len(), "committed batch");
                        true
                    }
                    _ => false,
                }
            }
            _ => {
                self.batch_depth -= 1;
                false
            }
        }
    }

    /// Abandon every open batch and return the snapshot from before it.
    pub fn cancel_batch(&mut self) -> Option<&T> {
        self.batch_depth = 0;
        self.pending = None;
        self.entries.get(self.cursor)
    }

    /// Returns `true` while a batch is open.
    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }
}

impl<T: Clone + PartialEq> Default for HistoryManager<T> {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> HistoryManager<u32> {
        HistoryManager::with_initial(0, HistoryConfig::default())
    }

    #[test]
    fn push_undo_redo() {
        let mut h = history();
        h.push(1);
        h.push(2);
        assert_eq!(h.current(), Some(&2));
        assert_eq!(h.undo(), Some(&1));
        assert_eq!(h.undo(), Some(&0));
        assert_eq!(h.undo(), None);
        assert_eq!(h.redo(), Some(&1));
        assert_eq!(h.redo(), Some(&2));
        assert_eq!(h.redo(), None);
    }

    #[test]
    fn empty_history_is_inert() {
        let mut h: HistoryManager<u32> = HistoryManager::default();
        assert_eq!(h.current(), None);
        assert_eq!(h.undo(), None);
        assert_eq!(h.redo(), None);
        assert!(h.push(7));
        assert_eq!(h.current(), Some(&7));
        assert!(!h.can_undo());
    }

    #[test]
    fn duplicate_of_current_is_ignored() {
        let mut h = history();
        assert!(h.push(1));
        assert!(!h.push(1));
        assert_eq!(h.len(), 2);
        assert!(h.push(0));
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn push_clears_redo() {
        let mut h = history();
        h.push(1);
        h.push(2);
        h.undo();
        h.push(3);
        assert!(!h.can_redo());
        assert_eq!(h.undo(), Some(&1));
        assert_eq!(h.redo_depth(), 1);
    }

    #[test]
    fn depth_is_bounded() {
        let mut h = HistoryManager::with_initial(0, HistoryConfig { max_depth: 3 });
        for i in 1..=5 {
            h.push(i);
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.undo_depth(), 2);
        h.undo();
        assert_eq!(h.undo(), Some(&3));
        assert_eq!(h.undo(), None);
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    #[test]
    fn batch_is_one_undo_step() {
        let mut h = history();
        h.begin_batch();
        h.push(1);
        h.push(2);
        h.push(3);
        assert_eq!(h.current(), Some(&3));
        assert!(!h.can_undo());
        assert!(h.end_batch());
        assert_eq!(h.len(), 2);
        assert_eq!(h.undo(), Some(&0));
        assert_eq!(h.redo(), Some(&3));
    }

    #[test]
    fn nested_batches_commit_once() {
        let mut h = history();
        h.begin_batch();
        h.push(1);
        h.begin_batch();
        h.push(2);
        assert!(!h.end_batch());
        assert!(h.in_batch());
        h.push(3);
        assert!(h.end_batch());
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn batch_ending_where_it_started_records_nothing() {
        let mut h = history();
        h.begin_batch();
        h.push(1);
        h.push(0);
        assert!(!h.end_batch());
        assert_eq!(h.len(), 1);
        assert!(!h.end_batch());
    }

    #[test]
    fn cancel_batch_restores_previous() {
        let mut h = history();
        h.push(1);
        h.begin_batch();
        h.push(2);
        assert_eq!(h.cancel_batch(), Some(&1));
        assert_eq!(h.current(), Some(&1));
        assert!(!h.in_batch());
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn clear_keeps_current() {
        let mut h = history();
        h.push(1);
        h.push(2);
        h.undo();
        h.clear();
        assert_eq!(h.current(), Some(&1));
        assert_eq!(h.len(), 1);
        assert!(!h.can_undo() && !h.can_redo());
    }

    #[test]
    fn config_from_toml() {
        let c: HistoryConfig = toml::from_str("max_depth = 5").unwrap();
        assert_eq!(c.max_depth, 5);
        let c: HistoryConfig = toml::from_str("").unwrap();
        assert_eq!(c, HistoryConfig::default());
    }
}
