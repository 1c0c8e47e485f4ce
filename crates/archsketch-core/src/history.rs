//! Bounded undo/redo log of canvas snapshots.

use crate::model::{Component, Connection, InfoCard, Stroke};
use std::collections::VecDeque;

/// The undo-relevant part of the canvas state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    pub components: Vec<Component>,
    pub connections: Vec<Connection>,
    pub info_cards: Vec<InfoCard>,
    pub strokes: Vec<Stroke>,
}

/// Past and future snapshots around the live state.
///
/// `past` holds states before each recorded mutation, oldest first, capped at
/// `max_depth`. A new recording clears `future`.
#[derive(Debug, Clone)]
pub struct TemporalHistory {
    past: VecDeque<HistorySnapshot>,
    future: Vec<HistorySnapshot>,
    max_depth: usize,
}

impl TemporalHistory {
    pub fn new(max_depth: usize) -> Self {
        Self {
            past: VecDeque::with_capacity(max_depth.min(64)),
            future: Vec::new(),
            max_depth,
        }
    }

    /// Record a transition from `previous` to `current`.
    ///
    /// Returns false when the two are deep-equal, in which case nothing is
    /// recorded and the redo stack survives.
    pub fn record(&mut self, previous: HistorySnapshot, current: &HistorySnapshot) -> bool {
        if self.max_depth == 0 || previous == *current {
            return false;
        }
        self.push_past(previous);
        self.future.clear();
        true
    }

    /// Step back. Takes the live state and returns the one to restore.
    pub fn undo(&mut self, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let previous = self.past.pop_back()?;
        self.future.push(current);
        Some(previous)
    }

    /// Step forward. Takes the live state and returns the one to restore.
    pub fn redo(&mut self, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let next = self.future.pop()?;
        self.push_past(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    fn push_past(&mut self, snapshot: HistorySnapshot) {
        self.past.push_back(snapshot);
        while self.past.len() > self.max_depth {
            self.past.pop_front();
        }
    }
}
