use nalgebra::DVector;
use std::collections::VecDeque;

/// one accepted point with the field evaluated there
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub t: f64,
    pub y: DVector<f64>,
    pub f: DVector<f64>,
}

/// Last `capacity` accepted (t, y, f) triples, oldest first.
///
/// Single-step methods only read the latest entry (its derivative is the first
/// stage of the next step), multistep methods read up to `capacity` entries back.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> History {
        let capacity = capacity.max(1);
        History {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// appends a triple, dropping the oldest one when full
    pub fn push(&mut self, t: f64, y: DVector<f64>, f: DVector<f64>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry { t, y, f });
    }

    /// `back(0)` is the latest entry, `back(1)` the one before it
    pub fn back(&self, j: usize) -> Option<&HistoryEntry> {
        if j >= self.entries.len() {
            return None;
        }
        self.entries.get(self.entries.len() - 1 - j)
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// true once the buffer holds `needed` entries
    pub fn is_ready(&self, needed: usize) -> bool {
        self.entries.len() >= needed
    }
}
