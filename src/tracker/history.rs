//! Fixed-capacity motion history.

use std::collections::VecDeque;

use crate::tracker::rect::Point;

/// One entry per processed frame: the detected center, or `None` when the
/// frame produced no detection. The oldest entry is evicted once the buffer
/// is full.
#[derive(Debug, Clone)]
pub struct MotionHistory {
    entries: VecDeque<Option<Point>>,
    capacity: usize,
}

impl MotionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: Option<Point>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
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

    /// Most recent entry, absent or not. `None` when nothing was pushed yet.
    pub fn last(&self) -> Option<Option<Point>> {
        self.entries.back().copied()
    }

    /// Most recent entry if that frame had a detection.
    pub fn last_point(&self) -> Option<Point> {
        self.entries.back().copied().flatten()
    }

    /// The two most recent entries as `(previous, last)` when both frames
    /// had a detection.
    pub fn last_pair(&self) -> Option<(Point, Point)> {
        let mut newest = self.entries.iter().rev();
        match (newest.next(), newest.next()) {
            (Some(Some(last)), Some(Some(previous))) => Some((*previous, *last)),
            _ => None,
        }
    }

    /// All entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Option<Point>> {
        self.entries.iter()
    }

    /// Non-absent points, oldest first: the trail a renderer draws.
    pub fn trail(&self) -> impl Iterator<Item = Point> + '_ {
        self.entries.iter().flatten().copied()
    }
}
