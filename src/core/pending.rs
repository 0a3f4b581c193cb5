//! Time-ordered pending set of rescheduled tasks.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// A task waiting for its retry time.
#[derive(Debug)]
pub struct PendingItem<T> {
    /// The held task.
    pub task: T,
    /// When the task becomes due. May already be in the past.
    pub target: Instant,
    /// Insertion sequence; breaks ties between equal targets (FIFO).
    pub seq: u64,
}

impl<T> PartialEq for PendingItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl<T> Eq for PendingItem<T> {}

impl<T> PartialOrd for PendingItem<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for PendingItem<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for the max-heap: earliest target, then lowest seq, wins.
        other
            .target
            .cmp(&self.target)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-ordered set of pending items keyed by `(target, seq)`.
///
/// O(log n) insert and extract, O(1) peek and size. Sequence numbers are
/// assigned here and keep increasing for the lifetime of the set.
pub struct PendingSet<T> {
    items: BinaryHeap<PendingItem<T>>,
    next_seq: u64,
}

impl<T> Default for PendingSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PendingSet<T> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Insert a task due at `target` and return its sequence number.
    pub fn insert(&mut self, task: T, target: Instant) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.items.push(PendingItem { task, target, seq });
        seq
    }

    /// The item with the smallest `(target, seq)`, if any.
    #[must_use]
    pub fn peek_earliest(&self) -> Option<&PendingItem<T>> {
        self.items.peek()
    }

    /// Remove and return the item with the smallest `(target, seq)`.
    pub fn extract_earliest(&mut self) -> Option<PendingItem<T>> {
        self.items.pop()
    }

    /// Number of pending items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Move every item matching `pred` forward to `now`, keeping its sequence.
    ///
    /// Items already due are left alone. Returns how many were moved.
    pub fn expedite<F>(&mut self, now: Instant, mut pred: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let mut moved = 0;
        let mut items = std::mem::take(&mut self.items).into_vec();
        for item in &mut items {
            if item.target > now && pred(&item.task) {
                item.target = now;
                moved += 1;
            }
        }
        self.items = BinaryHeap::from(items);
        moved
    }

    /// Drop every item whose task fails `keep`. Returns how many were dropped.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|item| keep(&item.task));
        before - self.items.len()
    }

    /// Remove all items, returned in dispatch order.
    pub fn drain_ordered(&mut self) -> Vec<PendingItem<T>> {
        std::mem::take(&mut self.items).into_sorted_vec().into_iter().rev().collect()
    }
}
