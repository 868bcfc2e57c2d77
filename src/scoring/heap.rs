//! Fixed-capacity top-K min-heap: keeps the K highest-scoring hits seen so
//! far, evicting the current minimum whenever a better one arrives (spec
//! §4.6, grounded on `TpTopKHeap`/`tp_topk_add_segment`).

use crate::tid::Tid;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Total-ordering wrapper around `f32` so scores can live in a
/// `BinaryHeap`. Mirrors the small local `ordered_float` helper BM25
/// scoring code elsewhere in this crate's lineage rolls by hand rather
/// than pulling in a crate for one comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Score(f32);

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    score: Score,
    tid: Tid,
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so BinaryHeap (a max-heap) behaves as a min-heap on
        // score, with ties broken by TID for deterministic results.
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.tid.cmp(&self.tid))
    }
}

/// A bounded top-K collector. Once full, only entries beating the current
/// minimum are admitted.
pub struct TopKHeap {
    capacity: usize,
    heap: BinaryHeap<Entry>,
}

impl TopKHeap {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    /// The score a new candidate must beat to be admitted once the heap
    /// is full; `None` while there's still free capacity.
    pub fn threshold(&self) -> Option<f32> {
        if self.heap.len() < self.capacity {
            None
        } else {
            self.heap.peek().map(|e| e.score.0)
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Offers a scored hit. Returns `true` if it was admitted (either the
    /// heap had room, or it beat the current minimum).
    pub fn push(&mut self, tid: Tid, score: f32) -> bool {
        let entry = Entry {
            score: Score(score),
            tid,
        };
        if self.heap.len() < self.capacity {
            self.heap.push(entry);
            true
        } else if let Some(threshold) = self.threshold() {
            if score > threshold {
                self.heap.pop();
                self.heap.push(entry);
                true
            } else {
                false
            }
        } else {
            false
        }
    }

    /// Drains the heap into a descending-by-score vector.
    pub fn into_sorted_vec(self) -> Vec<(Tid, f32)> {
        let mut v: Vec<(Tid, f32)> = self.heap.into_iter().map(|e| (e.tid, e.score.0)).collect();
        v.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_top_k() {
        let mut heap = TopKHeap::new(2);
        assert!(heap.push(Tid::new(1, 0), 1.0));
        assert!(heap.push(Tid::new(2, 0), 3.0));
        assert!(heap.push(Tid::new(3, 0), 2.0)); // beats min (1.0)
        assert!(!heap.push(Tid::new(4, 0), 0.5)); // below min

        let sorted = heap.into_sorted_vec();
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].0, Tid::new(2, 0));
        assert_eq!(sorted[1].0, Tid::new(3, 0));
    }

    #[test]
    fn threshold_is_none_until_full() {
        let mut heap = TopKHeap::new(3);
        assert_eq!(heap.threshold(), None);
        heap.push(Tid::new(1, 0), 5.0);
        heap.push(Tid::new(2, 0), 5.0);
        assert_eq!(heap.threshold(), None);
        heap.push(Tid::new(3, 0), 5.0);
        assert_eq!(heap.threshold(), Some(5.0));
    }

    #[test]
    fn ties_break_by_tid_deterministically() {
        let mut heap = TopKHeap::new(1);
        heap.push(Tid::new(5, 0), 1.0);
        heap.push(Tid::new(1, 0), 1.0);
        let sorted = heap.into_sorted_vec();
        assert_eq!(sorted.len(), 1);
    }
}
