//! Priority queue of pending batches
//!
//! Yields batches by priority (highest first), then by creation time (oldest
//! first), then by insertion order. Not synchronized; the store serializes
//! access.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};

use crate::domain::{Batch, BatchId, Priority};

/// A pending batch as held by the queue
#[derive(Debug, Clone)]
pub struct QueuedBatch {
    pub batch_id: BatchId,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    seq: u64,
}

impl Eq for QueuedBatch {}

impl PartialEq for QueuedBatch {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for QueuedBatch {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher priority first, then earlier creation, then earlier insertion
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.created_at.cmp(&self.created_at))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedBatch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Max-heap of pending batches
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<QueuedBatch>,
    next_seq: u64,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch to the queue
    pub fn enqueue(&mut self, batch: &Batch) {
        let entry = QueuedBatch {
            batch_id: batch.id.clone(),
            priority: batch.priority,
            created_at: batch.created_at,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.heap.push(entry);
    }

    /// Remove and return the next batch, if any
    pub fn dequeue(&mut self) -> Option<QueuedBatch> {
        self.heap.pop()
    }

    /// Look at the next batch without removing it
    pub fn peek(&self) -> Option<&QueuedBatch> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IngestionId;
    use chrono::Duration;
    use proptest::prelude::*;

    fn batch(priority: Priority, created_at: DateTime<Utc>) -> Batch {
        Batch::new(IngestionId::generate(), vec![1], priority, created_at)
    }

    fn drain(queue: &mut PriorityQueue) -> Vec<BatchId> {
        std::iter::from_fn(|| queue.dequeue()).map(|q| q.batch_id).collect()
    }

    #[test]
    fn test_priority_beats_age() {
        let t0 = Utc::now();
        let low = batch(Priority::Low, t0);
        let high = batch(Priority::High, t0 + Duration::milliseconds(1));
        let medium = batch(Priority::Medium, t0 + Duration::milliseconds(2));

        let mut queue = PriorityQueue::new();
        queue.enqueue(&low);
        queue.enqueue(&high);
        queue.enqueue(&medium);

        assert_eq!(drain(&mut queue), vec![high.id, medium.id, low.id]);
    }

    #[test]
    fn test_same_priority_oldest_first() {
        let t0 = Utc::now();
        let newer = batch(Priority::Medium, t0 + Duration::seconds(1));
        let older = batch(Priority::Medium, t0);

        let mut queue = PriorityQueue::new();
        queue.enqueue(&newer);
        queue.enqueue(&older);

        assert_eq!(drain(&mut queue), vec![older.id, newer.id]);
    }

    #[test]
    fn test_full_ties_keep_insertion_order() {
        let t0 = Utc::now();
        let batches: Vec<_> = (0..5).map(|_| batch(Priority::High, t0)).collect();

        let mut queue = PriorityQueue::new();
        for b in &batches {
            queue.enqueue(b);
        }

        let expected: Vec<_> = batches.into_iter().map(|b| b.id).collect();
        assert_eq!(drain(&mut queue), expected);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut queue = PriorityQueue::new();
        assert!(queue.peek().is_none());

        let b = batch(Priority::Low, Utc::now());
        queue.enqueue(&b);

        assert_eq!(queue.peek().map(|q| &q.batch_id), Some(&b.id));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.dequeue().map(|q| q.batch_id), Some(b.id));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_peek_reflects_later_enqueue() {
        let t0 = Utc::now();
        let mut queue = PriorityQueue::new();
        queue.enqueue(&batch(Priority::Low, t0));

        let high = batch(Priority::High, t0 + Duration::seconds(5));
        queue.enqueue(&high);

        assert_eq!(queue.peek().map(|q| &q.batch_id), Some(&high.id));
    }

    #[test]
    fn test_dequeue_empty() {
        let mut queue = PriorityQueue::new();
        assert!(queue.dequeue().is_none());
    }

    fn priority_strategy() -> impl Strategy<Value = Priority> {
        prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
    }

    proptest! {
        #[test]
        fn prop_dequeue_order_is_sorted(entries in prop::collection::vec((priority_strategy(), 0i64..5), 0..40)) {
            let t0 = Utc::now();
            let mut queue = PriorityQueue::new();
            let mut expected = Vec::new();

            for (seq, (priority, offset)) in entries.into_iter().enumerate() {
                let b = batch(priority, t0 + Duration::milliseconds(offset));
                queue.enqueue(&b);
                expected.push((std::cmp::Reverse(priority), b.created_at, seq, b.id));
            }

            expected.sort();
            let expected: Vec<_> = expected.into_iter().map(|(_, _, _, id)| id).collect();
            let actual = drain(&mut queue);

            prop_assert_eq!(actual, expected);
        }
    }
}
