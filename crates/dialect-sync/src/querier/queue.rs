//! Least-recently-polled scheduling of queriers.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::core::traits::Connection;

use super::TableQuerier;

/// Min-heap of queriers keyed by `(last_update, name)`.
///
/// A querier is popped, polled and pushed back; its key only changes while
/// it is out of the heap, so the order is stable.
pub struct PollQueue<C: Connection> {
    heap: BinaryHeap<Reverse<TableQuerier<C>>>,
}

impl<C: Connection> PollQueue<C> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub fn push(&mut self, querier: TableQuerier<C>) {
        self.heap.push(Reverse(querier));
    }

    /// Remove the least recently polled querier.
    pub fn pop(&mut self) -> Option<TableQuerier<C>> {
        self.heap.pop().map(|Reverse(q)| q)
    }

    pub fn peek(&self) -> Option<&TableQuerier<C>> {
        self.heap.peek().map(|Reverse(q)| q)
    }

    /// Milliseconds until the head is due, given a poll interval. Zero when
    /// it is already due, `None` when the queue is empty.
    pub fn wait_millis(&self, now_millis: i64, interval_millis: i64) -> Option<u64> {
        self.peek().map(|q| {
            let due = q.last_update().saturating_add(interval_millis);
            u64::try_from(due.saturating_sub(now_millis)).unwrap_or(0)
        })
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Take every querier out, in no particular order.
    pub fn drain(&mut self) -> Vec<TableQuerier<C>> {
        self.heap.drain().map(|Reverse(q)| q).collect()
    }
}

impl<C: Connection> Default for PollQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}
