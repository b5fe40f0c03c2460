//! Bucketed, priority-ordered ready queue.
//!
//! One FIFO bucket per priority level (`0..=PRI_MAX`), plus a bitmap with
//! one bit per bucket so the highest non-empty bucket can be found in O(1)
//! via `leading_zeros` instead of scanning all 64 buckets on every
//! `dequeue_highest()`. This narrows the teacher's two-`u64` (128 level)
//! bitmap run-queue technique down to a single `u64`, since this scheduler
//! only has 64 priority levels.

use alloc::collections::VecDeque;

use super::{PRI_MAX, ThreadId};

const NUM_BUCKETS: usize = PRI_MAX as usize + 1;

pub struct ReadyQueue {
    buckets: [VecDeque<ThreadId>; NUM_BUCKETS],
    bitmap: u64,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self {
            buckets: core::array::from_fn(|_| VecDeque::new()),
            bitmap: 0,
        }
    }

    /// Push `tid` to the back of `priority`'s bucket.
    pub fn enqueue(&mut self, tid: ThreadId, priority: u8) {
        let idx = priority as usize;
        self.buckets[idx].push_back(tid);
        self.bitmap |= 1 << idx;
    }

    /// Pop the front of the highest non-empty bucket.
    pub fn dequeue_highest(&mut self) -> Option<ThreadId> {
        let idx = self.highest_nonempty()?;
        let tid = self.buckets[idx].pop_front();
        if self.buckets[idx].is_empty() {
            self.bitmap &= !(1 << idx);
        }
        tid
    }

    /// Highest priority level with at least one ready thread, if any.
    pub fn highest_nonempty(&self) -> Option<usize> {
        if self.bitmap == 0 {
            None
        } else {
            Some(63 - self.bitmap.leading_zeros() as usize)
        }
    }

    /// Every thread id currently ready, across all buckets, highest priority
    /// first. Used by the aging pass.
    pub fn bucket_mut(&mut self, priority: u8) -> &mut VecDeque<ThreadId> {
        &mut self.buckets[priority as usize]
    }

    pub fn clear_bit_if_empty(&mut self, priority: u8) {
        if self.buckets[priority as usize].is_empty() {
            self.bitmap &= !(1 << (priority as usize));
        }
    }
}
