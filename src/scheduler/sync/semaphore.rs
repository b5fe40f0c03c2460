//! Priority-ordered counting semaphore.
//!
//! Waiters are kept sorted by the priority of the thread they belong to,
//! highest first, and re-sorted defensively on `up()` before the front is
//! popped — a queued waiter's priority can have changed since it was
//! inserted (aging, or a `set_priority` call), so the list can't be trusted
//! to still be in order just because it was built that way.

use alloc::vec::Vec;

use crate::arch::x86_64::interrupts;
use crate::scheduler::{self, ThreadId};

pub struct Semaphore {
    value: u64,
    waiters: Vec<ThreadId>,
}

impl Semaphore {
    pub const fn new(value: u64) -> Self {
        Semaphore {
            value,
            waiters: Vec::new(),
        }
    }

    /// Block until the count is positive, then decrement it.
    ///
    /// The whole check-insert-block sequence runs with interrupts disabled,
    /// held disabled across `block_current()` itself (it only ever narrows
    /// that disabled window, never widens it) so that a timer preemption
    /// can't land between "value is zero" and "I'm in the waiter list" and
    /// steal the wakeup an `up()` on another thread would otherwise deliver.
    ///
    /// # Panics
    /// If called from interrupt context — blocking operations need a
    /// thread to block, and interrupt handlers aren't threads.
    pub fn down(&mut self) {
        assert!(
            !scheduler::in_interrupt_context(),
            "Semaphore::down called from interrupt context"
        );

        let prev = interrupts::disable();
        while self.value == 0 {
            let me = scheduler::current_thread_id();
            self.insert_waiter(me);
            scheduler::block_current();
        }
        self.value -= 1;
        interrupts::restore(prev);
    }

    /// Non-blocking `down`. Returns whether it succeeded.
    pub fn try_down(&mut self) -> bool {
        if self.value > 0 {
            self.value -= 1;
            true
        } else {
            false
        }
    }

    /// Wake the highest-priority waiter (if any) and increment the count.
    /// If the woken thread now outranks the caller, yields immediately.
    pub fn up(&mut self) {
        let prev = interrupts::disable();
        self.resort_waiters();
        let woken = self.waiters.pop();
        self.value += 1;
        if let Some(tid) = woken {
            scheduler::unblock(tid);
        }
        interrupts::restore(prev);
        if let Some(tid) = woken {
            scheduler::maybe_preempt(tid);
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    fn insert_waiter(&mut self, tid: ThreadId) {
        if !self.waiters.contains(&tid) {
            self.waiters.push(tid);
        }
    }

    /// Sort ascending by priority so the highest priority waiter is the
    /// last element — `Vec::pop` then removes the highest in O(1).
    fn resort_waiters(&mut self) {
        self.waiters
            .sort_by_key(|&tid| scheduler::priority_of(tid));
    }
}
