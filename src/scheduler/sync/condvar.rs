//! Condition variable whose waiters are served in priority order.
//!
//! Unlike the semaphore and lock, a condvar wait has no intermediate
//! object to block on: the waiter just parks itself directly via
//! `scheduler::block_current()` and is woken by `scheduler::unblock()`,
//! the same primitives `Semaphore` is built from. The waiter list is
//! ordered by the priority of the *thread that queued* — there's no
//! meaningful priority of the record itself — and is re-sorted on
//! `signal`/`broadcast` for the same reason `Semaphore::up` re-sorts: a
//! waiter's priority can have aged upward since it queued.

use alloc::vec::Vec;

use crate::arch::x86_64::interrupts;
use crate::scheduler::{self, ThreadId};

use super::lock::Lock;

struct Waiter {
    tid: ThreadId,
    woken: bool,
}

pub struct CondVar {
    waiters: Vec<Waiter>,
}

impl CondVar {
    pub const fn new() -> Self {
        CondVar {
            waiters: Vec::new(),
        }
    }

    /// Atomically release `lock` and block the current thread until
    /// woken by `signal` or `broadcast`, then reacquire `lock`.
    ///
    /// # Panics
    /// If `lock` is not held by the current thread.
    pub fn wait(&mut self, lock: &mut Lock) {
        assert!(
            lock.held_by_current(),
            "CondVar::wait called without holding the lock"
        );

        let tid = scheduler::current_thread_id();
        self.insert_before_release(tid);

        lock.release();

        // Held disabled across block_current() for the same reason
        // Semaphore::down does: the "am I already woken" check and the
        // decision to park must be one atomic step, or a signal() landing
        // in the gap between them is a lost wakeup.
        let prev = interrupts::disable();
        loop {
            let idx = self
                .waiters
                .iter()
                .position(|w| w.tid == tid)
                .expect("condvar waiter record disappeared before being woken");
            if self.waiters[idx].woken {
                self.waiters.remove(idx);
                break;
            }
            scheduler::block_current();
        }
        interrupts::restore(prev);

        lock.acquire();
    }

    fn insert_before_release(&mut self, tid: ThreadId) {
        self.waiters.push(Waiter { tid, woken: false });
    }

    /// Wake the highest-priority waiter, if any.
    ///
    /// # Panics
    /// If `lock` is not held by the current thread.
    pub fn signal(&mut self, lock: &mut Lock) {
        assert!(
            lock.held_by_current(),
            "CondVar::signal called without holding the lock"
        );
        let prev = interrupts::disable();
        self.resort_waiters();
        let woken_tid = self.waiters.iter_mut().rev().find(|w| !w.woken).map(|w| {
            w.woken = true;
            w.tid
        });
        if let Some(tid) = woken_tid {
            scheduler::unblock(tid);
        }
        interrupts::restore(prev);
        if let Some(tid) = woken_tid {
            scheduler::maybe_preempt(tid);
        }
    }

    /// Wake every current waiter, highest priority first.
    pub fn broadcast(&mut self, lock: &mut Lock) {
        while self.waiters.iter().any(|w| !w.woken) {
            self.signal(lock);
        }
    }

    /// Ascending by priority, so the highest-priority waiter is last —
    /// `signal` scans from the back to find it in O(1) amortized.
    fn resort_waiters(&mut self) {
        self.waiters
            .sort_by_key(|w| scheduler::priority_of(w.tid));
    }
}
