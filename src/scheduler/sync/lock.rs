//! Non-reentrant lock built on a binary semaphore.

use crate::scheduler::{self, ThreadId};

use super::semaphore::Semaphore;

pub struct Lock {
    sema: Semaphore,
    holder: Option<ThreadId>,
}

impl Lock {
    pub const fn new() -> Self {
        Lock {
            sema: Semaphore::new(1),
            holder: None,
        }
    }

    /// # Panics
    /// If the current thread already holds this lock — locks in this
    /// kernel are not reentrant.
    pub fn acquire(&mut self) {
        let me = scheduler::current_thread_id();
        assert!(
            self.holder != Some(me),
            "Lock::acquire: thread {} already holds this lock",
            me
        );
        self.sema.down();
        self.holder = Some(me);
    }

    pub fn try_acquire(&mut self) -> bool {
        let me = scheduler::current_thread_id();
        assert!(
            self.holder != Some(me),
            "Lock::try_acquire: thread {} already holds this lock",
            me
        );
        if self.sema.try_down() {
            self.holder = Some(me);
            true
        } else {
            false
        }
    }

    /// # Panics
    /// If the current thread does not hold this lock.
    pub fn release(&mut self) {
        let me = scheduler::current_thread_id();
        assert!(
            self.holder == Some(me),
            "Lock::release: thread {} does not hold this lock",
            me
        );
        self.holder = None;
        self.sema.up();
    }

    pub fn held_by_current(&self) -> bool {
        self.holder == Some(scheduler::current_thread_id())
    }

    pub fn holder(&self) -> Option<ThreadId> {
        self.holder
    }
}
