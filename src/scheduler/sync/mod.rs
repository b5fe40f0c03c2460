//! Priority-aware synchronization primitives built on the scheduler core.
//!
//! Every wait queue here is priority-ordered: the highest-priority waiter
//! is released first, and release always re-reads priorities from the live
//! thread records rather than trusting insertion order, since aging and
//! `set_priority` can reorder waiters while they sleep.

pub mod condvar;
pub mod lock;
pub mod semaphore;

pub use condvar::CondVar;
pub use lock::Lock;
pub use semaphore::Semaphore;
