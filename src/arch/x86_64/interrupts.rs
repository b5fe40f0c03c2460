/*
 * Interrupt Management Module
 *
 * This module provides utilities for managing CPU interrupts, including
 * enabling/disabling interrupts and checking interrupt status. It serves
 * as a high-level interface to x86_64 interrupt control instructions.
 *
 * Why this is important:
 * - Provides safe abstractions for interrupt control
 * - Essential for creating atomic sections of kernel code
 * - Enables proper synchronization in multi-threaded environments
 * - Prevents race conditions in critical kernel operations
 * - Forms the basis for all kernel synchronization primitives
 *
 * This is the scheduler's external "interrupt-masking primitive"
 * collaborator: disabling interrupts is the kernel's only mutual-exclusion
 * mechanism, so the scheduler and the sync layer (semaphore, lock, condvar)
 * bracket every state mutation with `without_interrupts` or the
 * `disable`/`restore` token pair below rather than taking a spinlock that
 * could be preempted mid-acquisition on this single core.
 */

use core::sync::atomic::{AtomicBool, Ordering};

use x86_64::instructions::interrupts;

/// Set while executing inside the timer ISR's Rust-side handler, between
/// `schedule_from_timer_interrupt`'s entry and its return. Blocking
/// operations (`Semaphore::down`, `Lock::acquire`, `CondVar::wait`,
/// `yield_now`, `block_current`) assert this is false: an interrupt has no
/// thread of its own to block.
static IN_INTERRUPT: AtomicBool = AtomicBool::new(false);

/// Set by the tick handler when the current thread should be preempted at
/// end-of-interrupt (time-slice exhaustion, or a higher-priority thread
/// became runnable during the ISR). Consumed once by the timer trampoline.
static YIELD_ON_RETURN: AtomicBool = AtomicBool::new(false);

/// Enable interrupts globally.
///
/// This allows the CPU to respond to hardware interrupts and exceptions.
/// Should only be called after the IDT has been properly initialized.
pub fn enable() {
    interrupts::enable();
}

/// Disable interrupts globally.
///
/// This prevents the CPU from responding to hardware interrupts.
/// Useful for critical sections where atomicity is required.
pub fn disable_unconditionally() {
    interrupts::disable();
}

/// Check if interrupts are currently enabled.
pub fn are_enabled() -> bool {
    interrupts::are_enabled()
}

/// Disable interrupts and return the previous level, for later restoration.
///
/// Pairs with [`restore`]. The round trip `let prev = disable(); restore(prev);`
/// always leaves the interrupt level exactly as it was found.
pub fn disable() -> bool {
    let prev = are_enabled();
    interrupts::disable();
    prev
}

/// Restore a previously captured interrupt level. A no-op if that level was
/// already disabled.
pub fn restore(prev_enabled: bool) {
    if prev_enabled {
        interrupts::enable();
    }
}

/// Execute a closure with interrupts disabled, restoring the prior level
/// (enabled or not) on return — including on unwind, though this kernel
/// builds with `panic = "abort"` and never actually unwinds.
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    interrupts::without_interrupts(f)
}

/// RAII guard that disables interrupts for its lifetime.
///
/// Interrupts are disabled when this guard is created and automatically
/// restored to whatever they were when it's dropped.
pub struct DisableInterrupts {
    were_enabled: bool,
}

impl DisableInterrupts {
    pub fn new() -> Self {
        Self {
            were_enabled: disable(),
        }
    }
}

impl Default for DisableInterrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DisableInterrupts {
    fn drop(&mut self) {
        restore(self.were_enabled);
    }
}

/// True while executing inside the timer ISR's scheduler-visible work.
pub fn in_interrupt() -> bool {
    IN_INTERRUPT.load(Ordering::SeqCst)
}

/// Entered/left only by the timer ISR's Rust-side handler, around the
/// `wake`/`tick` pair.
pub(crate) fn set_in_interrupt(value: bool) {
    IN_INTERRUPT.store(value, Ordering::SeqCst);
}

/// Mark the current ISR to request a reschedule when it returns to thread
/// context, rather than rescheduling from inside the interrupt.
pub fn yield_on_return() {
    YIELD_ON_RETURN.store(true, Ordering::SeqCst);
}

/// Consume (reset to false) and return whether a yield was requested since
/// the last call. Called once per timer interrupt by the trampoline.
pub(crate) fn take_yield_on_return() -> bool {
    YIELD_ON_RETURN.swap(false, Ordering::SeqCst)
}
