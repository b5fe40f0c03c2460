/*
 * Tick Source
 *
 * This module is the scheduler's external "tick source" collaborator
 * (see scheduler module docs): it turns the 100Hz PIT interrupt into the
 * monotonic tick counter the scheduler's sleep/wake and aging/time-slice
 * logic are keyed on, and drives the tick-source contract itself —
 * `wake(now)` before `tick()`, once per interrupt.
 *
 * Nothing here touches ready queues or thread state directly; that's the
 * scheduler core's job once it's handed a tick.
 */

use core::sync::atomic::{AtomicU64, Ordering};

/// Ticks elapsed since boot. One tick per timer interrupt at the
/// configured PIT frequency (100Hz, i.e. 10ms/tick).
static TICKS: AtomicU64 = AtomicU64::new(0);

/// Called from the timer interrupt handler (IRQ0), exactly once per
/// interrupt. Drives the scheduler's tick-source contract: wake any thread
/// whose sleep deadline has passed, then run the scheduler's own
/// accounting (aging pass, time-slice countdown).
pub fn on_timer_interrupt() {
    let now = TICKS.fetch_add(1, Ordering::SeqCst) + 1;

    crate::scheduler::wake(now);
    crate::scheduler::tick();

    if now % 1000 == 0 {
        log::debug!("tick {now}");
    }
}

/// Current tick count, i.e. the monotonic clock the scheduler's
/// `sleep_until` deadlines and wakeups are expressed in.
pub fn ticks() -> u64 {
    TICKS.load(Ordering::SeqCst)
}

/// Convenience for callers computing a future deadline, e.g.
/// `sleep_until(timer::ticks_from_now(5))`.
pub fn ticks_from_now(delta: u64) -> u64 {
    ticks() + delta
}
