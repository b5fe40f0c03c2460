/*
 * Debugging and Logging Utilities
 *
 * This module contains utilities for debugging and logging,
 * providing structured logging and debug output capabilities.
 *
 * - `logger`: the `log`-crate backend, installed once at boot.
 * - `log_buffer` / `ring_buffer`: a lock-free buffer the logger drains
 *   through, so a log call from inside a critical section never needs to
 *   contend for the serial port's mutex.
 * - `irq_log`: a raw, allocation-free fallback used only from contexts
 *   where even the buffered path isn't safe (early exception handlers).
 */

pub mod irq_log;
pub mod log_buffer;
pub mod logger;
pub mod ring_buffer;

/// Initialize debug infrastructure (COM2 port for logging).
pub fn init_debug_infrastructure() {
    crate::drivers::serial::init_debug_port();
    log_buffer::init();
}
