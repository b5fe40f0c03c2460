/*
 * Hardware Drivers
 *
 * This subsystem only needs two things from the outside world: a serial
 * port to log to, and a PIT-driven timer interrupt to tick the scheduler.
 * Display, input, and the rest of a real kernel's device zoo are the
 * external driver collaborator this core treats as out of scope (see
 * crate-level docs).
 *
 * Driver categories:
 * - Serial: UART communication, used as the debug log sink
 * - System: PIC, PIT, and other system controllers
 */

pub mod serial;
pub mod system;
