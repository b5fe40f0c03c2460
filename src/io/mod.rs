/*
 * Port I/O
 *
 * Low-level x86 port I/O, the foundation the serial driver is built on.
 * File descriptors, TTYs, and VFS plumbing belong to the rest of the
 * kernel and are out of scope for this subsystem.
 */

pub mod pio;

pub use pio::{Io, Pio, ReadOnly};
