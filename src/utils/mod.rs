/*
 * Kernel Utilities and Support Functions
 *
 * This module contains various utility functions, macros, and support
 * code used throughout the kernel. It provides common functionality
 * like logging, text output, and debugging macros.
 *
 * Key components:
 * - writer: Serial port text output functionality
 * - macros: Kernel-specific print and debug macros
 * - debug: structured + IRQ-safe logging infrastructure
 * - timer: the scheduler's tick source
 */

pub mod writer;
#[macro_use]
pub mod macros;
pub mod debug;
pub mod timer;
