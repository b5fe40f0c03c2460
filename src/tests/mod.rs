/*
 * Self-Test Suite for the Scheduler and Synchronization Subsystem
 *
 * This is a `#![no_std]` freestanding kernel with no host test harness
 * available (`cargo test` cannot link a no_std binary without a custom
 * test runner). Tests here are plain functions that spawn real threads
 * against the live scheduler, wait for them to finish, and report a
 * pass/fail line through `log::info!`/`log::error!` rather than through
 * `#[test]`.
 *
 * ## Public Test Functions
 *
 * - `comprehensive::run_comprehensive_test_suite()` - run every scenario
 */

pub mod comprehensive;
