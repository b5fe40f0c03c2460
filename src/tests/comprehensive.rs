/*
 * Scheduler & Synchronization Self-Test Suite
 *
 * Six scenarios exercising the scheduler core and the priority-aware
 * synchronization primitives against the live, running kernel rather than
 * a host test harness (no_std has none). Each scenario spawns real
 * threads, drives them with this thread's own yields/sleeps, and reports
 * a pass/fail line via `log`. `run_comprehensive_test_suite` runs all six
 * in sequence and logs a final summary.
 */

use alloc::vec::Vec;
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::scheduler::sync::{CondVar, Lock, Semaphore};
use crate::scheduler::{self, ThreadManager, PRI_DEFAULT, PRI_MAX, PRI_MIN};
use crate::utils::timer;

/// Shared state for these scenarios needs `&mut` access from several
/// independently-spawned threads. There is only one CPU and no real
/// parallelism, only interleaving at the scheduler's own block/yield
/// points, so a bare `UnsafeCell` is enough: it's the same trust model the
/// scheduler itself places in `Semaphore`/`Lock`/`CondVar`, which take
/// `&mut self` and are likewise meant to be shared across threads that
/// way. A `spin::Mutex` around one of these would be actively wrong here,
/// since a waiter can block *while* "holding" it (inside `down`/`wait`),
/// which would wedge every other thread trying to lock the same mutex.
struct SyncCell<T>(UnsafeCell<T>);

unsafe impl<T> Sync for SyncCell<T> {}

impl<T> SyncCell<T> {
    const fn new(value: T) -> Self {
        SyncCell(UnsafeCell::new(value))
    }

    #[allow(clippy::mut_from_ref)]
    fn get(&self) -> &mut T {
        unsafe { &mut *self.0.get() }
    }
}

/// ===============================
///  SCENARIO 1: priority-preempt-timer
/// ===============================

static PREEMPT_HOG_STOP: AtomicBool = AtomicBool::new(false);
static PREEMPT_HOG_SPAWNED_AT: AtomicU64 = AtomicU64::new(0);
static PREEMPT_HIGH_RAN_AT: AtomicU64 = AtomicU64::new(0);
static PREEMPT_HIGH_RAN: AtomicBool = AtomicBool::new(false);

fn preempt_hog(_aux: usize) {
    while !PREEMPT_HOG_STOP.load(Ordering::SeqCst) {
        core::hint::spin_loop();
    }
}

fn preempt_high_priority(_aux: usize) {
    let started = PREEMPT_HOG_SPAWNED_AT.load(Ordering::SeqCst);
    let now = timer::ticks();
    PREEMPT_HIGH_RAN_AT.store(now, Ordering::SeqCst);
    log::info!(
        "High-priority thread preempted CPU hog after {} ticks.",
        now.saturating_sub(started)
    );
    PREEMPT_HOG_STOP.store(true, Ordering::SeqCst);
    PREEMPT_HIGH_RAN.store(true, Ordering::SeqCst);
}

fn test_priority_preempt_timer() -> bool {
    log::info!("--- scenario: priority-preempt-timer ---");
    PREEMPT_HOG_STOP.store(false, Ordering::SeqCst);
    PREEMPT_HIGH_RAN.store(false, Ordering::SeqCst);

    PREEMPT_HOG_SPAWNED_AT.store(timer::ticks(), Ordering::SeqCst);
    ThreadManager::spawn_with_priority(preempt_hog, "preempt-hog", PRI_DEFAULT, 0);

    // Hand the CPU to the hog so it actually starts spinning before the
    // higher-priority thread shows up to cut in line.
    scheduler::yield_now();

    ThreadManager::spawn_with_priority(preempt_high_priority, "preempt-high", PRI_MAX, 0);

    let mut spins = 0;
    while !PREEMPT_HIGH_RAN.load(Ordering::SeqCst) && spins < 1000 {
        scheduler::yield_now();
        spins += 1;
    }

    let pass = PREEMPT_HIGH_RAN.load(Ordering::SeqCst);
    log_result("priority-preempt-timer", pass);
    pass
}

/// ===============================
///  SCENARIO 2: priority-aging
/// ===============================

static AGING_HOG_STOP: AtomicBool = AtomicBool::new(false);
static AGING_HAS_RUN: AtomicBool = AtomicBool::new(false);
static AGING_RECORDED_PRI: AtomicU64 = AtomicU64::new(0);

fn aging_hog(_aux: usize) {
    while !AGING_HOG_STOP.load(Ordering::SeqCst) {
        core::hint::spin_loop();
    }
}

/// Spawned well below the hog; records its own priority the first (and
/// only) time it actually runs, then tells the hog to stop.
fn aging_thread(_aux: usize) {
    AGING_RECORDED_PRI.store(scheduler::get_priority() as u64, Ordering::SeqCst);
    AGING_HAS_RUN.store(true, Ordering::SeqCst);
    AGING_HOG_STOP.store(true, Ordering::SeqCst);
}

fn test_priority_aging() -> bool {
    log::info!("--- scenario: priority-aging ---");
    AGING_HOG_STOP.store(false, Ordering::SeqCst);
    AGING_HAS_RUN.store(false, Ordering::SeqCst);
    AGING_RECORDED_PRI.store(0, Ordering::SeqCst);

    let original_priority = scheduler::get_priority();
    scheduler::set_priority(PRI_DEFAULT + 1);

    ThreadManager::spawn_with_priority(aging_hog, "aging-hog", PRI_DEFAULT, 0);
    ThreadManager::spawn_with_priority(aging_thread, "aging-thread", PRI_DEFAULT - 5, 0);

    // Dropping to PRI_MIN hands the CPU entirely to the hog and the aging
    // thread: the hog (PRI_DEFAULT) wins every forced time-slice reschedule
    // until the aging thread's priority, climbing from PRI_DEFAULT - 5 under
    // the anti-starvation aging pass, finally outranks it.
    scheduler::set_priority(PRI_MIN);

    let deadline = timer::ticks_from_now(200);
    while !AGING_HAS_RUN.load(Ordering::SeqCst) && timer::ticks() < deadline {
        scheduler::yield_now();
    }

    AGING_HOG_STOP.store(true, Ordering::SeqCst);
    scheduler::set_priority(original_priority);
    scheduler::yield_now();

    let recorded = AGING_RECORDED_PRI.load(Ordering::SeqCst) as u8;
    log::info!(
        "priority aging: aging-thread first ran with priority {} (needs >= {})",
        recorded,
        PRI_DEFAULT
    );

    let pass = AGING_HAS_RUN.load(Ordering::SeqCst) && recorded >= PRI_DEFAULT;
    log_result("priority-aging", pass);
    pass
}

/// ===============================
///  SCENARIO 3: mlfqs-simplified
/// ===============================

static MLFQS_STOP: AtomicBool = AtomicBool::new(false);
static MLFQS_INTERACTIVE_DONE: AtomicBool = AtomicBool::new(false);
static MLFQS_INTERACTIVE_PRI: AtomicU64 = AtomicU64::new(0);
static MLFQS_HOG_PRI: AtomicU64 = AtomicU64::new(0);

/// Spins until the interactive thread finishes its sleeps (or the test
/// gives up) and records its own priority at that point.
fn mlfqs_hog(_aux: usize) {
    while !MLFQS_STOP.load(Ordering::SeqCst) && !MLFQS_INTERACTIVE_DONE.load(Ordering::SeqCst) {
        core::hint::spin_loop();
    }
    MLFQS_HOG_PRI.store(scheduler::get_priority() as u64, Ordering::SeqCst);
}

/// Sleeps 1 tick, eight times, then records its own priority. Each sleep
/// parks it as `Blocked`, which is exactly the state the aging pass now
/// credits even off the ready queue — the mechanism that is supposed to
/// let an I/O-bound thread like this one outrank a hog that never blocks.
fn mlfqs_interactive(_aux: usize) {
    for _ in 0..8 {
        scheduler::sleep_until(timer::ticks_from_now(1));
    }
    MLFQS_INTERACTIVE_PRI.store(scheduler::get_priority() as u64, Ordering::SeqCst);
    MLFQS_INTERACTIVE_DONE.store(true, Ordering::SeqCst);
}

fn test_mlfqs_simplified() -> bool {
    log::info!("--- scenario: mlfqs-simplified ---");
    MLFQS_STOP.store(false, Ordering::SeqCst);
    MLFQS_INTERACTIVE_DONE.store(false, Ordering::SeqCst);
    MLFQS_INTERACTIVE_PRI.store(0, Ordering::SeqCst);
    MLFQS_HOG_PRI.store(0, Ordering::SeqCst);

    ThreadManager::spawn_with_priority(mlfqs_hog, "mlfqs-hog", PRI_DEFAULT, 0);
    ThreadManager::spawn_with_priority(mlfqs_interactive, "mlfqs-interactive", PRI_DEFAULT, 0);

    let deadline = timer::ticks_from_now(200);
    while !MLFQS_INTERACTIVE_DONE.load(Ordering::SeqCst) && timer::ticks() < deadline {
        scheduler::yield_now();
    }
    MLFQS_STOP.store(true, Ordering::SeqCst);
    // Let the hog actually observe the stop and record its own priority
    // before this thread reads either back.
    scheduler::yield_now();
    scheduler::yield_now();

    let pri_interactive = MLFQS_INTERACTIVE_PRI.load(Ordering::SeqCst) as u8;
    let pri_hog = MLFQS_HOG_PRI.load(Ordering::SeqCst) as u8;

    log::info!(
        "mlfq priority comparison: interactive={} hog={}",
        pri_interactive,
        pri_hog
    );

    let pass = if scheduler::mlfqs_enabled() {
        let before = scheduler::get_priority();
        scheduler::set_priority(PRI_MAX);
        let effective = scheduler::get_priority();
        scheduler::set_priority(before);
        let advisory_only = effective == before;
        log::info!(
            "mlfqs mode: set_priority({}) ignored, stayed at {}",
            PRI_MAX,
            effective
        );
        pri_interactive > pri_hog && advisory_only
    } else {
        let before = scheduler::get_priority();
        scheduler::set_priority(PRI_MIN);
        let after = scheduler::get_priority();
        scheduler::set_priority(before);
        log::info!(
            "non-mlfqs mode: set_priority({}) took effect, read back {}",
            PRI_MIN,
            after
        );
        after == PRI_MIN
    };

    log_result("mlfqs-simplified", pass);
    pass
}

/// ===============================
///  SCENARIO 4: semaphore-fairness-by-priority
/// ===============================

static SEM_FAIRNESS: SyncCell<Semaphore> = SyncCell::new(Semaphore::new(0));
static SEM_FAIRNESS_ORDER: SyncCell<Vec<&'static str>> = SyncCell::new(Vec::new());
const SEM_FAIRNESS_LABELS: [&str; 3] = ["low", "mid", "high"];

fn sem_fairness_waiter(aux: usize) {
    SEM_FAIRNESS.get().down();
    SEM_FAIRNESS_ORDER.get().push(SEM_FAIRNESS_LABELS[aux]);
}

fn test_semaphore_fairness() -> bool {
    log::info!("--- scenario: semaphore-fairness-by-priority ---");
    *SEM_FAIRNESS.get() = Semaphore::new(0);
    *SEM_FAIRNESS_ORDER.get() = Vec::new();

    // Spawn lowest-priority first: if the semaphore woke waiters in
    // arrival order instead of by priority, this would surface it.
    ThreadManager::spawn_with_priority(sem_fairness_waiter, "sem-low", PRI_MIN + 5, 0);
    ThreadManager::spawn_with_priority(sem_fairness_waiter, "sem-mid", PRI_DEFAULT, 1);
    ThreadManager::spawn_with_priority(sem_fairness_waiter, "sem-high", PRI_MAX - 5, 2);

    // Give all three a chance to reach `down()` and queue before releasing.
    scheduler::yield_now();
    scheduler::yield_now();

    for _ in 0..3 {
        SEM_FAIRNESS.get().up();
        scheduler::yield_now();
    }

    let order = SEM_FAIRNESS_ORDER.get().clone();
    log::info!("semaphore wake order: {:?}", order);

    let pass = order.as_slice() == ["high", "mid", "low"];
    log_result("semaphore-fairness-by-priority", pass);
    pass
}

/// ===============================
///  SCENARIO 5: condvar-priority-ordering
/// ===============================

static CONDVAR_LOCK: SyncCell<Lock> = SyncCell::new(Lock::new());
static CONDVAR_VAR: SyncCell<CondVar> = SyncCell::new(CondVar::new());
static CONDVAR_READY: AtomicBool = AtomicBool::new(false);
static CONDVAR_ORDER: SyncCell<Vec<&'static str>> = SyncCell::new(Vec::new());
const CONDVAR_LABELS: [&str; 3] = ["low", "mid", "high"];

fn condvar_waiter(aux: usize) {
    let lock = CONDVAR_LOCK.get();
    lock.acquire();
    while !CONDVAR_READY.load(Ordering::SeqCst) {
        CONDVAR_VAR.get().wait(lock);
    }
    CONDVAR_ORDER.get().push(CONDVAR_LABELS[aux]);
    lock.release();
}

fn test_condvar_priority_ordering() -> bool {
    log::info!("--- scenario: condvar-priority-ordering ---");
    *CONDVAR_LOCK.get() = Lock::new();
    *CONDVAR_VAR.get() = CondVar::new();
    *CONDVAR_ORDER.get() = Vec::new();
    CONDVAR_READY.store(false, Ordering::SeqCst);

    ThreadManager::spawn_with_priority(condvar_waiter, "cv-low", PRI_MIN + 5, 0);
    ThreadManager::spawn_with_priority(condvar_waiter, "cv-mid", PRI_DEFAULT, 1);
    ThreadManager::spawn_with_priority(condvar_waiter, "cv-high", PRI_MAX - 5, 2);

    // Let all three reach `wait()` and queue behind the lock/condvar.
    scheduler::yield_now();
    scheduler::yield_now();

    {
        let lock = CONDVAR_LOCK.get();
        lock.acquire();
        CONDVAR_READY.store(true, Ordering::SeqCst);
        CONDVAR_VAR.get().broadcast(lock);
        lock.release();
    }

    scheduler::yield_now();
    scheduler::yield_now();

    let order = CONDVAR_ORDER.get().clone();
    log::info!("condvar wake order: {:?}", order);

    let pass = order.as_slice() == ["high", "mid", "low"];
    log_result("condvar-priority-ordering", pass);
    pass
}

/// ===============================
///  SCENARIO 6: fifo-within-priority
/// ===============================

static FIFO_ORDER: SyncCell<Vec<usize>> = SyncCell::new(Vec::new());

fn fifo_ready_thread(aux: usize) {
    FIFO_ORDER.get().push(aux);
}

fn test_fifo_within_priority() -> bool {
    log::info!("--- scenario: fifo-within-priority ---");
    *FIFO_ORDER.get() = Vec::new();

    for i in 0..3 {
        ThreadManager::spawn_with_priority(fifo_ready_thread, "fifo-t", PRI_DEFAULT, i);
    }

    // All three sit in the same ready-queue bucket as each other (none
    // outranks this thread, so spawning doesn't preempt); repeated yields
    // drain that bucket FIFO.
    for _ in 0..4 {
        scheduler::yield_now();
    }

    let order = FIFO_ORDER.get().clone();
    log::info!("ready-queue wake order: {:?}", order);

    let pass = order.as_slice() == [0, 1, 2];
    log_result("fifo-within-priority", pass);
    pass
}

fn log_result(name: &str, pass: bool) {
    if pass {
        log::info!("PASS {}", name);
    } else {
        log::error!("FAIL {}", name);
    }
}

/// Run every scenario in sequence and log a final summary.
pub fn run_comprehensive_test_suite() {
    log::info!("=== scheduler self-test suite starting ===");

    let results = [
        test_priority_preempt_timer(),
        test_priority_aging(),
        test_mlfqs_simplified(),
        test_semaphore_fairness(),
        test_condvar_priority_ordering(),
        test_fifo_within_priority(),
    ];

    let passed = results.iter().filter(|&&ok| ok).count();
    let total = results.len();

    if passed == total {
        log::info!("=== scheduler self-test suite: {}/{} passed ===", passed, total);
    } else {
        log::error!("=== scheduler self-test suite: {}/{} passed ===", passed, total);
    }
}
