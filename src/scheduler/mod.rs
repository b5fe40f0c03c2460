/*
 * Priority Scheduler & Synchronization Core
 *
 * A single-CPU, preemptive, priority-based thread scheduler: a bucketed
 * ready queue over PRI_MIN..=PRI_MAX, timer-driven preemption on a fixed
 * round-robin quantum plus anti-starvation aging, a tick-keyed sleep/wake
 * facility, and a priority-aware synchronization layer built on top
 * (`sync::{Semaphore, Lock, CondVar}`).
 *
 * CONTEXT SWITCH MECHANISM:
 * =========================
 *
 * This module does not invent its own stack-switching primitive. Every
 * transition — voluntary yield, block, sleep, exit, and timer preemption —
 * funnels through the same interrupt-return path: the calling code updates
 * the current thread's state under `without_interrupts`, then triggers
 * `int 0x81` (or is already inside the hardware timer ISR). Either way
 * control lands in `reschedule()`, which picks the next thread and hands
 * its saved `InterruptContext` back to the naked trampoline for `iretq`.
 * The scheduler only ever decides *which* context to restore.
 *
 * CONCURRENCY MODEL:
 * ==================
 *
 * Uniprocessor. All scheduler state is protected by disabling interrupts
 * for the duration of the mutation, never by a spinlock that could be
 * preempted mid-acquisition on the same core (see `arch::x86_64::interrupts`).
 */

use alloc::vec::Vec;
use core::{
    arch::asm,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use spin::Mutex;

use crate::arch::x86_64::interrupts::{self, without_interrupts};

pub mod ready_queue;
pub mod sleep_list;
pub mod sync;
pub mod thread;

use ready_queue::ReadyQueue;
use sleep_list::SleepList;

pub use thread::{Thread, ThreadId, ThreadManager, ThreadState, ThreadStats};

/// Lowest valid priority.
pub const PRI_MIN: u8 = 0;
/// Priority assigned to threads that don't request one explicitly.
pub const PRI_DEFAULT: u8 = 31;
/// Highest valid priority; also the aging pass's promotion ceiling.
pub const PRI_MAX: u8 = 63;

/// Round-robin quantum, in ticks, between forced preemptions of the
/// current thread.
pub const TIME_SLICE: u32 = 4;
/// How often (in ticks) the aging pass promotes every ready thread by one.
pub const AGING_PERIOD: u32 = 4;

static NEXT_THREAD_ID: AtomicUsize = AtomicUsize::new(1);
static CURRENT_THREAD_ID: AtomicUsize = AtomicUsize::new(0);
static IDLE_THREAD_ID: AtomicUsize = AtomicUsize::new(0);

static SCHEDULER_ENABLED: AtomicBool = AtomicBool::new(false);
static MLFQS_ENABLED: AtomicBool = AtomicBool::new(false);

static SCHEDULER: Mutex<Option<Scheduler>> = Mutex::new(None);

/// Interrupt frame the CPU pushes automatically on any interrupt/exception.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptFrame {
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

impl Default for InterruptFrame {
    fn default() -> Self {
        Self {
            rip: 0,
            cs: 0x08,
            rflags: 0x202, // IF=1, reserved bit 1 always set
            rsp: 0,
            ss: 0x10,
        }
    }
}

/// Full saved CPU context for a thread: general-purpose registers plus
/// the CPU-pushed interrupt frame. The naked trampolines push/pop exactly
/// this layout around a switch.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InterruptContext {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub iret_frame: InterruptFrame,
}

impl Default for InterruptContext {
    fn default() -> Self {
        Self {
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            r11: 0,
            r10: 0,
            r9: 0,
            r8: 0,
            rbp: 0,
            rdi: 0,
            rsi: 0,
            rdx: 0,
            rcx: 0,
            rbx: 0,
            rax: 0,
            iret_frame: InterruptFrame::default(),
        }
    }
}

/// The scheduler's own state: every registered thread, the ready queue,
/// the sleep list, and the two tick-driven counters. Threads are looked
/// up by linear scan — acceptable for a kernel with a small thread count;
/// a busier system would index by `ThreadId`.
struct Scheduler {
    threads: Vec<Thread>,
    ready_queue: ReadyQueue,
    sleep_list: SleepList,
    aging_counter: u32,
    time_slice_counter: u32,
}

impl Scheduler {
    fn thread_mut(&mut self, tid: ThreadId) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == tid)
    }

    fn thread_ref(&self, tid: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == tid)
    }

    /// Promote every thread not currently holding the CPU by one priority
    /// level, clamped at `PRI_MAX`. Ready threads are walked high-to-low so
    /// one bumped into the bucket above isn't revisited within the same
    /// pass; blocked threads (asleep, or parked on a semaphore/lock/condvar)
    /// have no bucket to move but get the same +1 credit, since they're
    /// just as CPU-idle as a thread sitting in the ready queue.
    ///
    /// Crediting blocked time is what makes simplified-MLFQS mode actually
    /// favor I/O-bound threads over CPU-bound ones: a thread that spends
    /// most of its life blocked waiting on something ages every period it's
    /// blocked, while a hog that never yields only ages in the brief gaps
    /// it spends in the ready queue. Excluding ready-only threads from this
    /// credit was the bug — it let a CPU hog that's occasionally ready
    /// out-age a thread that's almost always asleep.
    fn run_aging_pass(&mut self) {
        for pri in (PRI_MIN..PRI_MAX).rev() {
            if self.ready_queue.bucket_mut(pri).is_empty() {
                continue;
            }
            let ids: Vec<ThreadId> = self.ready_queue.bucket_mut(pri).drain(..).collect();
            self.ready_queue.clear_bit_if_empty(pri);
            for tid in ids {
                let new_pri = pri + 1;
                if let Some(t) = self.thread_mut(tid) {
                    t.priority = new_pri;
                }
                self.ready_queue.enqueue(tid, new_pri);
            }
        }

        let current = ThreadId(CURRENT_THREAD_ID.load(Ordering::SeqCst));
        let idle = ThreadId(IDLE_THREAD_ID.load(Ordering::SeqCst));
        for t in self.threads.iter_mut() {
            if t.state == ThreadState::Blocked && t.id != current && t.id != idle {
                t.priority = (t.priority + 1).min(PRI_MAX);
            }
        }
    }
}

/// Reinterpret the thread already running (the boot thread) as "main",
/// at `PRI_DEFAULT`, tid 1. Must run once, early, with interrupts already
/// disabled.
///
/// `mlfqs` selects the scheduling policy for the life of this boot: when
/// true, aging is the sole priority-mutation mechanism and `set_priority`
/// becomes advisory.
pub fn init(mlfqs: bool) {
    log::info!("scheduler: initializing core (mlfqs={})", mlfqs);
    MLFQS_ENABLED.store(mlfqs, Ordering::SeqCst);

    let main = Thread::from_running(ThreadId(1), "main", PRI_DEFAULT);

    *SCHEDULER.lock() = Some(Scheduler {
        threads: alloc::vec![main],
        ready_queue: ReadyQueue::new(),
        sleep_list: SleepList::new(),
        aging_counter: 0,
        time_slice_counter: 0,
    });

    NEXT_THREAD_ID.store(2, Ordering::SeqCst);
    CURRENT_THREAD_ID.store(1, Ordering::SeqCst);

    log::info!("scheduler: boot thread reinterpreted as 'main' (tid 1)");
}

/// Spawn the idle thread and enable preemptive multitasking.
///
/// The original this core is modeled on hands the idle thread a private
/// semaphore so `start()` can wait until idle has captured its own TCB
/// pointer before returning — necessary there because a thread's record
/// lives on its own stack page. Here every `Thread` lives in the
/// scheduler's own registry, fully constructed before `spawn_thread`
/// returns its id, so that handshake has nothing left to guard against;
/// it's dropped (see DESIGN.md).
pub fn start() {
    let idle_id = spawn_thread(idle_thread_main, "idle", PRI_MIN, 0);
    IDLE_THREAD_ID.store(idle_id.0, Ordering::SeqCst);
    log::info!("scheduler: idle thread spawned as {}", idle_id);

    SCHEDULER_ENABLED.store(true, Ordering::SeqCst);
    interrupts::enable();

    log::info!("scheduler: started, preemptive multitasking active");
}

/// Every new thread's saved context points `rip` here rather than directly
/// at its entry function (see `Thread::new`). Runs in thread context for
/// the first time via the context-switch trampoline's `iretq`, with
/// `entry` and `aux` already sitting in `rdi`/`rsi` from the saved context.
extern "C" fn thread_trampoline(entry: usize, aux: usize) -> ! {
    interrupts::enable();
    let entry: fn(usize) = unsafe { core::mem::transmute(entry) };
    entry(aux);
    exit_current(0)
}

fn idle_thread_main(_aux: usize) {
    log::debug!("idle thread running");
    loop {
        without_interrupts(|| {
            let tid = current_thread_id();
            if let Some(mut guard) = SCHEDULER.try_lock() {
                if let Some(sched) = guard.as_mut() {
                    if let Some(t) = sched.thread_mut(tid) {
                        t.state = ThreadState::Blocked;
                    }
                }
            }
        });
        trigger_reschedule();
        x86_64::instructions::hlt();
    }
}

/// Create a new ready thread at `priority`, which will call `entry_point(aux)`
/// once scheduled in. Preempts the caller before returning if `priority`
/// outranks it. Returns `ThreadId::ERROR` if the kernel heap can't supply a
/// stack.
pub fn spawn_thread(entry_point: fn(usize), name: &str, priority: u8, aux: usize) -> ThreadId {
    assert!(priority <= PRI_MAX, "spawn_thread: priority out of range");

    let tid = ThreadId(NEXT_THREAD_ID.fetch_add(1, Ordering::SeqCst));

    let thread = match Thread::new(tid, name, entry_point, priority, aux) {
        Some(t) => t,
        None => {
            log::warn!("spawn_thread: no stack available for '{}'", name);
            return ThreadId::ERROR;
        }
    };

    without_interrupts(|| {
        let mut guard = SCHEDULER.lock();
        let sched = guard.as_mut().expect("scheduler not initialized");
        sched.threads.push(thread);
        sched.ready_queue.enqueue(tid, priority);
    });

    log::debug!("spawned thread {} '{}' at priority {}", tid, name, priority);

    if SCHEDULER_ENABLED.load(Ordering::SeqCst) {
        maybe_preempt(tid);
    }

    tid
}

/// Id of the currently running thread.
pub fn current_thread_id() -> ThreadId {
    ThreadId(CURRENT_THREAD_ID.load(Ordering::SeqCst))
}

/// True while executing inside the timer interrupt's scheduler-visible
/// work. Blocking operations (`Semaphore::down`, `Lock::acquire`,
/// `CondVar::wait`) assert this is false.
pub fn in_interrupt_context() -> bool {
    interrupts::in_interrupt()
}

/// Whether the scheduler has completed `start()` and preemptive
/// multitasking is active. Used by ambient infrastructure (e.g. the
/// buffered logger) that wants to behave differently before the idle
/// thread exists to drain background work.
pub fn is_scheduler_enabled() -> bool {
    SCHEDULER_ENABLED.load(Ordering::SeqCst)
}

/// Whether the scheduler is running in simplified-MLFQS mode.
pub fn mlfqs_enabled() -> bool {
    MLFQS_ENABLED.load(Ordering::SeqCst)
}

/// Look up `tid` in an already-locked scheduler and check its integrity
/// cookie before handing back the reference, the same validation
/// `reschedule()` performs on every scheduler entry: a corrupted TCB halts
/// here instead of silently handing back a garbage name or priority.
fn validated_thread_ref(sched: &Scheduler, tid: ThreadId) -> &Thread {
    let t = sched
        .thread_ref(tid)
        .unwrap_or_else(|| panic!("scheduler: thread {} missing from registry", tid));
    if !t.is_sane() {
        log::error!("thread {} control block corrupted, halting (current())", tid);
        panic!("scheduler: current thread control block integrity check failed");
    }
    t
}

/// Validated snapshot of the currently running thread's control block:
/// the integrity cookie is checked here, the same as `reschedule()`
/// already checks it on every scheduler entry.
pub fn current() -> ThreadStats {
    let tid = current_thread_id();
    let guard = SCHEDULER.lock();
    let sched = guard.as_ref().expect("scheduler not initialized");
    let t = validated_thread_ref(sched, tid);
    ThreadStats {
        id: t.id,
        name: t.name.clone(),
        state: t.state,
        priority: t.priority,
    }
}

/// Name of the currently running thread.
pub fn current_thread_name() -> alloc::string::String {
    let tid = current_thread_id();
    let guard = SCHEDULER.lock();
    let sched = guard.as_ref().expect("scheduler not initialized");
    validated_thread_ref(sched, tid).name.clone()
}

/// Live priority of any registered thread, including ones currently
/// blocked or sleeping. Used by the sync layer's sort-on-release.
///
/// Unlike `current()`/`current_thread_name()`/`get_priority()`, this does
/// not assert `is_sane()`: callers pass in arbitrary waiter ids pulled from
/// a wait list, not "the" current thread, and a thread that has already
/// exited and been reaped is an expected case here (hence the `PRI_MIN`
/// fallback), not a corruption.
pub fn priority_of(tid: ThreadId) -> u8 {
    SCHEDULER
        .lock()
        .as_ref()
        .and_then(|s| s.thread_ref(tid))
        .map(|t| t.priority)
        .unwrap_or(PRI_MIN)
}

/// Park the current thread. The caller is responsible for having already
/// placed it in whatever wait container will eventually call `unblock`.
///
/// # Panics
/// If called from interrupt context or for the idle thread.
pub fn block_current() {
    assert!(
        !in_interrupt_context(),
        "block_current called from interrupt context"
    );
    let tid = current_thread_id();
    assert!(
        tid.0 != IDLE_THREAD_ID.load(Ordering::SeqCst) || IDLE_THREAD_ID.load(Ordering::SeqCst) == 0,
        "idle thread cannot block_current directly"
    );

    without_interrupts(|| {
        let mut guard = SCHEDULER.lock();
        if let Some(sched) = guard.as_mut() {
            if let Some(t) = sched.thread_mut(tid) {
                t.state = ThreadState::Blocked;
            }
        }
    });

    trigger_reschedule();
}

/// Move a blocked thread to ready. Does not itself preempt — callers that
/// need immediate preemption follow up with `maybe_preempt`.
pub fn unblock(tid: ThreadId) {
    without_interrupts(|| {
        let mut guard = SCHEDULER.lock();
        let sched = match guard.as_mut() {
            Some(s) => s,
            None => return,
        };
        if let Some(t) = sched.thread_mut(tid) {
            if t.state == ThreadState::Blocked {
                t.state = ThreadState::Ready;
                let pri = t.priority;
                sched.ready_queue.enqueue(tid, pri);
                log::debug!("unblocked thread {} at priority {}", tid, pri);
            }
        }
    });
}

/// If `tid` now outranks the current thread, yield to it immediately —
/// or, from interrupt context, request a yield at end-of-interrupt.
pub fn maybe_preempt(tid: ThreadId) {
    let woken_pri = priority_of(tid);
    let current_pri = get_priority();
    if woken_pri > current_pri {
        if in_interrupt_context() {
            interrupts::yield_on_return();
        } else {
            yield_now();
        }
    }
}

/// Give up the CPU voluntarily. Re-enqueues the current thread (unless
/// it's idle) at its current priority and reschedules.
pub fn yield_now() {
    if !SCHEDULER_ENABLED.load(Ordering::SeqCst) {
        return;
    }
    if !interrupts::are_enabled() {
        return;
    }
    trigger_reschedule();
}

/// Block the current thread until `wake_at_tick` has passed.
///
/// # Panics
/// If called by the idle thread.
pub fn sleep_until(wake_at_tick: u64) {
    let tid = current_thread_id();
    assert!(
        tid.0 != IDLE_THREAD_ID.load(Ordering::SeqCst),
        "idle thread cannot sleep"
    );

    without_interrupts(|| {
        let mut guard = SCHEDULER.lock();
        let sched = guard.as_mut().expect("scheduler not initialized");
        if let Some(t) = sched.thread_mut(tid) {
            t.state = ThreadState::Blocked;
            t.wakeup_tick = Some(wake_at_tick);
        }
        sched.sleep_list.push(tid, wake_at_tick);
    });

    trigger_reschedule();
}

/// Mark the current thread as dying and never return. Its TCB is reaped
/// the next time `reschedule()` switches away from it.
pub fn exit_current(code: i32) -> ! {
    let tid = current_thread_id();
    log::info!("thread {} exiting (code {})", tid, code);

    without_interrupts(|| {
        let mut guard = SCHEDULER.lock();
        if let Some(sched) = guard.as_mut() {
            if let Some(t) = sched.thread_mut(tid) {
                t.state = ThreadState::Dying;
            }
        }
    });

    trigger_reschedule();
    unreachable!("scheduler: exited thread {} resumed", tid);
}

/// Set the current thread's priority. In MLFQS mode this is advisory —
/// it still succeeds but has no scheduling effect, since aging is the
/// sole priority-mutation mechanism there. Otherwise, yields immediately
/// if lowering the priority exposes a strictly higher-priority ready
/// thread.
pub fn set_priority(new_priority: u8) {
    assert!(new_priority <= PRI_MAX, "set_priority: out of range");

    if MLFQS_ENABLED.load(Ordering::SeqCst) {
        log::debug!(
            "set_priority({}) ignored: mlfqs mode owns priority",
            new_priority
        );
        return;
    }

    let tid = current_thread_id();
    let should_yield = without_interrupts(|| {
        let mut guard = SCHEDULER.lock();
        let sched = guard.as_mut().expect("scheduler not initialized");
        let old = sched.thread_ref(tid).map(|t| t.priority).unwrap_or(PRI_DEFAULT);
        if let Some(t) = sched.thread_mut(tid) {
            t.priority = new_priority;
        }
        new_priority < old
            && sched
                .ready_queue
                .highest_nonempty()
                .is_some_and(|p| p as u8 > new_priority)
    });

    log::debug!("thread {} set_priority -> {}", tid, new_priority);

    if should_yield {
        yield_now();
    }
}

/// Current thread's live priority. Goes through the same `is_sane()`
/// validation as `current()`, without paying for the name clone `current()`
/// returns — this is called on every `maybe_preempt`, a hot path.
pub fn get_priority() -> u8 {
    let tid = current_thread_id();
    let guard = SCHEDULER.lock();
    let sched = guard.as_ref().expect("scheduler not initialized");
    validated_thread_ref(sched, tid).priority
}

/// Neutral MLFQS stub: accepts any value, has no effect. The full BSD
/// nice/recent_cpu/load_avg model is out of scope for this core.
pub fn set_nice(_nice: i32) {}

/// Neutral MLFQS stub: always 0.
pub fn get_nice() -> i32 {
    0
}

/// Neutral MLFQS stub: always 0.
pub fn get_load_avg() -> i32 {
    0
}

/// Neutral MLFQS stub: always 0.
pub fn get_recent_cpu() -> i32 {
    0
}

/// Apply `f` to every registered thread. Requires interrupts disabled,
/// matching the original's assertion (this walks scheduler-internal
/// state without taking a copy).
pub fn foreach_thread<F: FnMut(&Thread)>(mut f: F) {
    assert!(
        !crate::arch::x86_64::interrupts::are_enabled(),
        "foreach_thread requires interrupts disabled"
    );
    if let Some(sched) = SCHEDULER.lock().as_ref() {
        for t in &sched.threads {
            f(t);
        }
    }
}

/// Snapshot of every registered thread, for diagnostics.
pub fn thread_stats() -> Vec<ThreadStats> {
    let guard = SCHEDULER.lock();
    let sched = match guard.as_ref() {
        Some(s) => s,
        None => return Vec::new(),
    };
    sched
        .threads
        .iter()
        .map(|t| ThreadStats {
            id: t.id,
            name: t.name.clone(),
            state: t.state,
            priority: t.priority,
        })
        .collect()
}

/// Unblock every thread whose sleep deadline has passed. Called by the
/// tick source before `tick()`.
pub fn wake(now: u64) {
    without_interrupts(|| {
        let mut guard = SCHEDULER.lock();
        let sched = match guard.as_mut() {
            Some(s) => s,
            None => return,
        };
        let woken = sched.sleep_list.wake(now);
        for tid in woken {
            if let Some(t) = sched.thread_mut(tid) {
                t.wakeup_tick = None;
                if t.state == ThreadState::Blocked {
                    t.state = ThreadState::Ready;
                    let pri = t.priority;
                    sched.ready_queue.enqueue(tid, pri);
                }
            }
        }
    });
}

/// Called once per timer tick. Accounts idle/kernel time, runs the aging
/// pass every `AGING_PERIOD` ticks, and requests a reschedule once every
/// `TIME_SLICE` ticks.
pub fn tick() {
    without_interrupts(|| {
        let mut guard = SCHEDULER.lock();
        let sched = match guard.as_mut() {
            Some(s) => s,
            None => return,
        };

        let current_id = ThreadId(CURRENT_THREAD_ID.load(Ordering::SeqCst));
        let idle_id = ThreadId(IDLE_THREAD_ID.load(Ordering::SeqCst));
        if let Some(t) = sched.thread_mut(current_id) {
            if current_id == idle_id {
                t.idle_ticks = t.idle_ticks.wrapping_add(1);
            } else {
                t.kernel_ticks = t.kernel_ticks.wrapping_add(1);
            }
        }

        sched.aging_counter += 1;
        if sched.aging_counter >= AGING_PERIOD {
            sched.aging_counter = 0;
            sched.run_aging_pass();
        }

        sched.time_slice_counter += 1;
        if sched.time_slice_counter >= TIME_SLICE {
            interrupts::yield_on_return();
        }
    });
}

fn trigger_reschedule() {
    unsafe {
        asm!("int 0x81", options(nostack));
    }
}

/// Pick the next thread to run and hand back its saved context. Shared by
/// both the timer and the voluntary-yield trampolines; neither path
/// re-enters this while already holding `SCHEDULER`.
fn reschedule(current_ctx_ptr: *const InterruptContext) -> *const InterruptContext {
    let mut guard = SCHEDULER.lock();
    let sched = match guard.as_mut() {
        Some(s) => s,
        None => return current_ctx_ptr,
    };

    let current_id = ThreadId(CURRENT_THREAD_ID.load(Ordering::SeqCst));
    let idle_id = ThreadId(IDLE_THREAD_ID.load(Ordering::SeqCst));
    let mut dying_tid = None;

    if let Some(idx) = sched.threads.iter().position(|t| t.id == current_id) {
        if !sched.threads[idx].is_sane() {
            log::error!("thread {} control block corrupted, halting", current_id);
            panic!("scheduler: thread control block integrity check failed");
        }

        unsafe {
            sched.threads[idx].interrupt_context = *current_ctx_ptr;
        }

        let state = sched.threads[idx].state;
        let priority = sched.threads[idx].priority;
        match state {
            ThreadState::Running if current_id != idle_id => {
                sched.threads[idx].state = ThreadState::Ready;
                sched.ready_queue.enqueue(current_id, priority);
            }
            ThreadState::Dying => dying_tid = Some(current_id),
            _ => {}
        }
    }

    // Reap before looking up the next thread: removing an element shifts
    // the registry, which would invalidate a context pointer taken first.
    if let Some(tid) = dying_tid {
        if let Some(idx) = sched.threads.iter().position(|t| t.id == tid) {
            let dead = sched.threads.remove(idx);
            log::debug!("reaped thread {} ('{}')", dead.id, dead.name);
        }
    }

    let next_id = sched.ready_queue.dequeue_highest().unwrap_or(idle_id);

    let next_idx = match sched.threads.iter().position(|t| t.id == next_id) {
        Some(idx) => idx,
        None => {
            log::error!("scheduler: next thread {} missing from registry", next_id);
            return current_ctx_ptr;
        }
    };
    sched.threads[next_idx].state = ThreadState::Running;
    let next_ctx_ptr = &sched.threads[next_idx].interrupt_context as *const InterruptContext;

    CURRENT_THREAD_ID.store(next_id.0, Ordering::SeqCst);
    sched.time_slice_counter = 0;

    next_ctx_ptr
}

/// Rust-side handler for the hardware timer IRQ. Drives the external
/// tick source contract (`wake` then `tick`), then reschedules only if
/// `tick()` requested it.
#[unsafe(no_mangle)]
pub extern "C" fn schedule_from_timer_interrupt(
    current_ctx_ptr: *const InterruptContext,
) -> *const InterruptContext {
    interrupts::set_in_interrupt(true);
    crate::utils::timer::on_timer_interrupt();
    interrupts::set_in_interrupt(false);

    if !SCHEDULER_ENABLED.load(Ordering::SeqCst) {
        return current_ctx_ptr;
    }
    if !interrupts::take_yield_on_return() {
        return current_ctx_ptr;
    }
    reschedule(current_ctx_ptr)
}

/// Rust-side handler for the voluntary-yield software interrupt
/// (`INT 0x81`). Always reschedules — the caller already arranged the
/// current thread's state (Ready/Blocked/Dying) before triggering it.
#[unsafe(no_mangle)]
pub extern "C" fn schedule_from_yield_interrupt(
    current_ctx_ptr: *const InterruptContext,
) -> *const InterruptContext {
    if !SCHEDULER_ENABLED.load(Ordering::SeqCst) {
        return current_ctx_ptr;
    }
    reschedule(current_ctx_ptr)
}

/// Preemptive timer interrupt entry point (naked asm wrapper).
///
/// Pushes a complete `InterruptContext` on top of the CPU-pushed
/// `InterruptFrame`, calls `schedule_from_timer_interrupt`, then restores
/// whichever context it returns (possibly a different thread's) before
/// sending EOI and returning via `iretq`.
#[unsafe(naked)]
pub unsafe extern "C" fn preemptive_timer_interrupt_handler() {
    core::arch::naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",

        "mov rdi, rsp",
        "call {schedule_fn}",
        "mov rsp, rax",

        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",

        // EOI to master PIC before returning.
        "push rax",
        "mov al, 0x20",
        "out 0x20, al",
        "pop rax",

        "iretq",

        schedule_fn = sym schedule_from_timer_interrupt,
    )
}

/// Voluntary-yield entry point (`INT 0x81`, naked asm wrapper). Identical
/// to the timer handler except no EOI (software interrupts don't go
/// through the PIC) and it always reschedules.
#[unsafe(naked)]
pub unsafe extern "C" fn yield_interrupt_handler() {
    core::arch::naked_asm!(
        "push rax",
        "push rbx",
        "push rcx",
        "push rdx",
        "push rsi",
        "push rdi",
        "push rbp",
        "push r8",
        "push r9",
        "push r10",
        "push r11",
        "push r12",
        "push r13",
        "push r14",
        "push r15",

        "mov rdi, rsp",
        "call {schedule_fn}",
        "mov rsp, rax",

        "pop r15",
        "pop r14",
        "pop r13",
        "pop r12",
        "pop r11",
        "pop r10",
        "pop r9",
        "pop r8",
        "pop rbp",
        "pop rdi",
        "pop rsi",
        "pop rdx",
        "pop rcx",
        "pop rbx",
        "pop rax",

        "iretq",

        schedule_fn = sym schedule_from_yield_interrupt,
    )
}
