//! Thread control block and the thread-facing public API.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use super::{InterruptContext, InterruptFrame, PRI_DEFAULT};

/// Canary value stamped into every TCB and checked at schedule time.
/// A mismatch means something corrupted kernel memory near a thread's
/// bookkeeping and the kernel halts rather than keep scheduling garbage.
const TCB_MAGIC: u32 = 0xC0FF_EE11;

pub const THREAD_STACK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub usize);

impl ThreadId {
    /// Returned by `spawn` in place of a real id when the page allocator
    /// backing kernel stacks can't supply one. Conceptually pintos's
    /// `TID_ERROR`: a recoverable condition, not a panic, because callers
    /// already have to check the return value of a spawn.
    pub const ERROR: ThreadId = ThreadId(usize::MAX);
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    Ready,
    Blocked,
    Dying,
}

pub struct Thread {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    pub priority: u8,
    pub stack: Box<[u8]>,
    pub interrupt_context: InterruptContext,
    /// Tick at which a sleeping thread should be woken, set only while
    /// `state == Blocked` via `sleep_until`.
    pub wakeup_tick: Option<u64>,
    pub idle_ticks: u64,
    pub kernel_ticks: u64,
    magic: u32,
}

impl Thread {
    /// Allocate a fresh kernel stack and arrange for the thread to begin
    /// execution at [`super::thread_trampoline`], which in turn calls
    /// `entry_point(aux)` and then `exit()` on return.
    ///
    /// The trampoline address goes in `iret_frame.rip`; `entry_point` and
    /// `aux` are smuggled in via `rdi`/`rsi` in the saved context, since
    /// the System V calling convention passes a function's first two
    /// integer arguments in those registers and the context-switch
    /// trampoline restores every general-purpose register from here
    /// before `iretq` transfers control.
    pub fn new(
        id: ThreadId,
        name: &str,
        entry_point: fn(usize),
        priority: u8,
        aux: usize,
    ) -> Option<Self> {
        let mut stack = alloc::vec![0u8; THREAD_STACK_SIZE].into_boxed_slice();
        let stack_top = stack.as_mut_ptr() as u64 + THREAD_STACK_SIZE as u64;

        let mut interrupt_context = InterruptContext {
            rdi: entry_point as usize as u64,
            rsi: aux as u64,
            ..InterruptContext::default()
        };
        interrupt_context.iret_frame = InterruptFrame {
            rip: super::thread_trampoline as u64,
            rsp: stack_top,
            // Interrupts start disabled; the trampoline enables them
            // itself, matching the new-thread contract.
            rflags: 0x002,
            ..InterruptFrame::default()
        };

        Some(Thread {
            id,
            name: String::from(name),
            state: ThreadState::Ready,
            priority,
            stack,
            interrupt_context,
            wakeup_tick: None,
            idle_ticks: 0,
            kernel_ticks: 0,
            magic: TCB_MAGIC,
        })
    }

    /// Reinterpret the stack the kernel is already running on as a TCB for
    /// the bootstrap thread. No fresh stack is allocated; `interrupt_context`
    /// is left default since this thread is never entered via the timer
    /// trampoline's `iretq` path the first time around, it's already running.
    pub fn from_running(id: ThreadId, name: &str, priority: u8) -> Self {
        Thread {
            id,
            name: String::from(name),
            state: ThreadState::Running,
            priority,
            stack: alloc::vec![].into_boxed_slice(),
            interrupt_context: InterruptContext::default(),
            wakeup_tick: None,
            idle_ticks: 0,
            kernel_ticks: 0,
            magic: TCB_MAGIC,
        }
    }

    pub fn is_sane(&self) -> bool {
        self.magic == TCB_MAGIC
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("priority", &self.priority)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ThreadStats {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    pub priority: u8,
}

/// Namespace for the thread-facing API, matching the teacher's
/// `ThreadManager` organizational pattern: a zero-sized type whose
/// associated functions are the public surface, rather than free
/// functions scattered across the module.
pub struct ThreadManager;

impl ThreadManager {
    /// Spawn a new kernel thread at `PRI_DEFAULT` and make it ready.
    /// Returns `ThreadId::ERROR` if no stack could be allocated.
    pub fn spawn(entry_point: fn(usize), name: &str, aux: usize) -> ThreadId {
        super::spawn_thread(entry_point, name, PRI_DEFAULT, aux)
    }

    /// Spawn a new kernel thread at an explicit priority, matching the
    /// full public surface: `spawn(name, priority, fn, aux)`.
    pub fn spawn_with_priority(
        entry_point: fn(usize),
        name: &str,
        priority: u8,
        aux: usize,
    ) -> ThreadId {
        super::spawn_thread(entry_point, name, priority, aux)
    }

    pub fn current_id() -> ThreadId {
        super::current_thread_id()
    }

    /// Validated snapshot of the current thread's control block; halts the
    /// kernel if its integrity cookie doesn't check out.
    pub fn current() -> ThreadStats {
        super::current()
    }

    /// Stable integer id of the current thread, as an untyped `int`.
    pub fn tid() -> usize {
        super::current_thread_id().0
    }

    /// Printable name of the current thread.
    pub fn name() -> String {
        super::current_thread_name()
    }

    pub fn exit(code: i32) -> ! {
        super::exit_current(code)
    }

    pub fn foreach<F: FnMut(&Thread)>(f: F) {
        super::foreach_thread(f);
    }

    pub fn stats() -> Vec<ThreadStats> {
        super::thread_stats()
    }

    /// Whether the scheduler is running in simplified-MLFQS mode.
    pub fn mlfqs_enabled() -> bool {
        super::mlfqs_enabled()
    }
}
