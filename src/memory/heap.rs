/*
 * Kernel Heap Allocator
 *
 * This module provides dynamic memory allocation for the kernel using a heap.
 * It builds on top of the linked_list_allocator crate which provides a simple
 * but functional heap implementation suitable for kernel use.
 *
 * DESIGN OVERVIEW:
 * - Fixed-size heap region backed by a static byte array (no page-frame
 *   allocator or paging dependency: this subsystem's only consumer of
 *   the heap is per-thread kernel stacks, and those don't need their own
 *   virtual mapping).
 * - Thread-safe allocation via LockedHeap (uses spin mutex internally)
 * - Supports standard Rust allocation APIs (Box, Vec, etc.)
 *
 * ERROR HANDLING:
 * - Allocation failures trigger kernel panic (alloc_error_handler)
 * - This is appropriate for kernel code where OOM is typically fatal
 */

use linked_list_allocator::LockedHeap;

/// Size of the kernel heap in bytes (8 MiB).
/// Each thread needs a 64 KiB stack, so 8 MiB supports ~128 concurrently
/// live threads plus other kernel data structures.
pub const HEAP_SIZE: usize = 8 * 1024 * 1024;

/// Backing storage for the heap. Static rather than page-allocator-backed:
/// see module docs.
static mut HEAP_MEM: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

/// Global allocator instance used by Rust's allocation APIs
/// The #[global_allocator] attribute makes this the default allocator
/// for Box, Vec, HashMap, and other heap-allocated types
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Initialize the kernel heap over the static backing array.
///
/// # Safety
/// This function must be called exactly once during kernel initialization,
/// before any other module performs a heap allocation.
pub fn init() -> Result<(), &'static str> {
    log::info!("Initializing kernel heap ({} KiB)...", HEAP_SIZE / 1024);

    unsafe {
        let base = core::ptr::addr_of_mut!(HEAP_MEM) as *mut u8;
        ALLOCATOR.lock().init(base, HEAP_SIZE);
    }

    log::info!("Kernel heap initialized successfully");
    Ok(())
}

/// Allocation error handler (required when using a global allocator in no_std)
///
/// Allocation failure is fatal here: a kernel has no user space to return
/// an error to, so it panics with details about the failed allocation.
#[alloc_error_handler]
fn alloc_error(layout: core::alloc::Layout) -> ! {
    panic!("Kernel heap allocation failed: {:?}", layout);
}
