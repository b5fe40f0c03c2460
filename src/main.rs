/*
 * CLUU Microkernel Main Entry Point
 *
 * This is the main entry point for the CLUU microkernel, a bare-metal Rust kernel
 * designed to work with the BOOTBOOT bootloader protocol. It handles the critical
 * early boot process and kernel initialization.
 *
 * Why this is important:
 * - Provides the entry point that BOOTBOOT calls when loading the kernel
 * - Handles multi-core boot process (BSP vs AP core management)
 * - Sets up proper kernel stack before entering Rust code
 * - Implements panic handling for kernel-level errors
 * - Coordinates the overall kernel initialization sequence
 *
 * Key features:
 * - Multi-core aware boot process
 * - Proper stack management for kernel execution
 * - Integration with BOOTBOOT protocol
 * - Safe transition from assembly to Rust code
 * - Brings up the preemptive priority scheduler and runs its self-tests
 */

#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]
#![feature(alloc_error_handler)]
#![allow(dead_code)]

extern crate alloc;

use core::panic::PanicInfo;

mod arch;
mod drivers;
mod io;
mod memory;
mod scheduler;
mod tests;
mod utils;

/// Boot in simplified-MLFQS mode when built with `--features mlfqs`, where
/// aging is the only thing that ever changes a thread's priority and
/// `set_priority` becomes advisory. Mirrors Pintos's `-mlfqs` command-line
/// flag; there is no command-line parsing subsystem in scope here, so a
/// build-time feature is the static equivalent.
const MLFQS_ENABLED: bool = cfg!(feature = "mlfqs");

#[repr(C, align(16))]
pub struct AlignedBspStack([u8; 64 * 1024]);

#[unsafe(no_mangle)]
pub static mut BSP_STACK: AlignedBspStack = AlignedBspStack([0; 64 * 1024]);

/// ===============================
///  EARLY ENTRY POINT (_start)
/// ===============================
///
/// Called directly by BOOTBOOT loader on ALL CORES.
/// Required to:
///   - Identify BSP using bootboot.bspid
///   - Switch to our own 64 KiB kernel stack
///   - Call into Rust's `kstart`
///   - Park APs
///
#[unsafe(naked)]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn _start() -> ! {
    core::arch::naked_asm!(
        // CPUID leaf 1 → EBX[31:24] = APIC ID
        "mov eax, 1",
        "cpuid",
        "shr ebx, 24",                 // EBX now holds core ID

        // Load &bootboot into RAX
        "lea rax, [rip + bootboot]",

        // Read bspid (u16 @ offset 0x0C)
        "movzx ecx, word ptr [rax + 0x0C]",

        // Compare APIC ID vs bspid
        "cmp ebx, ecx",
        "jne 2f",                      // If not BSP → jump to AP section

        // =======================
        //       BSP PATH
        // =======================

        // Switch to our 64 KiB BSP stack
        "lea rax, [rip + BSP_STACK]",
        "add rax, {stack_size}",
        "mov rsp, rax",

        // Jump into real Rust kernel entry
        "jmp kstart",

        // =======================
        //       AP PATH
        // =======================
        "2:",
        "1:",
        "hlt",
        "jmp 1b",

        stack_size = const 64 * 1024,
    );
}

/// Minimal BOOTBOOT info block this build actually relies on: just enough
/// for `_start` to tell the BSP apart from the APs. The rest of the
/// BOOTBOOT protocol (framebuffer, memory map, initrd pointer) belongs to
/// the full kernel's boot path and is out of scope for this subsystem.
#[repr(C)]
struct BootbootHeader {
    _magic: [u8; 4],
    _size: u32,
    _protocol: u8,
    _fb_type: u8,
    _numcores: u16,
    bspid: u16,
}

#[unsafe(no_mangle)]
pub static bootboot: BootbootHeader = BootbootHeader {
    _magic: [0; 4],
    _size: 0,
    _protocol: 0,
    _fb_type: 0,
    _numcores: 1,
    bspid: 0,
};

/// ===============================
///  RUST KERNEL ENTRY POINT
/// ===============================
///
/// Now running on our safe, large BSP stack.
/// APs never run this function.
///
#[unsafe(no_mangle)]
pub extern "C" fn kstart() -> ! {
    // Step 1: Initialize debug infrastructure first
    utils::debug::init_debug_infrastructure();

    // Step 2: Initialize logging system
    utils::debug::logger::init(true);
    log::info!("CLUU Kernel starting...");

    // Step 3: Initialize GDT (Global Descriptor Table)
    arch::x86_64::gdt::init();

    // Step 3.5: Initialize IDT (Interrupt Descriptor Table)
    // CRITICAL: Must be initialized BEFORE memory management (CR3 switch)
    // If any exception/NMI occurs during CR3 switch and IDT isn't set up,
    // the CPU will triple fault
    arch::x86_64::idt::init();

    // Step 4: Initialize memory management (kernel heap)
    log::info!("Initializing memory management...");
    memory::init();

    // Test heap allocation
    {
        use alloc::vec::Vec;
        let mut test_vec = Vec::new();
        test_vec.push(42);
        test_vec.push(1337);
        log::info!("Heap test successful: {:?}", test_vec);
    }

    log::info!("Memory management initialized successfully");

    // Step 5: Initialize system drivers (PIC + PIT, the scheduler's tick
    // source)
    drivers::system::init();

    // Step 6: Initialize the scheduler core, reinterpreting this boot
    // thread as the main kernel thread.
    scheduler::init(MLFQS_ENABLED);

    // Step 7: Start the scheduler: spawns the idle thread, enables
    // interrupts, and makes this boot thread a regular ready-queue
    // participant. The self-test scenarios below need real timer
    // preemption and sleep/wake to exercise, so they run only once this
    // is live.
    scheduler::start();

    // Step 8: Run the self-test scenarios; each spawns its own threads
    // and blocks until they finish, logging pass/fail lines to the
    // serial console.
    tests::comprehensive::run_comprehensive_test_suite();

    log::info!("Kernel initialization complete! Entering idle loop.");

    // Main kernel idle loop. Timer interrupts preempt us and switch to
    // whichever thread the scheduler picks; this loop only runs when
    // nothing else is ready.
    loop {
        x86_64::instructions::hlt();
    }
}

///  PANIC HANDLER
/// ===============================
///
/// Logging may fail early, but this is safe once the logger is up.
///
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    x86_64::instructions::interrupts::disable();

    if let Some(location) = info.location() {
        log::error!(
            "PANIC at {}:{}: {}",
            location.file(),
            location.line(),
            info.message()
        );
    } else {
        log::error!("PANIC: {}", info.message());
    }

    loop {
        x86_64::instructions::hlt();
    }
}
