//! Cortex-M3 architecture port: implements [`os_kernel::Arch`] with a
//! PendSV-driven context switch and exposes a SysTick tick source.
//!
//! Grounded in `r3_port_arm_m::threading::imp`'s `State`/`PortInstance`
//! machinery, adapted two ways: this crate targets one concrete Cortex-M3
//! (no FPU, full Thumb-2, `BASEPRI`-capable) rather than a family of
//! `cfg!`-gated cores, and it binds to a single concrete kernel instance
//! through a runtime-installed dispatch hook instead of `r3_port_arm_m`'s
//! `Traits: PortInstance` generic parameter — this workspace configures
//! one ECU, not a reusable multi-target framework (see `DESIGN.md`). The
//! saved/restored register set and stack layout otherwise follow
//! `r3_port_arm_m`'s non-FPU, non-Armv6-M code path (`strd`/`ldrd`, `stmia`
//! r4-r11) exactly.

#![no_std]

use core::arch::global_asm;
use core::mem::MaybeUninit;
use core::sync::atomic::{compiler_fence, AtomicUsize, Ordering};

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::{Peripherals, SCB};

use os_kernel::arch::{Arch, Stack, StackFrame};

/// Bound once, in `firmware/ecu`'s startup, to a pair of closures over the
/// concrete `'static KERNEL` singleton.
static RUNNING_SP_SLOT_FN: AtomicUsize = AtomicUsize::new(0);
static DISPATCH_SP_SLOT_FN: AtomicUsize = AtomicUsize::new(0);

type SlotFn = extern "C" fn() -> *mut usize;

/// Installs the kernel hooks the PendSV handler calls into. Must be
/// called once, before interrupts are unmasked, with function pointers
/// bound to the concrete `Kernel` instance (typically two tiny
/// `extern "C" fn` shims in `firmware/ecu` that each call a method on the
/// `'static KERNEL`).
pub fn install_dispatch_hooks(running_sp_slot: SlotFn, dispatch_sp_slot: SlotFn) {
    RUNNING_SP_SLOT_FN.store(running_sp_slot as usize, Ordering::Release);
    DISPATCH_SP_SLOT_FN.store(dispatch_sp_slot as usize, Ordering::Release);
}

#[no_mangle]
extern "C" fn os_port_cm3_running_sp_slot() -> *mut usize {
    let f = RUNNING_SP_SLOT_FN.load(Ordering::Acquire);
    if f == 0 {
        return core::ptr::null_mut();
    }
    // SAFETY: only ever set to a valid `SlotFn` by `install_dispatch_hooks`.
    let f: SlotFn = unsafe { core::mem::transmute(f) };
    f()
}

#[no_mangle]
extern "C" fn os_port_cm3_dispatch_sp_slot() -> *mut usize {
    let f = DISPATCH_SP_SLOT_FN.load(Ordering::Acquire);
    if f == 0 {
        return core::ptr::null_mut();
    }
    // SAFETY: only ever set to a valid `SlotFn` by `install_dispatch_hooks`.
    let f: SlotFn = unsafe { core::mem::transmute(f) };
    f()
}

/// The PendSV handler: saves the outgoing task's callee-saved registers
/// below its slot's current value (if there was an outgoing task — there
/// isn't on the very first dispatch), asks the kernel to pick the next
/// task, and restores its registers.
///
/// Register layout per saved frame, lowest address first: `[lr, control,
/// r4, r5, r6, r7, r8, r9, r10, r11]` (10 words) below the hardware
/// exception frame the core already pushed to PSP on entry.
global_asm!(
    ".thumb_func",
    ".global PendSV",
    "PendSV:",
    "    ldr r0, =os_port_cm3_running_sp_slot",
    "    blx r0",
    "    cbz r0, 1f",
    "    mrs r2, psp",
    "    subs r2, r2, #40",
    "    str r2, [r0]",
    "    mrs r3, control",
    "    strd lr, r3, [r2], #8",
    "    stmia r2, {{r4-r11}}",
    "1:",
    "    ldr r0, =os_port_cm3_dispatch_sp_slot",
    "    blx r0",
    "    ldr r2, [r0]",
    "    ldrd lr, r3, [r2], #8",
    "    ldmia r2, {{r4-r11}}",
    "    adds r2, r2, #32",
    "    msr control, r3",
    "    msr psp, r2",
    "    bx lr",
);

/// Converts a linear memory region into an `os_kernel::arch::Stack`
/// descriptor, as `firmware/ecu` does for each task's `static mut`
/// `#[link_section = ".task_stacks"]` array.
pub fn stack_from_slice(buf: &'static mut [MaybeUninit<u8>]) -> Stack {
    Stack {
        base: buf.as_mut_ptr().cast(),
        size: buf.len(),
    }
}

/// `os_kernel::Arch` implementation for this board.
pub struct Cm3Arch;

// SAFETY: `critical_section` masks PRIMASK, excluding every interrupt that
// calls back into the kernel; `init_stack` builds an AAPCS-compatible
// exception frame matching the layout the PendSV handler above expects;
// `start_first_task` is called exactly once from `Kernel::start`, before
// any task has run, matching the precondition the handler's `cbz r0, 1f`
// branch relies on (`running_sp_slot` reads null on the first dispatch).
unsafe impl Arch for Cm3Arch {
    fn critical_section<R>(f: impl FnOnce() -> R) -> R {
        cortex_m::interrupt::free(|_| f())
    }

    fn init_stack(stack: Stack, entry: fn()) -> StackFrame {
        // SAFETY: `stack` describes memory owned exclusively by the task
        // this frame is for; no other code touches it before first run.
        let mut sp = stack.base.wrapping_add(stack.size).cast::<u32>();

        // Hardware-stacked exception frame: r0-r3, r12, lr, pc, xpsr.
        unsafe {
            sp = sp.wrapping_sub(8);
            sp.add(0).write(0); // r0: entry param, unused
            sp.add(1).write(0x01010101); // r1
            sp.add(2).write(0x02020202); // r2
            sp.add(3).write(0x03030303); // r3
            sp.add(4).write(0x12121212); // r12
            sp.add(5).write(task_return_trap as usize as u32); // lr
            sp.add(6).write(entry as usize as u32 & !1); // pc (Thumb)
            sp.add(7).write(0x0100_0000); // xpsr: Thumb bit set
        }

        // Software-saved extra context: lr (EXC_RETURN), control, r4-r11.
        unsafe {
            sp = sp.wrapping_sub(10);
            sp.add(0).write(0xffff_fffd); // EXC_RETURN: thread mode, use PSP
            sp.add(1).write(0x0000_0002); // CONTROL: SPSEL = 1 (PSP)
            for i in 2..10 {
                sp.add(i).write(0);
            }
        }

        StackFrame(sp as usize)
    }

    fn request_switch() {
        compiler_fence(Ordering::Release);
        SCB::set_pendsv();
        cortex_m::asm::dsb();
        compiler_fence(Ordering::Acquire);
    }

    fn start_first_task() -> ! {
        // SAFETY: called once, before the scheduler is live.
        let mut peripherals = unsafe { Peripherals::steal() };
        unsafe {
            peripherals.SCB.set_priority(SystemHandler::PendSV, 0xff);
            peripherals.SCB.set_priority(SystemHandler::SysTick, 0xff);
        }
        SCB::set_pendsv();
        loop {
            cortex_m::asm::wfi();
        }
    }
}

/// A task that returns from its entry function instead of calling
/// `TerminateTask`/`ChainTask` lands here; there is nothing sensible to
/// resume, so this traps rather than falling off into undefined memory.
extern "C" fn task_return_trap() -> ! {
    panic!("task entry point returned without terminating");
}

/// Configures SysTick for a `OS_TICK_HZ` (1 kHz) periodic interrupt.
/// `firmware/ecu`'s `#[exception] fn SysTick()` handler (via
/// `cortex-m-rt`) calls `Kernel::increment_counter` for the tick counter
/// in response; this crate only owns the timer setup, not the kernel
/// call, to keep `os_port_cm3` ignorant of which `CounterId` is bound to
/// the hardware tick.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST, core_clock_hz: u32, tick_hz: u32) {
    syst.set_clock_source(cortex_m::peripheral::syst::SystClkSource::Core);
    syst.set_reload(core_clock_hz / tick_hz - 1);
    syst.clear_current();
    syst.enable_counter();
    syst.enable_interrupt();
}
