//! Host-side `Arch` stand-in, used only behind the `host_test` feature.
//!
//! Grounded in how `r3_port_std` lets the whole `r3_kernel` test suite run
//! off-target: a `spin::Mutex`-guarded critical section stands in for
//! masking real interrupts, and the stack/dispatch primitives are stubbed
//! since these tests exercise scheduler/alarm/event/IOC *data structures*
//! directly rather than actually executing task entry points on a host
//! stack.

use spin::Mutex;

use crate::arch::{Arch, Stack, StackFrame};

static LOCK: Mutex<()> = Mutex::new(());

/// `Arch` impl for `#[test]`s: single-threaded, so the mutex only ever
/// guards against accidental reentrancy bugs in the kernel logic itself.
pub struct HostArch;

// SAFETY: `LOCK` excludes concurrent access from other threads; this
// crate's tests are single-threaded with respect to the kernel under test.
unsafe impl Arch for HostArch {
    fn critical_section<R>(f: impl FnOnce() -> R) -> R {
        let _guard = LOCK.lock();
        f()
    }

    fn init_stack(_stack: Stack, _entry: fn()) -> StackFrame {
        StackFrame(0)
    }

    fn request_switch() {
        // No port-level dispatcher on the host; tests call
        // `Kernel::dispatch` directly to observe scheduling decisions.
    }

    fn start_first_task() -> ! {
        panic!("HostArch::start_first_task is not exercised by host tests")
    }
}
