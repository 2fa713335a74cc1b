//! Scheduler/event/resource/alarm/IOC behavior, run against [`HostArch`].
//!
//! Exercised with `cargo test -p os_kernel --features host_test`, the way
//! `r3_kernel`'s own suite runs against `r3_port_std` rather than real
//! hardware.

#![cfg(feature = "host_test")]

use os_kernel::action::Action;
use os_kernel::alarm::AlarmConfig;
use os_kernel::arch::{Arch, Stack, StackFrame};
use os_kernel::cfg::KernelConfig;
use os_kernel::counter::CounterConfig;
use os_kernel::event::EventMask;
use os_kernel::host::HostArch;
use os_kernel::id::{CounterId, TaskId};
use os_kernel::resource::ResourceConfig;
use os_kernel::task::TaskConfig;
use os_kernel::{DefaultHooks, Kernel, StatusId};

fn noop() {}

fn dummy_stack() -> Stack {
    static mut BUF: [u8; 64] = [0; 64];
    Stack {
        base: unsafe { BUF.as_mut_ptr() },
        size: 64,
    }
}

/// Task index 0 is always `IDLE_TASK` (`os_kernel::id::IDLE_TASK`), so
/// every fixture below reserves it for a non-activatable idle stand-in and
/// puts its real test tasks at index 1 and up, the same layout
/// `firmware/ecu` uses.
const fn idle_task() -> TaskConfig {
    TaskConfig {
        entry: noop,
        stack: Stack { base: core::ptr::null_mut(), size: 0 },
        priority: 0,
        is_extended: false,
        activation_limit: 1,
        autostart: false,
    }
}

fn two_task_config() -> KernelConfig {
    static TASKS: [TaskConfig; 3] = [
        TaskConfig {
            entry: noop,
            stack: Stack { base: core::ptr::null_mut(), size: 0 },
            priority: 0,
            is_extended: false,
            activation_limit: 1,
            autostart: false,
        },
        TaskConfig {
            entry: noop,
            stack: Stack { base: core::ptr::null_mut(), size: 0 },
            priority: 1,
            is_extended: false,
            activation_limit: 1,
            autostart: false,
        },
        TaskConfig {
            entry: noop,
            stack: Stack { base: core::ptr::null_mut(), size: 0 },
            priority: 2,
            is_extended: true,
            activation_limit: 2,
            autostart: false,
        },
    ];
    KernelConfig {
        tasks: &TASKS,
        counters: &[],
        alarms: &[],
        schedule_tables: &[],
        resources: &[],
        ioc_channels: &[],
    }
}

#[test]
fn activate_task_enqueues_and_dispatch_runs_it() {
    let _ = dummy_stack();
    let config: &'static KernelConfig = Box::leak(Box::new(two_task_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    kernel.activate_task(2).unwrap();
    assert_eq!(
        kernel.get_task_state(2).unwrap(),
        os_kernel::task::TaskState::Ready
    );
}

#[test]
fn activation_limit_is_enforced() {
    let config: &'static KernelConfig = Box::leak(Box::new(two_task_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    // Task 1 has activation_limit = 1: a second activation before the
    // first is consumed must be rejected, not silently dropped.
    kernel.activate_task(1).unwrap();
    let err = kernel.activate_task(1).unwrap_err();
    assert_eq!(err, StatusId::Limit);
}

#[test]
fn invalid_task_id_is_rejected() {
    let config: &'static KernelConfig = Box::leak(Box::new(two_task_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    assert_eq!(kernel.activate_task(9).unwrap_err(), StatusId::InvalidId);
}

#[test]
fn activating_idle_task_is_rejected() {
    let config: &'static KernelConfig = Box::leak(Box::new(two_task_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    // Activation must fail when the id designates the idle
    // task (always task index 0, `os_kernel::id::IDLE_TASK`).
    assert_eq!(kernel.activate_task(0).unwrap_err(), StatusId::InvalidState);
}

#[test]
fn event_set_then_clear_round_trips() {
    let config: &'static KernelConfig = Box::leak(Box::new(two_task_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    kernel.set_event(2, EventMask::EV_RX.bits()).unwrap();
    assert_eq!(kernel.get_event(2).unwrap(), EventMask::EV_RX.bits());
    kernel.clear_event(EventMask::EV_RX.bits()).unwrap_err(); // no running task yet
}

#[test]
fn set_event_on_basic_task_is_rejected() {
    let config: &'static KernelConfig = Box::leak(Box::new(two_task_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    let err = kernel.set_event(1, EventMask::EV_RX.bits()).unwrap_err();
    assert_eq!(err, StatusId::InvalidState);
}

/// An extended task blocks in `wait_event` on a bit nobody has set yet,
/// then a `set_event` call (standing in for an ISR) wakes it straight
/// back to `Ready`. Task 2 is promoted to `Running` via `dispatch_sp_slot`
/// the way a port's PendSV handler would after the first dispatch, since
/// `wait_event`/`set_event` both key off `KernelState.running`.
#[test]
fn wait_event_blocks_then_wakes_on_a_matching_set_event() {
    let config: &'static KernelConfig = Box::leak(Box::new(two_task_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    kernel.activate_task(2).unwrap();
    kernel.dispatch_sp_slot();

    kernel.wait_event(EventMask::EV_RX.bits()).unwrap();
    assert_eq!(
        kernel.get_task_state(2).unwrap(),
        os_kernel::task::TaskState::Waiting
    );

    kernel.set_event(2, EventMask::EV_RX.bits()).unwrap();
    assert_eq!(
        kernel.get_task_state(2).unwrap(),
        os_kernel::task::TaskState::Ready
    );
}

fn resource_config() -> KernelConfig {
    static TASKS: [TaskConfig; 2] = [
        TaskConfig {
            entry: noop,
            stack: Stack { base: core::ptr::null_mut(), size: 0 },
            priority: 0,
            is_extended: false,
            activation_limit: 1,
            autostart: false,
        },
        TaskConfig {
            entry: noop,
            stack: Stack { base: core::ptr::null_mut(), size: 0 },
            priority: 1,
            is_extended: false,
            activation_limit: 1,
            autostart: true,
        },
    ];
    static RESOURCES: [ResourceConfig; 1] = [ResourceConfig { ceiling_priority: 0 }];
    KernelConfig {
        tasks: &TASKS,
        counters: &[],
        alarms: &[],
        schedule_tables: &[],
        resources: &RESOURCES,
        ioc_channels: &[],
    }
}

#[test]
fn resource_is_non_reentrant() {
    let config: &'static KernelConfig = Box::leak(Box::new(resource_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    // No task is running yet (start() was not called), so both calls see
    // StatusId::InvalidState — confirms get_resource requires a caller.
    assert_eq!(kernel.get_resource(0).unwrap_err(), StatusId::InvalidState);
}

fn counter_alarm_config() -> KernelConfig {
    static TASKS: [TaskConfig; 2] = [
        idle_task(),
        TaskConfig {
            entry: noop,
            stack: Stack { base: core::ptr::null_mut(), size: 0 },
            priority: 0,
            is_extended: false,
            activation_limit: 2,
            autostart: false,
        },
    ];
    static COUNTERS: [CounterConfig; 1] = [CounterConfig {
        ticks_per_base: 1,
        max_allowed_value: 99,
        min_cycles: 1,
    }];
    static ALARMS: [AlarmConfig; 1] = [AlarmConfig {
        counter: CounterId::new_unchecked(0),
        action: Action::ActivateTask(TaskId::new_unchecked(1)),
    }];
    KernelConfig {
        tasks: &TASKS,
        counters: &COUNTERS,
        alarms: &ALARMS,
        schedule_tables: &[],
        resources: &[],
        ioc_channels: &[],
    }
}

#[test]
fn cyclic_alarm_fires_at_configured_period() {
    let config: &'static KernelConfig = Box::leak(Box::new(counter_alarm_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    kernel.set_rel_alarm(0, 5, 5).unwrap();
    for _ in 0..5 {
        kernel.increment_counter(0).unwrap();
    }
    assert_eq!(
        kernel.get_task_state(1).unwrap(),
        os_kernel::task::TaskState::Ready
    );
}

#[test]
fn set_rel_alarm_rejects_reactivation_while_running() {
    let config: &'static KernelConfig = Box::leak(Box::new(counter_alarm_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    kernel.set_rel_alarm(0, 5, 0).unwrap();
    assert_eq!(
        kernel.set_rel_alarm(0, 5, 0).unwrap_err(),
        StatusId::InvalidState
    );
}

/// Offset 10 ms, cycle 70 ms, 1 ms ticks: the bound task is activated at
/// t=10 and again at t=80, so by t=85 it has been activated twice. The
/// task's `activation_limit` of 2 accepts both without either being
/// dropped for exceeding the limit.
#[test]
fn cyclic_alarm_activates_task_twice_by_t85() {
    let config: &'static KernelConfig = Box::leak(Box::new(counter_alarm_config()));
    let kernel: Kernel<HostArch> = Kernel::new(config, DefaultHooks).unwrap();

    kernel.set_rel_alarm(0, 10, 70).unwrap();
    assert_eq!(
        kernel.get_task_state(1).unwrap(),
        os_kernel::task::TaskState::Suspended
    );

    for t in 1..=9 {
        kernel.increment_counter(0).unwrap();
        assert_eq!(
            kernel.get_task_state(1).unwrap(),
            os_kernel::task::TaskState::Suspended,
            "task must not activate before t={t} reaches the 10 ms offset"
        );
    }
    kernel.increment_counter(0).unwrap(); // t = 10: first activation
    assert_eq!(
        kernel.get_task_state(1).unwrap(),
        os_kernel::task::TaskState::Ready
    );

    for _ in 11..=80 {
        kernel.increment_counter(0).unwrap();
    } // t = 80: second (cyclic) activation, within the queuing limit
    for _ in 81..=85 {
        kernel.increment_counter(0).unwrap();
    }
    assert_eq!(
        kernel.get_task_state(1).unwrap(),
        os_kernel::task::TaskState::Ready
    );
}

/// A port that counts its `init_stack` calls instead of touching real
/// registers, so a test can observe whether the kernel rebuilds a task's
/// frame on reactivation without needing a real context switch.
struct CountingArch;
static INIT_STACK_CALLS: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

unsafe impl Arch for CountingArch {
    fn critical_section<R>(f: impl FnOnce() -> R) -> R {
        f()
    }

    fn init_stack(_stack: Stack, _entry: fn()) -> StackFrame {
        use std::sync::atomic::Ordering;
        StackFrame(INIT_STACK_CALLS.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn request_switch() {}

    fn start_first_task() -> ! {
        panic!("CountingArch::start_first_task is not exercised by host tests")
    }
}

fn one_task_config() -> KernelConfig {
    static TASKS: [TaskConfig; 2] = [
        idle_task(),
        TaskConfig {
            entry: noop,
            stack: Stack { base: core::ptr::null_mut(), size: 0 },
            priority: 1,
            is_extended: false,
            activation_limit: 1,
            autostart: false,
        },
    ];
    KernelConfig {
        tasks: &TASKS,
        counters: &[],
        alarms: &[],
        schedule_tables: &[],
        resources: &[],
        ioc_channels: &[],
    }
}

/// Activate → (simulated dispatch) → terminate → activate again: the
/// second activation must rebuild the task's initial stack frame via
/// `Arch::init_stack`, the same as its very first activation, rather than
/// resuming whatever `sp` the task happened to leave behind.
#[test]
fn reactivate_after_terminate_rebuilds_a_fresh_stack_frame() {
    use std::sync::atomic::Ordering;

    let config: &'static KernelConfig = Box::leak(Box::new(one_task_config()));
    let kernel: Kernel<CountingArch> = Kernel::new(config, DefaultHooks).unwrap();

    kernel.activate_task(1).unwrap();
    // Promote task 1 to Running the way a port's PendSV handler would
    // after the first dispatch, without a real context switch.
    kernel.dispatch_sp_slot();
    let calls_after_first_activation = INIT_STACK_CALLS.load(Ordering::SeqCst);

    kernel.terminate_task().unwrap();
    assert_eq!(
        kernel.get_task_state(1).unwrap(),
        os_kernel::task::TaskState::Suspended
    );

    kernel.activate_task(1).unwrap();
    let calls_after_reactivation = INIT_STACK_CALLS.load(Ordering::SeqCst);
    assert!(
        calls_after_reactivation > calls_after_first_activation,
        "reactivation must rebuild the stack frame, not resume the old one"
    );
}
