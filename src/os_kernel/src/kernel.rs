//! The kernel aggregate: every subsystem's runtime state behind one
//! critical-section-guarded cell, and the entry points that operate on it.
//!
//! Grounded in the original C baseline's module layout (`Os_Task.c`,
//! `Os_Event.c`, `Os_Resource.c`, `Os_Counter.c`, `Os_Alarm.c`,
//! `Os_SchedTbl.c`, `Os_Ioc.c`) collapsed into a single, statically
//! allocated kernel aggregate accessed through functions — each function
//! here is a direct Rust counterpart of one of
//! those C translation units' public entry points, all guarded by the one
//! `KCell` instead of each module's own disable/restore-interrupts pair.

use arrayvec::ArrayVec;

use crate::action::Action;
use crate::alarm::Alarm;
use crate::arch::Arch;
use crate::cfg::KernelConfig;
use crate::counter::Counter;
use crate::error::{Result, StatusId};
use crate::event::EventMask;
use crate::id::{AlarmId, CounterId, IocChannelId, ResourceId, ScheduleTableId, TaskId, IDLE_TASK};
use crate::ioc::IocChannel;
use crate::klock::KCell;
use crate::readyqueue::ReadyQueue;
use crate::resource::Resource;
use crate::schedtbl::ScheduleTable;
use crate::task::{TaskCb, TaskState};

/// Weak-default lifecycle hooks, grounded in `Os_Hook.c`'s
/// `StartupHook`/`ShutdownHook`/`PreTaskHook`/`PostTaskHook`/`ErrorHook`:
/// every method has a no-op default so `firmware/ecu` only implements the
/// ones it cares about.
pub trait Hooks {
    fn startup(&self) {}
    fn shutdown(&self, _status: StatusId) {}
    fn pre_task(&self, _task: TaskId) {}
    fn post_task(&self, _task: TaskId) {}
    fn error(&self, _status: StatusId) {}
}

pub struct DefaultHooks;
impl Hooks for DefaultHooks {}

struct KernelState {
    tasks: ArrayVec<TaskCb, { crate::limits::MAX_TASKS }>,
    ready: ReadyQueue,
    running: Option<TaskId>,
    counters: ArrayVec<Counter, { crate::limits::MAX_COUNTERS }>,
    alarms: ArrayVec<Alarm, { crate::limits::MAX_ALARMS }>,
    schedule_tables: ArrayVec<ScheduleTable, { crate::limits::MAX_SCHEDULE_TABLES }>,
    resources: ArrayVec<Resource, { crate::limits::MAX_RESOURCES }>,
    ioc_channels: ArrayVec<IocChannel, { crate::limits::MAX_IOC_CHANNELS }>,
}

pub struct Kernel<A: Arch, H: Hooks = DefaultHooks> {
    state: KCell<A, KernelState>,
    config: &'static KernelConfig,
    hooks: H,
}

impl<A: Arch, H: Hooks> Kernel<A, H> {
    /// Validates `config` and builds a fresh kernel. Call once, into a
    /// `static`; every subsequent operation borrows `&self`.
    pub fn new(config: &'static KernelConfig, hooks: H) -> Result<Self> {
        config.validate()?;

        let mut tasks = ArrayVec::new();
        for t in config.tasks {
            let mut tcb = TaskCb::new(*t);
            tcb.sp = A::init_stack(t.stack, t.entry);
            tasks.push(tcb);
        }
        let mut counters = ArrayVec::new();
        for c in config.counters {
            counters.push(Counter::new(*c));
        }
        let mut alarms = ArrayVec::new();
        for a in config.alarms {
            alarms.push(Alarm::new(*a));
        }
        let mut schedule_tables = ArrayVec::new();
        for s in config.schedule_tables {
            schedule_tables.push(ScheduleTable::new(*s));
        }
        let mut resources = ArrayVec::new();
        for r in config.resources {
            resources.push(Resource::new(*r));
        }
        let mut ioc_channels = ArrayVec::new();
        for i in config.ioc_channels {
            ioc_channels.push(IocChannel::new(*i));
        }

        Ok(Self {
            state: KCell::new(KernelState {
                tasks,
                ready: ReadyQueue::new(),
                running: None,
                counters,
                alarms,
                schedule_tables,
                resources,
                ioc_channels,
            }),
            config,
            hooks,
        })
    }

    fn task_id(&self, raw: u8) -> Result<TaskId> {
        TaskId::checked(raw, self.config.tasks.len())
    }

    // ---- lifecycle -------------------------------------------------

    /// Activates every `autostart` task, then transfers control to the
    /// highest-priority one and never returns. Grounded in the original's
    /// `StartOS`. Every task's initial stack frame was already built in
    /// `Kernel::new`, so the port's first dispatch has nothing special to
    /// do beyond picking a task — see `Arch::start_first_task`.
    pub fn start(&'static self) -> ! {
        self.hooks.startup();
        self.state.with(|s| {
            for (idx, t) in s.tasks.iter().enumerate() {
                if t.config.autostart && idx != IDLE_TASK.index() {
                    let id = TaskId::new_unchecked(idx as u8);
                    Self::activate_locked(s, id).ok();
                }
            }
        });
        A::start_first_task()
    }

    // ---- task service ------------------------------------------------

    /// Moves `id` from `Suspended` to `Ready` (or queues another
    /// activation if it is already live), enqueuing it if it just became
    /// runnable. Rejects `IDLE_TASK`: activation must fail when the id
    /// designates the idle task, matching the ready queue invariant
    /// that IDLE is never enqueued.
    ///
    /// A transition out of `Suspended` rebuilds the task's initial stack
    /// frame via `Arch::init_stack`, so a reactivation after
    /// `TerminateTask`/`ChainTask` starts `entry` fresh rather than
    /// resuming whatever `sp` was left by the previous run.
    fn activate_locked(s: &mut KernelState, id: TaskId) -> Result<()> {
        if id == IDLE_TASK {
            return Err(StatusId::InvalidState);
        }
        let task = &s.tasks[id.index()];
        let priority = task.config.priority;
        let stack = task.config.stack;
        let entry = task.config.entry;
        let became_ready = s.tasks[id.index()].request_activation()?;
        if became_ready {
            s.tasks[id.index()].sp = A::init_stack(stack, entry);
            s.ready.push(id, priority);
        }
        Ok(())
    }

    pub fn activate_task(&self, raw: u8) -> Result<()> {
        let id = self.task_id(raw)?;
        self.state.with(|s| Self::activate_locked(s, id))?;
        self.reschedule();
        Ok(())
    }

    /// Terminates the calling (currently running) task, matching OSEK's
    /// `TerminateTask` being callable only on oneself.
    pub fn terminate_task(&self) -> Result<()> {
        let (prev, next_ready) = self.state.with(|s| {
            let running = s.running.ok_or(StatusId::InvalidState)?;
            if s.resources.iter().any(|r| r.holder() == Some(running)) {
                return Err(StatusId::InvalidState);
            }
            let requeue = s.tasks[running.index()].consume_activation();
            if requeue {
                let priority = s.tasks[running.index()].config.priority;
                s.ready.push(running, priority);
            }
            s.running = None;
            Ok((running, requeue))
        })?;
        self.hooks.post_task(prev);
        let _ = next_ready;
        self.reschedule();
        Ok(())
    }

    /// Activates `next` then terminates the caller as one atomic step,
    /// matching `ChainTask`.
    pub fn chain_task(&self, raw_next: u8) -> Result<()> {
        let next = self.task_id(raw_next)?;
        self.state.with(|s| {
            let running = s.running.ok_or(StatusId::InvalidState)?;
            if s.resources.iter().any(|r| r.holder() == Some(running)) {
                return Err(StatusId::InvalidState);
            }
            s.tasks[running.index()].consume_activation();
            s.running = None;
            Self::activate_locked(s, next)
        })?;
        self.reschedule();
        Ok(())
    }

    pub fn get_task_state(&self, raw: u8) -> Result<TaskState> {
        let id = self.task_id(raw)?;
        Ok(self.state.with(|s| s.tasks[id.index()].state))
    }

    /// Re-evaluates the ready queue head against the running task and, if
    /// a higher-priority task should now run, performs the context
    /// switch bookkeeping and requests a dispatch from the port. Basic
    /// tasks here are cooperative/round-robin: a switch only happens when
    /// the running task yields via `terminate`/`chain`/blocks in
    /// `wait_event` — this is a limited-preemption window:
    /// `activate_task`/`set_event` only reorders the ready
    /// queue, they don't preempt a running task mid-instruction.
    fn reschedule(&self) {
        let switch = self.state.with(|s| {
            let running_priority = s.running.map(|r| s.tasks[r.index()].config.priority);
            match (s.ready.front(), running_priority) {
                (Some(next), None) => Some(next),
                (Some(next), Some(p)) if s.tasks[next.index()].config.priority > p => Some(next),
                _ => None,
            }
        });
        if switch.is_some() {
            A::request_switch();
        }
    }

    /// Raw pointer to the currently running task's saved-stack-pointer
    /// slot, for a port's context-switch assembly to write the outgoing
    /// context into. The idle task is an ordinary configured task (task
    /// id 0) here, not a bare MSP loop, so it has a slot like any other;
    /// this only returns `core::ptr::null_mut()` before `Kernel::start`
    /// has dispatched anything.
    ///
    /// # Safety
    /// Valid as long as `self` (the `'static` kernel singleton) lives,
    /// since task slots are allocated once in `Kernel::new` and never
    /// moved afterwards.
    pub fn running_sp_slot(&self) -> *mut usize {
        self.state
            .with(|s| s.running.map(|id| &mut s.tasks[id.index()].sp.0 as *mut usize))
            .unwrap_or(core::ptr::null_mut())
    }

    /// Picks the next task to run (requeuing the outgoing one if it is
    /// still runnable) and returns a raw pointer to its saved-stack-pointer
    /// slot. Called by a port's PendSV handler after it has saved the
    /// outgoing context via [`Self::running_sp_slot`].
    pub fn dispatch_sp_slot(&self) -> *mut usize {
        self.state.with(|s| {
            if let Some(running) = s.running {
                if s.tasks[running.index()].state == TaskState::Running {
                    s.tasks[running.index()].state = TaskState::Ready;
                    s.ready.push(running, s.tasks[running.index()].config.priority);
                }
            }
            let next = s.ready.pop_front().unwrap_or(IDLE_TASK);
            s.running = Some(next);
            s.tasks[next.index()].state = TaskState::Running;
            &mut s.tasks[next.index()].sp.0 as *mut usize
        })
    }

    // ---- event service ------------------------------------------------

    pub fn set_event(&self, raw_task: u8, mask: u16) -> Result<()> {
        let id = self.task_id(raw_task)?;
        let mask = EventMask::from_bits_truncate(mask);
        let wake = self.state.with(|s| {
            if !s.tasks[id.index()].config.is_extended {
                return Err(StatusId::InvalidState);
            }
            Ok(Self::set_event_locked(s, id, mask))
        })?;
        if wake {
            self.reschedule();
        }
        Ok(())
    }

    /// Sets `mask` into `id`'s pending events and readies it if it was
    /// `Waiting` on a bit that just got set. Shared by `set_event`, alarm/
    /// schedule-table `SetEvent` actions, and the IOC wake-on-write path —
    /// the callers differ only in whether they gate on `is_extended`
    /// first.
    fn set_event_locked(s: &mut KernelState, id: TaskId, mask: EventMask) -> bool {
        let woke = s.tasks[id.index()].events.set(mask);
        if woke && s.tasks[id.index()].state == TaskState::Waiting {
            s.tasks[id.index()].state = TaskState::Ready;
            s.ready.push(id, s.tasks[id.index()].config.priority);
        }
        woke
    }

    /// Blocks the calling task until at least one bit of `mask` is set.
    /// Must be called from task context; returns once a matching
    /// `set_event` has woken it and the dispatcher has run it again.
    pub fn wait_event(&self, mask: u16) -> Result<()> {
        let mask = EventMask::from_bits_truncate(mask);
        let should_block = self.state.with(|s| {
            let running = s.running.ok_or(StatusId::InvalidState)?;
            if !s.tasks[running.index()].config.is_extended {
                return Err(StatusId::InvalidState);
            }
            if s.tasks[running.index()].events.get().intersects(mask) {
                return Ok(false);
            }
            s.tasks[running.index()].events.wait_mask = Some(mask);
            s.tasks[running.index()].state = TaskState::Waiting;
            s.running = None;
            Ok(true)
        })?;
        if should_block {
            A::request_switch();
        }
        Ok(())
    }

    pub fn get_event(&self, raw_task: u8) -> Result<u16> {
        let id = self.task_id(raw_task)?;
        Ok(self.state.with(|s| s.tasks[id.index()].events.get().bits()))
    }

    pub fn clear_event(&self, mask: u16) -> Result<()> {
        let mask = EventMask::from_bits_truncate(mask);
        self.state.with(|s| {
            let running = s.running.ok_or(StatusId::InvalidState)?;
            s.tasks[running.index()].events.clear(mask);
            Ok(())
        })
    }

    // ---- resource service ----------------------------------------------

    pub fn get_resource(&self, raw: u8) -> Result<()> {
        let id = ResourceId::checked(raw, self.config.resources.len())?;
        self.state.with(|s| {
            let running = s.running.ok_or(StatusId::InvalidState)?;
            s.resources[id.index()].get(running)
        })
    }

    pub fn release_resource(&self, raw: u8) -> Result<()> {
        let id = ResourceId::checked(raw, self.config.resources.len())?;
        self.state.with(|s| {
            let running = s.running.ok_or(StatusId::InvalidState)?;
            s.resources[id.index()].release(running)
        })
    }

    // ---- counter / tick -------------------------------------------------

    pub fn get_counter_value(&self, raw: u8) -> Result<u32> {
        let id = CounterId::checked(raw, self.config.counters.len())?;
        Ok(self.state.with(|s| s.counters[id.index()].value()))
    }

    /// Advances one counter by one raw architecture tick, firing every
    /// alarm and schedule table bound to it whose expiry has been
    /// reached. Called from the port's tick interrupt (`SysTick`).
    pub fn increment_counter(&self, raw: u8) -> Result<()> {
        let id = CounterId::checked(raw, self.config.counters.len())?;
        let mut actions: ArrayVec<Action, { crate::limits::MAX_ALARMS + crate::limits::MAX_EXPIRY_POINTS * crate::limits::MAX_SCHEDULE_TABLES }> =
            ArrayVec::new();
        let reschedule_needed = self.state.with(|s| {
            let elapsed = s.counters[id.index()].advance_raw();
            if elapsed == 0 {
                return false;
            }
            let now = s.counters[id.index()].value();
            let modulus = s.counters[id.index()].config.max_allowed_value + 1;
            for alarm in s.alarms.iter_mut().filter(|a| a.config.counter == id) {
                if let Some(action) = alarm.tick(now, modulus) {
                    let _ = actions.try_push(action);
                }
            }
            for table in s.schedule_tables.iter_mut().filter(|t| t.config.counter == id) {
                for action in table.tick(now, modulus) {
                    let _ = actions.try_push(action);
                }
            }
            let mut any_readied = false;
            for action in &actions {
                any_readied |= Self::fire_action(s, *action);
            }
            any_readied
        });
        if reschedule_needed {
            self.reschedule();
        }
        Ok(())
    }

    fn fire_action(s: &mut KernelState, action: Action) -> bool {
        match action {
            Action::ActivateTask(id) => Self::activate_locked(s, id).is_ok(),
            Action::SetEvent(id, mask) => {
                if !s.tasks[id.index()].config.is_extended {
                    return false;
                }
                Self::set_event_locked(s, id, mask)
            }
            Action::Callback(f) => {
                f();
                false
            }
        }
    }

    // ---- alarm service --------------------------------------------------

    pub fn set_rel_alarm(&self, raw: u8, increment: u32, cycle: u32) -> Result<()> {
        let id = AlarmId::checked(raw, self.config.alarms.len())?;
        self.state.with(|s| {
            let counter = s.alarms[id.index()].config.counter;
            let now = s.counters[counter.index()].value();
            let modulus = s.counters[counter.index()].config.max_allowed_value + 1;
            let min_cycles = s.counters[counter.index()].config.min_cycles;
            s.alarms[id.index()].set_relative(now, modulus, increment, cycle, min_cycles)
        })
    }

    pub fn set_abs_alarm(&self, raw: u8, at: u32, cycle: u32) -> Result<()> {
        let id = AlarmId::checked(raw, self.config.alarms.len())?;
        self.state.with(|s| {
            let counter = s.alarms[id.index()].config.counter;
            let modulus = s.counters[counter.index()].config.max_allowed_value + 1;
            let min_cycles = s.counters[counter.index()].config.min_cycles;
            s.alarms[id.index()].set_absolute(modulus, at, cycle, min_cycles)
        })
    }

    pub fn cancel_alarm(&self, raw: u8) -> Result<()> {
        let id = AlarmId::checked(raw, self.config.alarms.len())?;
        self.state.with(|s| s.alarms[id.index()].cancel())
    }

    pub fn get_alarm(&self, raw: u8) -> Result<u32> {
        let id = AlarmId::checked(raw, self.config.alarms.len())?;
        self.state.with(|s| {
            let counter = s.alarms[id.index()].config.counter;
            let now = s.counters[counter.index()].value();
            let modulus = s.counters[counter.index()].config.max_allowed_value + 1;
            s.alarms[id.index()]
                .get_relative(now, modulus)
                .ok_or(StatusId::InvalidState)
        })
    }

    // ---- schedule table service -----------------------------------------

    pub fn start_schedule_table_rel(&self, raw: u8, offset: u32) -> Result<()> {
        let id = ScheduleTableId::checked(raw, self.config.schedule_tables.len())?;
        let mut actions: ArrayVec<Action, { crate::limits::MAX_EXPIRY_POINTS }> = ArrayVec::new();
        self.state.with(|s| {
            let counter = s.schedule_tables[id.index()].config.counter;
            let now = s.counters[counter.index()].value();
            let modulus = s.counters[counter.index()].config.max_allowed_value + 1;
            for a in s.schedule_tables[id.index()].start_relative(now, modulus, offset) {
                let _ = actions.try_push(a);
            }
        });
        self.state.with(|s| {
            for a in &actions {
                Self::fire_action(s, *a);
            }
        });
        self.reschedule();
        Ok(())
    }

    pub fn start_schedule_table_abs(&self, raw: u8, at: u32) -> Result<()> {
        let id = ScheduleTableId::checked(raw, self.config.schedule_tables.len())?;
        let mut actions: ArrayVec<Action, { crate::limits::MAX_EXPIRY_POINTS }> = ArrayVec::new();
        self.state.with(|s| {
            let counter = s.schedule_tables[id.index()].config.counter;
            let now = s.counters[counter.index()].value();
            let modulus = s.counters[counter.index()].config.max_allowed_value + 1;
            for a in s.schedule_tables[id.index()].start_absolute(now, modulus, at) {
                let _ = actions.try_push(a);
            }
        });
        self.state.with(|s| {
            for a in &actions {
                Self::fire_action(s, *a);
            }
        });
        self.reschedule();
        Ok(())
    }

    pub fn stop_schedule_table(&self, raw: u8) -> Result<()> {
        let id = ScheduleTableId::checked(raw, self.config.schedule_tables.len())?;
        self.state.with(|s| s.schedule_tables[id.index()].stop());
        Ok(())
    }

    pub fn sync_schedule_table(&self, raw: u8) -> Result<()> {
        let id = ScheduleTableId::checked(raw, self.config.schedule_tables.len())?;
        self.state.with(|s| {
            let counter = s.schedule_tables[id.index()].config.counter;
            let now = s.counters[counter.index()].value();
            s.schedule_tables[id.index()].sync(now);
        });
        Ok(())
    }

    // ---- IOC -------------------------------------------------------------

    pub fn ioc_register_receiver(&self, raw_channel: u8, slot: usize, raw_task: u8) -> Result<()> {
        let id = IocChannelId::checked(raw_channel, self.config.ioc_channels.len())?;
        let task = self.task_id(raw_task)?;
        self.state.with(|s| s.ioc_channels[id.index()].register_receiver(slot, task))
    }

    /// `Ioc_Send`: pushes `value`, then raises the fixed receive event on
    /// every currently registered receiver task, waking any that are
    /// `Waiting` on it. Unlike a user-facing `SetEvent`, this does not
    /// reject a non-extended receiver task — a receiver that only polls
    /// `ioc_receive` simply leaves the bit set unused until its next read
    /// clears it.
    pub fn ioc_send(&self, raw_channel: u8, value: u32) -> Result<()> {
        let id = IocChannelId::checked(raw_channel, self.config.ioc_channels.len())?;
        let woke = self.state.with(|s| {
            s.ioc_channels[id.index()].send(value);
            let receivers: ArrayVec<TaskId, { crate::limits::MAX_IOC_RECEIVERS }> =
                s.ioc_channels[id.index()].registered_receivers().collect();
            let mut any_woke = false;
            for task in receivers {
                any_woke |= Self::set_event_locked(s, task, EventMask::EV_RX);
            }
            any_woke
        });
        if woke {
            self.reschedule();
        }
        Ok(())
    }

    /// `Ioc_Receive`: on a successful read, clears the receive event on
    /// that receiver's own task, matching the original's trailing
    /// `ClearEvent(EV_RX)`.
    pub fn ioc_receive(&self, raw_channel: u8, slot: usize) -> Result<u32> {
        let id = IocChannelId::checked(raw_channel, self.config.ioc_channels.len())?;
        self.state.with(|s| {
            let value = s.ioc_channels[id.index()].receive(slot)?;
            if let Some(task) = s.ioc_channels[id.index()].receiver_task(slot) {
                s.tasks[task.index()].events.clear(EventMask::EV_RX);
            }
            Ok(value)
        })
    }
}
