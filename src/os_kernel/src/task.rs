//! Task control block and the per-task state machine.
//!
//! Grounded in `Os_Task.c`'s `TCB_t` and `OsTaskState` (`SUSPENDED`,
//! `READY`, `RUNNING`, `WAITING`): a task starts `Suspended`, `ActivateTask`
//! moves it to `Ready` (or, if it is already live, queues another
//! activation up to its configured limit — `OS_OS_LIMIT` in the original),
//! the scheduler promotes the head of the ready queue to `Running`, and
//! `TerminateTask`/`ChainTask` either drop back to `Suspended` or
//! immediately re-arm from a queued activation. Events are meaningful only
//! for extended tasks (`is_extended`); a `WaitEvent` call on a basic task is
//! rejected by the caller in `kernel.rs`, matching `Os_Event.c`.

use crate::action::Callback;
use crate::arch::{Stack, StackFrame};
use crate::event::EventState;
use crate::error::StatusId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Suspended,
    Ready,
    Running,
    /// Extended task blocked in `WaitEvent`.
    Waiting,
}

#[derive(Clone, Copy)]
pub struct TaskConfig {
    pub entry: Callback,
    pub stack: Stack,
    pub priority: u8,
    pub is_extended: bool,
    /// Maximum number of queued activations, including the one that puts
    /// the task in `Ready`/`Running`. 1 means "no queuing".
    pub activation_limit: u8,
    /// Activated once by `Kernel::start`, mirroring OSEK's autostart task
    /// list (`StartOS` in the original).
    pub autostart: bool,
}

pub struct TaskCb {
    pub config: TaskConfig,
    pub state: TaskState,
    /// Number of activations not yet consumed by a matching
    /// `TerminateTask`/`ChainTask`, including the currently running one.
    pub pending_activations: u8,
    pub events: EventState,
    pub sp: StackFrame,
}

impl TaskCb {
    pub const fn new(config: TaskConfig) -> Self {
        Self {
            config,
            state: TaskState::Suspended,
            pending_activations: 0,
            events: EventState::new(),
            sp: StackFrame(0),
        }
    }

    /// Records one more activation request. Returns `true` if this
    /// activation should be enqueued onto the ready queue right away
    /// (the task was idle), `false` if it was merely queued behind a
    /// live instance, or an error if the configured limit is exceeded.
    pub fn request_activation(&mut self) -> Result<bool, StatusId> {
        if self.pending_activations >= self.config.activation_limit {
            return Err(StatusId::Limit);
        }
        self.pending_activations += 1;
        if self.state == TaskState::Suspended {
            self.state = TaskState::Ready;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consumes the running instance. Returns `true` if another queued
    /// activation should be enqueued immediately (re-`Ready`), `false` if
    /// the task goes back to `Suspended`.
    pub fn consume_activation(&mut self) -> bool {
        debug_assert!(self.pending_activations > 0);
        self.pending_activations = self.pending_activations.saturating_sub(1);
        if self.pending_activations > 0 {
            self.state = TaskState::Ready;
            true
        } else {
            self.state = TaskState::Suspended;
            false
        }
    }
}
