//! Actions an alarm or a schedule table expiry point can fire.
//!
//! Grounded in `Os_Alarm.c`'s `Alarm_ActionType` (`ALARM_ACTION_ACTIVATETASK`,
//! `ALARM_ACTION_SETEVENT`, `ALARM_ACTION_CALLBACK`).

use crate::event::EventMask;
use crate::id::TaskId;

/// A callback action is a plain function pointer: `firmware/ecu` is a single
/// concrete binary, so there is no need for a boxed closure here.
pub type Callback = fn();

#[derive(Debug, Clone, Copy)]
pub enum Action {
    ActivateTask(TaskId),
    SetEvent(TaskId, EventMask),
    Callback(Callback),
}
