//! Closed error-kind set returned by value from every fallible kernel API.
//!
//! Mirrors the `StatusType` constants of the original `Os_Types.h`
//! (`E_OK`, `E_OS_ID`, `E_OS_STATE`, `E_OS_LIMIT`, `E_OS_TIMEOUT`,
//! `E_OS_NOFUNC`, `E_OS_VALUE`) and `r3_kernel`'s closed, `Copy`,
//! heap-free error enum style (`r3_kernel::error`).

/// Outcome of a kernel or communication-stack operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusId {
    /// A task/alarm/counter/resource/schedule-table/IOC-channel id was out
    /// of the configured range.
    InvalidId,
    /// The call is not valid for the callee's current state (e.g.
    /// `ChainTask` from a non-running task, `ActivateTask` on a task
    /// already waiting to run past its activation limit).
    InvalidState,
    /// A table is already at its configured capacity.
    Limit,
    /// An argument's value was rejected (bad signal value, malformed PDU
    /// length).
    Value,
    /// A wrapped driver/collaborator call did not return success.
    NotOk,
    /// A read found nothing to return (empty IOC queue, Rx PDU never
    /// received).
    NoData,
}

pub type Result<T> = core::result::Result<T, StatusId>;
