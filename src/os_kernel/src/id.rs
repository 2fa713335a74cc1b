//! Distinct newtype id types, one per kernel object kind.
//!
//! Grounded in `r3_kernel`'s `Id` newtype discipline: a bare `u8` index
//! would let a `CounterId` slip into an `AlarmId` parameter by accident.
//! Each id additionally knows how to validate itself against a configured
//! table length, replacing the original C baseline's unchecked array index.

use crate::error::StatusId;

macro_rules! define_id {
    ($name:ident, $max:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u8);

        impl $name {
            /// Constructs an id without checking it against any table.
            /// Used only for ids that are compile-time constants in
            /// `firmware/ecu`'s configuration tables.
            pub const fn new_unchecked(raw: u8) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u8 {
                self.0
            }

            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Validates `raw` against a runtime table length, as every
            /// public kernel entry point must before touching its tables.
            pub fn checked(raw: u8, len: usize) -> Result<Self, StatusId> {
                if (raw as usize) < len && (raw as usize) <= $max {
                    Ok(Self(raw))
                } else {
                    Err(StatusId::InvalidId)
                }
            }
        }
    };
}

define_id!(TaskId, crate::limits::MAX_TASKS);
define_id!(AlarmId, crate::limits::MAX_ALARMS);
define_id!(CounterId, crate::limits::MAX_COUNTERS);
define_id!(ResourceId, crate::limits::MAX_RESOURCES);
define_id!(ScheduleTableId, crate::limits::MAX_SCHEDULE_TABLES);
define_id!(IocChannelId, crate::limits::MAX_IOC_CHANNELS);

/// The idle task is always task id 0 and is never a valid `ActivateTask`
/// target (mirrors `TASK_IDLE` in the original `TaskId_e`).
pub const IDLE_TASK: TaskId = TaskId::new_unchecked(0);
