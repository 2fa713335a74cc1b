//! Static table capacities.
//!
//! These mirror the `#define`d capacities of the original `Os_Cfg.h`
//! (`OS_MAX_TASKS`, `OS_MAX_ALARMS`, `OS_MAX_COUNTERS`, `OS_MAX_SchedTbl`,
//! `MAX_EXPIRY_POINTS`, `MAX_RESOURCES`, `MAX_IOC_CHANNELS`,
//! `IOC_BUFFER_SIZE`) one-for-one. All kernel tables are sized from these at
//! compile time; there is no dynamic allocation anywhere in this crate.

/// Includes the idle task (task id 0).
pub const MAX_TASKS: usize = 5;
pub const MAX_ALARMS: usize = 3;
pub const MAX_COUNTERS: usize = 2;
pub const MAX_SCHEDULE_TABLES: usize = 2;
pub const MAX_EXPIRY_POINTS: usize = 3;
pub const MAX_RESOURCES: usize = 4;
pub const MAX_IOC_CHANNELS: usize = 1;
pub const IOC_RING_CAPACITY: usize = 4;
pub const MAX_IOC_RECEIVERS: usize = 2;
