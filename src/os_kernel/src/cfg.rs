//! Static configuration tables and the cross-reference checks run once at
//! `Kernel::new`.
//!
//! Mirrors `r3_kernel`'s const-configuration story (`r3_kernel::cfg`)
//! without its procedural-macro layer: `firmware/ecu` builds a
//! `KernelConfig` of plain `const` slices, and this module is the single
//! place that checks every id a table embeds (an alarm's bound counter, a
//! `SetEvent` action's target task) actually exists, the way `Cfg::finish`
//! validates a builder before handing back a `System`.

use crate::alarm::AlarmConfig;
use crate::counter::CounterConfig;
use crate::error::StatusId;
use crate::ioc::IocChannelConfig;
use crate::limits::{
    MAX_ALARMS, MAX_COUNTERS, MAX_IOC_CHANNELS, MAX_RESOURCES, MAX_SCHEDULE_TABLES, MAX_TASKS,
};
use crate::resource::ResourceConfig;
use crate::schedtbl::ScheduleTableConfig;
use crate::task::TaskConfig;
use crate::action::Action;

pub struct KernelConfig {
    pub tasks: &'static [TaskConfig],
    pub counters: &'static [CounterConfig],
    pub alarms: &'static [AlarmConfig],
    pub schedule_tables: &'static [ScheduleTableConfig],
    pub resources: &'static [ResourceConfig],
    pub ioc_channels: &'static [IocChannelConfig],
}

impl KernelConfig {
    pub(crate) fn validate(&self) -> Result<(), StatusId> {
        if self.tasks.is_empty() || self.tasks.len() > MAX_TASKS {
            return Err(StatusId::Value);
        }
        if self.counters.len() > MAX_COUNTERS {
            return Err(StatusId::Value);
        }
        if self.alarms.len() > MAX_ALARMS {
            return Err(StatusId::Value);
        }
        if self.schedule_tables.len() > MAX_SCHEDULE_TABLES {
            return Err(StatusId::Value);
        }
        if self.resources.len() > MAX_RESOURCES {
            return Err(StatusId::Value);
        }
        if self.ioc_channels.len() > MAX_IOC_CHANNELS {
            return Err(StatusId::Value);
        }

        for alarm in self.alarms {
            if alarm.counter.index() >= self.counters.len() {
                return Err(StatusId::InvalidId);
            }
            self.validate_action(alarm.action)?;
        }
        for table in self.schedule_tables {
            if table.counter.index() >= self.counters.len() {
                return Err(StatusId::InvalidId);
            }
            for ep in table.expiry_points.iter().flatten() {
                self.validate_action(ep.action)?;
            }
        }
        Ok(())
    }

    fn validate_action(&self, action: Action) -> Result<(), StatusId> {
        match action {
            Action::ActivateTask(id) | Action::SetEvent(id, _) => {
                if id.index() >= self.tasks.len() {
                    return Err(StatusId::InvalidId);
                }
            }
            Action::Callback(_) => {}
        }
        Ok(())
    }
}
