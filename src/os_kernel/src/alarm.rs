//! Alarm service: one-shot or cyclic actions fired off a counter's value.
//!
//! Grounded in `Os_Alarm.c`'s `SetRelAlarm`/`SetAbsAlarm`/`CancelAlarm` and
//! the tick-scan loop (`os_alarm_tick`) driven from `IncrementCounter`. An
//! alarm is bound to exactly one counter at configuration time; `SetRel`/
//! `SetAbsAlarm` reject a call on an alarm that is already running
//! (`E_OS_STATE` in the original), and a cyclic alarm reloads its expiry by
//! `cycle` (modulo the counter's wraparound) every time it fires.

use crate::action::Action;
use crate::error::StatusId;
use crate::id::CounterId;

#[derive(Debug, Clone, Copy)]
pub struct AlarmConfig {
    pub counter: CounterId,
    pub action: Action,
}

#[derive(Debug, Clone, Copy)]
struct AlarmState {
    expiry: u32,
    /// 0 means one-shot; nonzero is the reload period.
    cycle: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Alarm {
    pub config: AlarmConfig,
    state: Option<AlarmState>,
}

impl Alarm {
    pub const fn new(config: AlarmConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Ticks remaining until the next expiry, or `None` if not running.
    /// `modulus` is the bound counter's wraparound (`max_allowed_value +
    /// 1`).
    pub fn get_relative(&self, now: u32, modulus: u32) -> Option<u32> {
        self.state.map(|s| diff_wrap(now, s.expiry, modulus))
    }

    /// `increment == 0` is accepted rather than rejected: it fires on the
    /// very next tick, never on the call tick itself, the same as if
    /// `increment == 1` had been requested — a literal zero-tick expiry
    /// would otherwise never match since `tick` only ever observes `now`
    /// values strictly after this call's `now`.
    pub fn set_relative(
        &mut self,
        now: u32,
        modulus: u32,
        increment: u32,
        cycle: u32,
        min_cycles: u32,
    ) -> Result<(), StatusId> {
        if self.state.is_some() {
            return Err(StatusId::InvalidState);
        }
        if increment > modulus || cycle >= modulus || (cycle > 0 && cycle < min_cycles) {
            return Err(StatusId::Value);
        }
        self.state = Some(AlarmState {
            expiry: (now + increment.max(1)) % modulus,
            cycle,
        });
        Ok(())
    }

    pub fn set_absolute(
        &mut self,
        modulus: u32,
        at: u32,
        cycle: u32,
        min_cycles: u32,
    ) -> Result<(), StatusId> {
        if self.state.is_some() {
            return Err(StatusId::InvalidState);
        }
        if at >= modulus || cycle >= modulus || (cycle > 0 && cycle < min_cycles) {
            return Err(StatusId::Value);
        }
        self.state = Some(AlarmState { expiry: at, cycle });
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), StatusId> {
        match self.state.take() {
            Some(_) => Ok(()),
            None => Err(StatusId::InvalidState),
        }
    }

    /// Called once per logical counter tick with the counter's new value.
    /// Returns the action to run if this alarm just expired, reloading or
    /// clearing its state as appropriate.
    pub fn tick(&mut self, now: u32, modulus: u32) -> Option<Action> {
        let state = self.state?;
        if state.expiry != now {
            return None;
        }
        if state.cycle == 0 {
            self.state = None;
        } else {
            self.state = Some(AlarmState {
                expiry: (now + state.cycle) % modulus,
                cycle: state.cycle,
            });
        }
        Some(self.config.action)
    }
}

/// Forward distance from `from` to `to` on a counter that wraps at
/// `modulus`, i.e. ticks remaining until `to` is reached.
pub fn diff_wrap(from: u32, to: u32, modulus: u32) -> u32 {
    if to >= from {
        to - from
    } else {
        modulus - from + to
    }
}

#[cfg(all(test, feature = "host_test"))]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::id::TaskId;

    fn alarm() -> Alarm {
        Alarm::new(AlarmConfig {
            counter: CounterId::new_unchecked(0),
            action: Action::ActivateTask(TaskId::new_unchecked(1)),
        })
    }

    #[test]
    fn offset_zero_fires_on_the_next_tick_not_the_call_tick() {
        let mut a = alarm();
        a.set_relative(0, 100, 0, 0, 1).unwrap();
        assert!(a.tick(0, 100).is_none(), "must not fire on the call tick");
        assert!(a.tick(1, 100).is_some(), "must fire on the next tick");
    }

    #[test]
    fn one_shot_alarm_deactivates_after_firing_once() {
        let mut a = alarm();
        a.set_relative(0, 100, 5, 0, 1).unwrap();
        assert!(a.is_active());
        assert!(a.tick(5, 100).is_some());
        assert!(!a.is_active());
        assert!(a.tick(6, 100).is_none());
    }

    #[test]
    fn cycle_below_counter_minimum_is_rejected() {
        let mut a = alarm();
        assert_eq!(
            a.set_relative(0, 100, 5, 3, 5).unwrap_err(),
            StatusId::Value
        );
    }

    #[test]
    fn cancel_then_set_rel_matches_a_single_set_rel() {
        let modulus = 100;
        let mut cancelled_then_set = alarm();
        cancelled_then_set.set_relative(0, modulus, 5, 7, 1).unwrap();
        cancelled_then_set.cancel().unwrap();
        cancelled_then_set.set_relative(20, modulus, 5, 7, 1).unwrap();

        let mut single = alarm();
        single.set_relative(20, modulus, 5, 7, 1).unwrap();

        for now in 20..40 {
            assert_eq!(
                cancelled_then_set.get_relative(now, modulus),
                single.get_relative(now, modulus)
            );
        }
    }
}
