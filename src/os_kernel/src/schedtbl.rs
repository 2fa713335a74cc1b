//! Schedule table service: an ordered list of expiry points replayed
//! cyclically against a counter.
//!
//! Grounded in `Os_SchedTbl.c`'s `StartScheduleTableRel`/`Abs`/`Stop`/`Sync`
//! and its tick-scan loop. Expiry points are configured in ascending
//! `offset` order; starting the table anchors offset 0 to `now + offset`
//! (an offset-0 point fires immediately, matching the WAITING→RUNNING
//! transition in the original). When the scan runs past the last
//! configured point it reloads by `period`, and if more than one whole
//! period has elapsed since the last tick it jumps the anchor forward by
//! the number of whole periods in one step (`diff_wrap`-based coalescing)
//! instead of replaying each missed period's points.

use arrayvec::ArrayVec;

use crate::action::Action;
use crate::alarm::diff_wrap;
use crate::id::CounterId;
use crate::limits::MAX_EXPIRY_POINTS;

#[derive(Debug, Clone, Copy)]
pub struct ExpiryPoint {
    pub offset: u32,
    pub action: Action,
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleTableConfig {
    pub counter: CounterId,
    /// Ascending by `offset`; unused slots are `None`. `None`-only is a
    /// configuration error caught at `Kernel::new`.
    pub expiry_points: [Option<ExpiryPoint>; MAX_EXPIRY_POINTS],
    /// Cycle length. 0 means the table runs once and stops after its last
    /// expiry point.
    pub period: u32,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Stopped,
    Running { anchor: u32, next_index: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleTable {
    pub config: ScheduleTableConfig,
    state: State,
}

impl ScheduleTable {
    pub const fn new(config: ScheduleTableConfig) -> Self {
        Self {
            config,
            state: State::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    fn len(&self) -> usize {
        self.config
            .expiry_points
            .iter()
            .take_while(|p| p.is_some())
            .count()
    }

    /// Starts the table so its first expiry point lands at `now + offset`,
    /// firing any expiry point exactly at offset 0 immediately.
    pub fn start_relative(&mut self, now: u32, modulus: u32, offset: u32) -> ArrayVec<Action, MAX_EXPIRY_POINTS> {
        let anchor = (now + offset) % modulus;
        self.state = State::Running {
            anchor,
            next_index: 0,
        };
        self.tick(now, modulus)
    }

    pub fn start_absolute(&mut self, now: u32, modulus: u32, at: u32) -> ArrayVec<Action, MAX_EXPIRY_POINTS> {
        self.state = State::Running {
            anchor: at,
            next_index: 0,
        };
        self.tick(now, modulus)
    }

    pub fn stop(&mut self) {
        self.state = State::Stopped;
    }

    /// Realigns a running table's anchor to `now`, as if it had just been
    /// started at offset 0 — `Os_SchedTbl.c`'s `SyncScheduleTable`.
    pub fn sync(&mut self, now: u32) {
        if let State::Running { anchor, next_index } = &mut self.state {
            *anchor = now;
            *next_index = 0;
        }
    }

    /// Advances the table to counter value `now`, returning every action
    /// whose expiry point has been reached since the last call.
    pub fn tick(&mut self, now: u32, modulus: u32) -> ArrayVec<Action, MAX_EXPIRY_POINTS> {
        let mut fired = ArrayVec::new();
        let len = self.len();
        if len == 0 {
            return fired;
        }
        let (mut anchor, mut next_index) = match self.state {
            State::Running { anchor, next_index } => (anchor, next_index),
            State::Stopped => return fired,
        };
        let mut stopped = false;
        // Bounded by one full pass over the table per call; a table can
        // fire at most `len` points in a single tick.
        for _ in 0..len {
            let Some(ep) = self.config.expiry_points[next_index] else {
                break;
            };
            let target = (anchor + ep.offset) % modulus;
            if target != now {
                break;
            }
            fired.push(ep.action);
            next_index += 1;
            if next_index >= len {
                if self.config.period == 0 {
                    stopped = true;
                    break;
                }
                // Coalesce any whole periods missed since `anchor` in one
                // jump rather than replaying each.
                let elapsed = diff_wrap(anchor, now, modulus);
                let periods_elapsed = (elapsed / self.config.period).max(1);
                anchor = (anchor + periods_elapsed * self.config.period) % modulus;
                next_index = 0;
            }
        }
        self.state = if stopped {
            State::Stopped
        } else {
            State::Running { anchor, next_index }
        };
        fired
    }
}
