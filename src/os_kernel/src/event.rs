//! Event service: binary-semaphore-like flags, extended tasks only.
//!
//! Grounded in `Os_Event.c`'s `SetEvent`/`WaitEvent`/`GetEvent`/
//! `ClearEvent`. Events are only meaningful for extended tasks (those with
//! `is_extended` set in their `TaskConfig`); `WaitEvent` blocks the calling
//! task until at least one of the requested bits is set, `SetEvent` is
//! callable from an ISR (ultimately anything that can take the kernel's
//! critical section) and re-readies a task that was waiting on a bit it
//! just set.

use bitflags::bitflags;

bitflags! {
    /// Matches the original's `EV_RX = 0x0001`, `EV_TX = 0x0002` layout;
    /// `firmware/ecu` defines the full application bit assignment.
    #[derive(Default)]
    pub struct EventMask: u16 {
        const EV_RX = 0x0001;
        const EV_TX = 0x0002;
    }
}

/// Per-task event bookkeeping, embedded in `TaskCb`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventState {
    /// Bits currently set, pending consumption.
    pub pending: EventMask,
    /// Bits the task is blocked on, if it is in `Waiting` state. `None`
    /// when the task isn't inside a `WaitEvent` call.
    pub wait_mask: Option<EventMask>,
}

impl EventState {
    pub const fn new() -> Self {
        Self {
            pending: EventMask::empty(),
            wait_mask: None,
        }
    }

    /// Returns `true` if setting `mask` satisfies an outstanding wait,
    /// i.e. the task should be moved back to the ready queue.
    pub fn set(&mut self, mask: EventMask) -> bool {
        self.pending |= mask;
        match self.wait_mask {
            Some(waiting_on) if self.pending.intersects(waiting_on) => {
                self.wait_mask = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self, mask: EventMask) {
        self.pending.remove(mask);
    }

    pub fn get(&self) -> EventMask {
        self.pending
    }
}

#[cfg(all(test, feature = "host_test"))]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn set_then_clear_round_trips_to_empty(mask: u16) -> bool {
        let mut ev = EventState::new();
        let mask = EventMask::from_bits_truncate(mask);
        ev.set(mask);
        ev.clear(mask);
        ev.get().is_empty()
    }

    #[quickcheck]
    fn clearing_bits_outside_the_mask_is_unaffected(pending: u16, mask: u16) -> bool {
        let pending = EventMask::from_bits_truncate(pending);
        let mask = EventMask::from_bits_truncate(mask);
        let mut ev = EventState::new();
        ev.set(pending);
        ev.clear(mask);
        ev.get() == pending & !mask
    }

    #[test]
    fn set_wakes_a_task_waiting_on_an_intersecting_bit() {
        let mut ev = EventState::new();
        ev.wait_mask = Some(EventMask::EV_TX);
        assert!(!ev.set(EventMask::EV_RX));
        assert!(ev.set(EventMask::EV_TX));
        assert!(ev.wait_mask.is_none());
    }
}
