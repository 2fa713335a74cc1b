//! IOC (inter-object communication) queue: a multi-receiver ring buffer.
//!
//! Grounded in `Os_Ioc.c`'s `Ioc_Init`/`Ioc_Send`/`Ioc_Receive`: a single
//! ring buffer of `IOC_BUFFER_SIZE` slots is shared by up to
//! `MAX_IOC_RECEIVERS` readers, each with its own read cursor and its own
//! task identity (the channel's receiver list, `spec.md` §3). A send that
//! would overflow the buffer drops the oldest unread-by-anyone element
//! (every receiver's cursor is advanced in lockstep so no cursor is left
//! pointing at a dropped slot), then raises the fixed `EV_RX` bit on every
//! registered receiver task (`Ioc_Send`'s `SetEvent(I->receivers[i],
//! EV_RX)` loop) so a blocked `WaitEvent` caller wakes on write; a
//! successful `Ioc_Receive` clears that same bit on its own receiver.

use arrayvec::ArrayVec;

use crate::error::StatusId;
use crate::id::TaskId;
use crate::limits::{IOC_RING_CAPACITY, MAX_IOC_RECEIVERS};

#[derive(Debug, Clone, Copy)]
pub struct IocChannelConfig {}

#[derive(Debug, Clone, Copy, Default)]
struct Receiver {
    /// The task this slot wakes and delivers to, once registered.
    task: Option<TaskId>,
    /// Number of elements already consumed, counted from the channel's
    /// lifetime start (monotonic, compared against `written`).
    read: u32,
}

#[derive(Debug)]
pub struct IocChannel {
    pub config: IocChannelConfig,
    buffer: ArrayVec<u32, IOC_RING_CAPACITY>,
    /// Sequence number of `buffer[0]`, i.e. how many elements have been
    /// dropped or fully consumed and evicted so far.
    base_seq: u32,
    written: u32,
    receivers: [Receiver; MAX_IOC_RECEIVERS],
}

impl IocChannel {
    pub const fn new(config: IocChannelConfig) -> Self {
        Self {
            config,
            buffer: ArrayVec::new_const(),
            base_seq: 0,
            written: 0,
            receivers: [Receiver { task: None, read: 0 }; MAX_IOC_RECEIVERS],
        }
    }

    pub fn register_receiver(&mut self, slot: usize, task: TaskId) -> Result<(), StatusId> {
        let r = self.receivers.get_mut(slot).ok_or(StatusId::InvalidId)?;
        if r.task.is_some() {
            return Err(StatusId::InvalidState);
        }
        r.task = Some(task);
        r.read = self.written;
        Ok(())
    }

    /// Pushes `value`. If the ring is full, the oldest slot is dropped and
    /// every receiver's cursor is clamped forward so none points before
    /// the new oldest element (lockstep oldest-drop).
    pub fn send(&mut self, value: u32) {
        if self.buffer.is_full() {
            self.buffer.remove(0);
            self.base_seq += 1;
            for r in self.receivers.iter_mut() {
                if r.task.is_some() && r.read < self.base_seq {
                    r.read = self.base_seq;
                }
            }
        }
        self.buffer.push(value);
        self.written += 1;
    }

    /// Every registered receiver's task, to raise the wake-on-write event
    /// on after a successful send.
    pub fn registered_receivers(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.receivers.iter().filter_map(|r| r.task)
    }

    /// The task bound to `slot`, if any, so a caller can clear its event
    /// bit after a successful read.
    pub fn receiver_task(&self, slot: usize) -> Option<TaskId> {
        self.receivers.get(slot).and_then(|r| r.task)
    }

    pub fn receive(&mut self, slot: usize) -> Result<u32, StatusId> {
        let r = self.receivers.get_mut(slot).ok_or(StatusId::InvalidId)?;
        if r.task.is_none() {
            return Err(StatusId::InvalidState);
        }
        if r.read >= self.written {
            return Err(StatusId::NoData);
        }
        let idx = (r.read - self.base_seq) as usize;
        let value = self.buffer[idx];
        r.read += 1;
        Ok(value)
    }
}

#[cfg(all(test, feature = "host_test"))]
mod tests {
    use super::*;

    const RECEIVER_B: TaskId = TaskId::new_unchecked(1);
    const RECEIVER_C: TaskId = TaskId::new_unchecked(2);

    fn channel() -> IocChannel {
        let mut ch = IocChannel::new(IocChannelConfig {});
        ch.register_receiver(0, RECEIVER_B).unwrap();
        ch.register_receiver(1, RECEIVER_C).unwrap();
        ch
    }

    /// Capacity 4, receivers {B, C}: five writes overflow by one, so both
    /// receivers see 11..14 (10 dropped) rather than 10..13.
    #[test]
    fn fan_out_with_overflow_drops_the_oldest_for_every_receiver() {
        let mut ch = channel();
        for v in 10..15 {
            ch.send(v);
        }
        for slot in [0usize, 1] {
            let mut got = [0u32; 4];
            for g in got.iter_mut() {
                *g = ch.receive(slot).unwrap();
            }
            assert_eq!(got, [11, 12, 13, 14]);
            assert_eq!(ch.receive(slot).unwrap_err(), StatusId::NoData);
        }
    }

    #[test]
    fn receive_before_any_send_is_no_data() {
        let mut ch = channel();
        assert_eq!(ch.receive(0).unwrap_err(), StatusId::NoData);
    }

    #[test]
    fn an_unregistered_slot_is_rejected() {
        let mut ch = IocChannel::new(IocChannelConfig {});
        assert_eq!(ch.receive(0).unwrap_err(), StatusId::InvalidState);
    }

    #[test]
    fn send_reports_every_registered_receiver_task() {
        let mut ch = channel();
        ch.send(1);
        let woken: ArrayVec<TaskId, MAX_IOC_RECEIVERS> = ch.registered_receivers().collect();
        assert_eq!(woken.as_slice(), &[RECEIVER_B, RECEIVER_C]);
    }

    #[test]
    fn each_receiver_sees_every_element_independently() {
        let mut ch = channel();
        ch.send(1);
        assert_eq!(ch.receive(0).unwrap(), 1);
        // Receiver 1 hasn't read yet: its cursor is untouched by
        // receiver 0's read.
        ch.send(2);
        assert_eq!(ch.receive(1).unwrap(), 1);
        assert_eq!(ch.receive(1).unwrap(), 2);
        assert_eq!(ch.receive(0).unwrap(), 2);
    }
}
