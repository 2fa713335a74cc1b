//! The CAN peripheral driver boundary: a trait contract `CanIf` programs
//! against, plus a recording mock for host-side tests.
//!
//! Concrete register-level CAN silicon programming is an external
//! collaborator by design — this crate only specifies the shape of that
//! collaborator, grounded in the original
//! `Can_Write`/`Can_SetControllerMode`/`Can_GetControllerErrorState`
//! surface (`original_source/bsw/communication/canif/CanIf.c`'s `extern`
//! declarations).

#![cfg_attr(not(feature = "host_test"), no_std)]

use arrayvec::ArrayVec;

use os_kernel::{Result, StatusId};

/// Maximum classic-CAN payload length.
pub const MAX_FRAME_LEN: usize = 8;

/// An 11- or 29-bit CAN identifier, stored in its 32-bit host form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanId(pub u32);

impl CanId {
    pub const EXTENDED_MAX: u32 = 0x1FFF_FFFF;

    pub fn is_valid_extended(self) -> bool {
        self.0 <= Self::EXTENDED_MAX
    }
}

/// A hardware mailbox/handle the driver transmits through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwHandle(pub u8);

/// A frame ready to hand to the driver's transmit queue.
#[derive(Debug, Clone)]
pub struct CanFrame {
    pub id: CanId,
    pub data: ArrayVec<u8, MAX_FRAME_LEN>,
}

/// Controller receive/transmit error-counter state, as read back from
/// silicon (`Can_GetControllerErrorState`'s `Can_ErrorStateType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorState {
    Active,
    Passive,
    BusOff,
}

/// One of the four AUTOSAR CAN controller modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    Stopped,
    Started,
    Sleep,
    Wakeup,
}

/// The driver contract `comstack::canif::CanIf` is generic over. A real
/// port implements this against bxCAN/MCP25xx registers; host tests use
/// `MockCanDriver` below.
pub trait CanDriver {
    fn write(&self, hth: HwHandle, frame: &CanFrame) -> Result<()>;
    fn set_controller_mode(&self, controller: u8, mode: ControllerMode) -> Result<()>;
    fn controller_error_state(&self, controller: u8) -> Result<ErrorState>;
    fn set_baudrate(&self, controller: u8, baudrate_config_id: u16) -> Result<()>;
}

/// Host-side stand-in: every `write` succeeds and is recorded for
/// assertions; modes/baudrate calls always succeed.
#[cfg(feature = "host_test")]
pub mod mock {
    use super::*;
    use core::cell::RefCell;

    #[derive(Debug, Clone, Default)]
    pub struct SentFrame {
        pub hth: u8,
        pub id: u32,
        pub data: ArrayVec<u8, MAX_FRAME_LEN>,
    }

    #[derive(Default)]
    pub struct MockCanDriver {
        pub sent: RefCell<ArrayVec<SentFrame, 16>>,
        pub fail_writes: core::cell::Cell<bool>,
    }

    impl MockCanDriver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn last_sent(&self) -> Option<SentFrame> {
            self.sent.borrow().last().cloned()
        }
    }

    impl CanDriver for MockCanDriver {
        fn write(&self, hth: HwHandle, frame: &CanFrame) -> Result<()> {
            if self.fail_writes.get() {
                return Err(StatusId::NotOk);
            }
            let mut sent = self.sent.borrow_mut();
            if sent.is_full() {
                sent.remove(0);
            }
            sent.push(SentFrame {
                hth: hth.0,
                id: frame.id.0,
                data: frame.data.clone(),
            });
            Ok(())
        }

        fn set_controller_mode(&self, _controller: u8, _mode: ControllerMode) -> Result<()> {
            Ok(())
        }

        fn controller_error_state(&self, _controller: u8) -> Result<ErrorState> {
            Ok(ErrorState::Active)
        }

        fn set_baudrate(&self, _controller: u8, _baudrate_config_id: u16) -> Result<()> {
            Ok(())
        }
    }
}
