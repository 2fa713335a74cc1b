//! I/O hardware abstraction boundary: the "I/O hardware abstraction"
//! external collaborator.
//!
//! Grounded in `IoHwAb_Pedal.c`/`IoHwAb_Brake.c`/`IoHwAb_Gear.c`/
//! `IoHwAb_Mode.c`: each function owns exactly one physical signal and
//! returns a normalized application-level value, hiding the ADC/DIO
//! channel underneath. Concrete peripheral register programming is out of
//! scope here — this crate only specifies the contract
//! `rte` programs against, plus a programmable host-side mock.

#![cfg_attr(not(feature = "host_test"), no_std)]

use os_kernel::Result;

/// Gear selector position, decoded from the two-bit DIO encoding in
/// `IoHwAb_Gear_Get` (`00=P, 01=R, 10=N, 11=D`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gear {
    P,
    R,
    N,
    D,
}

/// Drive mode switch position (`IoHwAb_Mode_Get`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Eco,
    Normal,
}

/// The four read operations this collaborator exposes.
/// Each returns `Err` only when the underlying channel read itself
/// failed; an out-of-range DIO encoding is reported through the `bool`
/// validity flag on `read_gear`, not as an `Err`, matching
/// `IoHwAb_Gear_Get`'s `valid` out-parameter.
pub trait IoHwAb {
    fn read_pedal_percent(&self) -> Result<u8>;
    fn read_brake_pressed(&self) -> Result<bool>;
    fn read_gear(&self) -> Result<(Gear, bool)>;
    fn read_drive_mode(&self) -> Result<DriveMode>;
}

/// Host-side stand-in: every channel is a plain settable cell, read back
/// as-is. Used by `rte`'s and `swc`'s host tests in place of a board.
#[cfg(feature = "host_test")]
pub mod mock {
    use super::*;
    use core::cell::Cell;

    pub struct MockIoHwAb {
        pub pedal_pct: Cell<u8>,
        pub brake_pressed: Cell<bool>,
        pub gear: Cell<(Gear, bool)>,
        pub drive_mode: Cell<DriveMode>,
    }

    impl Default for MockIoHwAb {
        fn default() -> Self {
            Self {
                pedal_pct: Cell::new(0),
                brake_pressed: Cell::new(false),
                gear: Cell::new((Gear::P, true)),
                drive_mode: Cell::new(DriveMode::Eco),
            }
        }
    }

    impl IoHwAb for MockIoHwAb {
        fn read_pedal_percent(&self) -> Result<u8> {
            Ok(self.pedal_pct.get())
        }

        fn read_brake_pressed(&self) -> Result<bool> {
            Ok(self.brake_pressed.get())
        }

        fn read_gear(&self) -> Result<(Gear, bool)> {
            Ok(self.gear.get())
        }

        fn read_drive_mode(&self) -> Result<DriveMode> {
            Ok(self.drive_mode.get())
        }
    }
}
