//! Software-component runnables: the application layer a concrete ECU
//! schedules every 10 ms, each wired purely against `rte`'s ports.
//!
//! Grounded in `Swc_PedalAcq.c`/`Swc_BrakeAcq.c`/`Swc_GearSelector.c`/
//! `Swc_DriveModeMgr.c`/`Swc_SafetyManager.c`/`Swc_CmdComposer.c`: every one
//! of those files follows the same shape — a one-time `*_Init` that seeds
//! internal state and writes a safe default out, then a `*_Run10ms` called
//! from the periodic task that reads its inputs through RTE, applies some
//! physical-signal shaping, and writes its output back through RTE. The
//! shaping itself (EMA filtering in pedal acquisition, switch debouncing in
//! brake/gear/drive-mode acquisition, gear-interlock and brake-override
//! arbitration and miss-counting timeout fallback in the safety manager,
//! signal composition and alive-counter wraparound in the command composer)
//! is the specific physical-signal behaviour out of scope here: each
//! `run_10ms` below is a pass-through stand-in a full port would replace
//! with that shaping, kept thin enough to show the wiring it sits in.

#![cfg_attr(not(feature = "host_test"), no_std)]

use can_driver::CanDriver;
use iohwab::{DriveMode, Gear, IoHwAb};
use os_kernel::Arch;
use rte::{Rte, SafetyCommand};

/// `Swc_PedalAcq`: reads the raw pedal channel and republishes it as the
/// `PedalOut` SR signal. A full port would apply the EMA smoothing filter
/// here; this just forwards the raw reading.
pub struct PedalAcq;

impl PedalAcq {
    pub fn init() {}

    pub fn run_10ms<A: Arch, D: CanDriver, IO: IoHwAb>(rte: &Rte<A, D, IO>) {
        if let Ok(pct) = rte.call_read_pedal_raw() {
            rte.write_pedal_out(pct);
        }
    }
}

/// `Swc_BrakeAcq`: reads the raw brake-pressed channel and republishes it.
/// A full port would debounce the switch here.
pub struct BrakeAcq;

impl BrakeAcq {
    pub fn init() {}

    pub fn run_10ms<A: Arch, D: CanDriver, IO: IoHwAb>(rte: &Rte<A, D, IO>) {
        if let Ok(pressed) = rte.call_read_brake_raw() {
            rte.write_brake_out(pressed);
        }
    }
}

/// `Swc_GearSelector`: reads the raw gear-selector channel and republishes
/// the decoded gear when the reading is valid. A full port would debounce
/// the selector's transient states here.
pub struct GearSelector;

impl GearSelector {
    pub fn init() {}

    pub fn run_10ms<A: Arch, D: CanDriver, IO: IoHwAb>(rte: &Rte<A, D, IO>) {
        if let Ok((gear, valid)) = rte.call_read_gear_raw() {
            if valid {
                rte.write_gear_out(gear);
            }
        }
    }
}

/// `Swc_DriveModeMgr`: reads the raw drive-mode switch and republishes it
/// through the mode-management port. A full port would debounce the
/// switch and gate the write behind a confirmed switch-stable period.
pub struct DriveModeMgr;

impl DriveModeMgr {
    pub fn init() {}

    pub fn run_10ms<A: Arch, D: CanDriver, IO: IoHwAb>(rte: &Rte<A, D, IO>) {
        if let Ok(mode) = rte.call_read_mode_raw() {
            rte.write_drive_mode_out(mode);
        }
    }
}

/// `Swc_SafetyManager`: reads every acquisition SWC's SR output and
/// republishes a `SafetyCommand`. A full port would apply the gear
/// interlock (P<->R/D requires brake), brake-override throttle clamp, and
/// miss-counting timeout fallback here; this stand-in passes the latest
/// available readings through unconstrained, falling back to the last
/// known-safe command for any input that has never arrived.
pub struct SafetyManager;

impl SafetyManager {
    pub fn init() {}

    pub fn run_10ms<A: Arch, D: CanDriver, IO: IoHwAb>(rte: &Rte<A, D, IO>) {
        let fallback = rte.read_safe_out().unwrap_or_default();
        let throttle_pct = rte.read_pedal_out().unwrap_or(fallback.throttle_pct);
        let brake_active = rte.read_brake_out().unwrap_or(fallback.brake_active);
        let gear = rte.read_gear_out().unwrap_or(fallback.gear);
        let drive_mode = rte.read_drive_mode_out();

        rte.write_safe_out(SafetyCommand {
            throttle_pct,
            gear,
            drive_mode,
            brake_active,
        });
    }
}

fn gear_to_u8(g: Gear) -> u8 {
    match g {
        Gear::P => 0,
        Gear::R => 1,
        Gear::N => 2,
        Gear::D => 3,
    }
}

fn mode_to_u8(m: DriveMode) -> u8 {
    match m {
        DriveMode::Eco => 0,
        DriveMode::Normal => 1,
    }
}

/// `Swc_CmdComposer`: reads the safety manager's arbitrated command, maps
/// it onto the wire encoding, and triggers the VCU_Command transmission.
/// Owns the 4-bit alive counter, the one piece of state this SWC must
/// keep between cycles since it counts cycles rather than reflecting any
/// single upstream signal.
pub struct CmdComposer {
    alive: u8,
}

impl CmdComposer {
    pub const fn new() -> Self {
        Self { alive: 0 }
    }

    pub fn init(&mut self) {
        self.alive = 0;
    }

    pub fn run_10ms<A: Arch, D: CanDriver, IO: IoHwAb>(&mut self, rte: &Rte<A, D, IO>) {
        let cmd = rte.read_safe_out().unwrap_or_default();

        rte.write_vcu_cmd_throttle(cmd.throttle_pct.min(100));
        rte.write_vcu_cmd_gear(gear_to_u8(cmd.gear));
        rte.write_vcu_cmd_drive_mode(mode_to_u8(cmd.drive_mode));
        rte.write_vcu_cmd_brake_active(cmd.brake_active);
        rte.write_vcu_cmd_alive_counter(self.alive);

        let _ = rte.trigger_vcu_command();

        self.alive = (self.alive + 1) & 0x0F;
    }
}

impl Default for CmdComposer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "host_test"))]
mod tests {
    use super::*;
    use can_driver::mock::MockCanDriver;
    use comstack::{
        CanIfConfig, ComConfig, ComPduId, ComStack, Direction, IPduConfig, PduRConfig, SignalConfig,
        SignalId, SignalType,
    };
    use iohwab::mock::MockIoHwAb;
    use os_kernel::host::HostArch;
    use rte::RteSignalIds;

    static CANIF_CFG: CanIfConfig = CanIfConfig {
        num_controllers: 1,
        num_tx_pdus: 0,
        num_rx_pdus: 0,
        tx_pdus: &[],
        routing: &[],
        rx_indication: None,
        tx_confirmation: None,
    };
    static PDUR_CFG: PduRConfig = PduRConfig {
        com_tx_routes: &[],
        can_rx_routes: &[],
        can_tx_confirm_routes: &[],
    };
    static IPDUS: [IPduConfig; 2] = [
        IPduConfig {
            id: ComPduId::new_unchecked(0),
            length: 5,
            direction: Direction::Tx,
        },
        IPduConfig {
            id: ComPduId::new_unchecked(1),
            length: 2,
            direction: Direction::Rx,
        },
    ];
    static SIGNALS: [SignalConfig; 6] = [
        SignalConfig {
            ipdu: ComPduId::new_unchecked(0),
            byte_offset: 0,
            bit_offset: 0,
            bit_length: 8,
            ty: SignalType::UnsignedByte,
            direction: Direction::Tx,
        },
        SignalConfig {
            ipdu: ComPduId::new_unchecked(0),
            byte_offset: 1,
            bit_offset: 0,
            bit_length: 8,
            ty: SignalType::UnsignedByte,
            direction: Direction::Tx,
        },
        SignalConfig {
            ipdu: ComPduId::new_unchecked(0),
            byte_offset: 2,
            bit_offset: 0,
            bit_length: 8,
            ty: SignalType::UnsignedByte,
            direction: Direction::Tx,
        },
        SignalConfig {
            ipdu: ComPduId::new_unchecked(0),
            byte_offset: 3,
            bit_offset: 0,
            bit_length: 8,
            ty: SignalType::Boolean,
            direction: Direction::Tx,
        },
        SignalConfig {
            ipdu: ComPduId::new_unchecked(0),
            byte_offset: 4,
            bit_offset: 0,
            bit_length: 4,
            ty: SignalType::UnsignedByte,
            direction: Direction::Tx,
        },
        SignalConfig {
            ipdu: ComPduId::new_unchecked(1),
            byte_offset: 0,
            bit_offset: 0,
            bit_length: 16,
            ty: SignalType::UnsignedHalfWord,
            direction: Direction::Rx,
        },
    ];
    static COM_CFG: ComConfig = ComConfig {
        ipdus: &IPDUS,
        signals: &SIGNALS,
    };

    fn build() -> (ComStack<HostArch, MockCanDriver>, MockIoHwAb, RteSignalIds) {
        let comstack = ComStack::new(&CANIF_CFG, &PDUR_CFG, &COM_CFG, MockCanDriver::default())
            .expect("valid config");
        let io = MockIoHwAb::default();
        let signals = RteSignalIds {
            throttle: SignalId::new_unchecked(0),
            gear: SignalId::new_unchecked(1),
            drive_mode: SignalId::new_unchecked(2),
            brake_active: SignalId::new_unchecked(3),
            alive: SignalId::new_unchecked(4),
            engine_speed: SignalId::new_unchecked(5),
            vcu_command_ipdu: ComPduId::new_unchecked(0),
        };
        (comstack, io, signals)
    }

    #[test]
    fn pedal_acq_forwards_raw_reading() {
        let (comstack, io, signals) = build();
        io.pedal_pct.set(42);
        let rte = Rte::new(&io, &comstack, signals);
        PedalAcq::run_10ms(&rte);
        assert_eq!(rte.read_pedal_out(), Some(42));
    }

    #[test]
    fn safety_manager_falls_back_when_nothing_has_arrived_yet() {
        let (comstack, io, signals) = build();
        let rte = Rte::new(&io, &comstack, signals);
        SafetyManager::run_10ms(&rte);
        let cmd = rte.read_safe_out().expect("safety manager always writes");
        assert_eq!(cmd.throttle_pct, 0);
        assert_eq!(cmd.gear, Gear::P);
    }

    #[test]
    fn cmd_composer_wraps_alive_counter_and_triggers_send() {
        let (comstack, io, signals) = build();
        let rte = Rte::new(&io, &comstack, signals);
        SafetyManager::run_10ms(&rte);

        let mut composer = CmdComposer::new();
        for _ in 0..20 {
            composer.run_10ms(&rte);
        }
        assert_eq!(composer.alive, 4);
    }
}
