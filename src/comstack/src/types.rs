//! Distinct id newtypes and shared wire-level types for the three CAN
//! stack layers, following the same discipline as `os_kernel::id`: a bare
//! `u8` would let a COM-layer I-PDU id slip into a CanIf-layer PDU id
//! parameter, which the original C baseline — where both are a bare
//! `PduIdType` — does not prevent.

use os_kernel::{Result, StatusId};

macro_rules! define_id {
    ($name:ident, $max:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u8);

        impl $name {
            pub const fn new_unchecked(raw: u8) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u8 {
                self.0
            }

            pub const fn index(self) -> usize {
                self.0 as usize
            }

            pub fn checked(raw: u8, len: usize) -> Result<Self> {
                if (raw as usize) < len && (raw as usize) <= $max {
                    Ok(Self(raw))
                } else {
                    Err(StatusId::InvalidId)
                }
            }
        }
    };
}

/// A signal id at the COM layer (`Com_SignalIdType`).
define_id!(SignalId, crate::limits::MAX_COM_SIGNALS);
/// An I-PDU id at the COM layer (`ComConf_ComIPdu_*`).
define_id!(ComPduId, crate::limits::MAX_COM_IPDUS);
/// A PDU id at the CanIf layer — distinct id spaces for Tx and Rx, exactly
/// as the original's separate `numTxPdus`/`numRxPdus` counters imply; which
/// space a given `CanPduId` indexes into is determined by the direction it
/// is used in (`CanIf::transmit` takes a Tx-space id, `CanIf::read_rx` a
/// Rx-space id).
define_id!(CanPduId, crate::limits::MAX_CANIF_TX_PDUS);

/// Direction of an I-PDU or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

/// COM signal semantic type (`Com_SignalType_e`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    UnsignedByte,
    Boolean,
    UnsignedHalfWord,
}

/// One CAN controller's operating mode (`CanIf_ControllerModeType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    Stopped,
    Started,
    Sleep,
    Wakeup,
}

/// Per-PDU online/offline mode (`CanIf_PduModeType`). Transmission is only
/// permitted while a Tx PDU's mode includes the Tx direction (`Online` or
/// `TxOnline`); likewise for Rx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduMode {
    Offline,
    TxOffline,
    RxOffline,
    Online,
    TxOnline,
    RxOnline,
}

impl PduMode {
    pub fn permits_tx(self) -> bool {
        matches!(self, PduMode::Online | PduMode::TxOnline)
    }

    pub fn permits_rx(self) -> bool {
        matches!(self, PduMode::Online | PduMode::RxOnline)
    }
}
