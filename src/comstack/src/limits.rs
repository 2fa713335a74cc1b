//! Fixed table capacities, carried over from the original `CanIf_Cfg.h`/
//! `Com_Cfg.h` macros (`CANIF_MAX_CONTROLLERS`, `CANIF_MAX_TX_PDUS`,
//! `CANIF_MAX_RX_PDUS`, `COM_NUM_IPDUS`, `COM_NUM_SIGNALS`) with headroom
//! for the second demo I-PDU pair the schedule-table workload adds.

pub const MAX_CAN_CONTROLLERS: usize = 1;
pub const MAX_CANIF_TX_PDUS: usize = 2;
pub const MAX_CANIF_RX_PDUS: usize = 2;
pub const MAX_ROUTING_ENTRIES: usize = 4;
pub const MAX_PDU_LEN: usize = can_driver::MAX_FRAME_LEN;

pub const MAX_COM_IPDUS: usize = 2;
pub const MAX_COM_SIGNALS: usize = 6;

pub const MAX_COM_TX_ROUTES: usize = 2;
pub const MAX_CANIF_RX_ROUTES: usize = 2;
pub const MAX_CANIF_TX_CONFIRM_ROUTES: usize = 2;
