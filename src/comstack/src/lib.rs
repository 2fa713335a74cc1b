//! CAN communication stack: CanIf dispatch, PduR routing, COM signal
//! pack/unpack, one crate with one module per
//! sub-layer (matching how `r3_kernel` keeps `task`,
//! `event_group`, `mutex` as modules of one crate rather than separate
//! crates).

#![cfg_attr(not(feature = "host_test"), no_std)]

pub mod canif;
pub mod com;
pub mod limits;
pub mod pdur;
pub mod types;

use can_driver::CanDriver;
use os_kernel::{Arch, Result};

pub use canif::{CanIf, CanIfConfig, RoutingEntry as CanIfRoutingEntry, TxPduConfig};
pub use com::{Com, ComConfig, IPduConfig, SignalConfig};
pub use pdur::{PduR, PduRConfig, Route};
pub use types::{CanPduId, ComPduId, ControllerMode, Direction, PduMode, SignalId, SignalType};

/// The three sub-layers bundled behind one handle, mirroring how
/// `firmware/ecu` owns one `Kernel` singleton: `ComStack::trigger_send`
/// plays the role of the original `Com_TriggerIPDUSend` (which calls
/// `PduR_ComTransmit` directly), and `ComStack::on_can_rx`/
/// `on_can_tx_confirm` play the role of the `App_RxCallback`/
/// `App_TxConfirm` pair wired into `CanIf`'s configuration.
pub struct ComStack<A: Arch, D: CanDriver> {
    pub canif: CanIf<A, D>,
    pub pdur: PduR<A>,
    pub com: Com<A>,
}

impl<A: Arch, D: CanDriver> ComStack<A, D> {
    pub fn new(
        canif_config: &'static CanIfConfig,
        pdur_config: &'static PduRConfig,
        com_config: &'static ComConfig,
        driver: D,
    ) -> Result<Self> {
        let com = Com::new(com_config)?;
        let pdur = PduR::new(pdur_config);
        pdur.init();
        Ok(Self {
            canif: CanIf::new(canif_config, driver),
            pdur,
            com,
        })
    }

    /// `Com_TriggerIPDUSend`: snapshots the Tx shadow buffer and forwards
    /// it to the router.
    pub fn trigger_send(&self, ipdu: ComPduId) -> Result<()> {
        let (buf, len) = self.com.trigger_ipdu_send(ipdu)?;
        self.pdur.com_transmit(ipdu, &buf[..len], &self.canif)
    }

    /// Called by the driver's Rx ISR (wired in place of the original's
    /// `CanIf_RxIndication`/`App_RxCallback` pair): updates `CanIf`'s Rx
    /// buffer, then — via `CanIf`'s registered `rx_indication` callback —
    /// drives `PduR` and `Com` in turn. Call sites install
    /// [`Self::dispatch_rx_indication`] as that callback at configuration
    /// time; this method is the one a driver calls directly.
    pub fn on_can_rx(&self, can_id: can_driver::CanId, payload: &[u8]) {
        self.canif.rx_indication(can_id, payload);
    }

    /// Called by the driver's Tx-confirmation ISR with the upper-layer
    /// PDU id it was given at `transmit` time.
    pub fn on_can_tx_confirm(&self, pdu_id: CanPduId) {
        self.canif.tx_confirmation(pdu_id);
    }

    /// The actual cross-layer forwarding step for an Rx frame, run from
    /// `CanIf`'s `rx_indication` callback (installed in `CanIfConfig`).
    /// Split out from `on_can_rx` because the callback signature
    /// (`fn(CanPduId, &[u8])`) can't close over `&self.pdur`/`&self.com`;
    /// `firmware/ecu` binds this through a `'static` singleton the same
    /// way it binds `os_port_cm3`'s dispatch hooks.
    pub fn dispatch_rx_indication(&self, pdu_id: CanPduId, payload: &[u8]) {
        self.pdur.canif_rx_indication(pdu_id, payload, &self.com);
    }

    /// The actual cross-layer forwarding step for a Tx confirmation, run
    /// from `CanIf`'s `tx_confirmation` callback.
    pub fn dispatch_tx_confirmation(&self, pdu_id: CanPduId) {
        self.pdur.canif_tx_confirmation(pdu_id, &self.com);
    }
}
