//! PDU Router: three static 1:1 routing tables bridging the COM and
//! CanIf layers.
//!
//! Grounded in `PduR.c`: `PduR_ComTransmit` looks up `ComTxRoutingTable`
//! and forwards to `CanIf_Transmit`; `PduR_CanIfRxIndication` looks up
//! `CanIfRxRoutingTable` and forwards to `Com_RxIndication`;
//! `PduR_CanIfTxConfirmation` looks up `CanIfTxRoutingTable` and forwards
//! to `Com_TxConfirmation`. All three tables are simple linear-search
//! arrays, matching `prv_find_route`'s `O(n)` scan — these tables have at
//! most a handful of entries, so there is no reason to reach for anything
//! fancier.

use can_driver::CanDriver;
use os_kernel::{Arch, Result, StatusId};

use crate::canif::CanIf;
use crate::com::Com;
use crate::types::{CanPduId, ComPduId};

#[derive(Debug, Clone, Copy)]
pub struct Route<Src, Dst> {
    pub src: Src,
    pub dst: Dst,
}

pub struct PduRConfig {
    pub com_tx_routes: &'static [Route<ComPduId, CanPduId>],
    pub can_rx_routes: &'static [Route<CanPduId, ComPduId>],
    pub can_tx_confirm_routes: &'static [Route<CanPduId, ComPduId>],
}

fn find<Src: PartialEq + Copy, Dst: Copy>(table: &[Route<Src, Dst>], src: Src) -> Option<Dst> {
    table.iter().find(|r| r.src == src).map(|r| r.dst)
}

/// Online/enabled state. Grounded in `PduR_State`/`Routing_Enable`: a
/// route only runs while the router is online *and* routing is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninit,
    Online { routing_enabled: bool },
}

pub struct PduR<A: Arch> {
    config: &'static PduRConfig,
    state: os_kernel::klock::KCell<A, State>,
}

impl<A: Arch> PduR<A> {
    pub fn new(config: &'static PduRConfig) -> Self {
        Self {
            config,
            state: os_kernel::klock::KCell::new(State::Uninit),
        }
    }

    pub fn init(&self) {
        self.state.with(|s| *s = State::Online { routing_enabled: true });
    }

    pub fn enable_routing(&self) {
        self.state.with(|s| {
            if let State::Online { routing_enabled } = s {
                *routing_enabled = true;
            }
        });
    }

    /// `PduR_DisableRouting`. `clear_buffers` controls whether this also
    /// asks `CanIf`
    /// and `Com` to drop any buffered-but-unsent state for this route set,
    /// rather than being discarded as in the baseline (which always wrote
    /// `FALSE` into its own `initialize` parameter regardless of what the
    /// caller passed).
    pub fn disable_routing<D: CanDriver>(&self, clear_buffers: bool, canif: &CanIf<A, D>, com: &Com<A>) {
        let was_online = self.state.with(|s| {
            let was = matches!(s, State::Online { routing_enabled: true });
            if let State::Online { routing_enabled } = s {
                *routing_enabled = false;
            }
            was
        });
        if was_online && clear_buffers {
            canif.deinit();
            com.clear_buffers();
        }
    }

    fn online_and_enabled(&self) -> bool {
        matches!(self.state.with(|s| *s), State::Online { routing_enabled: true })
    }

    /// `PduR_ComTransmit`, called by `Com::trigger_ipdu_send`.
    pub fn com_transmit<D: CanDriver>(&self, src: ComPduId, payload: &[u8], canif: &CanIf<A, D>) -> Result<()> {
        if !self.online_and_enabled() {
            return Err(StatusId::NotOk);
        }
        let dst = find(self.config.com_tx_routes, src).ok_or(StatusId::NotOk)?;
        canif.transmit(dst, payload)
    }

    /// `PduR_CanIfRxIndication`, called by `CanIf::rx_indication`'s
    /// registered callback. A routing miss is silently dropped, same as
    /// the baseline — there is no caller above the driver ISR to receive
    /// an error.
    pub fn canif_rx_indication(&self, src: CanPduId, payload: &[u8], com: &Com<A>) {
        if !self.online_and_enabled() {
            return;
        }
        let Some(dst) = find(self.config.can_rx_routes, src) else {
            return;
        };
        com.rx_indication(dst, payload);
    }

    /// `PduR_CanIfTxConfirmation`, called by `CanIf::tx_confirmation`'s
    /// registered callback.
    pub fn canif_tx_confirmation(&self, src: CanPduId, com: &Com<A>) {
        if !self.online_and_enabled() {
            return;
        }
        let Some(dst) = find(self.config.can_tx_confirm_routes, src) else {
            return;
        };
        com.tx_confirmation(dst);
    }
}
