//! The three outbound queues: broadcast-to-all, broadcast-excluding-one,
//! and explicit target lists.
//!
//! FIFO order holds within each queue; the flush phase empties them in
//! the fixed order broadcast, excluded, targeted, so cross-queue order
//! is not a guarantee anyone should rely on.
//!
//! Entries carry fully encoded wire bytes. Encoding happens on whichever
//! thread enqueues, keeping the Host Loop's send phase a pure pump.

use crossbeam_channel::{Receiver, Sender, unbounded};
use netforge_protocol::{ClientId, Reliability};

pub(crate) struct Broadcast {
    pub data: Vec<u8>,
    pub reliability: Reliability,
}

pub(crate) struct Excluded {
    pub excluded: ClientId,
    pub data: Vec<u8>,
    pub reliability: Reliability,
}

pub(crate) struct Targeted {
    pub targets: Vec<ClientId>,
    pub data: Vec<u8>,
    pub reliability: Reliability,
}

#[derive(Clone)]
pub(crate) struct OutboundTx {
    pub broadcast: Sender<Broadcast>,
    pub excluded: Sender<Excluded>,
    pub targeted: Sender<Targeted>,
}

pub(crate) struct OutboundRx {
    pub broadcast: Receiver<Broadcast>,
    pub excluded: Receiver<Excluded>,
    pub targeted: Receiver<Targeted>,
}

pub(crate) fn outbound() -> (OutboundTx, OutboundRx) {
    let (broadcast_tx, broadcast_rx) = unbounded();
    let (excluded_tx, excluded_rx) = unbounded();
    let (targeted_tx, targeted_rx) = unbounded();
    (
        OutboundTx {
            broadcast: broadcast_tx,
            excluded: excluded_tx,
            targeted: targeted_tx,
        },
        OutboundRx {
            broadcast: broadcast_rx,
            excluded: excluded_rx,
            targeted: targeted_rx,
        },
    )
}
