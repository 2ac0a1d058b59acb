//! # Ports (Boundaries)
//!
//! The traits that isolate the conflict detection engine from the outside world.
//!
//! ## Driven by the engine
//! * **[`ArpTransmitter`]**: puts probes and announcements on the wire.
//! * **[`ConflictListener`]**: learns whether the claimed address can be used.
//! * **[`ConflictRecorder`]**: optionally keeps evidence of each conflict.
//!
//! ## Rules
//! 1. Every port is called inline, from inside `tick()` or the ARP router.
//! 2. Implementations must not block and must not call back into the engine.

use std::net::Ipv4Addr;

use acd_common::error::TransmitError;
use pnet::util::MacAddr;

/// Outcome of address conflict detection, as seen by the address owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcdEvent {
    /// Probing and announcing finished without conflict; the address may be used.
    AddressUsable,
    /// The address is (or is about to be) held by someone else. Stop using it.
    AddressDeclined,
    /// Acquisition may start over, with this or another address.
    RestartAcquisition,
}

/// Receives the [`AcdEvent`]s of one detector.
pub trait ConflictListener {
    fn on_event(&mut self, event: AcdEvent);
}

impl<F> ConflictListener for F
where
    F: FnMut(AcdEvent),
{
    fn on_event(&mut self, event: AcdEvent) {
        self(event)
    }
}

/// Sends ARP frames on one interface.
///
/// Only delivery to the driver is reported; the engine keeps its schedule
/// whatever the result.
pub trait ArpTransmitter {
    /// Broadcasts "who has `address`?" with an unspecified sender address.
    fn send_probe(&mut self, address: Ipv4Addr) -> Result<(), TransmitError>;

    /// Broadcasts an ARP request with `address` as both sender and target.
    fn send_announce(&mut self, address: Ipv4Addr) -> Result<(), TransmitError>;
}

/// Diagnostic store for the most recent conflicts.
///
/// `frame` is the raw ARP packet that proved the conflict.
pub trait ConflictRecorder {
    fn record(&mut self, peer: MacAddr, frame: &[u8]);
}

impl<F> ConflictRecorder for F
where
    F: FnMut(MacAddr, &[u8]),
{
    fn record(&mut self, peer: MacAddr, frame: &[u8]) {
        self(peer, frame)
    }
}
