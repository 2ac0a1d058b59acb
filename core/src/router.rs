//! Conflict rules applied to every ARP packet seen on an interface.
//!
//! The engine fans each packet out to all detectors of the interface: a single
//! frame can be evidence against several addresses probed at the same time.

use std::net::Ipv4Addr;

use pnet::packet::arp::ArpPacket;
use pnet::util::MacAddr;

use crate::detector::AcdState;

/// The parts of an ARP packet that matter for conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpObservation {
    pub sender_ip: Ipv4Addr,
    pub sender_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl From<&ArpPacket<'_>> for ArpObservation {
    fn from(arp: &ArpPacket<'_>) -> Self {
        Self {
            sender_ip: arp.get_sender_proto_addr(),
            sender_mac: arp.get_sender_hw_addr(),
            target_ip: arp.get_target_proto_addr(),
        }
    }
}

/// Whether `observation` proves a conflict for a detector in `state` claiming `address`.
///
/// Until the first announcement (RFC 5227 §2.1.1) a conflict is another host
/// either using the address or probing for it. From then on (§2.4) only
/// another host using the address counts. Our own frames never count.
pub fn is_conflict(state: AcdState, address: Ipv4Addr, observation: &ArpObservation, own_mac: MacAddr) -> bool {
    if observation.sender_mac == own_mac {
        return false;
    }

    let uses_address = observation.sender_ip == address;
    let probes_address = observation.sender_ip.is_unspecified() && observation.target_ip == address;

    if state.is_probing() {
        uses_address || probes_address
    } else if state.is_claimed() {
        uses_address
    } else {
        false
    }
}



// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
