//! ARP frames as RFC 5227 uses them.
//!
//! Both probes and announcements are broadcast ARP *requests*; they differ only
//! in the sender protocol address. A probe leaves it unspecified so that no
//! neighbour caches an address we do not own yet.

use std::net::Ipv4Addr;

use pnet::packet::arp::{ArpHardwareTypes, ArpOperations, ArpPacket, MutableArpPacket};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::util::MacAddr;

use crate::{ARP_LEN, ETH_HDR_LEN, FrameError, MIN_ETH_FRAME_NO_FCS, ethernet};

/// "Does anyone hold `address`?" (sender IP 0.0.0.0).
pub fn probe_frame(src_mac: MacAddr, address: Ipv4Addr) -> Result<Vec<u8>, FrameError> {
    create_packet(src_mac, Ipv4Addr::UNSPECIFIED, address)
}

/// "`address` is mine" (sender IP = target IP = `address`).
pub fn announce_frame(src_mac: MacAddr, address: Ipv4Addr) -> Result<Vec<u8>, FrameError> {
    create_packet(src_mac, address, address)
}

fn create_packet(src_mac: MacAddr, src_addr: Ipv4Addr, dst_addr: Ipv4Addr) -> Result<Vec<u8>, FrameError> {
    let mut buffer = [0u8; MIN_ETH_FRAME_NO_FCS];
    ethernet::make_header(&mut buffer, src_mac, MacAddr::broadcast(), EtherTypes::Arp)?;
    let mut arp_packet = MutableArpPacket::new(&mut buffer[ETH_HDR_LEN..ETH_HDR_LEN + ARP_LEN])
        .ok_or(FrameError::Buffer(MIN_ETH_FRAME_NO_FCS))?;
    arp_packet.set_hardware_type(ArpHardwareTypes::Ethernet);
    arp_packet.set_protocol_type(EtherTypes::Ipv4);
    arp_packet.set_hw_addr_len(6);
    arp_packet.set_proto_addr_len(4);
    arp_packet.set_operation(ArpOperations::Request);
    arp_packet.set_sender_hw_addr(src_mac);
    arp_packet.set_target_hw_addr(MacAddr::zero());
    arp_packet.set_sender_proto_addr(src_addr);
    arp_packet.set_target_proto_addr(dst_addr);
    Ok(Vec::from(buffer))
}

/// Extracts the ARP packet from a raw Ethernet frame.
///
/// Requests and replies are both accepted; conflict detection cares about who
/// speaks, not about the operation.
pub fn parse_frame(frame: &[u8]) -> Result<ArpPacket<'_>, FrameError> {
    let eth = EthernetPacket::new(frame).ok_or(FrameError::Ethernet(frame.len()))?;
    let ethertype = eth.get_ethertype();
    if ethertype != EtherTypes::Arp {
        return Err(FrameError::NotArp(ethertype.0));
    }

    let payload = &frame[ETH_HDR_LEN..];
    let arp = ArpPacket::new(payload).ok_or(FrameError::Arp(payload.len()))?;
    if arp.get_hardware_type() != ArpHardwareTypes::Ethernet
        || arp.get_protocol_type() != EtherTypes::Ipv4
        || arp.get_hw_addr_len() != 6
        || arp.get_proto_addr_len() != 4
    {
        return Err(FrameError::Unsupported);
    }
    Ok(arp)
}



// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
