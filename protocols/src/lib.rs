//! Wire formats for address conflict detection: ARP probes, ARP announcements
//! and the parsing of whatever ARP traffic the link hands back to us.

pub mod arp;
pub mod ethernet;

use thiserror::Error;

pub const ETH_HDR_LEN: usize = 14;
pub const ARP_LEN: usize = 28;
pub const MIN_ETH_FRAME_NO_FCS: usize = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("buffer of {0} bytes is too small for the frame")]
    Buffer(usize),
    #[error("truncated or invalid ethernet frame (len {0})")]
    Ethernet(usize),
    #[error("not an ARP frame (ethertype {0:#06x})")]
    NotArp(u16),
    #[error("truncated or invalid ARP packet (payload len {0})")]
    Arp(usize),
    #[error("ARP packet is not Ethernet/IPv4")]
    Unsupported,
}
