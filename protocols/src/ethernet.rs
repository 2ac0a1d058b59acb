use pnet::packet::ethernet::{EtherType, MutableEthernetPacket};
use pnet::util::MacAddr;

use crate::{ETH_HDR_LEN, FrameError};

pub fn make_header(
    buffer: &mut [u8],
    src_mac: MacAddr,
    dst_mac: MacAddr,
    ethertype: EtherType,
) -> Result<(), FrameError> {
    let mut eth = MutableEthernetPacket::new(buffer).ok_or(FrameError::Buffer(ETH_HDR_LEN))?;
    eth.set_source(src_mac);
    eth.set_destination(dst_mac);
    eth.set_ethertype(ethertype);
    Ok(())
}



// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
