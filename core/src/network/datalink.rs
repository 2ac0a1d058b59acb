//! pnet datalink plumbing: a raw Ethernet channel whose sending half becomes
//! an [`ArpTransmitter`] and whose receiving half feeds ARP frames into an
//! async queue.

use std::io;
use std::net::Ipv4Addr;
use std::thread::JoinHandle;
use std::time::Duration;

use acd_common::error::TransmitError;
use acd_protocols::{FrameError, arp};
use anyhow::{Context, bail};
use pnet::datalink::{self, Channel, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};
use pnet::packet::ethernet::{EtherTypes, EthernetPacket};
use pnet::util::MacAddr;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const READ_TIMEOUT_MS: u64 = 50;

pub struct EthernetHandle {
    pub transmitter: DatalinkTransmitter,
    pub rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Opens a raw Ethernet channel on `intf` and starts forwarding ARP frames.
pub fn start_capture(intf: &NetworkInterface) -> anyhow::Result<EthernetHandle> {
    start_capture_with(intf, &get_config(), datalink::channel)
}

pub fn start_capture_with<F>(intf: &NetworkInterface, cfg: &Config, channel_opener: F) -> anyhow::Result<EthernetHandle>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    let src_mac = match intf.mac {
        Some(mac) if !mac.is_zero() => mac,
        _ => bail!("{} has no MAC address", intf.name),
    };
    let (tx, rx_socket) = open_eth_channel(intf, cfg, channel_opener)?;
    let (queue_tx, queue_rx) = mpsc::unbounded_channel();
    spawn_listener(intf.name.clone(), rx_socket, queue_tx);

    Ok(EthernetHandle {
        transmitter: DatalinkTransmitter::new(tx, src_mac),
        rx: queue_rx,
    })
}

fn open_eth_channel<F>(
    intf: &NetworkInterface,
    cfg: &Config,
    channel_opener: F,
) -> anyhow::Result<(Box<dyn DataLinkSender>, Box<dyn DataLinkReceiver>)>
where
    F: FnOnce(&NetworkInterface, Config) -> io::Result<Channel>,
{
    let ch = channel_opener(intf, *cfg).with_context(|| format!("opening on {}", intf.name))?;
    match ch {
        Channel::Ethernet(tx, rx) => {
            debug!(interface = %intf.name, "datalink channel open");
            Ok((tx, rx))
        }
        _ => bail!("non-ethernet channel for {}", intf.name),
    }
}

/// Reads frames on a plain thread until the queue is dropped or the socket fails.
fn spawn_listener(
    name: String,
    mut rx: Box<dyn DataLinkReceiver>,
    queue: mpsc::UnboundedSender<Vec<u8>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        loop {
            match rx.next() {
                Ok(frame) => {
                    if !is_arp(frame) {
                        continue;
                    }
                    if queue.send(frame.to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted) => {
                    if queue.is_closed() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(interface = %name, "datalink receive failed: {e}");
                    break;
                }
            }
        }
        debug!(interface = %name, "datalink listener stopped");
    })
}

fn is_arp(frame: &[u8]) -> bool {
    EthernetPacket::new(frame).is_some_and(|eth| eth.get_ethertype() == EtherTypes::Arp)
}

fn get_config() -> Config {
    Config {
        read_timeout: Some(Duration::from_millis(READ_TIMEOUT_MS)),
        ..Default::default()
    }
}

/// Sends probes and announcements through a pnet datalink sender.
pub struct DatalinkTransmitter {
    tx: Box<dyn DataLinkSender>,
    src_mac: MacAddr,
}

impl DatalinkTransmitter {
    pub fn new(tx: Box<dyn DataLinkSender>, src_mac: MacAddr) -> Self {
        Self { tx, src_mac }
    }

    pub fn src_mac(&self) -> MacAddr {
        self.src_mac
    }

    fn send(&mut self, address: Ipv4Addr, frame: Result<Vec<u8>, FrameError>) -> Result<(), TransmitError> {
        let frame = frame.map_err(|e| TransmitError::Frame { address, reason: e.to_string() })?;
        match self.tx.send_to(&frame, None) {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) => Err(TransmitError::Io(e)),
            None => Err(TransmitError::Unavailable),
        }
    }
}

impl crate::ports::ArpTransmitter for DatalinkTransmitter {
    fn send_probe(&mut self, address: Ipv4Addr) -> Result<(), TransmitError> {
        let frame = arp::probe_frame(self.src_mac, address);
        self.send(address, frame)
    }

    fn send_announce(&mut self, address: Ipv4Addr) -> Result<(), TransmitError> {
        let frame = arp::announce_frame(self.src_mac, address);
        self.send(address, frame)
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
