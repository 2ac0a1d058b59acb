use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

use acd_common::config::AcdConfig;
use acd_common::error::TransmitError;
use acd_core::{Acd, AcdEvent, AcdState, ArpTransmitter, DetectorId, InterfaceId};
use acd_protocols::arp;
use pnet::packet::arp::{ArpOperations, MutableArpPacket};
use pnet::util::MacAddr;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const OUR_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x01);
pub const PEER_MAC: MacAddr = MacAddr(0x02, 0x00, 0x00, 0x00, 0x00, 0x99);

/// Everything our side put on the wire, as real Ethernet frames.
#[derive(Clone, Default)]
pub struct Wire {
    frames: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl Wire {
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.borrow().clone()
    }

    pub fn clear(&self) {
        self.frames.borrow_mut().clear();
    }

    pub fn probes(&self) -> usize {
        self.count(|sender| sender.is_unspecified())
    }

    pub fn announces(&self) -> usize {
        self.count(|sender| !sender.is_unspecified())
    }

    fn count(&self, by_sender: impl Fn(Ipv4Addr) -> bool) -> usize {
        self.frames
            .borrow()
            .iter()
            .filter(|frame| by_sender(arp::parse_frame(frame).unwrap().get_sender_proto_addr()))
            .count()
    }

    fn push(&self, frame: Vec<u8>) -> Result<(), TransmitError> {
        self.frames.borrow_mut().push(frame);
        Ok(())
    }
}

impl ArpTransmitter for Wire {
    fn send_probe(&mut self, address: Ipv4Addr) -> Result<(), TransmitError> {
        self.push(arp::probe_frame(OUR_MAC, address).unwrap())
    }

    fn send_announce(&mut self, address: Ipv4Addr) -> Result<(), TransmitError> {
        self.push(arp::announce_frame(OUR_MAC, address).unwrap())
    }
}

/// Collects the events of one detector.
#[derive(Clone, Default)]
pub struct Events(Rc<RefCell<Vec<AcdEvent>>>);

impl Events {
    pub fn listener(&self) -> impl FnMut(AcdEvent) + 'static {
        let sink = self.0.clone();
        move |event| sink.borrow_mut().push(event)
    }

    pub fn all(&self) -> Vec<AcdEvent> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

pub fn engine(cfg: &AcdConfig, seed: u64) -> (Acd, InterfaceId, Wire) {
    let mut acd = Acd::with_rng(cfg, StdRng::seed_from_u64(seed)).unwrap();
    let wire = Wire::default();
    let iface = acd.add_interface("eth0", OUR_MAC, wire.clone());
    (acd, iface, wire)
}

/// A started detector for `address` on `iface`.
pub fn claim(acd: &mut Acd, iface: InterfaceId, address: Ipv4Addr) -> (DetectorId, Events) {
    let events = Events::default();
    let id = acd.create_detector();
    acd.add(iface, id, events.listener()).unwrap();
    acd.start(id, address).unwrap();
    (id, events)
}

pub fn tick_until(acd: &mut Acd, id: DetectorId, state: AcdState, limit: u32) -> u32 {
    for n in 1..=limit {
        acd.tick();
        if acd.state(id) == Some(state) {
            return n;
        }
    }
    panic!("{id} never reached {state:?} in {limit} ticks, stuck in {:?}", acd.state(id));
}

pub fn ticks(acd: &mut Acd, n: u32) {
    for _ in 0..n {
        acd.tick();
    }
}

/// Another host announcing that `address` is its own.
pub fn peer_announce(address: Ipv4Addr) -> Vec<u8> {
    arp::announce_frame(PEER_MAC, address).unwrap()
}

/// Another host probing for `address`.
pub fn peer_probe(address: Ipv4Addr) -> Vec<u8> {
    arp::probe_frame(PEER_MAC, address).unwrap()
}

/// An ordinary ARP request: a configured host at `sender` looking up `target`.
pub fn peer_request(sender: Ipv4Addr, target: Ipv4Addr) -> Vec<u8> {
    let mut frame = arp::announce_frame(PEER_MAC, target).unwrap();
    let mut packet = MutableArpPacket::new(&mut frame[14..]).unwrap();
    packet.set_sender_proto_addr(sender);
    frame
}

/// The owner of `address` answering an ARP request.
pub fn peer_reply(address: Ipv4Addr, asker: Ipv4Addr) -> Vec<u8> {
    let mut frame = arp::announce_frame(PEER_MAC, address).unwrap();
    let mut packet = MutableArpPacket::new(&mut frame[14..]).unwrap();
    packet.set_operation(ArpOperations::Reply);
    packet.set_target_hw_addr(OUR_MAC);
    packet.set_target_proto_addr(asker);
    frame
}
