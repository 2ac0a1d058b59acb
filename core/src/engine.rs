//! # The Conflict Detection Engine
//!
//! [`Acd`] owns every detector and every interface it knows about. Callers hold
//! [`DetectorId`] and [`InterfaceId`] handles and drive the engine from a
//! single context:
//!
//! * a timer calls [`Acd::tick`] every `tick_interval`,
//! * the receive path hands ARP frames to [`Acd::on_arp_frame`],
//! * address management reports role changes and link loss.
//!
//! Every method takes `&mut self`, so the engine cannot be entered twice at
//! once. Listeners run inline from those calls.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use acd_common::config::AcdConfig;
use acd_protocols::{ARP_LEN, arp};
use pnet::packet::Packet;
use pnet::packet::arp::ArpPacket;
use pnet::util::MacAddr;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, trace, warn};

use crate::detector::{AcdState, ConflictDetector, Schedule};
use crate::error::AcdError;
use crate::ports::{ArpTransmitter, ConflictListener, ConflictRecorder};
use crate::registry::{ClientRegistry, DetectorId, InterfaceId};
use crate::router::{self, ArpObservation};

/// An interface as the engine sees it.
struct Netif {
    name: String,
    mac: MacAddr,
    transmitter: Box<dyn ArpTransmitter>,
    registry: ClientRegistry,
}

pub struct Acd {
    schedule: Schedule,
    detectors: BTreeMap<DetectorId, ConflictDetector>,
    interfaces: BTreeMap<InterfaceId, Netif>,
    recorder: Option<Box<dyn ConflictRecorder>>,
    next_detector: u32,
    next_interface: u32,
}

impl Acd {
    /// Creates an engine whose random waits are seeded from the OS.
    pub fn new(config: &AcdConfig) -> Result<Self, AcdError> {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates an engine drawing its random waits from `rng`.
    pub fn with_rng(config: &AcdConfig, rng: impl RngCore + 'static) -> Result<Self, AcdError> {
        config.validate()?;
        Ok(Self {
            schedule: Schedule::new(config.tick_table(), Box::new(rng)),
            detectors: BTreeMap::new(),
            interfaces: BTreeMap::new(),
            recorder: None,
            next_detector: 0,
            next_interface: 0,
        })
    }

    /// Installs the store that receives evidence of every confirmed conflict.
    pub fn set_recorder(&mut self, recorder: impl ConflictRecorder + 'static) {
        self.recorder = Some(Box::new(recorder));
    }

    pub fn clear_recorder(&mut self) {
        self.recorder = None;
    }

    pub fn add_interface(
        &mut self,
        name: impl Into<String>,
        mac: MacAddr,
        transmitter: impl ArpTransmitter + 'static,
    ) -> InterfaceId {
        let id = InterfaceId(self.next_interface);
        self.next_interface += 1;
        let netif = Netif {
            name: name.into(),
            mac,
            transmitter: Box::new(transmitter),
            registry: ClientRegistry::new(),
        };
        debug!(interface = %netif.name, %mac, "interface added");
        self.interfaces.insert(id, netif);
        id
    }

    /// Tears `iface` down, destroying every detector registered on it.
    pub fn remove_interface(&mut self, iface: InterfaceId) -> Result<(), AcdError> {
        let mut netif = self
            .interfaces
            .remove(&iface)
            .ok_or(AcdError::UnknownInterface(iface))?;
        for id in netif.registry.take_all() {
            self.detectors.remove(&id);
        }
        debug!(interface = %netif.name, "interface removed");
        Ok(())
    }

    pub fn interface_name(&self, iface: InterfaceId) -> Option<&str> {
        self.interfaces.get(&iface).map(|netif| netif.name.as_str())
    }

    /// Creates an idle detector. It does nothing until added to an interface and started.
    pub fn create_detector(&mut self) -> DetectorId {
        let id = DetectorId(self.next_detector);
        self.next_detector += 1;
        self.detectors.insert(id, ConflictDetector::new());
        id
    }

    /// Frees `id`, unregistering it first if needed.
    pub fn destroy_detector(&mut self, id: DetectorId) -> Result<(), AcdError> {
        self.detectors
            .remove(&id)
            .ok_or(AcdError::UnknownDetector(id))?;
        for netif in self.interfaces.values_mut() {
            netif.registry.remove(id);
        }
        Ok(())
    }

    /// Registers `id` on `iface` and sets its listener.
    ///
    /// Adding a detector that is already on `iface` only replaces the listener.
    pub fn add(
        &mut self,
        iface: InterfaceId,
        id: DetectorId,
        listener: impl ConflictListener + 'static,
    ) -> Result<(), AcdError> {
        if !self.interfaces.contains_key(&iface) {
            return Err(AcdError::UnknownInterface(iface));
        }
        if let Some(other) = self.registered_on(id)
            && other != iface
        {
            return Err(AcdError::RegisteredElsewhere { detector: id, interface: other });
        }

        let detector = self
            .detectors
            .get_mut(&id)
            .ok_or(AcdError::UnknownDetector(id))?;
        detector.set_listener(Box::new(listener));

        if let Some(netif) = self.interfaces.get_mut(&iface)
            && netif.registry.add(id)
        {
            debug!(interface = %netif.name, detector = %id, "detector registered");
        }
        Ok(())
    }

    /// Unregisters `id` from `iface`. The detector keeps its state.
    ///
    /// Removing a detector that is not on `iface` is a caller bug: it panics in
    /// debug builds and is logged and ignored in release builds.
    pub fn remove(&mut self, iface: InterfaceId, id: DetectorId) {
        let removed = self
            .interfaces
            .get_mut(&iface)
            .is_some_and(|netif| netif.registry.remove(id));
        if !removed {
            warn!(interface = %iface, detector = %id, "remove of a detector that is not registered");
        }
        debug_assert!(removed, "{id} is not registered on {iface}");
    }

    /// Starts probing `address` with detector `id`, from whatever state it is in.
    pub fn start(&mut self, id: DetectorId, address: Ipv4Addr) -> Result<(), AcdError> {
        if address.is_unspecified() {
            return Err(AcdError::UnspecifiedAddress);
        }
        if !self.detectors.contains_key(&id) {
            return Err(AcdError::UnknownDetector(id));
        }
        if self.registered_on(id).is_none() {
            return Err(AcdError::NotRegistered(id));
        }
        if let Some(detector) = self.detectors.get_mut(&id) {
            detector.start(address, &mut self.schedule);
        }
        Ok(())
    }

    pub fn stop(&mut self, id: DetectorId) -> Result<(), AcdError> {
        let detector = self
            .detectors
            .get_mut(&id)
            .ok_or(AcdError::UnknownDetector(id))?;
        detector.stop();
        Ok(())
    }

    /// Advances every registered detector by one tick.
    pub fn tick(&mut self) {
        for netif in self.interfaces.values_mut() {
            for id in netif.registry.iter() {
                if let Some(detector) = self.detectors.get_mut(&id) {
                    detector.tick(&mut self.schedule, netif.transmitter.as_mut());
                }
            }
        }
    }

    /// Feeds a raw Ethernet frame received on `iface`. Anything but ARP is ignored.
    pub fn on_arp_frame(&mut self, iface: InterfaceId, frame: &[u8]) {
        match arp::parse_frame(frame) {
            Ok(packet) => self.on_arp_packet(iface, &packet),
            Err(e) => trace!(interface = %iface, "ignoring frame: {e}"),
        }
    }

    /// Checks an ARP packet received on `iface` against every detector there.
    pub fn on_arp_packet(&mut self, iface: InterfaceId, packet: &ArpPacket<'_>) {
        let Some(netif) = self.interfaces.get_mut(&iface) else {
            warn!(interface = %iface, "ARP packet for unknown interface");
            return;
        };

        let observation = ArpObservation::from(packet);
        let raw = packet.packet();
        let evidence = &raw[..raw.len().min(ARP_LEN)];

        for id in netif.registry.iter() {
            let Some(detector) = self.detectors.get_mut(&id) else {
                continue;
            };
            if !router::is_conflict(detector.state(), detector.address(), &observation, netif.mac) {
                continue;
            }

            warn!(
                interface = %netif.name,
                address = %detector.address(),
                peer = %observation.sender_mac,
                sender = %observation.sender_ip,
                "address conflict detected"
            );
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.record(observation.sender_mac, evidence);
            }
            detector.on_conflict_evidence(&mut self.schedule, netif.transmitter.as_mut());
        }
    }

    /// Reports that the primary address of `iface` changed from `old` to `new`.
    pub fn on_address_role_changed(&mut self, iface: InterfaceId, old: Ipv4Addr, new: Ipv4Addr) {
        let Some(netif) = self.interfaces.get(&iface) else {
            warn!(interface = %iface, "address change for unknown interface");
            return;
        };
        for id in netif.registry.iter() {
            if let Some(detector) = self.detectors.get_mut(&id) {
                detector.on_address_role_changed(old, new);
            }
        }
    }

    /// The link of `iface` went down: every detector on it stops.
    pub fn link_down(&mut self, iface: InterfaceId) {
        let Some(netif) = self.interfaces.get(&iface) else {
            warn!(interface = %iface, "link down for unknown interface");
            return;
        };
        debug!(interface = %netif.name, "link down, stopping detectors");
        for id in netif.registry.iter() {
            if let Some(detector) = self.detectors.get_mut(&id) {
                detector.stop();
            }
        }
    }

    pub fn state(&self, id: DetectorId) -> Option<AcdState> {
        self.detectors.get(&id).map(ConflictDetector::state)
    }

    pub fn address(&self, id: DetectorId) -> Option<Ipv4Addr> {
        self.detectors.get(&id).map(ConflictDetector::address)
    }

    pub fn detector(&self, id: DetectorId) -> Option<&ConflictDetector> {
        self.detectors.get(&id)
    }

    pub fn registered_on(&self, id: DetectorId) -> Option<InterfaceId> {
        self.interfaces
            .iter()
            .find(|(_, netif)| netif.registry.contains(id))
            .map(|(&iface, _)| iface)
    }

    /// Detectors of `iface` in registration order.
    pub fn detectors(&self, iface: InterfaceId) -> Vec<DetectorId> {
        self.interfaces
            .get(&iface)
            .map(|netif| netif.registry.iter().collect())
            .unwrap_or_default()
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
