use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

use acd_common::config::AcdConfig;
use acd_core::{AcdError, AcdEvent, AcdState};
use acd_protocols::ARP_LEN;
use pnet::util::MacAddr;

use crate::support::{self, Wire, OUR_MAC, PEER_MAC};

const ADDR: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 5);
const LINK_LOCAL: Ipv4Addr = Ipv4Addr::new(169, 254, 17, 42);

#[test]
fn stop_silences_a_detector_in_every_active_state() {
    for state in [
        AcdState::ProbeWait,
        AcdState::Probing,
        AcdState::AnnounceWait,
        AcdState::Announcing,
        AcdState::Ongoing,
    ] {
        let (mut acd, iface, wire) = support::engine(&AcdConfig::default(), 11);
        let (id, events) = support::claim(&mut acd, iface, ADDR);
        if state != AcdState::ProbeWait {
            support::tick_until(&mut acd, id, state, 1_000);
        }
        events.clear();
        wire.clear();

        acd.stop(id).unwrap();
        support::ticks(&mut acd, 1_000);
        acd.on_arp_frame(iface, &support::peer_announce(ADDR));

        assert_eq!(acd.state(id), Some(AcdState::Off), "stopped in {state:?}");
        assert!(wire.frames().is_empty(), "frames after stop in {state:?}");
        assert!(events.all().is_empty(), "events after stop in {state:?}");
    }
}

#[test]
fn one_frame_is_checked_against_every_detector_of_the_interface() {
    let (mut acd, iface, _) = support::engine(&AcdConfig::default(), 12);
    let other = Ipv4Addr::new(192, 0, 2, 9);
    let (first, first_events) = support::claim(&mut acd, iface, ADDR);
    let (second, second_events) = support::claim(&mut acd, iface, ADDR);
    let (bystander, bystander_events) = support::claim(&mut acd, iface, other);

    acd.on_arp_frame(iface, &support::peer_announce(ADDR));

    let declined = vec![AcdEvent::AddressDeclined, AcdEvent::RestartAcquisition];
    assert_eq!(first_events.all(), declined);
    assert_eq!(second_events.all(), declined);
    assert!(bystander_events.all().is_empty());
    assert_eq!(acd.state(first), Some(AcdState::Off));
    assert_eq!(acd.state(second), Some(AcdState::Off));
    assert_eq!(acd.state(bystander), Some(AcdState::ProbeWait));
}

#[test]
fn frames_only_reach_detectors_of_their_interface() {
    let (mut acd, eth0, _) = support::engine(&AcdConfig::default(), 13);
    let wlan0 = acd.add_interface("wlan0", MacAddr(0x02, 0, 0, 0, 0, 0x02), Wire::default());
    let (on_eth0, eth0_events) = support::claim(&mut acd, eth0, ADDR);
    let (on_wlan0, wlan0_events) = support::claim(&mut acd, wlan0, ADDR);

    acd.on_arp_frame(wlan0, &support::peer_announce(ADDR));

    assert!(eth0_events.all().is_empty());
    assert_eq!(acd.state(on_eth0), Some(AcdState::ProbeWait));
    assert_eq!(wlan0_events.all().len(), 2);
    assert_eq!(acd.state(on_wlan0), Some(AcdState::Off));
}

#[test]
fn link_local_replaced_by_routable_address_is_watched_passively() {
    let (mut acd, iface, wire) = support::engine(&AcdConfig::default(), 14);
    let (id, events) = support::claim(&mut acd, iface, LINK_LOCAL);
    support::tick_until(&mut acd, id, AcdState::Ongoing, 1_000);
    events.clear();
    wire.clear();

    acd.on_address_role_changed(iface, LINK_LOCAL, ADDR);
    assert_eq!(acd.state(id), Some(AcdState::PassiveOngoing));

    acd.on_arp_frame(iface, &support::peer_announce(LINK_LOCAL));
    assert_eq!(acd.state(id), Some(AcdState::Off));
    assert_eq!(events.all(), vec![AcdEvent::AddressDeclined]);
    assert!(wire.frames().is_empty());
}

#[test]
fn role_change_before_confirmation_declines() {
    let (mut acd, iface, _) = support::engine(&AcdConfig::default(), 15);
    let (id, events) = support::claim(&mut acd, iface, LINK_LOCAL);

    acd.on_address_role_changed(iface, LINK_LOCAL, ADDR);
    assert_eq!(acd.state(id), Some(AcdState::Off));
    assert_eq!(events.all(), vec![AcdEvent::AddressDeclined]);
}

#[test]
fn link_down_stops_every_detector_on_the_interface() {
    let (mut acd, iface, wire) = support::engine(&AcdConfig::default(), 16);
    let (a, _) = support::claim(&mut acd, iface, ADDR);
    let (b, _) = support::claim(&mut acd, iface, Ipv4Addr::new(192, 0, 2, 6));
    support::ticks(&mut acd, 15);
    wire.clear();

    acd.link_down(iface);
    support::ticks(&mut acd, 1_000);
    assert_eq!(acd.state(a), Some(AcdState::Off));
    assert_eq!(acd.state(b), Some(AcdState::Off));
    assert!(wire.frames().is_empty());
}

#[test]
fn recorder_keeps_the_evidence_of_each_conflict() {
    let (mut acd, iface, _) = support::engine(&AcdConfig::default(), 17);
    let evidence: Rc<RefCell<Vec<(MacAddr, Vec<u8>)>>> = Rc::default();
    let store = evidence.clone();
    acd.set_recorder(move |peer: MacAddr, frame: &[u8]| store.borrow_mut().push((peer, frame.to_vec())));
    let (_, _) = support::claim(&mut acd, iface, ADDR);

    let frame = support::peer_announce(ADDR);
    acd.on_arp_frame(iface, &frame);
    acd.on_arp_frame(iface, &support::peer_announce(Ipv4Addr::new(192, 0, 2, 200)));

    let evidence = evidence.borrow();
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].0, PEER_MAC);
    assert_eq!(evidence[0].1.len(), ARP_LEN);
    assert_eq!(evidence[0].1.as_slice(), &frame[14..14 + ARP_LEN]);
}

#[test]
fn registration_rules_are_enforced() {
    let (mut acd, eth0, _) = support::engine(&AcdConfig::default(), 18);
    let wlan0 = acd.add_interface("wlan0", OUR_MAC, Wire::default());
    let id = acd.create_detector();

    assert_eq!(acd.start(id, ADDR), Err(AcdError::NotRegistered(id)));
    assert_eq!(acd.start(id, Ipv4Addr::UNSPECIFIED), Err(AcdError::UnspecifiedAddress));

    acd.add(eth0, id, |_: AcdEvent| {}).unwrap();
    assert_eq!(acd.registered_on(id), Some(eth0));
    assert_eq!(
        acd.add(wlan0, id, |_: AcdEvent| {}),
        Err(AcdError::RegisteredElsewhere { detector: id, interface: eth0 })
    );

    acd.remove(eth0, id);
    assert_eq!(acd.registered_on(id), None);
    acd.add(wlan0, id, |_: AcdEvent| {}).unwrap();
    assert_eq!(acd.detectors(wlan0), vec![id]);
    assert_eq!(acd.interface_name(wlan0), Some("wlan0"));
}

#[test]
fn removing_an_interface_destroys_its_detectors() {
    let (mut acd, iface, _) = support::engine(&AcdConfig::default(), 19);
    let (id, _) = support::claim(&mut acd, iface, ADDR);

    acd.remove_interface(iface).unwrap();
    assert_eq!(acd.state(id), None);
    assert_eq!(acd.start(id, ADDR), Err(AcdError::UnknownDetector(id)));
    support::ticks(&mut acd, 100);
}

#[test]
fn invalid_configuration_is_rejected() {
    let cfg = AcdConfig { probe_num: 0, ..Default::default() };
    assert!(matches!(
        acd_core::Acd::new(&cfg),
        Err(AcdError::Config(_))
    ));
}
