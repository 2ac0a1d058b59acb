use std::net::Ipv4Addr;
use std::time::Duration;

use acd_common::config::AcdConfig;
use acd_core::{Acd, AcdEvent, AcdState, DetectorId, InterfaceId};
use acd_protocols::arp;

use crate::support::{self, Events, Wire, OUR_MAC};

const ADDR: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 5);

fn claimed(cfg: &AcdConfig) -> (Acd, InterfaceId, Wire, DetectorId, Events) {
    let (mut acd, iface, wire) = support::engine(cfg, 7);
    let (id, events) = support::claim(&mut acd, iface, ADDR);
    support::tick_until(&mut acd, id, AcdState::Ongoing, 1_000);
    events.clear();
    wire.clear();
    (acd, iface, wire, id, events)
}

#[test]
fn second_conflict_within_defend_interval_gives_the_address_up() {
    let (mut acd, iface, wire, id, events) = claimed(&AcdConfig::default());

    acd.on_arp_frame(iface, &support::peer_announce(ADDR));
    assert_eq!(acd.state(id), Some(AcdState::Ongoing));
    assert!(events.all().is_empty());
    let frames = wire.frames();
    assert_eq!(frames.len(), 1);
    let defense = arp::parse_frame(&frames[0]).unwrap();
    assert_eq!(defense.get_sender_hw_addr(), OUR_MAC);
    assert_eq!(defense.get_sender_proto_addr(), ADDR);
    assert_eq!(defense.get_target_proto_addr(), ADDR);

    // Five seconds later the peer insists.
    support::ticks(&mut acd, 50);
    acd.on_arp_frame(iface, &support::peer_announce(ADDR));
    assert_eq!(acd.state(id), Some(AcdState::Off));
    assert_eq!(events.all(), vec![AcdEvent::AddressDeclined, AcdEvent::RestartAcquisition]);
    assert_eq!(wire.frames().len(), 1);
}

#[test]
fn conflicts_further_apart_than_defend_interval_are_each_defended() {
    let (mut acd, iface, wire, id, events) = claimed(&AcdConfig::default());

    for round in 1..=3 {
        acd.on_arp_frame(iface, &support::peer_announce(ADDR));
        assert_eq!(wire.announces(), round);
        support::ticks(&mut acd, 100);
    }
    assert_eq!(acd.state(id), Some(AcdState::Ongoing));
    assert!(events.all().is_empty());
}

#[test]
fn peer_probing_a_claimed_address_is_not_a_conflict() {
    let (mut acd, iface, wire, id, events) = claimed(&AcdConfig::default());

    acd.on_arp_frame(iface, &support::peer_probe(ADDR));
    assert_eq!(acd.state(id), Some(AcdState::Ongoing));
    assert!(wire.frames().is_empty());
    assert!(events.all().is_empty());
}

#[test]
fn conflict_while_announcing_is_defended() {
    let (mut acd, iface, wire) = support::engine(&AcdConfig::default(), 8);
    let (id, events) = support::claim(&mut acd, iface, ADDR);
    support::tick_until(&mut acd, id, AcdState::Announcing, 1_000);
    let announces = wire.announces();

    acd.on_arp_frame(iface, &support::peer_announce(ADDR));
    assert_eq!(wire.announces(), announces + 1);
    assert_eq!(acd.state(id), Some(AcdState::Announcing));

    support::tick_until(&mut acd, id, AcdState::Ongoing, 1_000);
    assert_eq!(events.all(), vec![AcdEvent::AddressUsable]);
}

#[test]
fn repeated_conflicts_rate_limit_acquisition() {
    let (mut acd, iface, wire) = support::engine(&AcdConfig::default(), 9);
    let (id, events) = support::claim(&mut acd, iface, ADDR);

    for _ in 0..9 {
        acd.on_arp_frame(iface, &support::peer_announce(ADDR));
        assert_eq!(acd.state(id), Some(AcdState::Off));
        acd.start(id, ADDR).unwrap();
    }
    events.clear();
    acd.on_arp_frame(iface, &support::peer_announce(ADDR));
    assert_eq!(acd.state(id), Some(AcdState::RateLimited));
    assert_eq!(events.all(), vec![AcdEvent::AddressDeclined]);

    wire.clear();
    support::ticks(&mut acd, 599);
    assert_eq!(acd.state(id), Some(AcdState::RateLimited));
    assert!(wire.frames().is_empty());

    acd.tick();
    assert_eq!(acd.state(id), Some(AcdState::Off));
    assert_eq!(events.all(), vec![AcdEvent::AddressDeclined, AcdEvent::RestartAcquisition]);

    // The count starts over once the window has passed.
    acd.start(id, ADDR).unwrap();
    acd.on_arp_frame(iface, &support::peer_announce(ADDR));
    assert_eq!(acd.state(id), Some(AcdState::Off));
    assert_eq!(acd.detector(id).unwrap().conflict_count(), 1);
}

#[test]
fn rate_limited_detector_ignores_further_conflicts() {
    let cfg = AcdConfig { max_conflicts: 1, ..Default::default() };
    let (mut acd, iface, _) = support::engine(&cfg, 10);
    let (id, events) = support::claim(&mut acd, iface, ADDR);

    acd.on_arp_frame(iface, &support::peer_announce(ADDR));
    assert_eq!(acd.state(id), Some(AcdState::RateLimited));
    acd.on_arp_frame(iface, &support::peer_announce(ADDR));
    assert_eq!(events.all(), vec![AcdEvent::AddressDeclined]);
}

#[test]
fn periodic_defense_reprobes_the_claimed_address() {
    let cfg = AcdConfig {
        periodic_defend: Some(Duration::from_secs(3)),
        ..Default::default()
    };
    let (mut acd, _, wire, id, events) = claimed(&cfg);

    support::ticks(&mut acd, 90);
    assert_eq!(wire.probes(), 3);
    assert_eq!(wire.announces(), 0);
    assert_eq!(acd.state(id), Some(AcdState::Ongoing));
    assert!(events.all().is_empty());
}

#[test]
fn defense_is_off_by_default_once_ongoing() {
    let (mut acd, _, wire, _, _) = claimed(&AcdConfig::default());
    support::ticks(&mut acd, 5_000);
    assert!(wire.frames().is_empty());
}
