//! The RFC 5227 state machine of a single claimed address.
//!
//! A [`ConflictDetector`] never sleeps and never blocks. It is advanced one
//! tick at a time by [`tick`](ConflictDetector::tick) and reacts to conflict
//! evidence handed over by the ARP router; everything in between is a
//! countdown in `ticks_to_wait`.

use std::fmt;
use std::net::Ipv4Addr;

use acd_common::config::TickTable;
use acd_common::error::TransmitError;
use rand::{Rng, RngCore};
use tracing::{debug, info, warn};

use crate::policy::{self, ConflictResponse, RetreatOutcome};
use crate::ports::{AcdEvent, ArpTransmitter, ConflictListener};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcdState {
    Off,
    /// Random delay before the first probe.
    ProbeWait,
    Probing,
    /// All probes sent; waiting before the first announce.
    AnnounceWait,
    Announcing,
    /// The address is in use and defended.
    Ongoing,
    /// The address is watched but never defended.
    PassiveOngoing,
    /// Too many conflicts; waiting before acquisition may restart.
    RateLimited,
}

impl AcdState {
    /// The address is still a candidate: nobody has been told it is ours.
    pub fn is_probing(self) -> bool {
        matches!(self, AcdState::ProbeWait | AcdState::Probing | AcdState::AnnounceWait)
    }

    /// The address has been announced and is ours until a conflict says otherwise.
    pub fn is_claimed(self) -> bool {
        matches!(self, AcdState::Announcing | AcdState::Ongoing | AcdState::PassiveOngoing)
    }
}

impl fmt::Display for AcdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AcdState::Off => "off",
            AcdState::ProbeWait => "probe-wait",
            AcdState::Probing => "probing",
            AcdState::AnnounceWait => "announce-wait",
            AcdState::Announcing => "announcing",
            AcdState::Ongoing => "ongoing",
            AcdState::PassiveOngoing => "passive-ongoing",
            AcdState::RateLimited => "rate-limited",
        };
        f.write_str(name)
    }
}

/// Tick constants plus the random source behind the randomized waits.
pub struct Schedule {
    ticks: TickTable,
    rng: Box<dyn RngCore>,
}

impl Schedule {
    pub fn new(ticks: TickTable, rng: Box<dyn RngCore>) -> Self {
        Self { ticks, rng }
    }

    /// Uniform in `[0, PROBE_WAIT)`.
    fn probe_wait(&mut self) -> u32 {
        match self.ticks.probe_wait {
            0 => 0,
            wait => self.rng.random_range(0..wait),
        }
    }

    /// Uniform in `[PROBE_MIN, PROBE_MAX)`, or exactly `PROBE_MIN` if the window is empty.
    fn probe_interval(&mut self) -> u32 {
        let (min, max) = (self.ticks.probe_min, self.ticks.probe_max);
        if max > min {
            self.rng.random_range(min..max)
        } else {
            min
        }
    }
}

pub struct ConflictDetector {
    address: Ipv4Addr,
    state: AcdState,
    ticks_to_wait: u32,
    sent_count: u32,
    conflict_count: u32,
    last_conflict_cooldown: u32,
    listener: Option<Box<dyn ConflictListener>>,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConflictDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConflictDetector")
            .field("address", &self.address)
            .field("state", &self.state)
            .field("ticks_to_wait", &self.ticks_to_wait)
            .field("sent_count", &self.sent_count)
            .field("conflict_count", &self.conflict_count)
            .field("last_conflict_cooldown", &self.last_conflict_cooldown)
            .finish_non_exhaustive()
    }
}

impl ConflictDetector {
    pub fn new() -> Self {
        Self {
            address: Ipv4Addr::UNSPECIFIED,
            state: AcdState::Off,
            ticks_to_wait: 0,
            sent_count: 0,
            conflict_count: 0,
            last_conflict_cooldown: 0,
            listener: None,
        }
    }

    pub fn state(&self) -> AcdState {
        self.state
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn ticks_to_wait(&self) -> u32 {
        self.ticks_to_wait
    }

    pub fn conflict_count(&self) -> u32 {
        self.conflict_count
    }

    pub fn last_conflict_cooldown(&self) -> u32 {
        self.last_conflict_cooldown
    }

    pub(crate) fn set_listener(&mut self, listener: Box<dyn ConflictListener>) {
        self.listener = Some(listener);
    }

    /// Begins probing `address`. Valid from any state.
    pub(crate) fn start(&mut self, address: Ipv4Addr, schedule: &mut Schedule) {
        self.sent_count = 0;
        self.last_conflict_cooldown = 0;
        self.address = address;
        self.state = AcdState::ProbeWait;
        self.ticks_to_wait = schedule.probe_wait();
        debug!(%address, ticks = self.ticks_to_wait, "acd started, waiting before first probe");
    }

    /// Drops every pending action. Idempotent.
    pub(crate) fn stop(&mut self) {
        if self.state != AcdState::Off {
            debug!(address = %self.address, from = %self.state, "acd stopped");
        }
        self.state = AcdState::Off;
    }

    pub(crate) fn tick(&mut self, schedule: &mut Schedule, tx: &mut dyn ArpTransmitter) {
        self.last_conflict_cooldown = self.last_conflict_cooldown.saturating_sub(1);
        self.ticks_to_wait = self.ticks_to_wait.saturating_sub(1);
        if self.ticks_to_wait > 0 {
            return;
        }

        match self.state {
            AcdState::ProbeWait | AcdState::Probing => self.probe(schedule, tx),
            AcdState::AnnounceWait | AcdState::Announcing => self.announce(schedule, tx),
            AcdState::Ongoing => {
                if let Some(interval) = schedule.ticks.periodic_defend {
                    info!(address = %self.address, "sending periodic defensive ARP probe");
                    let result = tx.send_probe(self.address);
                    self.report("periodic probe", result);
                    self.ticks_to_wait = interval;
                }
            }
            AcdState::RateLimited => {
                info!(address = %self.address, "rate limit window expired");
                self.stop();
                self.conflict_count = 0;
                self.notify(AcdEvent::RestartAcquisition);
            }
            AcdState::Off | AcdState::PassiveOngoing => {}
        }
    }

    fn probe(&mut self, schedule: &mut Schedule, tx: &mut dyn ArpTransmitter) {
        let total = schedule.ticks.probe_num;
        self.state = AcdState::Probing;
        info!(address = %self.address, "sending ARP probe {}/{}", self.sent_count + 1, total);
        let result = tx.send_probe(self.address);
        self.report("probe", result);
        self.sent_count += 1;

        if self.sent_count >= total {
            self.state = AcdState::AnnounceWait;
            self.sent_count = 0;
            self.ticks_to_wait = schedule.ticks.announce_wait;
            debug!(address = %self.address, ticks = self.ticks_to_wait, "all probes sent, waiting to announce");
        } else {
            self.ticks_to_wait = schedule.probe_interval();
            debug!(address = %self.address, ticks = self.ticks_to_wait, "next probe scheduled");
        }
    }

    fn announce(&mut self, schedule: &mut Schedule, tx: &mut dyn ArpTransmitter) {
        let total = schedule.ticks.announce_num;
        if self.sent_count == 0 {
            self.state = AcdState::Announcing;
            self.conflict_count = 0;
        }
        info!(address = %self.address, "sending ARP announce {}/{}", self.sent_count + 1, total);
        let result = tx.send_announce(self.address);
        self.report("announce", result);
        self.ticks_to_wait = schedule.ticks.announce_interval;
        self.sent_count += 1;

        if self.sent_count >= total {
            self.state = AcdState::Ongoing;
            self.sent_count = 0;
            self.ticks_to_wait = schedule.ticks.ongoing_interval();
            info!(address = %self.address, "address is usable");
            self.notify(AcdEvent::AddressUsable);
        }
    }

    /// Someone else holds or probes our address. The router has already
    /// checked the rules for the current state.
    pub(crate) fn on_conflict_evidence(&mut self, schedule: &mut Schedule, tx: &mut dyn ArpTransmitter) {
        if self.state.is_probing() {
            warn!(address = %self.address, state = %self.state, "conflict while probing");
            self.restart(schedule);
        } else if self.state.is_claimed() {
            warn!(address = %self.address, state = %self.state, "conflict on claimed address");
            self.handle_active_conflict(schedule, tx);
        }
    }

    fn restart(&mut self, schedule: &mut Schedule) {
        self.conflict_count += 1;
        self.notify(AcdEvent::AddressDeclined);

        match policy::retreat(self.conflict_count, schedule.ticks.max_conflicts) {
            RetreatOutcome::RateLimit => {
                self.state = AcdState::RateLimited;
                self.ticks_to_wait = schedule.ticks.rate_limit_interval;
                warn!(
                    address = %self.address,
                    conflicts = self.conflict_count,
                    ticks = self.ticks_to_wait,
                    "too many conflicts, rate limiting acquisition"
                );
            }
            RetreatOutcome::Restart => {
                self.stop();
                self.notify(AcdEvent::RestartAcquisition);
            }
        }
    }

    fn handle_active_conflict(&mut self, schedule: &mut Schedule, tx: &mut dyn ArpTransmitter) {
        match policy::respond(self.state, self.last_conflict_cooldown > 0) {
            ConflictResponse::Yield => {
                debug!(address = %self.address, "passive address conflicts, backing off");
                self.stop();
                self.notify(AcdEvent::AddressDeclined);
            }
            ConflictResponse::Retreat => {
                warn!(address = %self.address, "second conflict within defend interval, retreating");
                self.restart(schedule);
            }
            ConflictResponse::Defend => {
                info!(address = %self.address, "defending address with ARP announce");
                let result = tx.send_announce(self.address);
                self.report("defensive announce", result);
                self.last_conflict_cooldown = schedule.ticks.defend_interval;
            }
        }
    }

    /// Passive mode is entered when a link-local address stops being the
    /// interface's primary address in favour of a routable one.
    pub(crate) fn on_address_role_changed(&mut self, old: Ipv4Addr, new: Ipv4Addr) {
        if old.is_unspecified() || new.is_unspecified() || self.address != old {
            return;
        }
        if old.is_link_local() && !new.is_link_local() {
            debug!(address = %self.address, routable = %new, "link-local address no longer primary");
            self.enter_passive_mode();
        }
    }

    pub(crate) fn enter_passive_mode(&mut self) {
        match self.state {
            AcdState::ProbeWait | AcdState::Probing | AcdState::AnnounceWait | AcdState::RateLimited => {
                self.stop();
                self.notify(AcdEvent::AddressDeclined);
            }
            AcdState::Announcing | AcdState::Ongoing => {
                debug!(address = %self.address, "entering passive conflict detection");
                self.state = AcdState::PassiveOngoing;
            }
            AcdState::Off | AcdState::PassiveOngoing => {}
        }
    }

    fn report(&self, what: &str, result: Result<(), TransmitError>) {
        if let Err(e) = result {
            warn!(address = %self.address, "failed to send ARP {what}: {e}");
        }
    }

    fn notify(&mut self, event: AcdEvent) {
        debug!(address = %self.address, ?event, "acd event");
        match self.listener.as_mut() {
            Some(listener) => listener.on_event(event),
            None => warn!(address = %self.address, ?event, "acd event dropped, no listener"),
        }
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
