//! # Conflict Detection Timing
//!
//! Every protocol constant of RFC 5227 is a [`Duration`] on [`AcdConfig`], so a
//! deployment can tighten or relax the schedule without touching the engine.
//! The engine itself never reasons in seconds: it counts ticks, and
//! [`AcdConfig::tick_table`] converts once, up front.

use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct AcdConfig {
    /// How often the caller drives the engine's `tick()`.
    pub tick_interval: Duration,
    /// Upper bound of the random delay before the first probe.
    pub probe_wait: Duration,
    /// Lower bound of the random delay between probes.
    pub probe_min: Duration,
    /// Upper bound (exclusive) of the random delay between probes.
    pub probe_max: Duration,
    pub probe_num: u32,
    /// Delay between the last probe and the first announce.
    pub announce_wait: Duration,
    pub announce_interval: Duration,
    pub announce_num: u32,
    /// Window in which a second conflict makes us give the address up.
    pub defend_interval: Duration,
    /// Consecutive conflicts before acquisition is rate limited.
    pub max_conflicts: u32,
    pub rate_limit_interval: Duration,
    /// Interval of unsolicited probes sent while the address is in use.
    ///
    /// `None` keeps the plain RFC 5227 behaviour of only reacting to conflicts.
    pub periodic_defend: Option<Duration>,
}

impl Default for AcdConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            probe_wait: Duration::from_secs(1),
            probe_min: Duration::from_secs(1),
            probe_max: Duration::from_secs(2),
            probe_num: 3,
            announce_wait: Duration::from_secs(2),
            announce_interval: Duration::from_secs(2),
            announce_num: 2,
            defend_interval: Duration::from_secs(10),
            max_conflicts: 10,
            rate_limit_interval: Duration::from_secs(60),
            periodic_defend: None,
        }
    }
}

/// The timing constants of an [`AcdConfig`], expressed in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickTable {
    pub probe_wait: u32,
    pub probe_min: u32,
    pub probe_max: u32,
    pub probe_num: u32,
    pub announce_wait: u32,
    pub announce_interval: u32,
    pub announce_num: u32,
    pub defend_interval: u32,
    pub max_conflicts: u32,
    pub rate_limit_interval: u32,
    pub periodic_defend: Option<u32>,
}

impl AcdConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.probe_num == 0 {
            return Err(ConfigError::ZeroCount("probe_num"));
        }
        if self.announce_num == 0 {
            return Err(ConfigError::ZeroCount("announce_num"));
        }
        if self.max_conflicts == 0 {
            return Err(ConfigError::ZeroCount("max_conflicts"));
        }
        if self.probe_max < self.probe_min {
            return Err(ConfigError::ProbeWindow {
                min: self.probe_min,
                max: self.probe_max,
            });
        }
        if self.periodic_defend.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ZeroPeriodicDefend);
        }
        Ok(())
    }

    /// Converts a duration into whole ticks, rounding up. Zero stays zero.
    pub fn ticks(&self, duration: Duration) -> u32 {
        let tick = self.tick_interval.as_nanos().max(1);
        let ticks = duration.as_nanos().div_ceil(tick);
        u32::try_from(ticks).unwrap_or(u32::MAX)
    }

    pub fn tick_table(&self) -> TickTable {
        TickTable {
            probe_wait: self.ticks(self.probe_wait),
            probe_min: self.ticks(self.probe_min),
            probe_max: self.ticks(self.probe_max),
            probe_num: self.probe_num,
            announce_wait: self.ticks(self.announce_wait),
            // An announce interval of zero would stall the announce phase.
            announce_interval: self.ticks(self.announce_interval).max(1),
            announce_num: self.announce_num,
            defend_interval: self.ticks(self.defend_interval),
            max_conflicts: self.max_conflicts,
            rate_limit_interval: self.ticks(self.rate_limit_interval),
            periodic_defend: self.periodic_defend.map(|d| self.ticks(d).max(1)),
        }
    }
}

impl TickTable {
    /// Ticks between two periodic actions while the address is in use.
    pub fn ongoing_interval(&self) -> u32 {
        self.periodic_defend.unwrap_or(self.defend_interval)
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
