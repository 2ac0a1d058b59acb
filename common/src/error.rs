use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,
    #[error("{0} must be at least 1")]
    ZeroCount(&'static str),
    #[error("probe_max ({max:?}) is smaller than probe_min ({min:?})")]
    ProbeWindow { min: Duration, max: Duration },
    #[error("periodic defense interval must be greater than zero")]
    ZeroPeriodicDefend,
}

/// Why a probe or announce never made it onto the wire.
///
/// The engine only logs these: a lost frame is covered by the next scheduled one.
#[derive(Debug, Error)]
pub enum TransmitError {
    #[error("failed to build frame for {address}: {reason}")]
    Frame { address: Ipv4Addr, reason: String },
    #[error("datalink send failed: {0}")]
    Io(#[from] io::Error),
    #[error("datalink sender has no room for the frame")]
    Unavailable,
}
