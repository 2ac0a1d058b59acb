//! RFC 5227 IPv4 address conflict detection.
//!
//! [`Acd`] is the single entry point: it owns the detectors, routes inbound
//! ARP to them and advances their timers on every [`tick`](Acd::tick).
//! The outside world is reached only through the traits in [`ports`].

pub mod detector;
pub mod engine;
pub mod error;
pub mod network;
pub mod policy;
pub mod ports;
pub mod registry;
pub mod router;

pub use detector::AcdState;
pub use engine::Acd;
pub use error::AcdError;
pub use ports::{AcdEvent, ArpTransmitter, ConflictListener, ConflictRecorder};
pub use registry::{DetectorId, InterfaceId};
pub use router::ArpObservation;
