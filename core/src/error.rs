use acd_common::error::ConfigError;
use thiserror::Error;

use crate::registry::{DetectorId, InterfaceId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AcdError {
    #[error("unknown detector {0}")]
    UnknownDetector(DetectorId),
    #[error("unknown interface {0}")]
    UnknownInterface(InterfaceId),
    #[error("detector {0} is not registered on any interface")]
    NotRegistered(DetectorId),
    #[error("detector {detector} is already registered on {interface}")]
    RegisteredElsewhere {
        detector: DetectorId,
        interface: InterfaceId,
    },
    #[error("the unspecified address cannot be claimed")]
    UnspecifiedAddress,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
