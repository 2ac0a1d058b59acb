//! Per-interface list of the detectors that run on it.
//!
//! The registry only holds handles. Detectors themselves live in the engine's
//! arena, so tearing an interface down can never leave a dangling detector.

use std::fmt;

/// Stable handle of a detector. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetectorId(pub(crate) u32);

/// Stable handle of an interface known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub(crate) u32);

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acd#{}", self.0)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if#{}", self.0)
    }
}

/// Ordered, duplicate-free set of detectors on one interface.
#[derive(Debug, Default, Clone)]
pub struct ClientRegistry {
    entries: Vec<DetectorId>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id`. Returns `false` if it was already listed.
    pub fn add(&mut self, id: DetectorId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.entries.push(id);
        true
    }

    /// Removes `id`, keeping the order of the others. Returns `false` if absent.
    pub fn remove(&mut self, id: DetectorId) -> bool {
        match self.entries.iter().position(|&entry| entry == id) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: DetectorId) -> bool {
        self.entries.contains(&id)
    }

    /// Visits detectors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = DetectorId> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn take_all(&mut self) -> Vec<DetectorId> {
        std::mem::take(&mut self.entries)
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
