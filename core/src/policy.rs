//! What to do about a conflict, decided without touching any state.
//!
//! RFC 5227 §2.4 lets a host (a) retreat at once, (b) defend once per
//! DEFEND_INTERVAL and retreat on a repeat, or (c) defend forever. An address
//! that is the interface's primary one gets (b). An address watched in passive
//! mode gets (a), because it must not announce on behalf of the interface.

use crate::detector::AcdState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictResponse {
    /// Give the address up silently, without restarting acquisition.
    Yield,
    /// Give the address up and let the owner acquire again.
    Retreat,
    /// Re-announce and keep the address.
    Defend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetreatOutcome {
    /// Too many conflicts in a row: wait out the rate-limit window first.
    RateLimit,
    /// Acquisition may restart right away.
    Restart,
}

/// Response to someone else using our address while we announce or hold it.
///
/// `recently_defended` is true while the previous defense is still inside
/// its DEFEND_INTERVAL window.
pub fn respond(state: AcdState, recently_defended: bool) -> ConflictResponse {
    match state {
        AcdState::PassiveOngoing => ConflictResponse::Yield,
        _ if recently_defended => ConflictResponse::Retreat,
        _ => ConflictResponse::Defend,
    }
}

/// Escalation of a retreat (RFC 5227 §2.1.1), given the conflicts counted so far
/// including the current one.
pub fn retreat(conflict_count: u32, max_conflicts: u32) -> RetreatOutcome {
    if conflict_count >= max_conflicts {
        RetreatOutcome::RateLimit
    } else {
        RetreatOutcome::Restart
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
