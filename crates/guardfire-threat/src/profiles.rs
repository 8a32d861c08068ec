//! Per-threat-kind response profiles.
//!
//! Consolidates which warnings and countermeasures each kind of incoming
//! threat triggers.

use guardfire_core::enums::IncomingKind;

/// Reaction to one kind of incoming threat.
pub struct ResponseProfile {
    /// Raise the under-attack warning.
    pub under_attack: bool,
    /// Raise the under-fire warning.
    pub under_fire: bool,
    pub flares: bool,
    pub chaff: bool,
    pub jammer: bool,
    /// Bring the next target scan forward when missiles are engageable.
    pub rescan_early: bool,
    /// Ask the nearest teammate to engage the shooter.
    pub request_help: bool,
}

/// Get the response profile for an incoming threat kind.
pub fn get_response(kind: IncomingKind) -> ResponseProfile {
    match kind {
        IncomingKind::Heat => ResponseProfile {
            under_attack: true,
            under_fire: false,
            flares: true,
            chaff: false,
            jammer: false,
            rescan_early: false,
            request_help: false,
        },
        IncomingKind::Radar => ResponseProfile {
            under_attack: true,
            under_fire: false,
            flares: false,
            chaff: true,
            jammer: true,
            rescan_early: false,
            request_help: false,
        },
        IncomingKind::AntiRadiation | IncomingKind::Other => ResponseProfile {
            under_attack: true,
            under_fire: false,
            flares: false,
            chaff: false,
            jammer: false,
            rescan_early: true,
            request_help: false,
        },
        IncomingKind::DirectFire => ResponseProfile {
            under_attack: true,
            under_fire: true,
            flares: false,
            chaff: false,
            jammer: false,
            rescan_early: false,
            request_help: true,
        },
    }
}
