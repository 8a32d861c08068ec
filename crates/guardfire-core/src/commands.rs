//! Commands sent to the engine by the host or by other platforms.
//!
//! Commands are queued and processed in order at the next tick boundary,
//! so cross-platform requests never touch another platform's state directly.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, PlatformId};
use crate::settings::RippleOption;

/// All requests the engine accepts through its queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineCommand {
    // --- Guard control ---
    /// Enable or disable autonomous engagement.
    SetGuardMode { platform: PlatformId, enabled: bool },
    /// Force a target for a limited time, bypassing scoring.
    SetOverrideTarget {
        platform: PlatformId,
        target: EntityId,
        duration_secs: f64,
    },
    /// Re-run target selection on the next tick.
    ForceRescan { platform: PlatformId },

    // --- Fire scheduling ---
    /// Change the ripple preference of a weapon definition.
    SetRipple {
        platform: PlatformId,
        weapon_name: String,
        option: RippleOption,
    },
}

impl EngineCommand {
    /// Platform the command is addressed to.
    pub fn platform(&self) -> PlatformId {
        match self {
            EngineCommand::SetGuardMode { platform, .. }
            | EngineCommand::SetOverrideTarget { platform, .. }
            | EngineCommand::ForceRescan { platform }
            | EngineCommand::SetRipple { platform, .. } => *platform,
        }
    }
}
