//! Mission and launch error types

use std::time::Duration;
use thiserror::Error;

use skydrop_link::{LinkError, RegistryError};

use crate::machine::{ArmWait, Phase};
use crate::store::StoreError;

/// Unrecovered mission failure; terminal for the mission
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MissionError {
    /// The controller did not reach the expected state in time
    #[error(
        "Arming timed out waiting for {stage} after {}s{}",
        .waited.as_secs(),
        format_diagnostics(.diagnostics)
    )]
    ArmingTimeout {
        /// What was being waited for
        stage: ArmWait,
        /// Time spent waiting
        waited: Duration,
        /// Most recent FCU diagnostic text
        diagnostics: Vec<String>,
    },

    /// Takeoff did not reach the target altitude within the climb ceiling
    #[error("Climb to {target_m}m stalled at {altitude_m:.1}m after {}s", .waited.as_secs())]
    ClimbTimeout {
        /// Commanded altitude
        target_m: f64,
        /// Last observed altitude
        altitude_m: f64,
        /// Time spent climbing
        waited: Duration,
    },

    /// The overall mission ceiling elapsed
    #[error("Mission exceeded {}s during {phase}", .elapsed.as_secs())]
    MissionTimeout {
        /// Mission time when the ceiling tripped
        elapsed: Duration,
        /// Phase the mission was in
        phase: Phase,
    },

    /// A link failure that prevents forward progress
    #[error(transparent)]
    Link(#[from] LinkError),

    /// The mission task ended without reporting an outcome
    #[error("Mission aborted: {0}")]
    Aborted(String),
}

impl MissionError {
    /// Attach FCU diagnostics to an arming timeout; other errors pass through
    pub fn with_diagnostics(self, lines: Vec<String>) -> Self {
        match self {
            MissionError::ArmingTimeout { stage, waited, .. } => MissionError::ArmingTimeout {
                stage,
                waited,
                diagnostics: lines,
            },
            other => other,
        }
    }
}

fn format_diagnostics(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!("; recent diagnostics: {}", lines.join(" | "))
    }
}

/// Launch request rejected before a mission started
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The block is not in the configured table
    #[error("Invalid block {0}. Must be one of: {1}")]
    UnknownBlock(String, String),

    /// The drone has no live link
    #[error("Drone {0} not connected")]
    NotConnected(String),

    /// The link could not be established
    #[error("Failed to connect to drone: {0}")]
    Connection(#[from] RegistryError),

    /// The mission record could not be created
    #[error("Failed to record mission: {0}")]
    Store(#[from] StoreError),
}
