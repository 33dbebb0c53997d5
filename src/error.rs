//! Error types for DhruvaMission

use thiserror::Error;

use crate::io::{Agent, GoalState, MarkerId};
use crate::mission::Phase;

/// DhruvaMission error type
#[derive(Error, Debug)]
pub enum MissionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Marker {id} is outside the location table ({markers} marker slots)")]
    MarkerOutOfRange { id: MarkerId, markers: usize },

    #[error("Location slot {0} has not been discovered")]
    LocationUnset(usize),

    #[error("Illegal phase transition {from:?} -> {to:?}")]
    PhaseRegression { from: Phase, to: Phase },

    #[error("{agent} goal #{index} ended in {state:?} after {attempts} attempt(s)")]
    GoalFailed {
        agent: Agent,
        index: usize,
        state: GoalState,
        attempts: u32,
    },

    #[error("No marker localized at waypoint #{waypoint} after {attempts} attempts")]
    LocalizationExhausted { waypoint: usize, attempts: u32 },

    #[error("Shutdown requested")]
    Shutdown,
}

impl From<toml::de::Error> for MissionError {
    fn from(e: toml::de::Error) -> Self {
        MissionError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MissionError>;
