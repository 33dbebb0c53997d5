//! Mission phase and progress counters.

use crate::error::{MissionError, Result};
use crate::io::MarkerId;

/// Mission phase. Only moves forward: Exploring → Following → Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Phase {
    #[default]
    Exploring,
    Following,
    Done,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Exploring => "EXPLORING",
            Phase::Following => "FOLLOWING",
            Phase::Done => "DONE",
        }
    }
}

/// Progress of both agents. Owned by the coordinator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissionState {
    /// Last waypoint index dispatched to the scout (`None` before the first goal)
    pub scout_target: Option<usize>,
    /// Last location index dispatched to the follower
    pub follower_target: Option<usize>,
    /// Most recent marker identity seen in a detection event
    pub last_detected_marker: Option<MarkerId>,
    phase: Phase,
}

impl MissionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`. Staying put is a no-op; going backwards is an error.
    pub fn advance_phase(&mut self, next: Phase) -> Result<()> {
        if next < self.phase {
            return Err(MissionError::PhaseRegression {
                from: self.phase,
                to: next,
            });
        }
        if next != self.phase {
            tracing::info!("Mission phase {} -> {}", self.phase.as_str(), next.as_str());
            self.phase = next;
        }
        Ok(())
    }

    /// Index the scout should be sent to next.
    pub fn next_scout_target(&self) -> usize {
        self.scout_target.map_or(0, |i| i + 1)
    }

    /// Index the follower should be sent to next.
    pub fn next_follower_target(&self) -> usize {
        self.follower_target.map_or(0, |i| i + 1)
    }
}
