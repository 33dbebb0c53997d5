//! Navigation goal service and velocity command contracts.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::core::{MapPoint, Quaternion, Timestamp};
use crate::error::{MissionError, Result};

/// The two mission agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Agent {
    Scout,
    Follower,
}

impl Agent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Agent::Scout => "explorer",
            Agent::Follower => "follower",
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Goal status as reported by the navigation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoalState {
    /// Accepted, not yet processed (also reported before any goal is sent)
    #[default]
    Pending,
    /// Being executed
    Active,
    /// Cancelled before execution started
    Recalled,
    /// Refused by the server
    Rejected,
    /// Cancelled during execution
    Preempted,
    /// Execution failed
    Aborted,
    /// Goal reached
    Succeeded,
    /// Server lost track of the goal
    Lost,
}

impl GoalState {
    /// No further transitions will happen for this goal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GoalState::Pending | GoalState::Active)
    }

    pub fn is_success(&self) -> bool {
        *self == GoalState::Succeeded
    }
}

/// A map-frame navigation goal with default (identity) orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct NavGoal {
    pub frame_id: String,
    pub position: MapPoint,
    pub orientation: Quaternion,
    pub stamp: Timestamp,
}

impl NavGoal {
    pub fn new(frame_id: impl Into<String>, position: MapPoint, stamp: Timestamp) -> Self {
        Self {
            frame_id: frame_id.into(),
            position,
            orientation: Quaternion::identity(),
            stamp,
        }
    }
}

/// Goal service of one agent. Polling only; no cancellation.
pub trait NavigationClient {
    /// Dispatch a goal, replacing any previous one.
    fn send_goal(&mut self, goal: NavGoal);

    /// Current state of the last dispatched goal.
    fn state(&mut self) -> GoalState;

    /// Block up to `timeout` for the server; `true` once it is available.
    fn wait_for_server(&mut self, timeout: Duration) -> bool;
}

/// Planar velocity command.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist {
    /// Forward velocity (m/s)
    pub linear: f64,
    /// Yaw rate (rad/s)
    pub angular: f64,
}

impl Twist {
    pub fn stop() -> Self {
        Self::default()
    }

    /// Rotate in place.
    pub fn rotate(angular: f64) -> Self {
        Self {
            linear: 0.0,
            angular,
        }
    }
}

/// Velocity command channel (scout only).
pub trait VelocityPublisher {
    fn publish(&mut self, twist: Twist);
}

/// Poll `client` until its server is up.
///
/// Each poll blocks for at most `poll_timeout`. Returns the number of polls
/// needed, or [`MissionError::Shutdown`] once `running` is cleared.
pub fn wait_for_server<N: NavigationClient + ?Sized>(
    client: &mut N,
    agent: Agent,
    poll_timeout: Duration,
    running: &AtomicBool,
) -> Result<u32> {
    let mut polls = 0;
    loop {
        if !running.load(Ordering::SeqCst) {
            return Err(MissionError::Shutdown);
        }
        polls += 1;
        if client.wait_for_server(poll_timeout) {
            tracing::info!("Navigation server for {} is up", agent);
            return Ok(polls);
        }
        tracing::info!(
            "Waiting for the navigation server to come up for {}",
            agent
        );
    }
}
