//! Goal dispatch and status polling shared by both sequencers.

use serde::Deserialize;

use crate::error::{MissionError, Result};
use crate::io::{Agent, GoalState, NavGoal, NavigationClient};

/// What to do when a goal ends in a terminal state other than `Succeeded`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum GoalFailurePolicy {
    /// Keep polling the failed goal forever
    Stall,
    /// Send the same goal again, up to `max_attempts` dispatches in total
    Resend { max_attempts: u32 },
    /// Fail the mission immediately
    Abort,
}

impl Default for GoalFailurePolicy {
    fn default() -> Self {
        GoalFailurePolicy::Resend { max_attempts: 3 }
    }
}

/// Result of polling the in-flight goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalProgress {
    /// Still pending or active (or stalled on a failure)
    InFlight,
    Reached,
}

/// Tracks the single in-flight goal of one agent.
#[derive(Debug)]
pub struct GoalTracker {
    agent: Agent,
    policy: GoalFailurePolicy,
    index: usize,
    goal: Option<NavGoal>,
    attempts: u32,
    stalled: bool,
}

impl GoalTracker {
    pub fn new(agent: Agent, policy: GoalFailurePolicy) -> Self {
        Self {
            agent,
            policy,
            index: 0,
            goal: None,
            attempts: 0,
            stalled: false,
        }
    }

    /// Index of the goal being tracked.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Dispatches of the current goal so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Send a fresh goal for `index`.
    pub fn dispatch<N: NavigationClient + ?Sized>(
        &mut self,
        nav: &mut N,
        index: usize,
        goal: NavGoal,
    ) {
        tracing::info!(
            "Sending goal {} to {}: ({:.2}, {:.2})",
            index,
            self.agent,
            goal.position.x,
            goal.position.y
        );
        self.index = index;
        self.attempts = 1;
        self.stalled = false;
        nav.send_goal(goal.clone());
        self.goal = Some(goal);
    }

    /// Poll the navigation service and apply the failure policy.
    pub fn poll<N: NavigationClient + ?Sized>(&mut self, nav: &mut N) -> Result<GoalProgress> {
        let state = nav.state();
        if state.is_success() {
            tracing::info!("{} reached goal {}", self.agent, self.index);
            return Ok(GoalProgress::Reached);
        }
        if !state.is_terminal() {
            return Ok(GoalProgress::InFlight);
        }

        match self.policy {
            GoalFailurePolicy::Stall => {
                if !self.stalled {
                    tracing::warn!(
                        "Goal {} for {} ended as {:?}, waiting",
                        self.index,
                        self.agent,
                        state
                    );
                    self.stalled = true;
                }
                Ok(GoalProgress::InFlight)
            }
            GoalFailurePolicy::Resend { max_attempts } if self.attempts < max_attempts => {
                let Some(goal) = self.goal.clone() else {
                    return Err(self.failed(state));
                };
                self.attempts += 1;
                tracing::warn!(
                    "Goal {} for {} ended as {:?}, resending (attempt {}/{})",
                    self.index,
                    self.agent,
                    state,
                    self.attempts,
                    max_attempts
                );
                nav.send_goal(goal);
                Ok(GoalProgress::InFlight)
            }
            GoalFailurePolicy::Resend { .. } | GoalFailurePolicy::Abort => Err(self.failed(state)),
        }
    }

    fn failed(&self, state: GoalState) -> MissionError {
        tracing::warn!(
            "Goal {} for {} failed as {:?} after {} attempt(s)",
            self.index,
            self.agent,
            state,
            self.attempts
        );
        MissionError::GoalFailed {
            agent: self.agent,
            index: self.index,
            state,
            attempts: self.attempts,
        }
    }
}
