//! Follower sequencer: visit every discovered location in marker order, then
//! the follower home.

use crate::core::Clock;
use crate::error::{MissionError, Result};
use crate::io::{Agent, NavGoal, NavigationClient};

use super::goal::{GoalFailurePolicy, GoalProgress, GoalTracker};
use super::locations::LocationTable;
use super::state::{MissionState, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerState {
    Idle,
    GoalSent,
    Finished,
}

#[derive(Debug)]
pub struct FollowerSequencer {
    map_frame: String,
    goals: GoalTracker,
    state: FollowerState,
    visited: Vec<usize>,
}

impl FollowerSequencer {
    pub fn new(map_frame: impl Into<String>, policy: GoalFailurePolicy) -> Self {
        Self {
            map_frame: map_frame.into(),
            goals: GoalTracker::new(Agent::Follower, policy),
            state: FollowerState::Idle,
            visited: Vec::new(),
        }
    }

    pub fn state(&self) -> FollowerState {
        self.state
    }

    /// Location indices reached so far, in order.
    pub fn visited(&self) -> &[usize] {
        &self.visited
    }

    /// Advance by one tick. Does nothing outside [`Phase::Following`].
    pub fn step<N, C>(
        &mut self,
        nav: &mut N,
        clock: &C,
        mission: &mut MissionState,
        locations: &LocationTable,
    ) -> Result<()>
    where
        N: NavigationClient + ?Sized,
        C: Clock + ?Sized,
    {
        if mission.phase() != Phase::Following {
            return Ok(());
        }

        match self.state {
            FollowerState::Idle => {
                let index = next_set_slot(locations, mission.next_follower_target());
                let location = locations
                    .get(index)
                    .ok_or(MissionError::LocationUnset(index))?;
                let goal = NavGoal::new(&self.map_frame, location.point(), clock.now());
                self.goals.dispatch(nav, index, goal);
                mission.follower_target = Some(index);
                self.state = FollowerState::GoalSent;
            }
            FollowerState::GoalSent => {
                if self.goals.poll(nav)? == GoalProgress::Reached {
                    let index = self.goals.index();
                    self.visited.push(index);
                    if index >= locations.home_index() {
                        tracing::info!("Follower is home, mission complete");
                        mission.advance_phase(Phase::Done)?;
                        self.state = FollowerState::Finished;
                    } else {
                        self.state = FollowerState::Idle;
                    }
                }
            }
            FollowerState::Finished => {}
        }
        Ok(())
    }
}

/// First marker slot at or after `from` that holds a location, or the home
/// slot when none is left.
fn next_set_slot(locations: &LocationTable, from: usize) -> usize {
    let home = locations.home_index();
    (from..home)
        .find(|&i| {
            let set = locations.is_set(i);
            if !set {
                tracing::debug!("Skipping undiscovered slot {}", i);
            }
            set
        })
        .unwrap_or(home)
}
