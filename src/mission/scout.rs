//! Scout sequencer: visit each scan waypoint, rotate until a marker is
//! localized, then park at the scout home and hand over to the follower.

use crate::core::{Clock, MapPoint};
use crate::error::Result;
use crate::io::{Agent, NavGoal, NavigationClient, Twist, VelocityPublisher};

use super::goal::{GoalFailurePolicy, GoalProgress, GoalTracker};
use super::localizer::Localization;
use super::locations::LocationTable;
use super::state::{MissionState, Phase};

/// Scout sequencer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoutState {
    /// Ready to dispatch the next waypoint
    Idle,
    GoalSent,
    /// Arrived; about to either scan or finalize
    Succeeded,
    /// Rotating in place until the localizer reports a new location
    Scanning,
    Finished,
}

#[derive(Debug)]
pub struct ScoutSequencer {
    /// Scan waypoints followed by the scout home
    waypoints: Vec<MapPoint>,
    follower_home: MapPoint,
    map_frame: String,
    scan_angular_velocity: f64,
    goals: GoalTracker,
    state: ScoutState,
    visited: Vec<usize>,
}

impl ScoutSequencer {
    pub fn new(
        waypoints: Vec<MapPoint>,
        follower_home: MapPoint,
        map_frame: impl Into<String>,
        scan_angular_velocity: f64,
        policy: GoalFailurePolicy,
    ) -> Self {
        Self {
            waypoints,
            follower_home,
            map_frame: map_frame.into(),
            scan_angular_velocity,
            goals: GoalTracker::new(Agent::Scout, policy),
            state: ScoutState::Idle,
            visited: Vec::new(),
        }
    }

    pub fn state(&self) -> ScoutState {
        self.state
    }

    pub fn is_scanning(&self) -> bool {
        self.state == ScoutState::Scanning
    }

    /// Waypoint indices reached so far, in order.
    pub fn visited(&self) -> &[usize] {
        &self.visited
    }

    fn home_index(&self) -> usize {
        self.waypoints.len().saturating_sub(1)
    }

    /// Advance the sequencer by one tick.
    pub fn step<N, V, C>(
        &mut self,
        nav: &mut N,
        velocity: &mut V,
        clock: &C,
        mission: &mut MissionState,
        locations: &mut LocationTable,
    ) -> Result<()>
    where
        N: NavigationClient + ?Sized,
        V: VelocityPublisher + ?Sized,
        C: Clock + ?Sized,
    {
        match self.state {
            ScoutState::Idle => {
                let index = mission.next_scout_target();
                let Some(&target) = self.waypoints.get(index) else {
                    tracing::warn!("Scout has no waypoint {}, stopping", index);
                    self.state = ScoutState::Finished;
                    return Ok(());
                };
                let goal = NavGoal::new(&self.map_frame, target, clock.now());
                self.goals.dispatch(nav, index, goal);
                mission.scout_target = Some(index);
                self.state = ScoutState::GoalSent;
            }
            ScoutState::GoalSent => {
                if self.goals.poll(nav)? == GoalProgress::Reached {
                    self.state = ScoutState::Succeeded;
                    self.on_arrival(velocity, mission, locations)?;
                }
            }
            ScoutState::Succeeded => self.on_arrival(velocity, mission, locations)?,
            // Scanning is driven by the localizer through `on_localization`
            ScoutState::Scanning | ScoutState::Finished => {}
        }
        Ok(())
    }

    fn on_arrival<V>(
        &mut self,
        velocity: &mut V,
        mission: &mut MissionState,
        locations: &mut LocationTable,
    ) -> Result<()>
    where
        V: VelocityPublisher + ?Sized,
    {
        let index = self.goals.index();
        self.visited.push(index);

        if index >= self.home_index() {
            locations.set_home(self.follower_home);
            tracing::info!("Exploration finished, {} marker(s) found", locations.discovered());
            locations.summary();
            velocity.publish(Twist::stop());
            mission.advance_phase(Phase::Following)?;
            self.state = ScoutState::Finished;
        } else {
            tracing::info!("Scanning for a marker at waypoint {}", index);
            velocity.publish(Twist::rotate(self.scan_angular_velocity));
            self.state = ScoutState::Scanning;
        }
        Ok(())
    }

    /// Feed a localizer result while scanning.
    pub fn on_localization<V>(&mut self, result: Localization, velocity: &mut V)
    where
        V: VelocityPublisher + ?Sized,
    {
        if self.state != ScoutState::Scanning {
            return;
        }
        if let Localization::Localized(location) = result {
            tracing::info!(
                "Waypoint {} done, marker {} recorded",
                self.goals.index(),
                location.marker_id
            );
            velocity.publish(Twist::stop());
            self.state = ScoutState::Idle;
        }
    }
}
