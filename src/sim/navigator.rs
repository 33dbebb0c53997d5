//! Simulated navigation service.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::MapPoint;
use crate::io::{Agent, GoalState, NavGoal, NavigationClient};

/// Pose of a simulated agent, shared with the world thread.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimBody {
    pub position: MapPoint,
    /// Heading in the map frame (radians)
    pub yaw: f64,
    /// Driving toward a goal
    pub moving: bool,
}

pub type SharedBody = Arc<Mutex<SimBody>>;

/// Drives an agent in a straight line to each goal over a fixed number of
/// status polls.
pub struct SimNavigator {
    agent: Agent,
    body: SharedBody,
    travel_polls: u32,
    startup_polls: u32,
    goal: Option<NavGoal>,
    origin: MapPoint,
    polls: u32,
    state: GoalState,
    /// Scripted terminal states for upcoming goals
    failures: VecDeque<GoalState>,
    outcome: GoalState,
}

impl SimNavigator {
    pub fn new(agent: Agent, start: MapPoint, travel_polls: u32) -> Self {
        Self {
            agent,
            body: Arc::new(Mutex::new(SimBody {
                position: start,
                ..SimBody::default()
            })),
            travel_polls,
            startup_polls: 0,
            goal: None,
            origin: start,
            polls: 0,
            state: GoalState::Pending,
            failures: VecDeque::new(),
            outcome: GoalState::Succeeded,
        }
    }

    /// Report the server as unavailable for the first `polls` waits.
    pub fn with_startup_polls(mut self, polls: u32) -> Self {
        self.startup_polls = polls;
        self
    }

    /// Make the next dispatched goal end in `state` instead of succeeding.
    pub fn fail_next(&mut self, state: GoalState) {
        self.failures.push_back(state);
    }

    pub fn body(&self) -> SharedBody {
        Arc::clone(&self.body)
    }

    pub fn position(&self) -> MapPoint {
        self.body.lock().position
    }

    fn travel(&mut self, target: MapPoint) {
        self.polls += 1;
        let t = if self.travel_polls == 0 {
            1.0
        } else {
            (self.polls as f64 / self.travel_polls as f64).min(1.0)
        };

        let mut body = self.body.lock();
        body.position = MapPoint::new(
            self.origin.x + (target.x - self.origin.x) * t,
            self.origin.y + (target.y - self.origin.y) * t,
        );
        if t >= 1.0 {
            body.moving = false;
            self.state = self.outcome;
            tracing::debug!("{} goal finished as {:?}", self.agent, self.state);
        }
    }
}

impl NavigationClient for SimNavigator {
    fn send_goal(&mut self, goal: NavGoal) {
        let mut body = self.body.lock();
        self.origin = body.position;

        let dx = goal.position.x - body.position.x;
        let dy = goal.position.y - body.position.y;
        if dx.hypot(dy) > 1e-9 {
            body.yaw = dy.atan2(dx);
        }
        body.moving = true;
        drop(body);

        self.outcome = self.failures.pop_front().unwrap_or(GoalState::Succeeded);
        self.polls = 0;
        self.state = GoalState::Pending;
        self.goal = Some(goal);
    }

    fn state(&mut self) -> GoalState {
        let Some(target) = self.goal.as_ref().map(|g| g.position) else {
            return GoalState::Pending;
        };
        match self.state {
            GoalState::Pending => self.state = GoalState::Active,
            GoalState::Active => self.travel(target),
            _ => {}
        }
        self.state
    }

    fn wait_for_server(&mut self, _timeout: Duration) -> bool {
        if self.startup_polls > 0 {
            self.startup_polls -= 1;
            return false;
        }
        true
    }
}
