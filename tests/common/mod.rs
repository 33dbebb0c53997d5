//! Test harness for mission scenarios.
//!
//! Collaborators here are deterministic: goals take a fixed number of polls,
//! lookups can be made to fail on demand, and time only moves through a
//! [`ManualClock`].

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use parking_lot::Mutex;

use dhruva_mission::config::FrameConfig;
use dhruva_mission::{
    Clock, Collaborators, Coordinator, DetectionEvent, DetectionSender, FrameRegistry, FrameTree,
    GoalState, LookupError, LookupTime, ManualClock, MapPoint, MarkerId, MissionConfig, NavGoal,
    NavigationClient, Quaternion, SharedFrameTree, StampedTransform, Timestamp, Transform, Twist,
    Vector3, VelocityPublisher, detection_channel,
};

/// Navigation service that reaches every goal after `travel_polls` polls
/// unless a failure was scripted for it.
pub struct ScriptedNavigator {
    pub goals: Vec<NavGoal>,
    travel_polls: u32,
    polls: u32,
    failures: VecDeque<GoalState>,
    outcome: GoalState,
}

impl ScriptedNavigator {
    pub fn new(travel_polls: u32) -> Self {
        Self {
            goals: Vec::new(),
            travel_polls,
            polls: 0,
            failures: VecDeque::new(),
            outcome: GoalState::Succeeded,
        }
    }

    /// The next goal sent ends in `state`.
    pub fn fail_next(&mut self, state: GoalState) {
        self.failures.push_back(state);
    }

    pub fn positions(&self) -> Vec<MapPoint> {
        self.goals.iter().map(|g| g.position).collect()
    }
}

impl NavigationClient for ScriptedNavigator {
    fn send_goal(&mut self, goal: NavGoal) {
        self.goals.push(goal);
        self.polls = 0;
        self.outcome = self.failures.pop_front().unwrap_or(GoalState::Succeeded);
    }

    fn state(&mut self) -> GoalState {
        if self.goals.is_empty() {
            return GoalState::Pending;
        }
        self.polls += 1;
        if self.polls > self.travel_polls {
            self.outcome
        } else {
            GoalState::Active
        }
    }

    fn wait_for_server(&mut self, _timeout: Duration) -> bool {
        true
    }
}

/// Records every velocity command.
#[derive(Default)]
pub struct RecordingVelocity {
    pub twists: Vec<Twist>,
}

impl VelocityPublisher for RecordingVelocity {
    fn publish(&mut self, twist: Twist) {
        self.twists.push(twist);
    }
}

/// Frame tree whose lookups can be made to fail a number of times.
pub struct FlakyRegistry {
    pub tree: SharedFrameTree,
    pub fail_lookups: Cell<u32>,
    pub lookups: Cell<u32>,
    pub published: Vec<StampedTransform>,
}

impl FlakyRegistry {
    pub fn new(tree: SharedFrameTree) -> Self {
        Self {
            tree,
            fail_lookups: Cell::new(0),
            lookups: Cell::new(0),
            published: Vec::new(),
        }
    }
}

impl FrameRegistry for FlakyRegistry {
    fn publish_frame(&mut self, frame: StampedTransform) {
        self.published.push(frame.clone());
        self.tree.publish_frame(frame);
    }

    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        at: LookupTime,
    ) -> Result<StampedTransform, LookupError> {
        self.lookups.set(self.lookups.get() + 1);
        if self.fail_lookups.get() > 0 {
            self.fail_lookups.set(self.fail_lookups.get() - 1);
            return Err(LookupError::Disconnected {
                target_frame: target.to_string(),
                source_frame: source.to_string(),
            });
        }
        self.tree.lookup_transform(target, source, at)
    }
}

/// Stand-in for the scout camera: publishes the sensor pose and a detection
/// of a marker one meter straight ahead, facing back at the sensor.
pub struct Camera {
    tree: SharedFrameTree,
    detections: DetectionSender,
    frames: FrameConfig,
}

impl Camera {
    /// Publish the sensor at `position` (looking along +x) and report `marker`.
    pub fn see(&self, stamp: Timestamp, position: MapPoint, marker: MarkerId) {
        self.place_sensor(stamp, position);
        let facing_back =
            Quaternion::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), -std::f64::consts::FRAC_PI_2);
        self.detections.send(DetectionEvent::single(
            stamp,
            marker,
            Transform::new(Vector3::new(1.0, 0.0, 0.0), facing_back),
        ));
    }

    /// Publish the sensor pose with nothing in view.
    pub fn see_nothing(&self, stamp: Timestamp, position: MapPoint) {
        self.place_sensor(stamp, position);
        self.detections.send(DetectionEvent::empty(stamp));
    }

    fn place_sensor(&self, stamp: Timestamp, position: MapPoint) {
        self.tree.lock().publish(StampedTransform::new(
            &self.frames.map,
            &self.frames.sensor,
            Transform::from_translation(Vector3::new(position.x, position.y, 0.0)),
            stamp,
        ));
    }
}

/// Where the standoff frame lands for a marker seen by [`Camera::see`].
pub fn standoff(position: MapPoint) -> MapPoint {
    MapPoint::new(position.x + 0.6, position.y)
}

pub type TestCoordinator =
    Coordinator<ScriptedNavigator, FlakyRegistry, RecordingVelocity, ManualClock>;

pub struct Harness {
    pub coordinator: TestCoordinator,
    pub camera: Camera,
    pub tree: SharedFrameTree,
    pub running: Arc<AtomicBool>,
    pub config: MissionConfig,
}

impl Harness {
    pub fn new(config: MissionConfig) -> Self {
        let tree: SharedFrameTree = Arc::new(Mutex::new(FrameTree::default()));
        let (tx, rx) = detection_channel(config.mission.detection_queue);
        let io = Collaborators {
            scout: ScriptedNavigator::new(config.simulation.travel_polls),
            follower: ScriptedNavigator::new(config.simulation.travel_polls),
            registry: FlakyRegistry::new(Arc::clone(&tree)),
            velocity: RecordingVelocity::default(),
            clock: ManualClock::new(),
            detections: rx,
        };
        let running = Arc::new(AtomicBool::new(true));
        let coordinator = Coordinator::new(&config, io, Arc::clone(&running));
        let camera = Camera {
            tree: Arc::clone(&tree),
            detections: tx,
            frames: config.frames.clone(),
        };
        Self {
            coordinator,
            camera,
            tree,
            running,
            config,
        }
    }

    /// Default configuration with short travel times.
    pub fn with_defaults() -> Self {
        let mut config = MissionConfig::default();
        config.simulation.travel_polls = 2;
        Self::new(config)
    }

    pub fn clock(&self) -> &ManualClock {
        &self.coordinator.collaborators().clock
    }

    /// A stamp strictly after every sample published so far.
    pub fn next_stamp(&self) -> Timestamp {
        self.clock().advance(Duration::from_millis(100));
        self.clock().now()
    }

    /// Scout waypoint currently targeted.
    pub fn scout_position(&self) -> MapPoint {
        let index = self.coordinator.state().scout_target.unwrap_or_default();
        self.config.scout_waypoints()[index]
    }

    /// Tick until the scout is scanning, at most `limit` ticks.
    pub fn tick_until_scanning(&mut self, limit: usize) {
        for _ in 0..limit {
            if self.coordinator.scout().is_scanning() {
                return;
            }
            self.coordinator.tick().unwrap();
        }
        assert!(self.coordinator.scout().is_scanning(), "scout never started scanning");
    }
}
