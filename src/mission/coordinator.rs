//! Fixed-rate mission loop.
//!
//! A single thread owns all mission state. Each tick steps the sequencer of
//! the current phase, relays pending detections into the frame registry and,
//! while the scout is scanning, attempts one localization.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::MissionConfig;
use crate::core::Clock;
use crate::error::Result;
use crate::frames::FrameRegistry;
use crate::io::{DetectionReceiver, NavigationClient, VelocityPublisher};

use super::follower::FollowerSequencer;
use super::localizer::Localizer;
use super::locations::{DiscoveredLocation, LocationTable};
use super::relay::FrameRelay;
use super::scout::ScoutSequencer;
use super::state::{MissionState, Phase};

/// External collaborators driven by the coordinator.
pub struct Collaborators<N, R, V, C> {
    pub scout: N,
    pub follower: N,
    pub registry: R,
    pub velocity: V,
    pub clock: C,
    pub detections: DetectionReceiver,
}

/// Summary returned by [`Coordinator::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct MissionReport {
    pub phase: Phase,
    /// Location table contents, home slot last
    pub locations: Vec<Option<DiscoveredLocation>>,
    pub scout_visits: Vec<usize>,
    pub follower_visits: Vec<usize>,
    pub ticks: u64,
    pub dropped_detections: u64,
}

pub struct Coordinator<N, R, V, C> {
    io: Collaborators<N, R, V, C>,
    running: Arc<AtomicBool>,
    state: MissionState,
    locations: LocationTable,
    scout: ScoutSequencer,
    follower: FollowerSequencer,
    relay: FrameRelay,
    localizer: Localizer,
    tick_interval: Duration,
    max_ticks: Option<u64>,
    ticks: u64,
}

impl<N, R, V, C> Coordinator<N, R, V, C>
where
    N: NavigationClient,
    R: FrameRegistry,
    V: VelocityPublisher,
    C: Clock,
{
    pub fn new(config: &MissionConfig, io: Collaborators<N, R, V, C>, running: Arc<AtomicBool>) -> Self {
        let policy = config.navigation.goal_failure.clone();
        Self {
            io,
            running,
            state: MissionState::new(),
            locations: LocationTable::new(config.mission.location_capacity),
            scout: ScoutSequencer::new(
                config.scout_waypoints(),
                config.follower_home(),
                &config.frames.map,
                config.mission.scan_angular_velocity,
                policy.clone(),
            ),
            follower: FollowerSequencer::new(&config.frames.map, policy),
            relay: FrameRelay::new(&config.frames),
            localizer: Localizer::new(&config.frames, config.retry_policy()),
            tick_interval: config.tick_interval(),
            max_ticks: None,
            ticks: 0,
        }
    }

    /// Stop `run` after this many ticks even if the mission is not done.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// One iteration of the mission loop.
    pub fn tick(&mut self) -> Result<()> {
        let io = &mut self.io;
        match self.state.phase() {
            Phase::Exploring => self.scout.step(
                &mut io.scout,
                &mut io.velocity,
                &io.clock,
                &mut self.state,
                &mut self.locations,
            )?,
            Phase::Following => {
                self.follower
                    .step(&mut io.follower, &io.clock, &mut self.state, &self.locations)?
            }
            Phase::Done => return Ok(()),
        }

        for event in io.detections.drain() {
            self.relay
                .relay(&event, &mut io.registry, &io.clock, &mut self.state);
        }

        if self.scout.is_scanning() {
            let result = self.localizer.localize(
                &io.registry,
                &io.clock,
                &self.state,
                &mut self.locations,
            )?;
            self.scout.on_localization(result, &mut io.velocity);
        }

        self.ticks += 1;
        Ok(())
    }

    /// Tick at the configured rate until the mission is done, shutdown is
    /// requested, or the tick limit is hit.
    pub fn run(&mut self) -> Result<MissionReport> {
        tracing::info!(
            "Mission loop started at {:.1} Hz",
            1.0 / self.tick_interval.as_secs_f64()
        );

        loop {
            if self.state.phase() == Phase::Done {
                // Let the rest of the process wind down too
                self.running.store(false, Ordering::SeqCst);
                break;
            }
            if !self.running.load(Ordering::SeqCst) {
                tracing::info!("Shutdown requested, leaving mission loop");
                break;
            }
            if let Some(max) = self.max_ticks
                && self.ticks >= max
            {
                tracing::warn!("Tick limit {} reached in phase {:?}", max, self.state.phase());
                break;
            }

            let loop_start = self.io.clock.now();
            self.tick()?;

            // Maintain target loop rate
            let elapsed = self.io.clock.now().saturating_since(loop_start);
            if elapsed < self.tick_interval {
                self.io.clock.sleep(self.tick_interval - elapsed);
            }
        }

        let report = self.report();
        tracing::info!(
            "Mission ended in phase {:?} after {} ticks",
            report.phase,
            report.ticks
        );
        Ok(report)
    }

    pub fn report(&self) -> MissionReport {
        MissionReport {
            phase: self.state.phase(),
            locations: self.locations.iter().map(|l| l.copied()).collect(),
            scout_visits: self.scout.visited().to_vec(),
            follower_visits: self.follower.visited().to_vec(),
            ticks: self.ticks,
            dropped_detections: self.io.detections.dropped(),
        }
    }

    pub fn state(&self) -> &MissionState {
        &self.state
    }

    pub fn locations(&self) -> &LocationTable {
        &self.locations
    }

    pub fn scout(&self) -> &ScoutSequencer {
        &self.scout
    }

    pub fn follower(&self) -> &FollowerSequencer {
        &self.follower
    }

    pub fn collaborators(&self) -> &Collaborators<N, R, V, C> {
        &self.io
    }

    pub fn collaborators_mut(&mut self) -> &mut Collaborators<N, R, V, C> {
        &mut self.io
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ManualClock, Timestamp, Transform};
    use crate::frames::{FrameTree, LookupError, LookupTime, StampedTransform};
    use crate::io::{DetectionEvent, GoalState, MarkerId, NavGoal, Twist, detection_channel};

    #[derive(Default)]
    struct Arrives;

    impl NavigationClient for Arrives {
        fn send_goal(&mut self, _goal: NavGoal) {}
        fn state(&mut self) -> GoalState {
            GoalState::Succeeded
        }
        fn wait_for_server(&mut self, _timeout: Duration) -> bool {
            true
        }
    }

    #[derive(Default)]
    struct Silent;

    impl VelocityPublisher for Silent {
        fn publish(&mut self, _twist: Twist) {}
    }

    struct Broken;

    impl FrameRegistry for Broken {
        fn publish_frame(&mut self, _frame: StampedTransform) {}
        fn lookup_transform(
            &self,
            _target: &str,
            source: &str,
            _at: LookupTime,
        ) -> std::result::Result<StampedTransform, LookupError> {
            Err(LookupError::UnknownFrame(source.to_string()))
        }
    }

    #[test]
    fn test_run_honours_shutdown_flag() {
        let (_tx, rx) = detection_channel(5);
        let io = Collaborators {
            scout: Arrives,
            follower: Arrives,
            registry: FrameTree::default(),
            velocity: Silent,
            clock: ManualClock::new(),
            detections: rx,
        };
        let running = Arc::new(AtomicBool::new(false));
        let mut coordinator = Coordinator::new(&MissionConfig::default(), io, running);

        let report = coordinator.run().unwrap();
        assert_eq!(report.ticks, 0);
        assert_eq!(report.phase, Phase::Exploring);
    }

    #[test]
    fn test_tick_limit_and_loop_rate() {
        let (tx, rx) = detection_channel(5);
        let io = Collaborators {
            scout: Arrives,
            follower: Arrives,
            registry: Broken,
            velocity: Silent,
            clock: ManualClock::new(),
            detections: rx,
        };
        let config = MissionConfig::default();
        let running = Arc::new(AtomicBool::new(true));
        let mut coordinator = Coordinator::new(&config, io, running).with_max_ticks(6);

        tx.send(DetectionEvent::single(
            Timestamp::ZERO,
            MarkerId(0),
            Transform::identity(),
        ));
        let report = coordinator.run().unwrap();

        // Stuck scanning at the first waypoint because lookups never succeed
        assert_eq!(report.ticks, 6);
        assert_eq!(report.phase, Phase::Exploring);
        assert!(coordinator.scout().is_scanning());
        assert_eq!(coordinator.state().last_detected_marker, Some(MarkerId(0)));
        // First tick sleeps to the boundary; every later tick spends the
        // whole interval in the 1 s lookup retry
        let mut expected = vec![Duration::from_millis(100)];
        expected.extend([Duration::from_secs(1); 5]);
        assert_eq!(coordinator.collaborators().clock.sleeps(), expected);
    }
}
