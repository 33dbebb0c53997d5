//! End-to-end mission scenarios against deterministic collaborators.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use approx::assert_relative_eq;
use parking_lot::Mutex;

use common::{Harness, standoff};
use dhruva_mission::{
    Agent, Clock, Collaborators, Coordinator, FrameTree, GoalFailurePolicy, GoalState, ManualClock,
    MapPoint, MarkerId, MissionConfig, MissionError, Phase, ScoutState, SharedFrameTree,
    SimNavigator, SimVelocity, SimWorld, SystemClock, Twist, detection_channel,
};

/// Waypoint `i` shows marker `MARKERS[i]`.
const MARKERS: [u16; 4] = [2, 0, 3, 1];

/// Drive the harness to the end, showing each waypoint's marker while the
/// scout scans. Returns the phase seen after every tick.
fn run_scenario(harness: &mut Harness, limit: usize) -> Vec<Phase> {
    let mut phases = Vec::new();
    for _ in 0..limit {
        if harness.coordinator.state().phase() == Phase::Done {
            break;
        }
        if harness.coordinator.scout().is_scanning() {
            let index = harness.coordinator.state().scout_target.unwrap_or_default();
            let stamp = harness.next_stamp();
            harness
                .camera
                .see(stamp, harness.scout_position(), MarkerId(MARKERS[index]));
        }
        harness.coordinator.tick().unwrap();
        phases.push(harness.coordinator.state().phase());
    }
    phases
}

#[test]
fn test_full_mission() {
    let mut harness = Harness::with_defaults();
    run_scenario(&mut harness, 500);

    let coordinator = &harness.coordinator;
    assert_eq!(coordinator.state().phase(), Phase::Done);

    let scout_goals = coordinator.collaborators().scout.positions();
    assert_eq!(
        scout_goals,
        vec![
            MapPoint::new(1.0, 1.0),
            MapPoint::new(2.0, 2.0),
            MapPoint::new(3.0, 3.0),
            MapPoint::new(4.0, 4.0),
            MapPoint::new(-4.0, 2.5),
        ]
    );
    assert!(
        coordinator
            .collaborators()
            .scout
            .goals
            .iter()
            .all(|g| g.frame_id == "map")
    );

    // Each marker slot holds the standoff point of the waypoint that saw it
    let waypoints = harness.config.scout_waypoints();
    for (index, marker) in MARKERS.iter().enumerate() {
        let loc = coordinator.locations().get(*marker as usize).unwrap();
        let expected = standoff(waypoints[index]);
        assert_relative_eq!(loc.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(loc.y, expected.y, epsilon = 1e-9);
    }
    assert_eq!(
        coordinator.locations().get(4).unwrap().point(),
        MapPoint::new(-4.0, 3.5)
    );

    // Follower goes in identity order, then home
    let report = coordinator.report();
    assert_eq!(report.follower_visits, vec![0, 1, 2, 3, 4]);
    assert_eq!(report.scout_visits, vec![0, 1, 2, 3, 4]);
    let follower_goals = coordinator.collaborators().follower.positions();
    assert_eq!(follower_goals.len(), 5);
    assert_eq!(follower_goals[4], MapPoint::new(-4.0, 3.5));
    for (slot, goal) in follower_goals.iter().take(4).enumerate() {
        assert_eq!(*goal, coordinator.locations().get(slot).unwrap().point());
    }

    // Scout stopped after every scan and after parking
    let twists = &coordinator.collaborators().velocity.twists;
    assert_eq!(twists.iter().filter(|t| **t == Twist::rotate(0.1)).count(), 4);
    assert_eq!(twists.iter().filter(|t| **t == Twist::stop()).count(), 5);
    assert_eq!(twists.last(), Some(&Twist::stop()));
}

#[test]
fn test_run_stops_and_clears_running_flag_when_done() {
    let mut harness = Harness::with_defaults();
    run_scenario(&mut harness, 500);
    assert_eq!(harness.coordinator.state().phase(), Phase::Done);

    let report = harness.coordinator.run().unwrap();
    assert_eq!(report.phase, Phase::Done);
    assert!(!harness.running.load(Ordering::SeqCst));
}

#[test]
fn test_single_phase_transition_on_last_scout_goal() {
    let mut harness = Harness::with_defaults();
    let phases = run_scenario(&mut harness, 500);

    let changes: Vec<(Phase, Phase)> = phases
        .windows(2)
        .filter(|w| w[0] != w[1])
        .map(|w| (w[0], w[1]))
        .collect();
    assert_eq!(
        changes,
        vec![
            (Phase::Exploring, Phase::Following),
            (Phase::Following, Phase::Done)
        ]
    );

    // The follower never moved before the scout parked
    let following_at = phases.iter().position(|p| *p == Phase::Following).unwrap();
    assert!(following_at > 0);
    assert_eq!(harness.coordinator.scout().state(), ScoutState::Finished);
}

#[test]
fn test_scout_goals_wait_for_localization() {
    let mut harness = Harness::with_defaults();
    harness.tick_until_scanning(20);

    // No marker in view: scanning goes on and no new goal is sent
    for _ in 0..10 {
        let stamp = harness.next_stamp();
        harness.camera.see_nothing(stamp, harness.scout_position());
        harness.coordinator.tick().unwrap();
    }
    assert!(harness.coordinator.scout().is_scanning());
    assert_eq!(harness.coordinator.collaborators().scout.goals.len(), 1);
    assert_eq!(harness.coordinator.state().scout_target, Some(0));

    let stamp = harness.next_stamp();
    harness
        .camera
        .see(stamp, harness.scout_position(), MarkerId(0));
    harness.coordinator.tick().unwrap();
    harness.coordinator.tick().unwrap();
    assert_eq!(harness.coordinator.collaborators().scout.goals.len(), 2);
    assert_eq!(harness.coordinator.state().scout_target, Some(1));
}

#[test]
fn test_empty_detection_publishes_and_writes_nothing() {
    let mut harness = Harness::with_defaults();
    harness.tick_until_scanning(20);
    let published_before = harness.coordinator.collaborators().registry.published.len();

    let stamp = harness.next_stamp();
    harness.camera.see_nothing(stamp, harness.scout_position());
    harness.coordinator.tick().unwrap();

    let registry = &harness.coordinator.collaborators().registry;
    assert_eq!(registry.published.len(), published_before);
    assert!(!harness.tree.lock().contains(&harness.config.frames.marker));
    assert_eq!(harness.coordinator.locations().discovered(), 0);
    assert!(harness.coordinator.state().last_detected_marker.is_none());
}

#[test]
fn test_relay_publishes_two_frames_per_detection() {
    let mut harness = Harness::with_defaults();
    harness.tick_until_scanning(20);

    let stamp = harness.next_stamp();
    harness
        .camera
        .see(stamp, harness.scout_position(), MarkerId(3));
    harness.coordinator.tick().unwrap();

    let published = &harness.coordinator.collaborators().registry.published;
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].child, harness.config.frames.marker);
    assert_eq!(published[1].child, harness.config.frames.offset);
    assert!(published.iter().all(|f| f.stamp == stamp));

    // The value stored is exactly what the registry resolves
    let stored = harness.coordinator.locations().get(3).unwrap();
    let expected = standoff(MapPoint::new(1.0, 1.0));
    assert_relative_eq!(stored.x, expected.x, epsilon = 1e-9);
    assert_relative_eq!(stored.y, expected.y, epsilon = 1e-9);
}

#[test]
fn test_three_failed_lookups_then_one_write() {
    let mut harness = Harness::with_defaults();
    harness.tick_until_scanning(20);
    harness
        .coordinator
        .collaborators()
        .registry
        .fail_lookups
        .set(3);
    // Scanning started without a marker in view, which already cost one retry
    let sleeps_before = harness.clock().sleeps().len();

    let stamp = harness.next_stamp();
    harness
        .camera
        .see(stamp, harness.scout_position(), MarkerId(1));

    for _ in 0..3 {
        harness.coordinator.tick().unwrap();
        assert_eq!(harness.coordinator.locations().discovered(), 0);
        assert!(harness.coordinator.scout().is_scanning());
    }
    assert_eq!(
        harness.clock().sleeps()[sleeps_before..],
        [Duration::from_secs(1); 3]
    );

    harness.coordinator.tick().unwrap();
    assert_eq!(harness.coordinator.locations().discovered(), 1);
    assert!(harness.coordinator.locations().is_set(1));
    assert_eq!(harness.coordinator.collaborators().registry.lookups.get(), 4);
    assert_eq!(harness.coordinator.scout().state(), ScoutState::Idle);
}

#[test]
fn test_repeated_marker_is_write_once() {
    let mut harness = Harness::with_defaults();
    harness.tick_until_scanning(20);
    let stamp = harness.next_stamp();
    harness
        .camera
        .see(stamp, harness.scout_position(), MarkerId(0));
    harness.coordinator.tick().unwrap();
    let first = *harness.coordinator.locations().get(0).unwrap();

    // Second waypoint shows the same marker again: nothing is overwritten and
    // the scout keeps scanning
    harness.tick_until_scanning(20);
    for _ in 0..5 {
        let stamp = harness.next_stamp();
        harness
            .camera
            .see(stamp, harness.scout_position(), MarkerId(0));
        harness.coordinator.tick().unwrap();
    }
    assert_eq!(*harness.coordinator.locations().get(0).unwrap(), first);
    assert_eq!(harness.coordinator.locations().discovered(), 1);
    assert!(harness.coordinator.scout().is_scanning());
    assert_eq!(harness.coordinator.state().scout_target, Some(1));
}

#[test]
fn test_out_of_range_marker_fails_loudly() {
    let mut harness = Harness::with_defaults();
    harness.tick_until_scanning(20);
    let stamp = harness.next_stamp();
    harness
        .camera
        .see(stamp, harness.scout_position(), MarkerId(9));

    let err = harness.coordinator.tick().unwrap_err();
    assert!(matches!(
        err,
        MissionError::MarkerOutOfRange {
            id: MarkerId(9),
            markers: 4
        }
    ));
}

#[test]
fn test_localization_cap() {
    let mut config = MissionConfig::default();
    config.simulation.travel_polls = 0;
    config.localization.max_attempts = Some(3);
    let mut harness = Harness::new(config);
    harness.coordinator = harness.coordinator.with_max_ticks(100);

    let err = harness.coordinator.run().unwrap_err();
    assert!(matches!(
        err,
        MissionError::LocalizationExhausted {
            waypoint: 0,
            attempts: 3
        }
    ));
}

#[test]
fn test_known_marker_hits_localization_cap() {
    let mut config = MissionConfig::default();
    config.simulation.travel_polls = 2;
    config.localization.max_attempts = Some(3);
    let mut harness = Harness::new(config);

    harness.tick_until_scanning(20);
    let stamp = harness.next_stamp();
    harness
        .camera
        .see(stamp, harness.scout_position(), MarkerId(0));
    harness.coordinator.tick().unwrap();
    assert!(harness.coordinator.locations().is_set(0));

    // The second waypoint only ever shows the marker already recorded
    harness.tick_until_scanning(20);
    let sleeps_before = harness.clock().sleeps().len();
    let mut outcome = Ok(());
    for _ in 0..10 {
        let stamp = harness.next_stamp();
        harness
            .camera
            .see(stamp, harness.scout_position(), MarkerId(0));
        outcome = harness.coordinator.tick();
        if outcome.is_err() {
            break;
        }
    }

    assert!(matches!(
        outcome,
        Err(MissionError::LocalizationExhausted {
            waypoint: 1,
            attempts: 3
        })
    ));
    assert_eq!(harness.coordinator.locations().discovered(), 1);
    // Lookups kept working, so the scout never backed off
    assert_eq!(harness.clock().sleeps().len(), sleeps_before);
}

#[test]
fn test_failed_goal_is_resent() {
    let mut harness = Harness::with_defaults();
    harness
        .coordinator
        .collaborators_mut()
        .scout
        .fail_next(GoalState::Aborted);

    run_scenario(&mut harness, 500);
    assert_eq!(harness.coordinator.state().phase(), Phase::Done);

    let goals = harness.coordinator.collaborators().scout.positions();
    assert_eq!(goals.len(), 6);
    assert_eq!(goals[0], goals[1]);
}

#[test]
fn test_abort_policy_ends_mission() {
    let mut config = MissionConfig::default();
    config.navigation.goal_failure = GoalFailurePolicy::Abort;
    let mut harness = Harness::new(config);
    harness
        .coordinator
        .collaborators_mut()
        .scout
        .fail_next(GoalState::Rejected);
    harness.coordinator = harness.coordinator.with_max_ticks(100);

    let err = harness.coordinator.run().unwrap_err();
    assert!(matches!(
        err,
        MissionError::GoalFailed {
            agent: Agent::Scout,
            index: 0,
            state: GoalState::Rejected,
            attempts: 1
        }
    ));
}

/// Full mission on the simulated robots, stepping the world by hand.
#[test]
fn test_simulated_mission() {
    let mut config = MissionConfig::default();
    config.simulation.travel_polls = 10;

    let tree: SharedFrameTree = Arc::new(Mutex::new(FrameTree::default()));
    let (tx, rx) = detection_channel(config.mission.detection_queue);
    let scout = SimNavigator::new(Agent::Scout, MapPoint::default(), 10);
    let follower = SimNavigator::new(Agent::Follower, MapPoint::default(), 10);
    let velocity = SimVelocity::new();
    let running = Arc::new(std::sync::atomic::AtomicBool::new(true));

    let mut world = SimWorld::new(
        &config,
        scout.body(),
        velocity.clone(),
        Arc::clone(&tree),
        tx,
        SystemClock::new(),
        Arc::clone(&running),
    );
    let io = Collaborators {
        scout,
        follower,
        registry: tree,
        velocity,
        clock: ManualClock::new(),
        detections: rx,
    };
    let mut coordinator = Coordinator::new(&config, io, running);

    let tick = Duration::from_millis(100);
    let mut last = coordinator.collaborators().clock.now();
    for _ in 0..20_000 {
        if coordinator.state().phase() == Phase::Done {
            break;
        }
        let now = coordinator.collaborators().clock.now();
        world.step(now.saturating_since(last), now);
        last = now;
        coordinator.tick().unwrap();
        coordinator.collaborators().clock.advance(tick);
    }

    assert_eq!(coordinator.state().phase(), Phase::Done);
    let report = coordinator.report();
    assert_eq!(report.follower_visits, vec![0, 1, 2, 3, 4]);

    // Each standoff point sits 0.4 m from its marker, toward the waypoint
    let waypoints = config.scout_waypoints();
    for marker in &config.simulation.markers {
        let loc = coordinator.locations().get(marker.id as usize).unwrap();
        let waypoint = waypoints[marker.id as usize];
        let (mx, my) = (marker.position[0], marker.position[1]);
        let (dx, dy) = (waypoint.x - mx, waypoint.y - my);
        let d = dx.hypot(dy);
        assert_relative_eq!(loc.x, mx + 0.4 * dx / d, epsilon = 1e-6);
        assert_relative_eq!(loc.y, my + 0.4 * dy / d, epsilon = 1e-6);
    }
    let home = coordinator.collaborators().follower.position();
    assert_relative_eq!(home.x, -4.0, epsilon = 1e-9);
    assert_relative_eq!(home.y, 3.5, epsilon = 1e-9);
}
