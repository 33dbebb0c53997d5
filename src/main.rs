//! DhruvaMission - scout/follower marker mission
//!
//! Runs the mission loop against simulated robots:
//!
//! - **Mission thread** (main, ~10Hz): sequences goals for both agents,
//!   relays detections into the frame tree, localizes markers
//! - **World thread** (~20Hz): scout camera and scan rotation, publishes
//!   the sensor pose and detection events
//!
//! Usage:
//!
//! ```bash
//! dhruva-mission --config dhruva-mission.toml --speed 5
//! RUST_LOG=dhruva_mission=debug dhruva-mission
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use dhruva_mission::{
    Agent, Collaborators, Coordinator, FrameTree, MapPoint, MissionConfig, MissionReport, Result,
    SharedFrameTree, SimNavigator, SimVelocity, SimWorld, SystemClock, detection_channel,
    utils::setup_ctrl_c_handler, wait_for_server,
};

/// Scout/follower marker mission on simulated robots
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration file (defaults to dhruva-mission.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulation speed-up factor, at most 1000
    #[arg(short, long, default_value_t = 1.0)]
    speed: f64,

    /// Stop after this many mission ticks
    #[arg(long)]
    max_ticks: Option<u64>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dhruva_mission=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    info!("DhruvaMission v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "{} scan waypoint(s), scout home ({:.2}, {:.2}), follower home ({:.2}, {:.2})",
        config.waypoints.scan.len(),
        config.waypoints.scout_home[0],
        config.waypoints.scout_home[1],
        config.waypoints.follower_home[0],
        config.waypoints.follower_home[1]
    );

    let running = setup_ctrl_c_handler()?;
    let clock = SystemClock::with_speed(args.speed)?;

    // Both robots start at the map origin
    let polls = config.simulation.travel_polls;
    let mut scout = SimNavigator::new(Agent::Scout, MapPoint::default(), polls);
    let mut follower = SimNavigator::new(Agent::Follower, MapPoint::default(), polls);

    wait_for_server(&mut scout, Agent::Scout, config.server_wait(), &running)?;
    wait_for_server(&mut follower, Agent::Follower, config.server_wait(), &running)?;

    let registry: SharedFrameTree = Arc::new(Mutex::new(FrameTree::default()));
    let velocity = SimVelocity::new();
    let (detection_tx, detection_rx) = detection_channel(config.mission.detection_queue);

    let world = SimWorld::new(
        &config,
        scout.body(),
        velocity.clone(),
        Arc::clone(&registry),
        detection_tx,
        clock,
        Arc::clone(&running),
    )
    .spawn()?;

    let io = Collaborators {
        scout,
        follower,
        registry,
        velocity,
        clock,
        detections: detection_rx,
    };
    let mut coordinator = Coordinator::new(&config, io, Arc::clone(&running));
    if let Some(max) = args.max_ticks {
        coordinator = coordinator.with_max_ticks(max);
    }

    let outcome = coordinator.run();

    // Stop the world thread whatever the outcome
    running.store(false, std::sync::atomic::Ordering::SeqCst);
    if let Err(e) = world.join() {
        error!("World thread panicked: {:?}", e);
    }

    let report = outcome?;
    log_report(&report);
    info!("DhruvaMission finished");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<MissionConfig> {
    if let Some(path) = path {
        info!("Loading configuration from {:?}", path);
        return MissionConfig::load(path);
    }

    let default_path = Path::new("dhruva-mission.toml");
    if default_path.exists() {
        info!("Loading configuration from {:?}", default_path);
        MissionConfig::load(default_path)
    } else {
        info!("Using default configuration");
        Ok(MissionConfig::default())
    }
}

fn log_report(report: &MissionReport) {
    info!(
        "Mission report: phase {:?}, {} ticks, {} detection(s) dropped",
        report.phase, report.ticks, report.dropped_detections
    );
    info!("Scout visited waypoints {:?}", report.scout_visits);
    info!("Follower visited locations {:?}", report.follower_visits);
    for (index, slot) in report.locations.iter().enumerate() {
        match slot {
            Some(loc) => info!("  slot {}: ({:.3}, {:.3})", index, loc.x, loc.y),
            None => warn!("  slot {}: empty", index),
        }
    }
}
