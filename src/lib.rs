//! DhruvaMission - Scout/follower marker mission for VacuumTiger robots
//!
//! A scout visits a list of scan waypoints and, at each one, rotates in place
//! until a visual marker is detected and localized in the map frame. Once the
//! scout is parked at its home, a follower visits every discovered marker
//! location in identity order and returns to its own home.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 main.rs / sim/                      │  ← Binary + simulated robots
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                    mission/                         │  ← Coordination
//! │   (coordinator, scout, follower, relay, localizer)  │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                 io/ + frames/                       │  ← Collaborator contracts
//! │   (navigation, detections, frame registry)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     core/                           │  ← Foundation
//! │                (geometry, clock)                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Threading
//!
//! The mission itself is single-threaded. Detection events reach it through a
//! bounded channel drained once per tick; shutdown is an `Arc<AtomicBool>`
//! cleared by the Ctrl-C handler or by the coordinator when the mission ends.

pub mod config;
pub mod error;

// ============================================================================
// Layer 1: Core foundation (no internal deps)
// ============================================================================
pub mod core;

// ============================================================================
// Layer 2: Collaborator contracts (depends on core)
// ============================================================================
pub mod frames;
pub mod io;

// ============================================================================
// Layer 3: Mission logic (depends on core, frames, io)
// ============================================================================
pub mod mission;

// ============================================================================
// Layer 4: Simulated back end and process helpers
// ============================================================================
pub mod sim;
pub mod utils;

// ============================================================================
// Convenience re-exports (flat namespace for common use)
// ============================================================================

pub use config::MissionConfig;
pub use error::{MissionError, Result};

// Core types
pub use core::{Clock, ManualClock, MapPoint, Quaternion, SystemClock, Timestamp, Transform, Vector3};

// Frames
pub use frames::{
    FrameRegistry, FrameTree, FrameTreeConfig, LookupError, LookupTime, SharedFrameTree,
    StampedTransform,
};

// Collaborator contracts
pub use io::{
    Agent, DetectionEvent, DetectionReceiver, DetectionSender, FiducialTransform, GoalState,
    MarkerId, NavGoal, NavigationClient, Twist, VelocityPublisher, detection_channel,
    wait_for_server,
};

// Mission
pub use mission::{
    Collaborators, Coordinator, DiscoveredLocation, FollowerSequencer, FollowerState,
    FrameRelay, GoalFailurePolicy, Localization, Localizer, LocationTable, MissionReport,
    MissionState, Phase, Recorded, RetryPolicy, ScoutSequencer, ScoutState,
};

// Simulation
pub use sim::{SimNavigator, SimVelocity, SimWorld};
