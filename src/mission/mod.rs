//! Two-agent mission core.
//!
//! The scout visits scan waypoints and localizes one marker at each; the
//! follower then visits every discovered location and returns home.
//!
//! ```text
//! detections ──► FrameRelay ──► frame registry ◄── Localizer ──► LocationTable
//!                                                     │
//!           ScoutSequencer ◄──────── Coordinator ─────┘
//!           FollowerSequencer ◄────────┘
//! ```

pub mod coordinator;
pub mod follower;
pub mod goal;
pub mod localizer;
pub mod locations;
pub mod relay;
pub mod scout;
pub mod state;

pub use coordinator::{Collaborators, Coordinator, MissionReport};
pub use follower::{FollowerSequencer, FollowerState};
pub use goal::{GoalFailurePolicy, GoalProgress, GoalTracker};
pub use localizer::{Localization, Localizer, RetryPolicy};
pub use locations::{DiscoveredLocation, LocationTable, Recorded};
pub use relay::FrameRelay;
pub use scout::{ScoutSequencer, ScoutState};
pub use state::{MissionState, Phase};
