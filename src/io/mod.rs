//! Contracts with the collaborators outside the mission core.
//!
//! - [`detection`]: marker detection events and the bounded queue they travel on
//! - [`navigation`]: per-agent goal service and the scout velocity channel

pub mod detection;
pub mod navigation;

pub use detection::{
    DetectionEvent, DetectionReceiver, DetectionSender, FiducialTransform, MarkerId,
    detection_channel,
};
pub use navigation::{
    Agent, GoalState, NavGoal, NavigationClient, Twist, VelocityPublisher, wait_for_server,
};
