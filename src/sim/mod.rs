//! Simulated collaborators for running the mission without robots.
//!
//! | Collaborator | Simulation |
//! |--------------|------------|
//! | Navigation service | Straight-line travel over a fixed number of status polls |
//! | Velocity channel | Last commanded twist, read by the world thread |
//! | Marker camera | Field-of-view and range check against configured placements |
//! | Frame registry | Shared [`FrameTree`](crate::frames::FrameTree) updated by the world thread |

mod navigator;
mod world;

pub use navigator::{SharedBody, SimBody, SimNavigator};
pub use world::{SimVelocity, SimWorld};
