//! Core foundation types: rigid transforms and time.

pub mod clock;
pub mod geometry;

pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use geometry::{MapPoint, Quaternion, Transform, Vector3};
