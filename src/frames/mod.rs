//! Coordinate-frame registry.
//!
//! The mission only needs two operations from the registry: publish a named
//! frame relative to a parent, and resolve the pose of one frame in another.
//! [`FrameRegistry`] captures that contract; [`FrameTree`] is the in-memory
//! implementation used by the simulator and tests.

mod tree;

pub use tree::{FrameTree, FrameTreeConfig};

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::core::{Timestamp, Transform};

/// A transform on the edge `parent -> child` at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedTransform {
    pub parent: String,
    pub child: String,
    pub transform: Transform,
    pub stamp: Timestamp,
}

impl StampedTransform {
    pub fn new(
        parent: impl Into<String>,
        child: impl Into<String>,
        transform: Transform,
        stamp: Timestamp,
    ) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            transform,
            stamp,
        }
    }
}

/// Time at which a lookup is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTime {
    /// Latest time available on every edge of the chain
    Latest,
    At(Timestamp),
}

/// Transient lookup failure. Callers retry; none of these are fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    #[error("frame \"{0}\" does not exist")]
    UnknownFrame(String),

    #[error("could not find a connection between \"{target_frame}\" and \"{source_frame}\"")]
    Disconnected {
        target_frame: String,
        source_frame: String,
    },

    #[error("lookup of \"{frame}\" at {requested} requires extrapolation (data {oldest}..{newest})")]
    Extrapolation {
        frame: String,
        requested: Timestamp,
        oldest: Timestamp,
        newest: Timestamp,
    },
}

/// Publish/query contract of the coordinate-frame registry.
pub trait FrameRegistry {
    /// Publish (or update) the frame `child` relative to `parent`. Fire-and-forget.
    fn publish_frame(&mut self, frame: StampedTransform);

    /// Pose of `source` expressed in `target`.
    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        at: LookupTime,
    ) -> Result<StampedTransform, LookupError>;
}

/// Thread-safe frame tree shared with sensor-side publishers.
pub type SharedFrameTree = Arc<Mutex<FrameTree>>;

impl FrameRegistry for SharedFrameTree {
    fn publish_frame(&mut self, frame: StampedTransform) {
        self.lock().publish(frame);
    }

    fn lookup_transform(
        &self,
        target: &str,
        source: &str,
        at: LookupTime,
    ) -> Result<StampedTransform, LookupError> {
        self.lock().lookup(target, source, at)
    }
}
