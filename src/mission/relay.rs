//! Frame relay: turns a detection event into two registry frames.
//!
//! The first detected marker is published as the marker frame relative to the
//! sensor frame, then a fixed standoff frame is published on top of it. The
//! localizer later resolves the standoff frame in the map frame.

use crate::config::FrameConfig;
use crate::core::{Clock, Timestamp, Transform, Vector3};
use crate::frames::{FrameRegistry, StampedTransform};
use crate::io::{DetectionEvent, MarkerId};

use super::state::MissionState;

#[derive(Debug, Clone)]
pub struct FrameRelay {
    sensor_frame: String,
    marker_frame: String,
    offset_frame: String,
    offset: Transform,
}

impl FrameRelay {
    pub fn new(frames: &FrameConfig) -> Self {
        Self {
            sensor_frame: frames.sensor.clone(),
            marker_frame: frames.marker.clone(),
            offset_frame: frames.offset.clone(),
            offset: Transform::from_translation(Vector3::new(0.0, 0.0, frames.marker_offset_z)),
        }
    }

    pub fn offset_frame(&self) -> &str {
        &self.offset_frame
    }

    /// Publish the frames for the first marker of `event`.
    ///
    /// Returns the marker identity, or `None` for an empty event (nothing is
    /// published and the state is untouched).
    pub fn relay<R, C>(
        &self,
        event: &DetectionEvent,
        registry: &mut R,
        clock: &C,
        state: &mut MissionState,
    ) -> Option<MarkerId>
    where
        R: FrameRegistry + ?Sized,
        C: Clock + ?Sized,
    {
        let marker = event.first()?;

        // Unstamped events are taken as "now"
        let stamp = if event.stamp == Timestamp::ZERO {
            clock.now()
        } else {
            event.stamp
        };

        registry.publish_frame(StampedTransform::new(
            &self.sensor_frame,
            &self.marker_frame,
            marker.transform,
            stamp,
        ));
        registry.publish_frame(StampedTransform::new(
            &self.marker_frame,
            &self.offset_frame,
            self.offset,
            stamp,
        ));

        if state.last_detected_marker != Some(marker.fiducial_id) {
            tracing::debug!("Marker {} in view", marker.fiducial_id);
        }
        state.last_detected_marker = Some(marker.fiducial_id);
        Some(marker.fiducial_id)
    }
}
