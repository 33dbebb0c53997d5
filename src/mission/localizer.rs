//! Resolves the standoff frame of the last detected marker in the map frame
//! and records it in the location table.

use std::time::Duration;

use crate::config::FrameConfig;
use crate::core::{Clock, MapPoint};
use crate::error::{MissionError, Result};
use crate::frames::{FrameRegistry, LookupTime};

use super::locations::{DiscoveredLocation, LocationTable, Recorded};
use super::state::MissionState;

/// Delay and cap for failed lookups at one waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
        }
    }
}

/// Outcome of one localization attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Localization {
    /// A new location was written
    Localized(DiscoveredLocation),
    /// Nothing written this tick; keep scanning
    Pending,
}

#[derive(Debug)]
pub struct Localizer {
    map_frame: String,
    offset_frame: String,
    retry: RetryPolicy,
    /// Attempts without a new location since the current waypoint was reached
    failures: u32,
    waypoint: Option<usize>,
}

impl Localizer {
    pub fn new(frames: &FrameConfig, retry: RetryPolicy) -> Self {
        Self {
            map_frame: frames.map.clone(),
            offset_frame: frames.offset.clone(),
            retry,
            failures: 0,
            waypoint: None,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// One attempt. Lookup failures sleep for the retry interval and return
    /// [`Localization::Pending`]; nothing is ever written on a failing attempt.
    pub fn localize<R, C>(
        &mut self,
        registry: &R,
        clock: &C,
        state: &MissionState,
        locations: &mut LocationTable,
    ) -> Result<Localization>
    where
        R: FrameRegistry + ?Sized,
        C: Clock + ?Sized,
    {
        let waypoint = state.scout_target.unwrap_or_default();
        if self.waypoint != Some(waypoint) {
            self.waypoint = Some(waypoint);
            self.failures = 0;
        }

        let Some(marker_id) = state.last_detected_marker else {
            tracing::warn!("No marker detected yet at waypoint {}", waypoint);
            return self.retry_later(waypoint, clock);
        };

        let found = match registry.lookup_transform(
            &self.map_frame,
            &self.offset_frame,
            LookupTime::Latest,
        ) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Transform lookup failed: {}", e);
                return self.retry_later(waypoint, clock);
            }
        };

        let t = found.transform.translation;
        match locations.record(marker_id, MapPoint::new(t.x, t.y))? {
            Recorded::Stored(location) => {
                tracing::info!(
                    "Marker {} localized at ({:.3}, {:.3})",
                    marker_id,
                    location.x,
                    location.y
                );
                self.failures = 0;
                Ok(Localization::Localized(location))
            }
            Recorded::AlreadySet(_) => {
                // Counts toward the cap without a back-off sleep
                tracing::debug!("Marker {} already localized, still scanning", marker_id);
                self.count_attempt(waypoint)?;
                Ok(Localization::Pending)
            }
        }
    }

    fn retry_later<C: Clock + ?Sized>(&mut self, waypoint: usize, clock: &C) -> Result<Localization> {
        self.count_attempt(waypoint)?;
        clock.sleep(self.retry.interval);
        Ok(Localization::Pending)
    }

    fn count_attempt(&mut self, waypoint: usize) -> Result<()> {
        self.failures += 1;
        if let Some(max) = self.retry.max_attempts
            && self.failures >= max
        {
            return Err(MissionError::LocalizationExhausted {
                waypoint,
                attempts: self.failures,
            });
        }
        Ok(())
    }
}
