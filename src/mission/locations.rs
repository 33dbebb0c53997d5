//! Discovered location table.
//!
//! One slot per marker identity plus a final home slot. Marker slots are
//! written once by the localizer; the home slot is written once when
//! exploration ends. Identities outside the table are rejected.

use crate::core::MapPoint;
use crate::error::{MissionError, Result};
use crate::io::MarkerId;

/// A marker location in the map frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiscoveredLocation {
    pub marker_id: MarkerId,
    pub x: f64,
    pub y: f64,
}

impl DiscoveredLocation {
    pub fn point(&self) -> MapPoint {
        MapPoint::new(self.x, self.y)
    }
}

/// Outcome of [`LocationTable::record`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recorded {
    /// First write for this identity
    Stored(DiscoveredLocation),
    /// The slot was already set; the existing value is kept
    AlreadySet(DiscoveredLocation),
}

/// Fixed-capacity table indexed by marker identity.
#[derive(Debug, Clone)]
pub struct LocationTable {
    slots: Vec<Option<DiscoveredLocation>>,
}

impl LocationTable {
    /// `capacity` counts the home slot; it must be at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index of the home slot (always the last one). Also the number of
    /// marker slots.
    pub fn home_index(&self) -> usize {
        self.capacity() - 1
    }

    /// Store the location of `marker_id` unless it is already known.
    pub fn record(&mut self, marker_id: MarkerId, point: MapPoint) -> Result<Recorded> {
        let index = marker_id.index();
        if index >= self.home_index() {
            return Err(MissionError::MarkerOutOfRange {
                id: marker_id,
                markers: self.home_index(),
            });
        }

        match self.slots[index] {
            Some(existing) => Ok(Recorded::AlreadySet(existing)),
            None => {
                let location = DiscoveredLocation {
                    marker_id,
                    x: point.x,
                    y: point.y,
                };
                self.slots[index] = Some(location);
                Ok(Recorded::Stored(location))
            }
        }
    }

    /// Write the home slot. Returns `false` if it was already set.
    pub fn set_home(&mut self, point: MapPoint) -> bool {
        let index = self.home_index();
        if self.slots[index].is_some() {
            tracing::warn!("Home location already set, keeping the first value");
            return false;
        }
        self.slots[index] = Some(DiscoveredLocation {
            marker_id: MarkerId(index as u16),
            x: point.x,
            y: point.y,
        });
        true
    }

    pub fn get(&self, index: usize) -> Option<&DiscoveredLocation> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn is_set(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Number of marker slots (home excluded) that have been written.
    pub fn discovered(&self) -> usize {
        self.slots[..self.home_index()]
            .iter()
            .filter(|s| s.is_some())
            .count()
    }

    /// All slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&DiscoveredLocation>> {
        self.slots.iter().map(Option::as_ref)
    }

    /// Log every marker slot.
    pub fn summary(&self) {
        tracing::info!("=============");
        for (index, slot) in self.slots[..self.home_index()].iter().enumerate() {
            match slot {
                Some(loc) => tracing::info!(
                    "follower goal {}: marker {} at ({:.3}, {:.3})",
                    index,
                    loc.marker_id,
                    loc.x,
                    loc.y
                ),
                None => tracing::info!("follower goal {}: not discovered", index),
            }
        }
        tracing::info!("=============");
    }
}
