//! Marker detection events.
//!
//! The sensing pipeline runs on its own schedule and pushes events into a
//! bounded queue; the mission loop drains it once per tick. Producers never
//! block: when the queue is full the oldest event is evicted and counted, so
//! the mission always sees the most recent detections.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::{Timestamp, Transform};

/// Identity of a detected visual marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u16);

impl MarkerId {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One detected marker: identity plus its pose in the detecting sensor's frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FiducialTransform {
    pub fiducial_id: MarkerId,
    pub transform: Transform,
}

/// A batch of markers seen in one camera frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionEvent {
    pub stamp: Timestamp,
    pub transforms: Vec<FiducialTransform>,
}

impl DetectionEvent {
    pub fn new(stamp: Timestamp, transforms: Vec<FiducialTransform>) -> Self {
        Self { stamp, transforms }
    }

    /// Event with no markers in view.
    pub fn empty(stamp: Timestamp) -> Self {
        Self::new(stamp, Vec::new())
    }

    /// Event carrying a single marker.
    pub fn single(stamp: Timestamp, id: MarkerId, transform: Transform) -> Self {
        Self::new(
            stamp,
            vec![FiducialTransform {
                fiducial_id: id,
                transform,
            }],
        )
    }

    /// The only marker the mission consults.
    pub fn first(&self) -> Option<&FiducialTransform> {
        self.transforms.first()
    }
}

/// Create a bounded detection queue.
pub fn detection_channel(capacity: usize) -> (DetectionSender, DetectionReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        DetectionSender {
            tx,
            evict: rx.clone(),
            dropped: Arc::clone(&dropped),
        },
        DetectionReceiver { rx, dropped },
    )
}

/// Producer half, held by the sensing pipeline.
#[derive(Clone)]
pub struct DetectionSender {
    tx: Sender<DetectionEvent>,
    /// Receiving end used to evict the oldest event when the queue is full
    evict: Receiver<DetectionEvent>,
    dropped: Arc<AtomicU64>,
}

impl DetectionSender {
    /// Enqueue without blocking, evicting the oldest pending event if the
    /// queue is full.
    pub fn send(&self, event: DetectionEvent) {
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    if self.evict.try_recv().is_ok() {
                        let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        tracing::debug!("Detection queue full, evicted oldest event ({} total)", n);
                    }
                    event = rejected;
                }
                // Unreachable while `evict` keeps the channel open
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// Consumer half, owned by the mission loop.
pub struct DetectionReceiver {
    rx: Receiver<DetectionEvent>,
    dropped: Arc<AtomicU64>,
}

impl DetectionReceiver {
    /// Take every pending event without blocking, oldest first.
    pub fn drain(&self) -> Vec<DetectionEvent> {
        self.rx.try_iter().collect()
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
