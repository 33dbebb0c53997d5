//! Time source for the mission loop.
//!
//! Everything that sleeps or stamps data goes through [`Clock`], so tests can
//! swap in a [`ManualClock`] and run retry paths without waiting.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{MissionError, Result};

/// Largest accepted simulation speed-up.
pub const MAX_SPEED: f64 = 1000.0;

/// Time since the clock's epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(Duration::ZERO);

    pub fn from_duration(d: Duration) -> Self {
        Self(d)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Duration::from_secs_f64(secs.max(0.0)))
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }

    /// Elapsed time from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    pub fn saturating_sub(&self, d: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(d))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

/// Source of time and sleeping for the control loop.
pub trait Clock {
    fn now(&self) -> Timestamp;
    fn sleep(&self, duration: Duration);
}

/// Wall clock; the epoch is the moment it was created.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
    /// Sleeps are divided by this factor (simulation speed-up)
    speed: f64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            speed: 1.0,
        }
    }

    /// Clock whose sleeps run `speed` times faster than real time.
    ///
    /// `speed` must be finite and in `(0, MAX_SPEED]`.
    pub fn with_speed(speed: f64) -> Result<Self> {
        if !speed.is_finite() || speed <= 0.0 || speed > MAX_SPEED {
            return Err(MissionError::Config(format!(
                "speed must be in (0, {}], got {}",
                MAX_SPEED, speed
            )));
        }
        Ok(Self {
            epoch: Instant::now(),
            speed,
        })
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.epoch.elapsed().mul_f64(self.speed))
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration.div_f64(self.speed));
    }
}

/// Deterministic clock: `sleep` advances time instantly and is recorded.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get() + d);
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now.get())
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}
