//! Simulated world: scout camera, marker placements and the scan rotation.
//!
//! Runs on its own thread at the sensor rate:
//!
//! ```text
//! Every sensor period:
//! 1. Integrate the commanded yaw rate while the scout is standing still
//! 2. Publish map -> sensor into the frame tree
//! 3. Emit a detection event (empty when no marker is in view)
//! ```
//!
//! Sensor axes follow the body convention: x forward, z up.

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{FrameConfig, MarkerPlacement, MissionConfig, SimulationConfig};
use crate::core::{Clock, MapPoint, Quaternion, SystemClock, Timestamp, Transform, Vector3};
use crate::error::Result;
use crate::frames::{FrameRegistry, SharedFrameTree, StampedTransform};
use crate::io::{DetectionEvent, DetectionSender, MarkerId, Twist, VelocityPublisher};

use super::navigator::SharedBody;

/// Velocity channel of the simulated scout.
#[derive(Clone, Default)]
pub struct SimVelocity {
    twist: Arc<Mutex<Twist>>,
}

impl SimVelocity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last commanded twist.
    pub fn current(&self) -> Twist {
        *self.twist.lock()
    }
}

impl VelocityPublisher for SimVelocity {
    fn publish(&mut self, twist: Twist) {
        tracing::debug!("Velocity command: linear={}, angular={}", twist.linear, twist.angular);
        *self.twist.lock() = twist;
    }
}

pub struct SimWorld {
    config: SimulationConfig,
    frames: FrameConfig,
    body: SharedBody,
    velocity: SimVelocity,
    registry: SharedFrameTree,
    detections: DetectionSender,
    clock: SystemClock,
    running: Arc<AtomicBool>,
}

impl SimWorld {
    pub fn new(
        config: &MissionConfig,
        body: SharedBody,
        velocity: SimVelocity,
        registry: SharedFrameTree,
        detections: DetectionSender,
        clock: SystemClock,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config: config.simulation.clone(),
            frames: config.frames.clone(),
            body,
            velocity,
            registry,
            detections,
            clock,
            running,
        }
    }

    /// Start the world thread. It exits once `running` is cleared.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name("sim-world".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    fn run(mut self) {
        let interval = Duration::from_secs_f64(1.0 / self.config.sensor_rate_hz.max(1.0));
        let mut last = self.clock.now();
        tracing::info!(
            "Simulated world started: {} marker(s), sensor at {:.0} Hz",
            self.config.markers.len(),
            self.config.sensor_rate_hz
        );

        while self.running.load(Ordering::SeqCst) {
            let now = self.clock.now();
            self.step(now.saturating_since(last), now);
            last = now;
            self.clock.sleep(interval);
        }

        tracing::info!("Simulated world stopped");
    }

    /// Advance the world by `dt` and publish everything stamped `now`.
    pub fn step(&mut self, dt: Duration, now: Timestamp) {
        let body = {
            let mut body = self.body.lock();
            if !body.moving {
                let w = self.velocity.current().angular;
                body.yaw = wrap_angle(body.yaw + w * dt.as_secs_f64());
            }
            *body
        };

        let sensor_pose = Transform::new(
            Vector3::new(body.position.x, body.position.y, self.config.camera_height),
            Quaternion::from_yaw(body.yaw),
        );
        self.registry.publish_frame(StampedTransform::new(
            &self.frames.map,
            &self.frames.sensor,
            sensor_pose,
            now,
        ));

        let event = if body.moving {
            DetectionEvent::empty(now)
        } else {
            match self.visible_marker(&sensor_pose) {
                Some((id, pose)) => DetectionEvent::single(now, id, pose),
                None => DetectionEvent::empty(now),
            }
        };
        self.detections.send(event);
    }

    /// Closest marker inside the field of view, as a pose in the sensor frame.
    ///
    /// The marker's z axis points back at the camera.
    fn visible_marker(&self, sensor_pose: &Transform) -> Option<(MarkerId, Transform)> {
        let half_fov = self.config.fov_deg.to_radians() / 2.0;
        let to_sensor = sensor_pose.inverse();

        self.config
            .markers
            .iter()
            .filter_map(|m| {
                let local = to_sensor.transform_point(&marker_point(m, self.config.camera_height));
                let distance = local.norm();
                let bearing = local.y.atan2(local.x);
                (distance <= self.config.detection_range && bearing.abs() <= half_fov)
                    .then_some((m.id, local, bearing, distance))
            })
            .min_by(|a, b| a.3.total_cmp(&b.3))
            .map(|(id, local, bearing, _)| {
                let facing_back = Quaternion::from_yaw(bearing)
                    * Quaternion::from_axis_angle(Vector3::new(0.0, 1.0, 0.0), -FRAC_PI_2);
                (MarkerId(id), Transform::new(local, facing_back))
            })
    }
}

fn marker_point(marker: &MarkerPlacement, height: f64) -> Vector3 {
    let p = MapPoint::from(marker.position);
    Vector3::new(p.x, p.y, height)
}

fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}
