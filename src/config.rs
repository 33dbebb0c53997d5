//! Configuration loading for DhruvaMission

use crate::core::MapPoint;
use crate::error::{MissionError, Result};
use crate::mission::{GoalFailurePolicy, RetryPolicy};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MissionConfig {
    #[serde(default)]
    pub mission: LoopConfig,
    #[serde(default)]
    pub waypoints: WaypointConfig,
    #[serde(default)]
    pub frames: FrameConfig,
    #[serde(default)]
    pub localization: LocalizationConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Control loop settings
#[derive(Clone, Debug, Deserialize)]
pub struct LoopConfig {
    /// Coordinator tick rate (default: 10 Hz)
    #[serde(default = "default_loop_rate")]
    pub loop_rate_hz: f64,

    /// Scout yaw rate while scanning for a marker in rad/s (default: 0.1)
    #[serde(default = "default_scan_angular_velocity")]
    pub scan_angular_velocity: f64,

    /// Discovered location slots, home included (default: 5)
    #[serde(default = "default_location_capacity")]
    pub location_capacity: usize,

    /// Detection queue depth (default: 5)
    #[serde(default = "default_detection_queue")]
    pub detection_queue: usize,
}

/// Fixed mission coordinates in the map frame
#[derive(Clone, Debug, Deserialize)]
pub struct WaypointConfig {
    /// Scan waypoints visited by the scout, in order
    #[serde(default = "default_scan_waypoints")]
    pub scan: Vec<[f64; 2]>,

    /// Where the scout parks after the last scan (default: [-4.0, 2.5])
    #[serde(default = "default_scout_home")]
    pub scout_home: [f64; 2],

    /// Final follower goal (default: [-4.0, 3.5])
    #[serde(default = "default_follower_home")]
    pub follower_home: [f64; 2],
}

/// Frame names and the marker standoff offset
#[derive(Clone, Debug, Deserialize)]
pub struct FrameConfig {
    #[serde(default = "default_map_frame")]
    pub map: String,

    /// Frame of the camera that detects markers
    #[serde(default = "default_sensor_frame")]
    pub sensor: String,

    #[serde(default = "default_marker_frame")]
    pub marker: String,

    /// Standoff frame published on top of the marker frame
    #[serde(default = "default_offset_frame")]
    pub offset: String,

    /// Standoff distance along the marker's Z axis in meters (default: 0.4)
    #[serde(default = "default_marker_offset_z")]
    pub marker_offset_z: f64,
}

/// Marker localization retry settings
#[derive(Clone, Debug, Deserialize)]
pub struct LocalizationConfig {
    /// Delay after a failed transform lookup (default: 1000 ms)
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Give up after this many failed lookups at one waypoint (default: never)
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

/// Navigation service settings
#[derive(Clone, Debug, Deserialize)]
pub struct NavigationConfig {
    /// Per-poll wait for the navigation servers at startup (default: 5000 ms)
    #[serde(default = "default_server_wait_ms")]
    pub server_wait_ms: u64,

    /// What to do when a goal ends in a terminal state other than success
    #[serde(default)]
    pub goal_failure: GoalFailurePolicy,
}

/// Simulated back end used by the binary
#[derive(Clone, Debug, Deserialize)]
pub struct SimulationConfig {
    /// Status polls before a goal reaches its target (default: 20)
    #[serde(default = "default_travel_polls")]
    pub travel_polls: u32,

    /// Marker placements in the map frame
    #[serde(default = "default_markers")]
    pub markers: Vec<MarkerPlacement>,

    /// Camera horizontal field of view in degrees (default: 60)
    #[serde(default = "default_fov_deg")]
    pub fov_deg: f64,

    /// Maximum marker detection distance in meters (default: 1.5)
    #[serde(default = "default_detection_range")]
    pub detection_range: f64,

    /// Camera height above the floor in meters (default: 0.3)
    #[serde(default = "default_camera_height")]
    pub camera_height: f64,

    /// Sensor publish rate (default: 20 Hz)
    #[serde(default = "default_sensor_rate")]
    pub sensor_rate_hz: f64,
}

/// A simulated marker
#[derive(Clone, Debug, Deserialize)]
pub struct MarkerPlacement {
    pub id: u16,
    pub position: [f64; 2],
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            loop_rate_hz: default_loop_rate(),
            scan_angular_velocity: default_scan_angular_velocity(),
            location_capacity: default_location_capacity(),
            detection_queue: default_detection_queue(),
        }
    }
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            scan: default_scan_waypoints(),
            scout_home: default_scout_home(),
            follower_home: default_follower_home(),
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            map: default_map_frame(),
            sensor: default_sensor_frame(),
            marker: default_marker_frame(),
            offset: default_offset_frame(),
            marker_offset_z: default_marker_offset_z(),
        }
    }
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            retry_interval_ms: default_retry_interval_ms(),
            max_attempts: None,
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            server_wait_ms: default_server_wait_ms(),
            goal_failure: GoalFailurePolicy::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            travel_polls: default_travel_polls(),
            markers: default_markers(),
            fov_deg: default_fov_deg(),
            detection_range: default_detection_range(),
            camera_height: default_camera_height(),
            sensor_rate_hz: default_sensor_rate(),
        }
    }
}

// Default value functions
fn default_loop_rate() -> f64 {
    10.0
}
fn default_scan_angular_velocity() -> f64 {
    0.1
}
fn default_location_capacity() -> usize {
    5
}
fn default_detection_queue() -> usize {
    5
}
fn default_scan_waypoints() -> Vec<[f64; 2]> {
    vec![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]]
}
fn default_scout_home() -> [f64; 2] {
    [-4.0, 2.5]
}
fn default_follower_home() -> [f64; 2] {
    [-4.0, 3.5]
}
fn default_map_frame() -> String {
    "map".to_string()
}
fn default_sensor_frame() -> String {
    "explorer_tf/camera_rgb_optical_frame".to_string()
}
fn default_marker_frame() -> String {
    "marker_frame".to_string()
}
fn default_offset_frame() -> String {
    "another_frame".to_string()
}
fn default_marker_offset_z() -> f64 {
    0.4
}
fn default_retry_interval_ms() -> u64 {
    1000
}
fn default_server_wait_ms() -> u64 {
    5000
}

// Simulation defaults
fn default_travel_polls() -> u32 {
    20
}
fn default_markers() -> Vec<MarkerPlacement> {
    // ~1m off each default scan waypoint, alternating sides of the diagonal
    [[1.7, 0.3], [1.3, 2.7], [3.7, 2.3], [3.3, 4.7]]
        .into_iter()
        .enumerate()
        .map(|(id, position)| MarkerPlacement {
            id: id as u16,
            position,
        })
        .collect()
}
fn default_fov_deg() -> f64 {
    60.0
}
fn default_detection_range() -> f64 {
    1.5
}
fn default_camera_height() -> f64 {
    0.3
}
fn default_sensor_rate() -> f64 {
    20.0
}

impl MissionConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MissionError::Config(format!("Failed to read config file: {}", e)))?;
        let config: MissionConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the mission cannot run with.
    pub fn validate(&self) -> Result<()> {
        let rate = self.mission.loop_rate_hz;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(MissionError::Config(format!(
                "loop_rate_hz must be positive, got {}",
                rate
            )));
        }
        if self.mission.scan_angular_velocity.is_nan() || self.mission.scan_angular_velocity <= 0.0 {
            return Err(MissionError::Config(
                "scan_angular_velocity must be positive".into(),
            ));
        }
        if self.waypoints.scan.is_empty() {
            return Err(MissionError::Config("at least one scan waypoint is required".into()));
        }
        if self.mission.location_capacity < self.waypoints.scan.len() + 1 {
            return Err(MissionError::Config(format!(
                "location_capacity {} cannot hold {} markers plus home",
                self.mission.location_capacity,
                self.waypoints.scan.len()
            )));
        }
        Ok(())
    }

    /// Scout goal list: every scan waypoint followed by the scout home.
    pub fn scout_waypoints(&self) -> Vec<MapPoint> {
        self.waypoints
            .scan
            .iter()
            .copied()
            .chain(std::iter::once(self.waypoints.scout_home))
            .map(MapPoint::from)
            .collect()
    }

    pub fn follower_home(&self) -> MapPoint {
        MapPoint::from(self.waypoints.follower_home)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.mission.loop_rate_hz)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(self.localization.retry_interval_ms),
            max_attempts: self.localization.max_attempts,
        }
    }

    pub fn server_wait(&self) -> Duration {
        Duration::from_millis(self.navigation.server_wait_ms)
    }
}
