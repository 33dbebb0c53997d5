//! Rigid-body transform types used for frame chaining.
//!
//! All quantities are in meters and radians. Quaternions are stored as
//! `[w, x, y, z]` and are kept normalized by every constructor that can
//! introduce drift.

use std::ops::{Add, Mul, Neg, Sub};

use serde::{Deserialize, Serialize};

/// A 3D vector in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: &Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    pub fn scale(&self, s: f64) -> Vector3 {
        Vector3::new(self.x * s, self.y * s, self.z * s)
    }

    #[inline]
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

/// Quaternion representation [w, x, y, z].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create identity quaternion (no rotation).
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Rotation of `angle` radians about `axis` (need not be unit length).
    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Self {
        let n = axis.norm();
        if n < 1e-12 {
            return Self::identity();
        }
        let (s, c) = (angle / 2.0).sin_cos();
        let a = axis.scale(s / n);
        Self::new(c, a.x, a.y, a.z)
    }

    /// Rotation about the Z axis.
    pub fn from_yaw(yaw: f64) -> Self {
        Self::from_axis_angle(Vector3::new(0.0, 0.0, 1.0), yaw)
    }

    /// Return the quaternion scaled to unit length.
    pub fn normalized(&self) -> Self {
        let norm = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if norm > 1e-12 {
            Self::new(self.w / norm, self.x / norm, self.y / norm, self.z / norm)
        } else {
            Self::identity()
        }
    }

    /// Conjugate; the inverse rotation for a unit quaternion.
    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this (unit) quaternion.
    ///
    /// ```text
    /// v' = v + 2w (q × v) + 2 q × (q × v),   q = (x, y, z)
    /// ```
    pub fn rotate(&self, v: &Vector3) -> Vector3 {
        let q = Vector3::new(self.x, self.y, self.z);
        let t = q.cross(v).scale(2.0);
        *v + t.scale(self.w) + q.cross(&t)
    }

    /// Heading about the Z axis (ZYX convention).
    pub fn yaw(&self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

/// Hamilton product: `a * b` applies `b` first, then `a`.
impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, b: Quaternion) -> Quaternion {
        let a = self;
        Quaternion::new(
            a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
            a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
        )
    }
}

/// A rigid transform: rotation followed by translation.
///
/// A transform stored on the edge `parent -> child` is the pose of the child
/// frame expressed in the parent frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

impl Transform {
    pub fn new(translation: Vector3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation: rotation.normalized(),
        }
    }

    pub fn identity() -> Self {
        Self {
            translation: Vector3::ZERO,
            rotation: Quaternion::identity(),
        }
    }

    pub fn from_translation(translation: Vector3) -> Self {
        Self {
            translation,
            rotation: Quaternion::identity(),
        }
    }

    /// Compose two transforms: `self ⊕ other`.
    ///
    /// If `self` is `A -> B` and `other` is `B -> C`, the result is `A -> C`.
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform {
            translation: self.translation + self.rotation.rotate(&other.translation),
            rotation: (self.rotation * other.rotation).normalized(),
        }
    }

    /// Inverse transform (`B -> A` for an `A -> B` input).
    pub fn inverse(&self) -> Transform {
        let inv_rot = self.rotation.conjugate();
        Transform {
            translation: -inv_rot.rotate(&self.translation),
            rotation: inv_rot,
        }
    }

    /// Map a point from the child frame into the parent frame.
    pub fn transform_point(&self, point: &Vector3) -> Vector3 {
        self.rotation.rotate(point) + self.translation
    }
}

/// A planar coordinate in the map frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
}

impl MapPoint {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for MapPoint {
    fn from(xy: [f64; 2]) -> Self {
        Self::new(xy[0], xy[1])
    }
}
