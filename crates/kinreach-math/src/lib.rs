#![warn(missing_docs)]

//! Math types for kinreach.
//!
//! Thin wrappers around nalgebra providing the rigid-body types used by the
//! reachability engine: points, rotations, end-effector poses, and tolerance
//! constants for comparing them.

use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A point in 3D space (meters).
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A unit quaternion describing an orientation.
pub type Quat = UnitQuaternion<f64>;

/// A rigid transform.
pub type Iso3 = Isometry3<f64>;

/// Build a normalized orientation from raw `(x, y, z, w)` components.
///
/// Returns `None` for a zero-length quaternion.
pub fn quat_from_xyzw(x: f64, y: f64, z: f64, w: f64) -> Option<Quat> {
    let q = Quaternion::new(w, x, y, z);
    if q.norm() < 1e-12 {
        return None;
    }
    Some(UnitQuaternion::from_quaternion(q))
}

/// Position plus orientation of a frame, expressed in some reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Frame origin.
    pub position: Point3,
    /// Frame orientation.
    pub orientation: Quat,
}

impl Pose {
    /// Create a pose from its parts.
    pub fn new(position: Point3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// The identity pose (origin, no rotation).
    pub fn identity() -> Self {
        Self::new(Point3::origin(), Quat::identity())
    }

    /// A pose at `(x, y, z)` with identity orientation.
    pub fn from_position(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z), Quat::identity())
    }

    /// Convert from an isometry.
    pub fn from_isometry(iso: &Iso3) -> Self {
        Self::new(Point3::from(iso.translation.vector), iso.rotation)
    }

    /// Convert to an isometry.
    pub fn to_isometry(&self) -> Iso3 {
        Isometry3::from_parts(Translation3::from(self.position.coords), self.orientation)
    }

    /// Compose: `self ∘ other` (apply `other` in the frame of `self`).
    pub fn compose(&self, other: &Pose) -> Pose {
        Self::from_isometry(&(self.to_isometry() * other.to_isometry()))
    }

    /// Inverse rigid transform.
    pub fn inverse(&self) -> Pose {
        Self::from_isometry(&self.to_isometry().inverse())
    }

    /// Squared Euclidean distance from the pose position to `point`.
    pub fn squared_distance_to(&self, point: &Point3) -> f64 {
        (self.position - point).norm_squared()
    }

    /// Distance of the pose position from the reference frame origin.
    pub fn distance_from_origin(&self) -> f64 {
        self.position.coords.norm()
    }

    /// Check whether two poses coincide within `tol`.
    pub fn approx_eq(&self, other: &Pose, tol: &Tolerance) -> bool {
        tol.points_equal(&self.position, &other.position)
            && tol.orientations_equal(&self.orientation, &other.orientation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Tolerance constants for pose comparisons.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in meters.
    pub linear: f64,
    /// Angular tolerance in radians.
    pub angular: f64,
}

impl Tolerance {
    /// Tight numerical tolerances (1e-6 m linear, 1e-6 rad angular).
    pub const DEFAULT: Self = Self {
        linear: 1e-6,
        angular: 1e-6,
    };

    /// Orientation matching used when slicing a workspace by orientation
    /// (0.001 rad shortest-path angle).
    pub const ORIENTATION_MATCH: Self = Self {
        linear: 1e-6,
        angular: 1e-3,
    };

    /// Create a tolerance pair.
    pub const fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// Check if two points are coincident within tolerance.
    pub fn points_equal(&self, a: &Point3, b: &Point3) -> bool {
        (a - b).norm() < self.linear
    }

    /// Check if two orientations differ by less than the angular tolerance
    /// along the shortest rotation between them.
    pub fn orientations_equal(&self, a: &Quat, b: &Quat) -> bool {
        a.angle_to(b) < self.angular
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_identity_compose() {
        let p = Pose::new(
            Point3::new(1.0, 2.0, 3.0),
            Quat::from_euler_angles(0.1, 0.2, 0.3),
        );
        let result = p.compose(&Pose::identity());
        assert!(result.approx_eq(&p, &Tolerance::new(1e-12, 1e-6)));
    }

    #[test]
    fn test_compose_applies_rotation_first() {
        // Frame rotated 90 degrees about Z, then a point 1m along its local X
        let frame = Pose::new(
            Point3::new(1.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::z_axis(), PI / 2.0),
        );
        let local = Pose::from_position(1.0, 0.0, 0.0);
        let result = frame.compose(&local);
        assert_relative_eq!(result.position.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.position.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.position.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let offset = Pose::new(
            Point3::new(0.0, 0.0, 0.15),
            Quat::from_euler_angles(0.0, PI / 2.0, 0.0),
        );
        let p = Pose::new(
            Point3::new(0.4, -0.2, 0.7),
            Quat::from_euler_angles(0.3, -0.1, 1.2),
        );
        let back = p.compose(&offset).compose(&offset.inverse());
        assert!(back.approx_eq(&p, &Tolerance::new(1e-9, 1e-6)));
    }

    #[test]
    fn test_squared_distance() {
        let p = Pose::from_position(1.0, 2.0, 2.0);
        assert_relative_eq!(p.squared_distance_to(&Point3::origin()), 9.0);
        assert_relative_eq!(p.distance_from_origin(), 3.0);
        assert_relative_eq!(p.squared_distance_to(&Point3::new(1.0, 2.0, 0.0)), 4.0);
    }

    #[test]
    fn test_orientation_match_threshold() {
        let tol = Tolerance::ORIENTATION_MATCH;
        let a = Quat::identity();
        let close = Quat::from_axis_angle(&Vec3::x_axis(), 0.0005);
        let far = Quat::from_axis_angle(&Vec3::x_axis(), 0.01);
        assert!(tol.orientations_equal(&a, &close));
        assert!(!tol.orientations_equal(&a, &far));
    }

    #[test]
    fn test_orientation_sign_ambiguity() {
        // q and -q are the same rotation
        let q = Quat::from_euler_angles(0.2, 0.4, -0.3);
        let neg = UnitQuaternion::new_unchecked(-q.into_inner());
        assert!(Tolerance::ORIENTATION_MATCH.orientations_equal(&q, &neg));
    }

    #[test]
    fn test_quat_from_xyzw() {
        let q = quat_from_xyzw(0.0, 0.0, 0.0, 2.0).unwrap();
        assert_relative_eq!(q.w, 1.0);
        assert!(quat_from_xyzw(0.0, 0.0, 0.0, 0.0).is_none());
    }

    #[test]
    fn test_tolerance_points_equal() {
        let tol = Tolerance::DEFAULT;
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(1.0 + 1e-7, 2.0, 3.0);
        assert!(tol.points_equal(&a, &b));
        let c = Point3::new(1.001, 2.0, 3.0);
        assert!(!tol.points_equal(&a, &c));
    }
}
