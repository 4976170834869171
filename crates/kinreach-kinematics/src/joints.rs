//! Joint and joint-group definitions.

use std::f64::consts::PI;

use kinreach_math::{Iso3, Point3, Pose, Quat, Vec3};
use nalgebra::{Translation3, Unit};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{KinematicsError, Result};

/// Travel assumed for a prismatic joint without explicit limits (meters).
pub const DEFAULT_PRISMATIC_TRAVEL: f64 = 1.0;

/// Kind of a single-DOF joint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JointKind {
    /// Rotation about `axis` (radians).
    Revolute {
        /// Rotation axis in the joint frame.
        axis: [f64; 3],
    },
    /// Translation along `axis` (meters).
    Prismatic {
        /// Translation axis in the joint frame.
        axis: [f64; 3],
    },
}

impl JointKind {
    /// The joint axis as a vector.
    pub fn axis(&self) -> Vec3 {
        match self {
            JointKind::Revolute { axis } | JointKind::Prismatic { axis } => {
                Vec3::new(axis[0], axis[1], axis[2])
            }
        }
    }
}

/// A joint of a serial group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    /// Joint name.
    pub name: String,
    /// Joint kind and axis.
    pub kind: JointKind,
    /// Translation from the parent link frame to the joint frame.
    #[serde(default)]
    pub xyz: [f64; 3],
    /// Fixed roll/pitch/yaw from the parent link frame to the joint frame.
    #[serde(default)]
    pub rpy: [f64; 3],
    /// Lower/upper position limits.
    #[serde(default)]
    pub limits: Option<[f64; 2]>,
}

impl JointSpec {
    /// Check axis and limits.
    pub fn validate(&self) -> Result<()> {
        if self.kind.axis().norm() < 1e-9 {
            return Err(KinematicsError::InvalidJoint {
                name: self.name.clone(),
                reason: "axis has zero length".into(),
            });
        }
        if let Some([lower, upper]) = self.limits {
            if !(lower <= upper) {
                return Err(KinematicsError::InvalidJoint {
                    name: self.name.clone(),
                    reason: format!("lower limit {lower} exceeds upper limit {upper}"),
                });
            }
        }
        Ok(())
    }

    /// Position bounds, falling back to a full turn for revolute joints and
    /// [`DEFAULT_PRISMATIC_TRAVEL`] for prismatic ones.
    pub fn bounds(&self) -> (f64, f64) {
        match (self.limits, &self.kind) {
            (Some([lower, upper]), _) => (lower, upper),
            (None, JointKind::Revolute { .. }) => (-PI, PI),
            (None, JointKind::Prismatic { .. }) => {
                (-DEFAULT_PRISMATIC_TRAVEL, DEFAULT_PRISMATIC_TRAVEL)
            }
        }
    }

    /// Fixed transform from the parent link to this joint's frame.
    pub fn origin(&self) -> Iso3 {
        let [x, y, z] = self.xyz;
        let [roll, pitch, yaw] = self.rpy;
        Pose::new(
            Point3::new(x, y, z),
            Quat::from_euler_angles(roll, pitch, yaw),
        )
        .to_isometry()
    }

    /// Transform produced by moving the joint to `position`.
    pub fn motion(&self, position: f64) -> Iso3 {
        let axis = Unit::new_normalize(self.kind.axis());
        match self.kind {
            JointKind::Revolute { .. } => {
                Iso3::from_parts(Translation3::identity(), Quat::from_axis_angle(&axis, position))
            }
            JointKind::Prismatic { .. } => Iso3::from_parts(
                Translation3::from(axis.into_inner() * position),
                Quat::identity(),
            ),
        }
    }
}

/// Joint values paired with their joint names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JointConfiguration {
    /// Joint names, same order as `positions`.
    pub names: Vec<String>,
    /// Joint positions (radians or meters).
    pub positions: Vec<f64>,
}

impl JointConfiguration {
    /// Pair names with positions.
    pub fn new(names: Vec<String>, positions: Vec<f64>) -> Self {
        Self { names, positions }
    }

    /// True when no joint values are held.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A named set of joints driving one end-effector link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointGroup {
    /// Group name.
    pub name: String,
    /// Joints from base to tip.
    pub joints: Vec<JointSpec>,
    /// Name of the end-effector link IK targets.
    pub tip_link: String,
}

impl JointGroup {
    /// Joint names in chain order.
    pub fn joint_names(&self) -> Vec<String> {
        self.joints.iter().map(|j| j.name.clone()).collect()
    }

    /// Number of joints.
    pub fn dof(&self) -> usize {
        self.joints.len()
    }

    /// Draw a configuration uniformly within the joint bounds.
    pub fn random_positions<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.joints
            .iter()
            .map(|j| {
                let (lower, upper) = j.bounds();
                if upper > lower {
                    rng.gen_range(lower..=upper)
                } else {
                    lower
                }
            })
            .collect()
    }

    /// Clamp `positions` into the joint bounds in place.
    pub fn clamp(&self, positions: &mut [f64]) {
        for (q, j) in positions.iter_mut().zip(&self.joints) {
            let (lower, upper) = j.bounds();
            *q = q.clamp(lower, upper);
        }
    }

    /// Check that `positions` has the right length and lies within bounds.
    pub fn within_bounds(&self, positions: &[f64]) -> bool {
        positions.len() == self.joints.len()
            && positions.iter().zip(&self.joints).all(|(q, j)| {
                let (lower, upper) = j.bounds();
                *q >= lower && *q <= upper
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn revolute(name: &str, limits: Option<[f64; 2]>) -> JointSpec {
        JointSpec {
            name: name.to_string(),
            kind: JointKind::Revolute {
                axis: [0.0, 0.0, 1.0],
            },
            xyz: [0.0, 0.0, 0.1],
            rpy: [0.0, 0.0, 0.0],
            limits,
        }
    }

    #[test]
    fn test_bounds_defaults() {
        assert_eq!(revolute("a", None).bounds(), (-PI, PI));
        assert_eq!(revolute("a", Some([-1.0, 2.0])).bounds(), (-1.0, 2.0));
        let slider = JointSpec {
            name: "s".into(),
            kind: JointKind::Prismatic {
                axis: [1.0, 0.0, 0.0],
            },
            xyz: [0.0; 3],
            rpy: [0.0; 3],
            limits: None,
        };
        assert_eq!(
            slider.bounds(),
            (-DEFAULT_PRISMATIC_TRAVEL, DEFAULT_PRISMATIC_TRAVEL)
        );
    }

    #[test]
    fn test_validate_rejects_bad_joints() {
        let mut j = revolute("a", Some([1.0, -1.0]));
        assert!(j.validate().is_err());
        j.limits = None;
        j.kind = JointKind::Revolute {
            axis: [0.0, 0.0, 0.0],
        };
        assert!(j.validate().is_err());
    }

    #[test]
    fn test_random_positions_within_bounds() {
        let group = JointGroup {
            name: "arm".into(),
            joints: vec![revolute("a", Some([-0.5, 0.5])), revolute("b", None)],
            tip_link: "tool".into(),
        };
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let q = group.random_positions(&mut rng);
            assert!(group.within_bounds(&q));
        }
        assert!(!group.within_bounds(&[0.0]));
    }

    #[test]
    fn test_clamp() {
        let group = JointGroup {
            name: "arm".into(),
            joints: vec![revolute("a", Some([-0.5, 0.5]))],
            tip_link: "tool".into(),
        };
        let mut q = vec![2.0];
        group.clamp(&mut q);
        assert_relative_eq!(q[0], 0.5);
    }

    #[test]
    fn test_revolute_motion() {
        let j = revolute("a", None);
        let m = j.motion(PI / 2.0);
        let p = m * Point3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }
}
