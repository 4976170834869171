//! Serial-chain reference model with damped-least-squares IK.
//!
//! The chain is described base-to-tip as a list of single-DOF joints, each
//! with a fixed origin transform relative to the previous link. IK restarts
//! from random configurations until it converges, the attempt budget runs
//! out, or the request timeout expires.

use std::time::Instant;

use kinreach_math::{Iso3, Point3, Pose, Quat, Vec3};
use nalgebra::{DMatrix, DVector, Unit};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{KinematicsError, Result};
use crate::joints::{JointConfiguration, JointGroup, JointKind, JointSpec};
use crate::solver::{IkRequest, IkResponse, IkSolver, KinematicModel, SolutionCode};

/// Tuning of the damped-least-squares iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DlsSettings {
    /// Iterations per attempt.
    pub max_iterations: usize,
    /// Attempts (the request seed first, then random restarts).
    pub max_attempts: usize,
    /// Damping factor lambda.
    pub damping: f64,
    /// Largest joint-space step per iteration.
    pub max_step: f64,
    /// Converged when the position error is below this (meters).
    pub position_tolerance: f64,
    /// Converged when the orientation error is below this (radians).
    pub orientation_tolerance: f64,
}

impl Default for DlsSettings {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            max_attempts: 8,
            damping: 0.05,
            max_step: 0.5,
            position_tolerance: 1e-4,
            orientation_tolerance: 1e-3,
        }
    }
}

/// TOML description of a serial chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialChainDescription {
    /// Group name the chain is addressed by.
    pub group_name: String,
    /// End-effector link name.
    pub tip_link: String,
    /// Joints base to tip.
    pub joints: Vec<JointSpec>,
    /// Translation from the last joint frame to the tip link.
    #[serde(default)]
    pub tip_xyz: [f64; 3],
    /// Rotation from the last joint frame to the tip link.
    #[serde(default)]
    pub tip_rpy: [f64; 3],
    /// Solver tuning.
    #[serde(default)]
    pub solver: DlsSettings,
}

/// A serial manipulator that is both its own kinematic model and IK solver.
#[derive(Debug, Clone)]
pub struct SerialChain {
    group: JointGroup,
    joint_names: Vec<String>,
    tip: Iso3,
    settings: DlsSettings,
    reach: f64,
}

/// World-frame axis and origin of a joint, captured during FK.
struct JointFrame {
    origin: Point3,
    axis: Vec3,
    revolute: bool,
}

impl SerialChain {
    /// Build a chain from its description.
    pub fn from_description(desc: SerialChainDescription) -> Result<Self> {
        if desc.joints.is_empty() {
            return Err(KinematicsError::InvalidDescription(
                "chain has no joints".into(),
            ));
        }
        for (i, joint) in desc.joints.iter().enumerate() {
            joint.validate()?;
            if desc.joints[..i].iter().any(|j| j.name == joint.name) {
                return Err(KinematicsError::InvalidDescription(format!(
                    "duplicate joint name {}",
                    joint.name
                )));
            }
        }

        let tip = Pose::new(
            Point3::new(desc.tip_xyz[0], desc.tip_xyz[1], desc.tip_xyz[2]),
            Quat::from_euler_angles(desc.tip_rpy[0], desc.tip_rpy[1], desc.tip_rpy[2]),
        )
        .to_isometry();

        // Upper bound on the distance the tip can get from the base
        let mut reach = tip.translation.vector.norm();
        for joint in &desc.joints {
            reach += Vec3::from(joint.xyz).norm();
            if let JointKind::Prismatic { .. } = joint.kind {
                let (lower, upper) = joint.bounds();
                reach += lower.abs().max(upper.abs());
            }
        }

        let group = JointGroup {
            name: desc.group_name,
            joints: desc.joints,
            tip_link: desc.tip_link,
        };
        let joint_names = group.joint_names();

        Ok(Self {
            group,
            joint_names,
            tip,
            settings: desc.solver,
            reach,
        })
    }

    /// Parse a TOML description.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let desc: SerialChainDescription = toml::from_str(s)?;
        Self::from_description(desc)
    }

    /// Joint metadata of the chain.
    pub fn joint_group(&self) -> &JointGroup {
        &self.group
    }

    /// Upper bound on the base-to-tip distance.
    pub fn reach(&self) -> f64 {
        self.reach
    }

    fn forward_frames(&self, positions: &[f64]) -> (Vec<JointFrame>, Iso3) {
        let mut t = Iso3::identity();
        let mut frames = Vec::with_capacity(self.group.joints.len());
        for (joint, &q) in self.group.joints.iter().zip(positions) {
            t *= joint.origin();
            let axis = t.rotation * Unit::new_normalize(joint.kind.axis()).into_inner();
            frames.push(JointFrame {
                origin: Point3::from(t.translation.vector),
                axis,
                revolute: matches!(joint.kind, JointKind::Revolute { .. }),
            });
            t *= joint.motion(q);
        }
        (frames, t * self.tip)
    }

    fn pose_error(target: &Pose, current: &Iso3) -> DVector<f64> {
        let dp = target.position.coords - current.translation.vector;
        let dr = (target.orientation * current.rotation.inverse()).scaled_axis();
        DVector::from_column_slice(&[dp.x, dp.y, dp.z, dr.x, dr.y, dr.z])
    }

    fn converged(&self, err: &DVector<f64>) -> bool {
        let pos = (err[0] * err[0] + err[1] * err[1] + err[2] * err[2]).sqrt();
        let rot = (err[3] * err[3] + err[4] * err[4] + err[5] * err[5]).sqrt();
        pos < self.settings.position_tolerance && rot < self.settings.orientation_tolerance
    }

    /// Run one damped-least-squares descent from `seed`.
    fn descend(&self, target: &Pose, seed: &[f64], deadline: Instant) -> Option<Vec<f64>> {
        let n = self.group.joints.len();
        let mut q = seed.to_vec();
        self.group.clamp(&mut q);
        let lambda2 = self.settings.damping * self.settings.damping;

        for _ in 0..self.settings.max_iterations {
            let (frames, tip) = self.forward_frames(&q);
            let err = Self::pose_error(target, &tip);
            if self.converged(&err) {
                return Some(q);
            }
            if Instant::now() >= deadline {
                return None;
            }

            let p_tip = Point3::from(tip.translation.vector);
            let mut jac = DMatrix::<f64>::zeros(6, n);
            for (i, frame) in frames.iter().enumerate() {
                let (lin, ang) = if frame.revolute {
                    (frame.axis.cross(&(p_tip - frame.origin)), frame.axis)
                } else {
                    (frame.axis, Vec3::zeros())
                };
                for r in 0..3 {
                    jac[(r, i)] = lin[r];
                    jac[(r + 3, i)] = ang[r];
                }
            }

            let jjt = &jac * jac.transpose() + DMatrix::<f64>::identity(6, 6) * lambda2;
            let y = jjt.cholesky()?.solve(&err);
            let mut dq = jac.transpose() * y;
            let step = dq.norm();
            if step > self.settings.max_step {
                dq *= self.settings.max_step / step;
            }
            for (qi, dqi) in q.iter_mut().zip(dq.iter()) {
                *qi += dqi;
            }
            self.group.clamp(&mut q);
        }

        let (_, tip) = self.forward_frames(&q);
        self.converged(&Self::pose_error(target, &tip)).then_some(q)
    }
}

impl IkSolver for SerialChain {
    fn group_name(&self) -> &str {
        &self.group.name
    }

    fn tip_frame(&self) -> &str {
        &self.group.tip_link
    }

    fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    fn solve(&self, request: &IkRequest) -> IkResponse {
        if request.group_name != self.group.name {
            return IkResponse::failure(SolutionCode::PlanningFailed);
        }
        if request.pose.distance_from_origin() > self.reach + self.settings.position_tolerance {
            trace!(
                "target at {:.3} m is beyond reach {:.3} m",
                request.pose.distance_from_origin(),
                self.reach
            );
            return IkResponse::failure(SolutionCode::NoIkSolution);
        }

        let deadline = Instant::now() + request.timeout;
        let mut seed = if request.seed.positions.len() == self.group.dof() {
            request.seed.positions.clone()
        } else {
            vec![0.0; self.group.dof()]
        };
        // Restarts are reproducible for a given seed
        let mut rng = StdRng::seed_from_u64(seed.iter().fold(0u64, |acc, q| {
            acc.rotate_left(7) ^ q.to_bits()
        }));

        for attempt in 0..self.settings.max_attempts.max(1) {
            if let Some(q) = self.descend(&request.pose, &seed, deadline) {
                debug!("IK converged on attempt {}", attempt + 1);
                return IkResponse::success(JointConfiguration::new(self.joint_names.clone(), q));
            }
            if Instant::now() >= deadline {
                break;
            }
            seed = self.group.random_positions(&mut rng);
        }
        IkResponse::failure(SolutionCode::NoIkSolution)
    }

    fn forward(&self, positions: &[f64]) -> Option<Pose> {
        if positions.len() != self.group.dof() {
            return None;
        }
        let (_, tip) = self.forward_frames(positions);
        Some(Pose::from_isometry(&tip))
    }

    fn is_valid(&self, positions: &[f64]) -> bool {
        self.group.within_bounds(positions)
    }
}

impl KinematicModel for SerialChain {
    fn group(&self, name: &str) -> Option<&JointGroup> {
        (name == self.group.name).then_some(&self.group)
    }

    fn solver(&self, group: &str) -> Option<&dyn IkSolver> {
        (group == self.group.name).then_some(self as &dyn IkSolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    const ARM: &str = r#"
group_name = "arm"
tip_link = "tool0"
tip_xyz = [0.1, 0.0, 0.0]

[[joints]]
name = "shoulder_pan"
kind = { type = "revolute", axis = [0.0, 0.0, 1.0] }
xyz = [0.0, 0.0, 0.3]

[[joints]]
name = "shoulder_lift"
kind = { type = "revolute", axis = [0.0, 1.0, 0.0] }

[[joints]]
name = "elbow"
kind = { type = "revolute", axis = [0.0, 1.0, 0.0] }
xyz = [0.0, 0.0, 0.4]

[[joints]]
name = "wrist_1"
kind = { type = "revolute", axis = [1.0, 0.0, 0.0] }
xyz = [0.35, 0.0, 0.0]

[[joints]]
name = "wrist_2"
kind = { type = "revolute", axis = [0.0, 1.0, 0.0] }

[[joints]]
name = "wrist_3"
kind = { type = "revolute", axis = [1.0, 0.0, 0.0] }
"#;

    fn arm() -> SerialChain {
        SerialChain::from_toml_str(ARM).unwrap()
    }

    fn request(chain: &SerialChain, pose: Pose, seed: Vec<f64>) -> IkRequest {
        IkRequest {
            group_name: "arm".into(),
            ik_link_name: "tool0".into(),
            pose,
            seed: JointConfiguration::new(chain.joint_names().to_vec(), seed),
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_forward_at_zero() {
        let chain = arm();
        let pose = chain.forward(&[0.0; 6]).unwrap();
        assert_relative_eq!(pose.position.x, 0.45, epsilon = 1e-12);
        assert_relative_eq!(pose.position.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(pose.position.z, 0.7, epsilon = 1e-12);
        assert!(chain.forward(&[0.0; 3]).is_none());
    }

    #[test]
    fn test_reach_bound() {
        assert_relative_eq!(arm().reach(), 1.15, epsilon = 1e-12);
    }

    #[test]
    fn test_ik_recovers_fk_pose_from_nearby_seed() {
        let chain = arm();
        let truth = [0.3, -0.5, 0.8, 0.2, 0.6, -0.4];
        let target = chain.forward(&truth).unwrap();
        let seed: Vec<f64> = truth.iter().map(|q| q + 0.05).collect();

        let response = chain.solve(&request(&chain, target, seed));
        assert_eq!(response.code, SolutionCode::Success);
        assert_eq!(response.solution.names, chain.joint_names());

        let reached = chain.forward(&response.solution.positions).unwrap();
        assert!((reached.position - target.position).norm() < 1e-3);
        assert!(reached.orientation.angle_to(&target.orientation) < 1e-2);
    }

    #[test]
    fn test_out_of_reach_fails_fast() {
        let chain = arm();
        let start = Instant::now();
        let response = chain.solve(&request(&chain, Pose::from_position(5.0, 0.0, 0.0), vec![0.0; 6]));
        assert_eq!(response.code, SolutionCode::NoIkSolution);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_wrong_group_is_rejected() {
        let chain = arm();
        let mut req = request(&chain, Pose::from_position(0.4, 0.0, 0.6), vec![0.0; 6]);
        req.group_name = "other".into();
        assert_eq!(chain.solve(&req).code, SolutionCode::PlanningFailed);
    }

    #[test]
    fn test_model_lookup() {
        let chain = arm();
        assert!(chain.group("arm").is_some());
        assert!(chain.group("leg").is_none());
        assert_eq!(chain.solver("arm").map(|s| s.tip_frame()), Some("tool0"));
    }

    #[test]
    fn test_duplicate_joint_names_rejected() {
        let doubled = ARM.replace("\"wrist_3\"", "\"wrist_1\"");
        assert!(matches!(
            SerialChain::from_toml_str(&doubled),
            Err(KinematicsError::InvalidDescription(_))
        ));
    }
}
