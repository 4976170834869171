//! Contracts between the reachability engine and its kinematics providers.

use std::fmt;
use std::time::Duration;

use kinreach_math::Pose;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::joints::{JointConfiguration, JointGroup};

/// Outcome of a single IK query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolutionCode {
    /// A valid joint configuration reaches the pose.
    Success,
    /// The solver ran and found no feasible configuration.
    NoIkSolution,
    /// The request was rejected before or instead of solving.
    PlanningFailed,
}

impl SolutionCode {
    /// True for [`SolutionCode::Success`].
    pub fn is_success(self) -> bool {
        self == SolutionCode::Success
    }
}

impl fmt::Display for SolutionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolutionCode::Success => "SUCCESS",
            SolutionCode::NoIkSolution => "NO_IK_SOLUTION",
            SolutionCode::PlanningFailed => "PLANNING_FAILED",
        };
        f.write_str(name)
    }
}

/// An IK query handed to a solver.
#[derive(Debug, Clone)]
pub struct IkRequest {
    /// Group to solve for.
    pub group_name: String,
    /// Link whose pose is constrained.
    pub ik_link_name: String,
    /// Target pose of `ik_link_name` in the solver's native frame.
    pub pose: Pose,
    /// Initial configuration.
    pub seed: JointConfiguration,
    /// Wall-clock budget for this query.
    pub timeout: Duration,
}

/// Solver answer for one [`IkRequest`].
#[derive(Debug, Clone)]
pub struct IkResponse {
    /// Classification of the attempt.
    pub code: SolutionCode,
    /// Resulting configuration (meaningful only on success).
    pub solution: JointConfiguration,
}

impl IkResponse {
    /// A successful answer.
    pub fn success(solution: JointConfiguration) -> Self {
        Self {
            code: SolutionCode::Success,
            solution,
        }
    }

    /// A failed answer with an empty configuration.
    pub fn failure(code: SolutionCode) -> Self {
        Self {
            code,
            solution: JointConfiguration::default(),
        }
    }
}

/// A numerical IK/FK solver for one joint group.
pub trait IkSolver {
    /// Group this solver serves.
    fn group_name(&self) -> &str;

    /// Link whose pose the solver computes.
    fn tip_frame(&self) -> &str;

    /// Joint names in solver order.
    fn joint_names(&self) -> &[String];

    /// Attempt to reach `request.pose`. Blocking, bounded by `request.timeout`.
    fn solve(&self, request: &IkRequest) -> IkResponse;

    /// Forward kinematics of the tip frame.
    fn forward(&self, positions: &[f64]) -> Option<Pose>;

    /// Validity (collision/constraint) check of a configuration.
    fn is_valid(&self, _positions: &[f64]) -> bool {
        true
    }
}

/// Per-group joint metadata plus solver lookup.
pub trait KinematicModel {
    /// Metadata of a group, if it exists.
    fn group(&self, name: &str) -> Option<&JointGroup>;

    /// Solver for a group, if one is loaded.
    fn solver(&self, group: &str) -> Option<&dyn IkSolver>;

    /// Randomized configuration within the group's joint bounds.
    fn random_positions(&self, group: &str, rng: &mut dyn RngCore) -> Option<Vec<f64>> {
        self.group(group).map(|g| g.random_positions(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solution_code_display() {
        assert_eq!(SolutionCode::NoIkSolution.to_string(), "NO_IK_SOLUTION");
        assert_eq!(SolutionCode::PlanningFailed.to_string(), "PLANNING_FAILED");
        assert!(SolutionCode::Success.is_success());
        assert!(!SolutionCode::PlanningFailed.is_success());
    }

    #[test]
    fn test_failure_response_is_empty() {
        let r = IkResponse::failure(SolutionCode::PlanningFailed);
        assert!(r.solution.is_empty());
        assert_eq!(r.code, SolutionCode::PlanningFailed);
    }
}
