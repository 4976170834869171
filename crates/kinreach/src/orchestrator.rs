//! Single IK queries: request construction, seeding and classification.

use std::time::Duration;

use kinreach_kinematics::{IkRequest, JointConfiguration, KinematicModel, SolutionCode};
use kinreach_math::Pose;
use rand::RngCore;
use tracing::trace;

use crate::cache_bridge::{CacheBridge, SeedLookup};
use crate::tool_frame::ToolOffset;
use crate::{ReachError, Result};

/// Per-query solver budget when none is configured.
pub const DEFAULT_IK_TIMEOUT: Duration = Duration::from_secs(5);

/// Classification of one IK query plus the solver's configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct IkOutcome {
    /// Solver verdict, or `PlanningFailed` for a pose outside cache coverage.
    pub code: SolutionCode,
    /// Configuration as returned by the solver (meaningful on success).
    pub solution: JointConfiguration,
}

impl IkOutcome {
    fn rejected() -> Self {
        Self {
            code: SolutionCode::PlanningFailed,
            solution: JointConfiguration::default(),
        }
    }

    /// True for a successful query.
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }
}

/// Request for `group` with a random seed inside the joint limits and the
/// group's tip link as IK link. The pose is left at identity.
pub fn default_request<M: KinematicModel + ?Sized>(
    model: &M,
    group: &str,
    rng: &mut dyn RngCore,
    timeout: Duration,
) -> Result<IkRequest> {
    let joint_group = model
        .group(group)
        .ok_or_else(|| ReachError::UnknownGroup(group.to_string()))?;
    let positions = model
        .random_positions(group, rng)
        .ok_or_else(|| ReachError::UnknownGroup(group.to_string()))?;

    Ok(IkRequest {
        group_name: group.to_string(),
        ik_link_name: joint_group.tip_link.clone(),
        pose: Pose::identity(),
        seed: JointConfiguration::new(joint_group.joint_names(), positions),
        timeout,
    })
}

/// Everything one IK query needs besides the pose.
pub struct IkContext<'a, M: KinematicModel + ?Sized> {
    /// Kinematics provider.
    pub model: &'a M,
    /// Tool offset applied to every target.
    pub tool: &'a ToolOffset,
    /// Cache to seed from, when active for the queried group.
    pub cache: Option<&'a CacheBridge>,
    /// Solver budget.
    pub timeout: Duration,
}

impl<M: KinematicModel + ?Sized> IkContext<'_, M> {
    /// Solve for the tool frame reaching `pose`.
    ///
    /// The target is moved into the solver frame first. With a cache, a pose
    /// outside its coverage is classified `PlanningFailed` without calling the
    /// solver; a cached configuration for the pose's cell replaces the random
    /// seed. Otherwise the solver is called exactly once.
    pub fn find_ik(&self, group: &str, pose: &Pose, rng: &mut dyn RngCore) -> Result<IkOutcome> {
        let solver = self
            .model
            .solver(group)
            .ok_or_else(|| ReachError::UnknownGroup(group.to_string()))?;
        let mut request = default_request(self.model, group, rng, self.timeout)?;
        request.pose = self.tool.to_solver_frame(pose);

        if let Some(bridge) = self.cache {
            match bridge.try_seed(&request.pose) {
                SeedLookup::OutOfCoverage => {
                    trace!("Pose outside cache coverage, skipping solver");
                    return Ok(IkOutcome::rejected());
                }
                SeedLookup::Miss => {}
                SeedLookup::Hit(seed) => request.seed.positions = seed,
            }
        }

        let response = solver.solve(&request);
        Ok(IkOutcome {
            code: response.code,
            solution: response.solution,
        })
    }
}
