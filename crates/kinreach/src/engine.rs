//! The reachability engine.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use kinreach_cache::KinematicsCache;
use kinreach_kinematics::{JointConfiguration, KinematicModel, SolutionCode};
use kinreach_math::{Pose, Quat};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::aggregate::{display_trajectory, point_trajectory, points_at_orientation, remove_unreachable};
use crate::cache_bridge::CacheBridge;
use crate::config::EngineConfig;
use crate::orchestrator::{IkContext, IkOutcome};
use crate::sampler::sample_uniform;
use crate::tool_frame::ToolOffset;
use crate::types::{WorkspacePoint, WorkspacePoints};
use crate::visualize::{arrow_markers, sample_markers, sphere_markers, Marker, WorkspaceSink};
use crate::{ReachError, Result};

/// Progress is logged every this many samples on large sweeps.
const PROGRESS_INTERVAL: usize = 1000;
/// Sweeps up to this size log every sample.
const SMALL_SWEEP: usize = 100;

/// Lifecycle of the workspace currently being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing sampled yet, or the last request failed before sampling.
    Uninitialized,
    /// Grid sampled, no point evaluated.
    Sampled,
    /// Points being evaluated.
    Solving,
    /// Every point classified.
    Finalized,
}

/// Computes which sampled end-effector poses a joint group can reach.
///
/// The engine owns its kinematic model, the IK solution cache and the random
/// source. Everything runs on the calling thread; one request at a time.
pub struct ReachabilityEngine<M: KinematicModel> {
    model: M,
    config: EngineConfig,
    tool: ToolOffset,
    bridge: CacheBridge,
    /// Groups whose cache has been prepared at least once.
    prepared_groups: HashSet<String>,
    rng: StdRng,
    state: EngineState,
    sink: Option<Box<dyn WorkspaceSink>>,
}

impl<M: KinematicModel> ReachabilityEngine<M> {
    /// Create an engine. Fails without a configured cache file.
    pub fn new(model: M, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let path = config
            .cache_filename
            .clone()
            .ok_or(ReachError::MissingCacheFile)?;
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            bridge: CacheBridge::new(path, config.cache.clone()),
            model,
            config,
            tool: ToolOffset::identity(),
            prepared_groups: HashSet::new(),
            rng,
            state: EngineState::Uninitialized,
            sink: None,
        })
    }

    /// Attach a sink for markers, reports and trajectories.
    pub fn with_sink(mut self, sink: Box<dyn WorkspaceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replace the sink.
    pub fn set_sink(&mut self, sink: Option<Box<dyn WorkspaceSink>>) {
        self.sink = sink;
    }

    /// The kinematic model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Engine settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// State of the last workspace request.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Current tool offset.
    pub fn tool_offset(&self) -> &ToolOffset {
        &self.tool
    }

    /// The loaded IK solution cache, if any.
    pub fn cache(&self) -> Option<&KinematicsCache> {
        self.bridge.cache()
    }

    /// True when queries for `group` are seeded from the cache.
    pub fn is_cache_active(&self, group: &str) -> bool {
        self.bridge.is_active_for(group)
    }

    fn require_group(&self, group: &str) -> Result<()> {
        if self.model.group(group).is_none() || self.model.solver(group).is_none() {
            return Err(ReachError::UnknownGroup(group.to_string()));
        }
        Ok(())
    }

    // =========================================================================
    // Workspace computation
    // =========================================================================

    /// Sample `ws` on its grid and classify every point.
    ///
    /// The first request for a group loads or generates that group's cache.
    /// A cache that cannot be prepared is logged and the sweep runs without
    /// it. On success every point carries a solution code and the cache file
    /// holds the solutions found.
    pub fn compute_workspace(&mut self, ws: &mut WorkspacePoints, visualize: bool) -> Result<()> {
        self.state = EngineState::Uninitialized;
        self.require_group(&ws.group_name)?;

        if self.prepared_groups.insert(ws.group_name.clone()) {
            let timeout = self.config.cache_timeout();
            self.generate_cache(&ws.group_name, timeout)?;
        }

        self.set_tool_frame_offset(&ws.tool_frame_offset);
        sample_uniform(ws)?;
        self.state = EngineState::Sampled;
        info!(
            "Computing reachability for {} ({} points)",
            ws.group_name,
            ws.points.len()
        );
        if visualize {
            self.visualize_workspace_samples(ws);
        }

        self.find_ik_solutions(ws, visualize)
    }

    /// [`Self::compute_workspace`] followed by removal of every point that is
    /// not reachable.
    pub fn only_reachable_workspace(&mut self, ws: &mut WorkspacePoints, visualize: bool) -> Result<()> {
        self.compute_workspace(ws, visualize)?;
        remove_unreachable(ws);
        Ok(())
    }

    fn find_ik_solutions(&mut self, ws: &mut WorkspacePoints, visualize: bool) -> Result<()> {
        self.state = EngineState::Solving;
        let group = ws.group_name.clone();
        let total = ws.points.len();

        for i in 0..total {
            let pose = ws.points[i].pose;
            if total <= SMALL_SWEEP || i % PROGRESS_INTERVAL == 0 {
                info!(
                    "At sample {i} of {total}, ({:.3}, {:.3}, {:.3})",
                    pose.position.x, pose.position.y, pose.position.z
                );
            }

            let outcome = self.find_ik(&group, &pose)?;
            let point = &mut ws.points[i];
            point.solution_code = Some(outcome.code);
            debug!("Point {i}: {}", outcome.code);
            if outcome.is_success() {
                if self.bridge.is_active_for(&group) {
                    let tip = self.tool.to_solver_frame(&pose);
                    self.bridge.record(&tip, &outcome.solution.positions);
                }
                point.robot_state = Some(outcome.solution);
            }

            if visualize {
                self.visualize(ws, "online");
                self.animate_point(ws, i);
            }
        }

        if self.bridge.is_active_for(&group) {
            if let Err(e) = self.bridge.persist() {
                warn!("Could not write cache to {}: {e}", self.bridge.path().display());
            }
        }
        self.state = EngineState::Finalized;
        info!(
            "{} of {total} points reachable for {group}",
            ws.num_reachable()
        );
        Ok(())
    }

    /// Repeatedly solve for the same `pose` with fresh random seeds until
    /// `timeout` elapses, one point per attempt. The cache is bypassed while
    /// this runs.
    pub fn compute_redundant_solutions(
        &mut self,
        group: &str,
        frame_id: &str,
        pose: &Pose,
        timeout: Duration,
        visualize: bool,
    ) -> Result<WorkspacePoints> {
        self.require_group(group)?;
        let mut ws = WorkspacePoints::new(group, frame_id);
        self.set_tool_frame_offset(&ws.tool_frame_offset);

        let was_enabled = self.bridge.enabled();
        self.bridge.set_enabled(false);
        let result = self.sample_redundant(&mut ws, pose, timeout, visualize);
        self.bridge.set_enabled(was_enabled);
        result?;

        info!(
            "{} of {} attempts succeeded",
            ws.num_reachable(),
            ws.points.len()
        );
        Ok(ws)
    }

    fn sample_redundant(
        &mut self,
        ws: &mut WorkspacePoints,
        pose: &Pose,
        timeout: Duration,
        visualize: bool,
    ) -> Result<()> {
        let group = ws.group_name.clone();
        let start = Instant::now();
        while start.elapsed() <= timeout {
            let outcome = self.find_ik(&group, pose)?;
            let mut point = WorkspacePoint::new(*pose);
            point.solution_code = Some(outcome.code);
            let success = outcome.is_success();
            if success {
                point.robot_state = Some(outcome.solution);
            }
            ws.points.push(point);
            if success && visualize {
                self.visualize(ws, "");
            }
        }
        Ok(())
    }

    /// Fill `ws` with forward kinematics of random configurations until
    /// `timeout` elapses. Valid configurations are `Success`, the rest
    /// `NoIkSolution`. Poses are reported in the tool frame of `ws`.
    pub fn compute_workspace_fk(&mut self, ws: &mut WorkspacePoints, timeout: Duration) -> Result<()> {
        let group = ws.group_name.clone();
        self.require_group(&group)?;
        self.set_tool_frame_offset(&ws.tool_frame_offset);

        let unknown = || ReachError::UnknownGroup(group.clone());
        let solver = self.model.solver(&group).ok_or_else(unknown)?;
        let joint_group = self.model.group(&group).ok_or_else(unknown)?;
        let names = solver.joint_names().to_vec();

        let start = Instant::now();
        while start.elapsed() <= timeout {
            let positions = joint_group.random_positions(&mut self.rng);
            let tip = solver
                .forward(&positions)
                .ok_or_else(|| ReachError::ForwardKinematics(group.clone()))?;
            let code = if solver.is_valid(&positions) {
                SolutionCode::Success
            } else {
                SolutionCode::NoIkSolution
            };
            let mut point = WorkspacePoint::new(self.tool.to_tool_frame(&tip));
            point.solution_code = Some(code);
            point.robot_state = Some(JointConfiguration::new(names.clone(), positions));
            ws.points.push(point);
        }
        ws.ordered = false;
        info!(
            "FK sampling for {group}: {} of {} states valid",
            ws.num_reachable(),
            ws.points.len()
        );
        Ok(())
    }

    /// Solve IK for the tool frame at `pose`, seeded from the cache when it
    /// is active for `group`.
    pub fn find_ik(&mut self, group: &str, pose: &Pose) -> Result<IkOutcome> {
        let cache = self.bridge.is_active_for(group).then_some(&self.bridge);
        let ctx = IkContext {
            model: &self.model,
            tool: &self.tool,
            cache,
            timeout: self.config.ik_timeout(),
        };
        ctx.find_ik(group, pose, &mut self.rng)
    }

    /// Load the cache for `group` from file, or generate it by sampling for
    /// `timeout` and write it out. Returns whether the cache is usable; a
    /// failure other than an unknown group only disables the cache.
    pub fn generate_cache(&mut self, group: &str, timeout: Duration) -> Result<bool> {
        self.require_group(group)?;
        match self.bridge.prepare(&self.model, group, &mut self.rng, timeout) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Not using cache for {group}: {e}");
                Ok(false)
            }
        }
    }

    /// Set the tool frame relative to the solver tip frame.
    pub fn set_tool_frame_offset(&mut self, pose: &Pose) {
        self.tool.set(pose);
    }

    // =========================================================================
    // Display
    // =========================================================================

    fn publish_markers(&mut self, markers: Vec<Marker>) {
        if let Some(sink) = self.sink.as_mut() {
            sink.publish_markers(markers);
        }
    }

    /// Publish sphere markers of every point under namespace `ns`.
    pub fn visualize(&mut self, ws: &WorkspacePoints, ns: &str) {
        if self.sink.is_none() {
            return;
        }
        let markers = sphere_markers(ws, ns, &[], &self.config.markers);
        self.publish_markers(markers);
    }

    /// Publish one set of sphere markers per orientation, each holding the
    /// points sampled at that orientation. Orientations without points are
    /// skipped.
    pub fn visualize_orientations(&mut self, ws: &WorkspacePoints, ns: &str, orientations: &[Quat]) {
        if self.sink.is_none() {
            return;
        }
        for (i, q) in orientations.iter().enumerate() {
            let indices = points_at_orientation(ws, q);
            if indices.is_empty() {
                debug!("No points at orientation {i}");
                continue;
            }
            let markers = sphere_markers(ws, &format!("{ns}orientation_{i}"), &indices, &self.config.markers);
            self.publish_markers(markers);
        }
    }

    /// Publish sphere markers plus one arrow per point.
    pub fn visualize_with_arrows(&mut self, ws: &WorkspacePoints, ns: &str) {
        if self.sink.is_none() {
            return;
        }
        let style = &self.config.markers;
        let mut markers = sphere_markers(ws, ns, &[], style);
        markers.extend(arrow_markers(ws, ns, &[], style));
        self.publish_markers(markers);
    }

    /// Publish the requested region and the positions it samples.
    pub fn visualize_workspace_samples(&mut self, ws: &WorkspacePoints) {
        if self.sink.is_none() {
            return;
        }
        let markers = sample_markers(ws, &self.config.markers);
        self.publish_markers(markers);
    }

    /// Publish a trajectory through every reachable configuration.
    pub fn animate_workspace(&mut self, ws: &WorkspacePoints) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        match display_trajectory(ws) {
            Some(trajectory) => sink.publish_trajectory(&trajectory),
            None => warn!("No reachable points to animate"),
        }
    }

    /// Publish the configuration of point `index`, if it is reachable.
    pub fn animate_point(&mut self, ws: &WorkspacePoints, index: usize) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let Some(point) = ws.points.get(index) else {
            warn!("Point index {index} out of range ({} points)", ws.points.len());
            return;
        };
        if let Some(trajectory) = point_trajectory(point) {
            sink.publish_trajectory(&trajectory);
        }
    }

    /// Publish the workspace report.
    pub fn publish_workspace(&mut self, ws: &WorkspacePoints) {
        if let Some(sink) = self.sink.as_mut() {
            sink.publish_workspace(ws);
        }
    }
}
