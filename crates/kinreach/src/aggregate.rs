//! Queries and reductions over a computed workspace.

use kinreach_kinematics::SolutionCode;
use kinreach_math::{Quat, Tolerance};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sampler::num_grid_points;
use crate::types::{WorkspacePoint, WorkspacePoints};

/// Point indices split by reachability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    /// Indices of points classified `Success`.
    pub reachable: Vec<usize>,
    /// Indices of all other points.
    pub unreachable: Vec<usize>,
}

/// Split point indices into reachable and unreachable in one pass.
///
/// For a grid-ordered workspace only the first `nx·ny·nz·|orientations|`
/// points are considered; a shorter point list is scanned as far as it goes.
pub fn position_index(ws: &WorkspacePoints) -> PositionIndex {
    let mut count = ws.points.len();
    if ws.ordered {
        match num_grid_points(ws) {
            Ok(expected) if expected > count => {
                warn!("Workspace holds {count} points, grid expects {expected}");
            }
            Ok(expected) => count = expected,
            Err(e) => warn!("Cannot size workspace grid: {e}"),
        }
    }

    let mut index = PositionIndex::default();
    for (i, point) in ws.points.iter().take(count).enumerate() {
        if point.solution_code == Some(SolutionCode::Success) {
            index.reachable.push(i);
        } else {
            index.unreachable.push(i);
        }
    }
    index
}

/// Indices of points whose orientation is within 0.001 rad of `orientation`.
pub fn points_at_orientation(ws: &WorkspacePoints, orientation: &Quat) -> Vec<usize> {
    let tol = Tolerance::ORIENTATION_MATCH;
    ws.points
        .iter()
        .enumerate()
        .filter(|(_, p)| tol.orientations_equal(&p.pose.orientation, orientation))
        .map(|(i, _)| i)
        .collect()
}

/// Indices of points whose distance from the frame origin lies in
/// `[min_radius, max_radius]`.
pub fn points_within_range(ws: &WorkspacePoints, min_radius: f64, max_radius: f64) -> Vec<usize> {
    ws.points
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            let r = p.pose.distance_from_origin();
            r >= min_radius && r <= max_radius
        })
        .map(|(i, _)| i)
        .collect()
}

/// Drop every point not classified `Success`, keeping order. Returns the
/// number of points removed.
pub fn remove_unreachable(ws: &mut WorkspacePoints) -> usize {
    let before = ws.points.len();
    ws.points.retain(WorkspacePoint::is_reachable);
    let removed = before - ws.points.len();
    if removed > 0 {
        // grid positions no longer line up with indices
        ws.ordered = false;
    }
    debug!("Removed {removed} unreachable points, {} remain", ws.points.len());
    removed
}

// =============================================================================
// Trajectories
// =============================================================================

/// One waypoint of a [`DisplayTrajectory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Joint positions in `joint_names` order.
    pub positions: Vec<f64>,
    /// Time offset in seconds.
    pub time_from_start: f64,
}

/// Joint-space path for playback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayTrajectory {
    /// Joint names shared by every waypoint.
    pub joint_names: Vec<String>,
    /// Waypoints.
    pub points: Vec<TrajectoryPoint>,
}

impl DisplayTrajectory {
    fn push(&mut self, positions: &[f64]) {
        self.points.push(TrajectoryPoint {
            positions: positions.to_vec(),
            time_from_start: 0.0,
        });
    }
}

/// Trajectory visiting the configuration of every reachable point in order.
/// `None` when nothing is reachable.
pub fn display_trajectory(ws: &WorkspacePoints) -> Option<DisplayTrajectory> {
    let mut trajectory = DisplayTrajectory::default();
    for point in ws.points.iter().filter(|p| p.is_reachable()) {
        let Some(state) = point.robot_state.as_ref() else {
            continue;
        };
        if trajectory.joint_names.is_empty() {
            trajectory.joint_names = state.names.clone();
        }
        trajectory.push(&state.positions);
    }
    (!trajectory.points.is_empty()).then_some(trajectory)
}

/// Two-waypoint trajectory holding the configuration of a single reachable
/// point. `None` for unreachable points.
pub fn point_trajectory(point: &WorkspacePoint) -> Option<DisplayTrajectory> {
    if !point.is_reachable() {
        return None;
    }
    let state = point.robot_state.as_ref()?;
    let mut trajectory = DisplayTrajectory {
        joint_names: state.names.clone(),
        points: Vec::with_capacity(2),
    };
    trajectory.push(&state.positions);
    trajectory.push(&state.positions);
    Some(trajectory)
}
