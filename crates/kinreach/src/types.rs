//! Workspace report types.

use kinreach_kinematics::{JointConfiguration, SolutionCode};
use kinreach_math::{Point3, Pose, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::{ReachError, Result};

/// Axis-aligned box bounding the sampled positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Default for BoundingRegion {
    fn default() -> Self {
        Self::new(Point3::origin(), Point3::origin())
    }
}

impl BoundingRegion {
    /// Create a region from its corners.
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Fails when any coordinate of `min` exceeds the one of `max`.
    pub fn validate(&self) -> Result<()> {
        for axis in 0..3 {
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(ReachError::InvalidRegion(format!(
                    "axis {axis}: min {lo} > max {hi}"
                )));
            }
        }
        Ok(())
    }

    /// Side lengths.
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min).abs()
    }

    /// Geometric center.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }
}

/// One sampled end-effector pose and what became of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkspacePoint {
    /// Target pose of the tool frame.
    pub pose: Pose,
    /// Joint configuration reaching the pose, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot_state: Option<JointConfiguration>,
    /// Classification. `None` until the point has been evaluated.
    #[serde(default)]
    pub solution_code: Option<SolutionCode>,
}

impl WorkspacePoint {
    /// A freshly sampled, unevaluated point.
    pub fn new(pose: Pose) -> Self {
        Self {
            pose,
            robot_state: None,
            solution_code: None,
        }
    }

    /// True when the point was classified [`SolutionCode::Success`].
    pub fn is_reachable(&self) -> bool {
        self.solution_code == Some(SolutionCode::Success)
    }
}

/// A workspace request and, once computed, its report.
///
/// The request half (`group_name` through `tool_frame_offset`) is filled by
/// the caller. The engine fills `points` and sets `ordered`. While `ordered`
/// is set, point `i` sits at grid coordinates
/// [`crate::sampler::grid_coordinates`]`(i, ..)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspacePoints {
    /// Joint group to analyze.
    pub group_name: String,
    /// Reference frame of all poses.
    #[serde(default)]
    pub frame_id: String,
    /// Sampled box.
    #[serde(default)]
    pub parameters: BoundingRegion,
    /// Grid spacing along every axis.
    pub position_resolution: f64,
    /// Orientations sampled at each position.
    #[serde(default)]
    pub orientations: Vec<Quat>,
    /// Tool frame relative to the solver's tip frame.
    #[serde(default)]
    pub tool_frame_offset: Pose,
    /// Whether `points` follows grid order.
    #[serde(default)]
    pub ordered: bool,
    /// Sampled points.
    #[serde(default)]
    pub points: Vec<WorkspacePoint>,
}

impl WorkspacePoints {
    /// An empty request for `group_name` in `frame_id`.
    pub fn new(group_name: impl Into<String>, frame_id: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            frame_id: frame_id.into(),
            parameters: BoundingRegion::default(),
            position_resolution: 0.1,
            orientations: Vec::new(),
            tool_frame_offset: Pose::identity(),
            ordered: false,
            points: Vec::new(),
        }
    }

    /// Set the sampled box and grid spacing.
    pub fn with_region(mut self, min: Point3, max: Point3, resolution: f64) -> Self {
        self.parameters = BoundingRegion::new(min, max);
        self.position_resolution = resolution;
        self
    }

    /// Set the orientation set.
    pub fn with_orientations(mut self, orientations: Vec<Quat>) -> Self {
        self.orientations = orientations;
        self
    }

    /// Set the tool frame offset.
    pub fn with_tool_offset(mut self, offset: Pose) -> Self {
        self.tool_frame_offset = offset;
        self
    }

    /// Number of points classified reachable.
    pub fn num_reachable(&self) -> usize {
        self.points.iter().filter(|p| p.is_reachable()).count()
    }

    /// True when every point carries a classification.
    pub fn is_fully_classified(&self) -> bool {
        self.points.iter().all(|p| p.solution_code.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_validate() {
        let ok = BoundingRegion::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 2.0));
        assert!(ok.validate().is_ok());
        assert_eq!(ok.extents(), Vec3::new(1.0, 0.0, 2.0));

        let bad = BoundingRegion::new(Point3::new(0.0, 1.0, 0.0), Point3::new(1.0, 0.0, 2.0));
        assert!(matches!(bad.validate(), Err(ReachError::InvalidRegion(_))));
    }

    #[test]
    fn test_point_classification() {
        let mut p = WorkspacePoint::new(Pose::from_position(0.1, 0.2, 0.3));
        assert!(!p.is_reachable());
        p.solution_code = Some(SolutionCode::NoIkSolution);
        assert!(!p.is_reachable());
        p.solution_code = Some(SolutionCode::Success);
        assert!(p.is_reachable());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let json = r#"{"group_name": "arm", "position_resolution": 0.05}"#;
        let ws: WorkspacePoints = serde_json::from_str(json).unwrap();
        assert_eq!(ws.group_name, "arm");
        assert!(ws.points.is_empty());
        assert!(!ws.ordered);
        assert_eq!(ws.tool_frame_offset, Pose::identity());
    }
}
