//! TOML workspace requests.
//!
//! ```toml
//! group_name = "arm"
//! frame_id = "base_link"
//! min = [-0.5, -0.5, 0.0]
//! max = [0.5, 0.5, 1.0]
//! resolution = 0.05
//! orientations = [[0.0, 0.0, 0.0, 1.0]]   # x, y, z, w
//!
//! [tool_offset]
//! xyz = [0.0, 0.0, 0.12]
//! rpy = [0.0, 0.0, 0.0]
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use kinreach::WorkspacePoints;
use kinreach_math::{quat_from_xyzw, Point3, Pose, Quat};
use serde::Deserialize;

fn default_frame() -> String {
    "base_link".to_string()
}

fn default_orientations() -> Vec<[f64; 4]> {
    vec![[0.0, 0.0, 0.0, 1.0]]
}

/// Translation plus roll/pitch/yaw.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoseSpec {
    /// Translation in meters.
    #[serde(default)]
    pub xyz: [f64; 3],
    /// Fixed-axis roll, pitch, yaw in radians.
    #[serde(default)]
    pub rpy: [f64; 3],
}

impl PoseSpec {
    /// As a pose.
    pub fn to_pose(&self) -> Pose {
        Pose::new(
            Point3::new(self.xyz[0], self.xyz[1], self.xyz[2]),
            Quat::from_euler_angles(self.rpy[0], self.rpy[1], self.rpy[2]),
        )
    }
}

/// A workspace request as written by hand.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceRequest {
    /// Joint group to analyze.
    pub group_name: String,
    /// Frame of all poses.
    #[serde(default = "default_frame")]
    pub frame_id: String,
    /// Minimum corner of the sampled box.
    pub min: [f64; 3],
    /// Maximum corner of the sampled box.
    pub max: [f64; 3],
    /// Grid spacing.
    pub resolution: f64,
    /// Quaternions as `[x, y, z, w]`; normalized on load.
    #[serde(default = "default_orientations")]
    pub orientations: Vec<[f64; 4]>,
    /// Tool frame relative to the tip link.
    #[serde(default)]
    pub tool_offset: PoseSpec,
}

impl WorkspaceRequest {
    /// Read a request file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading request {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing request {}", path.display()))
    }

    /// Build the engine-side request.
    pub fn into_workspace(self) -> Result<WorkspacePoints> {
        let mut orientations = Vec::with_capacity(self.orientations.len());
        for [x, y, z, w] in self.orientations {
            match quat_from_xyzw(x, y, z, w) {
                Some(q) => orientations.push(q),
                None => bail!("orientation [{x}, {y}, {z}, {w}] has zero length"),
            }
        }
        Ok(WorkspacePoints::new(self.group_name, self.frame_id)
            .with_region(
                Point3::new(self.min[0], self.min[1], self.min[2]),
                Point3::new(self.max[0], self.max[1], self.max[2]),
                self.resolution,
            )
            .with_orientations(orientations)
            .with_tool_offset(self.tool_offset.to_pose()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request() {
        let text = r#"
            group_name = "arm"
            min = [0.0, 0.0, 0.0]
            max = [0.2, 0.2, 0.2]
            resolution = 0.1
        "#;
        let ws = toml::from_str::<WorkspaceRequest>(text)
            .unwrap()
            .into_workspace()
            .unwrap();
        assert_eq!(ws.frame_id, "base_link");
        assert_eq!(ws.orientations, vec![Quat::identity()]);
        assert_eq!(ws.tool_frame_offset, Pose::identity());
        assert_eq!(ws.parameters.max, Point3::new(0.2, 0.2, 0.2));
    }

    #[test]
    fn test_orientations_normalized() {
        let text = r#"
            group_name = "arm"
            min = [0.0, 0.0, 0.0]
            max = [0.2, 0.2, 0.2]
            resolution = 0.1
            orientations = [[0.0, 0.0, 0.0, 2.0], [0.0, 0.0, 1.0, 1.0]]

            [tool_offset]
            xyz = [0.0, 0.0, 0.1]
        "#;
        let ws = toml::from_str::<WorkspaceRequest>(text)
            .unwrap()
            .into_workspace()
            .unwrap();
        assert_eq!(ws.orientations.len(), 2);
        assert!(ws.orientations[0].angle_to(&Quat::identity()) < 1e-12);
        assert!((ws.orientations[1].angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(ws.tool_frame_offset.position.z, 0.1);
    }

    #[test]
    fn test_zero_quaternion_rejected() {
        let text = r#"
            group_name = "arm"
            min = [0.0, 0.0, 0.0]
            max = [0.2, 0.2, 0.2]
            resolution = 0.1
            orientations = [[0.0, 0.0, 0.0, 0.0]]
        "#;
        let request: WorkspaceRequest = toml::from_str(text).unwrap();
        assert!(request.into_workspace().is_err());
    }
}
