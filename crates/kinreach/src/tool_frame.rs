//! Conversion between the tool frame and the solver's tip frame.

use kinreach_math::{Iso3, Pose};

/// Rigid offset of the tool frame relative to the solver's tip frame.
///
/// Keep the offset fixed for the duration of a sweep: poses converted before
/// and after a change are not comparable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolOffset {
    offset: Iso3,
    inverse: Iso3,
}

impl Default for ToolOffset {
    fn default() -> Self {
        Self::identity()
    }
}

impl ToolOffset {
    /// No offset.
    pub fn identity() -> Self {
        Self {
            offset: Iso3::identity(),
            inverse: Iso3::identity(),
        }
    }

    /// Offset given as a pose of the tool in the tip frame.
    pub fn new(pose: &Pose) -> Self {
        let offset = pose.to_isometry();
        Self {
            offset,
            inverse: offset.inverse(),
        }
    }

    /// Replace the offset.
    pub fn set(&mut self, pose: &Pose) {
        *self = Self::new(pose);
    }

    /// The offset as a pose.
    pub fn offset(&self) -> Pose {
        Pose::from_isometry(&self.offset)
    }

    /// Tip-frame pose that puts the tool at `tool_pose`: `tool_pose ∘ offset⁻¹`.
    pub fn to_solver_frame(&self, tool_pose: &Pose) -> Pose {
        Pose::from_isometry(&(tool_pose.to_isometry() * self.inverse))
    }

    /// Tool pose for a tip at `tip_pose`: `tip_pose ∘ offset`.
    pub fn to_tool_frame(&self, tip_pose: &Pose) -> Pose {
        Pose::from_isometry(&(tip_pose.to_isometry() * self.offset))
    }
}
