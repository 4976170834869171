//! Cache grid options.

use kinreach_math::Point3;
use serde::{Deserialize, Serialize};

use crate::{CacheError, Result};

/// Largest number of cells a cache grid may span.
const MAX_GRID_CELLS: f64 = (1u64 << 40) as f64;

/// Grid geometry and capacity of a [`crate::KinematicsCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Minimum corner of the grid; coverage distances are measured from here.
    pub origin: [f64; 3],
    /// Extent of the grid along x, y, z.
    pub workspace_size: [f64; 3],
    /// Cell size along x, y, z.
    pub resolution: [f64; 3],
    /// Configurations retained per cell.
    pub max_solutions_per_grid_location: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            origin: [0.0, 0.0, 0.0],
            workspace_size: [2.0, 2.0, 2.0],
            resolution: [0.01, 0.01, 0.01],
            max_solutions_per_grid_location: 1,
        }
    }
}

impl CacheOptions {
    /// Validate options.
    pub fn validate(&self) -> Result<()> {
        for axis in 0..3 {
            if !(self.resolution[axis] > 0.0) {
                return Err(CacheError::InvalidOptions(format!(
                    "resolution[{axis}] must be positive"
                )));
            }
            if !(self.workspace_size[axis] > 0.0) {
                return Err(CacheError::InvalidOptions(format!(
                    "workspace_size[{axis}] must be positive"
                )));
            }
        }
        let cells: f64 = (0..3)
            .map(|axis| self.workspace_size[axis] / self.resolution[axis] + 1.0)
            .product();
        if !(cells <= MAX_GRID_CELLS) {
            return Err(CacheError::InvalidOptions(format!(
                "grid of {cells:e} cells is too fine"
            )));
        }
        if self.max_solutions_per_grid_location == 0 {
            return Err(CacheError::InvalidOptions(
                "max_solutions_per_grid_location must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Grid origin as a point.
    pub fn origin_point(&self) -> Point3 {
        Point3::new(self.origin[0], self.origin[1], self.origin[2])
    }

    /// Number of cells along each axis.
    pub fn grid_dimensions(&self) -> [usize; 3] {
        let mut dims = [1usize; 3];
        for (axis, dim) in dims.iter_mut().enumerate() {
            *dim = ((self.workspace_size[axis] / self.resolution[axis] + 1e-9).floor() as usize).max(1);
        }
        dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dimensions() {
        assert_eq!(CacheOptions::default().grid_dimensions(), [200, 200, 200]);
    }

    #[test]
    fn test_validate() {
        assert!(CacheOptions::default().validate().is_ok());
        let bad = CacheOptions {
            resolution: [0.1, 0.0, 0.1],
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let empty = CacheOptions {
            max_solutions_per_grid_location: 0,
            ..Default::default()
        };
        assert!(empty.validate().is_err());
        let fine = CacheOptions {
            resolution: [1e-300, 0.1, 0.1],
            ..Default::default()
        };
        assert!(fine.validate().is_err());
    }
}
