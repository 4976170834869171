//! Uniform grid sampling of a workspace request.
//!
//! Points are laid out with x outermost, then y, then z, then orientation:
//!
//! ```text
//! index = ((ix * ny + iy) * nz + iz) * no + io
//! ```
//!
//! [`grid_coordinates`] and [`flat_index`] convert between the two forms.

use kinreach_math::{Point3, Pose};
use tracing::{debug, warn};

use crate::types::{BoundingRegion, WorkspacePoint, WorkspacePoints};
use crate::{ReachError, Result};

/// Slack absorbing division error in `extent / resolution` (e.g. `0.3 / 0.1`).
const GRID_EPSILON: f64 = 1e-9;

/// Position of a point in the sampling grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoord {
    /// Index along x.
    pub x: usize,
    /// Index along y.
    pub y: usize,
    /// Index along z.
    pub z: usize,
    /// Index into the orientation set.
    pub orientation: usize,
}

/// Largest number of positions along one axis.
pub const MAX_AXIS_POSITIONS: usize = 1 << 20;

/// Largest number of points one sweep may produce.
pub const MAX_GRID_POINTS: usize = 1 << 26;

/// Number of grid positions along each axis: `floor(extent / r) + 1`.
///
/// A resolution that would put more than [`MAX_AXIS_POSITIONS`] positions on
/// an axis is rejected.
pub fn grid_dimensions(region: &BoundingRegion, resolution: f64) -> Result<[usize; 3]> {
    if !(resolution > 0.0) || !resolution.is_finite() {
        return Err(ReachError::InvalidResolution(resolution));
    }
    let extents = region.extents();
    let mut dims = [1usize; 3];
    for (axis, dim) in dims.iter_mut().enumerate() {
        let steps = (extents[axis] / resolution + GRID_EPSILON).floor();
        if !steps.is_finite() || steps >= MAX_AXIS_POSITIONS as f64 {
            return Err(ReachError::InvalidResolution(resolution));
        }
        *dim = steps as usize + 1;
    }
    Ok(dims)
}

fn total_points(dims: [usize; 3], num_orientations: usize) -> Option<usize> {
    dims.iter()
        .try_fold(num_orientations, |acc, &n| acc.checked_mul(n))
}

fn checked_total(ws: &WorkspacePoints, dims: [usize; 3]) -> Result<usize> {
    total_points(dims, ws.orientations.len())
        .filter(|&n| n <= MAX_GRID_POINTS)
        .ok_or(ReachError::InvalidResolution(ws.position_resolution))
}

/// Number of points a full sweep of `ws` produces. Fails past
/// [`MAX_GRID_POINTS`].
pub fn num_grid_points(ws: &WorkspacePoints) -> Result<usize> {
    let dims = grid_dimensions(&ws.parameters, ws.position_resolution)?;
    checked_total(ws, dims)
}

/// Replace `ws.points` with the full grid of unevaluated poses.
pub fn sample_uniform(ws: &mut WorkspacePoints) -> Result<()> {
    if ws.orientations.is_empty() {
        return Err(ReachError::NoOrientations);
    }
    let dims = grid_dimensions(&ws.parameters, ws.position_resolution)?;
    ws.parameters.validate()?;
    let total = checked_total(ws, dims)?;
    let [nx, ny, nz] = dims;

    if !ws.points.is_empty() {
        warn!(
            "Discarding {} existing points before sampling",
            ws.points.len()
        );
    }

    let r = ws.position_resolution;
    let min = ws.parameters.min;
    let mut points = Vec::with_capacity(total);
    for ix in 0..nx {
        for iy in 0..ny {
            for iz in 0..nz {
                let position = Point3::new(
                    min.x + ix as f64 * r,
                    min.y + iy as f64 * r,
                    min.z + iz as f64 * r,
                );
                for q in &ws.orientations {
                    points.push(WorkspacePoint::new(Pose::new(position, *q)));
                }
            }
        }
    }

    debug!(
        "Sampled {} points ({nx} x {ny} x {nz} positions, {} orientations)",
        points.len(),
        ws.orientations.len()
    );
    ws.points = points;
    ws.ordered = true;
    Ok(())
}

/// Grid coordinates of flat index `index`, or `None` past the end.
pub fn grid_coordinates(index: usize, dims: [usize; 3], num_orientations: usize) -> Option<GridCoord> {
    let [_, ny, nz] = dims;
    match total_points(dims, num_orientations) {
        Some(total) if index < total => {}
        _ => return None,
    }
    let orientation = index % num_orientations;
    let rest = index / num_orientations;
    let z = rest % nz;
    let rest = rest / nz;
    Some(GridCoord {
        x: rest / ny,
        y: rest % ny,
        z,
        orientation,
    })
}

/// Flat index of a grid coordinate.
pub fn flat_index(coord: GridCoord, dims: [usize; 3], num_orientations: usize) -> usize {
    let [_, ny, nz] = dims;
    ((coord.x * ny + coord.y) * nz + coord.z) * num_orientations + coord.orientation
}
