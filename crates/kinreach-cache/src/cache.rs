//! The solution cache grid and its persistence.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use kinreach_kinematics::{IkSolver, JointGroup};
use kinreach_math::Pose;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::options::CacheOptions;
use crate::{CacheError, Result};

/// Bumped whenever the on-disk layout changes.
const FORMAT_VERSION: u32 = 1;

/// Squared-distance envelope before anything is cached.
const EMPTY_MIN_SQUARED_DISTANCE: f64 = f64::MAX;

/// Joint configurations filed by the grid cell their tip pose falls into.
#[derive(Debug, Clone)]
pub struct KinematicsCache {
    group_name: String,
    joint_names: Vec<String>,
    options: CacheOptions,
    dims: [usize; 3],
    min_squared_distance: f64,
    max_squared_distance: f64,
    cells: BTreeMap<usize, Vec<Vec<f64>>>,
}

/// On-disk layout.
#[derive(Serialize, Deserialize)]
struct CacheFile {
    format_version: u32,
    group_name: String,
    joint_names: Vec<String>,
    options: CacheOptions,
    min_squared_distance: f64,
    max_squared_distance: f64,
    cells: BTreeMap<usize, Vec<Vec<f64>>>,
}

impl KinematicsCache {
    /// Create an empty cache for `group_name`.
    pub fn new(
        group_name: impl Into<String>,
        joint_names: Vec<String>,
        options: CacheOptions,
    ) -> Result<Self> {
        options.validate()?;
        let dims = options.grid_dimensions();
        Ok(Self {
            group_name: group_name.into(),
            joint_names,
            options,
            dims,
            min_squared_distance: EMPTY_MIN_SQUARED_DISTANCE,
            max_squared_distance: 0.0,
            cells: BTreeMap::new(),
        })
    }

    /// Group the cache was built for.
    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    /// Joint names the cached configurations are ordered by.
    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    /// Grid options.
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Number of cells along x, y, z.
    pub fn grid_dimensions(&self) -> [usize; 3] {
        self.dims
    }

    /// Total configurations stored.
    pub fn num_cached_solutions(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    /// True when nothing has been cached.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// `(min², max²)` squared distances from the grid origin of every pose
    /// added so far. An empty cache reports `max² = 0`.
    pub fn min_max_squared_distance(&self) -> (f64, f64) {
        (self.min_squared_distance, self.max_squared_distance)
    }

    /// Flat cell index of a pose, or `None` outside the grid.
    pub fn grid_index(&self, pose: &Pose) -> Option<usize> {
        let p = pose.position;
        let coords = [p.x, p.y, p.z];
        let mut idx = [0usize; 3];
        for axis in 0..3 {
            let cell = ((coords[axis] - self.options.origin[axis]) / self.options.resolution[axis]).floor();
            if !cell.is_finite() || cell < 0.0 || cell as usize >= self.dims[axis] {
                return None;
            }
            idx[axis] = cell as usize;
        }
        Some(idx[0] + self.dims[0] * (idx[1] + self.dims[1] * idx[2]))
    }

    /// The `rank`-th configuration stored for the cell containing `pose`.
    pub fn get_solution(&self, pose: &Pose, rank: usize) -> Option<&[f64]> {
        let index = self.grid_index(pose)?;
        self.cells
            .get(&index)
            .and_then(|solutions| solutions.get(rank))
            .map(Vec::as_slice)
    }

    /// All configurations stored for the cell containing `pose`.
    pub fn get_solutions(&self, pose: &Pose) -> &[Vec<f64>] {
        self.grid_index(pose)
            .and_then(|index| self.cells.get(&index))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// File `positions` under the cell containing `pose`.
    ///
    /// A full cell keeps its contents unless `overwrite` is set, in which case
    /// the last slot is replaced. Returns `false` when the pose lies outside
    /// the grid, the configuration has the wrong length, or a full cell
    /// rejected it.
    pub fn add_to_cache(&mut self, pose: &Pose, positions: &[f64], overwrite: bool) -> bool {
        if positions.len() != self.joint_names.len() {
            return false;
        }
        let Some(index) = self.grid_index(pose) else {
            return false;
        };
        let cap = self.options.max_solutions_per_grid_location;
        let solutions = self.cells.entry(index).or_default();
        if solutions.len() < cap {
            solutions.push(positions.to_vec());
        } else if overwrite {
            solutions[cap - 1] = positions.to_vec();
        } else {
            return false;
        }
        self.update_distances(pose);
        true
    }

    fn update_distances(&mut self, pose: &Pose) {
        let d2 = pose.squared_distance_to(&self.options.origin_point());
        self.min_squared_distance = self.min_squared_distance.min(d2);
        self.max_squared_distance = self.max_squared_distance.max(d2);
    }

    /// Fill the cache by forward kinematics of random configurations until
    /// `timeout` elapses. Returns the number of configurations stored.
    pub fn generate_cache_map(
        &mut self,
        solver: &dyn IkSolver,
        group: &JointGroup,
        rng: &mut dyn RngCore,
        timeout: Duration,
    ) -> Result<usize> {
        if solver.group_name() != self.group_name {
            return Err(CacheError::GroupMismatch {
                expected: self.group_name.clone(),
                found: solver.group_name().to_string(),
            });
        }

        let start = Instant::now();
        let mut samples = 0usize;
        let mut stored = 0usize;
        while start.elapsed() < timeout {
            let positions = group.random_positions(rng);
            let pose = solver
                .forward(&positions)
                .ok_or(CacheError::ForwardKinematics)?;
            samples += 1;
            if self.add_to_cache(&pose, &positions, false) {
                stored += 1;
            }
        }
        info!(
            "Cache for {}: {} of {} samples stored in {:.1}s",
            self.group_name,
            stored,
            samples,
            start.elapsed().as_secs_f64()
        );
        Ok(stored)
    }

    /// Replace this cache with the contents of `path`.
    ///
    /// The file must have been written for the same group, joint names and
    /// grid options; otherwise the cache is left untouched.
    pub fn read_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::open(path.as_ref())?;
        let stored: CacheFile = serde_json::from_reader(BufReader::new(file))?;

        if stored.format_version != FORMAT_VERSION {
            return Err(CacheError::Mismatch(format!(
                "format version {} (expected {})",
                stored.format_version, FORMAT_VERSION
            )));
        }
        if stored.group_name != self.group_name {
            return Err(CacheError::Mismatch(format!(
                "group {} (expected {})",
                stored.group_name, self.group_name
            )));
        }
        if stored.joint_names != self.joint_names {
            return Err(CacheError::Mismatch("joint names differ".into()));
        }
        if stored.options != self.options {
            return Err(CacheError::Mismatch("grid options differ".into()));
        }

        self.min_squared_distance = stored.min_squared_distance;
        self.max_squared_distance = stored.max_squared_distance;
        self.cells = stored.cells;
        debug!(
            "Read {} cached solutions from {}",
            self.num_cached_solutions(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Write the cache to `path`, replacing any existing file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let stored = CacheFile {
            format_version: FORMAT_VERSION,
            group_name: self.group_name.clone(),
            joint_names: self.joint_names.clone(),
            options: self.options.clone(),
            min_squared_distance: self.min_squared_distance,
            max_squared_distance: self.max_squared_distance,
            cells: self.cells.clone(),
        };
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(&mut writer, &stored)?;
        writer.flush()?;
        debug!(
            "Wrote {} cached solutions to {}",
            self.num_cached_solutions(),
            path.as_ref().display()
        );
        Ok(())
    }
}
