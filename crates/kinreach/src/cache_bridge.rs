//! Glue between the engine and the IK solution cache.
//!
//! The bridge is the only owner of the [`KinematicsCache`]. It holds at most
//! one cache, built for one group at a time; preparing another group replaces
//! it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kinreach_cache::{CacheOptions, KinematicsCache};
use kinreach_kinematics::KinematicModel;
use kinreach_math::Pose;
use rand::RngCore;
use tracing::{info, warn};

use crate::{ReachError, Result};

/// Result of asking the cache for an IK seed.
#[derive(Debug, Clone, PartialEq)]
pub enum SeedLookup {
    /// The pose lies at or beyond the farthest cached pose from the cache
    /// origin. Treated as unreachable without solving.
    OutOfCoverage,
    /// Within coverage but the pose's cell holds nothing.
    Miss,
    /// First configuration cached for the pose's cell.
    Hit(Vec<f64>),
}

impl SeedLookup {
    /// The seed, if any.
    pub fn seed(self) -> Option<Vec<f64>> {
        match self {
            SeedLookup::Hit(seed) => Some(seed),
            _ => None,
        }
    }

    /// True for [`SeedLookup::OutOfCoverage`].
    pub fn is_out_of_coverage(&self) -> bool {
        matches!(self, SeedLookup::OutOfCoverage)
    }
}

/// Owns the cache, its file path and whether it is in use.
#[derive(Debug)]
pub struct CacheBridge {
    path: PathBuf,
    options: CacheOptions,
    cache: Option<KinematicsCache>,
    enabled: bool,
}

impl CacheBridge {
    /// A bridge with no cache loaded yet.
    pub fn new(path: impl Into<PathBuf>, options: CacheOptions) -> Self {
        Self {
            path: path.into(),
            options,
            cache: None,
            enabled: false,
        }
    }

    /// Cache file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The loaded cache, if any.
    pub fn cache(&self) -> Option<&KinematicsCache> {
        self.cache.as_ref()
    }

    /// Whether lookups and recording are switched on.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Switch lookups and recording on or off without touching the cache.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// True when the cache is enabled and was built for `group`.
    pub fn is_active_for(&self, group: &str) -> bool {
        self.enabled
            && self
                .cache
                .as_ref()
                .is_some_and(|c| c.group_name() == group)
    }

    /// Make a cache for `group` available.
    ///
    /// Reuses the current cache when it already serves `group`, otherwise
    /// creates a fresh one. Loads it from file; if that fails, generates it
    /// by sampling for `timeout` and writes it out. On error the bridge is
    /// left without a cache.
    pub fn prepare<M: KinematicModel + ?Sized>(
        &mut self,
        model: &M,
        group: &str,
        rng: &mut dyn RngCore,
        timeout: Duration,
    ) -> Result<()> {
        let result = self.load_or_generate(model, group, rng, timeout);
        if result.is_err() {
            self.cache = None;
        }
        self.enabled = result.is_ok();
        result
    }

    fn load_or_generate<M: KinematicModel + ?Sized>(
        &mut self,
        model: &M,
        group: &str,
        rng: &mut dyn RngCore,
        timeout: Duration,
    ) -> Result<()> {
        let solver = model
            .solver(group)
            .ok_or_else(|| ReachError::UnknownGroup(group.to_string()))?;
        let joint_group = model
            .group(group)
            .ok_or_else(|| ReachError::UnknownGroup(group.to_string()))?;

        let cache = match self.cache.take() {
            Some(cache) if cache.group_name() == group => cache,
            _ => KinematicsCache::new(group, solver.joint_names().to_vec(), self.options.clone())?,
        };
        let cache = self.cache.insert(cache);

        match cache.read_from_file(&self.path) {
            Ok(()) => {
                info!(
                    "Loaded {} cached solutions for {} from {}",
                    cache.num_cached_solutions(),
                    group,
                    self.path.display()
                );
            }
            Err(e) => {
                info!("Generating cache map online ({e})");
                cache.generate_cache_map(solver, joint_group, rng, timeout)?;
                cache.write_to_file(&self.path)?;
            }
        }
        Ok(())
    }

    /// Seed for an IK query at `pose` (solver frame).
    ///
    /// Coverage is judged by squared distance from the cache origin against
    /// the largest one cached; a pose exactly on the boundary is out.
    pub fn try_seed(&self, pose: &Pose) -> SeedLookup {
        let Some(cache) = self.cache.as_ref() else {
            return SeedLookup::OutOfCoverage;
        };
        let (_, max_squared) = cache.min_max_squared_distance();
        let d2 = pose.squared_distance_to(&cache.options().origin_point());
        if d2 >= max_squared {
            return SeedLookup::OutOfCoverage;
        }
        match cache.get_solution(pose, 0) {
            Some(seed) => SeedLookup::Hit(seed.to_vec()),
            None => SeedLookup::Miss,
        }
    }

    /// File a solution for `pose` (solver frame), replacing the last slot of a
    /// full cell. No-op while disabled.
    pub fn record(&mut self, pose: &Pose, positions: &[f64]) -> bool {
        if !self.enabled {
            return false;
        }
        self.cache
            .as_mut()
            .is_some_and(|cache| cache.add_to_cache(pose, positions, true))
    }

    /// Overwrite the cache file with the current contents.
    pub fn persist(&self) -> Result<()> {
        match self.cache.as_ref() {
            Some(cache) if self.enabled => Ok(cache.write_to_file(&self.path)?),
            _ => Ok(()),
        }
    }
}
