#![warn(missing_docs)]

//! Grid-indexed IK solution cache.
//!
//! The cache partitions a box of Cartesian space into cells and remembers up
//! to a fixed number of joint configurations per cell that are known to place
//! the end effector inside it. The reachability engine reads a cell's first
//! configuration as the seed for a nearby IK query and feeds new solutions
//! back in.
//!
//! # Features
//!
//! - Uniform grid over a configurable box with per-axis resolution
//! - Offline generation by forward-kinematics sampling under a time budget
//! - Squared-distance envelope of everything cached, for coverage checks
//! - JSON persistence with a whole-file overwrite
//!
//! # Example
//!
//! ```
//! use kinreach_cache::{CacheOptions, KinematicsCache};
//! use kinreach_math::Pose;
//!
//! let names = vec!["j1".to_string(), "j2".to_string()];
//! let mut cache = KinematicsCache::new("arm", names, CacheOptions::default()).unwrap();
//! let pose = Pose::from_position(0.5, 0.5, 0.5);
//! cache.add_to_cache(&pose, &[0.1, 0.2], true);
//! assert_eq!(cache.get_solution(&pose, 0), Some(&[0.1, 0.2][..]));
//! ```

mod cache;
mod options;

pub use cache::KinematicsCache;
pub use options::CacheOptions;

use thiserror::Error;

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Invalid grid options (non-positive size or resolution).
    #[error("invalid cache options: {0}")]
    InvalidOptions(String),

    /// The cache file belongs to a different group or grid.
    #[error("cache file does not match: {0}")]
    Mismatch(String),

    /// Solver and cache disagree about the group.
    #[error("solver serves group {found}, cache expects {expected}")]
    GroupMismatch {
        /// Group the cache was created for.
        expected: String,
        /// Group the solver serves.
        found: String,
    },

    /// Forward kinematics failed while sampling.
    #[error("forward kinematics failed while generating cache")]
    ForwardKinematics,

    /// I/O error reading or writing the cache file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed cache file.
    #[error("cache format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
