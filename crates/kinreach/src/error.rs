//! Error types for the reachability engine.

use kinreach_cache::CacheError;
use thiserror::Error;

/// Errors that abort a reachability computation.
///
/// Failures local to one sampled pose are never reported here; they are
/// recorded in the point's solution code instead.
#[derive(Error, Debug)]
pub enum ReachError {
    /// No cache file path configured.
    #[error("cache_filename must be specified")]
    MissingCacheFile,

    /// Group not known to the kinematic model.
    #[error("Group not found: {0}")]
    UnknownGroup(String),

    /// Sampling requested with an empty orientation set.
    #[error("must specify at least one orientation")]
    NoOrientations,

    /// Non-positive or non-finite position resolution.
    #[error("invalid position resolution: {0}")]
    InvalidResolution(f64),

    /// Bounding region with a min corner above its max corner.
    #[error("invalid bounding region: {0}")]
    InvalidRegion(String),

    /// Forward kinematics failed during FK sampling.
    #[error("forward kinematics failed for group {0}")]
    ForwardKinematics(String),

    /// Invalid engine settings.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cache construction, generation or persistence failed.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for reachability operations.
pub type Result<T> = std::result::Result<T, ReachError>;
