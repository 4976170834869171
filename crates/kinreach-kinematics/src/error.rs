//! Error types for kinematic models.

use thiserror::Error;

/// Errors that can occur while building or querying a kinematic model.
#[derive(Error, Debug)]
pub enum KinematicsError {
    /// Robot description is structurally invalid.
    #[error("Invalid robot description: {0}")]
    InvalidDescription(String),

    /// Invalid joint definition.
    #[error("Invalid joint {name}: {reason}")]
    InvalidJoint {
        /// Joint name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// Group not known to the model.
    #[error("Group not found: {0}")]
    UnknownGroup(String),

    /// Description could not be parsed.
    #[error("Failed to parse robot description: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for kinematics operations.
pub type Result<T> = std::result::Result<T, KinematicsError>;
