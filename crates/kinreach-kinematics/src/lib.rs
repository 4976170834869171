#![warn(missing_docs)]

//! Kinematic model and IK solver contracts for kinreach.
//!
//! The reachability engine never solves IK itself; it talks to a
//! [`KinematicModel`] for joint metadata and random seeds, and to an
//! [`IkSolver`] for the actual numerical work. This crate defines both
//! contracts plus a [`SerialChain`] reference implementation.
//!
//! # Example
//!
//! ```ignore
//! use kinreach_kinematics::{IkSolver, SerialChain};
//!
//! let chain = SerialChain::from_toml_str(&std::fs::read_to_string("arm.toml")?)?;
//! let tip = chain.forward(&[0.0; 6]).unwrap();
//! println!("tip at {:?}", tip.position);
//! ```

mod chain;
mod error;
mod joints;
mod solver;

pub use chain::{DlsSettings, SerialChain, SerialChainDescription};
pub use error::{KinematicsError, Result};
pub use joints::{JointConfiguration, JointGroup, JointKind, JointSpec, DEFAULT_PRISMATIC_TRAVEL};
pub use solver::{IkRequest, IkResponse, IkSolver, KinematicModel, SolutionCode};
