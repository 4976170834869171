#![warn(missing_docs)]

//! Workspace reachability analysis for robot manipulators.
//!
//! Given a joint group, a box of Cartesian space and a set of tool
//! orientations, the [`ReachabilityEngine`] samples a uniform grid of target
//! poses and asks an IK solver whether the tool can reach each one. A
//! grid-indexed cache of known solutions seeds the solver and rules out poses
//! beyond anything the arm has ever reached.
//!
//! # Example
//!
//! ```ignore
//! use kinreach::{EngineConfig, ReachabilityEngine, WorkspacePoints};
//! use kinreach_kinematics::SerialChain;
//! use kinreach_math::{Point3, Quat};
//!
//! let chain = SerialChain::from_toml_str(&std::fs::read_to_string("arm.toml")?)?;
//! let mut engine = ReachabilityEngine::new(chain, EngineConfig::with_cache_file("arm.cache"))?;
//!
//! let mut ws = WorkspacePoints::new("arm", "base_link")
//!     .with_region(Point3::new(-0.5, -0.5, 0.0), Point3::new(0.5, 0.5, 1.0), 0.05)
//!     .with_orientations(vec![Quat::identity()]);
//! engine.compute_workspace(&mut ws, false)?;
//! println!("{} of {} poses reachable", ws.num_reachable(), ws.points.len());
//! ```

pub mod aggregate;
pub mod cache_bridge;
pub mod config;
pub mod engine;
mod error;
pub mod orchestrator;
pub mod sampler;
pub mod tool_frame;
mod types;
pub mod visualize;

#[cfg(test)]
mod testing;

pub use cache_bridge::{CacheBridge, SeedLookup};
pub use config::EngineConfig;
pub use engine::{EngineState, ReachabilityEngine};
pub use error::{ReachError, Result};
pub use orchestrator::{IkOutcome, DEFAULT_IK_TIMEOUT};
pub use tool_frame::ToolOffset;
pub use types::{BoundingRegion, WorkspacePoint, WorkspacePoints};
pub use visualize::{MarkerStyle, RecordingSink, WorkspaceSink};
