//! kinreach CLI - workspace reachability analysis
//!
//! Loads a serial-chain robot description, runs the reachability engine and
//! writes JSON reports.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kinreach::{ReachabilityEngine, RecordingSink, WorkspacePoints};
use kinreach_kinematics::{IkSolver, SerialChain};
use kinreach_math::{quat_from_xyzw, Point3, Pose, Quat};
use tracing::info;

mod config;
mod logging;
mod report;
mod request;

use config::Settings;
use request::WorkspaceRequest;

#[derive(Parser)]
#[command(name = "kinreach")]
#[command(about = "Workspace reachability analysis for robot manipulators", long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// IK cache file (overrides the settings file)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Emit JSON logs
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample a region on a grid and classify every pose
    Compute {
        /// Robot description (TOML)
        robot: PathBuf,
        /// Workspace request (TOML)
        request: PathBuf,
        /// Report file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Drop unreachable points from the report
        #[arg(long)]
        only_reachable: bool,
        /// Write markers and trajectories to this file
        #[arg(long)]
        markers: Option<PathBuf>,
    },
    /// Collect IK solutions for one pose from random seeds
    Redundant {
        /// Robot description (TOML)
        robot: PathBuf,
        /// Target position
        #[arg(long, required = true, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
        position: Vec<f64>,
        /// Target orientation as a quaternion
        #[arg(long, num_args = 4, value_names = ["X", "Y", "Z", "W"], allow_negative_numbers = true)]
        orientation: Option<Vec<f64>>,
        /// Frame of the target
        #[arg(long, default_value = "base_link")]
        frame: String,
        /// Seconds to keep solving
        #[arg(short, long, default_value_t = 5.0)]
        timeout: f64,
        /// Report file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write markers to this file
        #[arg(long)]
        markers: Option<PathBuf>,
    },
    /// Sample random joint states through forward kinematics
    Fk {
        /// Robot description (TOML)
        robot: PathBuf,
        /// Frame of the reported poses
        #[arg(long, default_value = "base_link")]
        frame: String,
        /// Seconds to keep sampling
        #[arg(short, long, default_value_t = 1.0)]
        timeout: f64,
        /// Report file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Load or generate the IK cache for the robot and write it out
    BuildCache {
        /// Robot description (TOML)
        robot: PathBuf,
        /// Seconds of sampling (default: cache_timeout from settings)
        #[arg(short, long)]
        timeout: Option<f64>,
    },
    /// Summarize a report file
    Info {
        /// Report written by `compute`, `redundant` or `fk`
        report: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(cache) = cli.cache {
        settings.engine.cache_filename = Some(cache);
    }
    logging::setup_logging(&settings.logging, cli.json_logs)?;

    match cli.command {
        Commands::Compute {
            robot,
            request,
            output,
            only_reachable,
            markers,
        } => {
            let mut engine = build_engine(&robot, &settings)?;
            let sink = attach_sink(&mut engine, markers.is_some());
            let mut ws = WorkspaceRequest::load(&request)?.into_workspace()?;

            if only_reachable {
                engine.only_reachable_workspace(&mut ws, sink.is_some())?;
            } else {
                engine.compute_workspace(&mut ws, sink.is_some())?;
            }
            engine.publish_workspace(&ws);
            engine.animate_workspace(&ws);

            report::write_json(&ws, output.as_deref())?;
            write_markers(sink, markers.as_deref())?;
        }
        Commands::Redundant {
            robot,
            position,
            orientation,
            frame,
            timeout,
            output,
            markers,
        } => {
            let mut engine = build_engine(&robot, &settings)?;
            let sink = attach_sink(&mut engine, markers.is_some());
            let pose = target_pose(&position, orientation.as_deref())?;
            let group = engine.model().group_name().to_string();

            let ws = engine.compute_redundant_solutions(
                &group,
                &frame,
                &pose,
                seconds(timeout)?,
                sink.is_some(),
            )?;
            engine.publish_workspace(&ws);

            report::write_json(&ws, output.as_deref())?;
            write_markers(sink, markers.as_deref())?;
        }
        Commands::Fk {
            robot,
            frame,
            timeout,
            output,
        } => {
            let mut engine = build_engine(&robot, &settings)?;
            let group = engine.model().group_name().to_string();
            let mut ws = WorkspacePoints::new(group, frame);
            engine.compute_workspace_fk(&mut ws, seconds(timeout)?)?;
            report::write_json(&ws, output.as_deref())?;
        }
        Commands::BuildCache { robot, timeout } => {
            let mut engine = build_engine(&robot, &settings)?;
            let group = engine.model().group_name().to_string();
            let timeout = match timeout {
                Some(t) => seconds(t)?,
                None => engine.config().cache_timeout(),
            };
            if !engine.generate_cache(&group, timeout)? {
                anyhow::bail!("could not build cache for {group}");
            }
            let stored = engine.cache().map_or(0, |c| c.num_cached_solutions());
            println!("Cache for {group}: {stored} solutions");
        }
        Commands::Info { report } => {
            let ws = report::read_report(&report)?;
            println!("report: {}", report.display());
            report::print_summary(&ws);
        }
    }

    Ok(())
}

fn build_engine(robot: &Path, settings: &Settings) -> Result<ReachabilityEngine<SerialChain>> {
    let text = std::fs::read_to_string(robot)
        .with_context(|| format!("reading robot description {}", robot.display()))?;
    let chain = SerialChain::from_toml_str(&text)
        .with_context(|| format!("loading robot description {}", robot.display()))?;
    info!(
        "Loaded group {} ({} joints, reach {:.3} m)",
        chain.group_name(),
        chain.joint_names().len(),
        chain.reach()
    );
    Ok(ReachabilityEngine::new(chain, settings.engine.clone())?)
}

fn attach_sink(engine: &mut ReachabilityEngine<SerialChain>, wanted: bool) -> Option<RecordingSink> {
    if !wanted {
        return None;
    }
    let sink = RecordingSink::new();
    engine.set_sink(Some(Box::new(sink.clone())));
    Some(sink)
}

fn write_markers(sink: Option<RecordingSink>, path: Option<&Path>) -> Result<()> {
    if let (Some(sink), Some(path)) = (sink, path) {
        report::write_json(&sink.take(), Some(path))?;
        info!("Wrote markers to {}", path.display());
    }
    Ok(())
}

fn target_pose(position: &[f64], orientation: Option<&[f64]>) -> Result<Pose> {
    let [x, y, z] = position else {
        anyhow::bail!("--position takes exactly three values");
    };
    let mut pose = Pose::new(Point3::new(*x, *y, *z), Quat::identity());
    if let Some(q) = orientation {
        let [qx, qy, qz, qw] = q else {
            anyhow::bail!("--orientation takes exactly four values");
        };
        pose.orientation = quat_from_xyzw(*qx, *qy, *qz, *qw)
            .context("--orientation must not be the zero quaternion")?;
    }
    Ok(pose)
}

fn seconds(value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value).with_context(|| format!("invalid number of seconds: {value}"))
}
