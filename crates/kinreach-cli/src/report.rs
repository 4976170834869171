//! JSON output and human-readable summaries.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use kinreach::aggregate::position_index;
use kinreach::WorkspacePoints;
use kinreach_kinematics::SolutionCode;
use serde::Serialize;

/// Write `value` as pretty JSON to `path`, or to stdout when `path` is `None`.
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, value)?;
            writeln!(lock)?;
        }
    }
    Ok(())
}

/// Read a workspace report written by [`write_json`].
pub fn read_report(path: &Path) -> Result<WorkspacePoints> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing report {}", path.display()))
}

/// Point counts by classification.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub success: usize,
    pub no_ik_solution: usize,
    pub planning_failed: usize,
    pub unclassified: usize,
}

pub fn counts(ws: &WorkspacePoints) -> Counts {
    let mut c = Counts {
        total: ws.points.len(),
        ..Counts::default()
    };
    for p in &ws.points {
        match p.solution_code {
            Some(SolutionCode::Success) => c.success += 1,
            Some(SolutionCode::NoIkSolution) => c.no_ik_solution += 1,
            Some(SolutionCode::PlanningFailed) => c.planning_failed += 1,
            None => c.unclassified += 1,
        }
    }
    c
}

/// Print a summary of a report to stdout.
pub fn print_summary(ws: &WorkspacePoints) {
    let c = counts(ws);
    println!("workspace: group {} in frame {}", ws.group_name, ws.frame_id);
    let (min, max) = (ws.parameters.min, ws.parameters.max);
    println!(
        "  region: ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3}) at {} m",
        min.x, min.y, min.z, max.x, max.y, max.z, ws.position_resolution
    );
    println!("  orientations: {}", ws.orientations.len());
    println!("  grid ordered: {}", ws.ordered);
    println!("  points: {}", c.total);
    println!("    SUCCESS: {}", c.success);
    println!("    NO_IK_SOLUTION: {}", c.no_ik_solution);
    println!("    PLANNING_FAILED: {}", c.planning_failed);
    if c.unclassified > 0 {
        println!("    unclassified: {}", c.unclassified);
    }
    if c.total > 0 {
        println!("  reachable: {:.1}%", 100.0 * c.success as f64 / c.total as f64);
    }

    let index = position_index(ws);
    if let Some(farthest) = index
        .reachable
        .iter()
        .map(|&i| ws.points[i].pose.distance_from_origin())
        .reduce(f64::max)
    {
        println!("  farthest reachable: {farthest:.3} m");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinreach::WorkspacePoint;
    use kinreach_math::Pose;

    #[test]
    fn test_counts() {
        let mut ws = WorkspacePoints::new("arm", "base");
        for code in [
            Some(SolutionCode::Success),
            Some(SolutionCode::Success),
            Some(SolutionCode::PlanningFailed),
            None,
        ] {
            let mut p = WorkspacePoint::new(Pose::identity());
            p.solution_code = code;
            ws.points.push(p);
        }
        assert_eq!(
            counts(&ws),
            Counts {
                total: 4,
                success: 2,
                no_ik_solution: 0,
                planning_failed: 1,
                unclassified: 1,
            }
        );
    }

    #[test]
    fn test_report_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut ws = WorkspacePoints::new("arm", "base");
        let mut p = WorkspacePoint::new(Pose::from_position(0.1, 0.2, 0.3));
        p.solution_code = Some(SolutionCode::NoIkSolution);
        ws.points.push(p);

        write_json(&ws, Some(&path)).unwrap();
        assert_eq!(read_report(&path).unwrap(), ws);
    }
}
