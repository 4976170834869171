//! End-to-end reachability runs against the serial-chain solver.

use std::time::Duration;

use kinreach::aggregate::{points_within_range, position_index};
use kinreach::{EngineConfig, EngineState, ReachabilityEngine, RecordingSink, WorkspacePoints};
use kinreach_cache::CacheOptions;
use kinreach_kinematics::{IkSolver, SerialChain, SolutionCode};
use kinreach_math::{Point3, Pose, Quat, Tolerance};

/// Three prismatic axes with 0.5 m of travel each.
const GANTRY: &str = r#"
group_name = "gantry"
tip_link = "spindle"

[[joints]]
name = "x"
kind = { type = "prismatic", axis = [1.0, 0.0, 0.0] }
limits = [0.0, 0.5]

[[joints]]
name = "y"
kind = { type = "prismatic", axis = [0.0, 1.0, 0.0] }
limits = [0.0, 0.5]

[[joints]]
name = "z"
kind = { type = "prismatic", axis = [0.0, 0.0, 1.0] }
limits = [0.0, 0.5]
"#;

const ARM: &str = r#"
group_name = "arm"
tip_link = "tool0"
tip_xyz = [0.1, 0.0, 0.0]

[[joints]]
name = "shoulder_pan"
kind = { type = "revolute", axis = [0.0, 0.0, 1.0] }
xyz = [0.0, 0.0, 0.3]

[[joints]]
name = "shoulder_lift"
kind = { type = "revolute", axis = [0.0, 1.0, 0.0] }

[[joints]]
name = "elbow"
kind = { type = "revolute", axis = [0.0, 1.0, 0.0] }
xyz = [0.0, 0.0, 0.4]

[[joints]]
name = "wrist_1"
kind = { type = "revolute", axis = [1.0, 0.0, 0.0] }
xyz = [0.35, 0.0, 0.0]

[[joints]]
name = "wrist_2"
kind = { type = "revolute", axis = [0.0, 1.0, 0.0] }

[[joints]]
name = "wrist_3"
kind = { type = "revolute", axis = [1.0, 0.0, 0.0] }
"#;

fn config(dir: &tempfile::TempDir, name: &str) -> EngineConfig {
    EngineConfig {
        cache_filename: Some(dir.path().join(name)),
        cache_timeout: 0.2,
        ik_timeout: 0.5,
        cache: CacheOptions {
            origin: [0.0, 0.0, 0.0],
            workspace_size: [1.0, 1.0, 1.0],
            resolution: [0.05, 0.05, 0.05],
            max_solutions_per_grid_location: 2,
        },
        rng_seed: Some(42),
        ..EngineConfig::default()
    }
}

fn gantry_engine(dir: &tempfile::TempDir) -> ReachabilityEngine<SerialChain> {
    let chain = SerialChain::from_toml_str(GANTRY).unwrap();
    ReachabilityEngine::new(chain, config(dir, "gantry.cache")).unwrap()
}

fn assert_states_reach_poses<M: IkSolver>(solver: &M, ws: &WorkspacePoints, offset: &Pose) {
    let tol = Tolerance::new(1e-3, 1e-2);
    for point in ws.points.iter().filter(|p| p.is_reachable()) {
        let state = point.robot_state.as_ref().unwrap();
        let tip = solver.forward(&state.positions).unwrap();
        let tool = tip.compose(offset);
        assert!(
            tool.approx_eq(&point.pose, &tol),
            "state {:?} puts the tool at {:?}, expected {:?}",
            state.positions,
            tool.position,
            point.pose.position
        );
    }
}

#[test]
fn gantry_reachability_matches_travel() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = gantry_engine(&dir);

    let mut ws = WorkspacePoints::new("gantry", "world")
        .with_region(Point3::new(0.1, 0.1, 0.1), Point3::new(0.7, 0.3, 0.3), 0.1)
        .with_orientations(vec![Quat::identity()]);
    engine.compute_workspace(&mut ws, false).unwrap();

    assert_eq!(engine.state(), EngineState::Finalized);
    assert_eq!(ws.points.len(), 7 * 3 * 3);
    assert!(ws.is_fully_classified());

    for point in &ws.points {
        let inside = point.pose.position.x <= 0.5 + 1e-9;
        if inside {
            assert_eq!(point.solution_code, Some(SolutionCode::Success), "{:?}", point.pose.position);
        } else {
            assert!(!point.is_reachable(), "{:?}", point.pose.position);
        }
    }
    assert_states_reach_poses(engine.model(), &ws, &Pose::identity());

    let index = position_index(&ws);
    assert_eq!(index.reachable.len(), 5 * 3 * 3);
    assert_eq!(index.unreachable.len(), 2 * 3 * 3);
}

#[test]
fn gantry_tool_offset_shifts_reachable_region() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = gantry_engine(&dir);

    // tool sticks 0.2 m below the spindle
    let offset = Pose::from_position(0.0, 0.0, -0.2);
    let mut ws = WorkspacePoints::new("gantry", "world")
        .with_region(Point3::new(0.2, 0.2, -0.1), Point3::new(0.2, 0.2, 0.4), 0.1)
        .with_orientations(vec![Quat::identity()])
        .with_tool_offset(offset);
    engine.compute_workspace(&mut ws, false).unwrap();

    let reachable: Vec<f64> = ws
        .points
        .iter()
        .filter(|p| p.is_reachable())
        .map(|p| p.pose.position.z)
        .collect();
    // tool z in [-0.2, 0.3]; the sampled z values -0.1 ..= 0.3 qualify
    assert_eq!(reachable.len(), 5);
    assert!(ws.points.last().is_some_and(|p| !p.is_reachable()));
    assert_states_reach_poses(engine.model(), &ws, &offset);
}

#[test]
fn cache_file_survives_engine_restart() {
    let dir = tempfile::tempdir().unwrap();
    let request = || {
        WorkspacePoints::new("gantry", "world")
            .with_region(Point3::new(0.1, 0.1, 0.1), Point3::new(0.3, 0.3, 0.3), 0.1)
            .with_orientations(vec![Quat::identity()])
    };

    let mut first = gantry_engine(&dir);
    let mut ws = request();
    first.compute_workspace(&mut ws, false).unwrap();
    let cached = first.cache().unwrap().num_cached_solutions();
    assert!(cached > 0);
    assert!(dir.path().join("gantry.cache").exists());

    let mut second = gantry_engine(&dir);
    assert!(second.generate_cache("gantry", Duration::ZERO).unwrap());
    assert_eq!(second.cache().unwrap().num_cached_solutions(), cached);

    let mut again = request();
    second.compute_workspace(&mut again, false).unwrap();
    assert_eq!(again.num_reachable(), ws.num_reachable());
}

#[test]
fn only_reachable_and_range_queries() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = gantry_engine(&dir);

    let mut ws = WorkspacePoints::new("gantry", "world")
        .with_region(Point3::new(0.0, 0.0, 0.0), Point3::new(0.6, 0.0, 0.0), 0.1)
        .with_orientations(vec![Quat::identity()]);
    engine.only_reachable_workspace(&mut ws, false).unwrap();
    assert!(ws.points.iter().all(|p| p.is_reachable()));
    assert!(ws.points.len() <= 6);

    let near = points_within_range(&ws, 0.0, 0.25);
    assert!(near.iter().all(|&i| ws.points[i].pose.distance_from_origin() <= 0.25));
}

#[test]
fn arm_fk_sampling_is_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let chain = SerialChain::from_toml_str(ARM).unwrap();
    let reach = chain.reach();
    let mut engine = ReachabilityEngine::new(chain, config(&dir, "arm.cache")).unwrap();

    let mut ws = WorkspacePoints::new("arm", "base_link");
    engine.compute_workspace_fk(&mut ws, Duration::from_millis(20)).unwrap();
    assert!(!ws.points.is_empty());
    assert!(!ws.ordered);
    assert!(ws.points.iter().all(|p| p.solution_code == Some(SolutionCode::Success)));
    assert!(ws.points.iter().all(|p| p.pose.distance_from_origin() <= reach + 1e-9));
    assert_states_reach_poses(engine.model(), &ws, &Pose::identity());
}

#[test]
fn arm_redundant_solutions_all_reach_target() {
    let dir = tempfile::tempdir().unwrap();
    let chain = SerialChain::from_toml_str(ARM).unwrap();
    let target = chain.forward(&[0.3, -0.4, 0.7, 0.1, 0.5, -0.2]).unwrap();
    let sink = RecordingSink::new();
    let mut engine = ReachabilityEngine::new(chain, config(&dir, "arm.cache"))
        .unwrap()
        .with_sink(Box::new(sink.clone()));

    let ws = engine
        .compute_redundant_solutions("arm", "base_link", &target, Duration::from_millis(200), true)
        .unwrap();
    assert!(!ws.points.is_empty());
    assert!(ws.is_fully_classified());
    assert!(ws.points.iter().all(|p| p.pose == target));
    assert_states_reach_poses(engine.model(), &ws, &Pose::identity());
    assert_eq!(sink.recording().markers.len(), ws.num_reachable());
}
