//! Deterministic kinematics for unit tests.

use std::cell::{Cell, RefCell};

use kinreach_kinematics::{
    IkRequest, IkResponse, IkSolver, JointConfiguration, JointGroup, JointKind, JointSpec,
    KinematicModel, SolutionCode,
};
use kinreach_math::Pose;

/// Cartesian gantry: joint values equal the tip position, each in `[0, 1]`.
/// IK succeeds exactly when the target lies inside the unit cube.
pub struct Gantry {
    group: JointGroup,
    names: Vec<String>,
    pub solve_calls: Cell<usize>,
    pub last_seed: RefCell<Option<Vec<f64>>>,
    pub last_target: RefCell<Option<Pose>>,
}

impl Gantry {
    pub fn new() -> Self {
        let axis = |name: &str, axis: [f64; 3]| JointSpec {
            name: name.into(),
            kind: JointKind::Prismatic { axis },
            xyz: [0.0; 3],
            rpy: [0.0; 3],
            limits: Some([0.0, 1.0]),
        };
        let group = JointGroup {
            name: "gantry".into(),
            joints: vec![
                axis("x", [1.0, 0.0, 0.0]),
                axis("y", [0.0, 1.0, 0.0]),
                axis("z", [0.0, 0.0, 1.0]),
            ],
            tip_link: "tool".into(),
        };
        Self {
            names: group.joint_names(),
            group,
            solve_calls: Cell::new(0),
            last_seed: RefCell::new(None),
            last_target: RefCell::new(None),
        }
    }
}

impl IkSolver for Gantry {
    fn group_name(&self) -> &str {
        &self.group.name
    }

    fn tip_frame(&self) -> &str {
        &self.group.tip_link
    }

    fn joint_names(&self) -> &[String] {
        &self.names
    }

    fn solve(&self, request: &IkRequest) -> IkResponse {
        self.solve_calls.set(self.solve_calls.get() + 1);
        *self.last_seed.borrow_mut() = Some(request.seed.positions.clone());
        *self.last_target.borrow_mut() = Some(request.pose);

        let p = request.pose.position;
        let q = vec![p.x, p.y, p.z];
        if self.group.within_bounds(&q) {
            IkResponse::success(JointConfiguration::new(self.names.clone(), q))
        } else {
            IkResponse::failure(SolutionCode::NoIkSolution)
        }
    }

    fn forward(&self, positions: &[f64]) -> Option<Pose> {
        (positions.len() == 3).then(|| Pose::from_position(positions[0], positions[1], positions[2]))
    }

    fn is_valid(&self, positions: &[f64]) -> bool {
        // upper half of the cube is "in collision"
        positions.get(2).is_some_and(|z| *z <= 0.5)
    }
}

impl KinematicModel for Gantry {
    fn group(&self, name: &str) -> Option<&JointGroup> {
        (name == self.group.name).then_some(&self.group)
    }

    fn solver(&self, group: &str) -> Option<&dyn IkSolver> {
        (group == self.group.name).then_some(self as &dyn IkSolver)
    }
}
