//! Marker data for displaying a workspace.
//!
//! Nothing here renders; markers are plain data handed to a
//! [`WorkspaceSink`], which decides where they go.

use std::cell::RefCell;
use std::rc::Rc;

use kinreach_kinematics::SolutionCode;
use kinreach_math::{Point3, Pose, Quat};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::aggregate::DisplayTrajectory;
use crate::sampler::sample_uniform;
use crate::types::WorkspacePoints;

/// Sphere list id for reachable points.
pub const REACHABLE_ID: i32 = 0;
/// Sphere list id for points being evaluated or rejected before solving.
pub const EVALUATING_ID: i32 = 1;
/// Sphere list id for unreachable points.
pub const UNREACHABLE_ID: i32 = 2;
/// Id of the region cube.
pub const REGION_ID: i32 = 3;
/// Arrow ids start here when the whole workspace is drawn.
pub const ARROW_ID_OFFSET: i32 = 4;

/// RGBA color, components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Create a color.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Display state of one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerState {
    /// Classified `Success`.
    Reachable,
    /// Classified `NoIkSolution`.
    Unreachable,
    /// Not classified yet, or rejected before solving.
    Evaluating,
}

impl MarkerState {
    /// Display state for a stored classification.
    pub fn from_code(code: Option<SolutionCode>) -> Self {
        match code {
            Some(SolutionCode::Success) => MarkerState::Reachable,
            Some(SolutionCode::NoIkSolution) => MarkerState::Unreachable,
            Some(SolutionCode::PlanningFailed) | None => MarkerState::Evaluating,
        }
    }
}

/// Colors and sizes of generated markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    /// Reachable color.
    pub reachable: Color,
    /// Unreachable color.
    pub unreachable: Color,
    /// Evaluating color.
    pub evaluating: Color,
    /// Arrow length, width, height.
    pub arrow_scale: [f64; 3],
    /// Sphere diameter.
    pub sphere_radius: f64,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            reachable: Color::new(0.0, 1.0, 0.0, 1.0),
            unreachable: Color::new(1.0, 0.0, 0.0, 1.0),
            evaluating: Color::new(0.0, 0.0, 1.0, 1.0),
            arrow_scale: [0.10, 0.04, 0.04],
            sphere_radius: 0.02,
        }
    }
}

impl MarkerStyle {
    /// Color for a display state.
    pub fn color(&self, state: MarkerState) -> Color {
        match state {
            MarkerState::Reachable => self.reachable,
            MarkerState::Unreachable => self.unreachable,
            MarkerState::Evaluating => self.evaluating,
        }
    }
}

/// Marker geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    /// One sphere per entry of `points`.
    SphereList,
    /// An arrow along the x axis of `pose`.
    Arrow,
    /// A box centered at `pose`.
    Cube,
}

/// A drawable primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Namespace; together with `id` identifies the marker.
    pub namespace: String,
    /// Id within the namespace.
    pub id: i32,
    /// Geometry.
    pub kind: MarkerKind,
    /// Frame the marker is expressed in.
    pub frame_id: String,
    /// Marker pose.
    pub pose: Pose,
    /// Size along x, y, z.
    pub scale: [f64; 3],
    /// Color.
    pub color: Color,
    /// Sphere centers, for sphere lists.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point3>,
    /// Per-sphere colors, for sphere lists.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<Color>,
}

impl Marker {
    fn new(ns: &str, id: i32, kind: MarkerKind, frame_id: &str) -> Self {
        Self {
            namespace: ns.to_string(),
            id,
            kind,
            frame_id: frame_id.to_string(),
            pose: Pose::identity(),
            scale: [1.0; 3],
            color: Color::new(1.0, 1.0, 1.0, 1.0),
            points: Vec::new(),
            colors: Vec::new(),
        }
    }
}

fn selected<'a>(ws: &'a WorkspacePoints, indices: &'a [usize]) -> Box<dyn Iterator<Item = usize> + 'a> {
    if indices.is_empty() {
        return Box::new(0..ws.points.len());
    }
    let len = ws.points.len();
    Box::new(indices.iter().copied().filter(move |&i| {
        if i >= len {
            warn!("Point index {i} out of range ({len} points)");
        }
        i < len
    }))
}

/// Three sphere lists: reachable (id 0), rejected before solving (id 1) and
/// unreachable (id 2). Empty `indices` draws every point.
pub fn sphere_markers(ws: &WorkspacePoints, ns: &str, indices: &[usize], style: &MarkerStyle) -> Vec<Marker> {
    let mut lists: Vec<Marker> = [
        (REACHABLE_ID, MarkerState::Reachable),
        (EVALUATING_ID, MarkerState::Evaluating),
        (UNREACHABLE_ID, MarkerState::Unreachable),
    ]
    .into_iter()
    .map(|(id, state)| {
        let mut m = Marker::new(ns, id, MarkerKind::SphereList, &ws.frame_id);
        m.scale = [style.sphere_radius; 3];
        m.color = style.color(state);
        m
    })
    .collect();

    for i in selected(ws, indices) {
        let point = &ws.points[i];
        let slot = match point.solution_code {
            Some(SolutionCode::Success) => 0,
            Some(SolutionCode::PlanningFailed) => 1,
            Some(SolutionCode::NoIkSolution) => 2,
            None => continue,
        };
        let list = &mut lists[slot];
        list.points.push(point.pose.position);
        list.colors.push(list.color);
    }
    lists
}

/// One arrow per point colored by classification. Arrow ids are
/// `i + ARROW_ID_OFFSET` for the whole workspace, the index otherwise.
pub fn arrow_markers(ws: &WorkspacePoints, ns: &str, indices: &[usize], style: &MarkerStyle) -> Vec<Marker> {
    let offset = if indices.is_empty() { ARROW_ID_OFFSET } else { 0 };
    selected(ws, indices)
        .map(|i| {
            let point = &ws.points[i];
            let mut m = Marker::new(ns, i as i32 + offset, MarkerKind::Arrow, &ws.frame_id);
            m.pose = point.pose;
            m.scale = style.arrow_scale;
            m.color = style.color(MarkerState::from_code(point.solution_code));
            m
        })
        .collect()
}

/// Translucent cube over the requested region plus the positions a sweep of
/// `ws` would sample. Samples an internal copy when `ws` holds no points.
pub fn sample_markers(ws: &WorkspacePoints, style: &MarkerStyle) -> Vec<Marker> {
    let ns = "samples";
    let mut cube = Marker::new(ns, REGION_ID, MarkerKind::Cube, &ws.frame_id);
    cube.pose = Pose::new(ws.parameters.center(), Quat::identity());
    let extents = ws.parameters.extents();
    cube.scale = [extents.x, extents.y, extents.z];
    cube.color = style.evaluating.with_alpha(0.2);

    let mut spheres = Marker::new(ns, EVALUATING_ID, MarkerKind::SphereList, &ws.frame_id);
    spheres.scale = [style.sphere_radius; 3];
    spheres.color = style.evaluating;

    let sampled;
    let points = if ws.points.is_empty() {
        let mut copy = ws.clone();
        if let Err(e) = sample_uniform(&mut copy) {
            warn!("Cannot sample workspace for display: {e}");
        }
        sampled = copy.points;
        &sampled
    } else {
        &ws.points
    };
    for p in points {
        spheres.points.push(p.pose.position);
        spheres.colors.push(style.evaluating);
    }

    vec![cube, spheres]
}

// =============================================================================
// Sinks
// =============================================================================

/// Receiver of everything the engine displays or publishes.
pub trait WorkspaceSink {
    /// A batch of markers replacing earlier ones with the same namespace/id.
    fn publish_markers(&mut self, markers: Vec<Marker>);

    /// A full workspace report.
    fn publish_workspace(&mut self, ws: &WorkspacePoints);

    /// A joint trajectory for playback.
    fn publish_trajectory(&mut self, trajectory: &DisplayTrajectory);
}

/// Everything a [`RecordingSink`] has received.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Recording {
    /// Marker batches in arrival order.
    pub markers: Vec<Vec<Marker>>,
    /// Published workspaces.
    pub workspaces: Vec<WorkspacePoints>,
    /// Published trajectories.
    pub trajectories: Vec<DisplayTrajectory>,
}

/// In-memory sink. Clones share the same [`Recording`], so a caller can keep
/// one handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Rc<RefCell<Recording>>,
}

impl RecordingSink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of what has been received.
    pub fn recording(&self) -> Recording {
        self.inner.borrow().clone()
    }

    /// Take what has been received, leaving the sink empty.
    pub fn take(&self) -> Recording {
        std::mem::take(&mut *self.inner.borrow_mut())
    }
}

impl WorkspaceSink for RecordingSink {
    fn publish_markers(&mut self, markers: Vec<Marker>) {
        self.inner.borrow_mut().markers.push(markers);
    }

    fn publish_workspace(&mut self, ws: &WorkspacePoints) {
        self.inner.borrow_mut().workspaces.push(ws.clone());
    }

    fn publish_trajectory(&mut self, trajectory: &DisplayTrajectory) {
        self.inner.borrow_mut().trajectories.push(trajectory.clone());
    }
}
