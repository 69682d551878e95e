// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton topology and keypoint interpretation.
//!
//! The single-pose model emits 17 joints in COCO order, each as a
//! `(y, x, confidence)` triple with coordinates normalized to `[0, 1]`.

use crate::error::{OverlayError, Result};

/// Number of joints the model estimates.
pub const KEYPOINT_COUNT: usize = 17;

/// Values per joint in the output array: `y`, `x`, `confidence`.
pub const VALUES_PER_KEYPOINT: usize = 3;

/// Default minimum confidence for drawing an edge.
pub const MIN_CONFIDENCE: f32 = 0.45;

/// Joint names in model output order.
pub const KEYPOINT_NAMES: [&str; KEYPOINT_COUNT] = [
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

/// A skeleton edge between two joint indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: usize,
    pub to: usize,
}

impl Edge {
    /// Create an edge.
    #[must_use]
    pub const fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }
}

/// `left_shoulder-left_elbow`; out-of-range joints print as their index.
impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = |j: usize| KEYPOINT_NAMES.get(j).map_or_else(|| j.to_string(), ToString::to_string);
        write!(f, "{}-{}", name(self.from), name(self.to))
    }
}

/// Limb and torso edges.
const LIMB_EDGES: [Edge; 12] = [
    Edge::new(5, 7),   // left shoulder to left elbow
    Edge::new(6, 8),   // right shoulder to right elbow
    Edge::new(7, 9),   // left elbow to left wrist
    Edge::new(8, 10),  // right elbow to right wrist
    Edge::new(11, 13), // left hip to left knee
    Edge::new(12, 14), // right hip to right knee
    Edge::new(13, 15), // left knee to left ankle
    Edge::new(14, 16), // right knee to right ankle
    Edge::new(11, 12), // left hip to right hip
    Edge::new(5, 6),   // left shoulder to right shoulder
    Edge::new(5, 11),  // left shoulder to left hip
    Edge::new(6, 12),  // right shoulder to right hip
];

/// COCO-Pose skeleton: limbs, torso and face.
const FULL_BODY_EDGES: [Edge; 19] = [
    Edge::new(15, 13), // left ankle to left knee
    Edge::new(13, 11), // left knee to left hip
    Edge::new(16, 14), // right ankle to right knee
    Edge::new(14, 12), // right knee to right hip
    Edge::new(11, 12), // left hip to right hip
    Edge::new(5, 11),  // left shoulder to left hip
    Edge::new(6, 12),  // right shoulder to right hip
    Edge::new(5, 6),   // left shoulder to right shoulder
    Edge::new(5, 7),   // left shoulder to left elbow
    Edge::new(6, 8),   // right shoulder to right elbow
    Edge::new(7, 9),   // left elbow to left wrist
    Edge::new(8, 10),  // right elbow to right wrist
    Edge::new(1, 2),   // left eye to right eye
    Edge::new(0, 1),   // nose to left eye
    Edge::new(0, 2),   // nose to right eye
    Edge::new(1, 3),   // left eye to left ear
    Edge::new(2, 4),   // right eye to right ear
    Edge::new(3, 5),   // left ear to left shoulder
    Edge::new(4, 6),   // right ear to right shoulder
];

/// Fixed set of edges drawn for every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topology {
    edges: &'static [Edge],
}

impl Topology {
    /// Arms, legs and torso outline.
    pub const LIMBS: Self = Self { edges: &LIMB_EDGES };

    /// Limbs plus the face edges.
    pub const FULL_BODY: Self = Self {
        edges: &FULL_BODY_EDGES,
    };

    /// Edges in draw order.
    #[must_use]
    pub const fn edges(&self) -> &'static [Edge] {
        self.edges
    }

    /// Number of edges.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the topology has no edges.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Check that every joint index is below [`KEYPOINT_COUNT`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` naming the first out-of-range edge.
    pub fn validate(&self) -> Result<()> {
        match self
            .edges
            .iter()
            .find(|e| e.from >= KEYPOINT_COUNT || e.to >= KEYPOINT_COUNT)
        {
            Some(edge) => Err(OverlayError::ConfigError(format!(
                "edge ({}, {}) references a joint outside 0..{KEYPOINT_COUNT}",
                edge.from, edge.to
            ))),
            None => Ok(()),
        }
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::LIMBS
    }
}

impl std::str::FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "limbs" => Ok(Self::LIMBS),
            "full" | "full-body" => Ok(Self::FULL_BODY),
            _ => Err(format!("Unknown topology: {s}")),
        }
    }
}

/// Which joint confidences gate an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeRule {
    /// Both endpoints must exceed the threshold.
    #[default]
    BothJoints,
    /// Only the `from` joint is checked.
    FromJoint,
}

impl std::str::FromStr for EdgeRule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "both" => Ok(Self::BothJoints),
            "from" => Ok(Self::FromJoint),
            _ => Err(format!("Unknown edge rule: {s} (expected 'both' or 'from')")),
        }
    }
}

/// An edge whose endpoints passed the confidence gate, in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawableEdge {
    pub edge: Edge,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// Turn the model's flat output into the edges worth drawing this frame.
///
/// Each joint `j` occupies `output[3j..3j + 3]` as `(y, x, confidence)`.
/// Confidence must be strictly greater than `threshold`.
///
/// # Errors
///
/// Returns `MalformedOutput` if `output.len() != 3 * KEYPOINT_COUNT`.
pub fn interpret(
    output: &[f32],
    topology: &Topology,
    threshold: f32,
    rule: EdgeRule,
) -> Result<Vec<DrawableEdge>> {
    let expected = VALUES_PER_KEYPOINT * KEYPOINT_COUNT;
    if output.len() != expected {
        return Err(OverlayError::MalformedOutput(format!(
            "expected {expected} values ({KEYPOINT_COUNT} joints x {VALUES_PER_KEYPOINT}), got {}",
            output.len()
        )));
    }

    let joint = |j: usize| {
        let base = j * VALUES_PER_KEYPOINT;
        (output[base], output[base + 1], output[base + 2])
    };

    let edges = topology
        .edges()
        .iter()
        .filter(|e| e.from < KEYPOINT_COUNT && e.to < KEYPOINT_COUNT)
        .filter_map(|&edge| {
            let (y0, x0, c0) = joint(edge.from);
            let (y1, x1, c1) = joint(edge.to);
            let drawable = match rule {
                EdgeRule::BothJoints => c0 > threshold && c1 > threshold,
                EdgeRule::FromJoint => c0 > threshold,
            };
            drawable.then_some(DrawableEdge {
                edge,
                x0,
                y0,
                x1,
                y1,
            })
        })
        .collect();

    Ok(edges)
}
