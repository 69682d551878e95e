// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Overlay configuration.
//!
//! This module defines the [`OverlayConfig`] struct, which controls the
//! confidence gate, skeleton style, capture format bounds and ONNX Runtime
//! execution options.

use crate::device::Device;
use crate::skeleton::{EdgeRule, MIN_CONFIDENCE, Topology};
use crate::visualizer::Color;

/// Configuration for the pose overlay.
///
/// It uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use pose_overlay::OverlayConfig;
///
/// let config = OverlayConfig::new()
///     .with_confidence(0.5)
///     .with_line_width(3.0)
///     .with_format_bounds(480, 1080);
/// ```
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Minimum joint confidence (exclusive) for an edge to be drawn.
    pub confidence_threshold: f32,
    /// Which joint confidences gate an edge.
    pub edge_rule: EdgeRule,
    /// Edges drawn every frame.
    pub topology: Topology,
    /// Skeleton stroke width in display pixels.
    pub line_width: f32,
    /// Skeleton line color.
    pub line_color: Color,
    /// Background color covering the camera image.
    pub fill_color: Color,
    /// Lower bound on the capture format's shorter side.
    pub min_capture_size: u32,
    /// Upper bound on the capture format's shorter side.
    pub max_capture_size: u32,
    /// Width of the display surface. `None` uses the capture width (scale 1).
    pub display_width: Option<u32>,
    /// Number of intra-op threads for ONNX Runtime.
    /// Setting this to `0` allows ONNX Runtime to choose the optimal number.
    pub num_threads: usize,
    /// Execution target for the model. `None` runs on the CPU.
    pub device: Option<Device>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: MIN_CONFIDENCE,
            edge_rule: EdgeRule::default(),
            topology: Topology::default(),
            line_width: 2.0,
            line_color: Color::BLACK,
            fill_color: Color::WHITE,
            min_capture_size: 720,
            max_capture_size: 1000,
            display_width: None,
            num_threads: 0,
            device: None,
        }
    }
}

impl OverlayConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confidence threshold.
    ///
    /// Edges whose joints score at or below this value are not drawn.
    #[must_use]
    pub const fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the edge gating rule.
    #[must_use]
    pub const fn with_edge_rule(mut self, rule: EdgeRule) -> Self {
        self.edge_rule = rule;
        self
    }

    /// Set the skeleton topology.
    #[must_use]
    pub const fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Set the skeleton stroke width (display pixels).
    #[must_use]
    pub const fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    /// Set the line and background colors.
    #[must_use]
    pub const fn with_colors(mut self, line: Color, fill: Color) -> Self {
        self.line_color = line;
        self.fill_color = fill;
        self
    }

    /// Set the bounds used to pick a capture format.
    #[must_use]
    pub const fn with_format_bounds(mut self, min: u32, max: u32) -> Self {
        self.min_capture_size = min;
        self.max_capture_size = max;
        self
    }

    /// Set the display width used for the stroke scale factor.
    #[must_use]
    pub const fn with_display_width(mut self, width: u32) -> Self {
        self.display_width = Some(width);
        self
    }

    /// Set the number of threads for inference.
    ///
    /// # Arguments
    ///
    /// * `threads` - The number of intra-op threads. Set to `0` for auto-configuration.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Set the execution device.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OverlayConfig::default();
        assert!((config.confidence_threshold - 0.45).abs() < f32::EPSILON);
        assert!((config.line_width - 2.0).abs() < f32::EPSILON);
        assert_eq!(config.line_color, Color::BLACK);
        assert_eq!(config.fill_color, Color::WHITE);
        assert_eq!(config.edge_rule, EdgeRule::BothJoints);
        assert_eq!((config.min_capture_size, config.max_capture_size), (720, 1000));
    }

    #[test]
    fn test_config_builder() {
        let config = OverlayConfig::new()
            .with_confidence(0.3)
            .with_edge_rule(EdgeRule::FromJoint)
            .with_topology(Topology::FULL_BODY)
            .with_display_width(390)
            .with_threads(4)
            .with_device(Device::CoreMl);

        assert!((config.confidence_threshold - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.edge_rule, EdgeRule::FromJoint);
        assert_eq!(config.topology, Topology::FULL_BODY);
        assert_eq!(config.display_width, Some(390));
        assert_eq!(config.num_threads, 4);
        assert_eq!(config.device, Some(Device::CoreMl));
    }
}
