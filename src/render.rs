// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton overlay rendering.

#![allow(clippy::cast_precision_loss)]

use crate::config::OverlayConfig;
use crate::frame::{Paint, PaintStyle, Rect, Surface};
use crate::skeleton::DrawableEdge;

/// Paints used for one capture format.
///
/// Stroke widths are expressed in capture pixels, so they are multiplied by
/// `captured width / display width` to look the same on screen regardless of
/// the negotiated resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    /// Skeleton line paint.
    pub paint: Paint,
    /// Background fill paint.
    pub fill_paint: Paint,
    /// Capture-to-display scale factor.
    pub scale: f32,
}

impl Style {
    /// Build the paints for a capture width shown at `display_width`.
    #[must_use]
    pub fn for_capture(captured_width: u32, display_width: u32, config: &OverlayConfig) -> Self {
        let scale = scale_factor(captured_width, display_width);
        Self {
            paint: Paint::fill(config.line_color).with_stroke_width(config.line_width * scale),
            fill_paint: Paint::fill(config.fill_color),
            scale,
        }
    }
}

/// `captured_width / display_width`, or `1.0` when either side is unknown.
#[must_use]
pub fn scale_factor(captured_width: u32, display_width: u32) -> f32 {
    if captured_width == 0 || display_width == 0 {
        return 1.0;
    }
    captured_width as f32 / display_width as f32
}

/// Draw the background and skeleton onto a frame.
///
/// The camera image is covered with an opaque fill first, so the output shows
/// the skeleton only. Normalized coordinates are scaled by the frame size.
pub fn render<S: Surface + ?Sized>(
    surface: &mut S,
    frame_width: u32,
    frame_height: u32,
    edges: &[DrawableEdge],
    paint: &Paint,
    fill_paint: &Paint,
) {
    let (w, h) = (frame_width as f32, frame_height as f32);

    let background = Paint {
        style: PaintStyle::Fill,
        ..*fill_paint
    };
    surface.draw_rect(Rect::xywh(0.0, 0.0, w, h), &background);

    for e in edges {
        surface.draw_line(e.x0 * w, e.y0 * h, e.x1 * w, e.y1 * h, paint);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::skeleton::Edge;
    use crate::visualizer::Color;

    /// Surface that records draw calls instead of rasterizing them.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub rects: Vec<(Rect, Paint)>,
        pub lines: Vec<([f32; 4], Paint)>,
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (0, 0)
        }

        fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
            self.rects.push((rect, *paint));
        }

        fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, paint: &Paint) {
            self.lines.push(([x0, y0, x1, y1], *paint));
        }
    }

    fn edge(x0: f32, y0: f32, x1: f32, y1: f32) -> DrawableEdge {
        DrawableEdge {
            edge: Edge::new(5, 7),
            x0,
            y0,
            x1,
            y1,
        }
    }

    #[test]
    fn test_render_fills_then_draws() {
        let mut surface = RecordingSurface::default();
        let paint = Paint::fill(Color::BLACK).with_stroke_width(2.0);
        let fill = Paint::fill(Color::WHITE);

        render(&mut surface, 1280, 720, &[edge(0.5, 0.5, 0.6, 0.6)], &paint, &fill);

        assert_eq!(surface.rects.len(), 1);
        assert_eq!(surface.rects[0].0, Rect::xywh(0.0, 0.0, 1280.0, 720.0));
        assert_eq!(surface.rects[0].1.color, Color::WHITE);

        assert_eq!(surface.lines.len(), 1);
        let [x0, y0, x1, y1] = surface.lines[0].0;
        assert!((x0 - 640.0).abs() < 1e-3);
        assert!((y0 - 360.0).abs() < 1e-3);
        assert!((x1 - 768.0).abs() < 1e-3);
        assert!((y1 - 432.0).abs() < 1e-3);
    }

    #[test]
    fn test_identity_scale() {
        let mut surface = RecordingSurface::default();
        let paint = Paint::fill(Color::BLACK);
        let e = edge(0.25, 0.75, 0.125, 0.5);

        render(&mut surface, 1, 1, &[e], &paint, &Paint::fill(Color::WHITE));

        assert_eq!(surface.lines[0].0, [0.25, 0.75, 0.125, 0.5]);
    }

    #[test]
    fn test_style_scales_stroke() {
        let config = OverlayConfig::default();
        let style = Style::for_capture(1920, 960, &config);
        assert!((style.scale - 2.0).abs() < f32::EPSILON);
        assert!((style.paint.stroke_width - config.line_width * 2.0).abs() < f32::EPSILON);
        assert_eq!(style.fill_paint.color, config.fill_color);
    }

    #[test]
    fn test_scale_factor_unknown_display() {
        assert!((scale_factor(1280, 0) - 1.0).abs() < f32::EPSILON);
    }
}
