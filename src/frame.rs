// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Captured frames and the drawing surface the overlay renders onto.
//!
//! A [`Frame`] owns the raw pixel bytes of one captured image in the layout the
//! capture device delivered. Drawing goes through [`FrameCanvas`], a borrowed
//! view that writes colors straight into that native layout, so rendering never
//! needs an intermediate RGB copy of the frame.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use std::fmt;

use image::{Rgb, RgbImage};
use imageproc::drawing::{
    Canvas, draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut,
    draw_line_segment_mut, draw_polygon_mut,
};
use imageproc::point::Point;

use crate::error::{OverlayError, Result};
use crate::visualizer::Color;

/// Stroke widths at or below this are drawn as single-pixel segments.
const HAIRLINE_WIDTH: f32 = 1.5;

/// Pixel layout of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Packed 8-bit RGB.
    Rgb8,
    /// Packed 8-bit RGBA.
    Rgba8,
    /// Packed 8-bit BGR.
    Bgr8,
    /// Packed 8-bit BGRA.
    Bgra8,
    /// 8-bit luminance.
    Gray8,
    /// Packed 4:2:2 YUV (capture only).
    Yuyv,
    /// Semi-planar 4:2:0 YUV (capture only).
    Nv12,
}

impl PixelFormat {
    /// Whether frames in this layout can be converted to the model's RGB input
    /// and drawn onto.
    #[must_use]
    pub const fn is_convertible(self) -> bool {
        matches!(
            self,
            Self::Rgb8 | Self::Rgba8 | Self::Bgr8 | Self::Bgra8 | Self::Gray8
        )
    }

    /// Bytes per pixel for packed layouts, `None` for subsampled ones.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Rgb8 | Self::Bgr8 => Some(3),
            Self::Rgba8 | Self::Bgra8 => Some(4),
            Self::Gray8 => Some(1),
            Self::Yuyv | Self::Nv12 => None,
        }
    }

    /// Expected buffer length for a `width x height` frame.
    #[must_use]
    pub const fn buffer_len(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self {
            Self::Rgb8 | Self::Bgr8 => pixels * 3,
            Self::Rgba8 | Self::Bgra8 => pixels * 4,
            Self::Gray8 => pixels,
            Self::Yuyv => pixels * 2,
            Self::Nv12 => pixels + pixels / 2,
        }
    }

    /// Byte offsets of the R, G and B channels inside one pixel.
    const fn rgb_offsets(self) -> Option<[usize; 3]> {
        match self {
            Self::Rgb8 | Self::Rgba8 => Some([0, 1, 2]),
            Self::Bgr8 | Self::Bgra8 => Some([2, 1, 0]),
            Self::Gray8 => Some([0, 0, 0]),
            Self::Yuyv | Self::Nv12 => None,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rgb8 => "rgb8",
            Self::Rgba8 => "rgba8",
            Self::Bgr8 => "bgr8",
            Self::Bgra8 => "bgra8",
            Self::Gray8 => "gray8",
            Self::Yuyv => "yuyv",
            Self::Nv12 => "nv12",
        };
        f.write_str(name)
    }
}

/// One captured image.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Layout of `data`.
    pub format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap raw pixel bytes.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the buffer length does not match the
    /// dimensions and pixel format.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let expected = format.buffer_len(width, height);
        if data.len() != expected {
            return Err(OverlayError::ShapeMismatch(format!(
                "{width}x{height} {format} frame needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Wrap an RGB image without copying.
    #[must_use]
    pub fn from_rgb_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            format: PixelFormat::Rgb8,
            data: image.into_raw(),
        }
    }

    /// Raw pixel bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the frame carries any pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Copy the frame into an RGB image (for display).
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for layouts with no RGB conversion.
    pub fn to_rgb_image(&self) -> Result<RgbImage> {
        let rgb = to_rgb_bytes(&self.data, self.format)?;
        RgbImage::from_raw(self.width, self.height, rgb).ok_or_else(|| {
            OverlayError::ShapeMismatch(format!(
                "{}x{} frame does not fit its pixel buffer",
                self.width, self.height
            ))
        })
    }

    /// Borrow the frame as a drawable canvas.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` if the frame's layout cannot be drawn onto.
    pub fn canvas(&mut self) -> Result<FrameCanvas<'_>> {
        let offsets = self.format.rgb_offsets().ok_or_else(|| {
            OverlayError::UnsupportedFormat(format!("cannot draw onto {} frames", self.format))
        })?;
        let bpp = self.format.bytes_per_pixel().unwrap_or(1);
        Ok(FrameCanvas {
            width: self.width,
            height: self.height,
            format: self.format,
            bpp,
            offsets,
            data: &mut self.data,
        })
    }
}

/// Convert a packed buffer to interleaved RGB.
pub(crate) fn to_rgb_bytes(data: &[u8], format: PixelFormat) -> Result<Vec<u8>> {
    match format {
        PixelFormat::Rgb8 => Ok(data.to_vec()),
        PixelFormat::Gray8 => Ok(data.iter().flat_map(|&v| [v, v, v]).collect()),
        _ => {
            let (Some(bpp), Some([r, g, b])) = (format.bytes_per_pixel(), format.rgb_offsets())
            else {
                return Err(OverlayError::UnsupportedFormat(format!(
                    "no conversion path from {format} to rgb8"
                )));
            };
            Ok(data
                .chunks_exact(bpp)
                .flat_map(|px| [px[r], px[g], px[b]])
                .collect())
        }
    }
}

/// Axis-aligned rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Rectangle from origin and size.
    #[must_use]
    pub const fn xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// How a paint covers a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintStyle {
    /// Fill the interior.
    Fill,
    /// Outline only.
    Stroke,
}

/// Color and stroke description for drawing calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub stroke_width: f32,
    pub style: PaintStyle,
}

impl Paint {
    /// Fill paint with a hairline stroke.
    #[must_use]
    pub const fn fill(color: Color) -> Self {
        Self {
            color,
            stroke_width: 1.0,
            style: PaintStyle::Fill,
        }
    }

    /// Set the stroke width.
    #[must_use]
    pub const fn with_stroke_width(mut self, width: f32) -> Self {
        self.stroke_width = width;
        self
    }
}

/// Drawing primitives a frame exposes to the overlay renderer.
pub trait Surface {
    /// Surface size in pixels as `(width, height)`.
    fn size(&self) -> (u32, u32);

    /// Draw a rectangle.
    fn draw_rect(&mut self, rect: Rect, paint: &Paint);

    /// Draw a line segment from `(x0, y0)` to `(x1, y1)`.
    fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, paint: &Paint);
}

/// Mutable drawing view over a frame's pixel buffer.
pub struct FrameCanvas<'a> {
    width: u32,
    height: u32,
    format: PixelFormat,
    bpp: usize,
    offsets: [usize; 3],
    data: &'a mut [u8],
}

impl FrameCanvas<'_> {
    fn pixel_index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.bpp
    }
}

impl Canvas for FrameCanvas<'_> {
    type Pixel = Rgb<u8>;

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn get_pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        let i = self.pixel_index(x, y);
        let [r, g, b] = self.offsets;
        Rgb([self.data[i + r], self.data[i + g], self.data[i + b]])
    }

    fn draw_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>) {
        let i = self.pixel_index(x, y);
        let [r, g, b] = color.0;
        match self.format {
            PixelFormat::Gray8 => {
                let luma = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
                self.data[i] = luma as u8;
            }
            _ => {
                let [ro, go, bo] = self.offsets;
                self.data[i + ro] = r;
                self.data[i + go] = g;
                self.data[i + bo] = b;
                if self.bpp == 4 {
                    self.data[i + 3] = u8::MAX;
                }
            }
        }
    }
}

impl Surface for FrameCanvas<'_> {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        let x = rect.x.round() as i32;
        let y = rect.y.round() as i32;
        let w = rect.width.round();
        let h = rect.height.round();
        if w < 1.0 || h < 1.0 {
            return;
        }
        let area = imageproc::rect::Rect::at(x, y).of_size(w as u32, h as u32);
        let color = Rgb::from(paint.color);
        match paint.style {
            PaintStyle::Fill => draw_filled_rect_mut(self, area, color),
            PaintStyle::Stroke => draw_hollow_rect_mut(self, area, color),
        }
    }

    fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, paint: &Paint) {
        let color = Rgb::from(paint.color);
        let half = paint.stroke_width / 2.0;

        if paint.stroke_width <= HAIRLINE_WIDTH {
            draw_line_segment_mut(self, (x0, y0), (x1, y1), color);
            return;
        }

        let (dx, dy) = (x1 - x0, y1 - y0);
        let len = dx.hypot(dy);
        if len < f32::EPSILON {
            draw_filled_circle_mut(self, (x0.round() as i32, y0.round() as i32), half.round() as i32, color);
            return;
        }

        // Thick segment as a quad offset along the unit normal.
        let (nx, ny) = (-dy / len * half, dx / len * half);
        let corner = |x: f32, y: f32| Point::new(x.round() as i32, y.round() as i32);
        let quad = [
            corner(x0 + nx, y0 + ny),
            corner(x1 + nx, y1 + ny),
            corner(x1 - nx, y1 - ny),
            corner(x0 - nx, y0 - ny),
        ];
        if quad[0] == quad[3] {
            draw_line_segment_mut(self, (x0, y0), (x1, y1), color);
        } else {
            draw_polygon_mut(self, &quad, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_rejects_short_buffer() {
        let result = Frame::new(4, 4, PixelFormat::Rgb8, vec![0; 10]);
        assert!(matches!(result, Err(OverlayError::ShapeMismatch(_))));
    }

    #[test]
    fn test_buffer_len() {
        assert_eq!(PixelFormat::Rgba8.buffer_len(2, 2), 16);
        assert_eq!(PixelFormat::Gray8.buffer_len(3, 2), 6);
        assert_eq!(PixelFormat::Nv12.buffer_len(4, 4), 24);
    }

    #[test]
    fn test_canvas_writes_native_layout() {
        let mut frame = Frame::new(2, 1, PixelFormat::Bgra8, vec![0; 8]).unwrap();
        {
            let mut canvas = frame.canvas().unwrap();
            canvas.draw_pixel(1, 0, Rgb([10, 20, 30]));
        }
        assert_eq!(&frame.data()[4..8], &[30, 20, 10, 255]);
    }

    #[test]
    fn test_fill_rect_covers_frame() {
        let mut frame = Frame::new(3, 2, PixelFormat::Rgb8, vec![7; 18]).unwrap();
        {
            let mut canvas = frame.canvas().unwrap();
            canvas.draw_rect(Rect::xywh(0.0, 0.0, 3.0, 2.0), &Paint::fill(Color::WHITE));
        }
        assert!(frame.data().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_thick_line_is_wider_than_hairline() {
        let mut frame = Frame::new(20, 20, PixelFormat::Gray8, vec![0; 400]).unwrap();
        {
            let mut canvas = frame.canvas().unwrap();
            let paint = Paint::fill(Color::WHITE).with_stroke_width(6.0);
            canvas.draw_line(2.0, 10.0, 17.0, 10.0, &paint);
        }
        let lit_rows = (0..20)
            .filter(|&y| frame.data()[y * 20 + 10] > 0)
            .count();
        assert!(lit_rows >= 5, "expected a thick stroke, got {lit_rows} rows");
    }

    #[test]
    fn test_canvas_unsupported_format() {
        let mut frame = Frame::new(2, 2, PixelFormat::Yuyv, vec![0; 8]).unwrap();
        assert!(matches!(
            frame.canvas(),
            Err(OverlayError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_to_rgb_swizzles_bgr() {
        let frame = Frame::new(1, 1, PixelFormat::Bgr8, vec![1, 2, 3]).unwrap();
        let rgb = frame.to_rgb_image().unwrap();
        assert_eq!(rgb.as_raw(), &vec![3, 2, 1]);
    }
}
