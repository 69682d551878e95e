// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Window that shows processed frames and reports taps.

use std::time::{Duration, Instant};

use minifb::{Key, MouseButton, Window, WindowOptions};

use crate::error::{OverlayError, Result};
use crate::frame::{Frame, to_rgb_bytes};

/// A simple frame viewer using minifb.
///
/// Escape or Q closes the window. A left click (press then release) counts as
/// one tap.
pub struct Viewer {
    window: Window,
    width: usize,
    height: usize,
    buffer: Vec<u32>,
    mouse_was_down: bool,
    taps: usize,
}

impl Viewer {
    /// Create a new viewer window.
    ///
    /// # Errors
    ///
    /// Returns `VisualizerError` if the window cannot be created.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| OverlayError::VisualizerError(format!("Failed to create window: {e}")))?;

        window.set_target_fps(60);

        Ok(Self {
            window,
            width,
            height,
            buffer: Vec::new(),
            mouse_was_down: false,
            taps: 0,
        })
    }

    fn is_closing(&self) -> bool {
        !self.window.is_open() || self.window.is_key_down(Key::Escape) || self.window.is_key_down(Key::Q)
    }

    fn track_mouse(&mut self) {
        let down = self.window.get_mouse_down(MouseButton::Left);
        if self.mouse_was_down && !down {
            self.taps += 1;
        }
        self.mouse_was_down = down;
    }

    /// Show a frame. Returns `false` once the window should close.
    ///
    /// # Errors
    ///
    /// Returns `VisualizerError` if the window cannot be updated, or
    /// `UnsupportedFormat` if the frame cannot be shown as RGB.
    pub fn update(&mut self, frame: &Frame) -> Result<bool> {
        if self.is_closing() {
            return Ok(false);
        }

        let rgb = to_rgb_bytes(frame.data(), frame.format)?;
        self.buffer.clear();
        self.buffer.extend(
            rgb.chunks_exact(3)
                .map(|p| (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2])),
        );
        self.width = frame.width as usize;
        self.height = frame.height as usize;

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| OverlayError::VisualizerError(format!("Failed to update window: {e}")))?;
        self.track_mouse();

        Ok(true)
    }

    /// Keep the window responsive for `duration` without a new frame.
    /// Returns `false` once the window should close.
    pub fn wait(&mut self, duration: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.is_closing() {
                return false;
            }
            if self.buffer.is_empty() {
                self.window.update();
            } else {
                let _ = self
                    .window
                    .update_with_buffer(&self.buffer, self.width, self.height);
            }
            self.track_mouse();
            if start.elapsed() >= duration {
                return true;
            }
        }
    }

    /// Number of taps since the last call.
    pub fn take_taps(&mut self) -> usize {
        std::mem::take(&mut self.taps)
    }

    /// Current window width in screen pixels.
    #[must_use]
    pub fn display_width(&self) -> u32 {
        u32::try_from(self.window.get_size().0).unwrap_or(u32::MAX)
    }
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}
