// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Text overlays on displayed frames: the inference time label and status messages.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::Rgb;
use imageproc::drawing::{Canvas, draw_text_mut, text_size};

use crate::frame::FrameCanvas;
use crate::visualizer::Color;
use crate::{verbose, warn};

/// Assets URL for downloading fonts
const ASSETS_URL: &str = "https://github.com/ultralytics/assets/releases/download/v0.0.0";

/// Font used for all labels.
pub const LABEL_FONT: &str = "Arial.ttf";

/// Label text size in display pixels.
const LABEL_SIZE: f32 = 16.0;
/// Status message text size in display pixels.
const MESSAGE_SIZE: f32 = 20.0;
/// Label distance from the left and bottom edges, in display pixels.
const LABEL_MARGIN: f32 = 20.0;
/// Padding between label text and its background, in display pixels.
const LABEL_PADDING: f32 = 5.0;
/// Fraction of the underlying pixel kept under the label background.
const BACKDROP_KEEP: f32 = 0.3;

/// Check if font exists locally or download it
pub fn check_font(font: &str) -> Option<PathBuf> {
    let font_name = Path::new(font).file_name()?.to_string_lossy();
    let config_dir = dirs::config_dir()?.join(crate::NAME);
    let font_path = config_dir.join(font_name.as_ref());

    if font_path.exists() {
        return Some(font_path);
    }

    if let Err(e) = fs::create_dir_all(&config_dir) {
        warn!("Failed to create config directory: {e}");
        return None;
    }

    let url = format!("{ASSETS_URL}/{font_name}");
    verbose!("Downloading {url} to {}", font_path.display());

    match ureq::get(&url).call() {
        Ok(response) => {
            let mut file = match File::create(&font_path) {
                Ok(f) => f,
                Err(e) => {
                    warn!("Failed to create font file: {e}");
                    return None;
                }
            };

            let mut reader = response.into_body().into_reader();
            if let Err(e) = io::copy(&mut reader, &mut file) {
                warn!("Failed to download font: {e}");
                let _ = fs::remove_file(&font_path);
                return None;
            }

            Some(font_path)
        }
        Err(e) => {
            warn!("Failed to download font from {url}: {e}");
            None
        }
    }
}

/// Load the label font, downloading it on first use.
///
/// Returns `None` when the font is unavailable; labels are then skipped.
#[must_use]
pub fn load_font() -> Option<FontVec> {
    let path = check_font(LABEL_FONT)?;
    let data = fs::read(path).ok()?;
    FontVec::try_from_vec(data).ok()
}

/// Draw `text` in the bottom-left corner over a darkened backdrop.
///
/// `scale` converts display pixels to frame pixels, like the skeleton stroke.
pub fn draw_label(canvas: &mut FrameCanvas<'_>, font: &FontVec, text: &str, color: Color, scale: f32) {
    let px = PxScale::from(LABEL_SIZE * scale);
    let (text_w, text_h) = text_size(px, font, text);
    let (_, height) = canvas.dimensions();

    let pad = (LABEL_PADDING * scale).round() as i32;
    let margin = (LABEL_MARGIN * scale).round() as i32;
    let x = margin;
    let y = height as i32 - margin - text_h as i32 - pad;

    darken(
        canvas,
        x - pad,
        y - pad,
        text_w + 2 * pad as u32,
        text_h + 2 * pad as u32,
    );
    draw_text_mut(canvas, Rgb::from(color), x, y, px, font, text);
}

/// Draw `text` centered on the canvas.
pub fn draw_message(canvas: &mut FrameCanvas<'_>, font: &FontVec, text: &str, color: Color, scale: f32) {
    let px = PxScale::from(MESSAGE_SIZE * scale);
    let (text_w, text_h) = text_size(px, font, text);
    let (width, height) = canvas.dimensions();

    let x = (width as i32 - text_w as i32) / 2;
    let y = (height as i32 - text_h as i32) / 2;
    draw_text_mut(canvas, Rgb::from(color), x, y, px, font, text);
}

/// Scale down the pixels of a rectangle, clipped to the canvas.
fn darken(canvas: &mut FrameCanvas<'_>, x: i32, y: i32, w: u32, h: u32) {
    let (width, height) = canvas.dimensions();
    let x0 = x.clamp(0, width as i32) as u32;
    let y0 = y.clamp(0, height as i32) as u32;
    let x1 = (x + w as i32).clamp(0, width as i32) as u32;
    let y1 = (y + h as i32).clamp(0, height as i32) as u32;

    for py in y0..y1 {
        for px in x0..x1 {
            let Rgb(c) = canvas.get_pixel(px, py);
            let dim = c.map(|v| (f32::from(v) * BACKDROP_KEEP) as u8);
            canvas.draw_pixel(px, py, Rgb(dim));
        }
    }
}
