// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame preprocessing for pose inference.
//!
//! Converts a captured frame of arbitrary resolution and pixel layout into the
//! fixed-size, interleaved RGB buffer the model consumes. The whole field of
//! view is resampled to the target size (no crop, no letterbox).

use std::cell::RefCell;

use fast_image_resize::images::{Image, ImageRef};
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};

use crate::error::{OverlayError, Result};
use crate::frame::{Frame, PixelFormat, to_rgb_bytes};

// ================================================================================================
// Thread-Local State
// ================================================================================================

thread_local! {
    /// Resizer scratch buffers survive across frames on the processing thread.
    static RESIZER: RefCell<Resizer> = RefCell::new(Resizer::new());
}

// ================================================================================================
// Types
// ================================================================================================

/// Resized RGB pixels matching the model's input width and height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputTensor {
    /// Tensor width in pixels.
    pub width: u32,
    /// Tensor height in pixels.
    pub height: u32,
    data: Vec<u8>,
}

impl InputTensor {
    /// Channels per pixel (RGB, no alpha).
    pub const CHANNELS: usize = 3;

    /// Wrap interleaved RGB bytes.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `data` is not `width * height * 3` bytes.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * Self::CHANNELS;
        if data.len() != expected {
            return Err(OverlayError::ShapeMismatch(format!(
                "{width}x{height} input tensor needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Interleaved RGB bytes, row-major.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes in the tensor.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ================================================================================================
// Public API Functions
// ================================================================================================

/// Resize and convert a frame into the model's input buffer.
///
/// Resampling runs directly on the frame's native layout, borrowing its bytes;
/// channel conversion happens afterwards on the much smaller target buffer.
///
/// # Arguments
///
/// * `frame` - Captured frame.
/// * `target_width` - Model input width.
/// * `target_height` - Model input height.
///
/// # Errors
///
/// * `ShapeMismatch` if a target dimension is zero or the frame has no valid pixel data.
/// * `UnsupportedFormat` if the frame's layout has no conversion path to RGB.
pub fn resize(frame: &Frame, target_width: u32, target_height: u32) -> Result<InputTensor> {
    if target_width == 0 || target_height == 0 {
        return Err(OverlayError::ShapeMismatch(format!(
            "target size {target_width}x{target_height} has a zero dimension"
        )));
    }

    let pixel_type = pixel_type(frame.format)?;

    if frame.is_empty() || frame.data().len() != frame.format.buffer_len(frame.width, frame.height)
    {
        return Err(OverlayError::ShapeMismatch(format!(
            "{}x{} {} frame has no valid pixel data",
            frame.width, frame.height, frame.format
        )));
    }

    let resized = if frame.width == target_width && frame.height == target_height {
        to_rgb_bytes(frame.data(), frame.format)?
    } else {
        let src = ImageRef::new(frame.width, frame.height, frame.data(), pixel_type)?;
        let mut dst = Image::new(target_width, target_height, pixel_type);

        // Alpha is ignored: many capture paths leave the fourth byte unset.
        let options = ResizeOptions::new()
            .resize_alg(ResizeAlg::Convolution(FilterType::Bilinear))
            .use_alpha(false);

        RESIZER.with(|resizer| resizer.borrow_mut().resize(&src, &mut dst, Some(&options)))?;
        to_rgb_bytes(dst.buffer(), frame.format)?
    };

    InputTensor::from_rgb(target_width, target_height, resized)
}

/// Check up front that frames in `format` can be fed to the model.
///
/// # Errors
///
/// Returns `UnsupportedFormat` if no conversion path exists.
pub fn check_conversion(format: PixelFormat) -> Result<()> {
    pixel_type(format).map(|_| ())
}

/// Map a frame layout onto the resizer's pixel type.
fn pixel_type(format: PixelFormat) -> Result<PixelType> {
    match format {
        PixelFormat::Rgb8 | PixelFormat::Bgr8 => Ok(PixelType::U8x3),
        PixelFormat::Rgba8 | PixelFormat::Bgra8 => Ok(PixelType::U8x4),
        PixelFormat::Gray8 => Ok(PixelType::U8),
        PixelFormat::Yuyv | PixelFormat::Nv12 => Err(OverlayError::UnsupportedFormat(format!(
            "no conversion path from {format} to rgb8"
        ))),
    }
}
