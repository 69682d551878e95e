// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Live camera capture through `nokhwa`.

use std::sync::mpsc;
use std::time::Duration;

use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
};

use crate::capture::{CameraDescriptor, CaptureDevice, CaptureFormat, Permission};
use crate::error::{OverlayError, Result};
use crate::frame::{Frame, PixelFormat};
use crate::{verbose, warn};

/// How long to wait for the user to answer the OS permission prompt.
const PERMISSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Platform cameras via `nokhwa`.
///
/// Frames are decoded to RGB on capture, so every native format the camera
/// advertises is reported as [`PixelFormat::Rgb8`].
#[derive(Default)]
pub struct NokhwaCamera {
    camera: Option<Camera>,
    /// Native formats from the last `supported_formats` query, by camera index.
    native: Vec<(u32, CameraFormat)>,
}

impl NokhwaCamera {
    /// Create an unopened camera stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn native_format(&self, index: u32, format: CaptureFormat) -> Option<CameraFormat> {
        self.native
            .iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, f)| *f)
            .find(|f| {
                f.resolution().width() == format.width
                    && f.resolution().height() == format.height
                    && f.frame_rate() == format.frame_rate
            })
    }
}

fn capture_error(what: &str, e: impl std::fmt::Display) -> OverlayError {
    OverlayError::CaptureError(format!("{what}: {e}"))
}

/// Whether `nokhwa` can decode this native format to RGB.
const fn decodable(format: FrameFormat) -> bool {
    matches!(
        format,
        FrameFormat::MJPEG | FrameFormat::YUYV | FrameFormat::NV12 | FrameFormat::GRAY | FrameFormat::RAWRGB
    )
}

impl CaptureDevice for NokhwaCamera {
    fn request_permission(&mut self) -> Permission {
        if nokhwa::nokhwa_check() {
            return Permission::Granted;
        }

        let (tx, rx) = mpsc::channel();
        nokhwa::nokhwa_initialize(move |granted| {
            let _ = tx.send(granted);
        });

        match rx.recv_timeout(PERMISSION_TIMEOUT) {
            Ok(true) => Permission::Granted,
            Ok(false) => Permission::Denied,
            Err(_) => {
                warn!("Timed out waiting for camera permission");
                Permission::Denied
            }
        }
    }

    fn devices(&self) -> Result<Vec<CameraDescriptor>> {
        let cameras = nokhwa::query(ApiBackend::Auto).map_err(|e| capture_error("Failed to enumerate cameras", e))?;

        Ok(cameras
            .iter()
            .enumerate()
            .map(|(i, info)| CameraDescriptor {
                index: match info.index() {
                    CameraIndex::Index(n) => *n,
                    CameraIndex::String(_) => u32::try_from(i).unwrap_or(u32::MAX),
                },
                name: info.human_name(),
            })
            .collect())
    }

    fn supported_formats(&mut self, index: u32) -> Result<Vec<CaptureFormat>> {
        // Formats can only be queried on an open handle; release ours first.
        self.camera = None;

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| capture_error(&format!("Failed to open camera {index}"), e))?;
        let formats = camera
            .compatible_camera_formats()
            .map_err(|e| capture_error("Failed to query camera formats", e))?;

        self.native.retain(|(i, _)| *i != index);
        let mut supported = Vec::with_capacity(formats.len());
        for native in formats.into_iter().filter(|f| decodable(f.format())) {
            self.native.push((index, native));
            supported.push(CaptureFormat::new(
                native.resolution().width(),
                native.resolution().height(),
                native.frame_rate(),
                PixelFormat::Rgb8,
            ));
        }
        Ok(supported)
    }

    fn open(&mut self, index: u32, format: CaptureFormat) -> Result<()> {
        self.camera = None;

        let request = self.native_format(index, format).map_or_else(
            || {
                RequestedFormatType::Closest(CameraFormat::new_from(
                    format.width,
                    format.height,
                    FrameFormat::MJPEG,
                    format.frame_rate,
                ))
            },
            RequestedFormatType::Exact,
        );

        let mut camera = Camera::new(CameraIndex::Index(index), RequestedFormat::new::<RgbFormat>(request))
            .map_err(|e| capture_error(&format!("Failed to open camera {index}"), e))?;
        camera
            .open_stream()
            .map_err(|e| capture_error("Failed to open camera stream", e))?;

        verbose!(
            "Camera opened: {} ({}x{} @ {} fps)",
            camera.info().human_name(),
            camera.resolution().width(),
            camera.resolution().height(),
            camera.frame_rate()
        );
        self.camera = Some(camera);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| OverlayError::CaptureError("No camera stream is open".to_string()))?;

        let buffer = camera.frame().map_err(|e| capture_error("Failed to capture frame", e))?;
        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| capture_error("Failed to decode frame", e))?;

        let (width, height) = image.dimensions();
        Frame::new(width, height, PixelFormat::Rgb8, image.into_raw())
    }
}

impl std::fmt::Debug for NokhwaCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NokhwaCamera")
            .field("open", &self.camera.is_some())
            .field("known_formats", &self.native.len())
            .finish()
    }
}
