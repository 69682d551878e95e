// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Capture device interface and format selection.
//!
//! The pipeline never talks to camera APIs directly. A [`CaptureDevice`]
//! enumerates cameras, negotiates permission and a format, and yields
//! [`Frame`]s; [`select_format`] picks the format once per device change.

use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::frame::{Frame, PixelFormat};

/// One mode a capture device can stream in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFormat {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub frame_rate: u32,
    /// Pixel layout of delivered frames.
    pub pixel_format: PixelFormat,
}

impl CaptureFormat {
    /// Create a format description.
    #[must_use]
    pub const fn new(width: u32, height: u32, frame_rate: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            frame_rate,
            pixel_format,
        }
    }

    /// Length of the shorter side.
    #[must_use]
    pub const fn shorter_side(&self) -> u32 {
        if self.width < self.height { self.width } else { self.height }
    }

    /// Pixel count.
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ {} fps ({})",
            self.width, self.height, self.frame_rate, self.pixel_format
        )
    }
}

/// Pick the capture format to stream in.
///
/// Candidates are the formats whose shorter side lies in `[min, max]`. Among
/// them, formats the resizer can convert win over those it cannot, then the
/// highest frame rate, then the largest area. Returns `None` if nothing fits
/// the bounds.
#[must_use]
pub fn select_format(formats: &[CaptureFormat], min: u32, max: u32) -> Option<CaptureFormat> {
    formats
        .iter()
        .filter(|f| (min..=max).contains(&f.shorter_side()))
        .max_by_key(|f| (f.pixel_format.is_convertible(), f.frame_rate, f.area()))
        .copied()
}

/// Which way a camera faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum CameraPosition {
    /// Facing the user.
    #[default]
    Front,
    /// Facing away from the user.
    Back,
}

impl CameraPosition {
    /// The opposite position.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => write!(f, "front"),
            Self::Back => write!(f, "back"),
        }
    }
}

impl FromStr for CameraPosition {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "front" | "user" => Ok(Self::Front),
            "back" | "rear" | "environment" => Ok(Self::Back),
            other => Err(format!("Unknown camera position: {other}")),
        }
    }
}

/// A camera as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDescriptor {
    /// Platform index used to open the camera.
    pub index: u32,
    /// Human-readable name.
    pub name: String,
}

/// Cameras assigned to each position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraSet {
    /// Front camera, if any.
    pub front: Option<CameraDescriptor>,
    /// Back camera, if any.
    pub back: Option<CameraDescriptor>,
}

impl CameraSet {
    /// Camera for `position`, if one exists.
    #[must_use]
    pub const fn get(&self, position: CameraPosition) -> Option<&CameraDescriptor> {
        match position {
            CameraPosition::Front => self.front.as_ref(),
            CameraPosition::Back => self.back.as_ref(),
        }
    }
}

const FRONT_HINTS: [&str; 4] = ["front", "user", "facetime", "integrated"];
const BACK_HINTS: [&str; 3] = ["back", "rear", "environment"];

/// Map enumerated cameras onto front and back positions.
///
/// Names containing a position hint are assigned first. Remaining slots are
/// filled in enumeration order, front before back.
#[must_use]
pub fn assign_positions(devices: &[CameraDescriptor]) -> CameraSet {
    let matches = |d: &CameraDescriptor, hints: &[&str]| {
        let name = d.name.to_lowercase();
        hints.iter().any(|h| name.contains(h))
    };

    let mut set = CameraSet {
        front: devices.iter().find(|d| matches(d, &FRONT_HINTS)).cloned(),
        back: devices
            .iter()
            .find(|d| matches(d, &BACK_HINTS) && !matches(d, &FRONT_HINTS))
            .cloned(),
    };

    let taken = [set.front.as_ref().map(|d| d.index), set.back.as_ref().map(|d| d.index)];
    let mut unassigned = devices.iter().filter(|d| !taken.contains(&Some(d.index)));
    if set.front.is_none() {
        set.front = unassigned.next().cloned();
    }
    if set.back.is_none() {
        set.back = unassigned.next().cloned();
    }
    set
}

/// Outcome of a camera permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Frames may be captured.
    Granted,
    /// Capture is not allowed; shown as a persistent state.
    Denied,
}

/// A platform camera stack.
pub trait CaptureDevice {
    /// Ask for access to the cameras. Called once before any other method.
    fn request_permission(&mut self) -> Permission;

    /// Enumerate available cameras.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError` if the platform query fails.
    fn devices(&self) -> Result<Vec<CameraDescriptor>>;

    /// Formats the camera at `index` can stream in.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError` if the camera cannot be queried.
    fn supported_formats(&mut self, index: u32) -> Result<Vec<CaptureFormat>>;

    /// Start streaming from the camera at `index` in `format`, closing any open stream.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError` if the stream cannot be opened.
    fn open(&mut self, index: u32, format: CaptureFormat) -> Result<()>;

    /// Block until the next frame arrives.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError` if no stream is open or the frame cannot be decoded.
    fn next_frame(&mut self) -> Result<Frame>;
}
