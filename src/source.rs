// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! File-backed frame sources.
//!
//! Live cameras go through [`crate::capture::CaptureDevice`]. Images,
//! directories of images and video files are read here so the overlay can run
//! without a camera.

use std::path::{Path, PathBuf};
use std::vec;

use crate::error::{OverlayError, Result};
use crate::frame::Frame;

const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "bmp", "gif", "webp", "tiff", "tif"];
const VIDEO_EXTENSIONS: [&str; 10] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "mpeg", "mpg"];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Live camera by platform index.
    Camera(u32),
    /// Single image file.
    Image(PathBuf),
    /// Directory of images, read in name order.
    Directory(PathBuf),
    /// Video file.
    Video(PathBuf),
}

impl Source {
    /// Whether frames arrive at the device's pace (and may be dropped).
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Camera(_))
    }

    /// Backing file or directory, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Camera(_) => None,
            Self::Image(p) | Self::Directory(p) | Self::Video(p) => Some(p),
        }
    }
}

impl Default for Source {
    fn default() -> Self {
        Self::Camera(0)
    }
}

/// A bare integer is a camera index; anything else is a path.
impl From<&str> for Source {
    fn from(s: &str) -> Self {
        if let Ok(index) = s.parse() {
            return Self::Camera(index);
        }

        let path = PathBuf::from(s);
        if path.is_dir() {
            Self::Directory(path)
        } else if has_extension(&path, &VIDEO_EXTENSIONS) {
            Self::Video(path)
        } else {
            Self::Image(path)
        }
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

enum State {
    Images(vec::IntoIter<PathBuf>),
    #[cfg(feature = "video")]
    Video {
        path: PathBuf,
        decoder: Option<video_rs::decode::Decoder>,
    },
    /// Yields one error, then ends.
    Failed(Option<OverlayError>),
}

/// Frames from an image, a directory or a video file.
///
/// Unreadable images yield an error and the iterator moves on to the next
/// file; a video ends at the first frame that cannot be decoded.
pub struct SourceIterator {
    source: Source,
    state: State,
    yielded: usize,
}

impl SourceIterator {
    /// Open a file-backed source.
    ///
    /// # Errors
    ///
    /// * `ConfigError` for camera sources, which go through a capture device.
    /// * `ImageError` / `Io` if a directory cannot be listed.
    pub fn new(source: Source) -> Result<Self> {
        let state = match &source {
            Source::Camera(index) => {
                return Err(OverlayError::ConfigError(format!(
                    "camera {index} is read through a capture device, not a file source"
                )));
            }
            Source::Image(path) => State::Images(vec![path.clone()].into_iter()),
            Source::Directory(dir) => State::Images(list_images(dir)?.into_iter()),
            #[cfg(feature = "video")]
            Source::Video(path) => State::Video {
                path: path.clone(),
                decoder: None,
            },
            #[cfg(not(feature = "video"))]
            Source::Video(path) => State::Failed(Some(OverlayError::FeatureNotEnabled(format!(
                "reading {} requires the 'video' feature",
                path.display()
            )))),
        };

        Ok(Self {
            source,
            state,
            yielded: 0,
        })
    }

    /// The source being read.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }
}

/// Image files in `dir`, sorted by path.
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(OverlayError::ImageError(format!("Not a directory: {}", dir.display())));
    }

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if has_extension(&path, &IMAGE_EXTENSIONS) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn load_image(path: &Path) -> Result<Frame> {
    let image = image::open(path)
        .map_err(|e| OverlayError::ImageError(format!("Failed to load {}: {e}", path.display())))?;
    Ok(Frame::from_rgb_image(image.to_rgb8()))
}

impl Iterator for SourceIterator {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &mut self.state {
            State::Images(paths) => paths.next().map(|p| load_image(&p)),
            #[cfg(feature = "video")]
            State::Video { path, decoder } => {
                if decoder.is_none() {
                    match video_rs::decode::Decoder::new(path.as_path()) {
                        Ok(d) => *decoder = Some(d),
                        Err(e) => {
                            let err = OverlayError::VideoError(format!("Failed to open {}: {e}", path.display()));
                            self.state = State::Failed(None);
                            return Some(Err(err));
                        }
                    }
                }
                // End of stream and decode failures both end the video.
                let (_, frame) = decoder.as_mut()?.decode().ok()?;
                Some(video_frame_to_frame(&frame))
            }
            State::Failed(err) => err.take().map(Err),
        };

        if item.is_some() {
            self.yielded += 1;
        }
        item
    }
}

impl std::fmt::Debug for SourceIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceIterator")
            .field("source", &self.source)
            .field("yielded", &self.yielded)
            .finish_non_exhaustive()
    }
}

/// Convert a decoded HWC RGB video frame into a [`Frame`].
#[cfg(feature = "video")]
fn video_frame_to_frame(frame: &video_rs::Frame) -> Result<Frame> {
    let dims = frame.shape();
    let (Ok(height), Ok(width)) = (u32::try_from(dims[0]), u32::try_from(dims[1])) else {
        return Err(OverlayError::VideoError(format!("Frame of {dims:?} is too large")));
    };

    Frame::new(
        width,
        height,
        crate::frame::PixelFormat::Rgb8,
        frame.iter().copied().collect(),
    )
}
