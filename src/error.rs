// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the overlay pipeline.

use std::fmt;

/// Result type alias for overlay operations.
pub type Result<T> = std::result::Result<T, OverlayError>;

/// Main error type for the overlay pipeline.
#[derive(Debug)]
pub enum OverlayError {
    /// Camera permission was not granted.
    PermissionDenied(String),
    /// Resize output, model input or frame buffer dimensions disagree.
    ShapeMismatch(String),
    /// Model output does not hold `3 x joint count` values.
    MalformedOutput(String),
    /// The model has not finished loading yet.
    ModelNotReady,
    /// No conversion path between the capture and model pixel layouts.
    UnsupportedFormat(String),
    /// Error loading the ONNX model.
    ModelLoadError(String),
    /// Error during model inference.
    InferenceError(String),
    /// Error processing images.
    ImageError(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// Capture device error (open, stream, decode).
    CaptureError(String),
    /// Visualizer error.
    VisualizerError(String),
    /// Video/stream processing error.
    VideoError(String),
    /// Feature not enabled.
    FeatureNotEnabled(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
}

impl OverlayError {
    /// Whether the error is confined to a single frame.
    ///
    /// Frame-local errors abort processing of that frame only; everything else
    /// is a configuration-time error that surfaces as a persistent state.
    #[must_use]
    pub const fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch(_)
                | Self::MalformedOutput(_)
                | Self::InferenceError(_)
                | Self::ModelNotReady
        )
    }
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied(msg) => write!(f, "Permission denied: {msg}"),
            Self::ShapeMismatch(msg) => write!(f, "Shape mismatch: {msg}"),
            Self::MalformedOutput(msg) => write!(f, "Malformed output: {msg}"),
            Self::ModelNotReady => write!(f, "Model not ready"),
            Self::UnsupportedFormat(msg) => write!(f, "Unsupported format: {msg}"),
            Self::ModelLoadError(msg) => write!(f, "Model load error: {msg}"),
            Self::InferenceError(msg) => write!(f, "Inference error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::CaptureError(msg) => write!(f, "Capture error: {msg}"),
            Self::VisualizerError(msg) => write!(f, "Visualizer error: {msg}"),
            Self::VideoError(msg) => write!(f, "Video error: {msg}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for OverlayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for OverlayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for OverlayError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<fast_image_resize::ImageBufferError> for OverlayError {
    fn from(err: fast_image_resize::ImageBufferError) -> Self {
        Self::ShapeMismatch(err.to_string())
    }
}

impl From<fast_image_resize::ResizeError> for OverlayError {
    fn from(err: fast_image_resize::ResizeError) -> Self {
        Self::ImageError(format!("Resize failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OverlayError::MalformedOutput("expected 51 values, got 3".to_string());
        assert_eq!(err.to_string(), "Malformed output: expected 51 values, got 3");

        let err = OverlayError::ModelNotReady;
        assert_eq!(err.to_string(), "Model not ready");
    }

    #[test]
    fn test_frame_local_classification() {
        assert!(OverlayError::ShapeMismatch(String::new()).is_frame_local());
        assert!(OverlayError::MalformedOutput(String::new()).is_frame_local());
        assert!(!OverlayError::UnsupportedFormat(String::new()).is_frame_local());
        assert!(!OverlayError::PermissionDenied(String::new()).is_frame_local());
    }
}
