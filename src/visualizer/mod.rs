// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Overlay colors and the display window.

/// Color definitions.
pub mod color;

#[cfg(feature = "visualize")]
pub mod viewer;

pub use color::Color;

#[cfg(feature = "visualize")]
pub use viewer::Viewer;
