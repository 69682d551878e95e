// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose Overlay
//!
//! Real-time single-person pose skeleton overlay written in Rust. Each
//! captured frame is resized to the input of a `MoveNet` style ONNX model,
//! the 17 returned keypoints are filtered by confidence, and the connecting
//! limbs are drawn over a solid background on the frame itself.
//!
//! ## Features
//!
//! - **ONNX Runtime** - Model input shape, layout and element type are read from the model
//! - **Off-thread Processing** - A dedicated worker drops frames instead of queueing them
//! - **Live Cameras** - Front/back switching and format negotiation (`camera` feature)
//! - **File Sources** - Images, directories and video files (`video` feature)
//! - **Multiple Backends** - CPU, CUDA, `TensorRT`, `CoreML`, `DirectML` and `OpenVINO`
//!
//! ## CLI Usage
//!
//! ```bash
//! # Front camera with the default model
//! pose-overlay run
//!
//! # Back camera, full body skeleton
//! pose-overlay run --source 1 --position back --topology full
//!
//! # Directory of images without a window
//! pose-overlay run -m movenet.onnx --source photos/ --show false
//! ```
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pose_overlay::{
//!     CaptureFormat, Frame, FramePipeline, ModelLoader, OverlayConfig, PipelineConfig, PixelFormat,
//!     TimingSlot,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OverlayConfig::new().with_confidence(0.5);
//!     let loader = ModelLoader::spawn("movenet_singlepose_lightning.onnx", config.clone());
//!
//!     let format = CaptureFormat::new(1280, 720, 30, PixelFormat::Rgb8);
//!     let pipeline_config = Arc::new(PipelineConfig::new(&config, format)?);
//!     let mut pipeline = FramePipeline::new(loader, pipeline_config, TimingSlot::new());
//!
//!     let mut frame = Frame::new(1280, 720, PixelFormat::Rgb8, vec![0; 1280 * 720 * 3])?;
//!     let outcome = pipeline.process(&mut frame);
//!     println!("{outcome:?}, last inference {}", pipeline.timing().label());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capture`] | [`CaptureDevice`] trait, format selection, camera positions |
//! | [`pipeline`] | [`FramePipeline`]: resize, infer, interpret and render one frame |
//! | [`worker`] | [`FrameWorker`]: runs the pipeline on its own thread |
//! | [`model`] | [`InferenceEngine`] trait, ONNX Runtime engine, background loading |
//! | [`skeleton`] | Keypoint interpretation and edge topologies |
//! | [`render`] | Scaled stroke styles and the overlay renderer |
//! | [`preprocessing`] | Frame resizing into model input tensors |
//! | [`frame`] | Pixel buffers, drawing surfaces and paints |
//! | [`timing`] | Latest inference time shared with the display |
//! | [`source`] | Image, directory and video sources |
//! | [`config`] | [`OverlayConfig`] builder |
//! | [`error`] | Error types ([`OverlayError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `annotate` | Inference time label (default) |
//! | `visualize` | Real-time window display (default) |
//! | `camera` | Live capture through `nokhwa` |
//! | `video` | Video file support |
//! | `cuda` | NVIDIA CUDA acceleration |
//! | `tensorrt` | NVIDIA `TensorRT` optimization |
//! | `coreml` | Apple `CoreML` (macOS/iOS) |
//! | `directml` | `DirectML` (Windows) |
//! | `openvino` | Intel `OpenVINO` |
//!
//! ## License
//!
//! This project is dual-licensed under [AGPL-3.0](https://github.com/ultralytics/inference/blob/main/LICENSE)
//! for open-source use or [Ultralytics Enterprise License](https://ultralytics.com/license)
//! for commercial applications.

// Modules
#[cfg(feature = "annotate")]
pub mod annotate;
#[cfg(feature = "camera")]
pub mod camera;
pub mod capture;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod render;
pub mod skeleton;
pub mod source;
pub mod timing;
pub mod visualizer;
pub mod worker;

// Re-export main types for convenience
pub use capture::{CameraPosition, CaptureDevice, CaptureFormat, Permission, select_format};
pub use config::OverlayConfig;
pub use device::Device;
pub use error::{OverlayError, Result};
pub use frame::{Frame, PixelFormat, Surface};
pub use model::{InferenceEngine, ModelLoader, OrtEngine};
pub use pipeline::{FrameOutcome, FramePipeline, PipelineConfig};
pub use skeleton::{DrawableEdge, EdgeRule, Topology};
pub use source::{Source, SourceIterator};
pub use timing::TimingSlot;
pub use visualizer::Color;
pub use worker::{FrameWorker, Processed};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
