// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-frame pose overlay pipeline.
//!
//! One call to [`FramePipeline::process`] runs resize, inference,
//! interpretation and rendering for a single frame, in that order. Style and
//! topology live in an immutable [`PipelineConfig`] that is rebuilt only when
//! the capture format changes.

use std::sync::Arc;

use crate::capture::CaptureFormat;
use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use crate::frame::Frame;
use crate::model::{InferenceEngine, ModelLoader, log_model};
use crate::preprocessing::{check_conversion, resize};
use crate::render::{Style, render};
use crate::skeleton::{DrawableEdge, EdgeRule, Topology, interpret};
use crate::timing::{Stopwatch, TimingSlot};
use crate::{error, verbose};

/// Everything a frame needs that does not change between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Edges to draw.
    pub topology: Topology,
    /// Exclusive confidence threshold.
    pub threshold: f32,
    /// Joint gating rule.
    pub edge_rule: EdgeRule,
    /// Paints scaled for the capture format.
    pub style: Style,
    /// Format frames are expected in.
    pub format: CaptureFormat,
}

impl PipelineConfig {
    /// Build the configuration for frames captured in `format`.
    ///
    /// The display width defaults to the capture width, giving a scale of 1.
    ///
    /// # Errors
    ///
    /// * `UnsupportedFormat` if frames in `format` cannot be converted for the model.
    /// * `ConfigError` if the topology references unknown joints.
    pub fn new(config: &OverlayConfig, format: CaptureFormat) -> Result<Self> {
        check_conversion(format.pixel_format)?;
        config.topology.validate()?;

        let display_width = config.display_width.unwrap_or(format.width);
        Ok(Self {
            topology: config.topology,
            threshold: config.confidence_threshold,
            edge_rule: config.edge_rule,
            style: Style::for_capture(format.width, display_width, config),
            format,
        })
    }
}

/// What happened to one frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Overlay drawn.
    Rendered {
        /// Number of edges drawn.
        edges: usize,
        /// Resize plus inference time in milliseconds.
        elapsed_ms: f64,
    },
    /// Model not loaded yet; frame untouched, timing not updated.
    PassedThrough,
    /// Processing of this frame failed. Later frames are unaffected unless
    /// the error is not frame-local, as with a failed model load.
    Skipped(OverlayError),
}

impl FrameOutcome {
    /// Whether an overlay was drawn.
    #[must_use]
    pub const fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. })
    }
}

/// Runs the overlay for one frame at a time.
///
/// Owns the inference engine once loaded. `process` takes `&mut self`, so two
/// frames can never be in flight on the same pipeline.
pub struct FramePipeline {
    loader: ModelLoader,
    engine: Option<Box<dyn InferenceEngine>>,
    /// Load failure not yet reported through `process`.
    load_error: Option<OverlayError>,
    /// Message of a failed load; the model will never become ready.
    load_failed: Option<String>,
    config: Arc<PipelineConfig>,
    timing: TimingSlot,
}

impl FramePipeline {
    /// Create a pipeline fed by `loader`, publishing timings into `timing`.
    #[must_use]
    pub const fn new(loader: ModelLoader, config: Arc<PipelineConfig>, timing: TimingSlot) -> Self {
        Self {
            loader,
            engine: None,
            load_error: None,
            load_failed: None,
            config,
            timing,
        }
    }

    /// Swap the configuration. Takes effect from the next frame.
    pub fn reconfigure(&mut self, config: Arc<PipelineConfig>) {
        self.config = config;
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared timing slot.
    #[must_use]
    pub const fn timing(&self) -> &TimingSlot {
        &self.timing
    }

    /// Whether the model is loaded.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    /// Process one frame in place.
    ///
    /// Per-frame failures are logged and reported as [`FrameOutcome::Skipped`];
    /// they never poison the pipeline. Frames pass through untouched while the
    /// model is loading. Once the load has failed every frame is skipped: the
    /// first with the load error itself, later ones with `ModelLoadError`.
    pub fn process(&mut self, frame: &mut Frame) -> FrameOutcome {
        self.poll_model();

        if let Some(e) = self.load_error.take() {
            return FrameOutcome::Skipped(e);
        }
        if let Some(msg) = &self.load_failed {
            return FrameOutcome::Skipped(OverlayError::ModelLoadError(msg.clone()));
        }

        match self.try_process(frame) {
            Ok((edges, elapsed_ms)) => {
                verbose!("{elapsed_ms:.2} ms, {edges} edges");
                FrameOutcome::Rendered { edges, elapsed_ms }
            }
            Err(OverlayError::ModelNotReady) => FrameOutcome::PassedThrough,
            Err(e) => {
                error!("Skipping frame: {e}");
                FrameOutcome::Skipped(e)
            }
        }
    }

    fn poll_model(&mut self) {
        match self.loader.try_take() {
            Some(Ok(engine)) => {
                log_model(engine.as_ref());
                self.engine = Some(engine);
            }
            Some(Err(e)) => {
                error!("Failed to load model: {e}");
                self.load_failed = Some(e.to_string());
                self.load_error = Some(e);
            }
            None => {}
        }
    }

    fn try_process(&mut self, frame: &mut Frame) -> Result<(usize, f64)> {
        let engine = self.engine.as_mut().ok_or(OverlayError::ModelNotReady)?;
        let config = &self.config;
        let (width, height) = (engine.input_spec().width, engine.input_spec().height);

        let stopwatch = Stopwatch::start();
        let input = resize(frame, width, height)?;
        let output = engine.run(&input)?;
        let elapsed = stopwatch.stop();
        self.timing.publish(elapsed);

        let edges: Vec<DrawableEdge> =
            interpret(&output, &config.topology, config.threshold, config.edge_rule)?;

        let (frame_width, frame_height) = (frame.width, frame.height);
        let mut canvas = frame.canvas()?;
        render(
            &mut canvas,
            frame_width,
            frame_height,
            &edges,
            &config.style.paint,
            &config.style.fill_paint,
        );

        Ok((edges.len(), elapsed.as_secs_f64() * 1000.0))
    }
}

impl std::fmt::Debug for FramePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePipeline")
            .field("ready", &self.is_ready())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::frame::PixelFormat;
    use crate::model::{DataType, InputSpec, TensorDescriptor};
    use crate::preprocessing::InputTensor;
    use crate::skeleton::KEYPOINT_COUNT;
    use crate::visualizer::Color;

    /// Engine returning a fixed output.
    pub(crate) struct FixedEngine {
        pub inputs: Vec<TensorDescriptor>,
        pub outputs: Vec<TensorDescriptor>,
        pub spec: InputSpec,
        pub output: Vec<f32>,
    }

    impl FixedEngine {
        pub(crate) fn new(output: Vec<f32>) -> Self {
            let input = TensorDescriptor {
                name: "input".to_string(),
                data_type: DataType::Uint8,
                shape: vec![1, 8, 8, 3],
            };
            Self {
                spec: InputSpec::from_descriptor(&input).unwrap(),
                inputs: vec![input],
                outputs: vec![TensorDescriptor {
                    name: "output".to_string(),
                    data_type: DataType::Float32,
                    shape: vec![1, 1, 17, 3],
                }],
                output,
            }
        }
    }

    impl InferenceEngine for FixedEngine {
        fn inputs(&self) -> &[TensorDescriptor] {
            &self.inputs
        }

        fn outputs(&self) -> &[TensorDescriptor] {
            &self.outputs
        }

        fn input_spec(&self) -> &InputSpec {
            &self.spec
        }

        fn run(&mut self, input: &InputTensor) -> Result<Vec<f32>> {
            crate::model::check_input(&self.spec, input)?;
            Ok(self.output.clone())
        }
    }

    /// Output with shoulder 5 at (x 0.25, y 0.5) and elbow 7 at (x 0.75, y 0.5).
    pub(crate) fn arm_output() -> Vec<f32> {
        let mut out = vec![0.0; KEYPOINT_COUNT * 3];
        out[5 * 3..5 * 3 + 3].copy_from_slice(&[0.5, 0.25, 0.9]);
        out[7 * 3..7 * 3 + 3].copy_from_slice(&[0.5, 0.75, 0.9]);
        out
    }

    fn config_for(format: CaptureFormat) -> Arc<PipelineConfig> {
        Arc::new(PipelineConfig::new(&OverlayConfig::default(), format).unwrap())
    }

    fn gray_frame(width: u32, height: u32) -> Frame {
        Frame::new(width, height, PixelFormat::Rgb8, vec![128; (width * height * 3) as usize]).unwrap()
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width + x) * 3) as usize;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    #[test]
    fn test_pass_through_before_model_ready() {
        let format = CaptureFormat::new(32, 16, 30, PixelFormat::Rgb8);
        let (release, gate) = std::sync::mpsc::channel::<()>();
        let loader = ModelLoader::spawn_with(move || {
            let _ = gate.recv();
            Err(OverlayError::ModelNotReady)
        });
        let timing = TimingSlot::new();
        let mut pipeline = FramePipeline::new(loader, config_for(format), timing.clone());

        let mut frame = gray_frame(32, 16);
        let before = frame.data().to_vec();

        assert!(matches!(pipeline.process(&mut frame), FrameOutcome::PassedThrough));
        assert_eq!(frame.data(), &before[..]);
        assert!(timing.latest_ms().is_none());
        assert!(!pipeline.is_ready());
        release.send(()).unwrap();
    }

    #[test]
    fn test_failed_load_skips_every_frame() {
        let format = CaptureFormat::new(32, 16, 30, PixelFormat::Rgb8);
        let loader = ModelLoader::failed(OverlayError::UnsupportedFormat("int8 input".to_string()));
        let mut pipeline = FramePipeline::new(loader, config_for(format), TimingSlot::new());

        let mut frame = gray_frame(32, 16);
        let before = frame.data().to_vec();

        let first = pipeline.process(&mut frame);
        assert!(matches!(first, FrameOutcome::Skipped(OverlayError::UnsupportedFormat(_))));
        assert_eq!(frame.data(), &before[..]);

        let second = pipeline.process(&mut frame);
        assert!(matches!(
            second,
            FrameOutcome::Skipped(OverlayError::ModelLoadError(ref msg)) if msg.contains("int8 input")
        ));
        assert_eq!(frame.data(), &before[..]);
        assert!(!pipeline.is_ready());
    }

    #[test]
    fn test_render_after_model_ready() {
        let format = CaptureFormat::new(32, 16, 30, PixelFormat::Rgb8);
        let loader = ModelLoader::ready(Box::new(FixedEngine::new(arm_output())));
        let timing = TimingSlot::new();
        let mut pipeline = FramePipeline::new(loader, config_for(format), timing.clone());

        let mut frame = gray_frame(32, 16);
        let outcome = pipeline.process(&mut frame);

        assert!(matches!(outcome, FrameOutcome::Rendered { edges: 1, .. }));
        assert!(timing.latest_ms().is_some());
        // Background covered, arm drawn along y = 8 from x = 8 to x = 24.
        assert_eq!(pixel(&frame, 0, 0), [255, 255, 255]);
        assert_eq!(pixel(&frame, 16, 8), [0, 0, 0]);
        assert_eq!(pixel(&frame, 16, 2), [255, 255, 255]);
    }

    #[test]
    fn test_malformed_output_skips_frame_only() {
        let format = CaptureFormat::new(16, 16, 30, PixelFormat::Rgb8);
        let loader = ModelLoader::ready(Box::new(FixedEngine::new(vec![0.5; 10])));
        let mut pipeline = FramePipeline::new(loader, config_for(format), TimingSlot::new());

        let mut frame = gray_frame(16, 16);
        let before = frame.data().to_vec();
        assert!(matches!(
            pipeline.process(&mut frame),
            FrameOutcome::Skipped(OverlayError::MalformedOutput(_))
        ));
        assert_eq!(frame.data(), &before[..]);

        // Still alive for the next frame.
        let mut next = gray_frame(16, 16);
        assert!(matches!(pipeline.process(&mut next), FrameOutcome::Skipped(_)));
        assert!(pipeline.is_ready());
    }

    #[test]
    fn test_reconfigure_changes_style() {
        let small = CaptureFormat::new(16, 16, 30, PixelFormat::Rgb8);
        let loader = ModelLoader::ready(Box::new(FixedEngine::new(arm_output())));
        let mut pipeline = FramePipeline::new(loader, config_for(small), TimingSlot::new());

        let config = OverlayConfig::default()
            .with_colors(Color::RED, Color::BLUE)
            .with_display_width(8);
        let wide = CaptureFormat::new(16, 16, 30, PixelFormat::Rgb8);
        pipeline.reconfigure(Arc::new(PipelineConfig::new(&config, wide).unwrap()));
        assert!((pipeline.config().style.scale - 2.0).abs() < f32::EPSILON);

        let mut frame = gray_frame(16, 16);
        assert!(pipeline.process(&mut frame).is_rendered());
        assert_eq!(pixel(&frame, 0, 0), [0, 0, 255]);
        assert_eq!(pixel(&frame, 8, 8), [255, 0, 0]);
    }

    #[test]
    fn test_config_rejects_unconvertible_format() {
        let format = CaptureFormat::new(1280, 720, 30, PixelFormat::Nv12);
        assert!(matches!(
            PipelineConfig::new(&OverlayConfig::default(), format),
            Err(OverlayError::UnsupportedFormat(_))
        ));
    }
}
