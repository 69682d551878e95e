// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The `run` command: capture, overlay and display.

use std::process;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "annotate")]
use ab_glyph::FontVec;

#[cfg(feature = "annotate")]
use crate::annotate::{draw_label, draw_message, load_font};
use crate::capture::{
    CameraPosition, CameraSet, CaptureDevice, CaptureFormat, Permission, assign_positions, select_format,
};
use crate::cli::args::RunArgs;
use crate::cli::logging::set_verbose;
use crate::error::{OverlayError, Result};
use crate::frame::{Frame, PixelFormat};
use crate::model::{ModelLoader, OrtEngine};
use crate::pipeline::{FrameOutcome, FramePipeline, PipelineConfig};
use crate::render::scale_factor;
use crate::source::{Source, SourceIterator};
use crate::timing::TimingSlot;
#[cfg(feature = "visualize")]
use crate::visualizer::Viewer;
use crate::visualizer::Color;
use crate::worker::{FrameWorker, Processed};
use crate::{NAME, OverlayConfig, VERSION, error, info, section, success, verbose, warn};

/// Shown instead of the camera feed when access is refused.
pub const NO_PERMISSION_MESSAGE: &str = "No Camera Permission.";

/// Color of the inference time label.
#[cfg(feature = "annotate")]
const LABEL_COLOR: Color = Color::RED;

/// Pause after a failed capture before trying again.
const CAPTURE_RETRY: Duration = Duration::from_millis(10);

/// Failed captures in a row after which the camera is considered gone.
const MAX_CAPTURE_FAILURES: u32 = 100;

/// Run the overlay. Exits the process on configuration-time errors.
pub fn run_overlay(args: &RunArgs) {
    set_verbose(args.verbose);

    let config = match build_config(args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    };

    let device = config.device.unwrap_or_default();
    println!("{NAME} {VERSION} 🚀 Rust ONNX {device}");
    let edges: Vec<String> = config.topology.edges().iter().map(ToString::to_string).collect();
    verbose!("Skeleton: {}", edges.join(", "));

    let source = Source::from(args.source.as_str());
    let result = if let Source::Camera(index) = source {
        let position = args.position.parse().unwrap_or_else(|e: String| {
            warn!("{e}, using front");
            CameraPosition::Front
        });
        run_camera(args, config, index, position)
    } else {
        run_files(args, config, source)
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}

/// Map command-line flags onto an [`OverlayConfig`].
///
/// # Errors
///
/// Returns `ConfigError` naming the first flag that fails to parse or is out of range.
pub fn build_config(args: &RunArgs) -> Result<OverlayConfig> {
    let invalid = |flag: &str, e: String| OverlayError::ConfigError(format!("invalid {flag}: {e}"));

    if !(0.0..1.0).contains(&args.conf) {
        return Err(invalid("--conf", format!("{} is outside [0, 1)", args.conf)));
    }
    if args.line_width <= 0.0 {
        return Err(invalid("--line-width", format!("{} must be positive", args.line_width)));
    }
    if args.min_size > args.max_size {
        return Err(invalid(
            "--min-size",
            format!("{} exceeds --max-size {}", args.min_size, args.max_size),
        ));
    }

    let line_color: Color = args.line_color.parse().map_err(|e| invalid("--line-color", e))?;
    let fill_color: Color = args.fill_color.parse().map_err(|e| invalid("--fill-color", e))?;

    let mut config = OverlayConfig::new()
        .with_confidence(args.conf)
        .with_edge_rule(args.edge_rule.parse().map_err(|e| invalid("--edge-rule", e))?)
        .with_topology(args.topology.parse().map_err(|e| invalid("--topology", e))?)
        .with_line_width(args.line_width)
        .with_colors(line_color, fill_color)
        .with_format_bounds(args.min_size, args.max_size)
        .with_threads(args.threads);

    if let Some(d) = &args.device {
        config = config.with_device(d.parse().map_err(|e| invalid("--device", e))?);
    }

    Ok(config)
}

// ================================================================================================
// Display
// ================================================================================================

/// Window (if shown) plus label rendering for processed frames.
struct Display {
    #[cfg(feature = "visualize")]
    viewer: Option<Viewer>,
    #[cfg(feature = "annotate")]
    font: Option<FontVec>,
    show: bool,
    #[cfg_attr(not(feature = "annotate"), allow(dead_code))]
    timing: TimingSlot,
}

impl Display {
    fn new(show: bool, timing: TimingSlot) -> Self {
        #[cfg(not(feature = "visualize"))]
        if show {
            warn!("--show requires the 'visualize' feature, running headless");
        }

        Self {
            #[cfg(feature = "visualize")]
            viewer: None,
            #[cfg(feature = "annotate")]
            font: if show { load_font() } else { None },
            show: show && cfg!(feature = "visualize"),
            timing,
        }
    }

    /// Width of the display surface, once a window exists.
    fn display_width(&self) -> Option<u32> {
        #[cfg(feature = "visualize")]
        if let Some(viewer) = &self.viewer {
            return Some(viewer.display_width());
        }
        None
    }

    /// Show a frame with the timing label. Returns `false` once the window closed.
    #[allow(unused_mut, unused_variables)]
    fn present(&mut self, mut frame: Frame, scale: f32) -> Result<bool> {
        if !self.show {
            return Ok(true);
        }

        #[cfg(feature = "annotate")]
        if let Some(font) = &self.font {
            let label = self.timing.label();
            if let Ok(mut canvas) = frame.canvas() {
                draw_label(&mut canvas, font, &label, LABEL_COLOR, scale);
            }
        }

        self.show_frame(&frame)
    }

    #[cfg(feature = "visualize")]
    fn show_frame(&mut self, frame: &Frame) -> Result<bool> {
        if self.viewer.is_none() {
            self.viewer = Some(Viewer::new(NAME, frame.width as usize, frame.height as usize)?);
        }
        match &mut self.viewer {
            Some(viewer) => viewer.update(frame),
            None => Ok(false),
        }
    }

    #[cfg(not(feature = "visualize"))]
    #[allow(clippy::unused_self)]
    fn show_frame(&self, _frame: &Frame) -> Result<bool> {
        Ok(true)
    }

    /// Show a static message until the window is closed.
    #[allow(unused_variables)]
    fn hold_message(&mut self, text: &str, width: u32, height: u32) -> Result<()> {
        if !self.show {
            return Ok(());
        }

        let mut frame = Frame::new(width, height, PixelFormat::Rgb8, vec![0; (width * height * 3) as usize])?;
        #[cfg(feature = "annotate")]
        if let Some(font) = &self.font {
            let mut canvas = frame.canvas()?;
            draw_message(&mut canvas, font, text, Color::WHITE, 1.0);
        }

        if self.show_frame(&frame)? {
            self.hold();
        }
        Ok(())
    }

    /// Keep the last frame on screen until the window is closed.
    fn hold(&mut self) {
        #[cfg(feature = "visualize")]
        if let Some(viewer) = &mut self.viewer {
            while viewer.wait(Duration::from_millis(100)) {}
        }
    }

    /// Taps since the last call.
    fn taps(&mut self) -> usize {
        #[cfg(feature = "visualize")]
        if let Some(viewer) = &mut self.viewer {
            return viewer.take_taps();
        }
        0
    }
}

/// Log what happened to a frame when there is no window to show it.
fn report(outcome: &FrameOutcome, sequence: u64) {
    match outcome {
        FrameOutcome::Rendered { edges, elapsed_ms } => {
            info!("frame {sequence}: {edges} edges, {elapsed_ms:.2} ms");
        }
        FrameOutcome::PassedThrough => {
            info!("frame {sequence}: model not ready");
        }
        FrameOutcome::Skipped(_) => {}
    }
}

/// Turn a skip caused by a configuration-time error into a hard failure.
///
/// Frame-local skips are already logged by the pipeline and the loop goes on.
fn surface_persistent(processed: Processed) -> Result<Processed> {
    let Processed {
        sequence,
        frame,
        outcome,
    } = processed;
    match outcome {
        FrameOutcome::Skipped(e) if !e.is_frame_local() => Err(e),
        outcome => Ok(Processed {
            sequence,
            frame,
            outcome,
        }),
    }
}

/// Build the pipeline configuration for `format` and the current display.
fn pipeline_config(config: &OverlayConfig, format: CaptureFormat, display: &Display) -> Result<Arc<PipelineConfig>> {
    let mut config = config.clone();
    if config.display_width.is_none()
        && let Some(width) = display.display_width()
    {
        config.display_width = Some(width);
    }
    Ok(Arc::new(PipelineConfig::new(&config, format)?))
}

/// A rebuilt configuration if the window width no longer matches `scale`.
fn display_changed(
    config: &OverlayConfig,
    format: CaptureFormat,
    display: &Display,
    scale: f32,
) -> Result<Option<Arc<PipelineConfig>>> {
    if config.display_width.is_some() {
        return Ok(None);
    }
    match display.display_width() {
        Some(width) if (scale_factor(format.width, width) - scale).abs() > f32::EPSILON => {
            pipeline_config(config, format, display).map(Some)
        }
        _ => Ok(None),
    }
}

// ================================================================================================
// File sources
// ================================================================================================

/// Process an image, directory or video, waiting for each frame.
///
/// The model is loaded before the first frame so that no frame passes
/// through unprocessed.
fn run_files(args: &RunArgs, config: OverlayConfig, source: Source) -> Result<()> {
    section!("Loading {}", args.model);
    let engine = OrtEngine::load(&args.model, &config)?;
    let loader = ModelLoader::ready(Box::new(engine));

    let timing = TimingSlot::new();
    let mut display = Display::new(args.show, timing.clone());
    let mut frames = SourceIterator::new(source)?.peekable();

    let first = match frames.peek() {
        Some(Ok(frame)) => CaptureFormat::new(frame.width, frame.height, 0, frame.format),
        Some(Err(_)) => match frames.next() {
            Some(Err(e)) => return Err(e),
            _ => return Ok(()),
        },
        None => {
            warn!("Source has no frames");
            return Ok(());
        }
    };

    let mut format = first;
    let pipeline_cfg = pipeline_config(&config, format, &display)?;
    let mut scale = pipeline_cfg.style.scale;
    let worker = FrameWorker::spawn(FramePipeline::new(loader, pipeline_cfg, timing))?;
    let mut rendered = 0_usize;

    for item in frames {
        let frame = match item {
            Ok(frame) => frame,
            Err(e) => {
                error!("{e}");
                continue;
            }
        };

        if (frame.width, frame.height, frame.format) != (format.width, format.height, format.pixel_format) {
            format = CaptureFormat::new(frame.width, frame.height, 0, frame.format);
            let updated = pipeline_config(&config, format, &display)?;
            scale = updated.style.scale;
            worker.reconfigure(updated)?;
        }

        worker.submit(frame)?;
        let Some(processed) = worker.recv() else {
            break;
        };
        let processed = surface_persistent(processed)?;
        if processed.outcome.is_rendered() {
            rendered += 1;
        }
        if !display.show {
            report(&processed.outcome, processed.sequence);
        }
        if !display.present(processed.frame, scale)? {
            return Ok(());
        }
        if let Some(updated) = display_changed(&config, format, &display, scale)? {
            scale = updated.style.scale;
            worker.reconfigure(updated)?;
        }
    }

    success!("Drew {rendered} skeleton overlays");
    display.hold();
    Ok(())
}

// ================================================================================================
// Camera
// ================================================================================================

#[cfg(feature = "camera")]
fn run_camera(args: &RunArgs, config: OverlayConfig, index: u32, position: CameraPosition) -> Result<()> {
    let mut camera = crate::camera::NokhwaCamera::new();
    run_capture(&mut camera, args, config, index, position)
}

#[cfg(not(feature = "camera"))]
fn run_camera(_args: &RunArgs, _config: OverlayConfig, index: u32, _position: CameraPosition) -> Result<()> {
    Err(OverlayError::FeatureNotEnabled(format!(
        "camera {index} requires the 'camera' feature"
    )))
}

/// Put camera `index` at `position` when it exists, otherwise keep the name-based assignment.
#[cfg_attr(not(feature = "camera"), allow(dead_code))]
fn place_camera(mut set: CameraSet, devices: &[crate::capture::CameraDescriptor], index: u32, position: CameraPosition) -> CameraSet {
    if index == 0 {
        return set;
    }
    if let Some(device) = devices.iter().find(|d| d.index == index) {
        match position {
            CameraPosition::Front => set.front = Some(device.clone()),
            CameraPosition::Back => set.back = Some(device.clone()),
        }
    }
    set
}

/// Select a format for the camera at `position` and start streaming.
#[cfg_attr(not(feature = "camera"), allow(dead_code))]
fn open_position<D: CaptureDevice>(
    device: &mut D,
    cameras: &CameraSet,
    position: CameraPosition,
    config: &OverlayConfig,
) -> Result<CaptureFormat> {
    let camera = cameras
        .get(position)
        .ok_or_else(|| OverlayError::CaptureError(format!("No {position} camera available")))?;

    let formats = device.supported_formats(camera.index)?;
    let format = select_format(&formats, config.min_capture_size, config.max_capture_size).ok_or_else(|| {
        OverlayError::UnsupportedFormat(format!(
            "{} has no format with a shorter side in {}..={}",
            camera.name, config.min_capture_size, config.max_capture_size
        ))
    })?;

    device.open(camera.index, format)?;
    info!("{} {}", format.width, format.height);
    verbose!("Using {position} camera '{}' at {format}", camera.name);
    Ok(format)
}

/// Drive a live capture device until the window closes.
///
/// The model loads in the background while the camera starts.
#[cfg_attr(not(feature = "camera"), allow(dead_code))]
fn run_capture<D: CaptureDevice>(
    device: &mut D,
    args: &RunArgs,
    config: OverlayConfig,
    index: u32,
    position: CameraPosition,
) -> Result<()> {
    let timing = TimingSlot::new();
    let mut display = Display::new(args.show, timing.clone());

    if device.request_permission() == Permission::Denied {
        error!("{NO_PERMISSION_MESSAGE}");
        display.hold_message(NO_PERMISSION_MESSAGE, 640, 480)?;
        return Err(OverlayError::PermissionDenied(
            "camera access was not granted".to_string(),
        ));
    }

    let devices = device.devices()?;
    let cameras = place_camera(assign_positions(&devices), &devices, index, position);
    for camera in &devices {
        verbose!("Camera {}: {}", camera.index, camera.name);
    }

    section!("Loading {}", args.model);
    let loader = ModelLoader::spawn(&args.model, config.clone());
    capture_loop(device, &mut display, &cameras, &config, loader, timing, position)
}

/// Stream from the camera at `position` through a worker fed by `loader`.
///
/// Frames the worker is too busy to take are dropped at the source. Ends when
/// the window closes, on a persistent error, or after
/// [`MAX_CAPTURE_FAILURES`] failed captures in a row.
#[cfg_attr(not(feature = "camera"), allow(dead_code))]
fn capture_loop<D: CaptureDevice>(
    device: &mut D,
    display: &mut Display,
    cameras: &CameraSet,
    config: &OverlayConfig,
    loader: ModelLoader,
    timing: TimingSlot,
    mut position: CameraPosition,
) -> Result<()> {
    let mut format = open_position(device, cameras, position, config)?;
    let pipeline_cfg = pipeline_config(config, format, display)?;
    let mut scale = pipeline_cfg.style.scale;
    let worker = FrameWorker::spawn(FramePipeline::new(loader, pipeline_cfg, timing))?;
    let mut failures = 0_u32;

    loop {
        match device.next_frame() {
            Ok(frame) => {
                failures = 0;
                // Busy worker: the frame is dropped here.
                let _ = worker.try_submit(frame);
            }
            Err(e) => {
                failures += 1;
                if failures >= MAX_CAPTURE_FAILURES {
                    return Err(OverlayError::CaptureError(format!(
                        "no frame after {failures} attempts, last error: {e}"
                    )));
                }
                warn!("{e}");
                std::thread::sleep(CAPTURE_RETRY);
            }
        }

        if let Some(processed) = worker.try_recv() {
            let processed = surface_persistent(processed)?;
            if !display.show {
                report(&processed.outcome, processed.sequence);
            }
            if !display.present(processed.frame, scale)? {
                return Ok(());
            }
            if let Some(updated) = display_changed(config, format, display, scale)? {
                scale = updated.style.scale;
                worker.reconfigure(updated)?;
            }
        }

        if display.taps() % 2 == 1 {
            let next = position.toggled();
            match open_position(device, cameras, next, config) {
                Ok(opened) => {
                    position = next;
                    format = opened;
                    let updated = pipeline_config(config, format, display)?;
                    scale = updated.style.scale;
                    worker.reconfigure(updated)?;
                }
                Err(e) => {
                    warn!("Cannot switch to {next} camera: {e}");
                    format = open_position(device, cameras, position, config)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::capture::CameraDescriptor;
    use crate::cli::args::{Cli, Commands};
    use crate::pipeline::tests::{FixedEngine, arm_output};
    use crate::skeleton::{EdgeRule, Topology};
    use clap::Parser;

    /// Capture device replaying a fixed script.
    struct ScriptedCamera {
        permission: Permission,
        formats: Vec<CaptureFormat>,
        /// Layout of delivered frames; `None` makes every capture fail.
        delivers: Option<PixelFormat>,
        listed: Cell<bool>,
        opened: Vec<(u32, CaptureFormat)>,
        captures: u32,
    }

    impl ScriptedCamera {
        fn new(formats: Vec<CaptureFormat>, delivers: Option<PixelFormat>) -> Self {
            Self {
                permission: Permission::Granted,
                formats,
                delivers,
                listed: Cell::new(false),
                opened: Vec::new(),
                captures: 0,
            }
        }
    }

    impl CaptureDevice for ScriptedCamera {
        fn request_permission(&mut self) -> Permission {
            self.permission
        }

        fn devices(&self) -> Result<Vec<CameraDescriptor>> {
            self.listed.set(true);
            Ok(front_camera().front.into_iter().collect())
        }

        fn supported_formats(&mut self, _index: u32) -> Result<Vec<CaptureFormat>> {
            Ok(self.formats.clone())
        }

        fn open(&mut self, index: u32, format: CaptureFormat) -> Result<()> {
            self.opened.push((index, format));
            Ok(())
        }

        fn next_frame(&mut self) -> Result<Frame> {
            self.captures += 1;
            match self.delivers {
                Some(format) => Frame::new(8, 8, format, vec![0; format.buffer_len(8, 8)]),
                None => Err(OverlayError::CaptureError("device unplugged".to_string())),
            }
        }
    }

    fn front_camera() -> CameraSet {
        CameraSet {
            front: Some(CameraDescriptor {
                index: 0,
                name: "FaceTime HD Camera".to_string(),
            }),
            back: None,
        }
    }

    fn hd_rgb() -> CaptureFormat {
        CaptureFormat::new(1280, 720, 30, PixelFormat::Rgb8)
    }

    /// Run the capture loop headless with a model that is already loaded.
    fn capture_headless(camera: &mut ScriptedCamera) -> Result<()> {
        let timing = TimingSlot::new();
        let mut display = Display::new(false, timing.clone());
        let loader = ModelLoader::ready(Box::new(FixedEngine::new(arm_output())));
        capture_loop(
            camera,
            &mut display,
            &front_camera(),
            &OverlayConfig::new(),
            loader,
            timing,
            CameraPosition::Front,
        )
    }

    fn run_args(extra: &[&str]) -> RunArgs {
        let argv = ["app", "run"].iter().chain(extra).copied();
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
        }
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(&run_args(&[])).unwrap();
        assert!((config.confidence_threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.topology, Topology::LIMBS);
        assert_eq!(config.edge_rule, EdgeRule::BothJoints);
        assert_eq!(config.line_color, Color::BLACK);
        assert!(config.device.is_none());
    }

    #[test]
    fn test_build_config_flags() {
        let config = build_config(&run_args(&[
            "--topology",
            "full",
            "--edge-rule",
            "from",
            "--fill-color",
            "#102030",
            "--device",
            "cuda:1",
        ]))
        .unwrap();
        assert_eq!(config.topology, Topology::FULL_BODY);
        assert_eq!(config.edge_rule, EdgeRule::FromJoint);
        assert_eq!(config.fill_color, Color(0x10, 0x20, 0x30));
        assert_eq!(config.device, Some(crate::Device::Cuda(1)));
    }

    #[test]
    fn test_build_config_rejects() {
        for bad in [
            &["--conf", "1.5"][..],
            &["--line-width", "0"],
            &["--min-size", "1200"],
            &["--line-color", "mauve"],
            &["--topology", "tail"],
            &["--device", "tpu"],
        ] {
            assert!(matches!(
                build_config(&run_args(bad)),
                Err(OverlayError::ConfigError(_))
            ));
        }
    }

    #[test]
    fn test_place_camera() {
        let devices = [
            CameraDescriptor {
                index: 0,
                name: "FaceTime HD Camera".to_string(),
            },
            CameraDescriptor {
                index: 3,
                name: "USB Camera".to_string(),
            },
        ];
        let set = place_camera(assign_positions(&devices), &devices, 3, CameraPosition::Back);
        assert_eq!(set.back.map(|d| d.index), Some(3));
        let set = place_camera(assign_positions(&devices), &devices, 0, CameraPosition::Back);
        assert_eq!(set.front.map(|d| d.index), Some(0));
    }

    #[test]
    fn test_permission_denied_opens_nothing() {
        let mut camera = ScriptedCamera::new(vec![hd_rgb()], Some(PixelFormat::Rgb8));
        camera.permission = Permission::Denied;
        let args = run_args(&["--show", "false"]);

        let result = run_capture(&mut camera, &args, OverlayConfig::new(), 0, CameraPosition::Front);
        assert!(matches!(result, Err(OverlayError::PermissionDenied(_))));
        assert!(!camera.listed.get());
        assert!(camera.opened.is_empty());
        assert_eq!(camera.captures, 0);
    }

    #[test]
    fn test_open_position_respects_size_bounds() {
        let mut camera = ScriptedCamera::new(
            vec![
                CaptureFormat::new(640, 480, 60, PixelFormat::Rgb8),
                CaptureFormat::new(1920, 1080, 30, PixelFormat::Rgb8),
            ],
            Some(PixelFormat::Rgb8),
        );
        let result = open_position(&mut camera, &front_camera(), CameraPosition::Front, &OverlayConfig::new());
        assert!(matches!(result, Err(OverlayError::UnsupportedFormat(_))));
        assert!(camera.opened.is_empty());

        camera.formats.push(hd_rgb());
        let format = open_position(&mut camera, &front_camera(), CameraPosition::Front, &OverlayConfig::new()).unwrap();
        assert_eq!(format, hd_rgb());
        assert_eq!(camera.opened, vec![(0, hd_rgb())]);
    }

    #[test]
    fn test_missing_camera_keeps_current_stream() {
        let mut camera = ScriptedCamera::new(vec![hd_rgb()], Some(PixelFormat::Rgb8));
        let cameras = front_camera();
        let config = OverlayConfig::new();
        open_position(&mut camera, &cameras, CameraPosition::Front, &config).unwrap();

        let switched = open_position(&mut camera, &cameras, CameraPosition::Back, &config);
        assert!(matches!(switched, Err(OverlayError::CaptureError(_))));
        assert_eq!(camera.opened, vec![(0, hd_rgb())]);
    }

    #[test]
    fn test_unconvertible_frames_end_capture() {
        // The camera negotiates rgb8 but delivers yuyv.
        let mut camera = ScriptedCamera::new(vec![hd_rgb()], Some(PixelFormat::Yuyv));
        let result = capture_headless(&mut camera);
        assert!(matches!(result, Err(OverlayError::UnsupportedFormat(_))));
        assert!(camera.captures >= 1);

        // Negotiating an unconvertible format fails before the first capture.
        let nv12 = CaptureFormat::new(1280, 720, 30, PixelFormat::Nv12);
        let mut camera = ScriptedCamera::new(vec![nv12], Some(PixelFormat::Nv12));
        let result = capture_headless(&mut camera);
        assert!(matches!(result, Err(OverlayError::UnsupportedFormat(_))));
        assert_eq!(camera.captures, 0);
    }

    #[test]
    fn test_failed_model_load_ends_capture() {
        let timing = TimingSlot::new();
        let mut display = Display::new(false, timing.clone());
        let mut camera = ScriptedCamera::new(vec![hd_rgb()], Some(PixelFormat::Rgb8));
        let loader = ModelLoader::failed(OverlayError::UnsupportedFormat("int8 input".to_string()));

        let result = capture_loop(
            &mut camera,
            &mut display,
            &front_camera(),
            &OverlayConfig::new(),
            loader,
            timing,
            CameraPosition::Front,
        );
        assert!(matches!(result, Err(OverlayError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_unplugged_camera_gives_up() {
        let mut camera = ScriptedCamera::new(vec![hd_rgb()], None);
        let result = capture_headless(&mut camera);
        assert!(matches!(result, Err(OverlayError::CaptureError(_))));
        assert_eq!(camera.captures, MAX_CAPTURE_FAILURES);
    }
}
