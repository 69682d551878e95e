// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! End-to-end tests for the overlay pipeline using a stand-in model.

use std::sync::Arc;

use pose_overlay::model::{DataType, InputSpec, TensorDescriptor, check_input};
use pose_overlay::preprocessing::InputTensor;
use pose_overlay::skeleton::KEYPOINT_COUNT;
use pose_overlay::{
    CaptureFormat, Color, EdgeRule, Frame, FrameOutcome, FramePipeline, FrameWorker, InferenceEngine, ModelLoader,
    OverlayConfig, OverlayError, PipelineConfig, PixelFormat, Result, TimingSlot, Topology, select_format,
};

/// Model stand-in with a channels-first float input and a fixed output.
struct StubModel {
    inputs: Vec<TensorDescriptor>,
    outputs: Vec<TensorDescriptor>,
    spec: InputSpec,
    output: Vec<f32>,
}

impl StubModel {
    fn new(output: Vec<f32>) -> Self {
        let input = TensorDescriptor {
            name: "image".to_string(),
            data_type: DataType::Float32,
            shape: vec![1, 3, 12, 16],
        };
        Self {
            spec: InputSpec::from_descriptor(&input).unwrap(),
            inputs: vec![input],
            outputs: vec![TensorDescriptor {
                name: "keypoints".to_string(),
                data_type: DataType::Float32,
                shape: vec![1, 1, 17, 3],
            }],
            output,
        }
    }
}

impl InferenceEngine for StubModel {
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
        check_input(&self.spec, input)?;
        Ok(self.output.clone())
    }
}

/// Keypoints as `(joint, y, x, confidence)`.
fn keypoints(joints: &[(usize, f32, f32, f32)]) -> Vec<f32> {
    let mut output = vec![0.0; KEYPOINT_COUNT * 3];
    for &(j, y, x, c) in joints {
        output[j * 3..j * 3 + 3].copy_from_slice(&[y, x, c]);
    }
    output
}

fn camera_frame(width: u32, height: u32) -> Frame {
    Frame::new(width, height, PixelFormat::Rgb8, vec![90; (width * height * 3) as usize]).unwrap()
}

fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
    let i = ((y * frame.width + x) * 3) as usize;
    [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
}

fn pipeline_with(config: &OverlayConfig, output: Vec<f32>, width: u32, height: u32) -> FramePipeline {
    let format = CaptureFormat::new(width, height, 30, PixelFormat::Rgb8);
    let loader = ModelLoader::ready(Box::new(StubModel::new(output)));
    FramePipeline::new(
        loader,
        Arc::new(PipelineConfig::new(config, format).unwrap()),
        TimingSlot::new(),
    )
}

#[test]
fn test_hip_line_drawn_over_fill() {
    // Hips 11 and 12 on the row y = 0.5, from x = 0.25 to x = 0.75.
    let output = keypoints(&[(11, 0.5, 0.25, 0.8), (12, 0.5, 0.75, 0.8)]);
    let mut pipeline = pipeline_with(&OverlayConfig::new(), output, 64, 48);

    let mut frame = camera_frame(64, 48);
    let outcome = pipeline.process(&mut frame);
    assert!(matches!(outcome, FrameOutcome::Rendered { edges: 1, .. }));

    assert_eq!(pixel(&frame, 32, 24), [0, 0, 0]);
    assert_eq!(pixel(&frame, 2, 2), [255, 255, 255]);
    assert_eq!(pixel(&frame, 32, 40), [255, 255, 255]);
    assert!(pipeline.timing().latest_ms().is_some());
    assert!(pipeline.timing().label().ends_with(" ms"));
}

#[test]
fn test_low_confidence_leaves_only_fill() {
    // Exactly at the threshold does not count as detected.
    let output = keypoints(&[(11, 0.5, 0.25, 0.45), (12, 0.5, 0.75, 0.9)]);
    let config = OverlayConfig::new().with_colors(Color::RED, Color::BLUE);
    let mut pipeline = pipeline_with(&config, output, 32, 32);

    let mut frame = camera_frame(32, 32);
    assert!(matches!(
        pipeline.process(&mut frame),
        FrameOutcome::Rendered { edges: 0, .. }
    ));
    assert!(frame.data().chunks_exact(3).all(|p| p == [0, 0, 255]));
}

#[test]
fn test_from_joint_rule_and_face_edges() {
    // Nose and left eye confident, right eye not.
    let output = keypoints(&[(0, 0.2, 0.5, 0.9), (1, 0.1, 0.4, 0.9), (2, 0.1, 0.6, 0.1)]);

    let both = OverlayConfig::new().with_topology(Topology::FULL_BODY);
    let mut pipeline = pipeline_with(&both, output.clone(), 40, 40);
    let outcome = pipeline.process(&mut camera_frame(40, 40));
    assert!(matches!(outcome, FrameOutcome::Rendered { edges: 1, .. }));

    let from = both.with_edge_rule(EdgeRule::FromJoint);
    let mut pipeline = pipeline_with(&from, output, 40, 40);
    let outcome = pipeline.process(&mut camera_frame(40, 40));
    // nose-eye twice, eye-eye and left eye to ear use the confident from joint.
    assert!(matches!(outcome, FrameOutcome::Rendered { edges: 4, .. }));
}

#[test]
fn test_truncated_output_skips_frame() {
    let mut pipeline = pipeline_with(&OverlayConfig::new(), vec![0.9; 50], 16, 16);
    let mut frame = camera_frame(16, 16);
    let before = frame.data().to_vec();

    let outcome = pipeline.process(&mut frame);
    assert!(matches!(outcome, FrameOutcome::Skipped(OverlayError::MalformedOutput(_))));
    assert_eq!(frame.data(), &before[..]);
}

#[test]
fn test_failed_load_is_a_persistent_error() {
    let loader = ModelLoader::failed(OverlayError::ModelLoadError("missing.onnx".to_string()));
    let format = CaptureFormat::new(16, 16, 30, PixelFormat::Rgb8);
    let config = Arc::new(PipelineConfig::new(&OverlayConfig::new(), format).unwrap());
    let mut pipeline = FramePipeline::new(loader, config, TimingSlot::new());

    let mut frame = camera_frame(16, 16);
    let FrameOutcome::Skipped(err) = pipeline.process(&mut frame) else {
        panic!("expected a skipped frame");
    };
    assert!(matches!(err, OverlayError::ModelLoadError(_)));
    assert!(!err.is_frame_local());
    assert_eq!(pixel(&frame, 8, 8), [90, 90, 90]);
}

#[test]
fn test_worker_drops_frames_while_busy() {
    let output = keypoints(&[(5, 0.5, 0.1, 0.9), (6, 0.5, 0.9, 0.9)]);
    let worker = FrameWorker::spawn(pipeline_with(&OverlayConfig::new(), output, 24, 24)).unwrap();

    // The first hand-off waits for the worker thread to be listening.
    worker.submit(camera_frame(24, 24)).unwrap();
    let mut accepted = 1_u64;
    let mut received = Vec::new();
    for _ in 0..50 {
        if worker.try_submit(camera_frame(24, 24)).is_ok() {
            accepted += 1;
        }
        if let Some(processed) = worker.try_recv() {
            received.push(processed);
        }
    }
    while received.len() < accepted as usize {
        received.push(worker.recv().unwrap());
    }

    assert!(received.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert!(received.iter().all(|p| p.outcome.is_rendered()));
}

#[test]
fn test_format_choice_for_overlay() {
    let formats = [
        CaptureFormat::new(640, 480, 60, PixelFormat::Rgb8),
        CaptureFormat::new(1280, 720, 30, PixelFormat::Nv12),
        CaptureFormat::new(1280, 720, 30, PixelFormat::Bgra8),
        CaptureFormat::new(1920, 1080, 30, PixelFormat::Rgb8),
        CaptureFormat::new(3840, 2160, 60, PixelFormat::Rgb8),
    ];
    let config = OverlayConfig::new();
    let chosen = select_format(&formats, config.min_capture_size, config.max_capture_size).unwrap();
    // 1080 and 2160 exceed the bound; the convertible 720p mode wins the tie.
    assert_eq!(chosen, CaptureFormat::new(1280, 720, 30, PixelFormat::Bgra8));

    assert!(select_format(&formats[..1], 720, 1000).is_none());
}
