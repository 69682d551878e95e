// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose model loading and inference.
//!
//! This module provides the [`InferenceEngine`] seam the pipeline talks to,
//! the ONNX Runtime backed [`OrtEngine`], and [`ModelLoader`], which loads the
//! model off the processing thread so frames keep flowing while it initializes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use ndarray::Array4;
#[cfg(feature = "coreml")]
use ort::execution_providers::CoreMLExecutionProvider;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
#[cfg(feature = "directml")]
use ort::execution_providers::DirectMLExecutionProvider;
#[cfg(feature = "openvino")]
use ort::execution_providers::OpenVINOExecutionProvider;
#[cfg(feature = "tensorrt")]
use ort::execution_providers::TensorRTExecutionProvider;
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::tensor::{PrimitiveTensorElementType, TensorElementType};
use ort::value::{TensorRef, ValueType};

use crate::config::OverlayConfig;
use crate::device::Device;
use crate::error::{OverlayError, Result};
use crate::preprocessing::InputTensor;
use crate::verbose;

// ================================================================================================
// Tensor descriptors
// ================================================================================================

/// Element type of a model tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// 8-bit unsigned integer.
    Uint8,
    /// 8-bit signed integer.
    Int8,
    /// 32-bit signed integer.
    Int32,
    /// 32-bit float.
    Float32,
    /// Anything else, by name.
    Other(String),
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint8 => write!(f, "uint8"),
            Self::Int8 => write!(f, "int8"),
            Self::Int32 => write!(f, "int32"),
            Self::Float32 => write!(f, "float32"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

impl From<TensorElementType> for DataType {
    fn from(ty: TensorElementType) -> Self {
        match ty {
            TensorElementType::Uint8 => Self::Uint8,
            TensorElementType::Int8 => Self::Int8,
            TensorElementType::Int32 => Self::Int32,
            TensorElementType::Float32 => Self::Float32,
            other => Self::Other(format!("{other:?}").to_lowercase()),
        }
    }
}

/// Name, element type and shape of one model input or output.
///
/// Dynamic dimensions are reported as `-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorDescriptor {
    /// Tensor name in the graph.
    pub name: String,
    /// Element type.
    pub data_type: DataType,
    /// Dimensions, outermost first.
    pub shape: Vec<i64>,
}

impl TensorDescriptor {
    fn from_value_type(name: &str, value_type: &ValueType) -> Self {
        match value_type {
            ValueType::Tensor { ty, shape, .. } => Self {
                name: name.to_string(),
                data_type: DataType::from(*ty),
                shape: shape.iter().copied().collect(),
            },
            other => Self {
                name: name.to_string(),
                data_type: DataType::Other(format!("{other:?}")),
                shape: Vec::new(),
            },
        }
    }
}

impl fmt::Display for TensorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.data_type, self.shape)
    }
}

/// Channel placement of a 4-D image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayout {
    /// `[batch, height, width, channels]`.
    Nhwc,
    /// `[batch, channels, height, width]`.
    Nchw,
}

/// What the model expects as its image input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    /// Input width in pixels.
    pub width: u32,
    /// Input height in pixels.
    pub height: u32,
    /// Channel placement.
    pub layout: InputLayout,
    /// Element type fed to the model.
    pub data_type: DataType,
}

impl InputSpec {
    /// Derive the image input from the model's first input descriptor.
    ///
    /// The channel axis is the one holding 3; width and height are read from
    /// the axes that layout assigns to them.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` if the input is not a 4-D, 3-channel image
    /// with fixed spatial dimensions, or its element type cannot be filled from
    /// RGB bytes.
    pub fn from_descriptor(desc: &TensorDescriptor) -> Result<Self> {
        let unsupported = |why: &str| {
            OverlayError::UnsupportedFormat(format!("model input '{}' ({desc}) {why}", desc.name))
        };

        let [_, d1, d2, d3] = desc.shape[..] else {
            return Err(unsupported("is not a 4-D image tensor"));
        };

        let (layout, height, width) = if d3 == 3 {
            (InputLayout::Nhwc, d1, d2)
        } else if d1 == 3 {
            (InputLayout::Nchw, d2, d3)
        } else {
            return Err(unsupported("does not have 3 channels"));
        };

        let (Ok(width), Ok(height)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(unsupported("has dynamic spatial dimensions"));
        };
        if width == 0 || height == 0 {
            return Err(unsupported("has dynamic spatial dimensions"));
        }

        match desc.data_type {
            DataType::Uint8 | DataType::Int32 | DataType::Float32 => Ok(Self {
                width,
                height,
                layout,
                data_type: desc.data_type.clone(),
            }),
            _ => Err(unsupported("cannot be filled from RGB bytes")),
        }
    }
}

// ================================================================================================
// Engine seam
// ================================================================================================

/// A loaded pose model.
///
/// `run` is synchronous and blocks the calling thread until the model returns.
pub trait InferenceEngine: Send {
    /// Input tensor descriptors, as loaded.
    fn inputs(&self) -> &[TensorDescriptor];

    /// Output tensor descriptors, as loaded.
    fn outputs(&self) -> &[TensorDescriptor];

    /// The image input derived from [`InferenceEngine::inputs`].
    fn input_spec(&self) -> &InputSpec;

    /// Run the model on one resized frame and return its first output flattened.
    ///
    /// # Errors
    ///
    /// * `ShapeMismatch` if `input` does not match [`InferenceEngine::input_spec`].
    /// * `InferenceError` if the runtime fails.
    fn run(&mut self, input: &InputTensor) -> Result<Vec<f32>>;
}

/// Check a resized frame against the model's input before handing it over.
///
/// # Errors
///
/// Returns `ShapeMismatch` on any disagreement in size.
pub fn check_input(spec: &InputSpec, input: &InputTensor) -> Result<()> {
    let expected = spec.width as usize * spec.height as usize * InputTensor::CHANNELS;
    if input.width != spec.width || input.height != spec.height || input.len() != expected {
        return Err(OverlayError::ShapeMismatch(format!(
            "input is {}x{} ({} bytes), model expects {}x{} ({expected} bytes)",
            input.width,
            input.height,
            input.len(),
            spec.width,
            spec.height,
        )));
    }
    Ok(())
}

// ================================================================================================
// ONNX Runtime engine
// ================================================================================================

/// Single-pose model backed by an ONNX Runtime session.
///
/// # Example
///
/// ```no_run
/// use pose_overlay::{OrtEngine, OverlayConfig};
///
/// let engine = OrtEngine::load("movenet_lightning.onnx", &OverlayConfig::default())?;
/// # Ok::<(), pose_overlay::OverlayError>(())
/// ```
pub struct OrtEngine {
    session: Session,
    inputs: Vec<TensorDescriptor>,
    outputs: Vec<TensorDescriptor>,
    spec: InputSpec,
}

impl OrtEngine {
    /// Load a pose model from an ONNX file.
    ///
    /// # Errors
    ///
    /// * `ModelLoadError` if the file is missing or the session cannot be built.
    /// * `FeatureNotEnabled` if the configured device's provider is not compiled in.
    /// * `UnsupportedFormat` if the model's input is not an RGB image tensor.
    pub fn load<P: AsRef<Path>>(path: P, config: &OverlayConfig) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(OverlayError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let builder = Session::builder()
            .map_err(|e| OverlayError::ModelLoadError(format!("Failed to create session builder: {e}")))?;

        let builder = register_device(builder, config.device.unwrap_or_default())?;

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| OverlayError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(config.num_threads)
            .map_err(|e| OverlayError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
            .commit_from_file(path)
            .map_err(|e| OverlayError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let inputs: Vec<TensorDescriptor> = session
            .inputs
            .iter()
            .map(|i| TensorDescriptor::from_value_type(&i.name, &i.input_type))
            .collect();
        let outputs: Vec<TensorDescriptor> = session
            .outputs
            .iter()
            .map(|o| TensorDescriptor::from_value_type(&o.name, &o.output_type))
            .collect();

        let first = inputs
            .first()
            .ok_or_else(|| OverlayError::ModelLoadError("Model has no inputs".to_string()))?;
        let spec = InputSpec::from_descriptor(first)?;

        if outputs.is_empty() {
            return Err(OverlayError::ModelLoadError("Model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            inputs,
            outputs,
            spec,
        })
    }

    /// Lay RGB bytes out in the model's layout and element type.
    fn to_array<T: Copy>(&self, input: &InputTensor, convert: impl Fn(u8) -> T) -> Result<Array4<T>> {
        let (h, w) = (self.spec.height as usize, self.spec.width as usize);
        let values: Vec<T> = input.data().iter().map(|&v| convert(v)).collect();
        let nhwc = Array4::from_shape_vec((1, h, w, InputTensor::CHANNELS), values)
            .map_err(|e| OverlayError::ShapeMismatch(format!("Failed to shape input tensor: {e}")))?;

        Ok(match self.spec.layout {
            InputLayout::Nhwc => nhwc,
            InputLayout::Nchw => nhwc.permuted_axes([0, 3, 1, 2]).as_standard_layout().into_owned(),
        })
    }

    fn run_array<T>(&mut self, input: &Array4<T>) -> Result<Vec<f32>>
    where
        T: PrimitiveTensorElementType + fmt::Debug + Clone + 'static,
    {
        let input_tensor = TensorRef::from_array_view(input)
            .map_err(|e| OverlayError::InferenceError(format!("Failed to create input tensor: {e}")))?;

        let input_name = &self.inputs[0].name;
        let output_name = &self.outputs[0].name;

        let outputs = self
            .session
            .run(ort::inputs![input_name.as_str() => input_tensor])
            .map_err(|e| OverlayError::InferenceError(format!("Inference failed: {e}")))?;

        let output = outputs
            .get(output_name.as_str())
            .ok_or_else(|| OverlayError::InferenceError(format!("Output '{output_name}' not found")))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| OverlayError::MalformedOutput(format!("Failed to extract output: {e}")))?;

        Ok(data.to_vec())
    }
}

impl InferenceEngine for OrtEngine {
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

        match self.spec.data_type {
            DataType::Uint8 => {
                let array = self.to_array(input, |v| v)?;
                self.run_array(&array)
            }
            DataType::Int32 => {
                let array = self.to_array(input, i32::from)?;
                self.run_array(&array)
            }
            _ => {
                let array = self.to_array(input, f32::from)?;
                self.run_array(&array)
            }
        }
    }
}

impl fmt::Debug for OrtEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrtEngine")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Register the execution provider for `device` on the session builder.
#[allow(unused_mut, unused_variables, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn register_device(mut builder: SessionBuilder, device: Device) -> Result<SessionBuilder> {
    #[allow(dead_code)]
    fn ep_error<E: fmt::Display>(device: Device) -> impl Fn(E) -> OverlayError {
        move |e| OverlayError::ModelLoadError(format!("Failed to register {device} EP: {e}"))
    }

    match device {
        Device::Cpu => {}
        #[cfg(feature = "coreml")]
        Device::CoreMl => {
            builder = builder
                .with_execution_providers([CoreMLExecutionProvider::default().with_subgraphs(true).build()])
                .map_err(ep_error(device))?;
        }
        #[cfg(feature = "cuda")]
        Device::Cuda(id) => {
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().with_device_id(id as i32).build()])
                .map_err(ep_error(device))?;
        }
        #[cfg(feature = "tensorrt")]
        Device::TensorRt(id) => {
            builder = builder
                .with_execution_providers([TensorRTExecutionProvider::default().with_device_id(id as i32).build()])
                .map_err(ep_error(device))?;
        }
        #[cfg(feature = "directml")]
        Device::DirectMl(id) => {
            builder = builder
                .with_execution_providers([DirectMLExecutionProvider::default().with_device_id(id as i32).build()])
                .map_err(ep_error(device))?;
        }
        #[cfg(feature = "openvino")]
        Device::OpenVino => {
            builder = builder
                .with_execution_providers([OpenVINOExecutionProvider::default().build()])
                .map_err(ep_error(device))?;
        }
        #[allow(unreachable_patterns)]
        other => {
            return Err(OverlayError::FeatureNotEnabled(format!(
                "device '{other}' requires building with --features {}",
                other.feature().unwrap_or_default()
            )));
        }
    }

    Ok(builder)
}

// ================================================================================================
// Asynchronous loading
// ================================================================================================

/// Loads a model in the background and hands it over once ready.
///
/// The processing thread polls [`ModelLoader::try_take`] at the start of each
/// frame; until it yields an engine, frames pass through without an overlay.
pub struct ModelLoader {
    rx: Option<Receiver<Result<Box<dyn InferenceEngine>>>>,
}

impl ModelLoader {
    /// Start loading an ONNX model on a background thread.
    #[must_use]
    pub fn spawn(path: impl Into<PathBuf>, config: OverlayConfig) -> Self {
        let path = path.into();
        Self::spawn_with(move || {
            let engine = OrtEngine::load(&path, &config)?;
            Ok(Box::new(engine) as Box<dyn InferenceEngine>)
        })
    }

    /// Run an arbitrary loader on a background thread.
    #[must_use]
    pub fn spawn_with<F>(load: F) -> Self
    where
        F: FnOnce() -> Result<Box<dyn InferenceEngine>> + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let spawned = thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                let _ = tx.send(load());
            });

        match spawned {
            Ok(_) => Self { rx: Some(rx) },
            Err(e) => Self::failed(OverlayError::ModelLoadError(format!(
                "Failed to spawn loader thread: {e}"
            ))),
        }
    }

    /// A loader that is already finished.
    #[must_use]
    pub fn ready(engine: Box<dyn InferenceEngine>) -> Self {
        Self::finished(Ok(engine))
    }

    /// A loader that already failed.
    #[must_use]
    pub fn failed(err: OverlayError) -> Self {
        Self::finished(Err(err))
    }

    fn finished(result: Result<Box<dyn InferenceEngine>>) -> Self {
        let (tx, rx) = mpsc::sync_channel(1);
        let _ = tx.send(result);
        Self { rx: Some(rx) }
    }

    /// Take the load result if it arrived. Never blocks.
    ///
    /// Returns `None` while loading and after the result was taken.
    pub fn try_take(&mut self) -> Option<Result<Box<dyn InferenceEngine>>> {
        let rx = self.rx.as_ref()?;
        match rx.try_recv() {
            Ok(result) => {
                self.rx = None;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.rx = None;
                Some(Err(OverlayError::ModelLoadError(
                    "Model loader exited without a result".to_string(),
                )))
            }
        }
    }

    /// Whether a result is still outstanding.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.rx.is_some()
    }
}

impl fmt::Debug for ModelLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelLoader")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Log the model's tensors once after loading.
pub fn log_model(engine: &dyn InferenceEngine) {
    let join = |descs: &[TensorDescriptor]| {
        descs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let spec = engine.input_spec();
    verbose!("Model: {} -> {}", join(engine.inputs()), join(engine.outputs()));
    verbose!("Input: {} {} x {}", spec.data_type, spec.width, spec.height);
}
