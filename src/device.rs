// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Execution target selection for pose inference.
use std::fmt;
use std::str::FromStr;

/// Hardware target the model runs on.
///
/// Every variant other than [`Device::Cpu`] maps onto an ONNX Runtime
/// execution provider compiled in through the matching cargo feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    /// Default CPU provider.
    #[default]
    Cpu,
    /// NVIDIA GPU by index.
    Cuda(usize),
    /// Apple Neural Engine / GPU through `CoreML` (`mps` is accepted as an alias).
    CoreMl,
    /// `DirectML` adapter by index (Windows).
    DirectMl(usize),
    /// Intel `OpenVINO`.
    OpenVino,
    /// NVIDIA `TensorRT` by device index.
    TensorRt(usize),
}

impl Device {
    /// Cargo feature that compiles in this device's provider.
    #[must_use]
    pub const fn feature(self) -> Option<&'static str> {
        match self {
            Self::Cpu => None,
            Self::Cuda(_) => Some("cuda"),
            Self::CoreMl => Some("coreml"),
            Self::DirectMl(_) => Some("directml"),
            Self::OpenVino => Some("openvino"),
            Self::TensorRt(_) => Some("tensorrt"),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(i) => write!(f, "cuda:{i}"),
            Self::CoreMl => write!(f, "coreml"),
            Self::DirectMl(i) => write!(f, "directml:{i}"),
            Self::OpenVino => write!(f, "openvino"),
            Self::TensorRt(i) => write!(f, "tensorrt:{i}"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let (name, rest) = s.find(':').map_or((s.as_str(), ""), |i| s.split_at(i));
        let index = || parse_device_index(rest);

        match name {
            "cpu" => Ok(Self::Cpu),
            "coreml" | "mps" => Ok(Self::CoreMl),
            "openvino" => Ok(Self::OpenVino),
            "cuda" => index().map(Self::Cuda),
            "directml" => index().map(Self::DirectMl),
            "tensorrt" => index().map(Self::TensorRt),
            _ => Err(format!("Unknown device: {s}")),
        }
    }
}

/// Parse the `":N"` suffix of a device string. An empty suffix means index 0.
fn parse_device_index(s: &str) -> Result<usize, String> {
    if s.is_empty() {
        return Ok(0);
    }
    s.strip_prefix(':')
        .and_then(|index| index.parse::<usize>().ok())
        .ok_or_else(|| format!("Invalid device index: {s}"))
}
