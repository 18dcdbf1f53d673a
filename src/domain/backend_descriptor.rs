use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cpu,
    Gpu,
}

impl ComputeDevice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputeDevice::Cpu => "cpu",
            ComputeDevice::Gpu => "gpu",
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only metadata a backend exposes for introspection.
///
/// Fixed when the backend is constructed and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendDescriptor {
    model_identifier: String,
    device: ComputeDevice,
    compute_precision: String,
}

impl BackendDescriptor {
    pub fn new(
        model_identifier: impl Into<String>,
        device: ComputeDevice,
        compute_precision: impl Into<String>,
    ) -> Self {
        Self {
            model_identifier: model_identifier.into(),
            device,
            compute_precision: compute_precision.into(),
        }
    }

    pub fn model_identifier(&self) -> &str {
        &self.model_identifier
    }

    pub fn device(&self) -> ComputeDevice {
        self.device
    }

    pub fn compute_precision(&self) -> &str {
        &self.compute_precision
    }

    pub fn gpu_enabled(&self) -> bool {
        self.device == ComputeDevice::Gpu
    }
}
