use std::str::FromStr;

/// Accelerator preference supplied at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Device {
    /// Platform-preferred accelerator with CPU fallback.
    #[default]
    Auto,
    /// Force CPU execution.
    Cpu,
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Device::Auto),
            "cpu" => Ok(Device::Cpu),
            other => Err(format!("unknown device {other:?} (expected auto or cpu)")),
        }
    }
}

/// Return the ONNX execution providers to register for a device choice.
///
/// An empty list means ONNX Runtime's CPU provider.
pub fn execution_providers(
    device: Device,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    match device {
        Device::Cpu => vec![],
        Device::Auto => preferred_execution_providers(),
    }
}

/// Platform-preferred providers; ort falls back to CPU if unavailable.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
