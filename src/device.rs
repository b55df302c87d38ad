//! Execution device selection.

use crate::config::DevicePreference;
use std::fmt;
use tracing::warn;

/// Where the provider should execute the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// GPU backend compiled into this build (Metal or CUDA).
    Accelerated,
    /// CPU execution, available everywhere.
    Portable,
}

impl Device {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accelerated => "accelerated",
            Self::Portable => "portable",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether this build carries a hardware-accelerated backend.
pub fn accelerator_available() -> bool {
    cfg!(any(feature = "metal", feature = "cuda"))
}

/// Pick the accelerated device when available, else the portable one.
pub fn probe() -> Device {
    probe_with(accelerator_available())
}

fn probe_with(available: bool) -> Device {
    if available {
        Device::Accelerated
    } else {
        Device::Portable
    }
}

/// Resolve a configured preference against what this build supports.
pub fn resolve(preference: DevicePreference) -> Device {
    resolve_with(preference, accelerator_available())
}

fn resolve_with(preference: DevicePreference, available: bool) -> Device {
    match preference {
        DevicePreference::Auto => probe_with(available),
        DevicePreference::Portable => Device::Portable,
        DevicePreference::Accelerated if available => Device::Accelerated,
        DevicePreference::Accelerated => {
            warn!("accelerated device requested but this build has no GPU backend; using CPU");
            Device::Portable
        }
    }
}
