//! Hardware capability detection.
//!
//! [`DeviceProfiler`] turns raw [`DeviceProbe`] facts into an immutable
//! [`HardwareProfile`]. Probing order: discrete GPU, then integrated accelerator, then
//! CPU-only. Any probe failure yields [`HardwareProfile::conservative`].

pub mod error;
pub mod probe;
pub mod profile;


pub use error::ProbeError;
#[cfg(any(test, feature = "mock"))]
pub use probe::StaticProbe;
pub use probe::{AcceleratorInfo, DeviceProbe, SystemProbe};
pub use profile::{AcceleratorKind, HardwareProfile, Precision};

use candle_core::Device;
use tracing::{info, warn};

/// Produces a [`HardwareProfile`]; never fails.
pub struct DeviceProfiler {
    probe: Box<dyn DeviceProbe>,
}

impl std::fmt::Debug for DeviceProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceProfiler").finish_non_exhaustive()
    }
}

impl DeviceProfiler {
    pub fn new(probe: impl DeviceProbe + 'static) -> Self {
        Self {
            probe: Box::new(probe),
        }
    }

    /// Profiler backed by [`SystemProbe`].
    pub fn system() -> Self {
        Self::new(SystemProbe::new())
    }

    /// Inspects the environment. Idempotent and free of side effects.
    pub fn profile(&self) -> HardwareProfile {
        match self.detect() {
            Ok(profile) => {
                info!(
                    accelerator = %profile.accelerator_kind(),
                    memory_budget_bytes = ?profile.memory_budget_bytes(),
                    precision = ?profile.preferred_precision(),
                    parallelism = profile.parallelism_hint(),
                    "Device detected"
                );
                profile
            }
            Err(e) => {
                warn!(error = %e, "Device detection failed, using conservative profile");
                HardwareProfile::conservative()
            }
        }
    }

    fn detect(&self) -> Result<HardwareProfile, ProbeError> {
        let parallelism = self.probe.parallelism()?;

        if let Some(gpu) = self.probe.discrete_gpu()? {
            info!(name = %gpu.name, "Found discrete GPU");
            return Ok(HardwareProfile::new(
                AcceleratorKind::DiscreteGpu,
                gpu.memory_bytes,
                parallelism,
            ));
        }

        if let Some(accel) = self.probe.integrated_accelerator()? {
            info!(name = %accel.name, "Found integrated accelerator");
            return Ok(HardwareProfile::new(
                AcceleratorKind::IntegratedAccelerator,
                accel.memory_bytes,
                parallelism,
            ));
        }

        Ok(HardwareProfile::new(AcceleratorKind::None, None, parallelism))
    }
}

impl Default for DeviceProfiler {
    fn default() -> Self {
        Self::system()
    }
}

/// Maps a profile to the candle device the scoring model should load on.
///
/// Falls back to CPU when the accelerator cannot be opened.
pub fn select_device(profile: &HardwareProfile) -> Device {
    let opened = match profile.accelerator_kind() {
        AcceleratorKind::DiscreteGpu => Device::new_cuda(0),
        AcceleratorKind::IntegratedAccelerator => Device::new_metal(0),
        AcceleratorKind::None => return Device::Cpu,
    };

    match opened {
        Ok(device) => device,
        Err(e) => {
            warn!(
                accelerator = %profile.accelerator_kind(),
                error = %e,
                "Accelerator unavailable, falling back to CPU device"
            );
            Device::Cpu
        }
    }
}
