use std::process::Command;
use tracing::debug;

#[cfg(any(feature = "metal", feature = "cuda"))]
use candle_core::Device;

use super::error::ProbeError;

/// An accelerator found by a [`DeviceProbe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceleratorInfo {
    pub name: String,
    /// Advertised memory capacity, if the driver exposes it.
    pub memory_bytes: Option<u64>,
}

impl AcceleratorInfo {
    pub fn new(name: impl Into<String>, memory_bytes: Option<u64>) -> Self {
        Self {
            name: name.into(),
            memory_bytes,
        }
    }
}

/// Source of raw environment facts for [`super::DeviceProfiler`].
///
/// Implementations must be side-effect free so profiling can be repeated.
pub trait DeviceProbe: Send + Sync {
    /// `Ok(None)` when no discrete GPU is usable.
    fn discrete_gpu(&self) -> Result<Option<AcceleratorInfo>, ProbeError>;

    /// `Ok(None)` when no integrated accelerator is usable.
    fn integrated_accelerator(&self) -> Result<Option<AcceleratorInfo>, ProbeError>;

    fn parallelism(&self) -> Result<usize, ProbeError>;
}

/// Probes the real host through candle's compiled backends.
///
/// CUDA is only considered with the `cuda` feature and Metal with the `metal` feature;
/// a GPU the scoring model cannot run on is treated as absent.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl SystemProbe {
    pub fn new() -> Self {
        Self
    }
}

impl DeviceProbe for SystemProbe {
    fn discrete_gpu(&self) -> Result<Option<AcceleratorInfo>, ProbeError> {
        #[cfg(feature = "cuda")]
        {
            return Ok(opened_accelerator("cuda", Device::new_cuda(0), || {
                AcceleratorInfo::new("cuda:0", query_nvidia_memory())
            }));
        }

        #[cfg(not(feature = "cuda"))]
        {
            debug!("CUDA backend not compiled");
            Ok(None)
        }
    }

    fn integrated_accelerator(&self) -> Result<Option<AcceleratorInfo>, ProbeError> {
        #[cfg(feature = "metal")]
        {
            return Ok(opened_accelerator("metal", Device::new_metal(0), || {
                AcceleratorInfo::new("metal:0", unified_memory_bytes())
            }));
        }

        #[cfg(not(feature = "metal"))]
        {
            debug!("Metal backend not compiled");
            Ok(None)
        }
    }

    fn parallelism(&self) -> Result<usize, ProbeError> {
        Ok(std::thread::available_parallelism()?.get())
    }
}

/// Maps a device-open attempt to a detection result.
///
/// A device that fails to open (no hardware, driver mismatch) is absent, not an error,
/// so detection can continue with the next tier.
pub fn opened_accelerator(
    device: &str,
    opened: candle_core::Result<candle_core::Device>,
    info: impl FnOnce() -> AcceleratorInfo,
) -> Option<AcceleratorInfo> {
    match opened {
        Ok(_) => Some(info()),
        Err(e) => {
            debug!(device, error = %e, "Accelerator unavailable");
            None
        }
    }
}

/// Total memory of the first NVIDIA GPU as reported by `nvidia-smi` (MiB → bytes).
pub fn query_nvidia_memory() -> Option<u64> {
    let output = Command::new("nvidia-smi")
        .arg("--query-gpu=memory.total")
        .arg("--format=csv,noheader,nounits")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    parse_nvidia_memory(&String::from_utf8_lossy(&output.stdout))
}

/// Parses the first line of `nvidia-smi --query-gpu=memory.total` output in MiB.
pub fn parse_nvidia_memory(stdout: &str) -> Option<u64> {
    let mib: u64 = stdout.lines().next()?.trim().parse().ok()?;
    if mib == 0 {
        return None;
    }
    mib.checked_mul(1024 * 1024)
}

/// Host memory, which an integrated accelerator shares.
pub fn unified_memory_bytes() -> Option<u64> {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    match sys.total_memory() {
        0 => None,
        total => Some(total),
    }
}

/// A probe with fixed answers, for tests and reproducible profiling.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub discrete: Option<AcceleratorInfo>,
    pub integrated: Option<AcceleratorInfo>,
    pub parallelism: usize,
    pub fail_discrete: bool,
    pub fail_integrated: bool,
    /// Report a discrete GPU whose device cannot be opened.
    pub unopenable_discrete: bool,
}

#[cfg(any(test, feature = "mock"))]
impl StaticProbe {
    pub fn cpu(parallelism: usize) -> Self {
        Self {
            parallelism,
            ..Default::default()
        }
    }

    pub fn discrete(memory_bytes: Option<u64>, parallelism: usize) -> Self {
        Self {
            discrete: Some(AcceleratorInfo::new("mock-gpu", memory_bytes)),
            parallelism,
            ..Default::default()
        }
    }

    pub fn integrated(memory_bytes: Option<u64>, parallelism: usize) -> Self {
        Self {
            integrated: Some(AcceleratorInfo::new("mock-igpu", memory_bytes)),
            parallelism,
            ..Default::default()
        }
    }
}

#[cfg(any(test, feature = "mock"))]
impl DeviceProbe for StaticProbe {
    fn discrete_gpu(&self) -> Result<Option<AcceleratorInfo>, ProbeError> {
        if self.fail_discrete {
            return Err(ProbeError::Backend {
                device: "mock-gpu".to_string(),
                reason: "driver mismatch".to_string(),
            });
        }
        if self.unopenable_discrete {
            let opened = Err(candle_core::Error::Msg("no CUDA-capable device".to_string()));
            return Ok(opened_accelerator("mock-gpu", opened, || {
                AcceleratorInfo::new("mock-gpu", None)
            }));
        }
        Ok(self.discrete.clone())
    }

    fn integrated_accelerator(&self) -> Result<Option<AcceleratorInfo>, ProbeError> {
        if self.fail_integrated {
            return Err(ProbeError::Backend {
                device: "mock-igpu".to_string(),
                reason: "not supported".to_string(),
            });
        }
        Ok(self.integrated.clone())
    }

    fn parallelism(&self) -> Result<usize, ProbeError> {
        Ok(self.parallelism)
    }
}
