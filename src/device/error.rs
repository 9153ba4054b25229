use thiserror::Error;

/// Failures while inspecting the execution environment.
///
/// These never escape [`crate::device::DeviceProfiler::profile`]; they only decide that the
/// conservative default profile is used.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{device} probe failed: {reason}")]
    Backend { device: String, reason: String },

    #[error("failed to query available parallelism: {0}")]
    Parallelism(#[from] std::io::Error),
}
