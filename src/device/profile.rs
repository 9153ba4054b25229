use serde::{Deserialize, Serialize};
use std::fmt;

/// Accelerator class found on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceleratorKind {
    /// CPU-only execution.
    None,
    /// Dedicated GPU with its own memory (CUDA).
    DiscreteGpu,
    /// Integrated accelerator sharing host memory (Metal / Apple Silicon).
    IntegratedAccelerator,
}

impl AcceleratorKind {
    #[inline]
    pub fn is_accelerated(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::DiscreteGpu => "discrete_gpu",
            Self::IntegratedAccelerator => "integrated_accelerator",
        }
    }
}

impl fmt::Display for AcceleratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric precision the scoring model should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    Full,
    Half,
}

/// Static description of the execution environment.
///
/// Created once per engine by [`crate::device::DeviceProfiler`] and shared read-only
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProfile {
    accelerator_kind: AcceleratorKind,
    memory_budget_bytes: Option<u64>,
    preferred_precision: Precision,
    parallelism_hint: usize,
}

impl HardwareProfile {
    /// Builds a profile; precision is half on accelerators and full on CPU.
    ///
    /// `parallelism_hint` is clamped to at least 1.
    pub fn new(
        accelerator_kind: AcceleratorKind,
        memory_budget_bytes: Option<u64>,
        parallelism_hint: usize,
    ) -> Self {
        let preferred_precision = if accelerator_kind.is_accelerated() {
            Precision::Half
        } else {
            Precision::Full
        };

        Self {
            accelerator_kind,
            memory_budget_bytes,
            preferred_precision,
            parallelism_hint: parallelism_hint.max(1),
        }
    }

    /// The profile used whenever detection fails.
    pub const fn conservative() -> Self {
        Self {
            accelerator_kind: AcceleratorKind::None,
            memory_budget_bytes: None,
            preferred_precision: Precision::Full,
            parallelism_hint: 1,
        }
    }

    /// Overrides the precision derived by [`HardwareProfile::new`].
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.preferred_precision = precision;
        self
    }

    #[inline]
    pub fn accelerator_kind(&self) -> AcceleratorKind {
        self.accelerator_kind
    }

    /// Advertised accelerator memory, `None` when it could not be queried.
    #[inline]
    pub fn memory_budget_bytes(&self) -> Option<u64> {
        self.memory_budget_bytes
    }

    #[inline]
    pub fn preferred_precision(&self) -> Precision {
        self.preferred_precision
    }

    #[inline]
    pub fn parallelism_hint(&self) -> usize {
        self.parallelism_hint
    }
}

impl Default for HardwareProfile {
    fn default() -> Self {
        Self::conservative()
    }
}
