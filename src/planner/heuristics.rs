//! Hardware profile → initial batch size.

use crate::constants::{
    CPU_BATCH, DISCRETE_GPU_HIGH_BATCH, DISCRETE_GPU_LOW_BATCH, DISCRETE_GPU_MID_BATCH,
    HIGH_END_GPU_MEMORY, INTEGRATED_BATCH, MID_RANGE_GPU_MEMORY,
};
use crate::device::{AcceleratorKind, HardwareProfile};

/// Memory class of an accelerator, as used by the heuristic table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryBucket {
    Unknown,
    Low,
    Mid,
    High,
}

impl MemoryBucket {
    pub fn of(memory_budget_bytes: Option<u64>) -> Self {
        match memory_budget_bytes {
            None => Self::Unknown,
            Some(bytes) if bytes >= HIGH_END_GPU_MEMORY => Self::High,
            Some(bytes) if bytes >= MID_RANGE_GPU_MEMORY => Self::Mid,
            Some(_) => Self::Low,
        }
    }
}

/// Lookup table keyed by `(accelerator_kind, memory bucket)`.
pub fn heuristic_batch_size(kind: AcceleratorKind, bucket: MemoryBucket) -> usize {
    match (kind, bucket) {
        (AcceleratorKind::DiscreteGpu, MemoryBucket::High) => DISCRETE_GPU_HIGH_BATCH,
        (AcceleratorKind::DiscreteGpu, MemoryBucket::Mid) => DISCRETE_GPU_MID_BATCH,
        (AcceleratorKind::DiscreteGpu, MemoryBucket::Low | MemoryBucket::Unknown) => {
            DISCRETE_GPU_LOW_BATCH
        }
        (AcceleratorKind::IntegratedAccelerator, _) => INTEGRATED_BATCH,
        (AcceleratorKind::None, _) => CPU_BATCH,
    }
}

/// Initial working batch size for a profile.
pub fn initial_batch_size(profile: &HardwareProfile) -> usize {
    heuristic_batch_size(
        profile.accelerator_kind(),
        MemoryBucket::of(profile.memory_budget_bytes()),
    )
}
