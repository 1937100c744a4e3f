use serde::{Deserialize, Serialize};

use crate::model::GIB;

/// Memory held back from the shared pool on unified-memory machines for the
/// OS and running applications.
pub const UNIFIED_MEMORY_RESERVE: u64 = 4 * GIB;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuDevice {
    pub name: String,
    pub vram_bytes: u64,
}

/// What this machine can hold in memory. Built once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareSnapshot {
    gpus: Vec<GpuDevice>,
    total_ram_bytes: u64,
    is_unified_memory: bool,
    cpu_label: String,
}

impl HardwareSnapshot {
    /// Build a snapshot. On unified-memory machines the probed GPU list is
    /// replaced by one virtual device sized to RAM minus the reserve.
    pub fn new(
        gpus: Vec<GpuDevice>,
        total_ram_bytes: u64,
        is_unified_memory: bool,
        cpu_label: impl Into<String>,
    ) -> Self {
        let cpu_label = cpu_label.into();
        let gpus = if is_unified_memory {
            vec![GpuDevice {
                name: format!("{cpu_label} (Unified Memory)"),
                vram_bytes: total_ram_bytes.saturating_sub(UNIFIED_MEMORY_RESERVE),
            }]
        } else {
            gpus
        };
        Self {
            gpus,
            total_ram_bytes,
            is_unified_memory,
            cpu_label,
        }
    }

    /// A machine with no usable GPU, used when probing fails.
    pub fn cpu_only(total_ram_bytes: u64, cpu_label: impl Into<String>) -> Self {
        Self::new(Vec::new(), total_ram_bytes, false, cpu_label)
    }

    pub fn gpus(&self) -> &[GpuDevice] {
        &self.gpus
    }

    pub fn gpu_count(&self) -> usize {
        self.gpus.len()
    }

    pub fn total_ram_bytes(&self) -> u64 {
        self.total_ram_bytes
    }

    pub fn is_unified_memory(&self) -> bool {
        self.is_unified_memory
    }

    pub fn cpu_label(&self) -> &str {
        &self.cpu_label
    }

    /// Largest single device.
    pub fn best_vram_bytes(&self) -> u64 {
        self.gpus.iter().map(|g| g.vram_bytes).max().unwrap_or(0)
    }

    /// Sum across devices.
    pub fn total_vram_bytes(&self) -> u64 {
        self.gpus.iter().fold(0u64, |acc, g| acc.saturating_add(g.vram_bytes))
    }

    pub fn has_gpu(&self) -> bool {
        self.total_vram_bytes() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unified_memory_synthesizes_one_virtual_gpu() {
        let hw = HardwareSnapshot::new(
            vec![GpuDevice { name: "ignored".into(), vram_bytes: 1 }],
            32 * GIB,
            true,
            "Apple M3 Max",
        );
        assert_eq!(hw.gpu_count(), 1);
        assert_eq!(hw.best_vram_bytes(), 28 * GIB);
        assert_eq!(hw.gpus()[0].name, "Apple M3 Max (Unified Memory)");
    }

    #[test]
    fn unified_reserve_saturates() {
        let hw = HardwareSnapshot::new(vec![], 2 * GIB, true, "tiny");
        assert_eq!(hw.best_vram_bytes(), 0);
        assert!(!hw.has_gpu());
    }

    #[test]
    fn total_vram_saturates() {
        let big = GpuDevice { name: "a".into(), vram_bytes: u64::MAX };
        let hw = HardwareSnapshot::new(vec![big.clone(), big], GIB, false, "cpu");
        assert_eq!(hw.total_vram_bytes(), u64::MAX);
    }

    #[test]
    fn vram_aggregates() {
        let hw = HardwareSnapshot::new(
            vec![
                GpuDevice { name: "a".into(), vram_bytes: 8 * GIB },
                GpuDevice { name: "b".into(), vram_bytes: 12 * GIB },
            ],
            64 * GIB,
            false,
            "x86",
        );
        assert_eq!(hw.best_vram_bytes(), 12 * GIB);
        assert_eq!(hw.total_vram_bytes(), 20 * GIB);
    }
}
