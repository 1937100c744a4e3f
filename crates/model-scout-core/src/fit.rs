use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::hardware::HardwareSnapshot;
use crate::model::{LogicalModel, ModelVariant, UseCase, GIB};

/// How well a model's footprint matches the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FitTier {
    Excellent,
    Good,
    Possible,
    Excluded,
}

impl FitTier {
    /// Sort weight; higher is better.
    pub fn rank(self) -> u8 {
        match self {
            FitTier::Excellent => 3,
            FitTier::Good => 2,
            FitTier::Possible => 1,
            FitTier::Excluded => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FitTier::Excellent => "Excellent",
            FitTier::Good => "Good",
            FitTier::Possible => "Possible",
            FitTier::Excluded => "Excluded",
        }
    }
}

impl fmt::Display for FitTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the weights would live at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunMode {
    Gpu,
    MultiGpu,
    CpuPlusGpu,
    Cpu,
    None,
}

impl RunMode {
    pub fn label(self) -> &'static str {
        match self {
            RunMode::Gpu => "GPU",
            RunMode::MultiGpu => "Multi-GPU",
            RunMode::CpuPlusGpu => "CPU+GPU",
            RunMode::Cpu => "CPU",
            RunMode::None => "N/A",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One variant evaluated against one machine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub variant: ModelVariant,
    pub use_cases: BTreeSet<UseCase>,
    pub tier: FitTier,
    pub mode: RunMode,
    pub score: f64,
    pub note: String,
}

/// Added to the score of a variant that is already downloaded.
pub const PULLED_BONUS: f64 = 10.0;

/// Score numerator: a 1 GiB model scores this much before the pulled bonus.
const SIZE_SCORE_SCALE: f64 = 100.0;

/// Floor on the size used for scoring so tiny models stay finite.
const MIN_SCORED_GIB: f64 = 0.1;

/// Memory available to a rule, precomputed once per classification.
struct Capacity {
    best_vram: u64,
    total_vram: u64,
    ram: u64,
}

struct FitRule {
    tier: FitTier,
    mode: RunMode,
    applies: fn(&Capacity, u64) -> bool,
}

/// Evaluated top to bottom; the first rule that applies wins. Anything left
/// over is `Excluded`.
const RULES: &[FitRule] = &[
    FitRule {
        tier: FitTier::Excellent,
        mode: RunMode::Gpu,
        applies: fits_one_gpu,
    },
    FitRule {
        tier: FitTier::Excellent,
        mode: RunMode::MultiGpu,
        applies: fits_all_gpus,
    },
    FitRule {
        tier: FitTier::Good,
        mode: RunMode::CpuPlusGpu,
        applies: fits_with_offload,
    },
    FitRule {
        tier: FitTier::Possible,
        mode: RunMode::Cpu,
        applies: fits_in_ram,
    },
];

fn fits_one_gpu(c: &Capacity, size: u64) -> bool {
    c.best_vram > 0 && c.best_vram >= size
}

fn fits_all_gpus(c: &Capacity, size: u64) -> bool {
    c.total_vram > 0 && c.total_vram >= size
}

fn fits_with_offload(c: &Capacity, size: u64) -> bool {
    c.total_vram > 0 && c.total_vram.saturating_add(c.ram) >= size
}

fn fits_in_ram(c: &Capacity, size: u64) -> bool {
    c.ram >= size
}

/// Classify one variant against the machine.
pub fn classify(variant: &ModelVariant, hw: &HardwareSnapshot) -> Candidate {
    let use_cases = UseCase::infer(&variant.base_name);
    let Some(size) = variant.size_bytes else {
        return Candidate {
            variant: variant.clone(),
            use_cases,
            tier: FitTier::Excluded,
            mode: RunMode::None,
            score: 0.0,
            note: "Size unknown".to_string(),
        };
    };

    let cap = Capacity {
        best_vram: hw.best_vram_bytes(),
        total_vram: hw.total_vram_bytes(),
        ram: hw.total_ram_bytes(),
    };

    let (tier, mode) = RULES
        .iter()
        .find(|r| (r.applies)(&cap, size))
        .map(|r| (r.tier, r.mode))
        .unwrap_or((FitTier::Excluded, RunMode::None));

    let score = if tier == FitTier::Excluded {
        0.0
    } else {
        let gib = (size as f64 / GIB as f64).max(MIN_SCORED_GIB);
        let bonus = if variant.is_pulled { PULLED_BONUS } else { 0.0 };
        SIZE_SCORE_SCALE / gib + bonus
    };

    Candidate {
        variant: variant.clone(),
        use_cases,
        tier,
        mode,
        score,
        note: note_for(mode, size, &cap, hw),
    }
}

fn note_for(mode: RunMode, size: u64, cap: &Capacity, hw: &HardwareSnapshot) -> String {
    let gb = |b: u64| b as f64 / GIB as f64;
    match mode {
        RunMode::Gpu if hw.is_unified_memory() => {
            format!("Fits in unified memory ({:.0} GB total)", gb(cap.ram))
        }
        RunMode::Gpu => format!("Fits fully in VRAM ({:.1} GB)", gb(cap.best_vram)),
        RunMode::MultiGpu => format!(
            "Split across {} GPUs ({:.1} GB combined)",
            hw.gpu_count(),
            gb(cap.total_vram)
        ),
        RunMode::CpuPlusGpu => {
            format!("~{:.1} GB offloaded to RAM", gb(size.saturating_sub(cap.total_vram)))
        }
        RunMode::Cpu => "CPU-only (slow, consider a smaller model)".to_string(),
        RunMode::None => format!(
            "Needs ~{:.1} GB, available: {:.1} GB VRAM / {:.1} GB RAM",
            gb(size),
            gb(cap.total_vram),
            gb(cap.ram)
        ),
    }
}

/// Classify every variant of every model and keep the best fitting variant
/// of each: highest tier, then highest score. Models with nothing that fits
/// are left out.
pub fn best_per_model(models: &[LogicalModel], hw: &HardwareSnapshot) -> Vec<Candidate> {
    models
        .iter()
        .filter_map(|m| {
            m.variants
                .iter()
                .map(|v| classify(v, hw))
                .filter(|c| c.tier != FitTier::Excluded)
                .max_by(|a, b| {
                    a.tier
                        .rank()
                        .cmp(&b.tier.rank())
                        .then(a.score.total_cmp(&b.score))
                })
        })
        .collect()
}
