//! Best-effort hardware detection. Nothing here fails: an unreadable source
//! simply contributes nothing to the snapshot.

use std::time::Duration;

use tokio::process::Command;

use crate::hardware::{GpuDevice, HardwareSnapshot};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const MIB: u64 = 1024 * 1024;

/// Probe GPUs, RAM, the CPU name and whether memory is unified.
pub async fn detect() -> HardwareSnapshot {
    let (ram, cpu, unified) = tokio::join!(total_ram(), cpu_label(), is_apple_silicon());
    let gpus = if unified { Vec::new() } else { gpus().await };
    let snapshot = HardwareSnapshot::new(gpus, ram, unified, cpu);
    tracing::debug!(
        gpus = snapshot.gpu_count(),
        vram = snapshot.total_vram_bytes(),
        ram = snapshot.total_ram_bytes(),
        unified,
        "hardware probed"
    );
    snapshot
}

async fn run(program: &str, args: &[&str]) -> Option<String> {
    let out = tokio::time::timeout(PROBE_TIMEOUT, Command::new(program).args(args).output())
        .await
        .ok()?
        .ok()?;
    if !out.status.success() {
        tracing::debug!(program, status = %out.status, "probe command failed");
        return None;
    }
    Some(String::from_utf8_lossy(&out.stdout).into_owned())
}

async fn gpus() -> Vec<GpuDevice> {
    if let Some(out) = run("nvidia-smi", &["--query-gpu=name,memory.total", "--format=csv,noheader,nounits"]).await {
        let gpus = parse_nvidia_smi(&out);
        if !gpus.is_empty() {
            return gpus;
        }
    }
    match run("rocm-smi", &["--showmeminfo", "vram", "--csv"]).await {
        Some(out) => parse_rocm_smi(&out),
        None => Vec::new(),
    }
}

async fn total_ram() -> u64 {
    if let Ok(text) = tokio::fs::read_to_string("/proc/meminfo").await {
        if let Some(bytes) = parse_meminfo(&text) {
            return bytes;
        }
    }
    run("sysctl", &["-n", "hw.memsize"])
        .await
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

async fn cpu_label() -> String {
    if let Ok(text) = tokio::fs::read_to_string("/proc/cpuinfo").await {
        if let Some(name) = parse_cpuinfo(&text) {
            return name;
        }
    }
    run("sysctl", &["-n", "machdep.cpu.brand_string"])
        .await
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown CPU".to_string())
}

async fn is_apple_silicon() -> bool {
    if !cfg!(target_os = "macos") {
        return false;
    }
    if cfg!(target_arch = "aarch64") {
        return true;
    }
    // x86_64 binaries under Rosetta still report the host
    run("sysctl", &["-n", "hw.optional.arm64"])
        .await
        .is_some_and(|s| s.trim() == "1")
}

/// `name, memory.total` rows with memory in MiB.
pub fn parse_nvidia_smi(csv: &str) -> Vec<GpuDevice> {
    csv.lines()
        .filter_map(|line| {
            let (name, mib) = line.rsplit_once(',')?;
            let mib: u64 = mib.trim().parse().ok()?;
            Some(GpuDevice {
                name: name.trim().to_string(),
                vram_bytes: mib.saturating_mul(MIB),
            })
        })
        .collect()
}

/// `rocm-smi --showmeminfo vram --csv`: a header naming the columns, then one
/// row per card with the total in bytes.
pub fn parse_rocm_smi(csv: &str) -> Vec<GpuDevice> {
    let mut lines = csv.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let Some(total_col) = header
        .split(',')
        .position(|h| h.contains("Total Memory") && !h.contains("Used"))
    else {
        return Vec::new();
    };
    lines
        .filter_map(|line| {
            let cols: Vec<&str> = line.split(',').collect();
            let bytes: u64 = cols.get(total_col)?.trim().parse().ok()?;
            Some(GpuDevice {
                name: format!("AMD GPU ({})", cols.first()?.trim()),
                vram_bytes: bytes,
            })
        })
        .collect()
}

/// `MemTotal` from /proc/meminfo, in bytes.
pub fn parse_meminfo(text: &str) -> Option<u64> {
    let line = text.lines().find(|l| l.starts_with("MemTotal:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib.saturating_mul(1024))
}

/// The first `model name` in /proc/cpuinfo.
pub fn parse_cpuinfo(text: &str) -> Option<String> {
    text.lines()
        .filter(|l| l.starts_with("model name"))
        .find_map(|l| l.split_once(':'))
        .map(|(_, v)| v.trim().to_string())
        .filter(|s| !s.is_empty())
}
