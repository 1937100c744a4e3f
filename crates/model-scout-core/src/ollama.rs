//! Adapters around the local `ollama` binary.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::catalog::PulledSet;
use crate::error::{Result, ScoutError};

const LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Locate `ollama` on `PATH`.
pub fn find_ollama() -> Option<PathBuf> {
    let exe = if cfg!(windows) { "ollama.exe" } else { "ollama" };
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(exe))
        .find(|p| p.is_file())
}

/// `ollama --version` output, or `None` when the binary is missing or silent.
pub async fn version() -> Option<String> {
    let bin = find_ollama()?;
    let out = tokio::time::timeout(LIST_TIMEOUT, Command::new(bin).arg("--version").output())
        .await
        .ok()?
        .ok()?;
    let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Models already downloaded, as `(base name, tag)` pairs. Empty when the
/// binary is missing or the listing fails.
pub async fn pulled_models() -> PulledSet {
    let Some(bin) = find_ollama() else {
        return PulledSet::new();
    };
    let run = Command::new(bin)
        .arg("list")
        .stdin(Stdio::null())
        .output();
    match tokio::time::timeout(LIST_TIMEOUT, run).await {
        Ok(Ok(out)) if out.status.success() => parse_list(&String::from_utf8_lossy(&out.stdout)),
        Ok(Ok(out)) => {
            tracing::debug!(status = %out.status, "ollama list failed");
            PulledSet::new()
        }
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "could not run ollama list");
            PulledSet::new()
        }
        Err(_) => {
            tracing::debug!("ollama list timed out");
            PulledSet::new()
        }
    }
}

/// Parse `ollama list` output. The first line is a header; the first column
/// of each row is `name:tag`.
pub fn parse_list(stdout: &str) -> PulledSet {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(|id| {
            let (base, tag) = id.split_once(':').unwrap_or((id, "latest"));
            (base.to_lowercase(), tag.to_lowercase())
        })
        .collect()
}

/// Run `ollama pull`, streaming its progress to the terminal.
pub async fn pull_model(model: &str) -> Result<()> {
    let bin = find_ollama().ok_or(ScoutError::OllamaMissing)?;
    let status = Command::new(bin)
        .args(["pull", model])
        .status()
        .await
        .map_err(|e| ScoutError::Io(format!("failed to run ollama pull: {e}")))?;
    if !status.success() {
        return Err(ScoutError::Io(format!("ollama pull {model} exited with {status}")));
    }
    Ok(())
}
