use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;

use crate::error::{Result, ScoutError};
use crate::ollama::find_ollama;

const BENCH_PROMPT: &str = "Write a short paragraph about the history of computing.";

/// Measures generation speed for a pulled model.
#[async_trait]
pub trait BenchmarkRunner: Send + Sync {
    async fn tokens_per_sec(&self, model_id: &str) -> Result<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    Fast,
    Moderate,
    Slow,
}

impl Rating {
    pub fn from_tps(tps: f64) -> Self {
        if tps >= 60.0 {
            Rating::Fast
        } else if tps >= 25.0 {
            Rating::Moderate
        } else {
            Rating::Slow
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Fast => write!(f, "Fast"),
            Rating::Moderate => write!(f, "Moderate"),
            Rating::Slow => write!(f, "Slow"),
        }
    }
}

/// One benchmark outcome. `tokens_per_sec` is `None` when nothing could be
/// measured; there is no estimated fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub model_id: String,
    pub tokens_per_sec: Option<f64>,
}

impl Measurement {
    pub fn rating(&self) -> Option<Rating> {
        self.tokens_per_sec.map(Rating::from_tps)
    }
}

/// Measure each model in turn. Failures become unavailable measurements.
pub async fn measure_all<R: BenchmarkRunner + ?Sized>(runner: &R, model_ids: &[String]) -> Vec<Measurement> {
    let mut out = Vec::with_capacity(model_ids.len());
    for id in model_ids {
        let tokens_per_sec = match runner.tokens_per_sec(id).await {
            Ok(tps) if tps.is_finite() && tps > 0.0 => Some(tps),
            Ok(tps) => {
                tracing::debug!(model = %id, tps, "discarding implausible benchmark result");
                None
            }
            Err(e) => {
                tracing::debug!(model = %id, error = %e, "benchmark unavailable");
                None
            }
        };
        out.push(Measurement {
            model_id: id.clone(),
            tokens_per_sec,
        });
    }
    out
}

/// Runs `ollama run --verbose` and reads the reported eval rate.
pub struct OllamaBenchmark {
    timeout: Duration,
}

impl OllamaBenchmark {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for OllamaBenchmark {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

#[async_trait]
impl BenchmarkRunner for OllamaBenchmark {
    async fn tokens_per_sec(&self, model_id: &str) -> Result<f64> {
        let bin = find_ollama().ok_or(ScoutError::OllamaMissing)?;
        let run = Command::new(bin)
            .args(["run", model_id, "--verbose", BENCH_PROMPT])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        let out = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| ScoutError::Benchmark(format!("{model_id} timed out")))?
            .map_err(|e| ScoutError::Benchmark(e.to_string()))?;
        if !out.status.success() {
            return Err(ScoutError::Benchmark(format!("{model_id} exited with {}", out.status)));
        }
        // --verbose statistics go to stderr
        let stats = String::from_utf8_lossy(&out.stderr);
        parse_eval_rate(&stats)
            .ok_or_else(|| ScoutError::Benchmark(format!("no eval rate reported for {model_id}")))
    }
}

/// Find `eval rate: N tokens/s`, skipping the `prompt eval rate` line.
pub fn parse_eval_rate(stats: &str) -> Option<f64> {
    stats.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("eval rate:")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<(&'static str, Result<f64>)>);

    #[async_trait]
    impl BenchmarkRunner for Fixed {
        async fn tokens_per_sec(&self, model_id: &str) -> Result<f64> {
            match self.0.iter().find(|(id, _)| *id == model_id) {
                Some((_, Ok(v))) => Ok(*v),
                _ => Err(ScoutError::Benchmark("boom".into())),
            }
        }
    }

    #[test]
    fn eval_rate_ignores_prompt_rate() {
        let stats = "total duration:       3.2s\n\
                     prompt eval rate:     310.55 tokens/s\n\
                     eval count:           120 token(s)\n\
                     eval rate:            42.17 tokens/s\n";
        assert_eq!(parse_eval_rate(stats), Some(42.17));
        assert_eq!(parse_eval_rate("nothing here"), None);
    }

    #[test]
    fn ratings() {
        assert_eq!(Rating::from_tps(80.0), Rating::Fast);
        assert_eq!(Rating::from_tps(60.0), Rating::Fast);
        assert_eq!(Rating::from_tps(30.0), Rating::Moderate);
        assert_eq!(Rating::from_tps(8.0), Rating::Slow);
    }

    #[tokio::test]
    async fn failures_become_unavailable() {
        let runner = Fixed(vec![("ok:7b", Ok(50.0)), ("zero:1b", Ok(0.0))]);
        let ids = vec!["ok:7b".to_string(), "bad:3b".to_string(), "zero:1b".to_string()];
        let results = measure_all(&runner, &ids).await;
        assert_eq!(results[0].tokens_per_sec, Some(50.0));
        assert_eq!(results[0].rating(), Some(Rating::Moderate));
        assert_eq!(results[1].tokens_per_sec, None);
        assert_eq!(results[1].rating(), None);
        assert_eq!(results[2].tokens_per_sec, None);
    }
}
