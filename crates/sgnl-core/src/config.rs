//! Process-wide gate configuration.
//!
//! Every knob is read once at startup. Each value is looked up as
//! `SGNL_<NAME>` first, then under the legacy unprefixed name where one
//! exists (e.g. `DENSITY_THRESHOLD`), then falls back to the default.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Per-channel weights for the combined density. They do not have to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityWeights {
    pub idea: f64,
    pub dependency: f64,
    pub readability: f64,
}

impl Default for DensityWeights {
    fn default() -> Self {
        Self {
            idea: 0.5,
            dependency: 0.3,
            readability: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Combined density below this skips the expensive analysis step.
    pub density_threshold: f64,
    pub weights: DensityWeights,
    /// Max characters of canonical text handed to the analysis step.
    pub max_content_chars: usize,
    /// Max characters the density metrics look at when depth is not forced.
    pub quick_scan_chars: usize,
    pub fetch_timeout_ms: u64,
    pub heuristic_fetch_timeout_ms: u64,
    pub batch_fetch_timeout_ms: u64,
    pub max_bytes: u64,
    pub batch_concurrency: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            density_threshold: 0.45,
            weights: DensityWeights::default(),
            max_content_chars: 12_000,
            quick_scan_chars: 50_000,
            fetch_timeout_ms: 30_000,
            heuristic_fetch_timeout_ms: 30_000,
            batch_fetch_timeout_ms: 15_000,
            max_bytes: 5_000_000,
            batch_concurrency: 4,
        }
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn lookup(name: &str, legacy: Option<&str>) -> Option<(String, String)> {
    let prefixed = format!("SGNL_{name}");
    if let Some(v) = env(&prefixed) {
        return Some((prefixed, v));
    }
    let legacy = legacy?;
    env(legacy).map(|v| (legacy.to_string(), v))
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| Error::Config(format!("{key}={raw:?} is not a valid value")))
}

fn parsed<T: std::str::FromStr>(name: &str, legacy: Option<&str>, default: T) -> T {
    match lookup(name, legacy) {
        Some((key, raw)) => match parse_value(&key, &raw) {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "sgnl::config", error = %e, "using default");
                default
            }
        },
        None => default,
    }
}

impl GateConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            density_threshold: parsed(
                "DENSITY_THRESHOLD",
                Some("DENSITY_THRESHOLD"),
                d.density_threshold,
            ),
            weights: DensityWeights {
                idea: parsed("CPIDR_WEIGHT", Some("CPIDR_WEIGHT"), d.weights.idea),
                dependency: parsed("DEPID_WEIGHT", Some("DEPID_WEIGHT"), d.weights.dependency),
                readability: parsed(
                    "READABILITY_WEIGHT",
                    Some("READABILITY_WEIGHT"),
                    d.weights.readability,
                ),
            },
            max_content_chars: parsed("LLM_MAX_CHARS", Some("LLM_MAX_CHARS"), d.max_content_chars),
            quick_scan_chars: parsed("QUICK_SCAN_CHARS", None, d.quick_scan_chars),
            fetch_timeout_ms: parsed("FETCH_TIMEOUT_MS", None, d.fetch_timeout_ms),
            heuristic_fetch_timeout_ms: parsed(
                "HEURISTIC_FETCH_TIMEOUT_MS",
                None,
                d.heuristic_fetch_timeout_ms,
            ),
            batch_fetch_timeout_ms: parsed("BATCH_FETCH_TIMEOUT_MS", None, d.batch_fetch_timeout_ms),
            max_bytes: parsed("MAX_BYTES", None, d.max_bytes),
            batch_concurrency: parsed("BATCH_CONCURRENCY", None, d.batch_concurrency).max(1),
        }
    }

    /// Whether an estimator family is switched on (`SGNL_<NAME>=off` disables it).
    pub fn estimator_enabled(name: &str) -> bool {
        !matches!(
            env(&format!("SGNL_{name}"))
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "0" | "off" | "false" | "no"
        )
    }
}
