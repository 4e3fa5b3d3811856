//! KL annealing configuration.
//!
//! Serialised as JSON next to a training run. Every field has a default so a
//! minimal `{}` JSON produces a working linear schedule.

use serde::{Deserialize, Serialize};

/// Hyper-parameters of a KL annealing schedule.
///
/// `shape` is kept as the raw name: it is only resolved when the schedule is
/// built, and a disabled schedule never resolves it at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnealConfig {
    /// Number of steps until the KL term reaches full weight.
    #[serde(default = "default_total_steps")]
    pub total_steps: usize,
    /// Ramp shape: `linear`, `cosine`, `logistic` or `none`.
    #[serde(default = "default_shape")]
    pub shape: String,
    /// Floor of the annealed weight in \[0, 1\]. Ignored by `none`.
    #[serde(default)]
    pub baseline: f64,
    /// Force full KL weight (shape `none`, baseline 0) regardless of `shape`.
    #[serde(default)]
    pub disable: bool,
    /// Divisor applied to the logistic exponent. Larger values flatten the
    /// ramp; `total_steps / 10` is the usual choice. Only read by `logistic`.
    #[serde(default)]
    pub logistic_smoothness: Option<f64>,
}

// ── Default value functions ─────────────────────────────────────────────────

fn default_total_steps() -> usize {
    10_000
}
fn default_shape() -> String {
    "linear".to_string()
}

// ── Impl ────────────────────────────────────────────────────────────────────

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            total_steps: default_total_steps(),
            shape: default_shape(),
            baseline: 0.0,
            disable: false,
            logistic_smoothness: None,
        }
    }
}

impl AnnealConfig {
    /// Save config to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load config from a JSON file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise write the default config there.
    pub fn load_or_create(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let default = Self::default();
            default.save(path)?;
            Ok(default)
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
