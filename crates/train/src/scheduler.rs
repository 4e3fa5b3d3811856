//! KL annealing schedule.
//!
//! An [`Annealer`] maps training progress to a weight in \[0, 1\] that scales
//! the KL term of a VAE objective. One instance is owned by the training loop
//! and advanced exactly once per optimiser step.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use candle_core::Tensor;
use vae_common::{AnnealConfig, AnnealError, Result};

// ── Shape ───────────────────────────────────────────────────────────────────

/// Ramp shape of the annealing weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnnealShape {
    /// `s / T`.
    Linear,
    /// Half-cosine ramp from 0 to 1.
    Cosine,
    /// Sigmoid centred on `T / 2`. `smoothness` divides the exponent;
    /// `None` means a divisor of 1 (steep ramp).
    Logistic { smoothness: Option<f64> },
    /// Constant full weight. Keeps the call interface when annealing is off.
    None,
}

impl AnnealShape {
    /// Logistic ramp whose exponent is divided by `total_steps / 10`.
    pub fn smooth_logistic(total_steps: usize) -> Self {
        Self::Logistic {
            smoothness: Some(total_steps as f64 / 10.0),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Cosine => "cosine",
            Self::Logistic { .. } => "logistic",
            Self::None => "none",
        }
    }

    /// Raw (baseline-free) weight at `progress = step / total`.
    fn raw(&self, step: f64, total: f64) -> f64 {
        match *self {
            Self::Linear => step / total,
            Self::Cosine => ((PI * (step / total - 1.0)).cos() + 1.0) / 2.0,
            Self::Logistic { smoothness } => {
                let exponent = (total / 2.0 - step) / smoothness.unwrap_or(1.0);
                1.0 / (1.0 + exponent.exp())
            }
            Self::None => 1.0,
        }
    }
}

impl FromStr for AnnealShape {
    type Err = AnnealError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(Self::Linear),
            "cosine" => Ok(Self::Cosine),
            "logistic" => Ok(Self::Logistic { smoothness: None }),
            "none" => Ok(Self::None),
            other => Err(AnnealError::invalid(format!(
                "unsupported annealing shape '{other}' (expected linear, cosine, logistic or none)"
            ))),
        }
    }
}

impl fmt::Display for AnnealShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Annealer ────────────────────────────────────────────────────────────────

/// Stateful KL weight schedule.
///
/// `current_step` starts at 0, grows by one per [`Annealer::advance`] and
/// saturates at `total_steps`.
#[derive(Clone, Debug)]
pub struct Annealer {
    total_steps: usize,
    current_step: usize,
    shape: AnnealShape,
    baseline: f64,
}

impl Annealer {
    /// * `total_steps` — steps until full weight (must be > 0).
    /// * `baseline` — floor of the weight in \[0, 1\].
    /// * `disable` — force shape `None` and baseline 0 whatever was requested.
    pub fn new(
        total_steps: usize,
        shape: AnnealShape,
        baseline: f64,
        disable: bool,
    ) -> Result<Self> {
        let (shape, baseline) = if disable {
            (AnnealShape::None, 0.0)
        } else {
            (shape, baseline)
        };

        if total_steps == 0 {
            return Err(AnnealError::invalid("total_steps must be > 0"));
        }
        if !baseline.is_finite() || !(0.0..=1.0).contains(&baseline) {
            return Err(AnnealError::invalid(format!(
                "baseline must be in [0, 1], got {baseline}"
            )));
        }
        if let AnnealShape::Logistic {
            smoothness: Some(d),
        } = shape
        {
            if !d.is_finite() || d <= 0.0 {
                return Err(AnnealError::invalid(format!(
                    "logistic smoothness must be finite and > 0, got {d}"
                )));
            }
        }

        tracing::info!(total_steps, shape = %shape, baseline, disable, "KL annealer");
        Ok(Self {
            total_steps,
            current_step: 0,
            shape,
            baseline,
        })
    }

    /// Build from a JSON-level config. The shape name is only resolved when
    /// the schedule is enabled.
    pub fn from_config(config: &AnnealConfig) -> Result<Self> {
        if config.disable {
            return Self::new(config.total_steps, AnnealShape::None, 0.0, true);
        }
        let shape = match config.shape.parse::<AnnealShape>()? {
            AnnealShape::Logistic { .. } => AnnealShape::Logistic {
                smoothness: config.logistic_smoothness,
            },
            other => other,
        };
        Self::new(config.total_steps, shape, config.baseline, false)
    }

    /// Current KL weight.
    pub fn weight(&self) -> f64 {
        self.weight_at(self.current_step)
    }

    /// KL weight at an arbitrary step (clamped to `total_steps`). No side effect.
    pub fn weight_at(&self, step: usize) -> f64 {
        let step = step.min(self.total_steps) as f64;
        let y = self.shape.raw(step, self.total_steps as f64);
        match self.shape {
            AnnealShape::None => y,
            _ => y * (1.0 - self.baseline) + self.baseline,
        }
    }

    /// Scale a KL tensor by the current weight.
    pub fn evaluate(&self, kld: &Tensor) -> Result<Tensor> {
        Ok(kld.affine(self.weight(), 0.0)?)
    }

    /// Scalar form of [`Annealer::evaluate`].
    pub fn evaluate_scalar(&self, kld: f64) -> f64 {
        kld * self.weight()
    }

    /// Move one step forward; no-op once `total_steps` is reached.
    pub fn advance(&mut self) {
        if self.current_step < self.total_steps {
            self.current_step += 1;
        }
    }

    /// `(step, weight)` for every step `0..=total_steps`.
    pub fn curve(&self) -> Vec<(usize, f64)> {
        (0..=self.total_steps)
            .map(|s| (s, self.weight_at(s)))
            .collect()
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn shape(&self) -> AnnealShape {
        self.shape
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn is_saturated(&self) -> bool {
        self.current_step == self.total_steps
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
