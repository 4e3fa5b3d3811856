//! Annealed VAE objective: `reconstruction + weight(step) · KL`.
//!
//! Decouples the loss terms (computed by [`VaeLoss`]) from the schedule that
//! weights the KL term, and advances the schedule once per training step.

use candle_core::{DType, Tensor};
use vae_common::{AnnealConfig, Result};
use vae_core::VaeLoss;

use crate::scheduler::Annealer;

/// Losses of one training step.
#[derive(Debug, Clone)]
pub struct StepLosses {
    /// Schedule step the losses were computed at.
    pub step: usize,
    /// Differentiable objective to call `backward()` on.
    pub total: Tensor,
    pub reconstruction: f32,
    /// Unweighted KL term.
    pub kl: f32,
    pub kl_weight: f64,
}

/// Owns the KL schedule for a training run and combines the loss terms.
#[derive(Debug, Clone)]
pub struct AnnealedObjective {
    annealer: Annealer,
    loss: VaeLoss,
}

impl AnnealedObjective {
    pub fn new(annealer: Annealer) -> Self {
        Self {
            annealer,
            loss: VaeLoss::new(),
        }
    }

    pub fn from_config(config: &AnnealConfig) -> Result<Self> {
        Ok(Self::new(Annealer::from_config(config)?))
    }

    /// Compute the objective at the current step, then advance the schedule.
    pub fn step(
        &mut self,
        reconstructed: &Tensor,
        target: &Tensor,
        mu: &Tensor,
        log_variance: &Tensor,
    ) -> Result<StepLosses> {
        let losses = self.peek(reconstructed, target, mu, log_variance)?;
        self.annealer.advance();
        Ok(losses)
    }

    /// Compute the objective at the current step without advancing
    /// (validation passes).
    pub fn peek(
        &self,
        reconstructed: &Tensor,
        target: &Tensor,
        mu: &Tensor,
        log_variance: &Tensor,
    ) -> Result<StepLosses> {
        let out = self.loss.compute(reconstructed, target, mu, log_variance)?;
        let kl_weight = self.annealer.weight();
        let total = out.reconstruction.add(&self.annealer.evaluate(&out.kl)?)?;

        let reconstruction = out.reconstruction.to_dtype(DType::F32)?.to_scalar::<f32>()?;
        let kl = out.kl.to_dtype(DType::F32)?.to_scalar::<f32>()?;
        let step = self.annealer.current_step();
        tracing::debug!(step, reconstruction, kl, kl_weight, "annealed VAE loss");

        Ok(StepLosses {
            step,
            total,
            reconstruction,
            kl,
            kl_weight,
        })
    }

    pub fn annealer(&self) -> &Annealer {
        &self.annealer
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
