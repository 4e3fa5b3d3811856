//! VAE loss terms: summed binary cross-entropy and the closed-form Gaussian KL.
//!
//! Both terms are returned separately. The caller decides how to combine them,
//! typically `reconstruction + annealer.evaluate(kl)`, so the KL weight can be
//! scheduled independently of the reconstruction weight.
//!
//! ```text
//! BCE = -Σ [ t·ln(p) + (1 - t)·ln(1 - p) ]
//! KL  = -½ Σ [ 1 + log σ² - μ² - σ² ]
//! ```

use candle_core::Tensor;
use vae_common::{AnnealError, Result};

/// Reconstruction and KL terms of one forward evaluation.
///
/// Both tensors are rank-0 and keep the dtype of the inputs, so they stay on
/// the autograd graph.
#[derive(Debug, Clone)]
pub struct VaeLossOutput {
    pub reconstruction: Tensor,
    pub kl: Tensor,
}

/// Stateless VAE loss. Every call recomputes both terms from its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct VaeLoss;

impl VaeLoss {
    pub fn new() -> Self {
        Self
    }

    /// Compute `(reconstruction, kl)` for a batch.
    ///
    /// * `reconstructed` — decoder output, probabilities in \[0, 1\].
    /// * `target` — original input, probabilities in \[0, 1\].
    /// * `mu`, `log_variance` — parameters of the encoded posterior.
    ///
    /// Values outside \[0, 1\] are not clamped and yield NaN/inf.
    pub fn compute(
        &self,
        reconstructed: &Tensor,
        target: &Tensor,
        mu: &Tensor,
        log_variance: &Tensor,
    ) -> Result<VaeLossOutput> {
        Ok(VaeLossOutput {
            reconstruction: binary_cross_entropy_sum(reconstructed, target)?,
            kl: gaussian_kl_divergence(mu, log_variance)?,
        })
    }
}

/// Binary cross-entropy summed over every element (no mean reduction).
///
/// `predicted` is the probability `p` (the decoder output) and `target` is `t`;
/// swapping them changes the result unless the two tensors are equal.
pub fn binary_cross_entropy_sum(predicted: &Tensor, target: &Tensor) -> Result<Tensor> {
    ensure_same_shape("binary_cross_entropy", predicted, target)?;
    let log_p = predicted.log()?;
    let log_not_p = predicted.affine(-1.0, 1.0)?.log()?;
    let not_t = target.affine(-1.0, 1.0)?;
    let per_elem = target.mul(&log_p)?.add(&not_t.mul(&log_not_p)?)?;
    Ok(per_elem.sum_all()?.neg()?)
}

/// KL divergence between `N(mu, exp(log_variance))` and `N(0, I)`, summed.
pub fn gaussian_kl_divergence(mu: &Tensor, log_variance: &Tensor) -> Result<Tensor> {
    ensure_same_shape("gaussian_kl_divergence", mu, log_variance)?;
    let per_elem = log_variance
        .affine(1.0, 1.0)?
        .sub(&mu.sqr()?)?
        .sub(&log_variance.exp()?)?;
    Ok(per_elem.sum_all()?.affine(-0.5, 0.0)?)
}

fn ensure_same_shape(op: &'static str, lhs: &Tensor, rhs: &Tensor) -> Result<()> {
    if lhs.dims() != rhs.dims() {
        return Err(AnnealError::ShapeMismatch {
            op,
            lhs: lhs.dims().to_vec(),
            rhs: rhs.dims().to_vec(),
        });
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn scalar(t: &Tensor) -> f32 {
        t.to_scalar::<f32>().unwrap()
    }

    #[test]
    fn kl_is_zero_for_standard_normal_posterior() {
        let dev = Device::Cpu;
        let mu = Tensor::zeros((3, 4), candle_core::DType::F32, &dev).unwrap();
        let logvar = Tensor::zeros((3, 4), candle_core::DType::F32, &dev).unwrap();
        let kl = gaussian_kl_divergence(&mu, &logvar).unwrap();
        assert_eq!(scalar(&kl), 0.0);
    }

    #[test]
    fn kl_unit_mean_shift() {
        // Per element: -0.5 * (1 + 0 - 1 - 1) = 0.5
        let dev = Device::Cpu;
        let mu = Tensor::ones((2, 2), candle_core::DType::F32, &dev).unwrap();
        let logvar = Tensor::zeros((2, 2), candle_core::DType::F32, &dev).unwrap();
        let kl = gaussian_kl_divergence(&mu, &logvar).unwrap();
        assert!((scalar(&kl) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn kl_matches_direct_computation() {
        let dev = Device::Cpu;
        let mu_v = [0.5f32, -1.0, 0.25];
        let lv_v = [0.1f32, -0.3, 0.7];
        let mu = Tensor::new(&mu_v, &dev).unwrap();
        let logvar = Tensor::new(&lv_v, &dev).unwrap();
        let expected: f64 = -0.5
            * mu_v
                .iter()
                .zip(lv_v.iter())
                .map(|(&m, &lv)| {
                    let (m, lv) = (m as f64, lv as f64);
                    1.0 + lv - m * m - lv.exp()
                })
                .sum::<f64>();
        let kl = gaussian_kl_divergence(&mu, &logvar).unwrap();
        assert!((scalar(&kl) as f64 - expected).abs() < 1e-5);
    }

    #[test]
    fn bce_matches_direct_computation_when_equal() {
        let dev = Device::Cpu;
        let values = [[0.2f32, 0.4], [0.6, 0.8]];
        let p = Tensor::new(&values, &dev).unwrap();
        let t = p.clone();
        let expected: f64 = values
            .iter()
            .flatten()
            .map(|&v| {
                let v = v as f64;
                -(v * v.ln() + (1.0 - v) * (1.0 - v).ln())
            })
            .sum();
        let bce = binary_cross_entropy_sum(&p, &t).unwrap();
        assert!((scalar(&bce) as f64 - expected).abs() < 1e-5);
    }

    #[test]
    fn bce_is_summed_not_averaged() {
        // Target 1 with prediction 0.5 costs ln 2 per element.
        let dev = Device::Cpu;
        let p = Tensor::new(&[0.5f32; 8], &dev).unwrap();
        let t = Tensor::ones(8, candle_core::DType::F32, &dev).unwrap();
        let bce = binary_cross_entropy_sum(&p, &t).unwrap();
        assert!((scalar(&bce) as f64 - 8.0 * std::f64::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn bce_first_argument_is_the_prediction() {
        // p = 0.8, t = 1 costs -ln 0.8. Swapped, p = 1 hits ln(1 - 1) and diverges.
        let dev = Device::Cpu;
        let recon = Tensor::new(&[0.8f32], &dev).unwrap();
        let target = Tensor::new(&[1.0f32], &dev).unwrap();
        let zeros = Tensor::zeros(1, candle_core::DType::F32, &dev).unwrap();

        let out = VaeLoss::new().compute(&recon, &target, &zeros, &zeros).unwrap();
        assert!((scalar(&out.reconstruction) as f64 + 0.8f64.ln()).abs() < 1e-6);

        let swapped = binary_cross_entropy_sum(&target, &recon).unwrap();
        assert!(!scalar(&swapped).is_finite());
    }

    #[test]
    fn compute_returns_both_terms_unsummed() {
        let dev = Device::Cpu;
        let p = Tensor::new(&[[0.3f32, 0.7]], &dev).unwrap();
        let t = Tensor::new(&[[0.0f32, 1.0]], &dev).unwrap();
        let mu = Tensor::new(&[1.0f32, 0.0], &dev).unwrap();
        let logvar = Tensor::zeros(2, candle_core::DType::F32, &dev).unwrap();

        let out = VaeLoss::new().compute(&p, &t, &mu, &logvar).unwrap();
        let expected_bce = -(0.7f64.ln() + 0.7f64.ln());
        assert!((scalar(&out.reconstruction) as f64 - expected_bce).abs() < 1e-5);
        assert!((scalar(&out.kl) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn compute_is_repeatable() {
        let dev = Device::Cpu;
        let p = Tensor::new(&[0.1f32, 0.9, 0.5], &dev).unwrap();
        let mu = Tensor::new(&[0.2f32, -0.2, 0.0], &dev).unwrap();
        let logvar = Tensor::new(&[0.0f32, 0.5, -0.5], &dev).unwrap();
        let loss = VaeLoss::new();
        let a = loss.compute(&p, &p, &mu, &logvar).unwrap();
        let b = loss.compute(&p, &p, &mu, &logvar).unwrap();
        assert_eq!(scalar(&a.reconstruction), scalar(&b.reconstruction));
        assert_eq!(scalar(&a.kl), scalar(&b.kl));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let dev = Device::Cpu;
        let p = Tensor::new(&[[0.5f32, 0.5], [0.5, 0.5]], &dev).unwrap();
        let t = Tensor::new(&[0.5f32, 0.5, 0.5, 0.5], &dev).unwrap();
        let err = binary_cross_entropy_sum(&p, &t).unwrap_err();
        assert!(matches!(
            err,
            AnnealError::ShapeMismatch { op: "binary_cross_entropy", .. }
        ));

        let mu = Tensor::zeros(3, candle_core::DType::F32, &dev).unwrap();
        let logvar = Tensor::zeros(2, candle_core::DType::F32, &dev).unwrap();
        assert!(gaussian_kl_divergence(&mu, &logvar).is_err());
    }

    #[test]
    fn out_of_range_probabilities_are_not_clamped() {
        let dev = Device::Cpu;
        let p = Tensor::new(&[1.5f32], &dev).unwrap();
        let t = Tensor::new(&[0.5f32], &dev).unwrap();
        let bce = binary_cross_entropy_sum(&p, &t).unwrap();
        assert!(!scalar(&bce).is_finite());
    }
}
