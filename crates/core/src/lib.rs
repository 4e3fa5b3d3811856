//! # vae-core — Loss Reductions
//!
//! The two closed-form tensor reductions of a variational autoencoder
//! objective, built on `candle-core` so they run on CPU, CUDA and Metal and
//! stay differentiable:
//!
//! | Item | Contents |
//! |------|----------|
//! | [`VaeLoss`] | `compute(reconstructed, target, mu, log_variance)` |
//! | [`binary_cross_entropy_sum`] | summed BCE reconstruction term |
//! | [`gaussian_kl_divergence`] | KL(N(μ, σ²) ‖ N(0, I)) |

pub mod loss;

pub use loss::{binary_cross_entropy_sum, gaussian_kl_divergence, VaeLoss, VaeLossOutput};
