//! Example: train a tiny VAE on synthetic binary patterns with an annealed KL term.
//!
//! Run:
//!   RUST_LOG=info cargo run -p vae-train --example toy_vae -- --config anneal.json --steps 12000
//!
//! A missing config is created with the defaults (linear ramp over 10 000 steps);
//! `vae-anneal init-config` writes other schedules.

use std::path::PathBuf;

use candle_core::{DType, Device, Tensor};
use candle_nn::{linear, ops, AdamW, Linear, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use clap::Parser;

use vae_common::AnnealConfig;
use vae_train::AnnealedObjective;

/// Keeps decoder probabilities away from 0 and 1 so the BCE stays finite.
const PROB_EPS: f32 = 1e-6;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "anneal.json")]
    config: PathBuf,
    #[arg(long, default_value_t = 12_000)]
    steps: usize,
    #[arg(long, default_value_t = 64)]
    batch_size: usize,
    #[arg(long, default_value_t = 16)]
    input_dim: usize,
    #[arg(long, default_value_t = 32)]
    hidden_dim: usize,
    #[arg(long, default_value_t = 2)]
    latent_dim: usize,
    #[arg(long, default_value = "1e-3")]
    lr: f64,
    #[arg(long, default_value_t = 100)]
    log_every: usize,
}

struct ToyVae {
    enc: Linear,
    enc_mu: Linear,
    enc_logvar: Linear,
    dec: Linear,
    dec_out: Linear,
}

impl ToyVae {
    fn new(vb: VarBuilder, args: &Args) -> candle_core::Result<Self> {
        Ok(Self {
            enc: linear(args.input_dim, args.hidden_dim, vb.pp("enc"))?,
            enc_mu: linear(args.hidden_dim, args.latent_dim, vb.pp("enc_mu"))?,
            enc_logvar: linear(args.hidden_dim, args.latent_dim, vb.pp("enc_logvar"))?,
            dec: linear(args.latent_dim, args.hidden_dim, vb.pp("dec"))?,
            dec_out: linear(args.hidden_dim, args.input_dim, vb.pp("dec_out"))?,
        })
    }

    /// Returns `(reconstructed, mu, log_variance)`.
    fn forward(&self, x: &Tensor) -> candle_core::Result<(Tensor, Tensor, Tensor)> {
        let h = self.enc.forward(x)?.relu()?;
        let mu = self.enc_mu.forward(&h)?;
        let logvar = self.enc_logvar.forward(&h)?;

        // Reparameterisation: z = μ + σ·ε
        let eps = Tensor::randn(0f32, 1f32, mu.dims(), mu.device())?;
        let z = (&mu + logvar.affine(0.5, 0.0)?.exp()?.mul(&eps)?)?;

        let h = self.dec.forward(&z)?.relu()?;
        let recon = ops::sigmoid(&self.dec_out.forward(&h)?)?.clamp(PROB_EPS, 1.0 - PROB_EPS)?;
        Ok((recon, mu, logvar))
    }
}

/// Noisy copies of two fixed binary prototypes.
fn synthetic_batch(batch_size: usize, dim: usize, device: &Device) -> candle_core::Result<Tensor> {
    let proto_a: Vec<f32> = (0..dim).map(|i| (i % 2) as f32).collect();
    let proto_b: Vec<f32> = (0..dim).map(|i| (i < dim / 2) as u8 as f32).collect();
    let mut rows = Vec::with_capacity(batch_size * dim);
    for b in 0..batch_size {
        rows.extend_from_slice(if b % 2 == 0 { &proto_a } else { &proto_b });
    }
    let clean = Tensor::from_vec(rows, (batch_size, dim), device)?;
    let flip = Tensor::rand(0f32, 1f32, (batch_size, dim), device)?
        .lt(0.05f32)?
        .to_dtype(DType::F32)?;
    // xor with the flip mask: |clean - flip|
    clean.sub(&flip)?.abs()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if !args.config.exists() {
        eprintln!("Creating default config at {}", args.config.display());
    }
    let anneal_config = AnnealConfig::load_or_create(&args.config)?;

    let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = ToyVae::new(vb, &args)?;
    let mut optimizer = AdamW::new(
        varmap.all_vars(),
        ParamsAdamW {
            lr: args.lr,
            ..Default::default()
        },
    )?;
    let mut objective = AnnealedObjective::from_config(&anneal_config)?;

    tracing::info!(
        total_steps = anneal_config.total_steps,
        shape = %objective.annealer().shape(),
        baseline = objective.annealer().baseline(),
        "KL schedule"
    );

    for step in 0..args.steps {
        let x = synthetic_batch(args.batch_size, args.input_dim, &device)?;
        let (recon, mu, logvar) = model.forward(&x)?;
        let losses = objective.step(&recon, &x, &mu, &logvar)?;
        optimizer.backward_step(&losses.total)?;

        if args.log_every > 0 && (step + 1) % args.log_every == 0 {
            tracing::info!(
                step,
                reconstruction = %losses.reconstruction,
                kl = %losses.kl,
                kl_weight = %format!("{:.4}", losses.kl_weight),
                "step"
            );
        }
    }

    Ok(())
}
