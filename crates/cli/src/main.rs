use std::path::PathBuf;

use anyhow::Result;
use candle_core::{Device, Tensor};
use clap::{Parser, Subcommand};

use vae_common::AnnealConfig;
use vae_core::VaeLoss;
use vae_train::Annealer;

#[derive(Parser, Debug)]
#[command(name = "vae-anneal", about = "Inspect KL annealing schedules and VAE losses")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default annealing config to disk.
    InitConfig(InitConfigArgs),
    /// Print the KL weight over the whole schedule.
    Curve(CurveArgs),
    /// Compute reconstruction and KL terms for small inline tensors.
    Loss(LossArgs),
}

// ── Init-config ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct InitConfigArgs {
    #[arg(long, default_value = "anneal.json")]
    output: PathBuf,
    #[arg(long)]
    total_steps: Option<usize>,
    #[arg(long, value_parser = ["linear", "cosine", "logistic", "none"])]
    shape: Option<String>,
    #[arg(long)]
    baseline: Option<f64>,
    /// Exponent divisor for the logistic shape (e.g. total_steps / 10).
    #[arg(long)]
    logistic_smoothness: Option<f64>,
    /// Write a schedule that always applies full KL weight.
    #[arg(long)]
    disable: bool,
    #[arg(long)]
    force: bool,
}

// ── Curve ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct CurveArgs {
    #[arg(long, default_value = "anneal.json")]
    config: PathBuf,
    /// Print every N-th step (0 = about 20 rows).
    #[arg(long, default_value_t = 0)]
    every: usize,
    #[arg(long)]
    json: bool,
}

// ── Loss ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct LossArgs {
    /// Comma-separated decoder probabilities.
    #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
    reconstructed: Vec<f32>,
    /// Comma-separated original inputs in [0, 1].
    #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
    target: Vec<f32>,
    #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
    mu: Vec<f32>,
    #[arg(long, value_delimiter = ',', required = true, allow_hyphen_values = true)]
    log_variance: Vec<f32>,
    /// Annealing config used to weight the KL term.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    step: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::InitConfig(args) => cmd_init_config(args),
        Command::Curve(args) => cmd_curve(args),
        Command::Loss(args) => cmd_loss(args),
    }
}

// ── Command implementations ────────────────────────────────────────────────────

fn cmd_init_config(args: InitConfigArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (pass --force to overwrite)",
            args.output.display()
        );
    }
    let config = init_config(&args)?;
    config.save(&args.output)?;
    eprintln!("Wrote {}", args.output.display());
    Ok(())
}

fn cmd_curve(args: CurveArgs) -> Result<()> {
    let config = AnnealConfig::load(&args.config)?;
    let annealer = Annealer::from_config(&config)?;
    let points = sample_curve(&annealer, args.every);
    tracing::info!(
        shape = %annealer.shape(),
        total_steps = annealer.total_steps(),
        rows = points.len(),
        "schedule"
    );

    if args.json {
        let rows: Vec<_> = points
            .iter()
            .map(|&(step, weight)| serde_json::json!({ "step": step, "weight": weight }))
            .collect();
        let out = serde_json::json!({
            "shape": annealer.shape().name(),
            "total_steps": annealer.total_steps(),
            "baseline": annealer.baseline(),
            "curve": rows,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{:>10}  {:>8}", "step", "weight");
        for (step, weight) in points {
            println!("{step:>10}  {weight:>8.5}");
        }
    }
    Ok(())
}

fn cmd_loss(args: LossArgs) -> Result<()> {
    let device = Device::Cpu;
    let reconstructed = Tensor::new(args.reconstructed.as_slice(), &device)?;
    let target = Tensor::new(args.target.as_slice(), &device)?;
    let mu = Tensor::new(args.mu.as_slice(), &device)?;
    let log_variance = Tensor::new(args.log_variance.as_slice(), &device)?;

    let out = VaeLoss::new().compute(&reconstructed, &target, &mu, &log_variance)?;
    let reconstruction = out.reconstruction.to_scalar::<f32>()? as f64;
    let kl = out.kl.to_scalar::<f32>()? as f64;

    let weight = match args.config {
        Some(path) => Annealer::from_config(&AnnealConfig::load(&path)?)?.weight_at(args.step),
        None => 1.0,
    };

    println!("reconstruction  {reconstruction:.6}");
    println!("kl              {kl:.6}");
    println!("kl_weight       {weight:.6}");
    println!("total           {:.6}", reconstruction + kl * weight);
    Ok(())
}

/// Default config with the command-line overrides applied, validated by
/// building the schedule it describes.
fn init_config(args: &InitConfigArgs) -> Result<AnnealConfig> {
    let mut config = AnnealConfig::default();
    if let Some(total_steps) = args.total_steps {
        config.total_steps = total_steps;
    }
    if let Some(shape) = &args.shape {
        config.shape = shape.clone();
    }
    if let Some(baseline) = args.baseline {
        config.baseline = baseline;
    }
    config.logistic_smoothness = args.logistic_smoothness;
    config.disable = args.disable;
    Annealer::from_config(&config)?;
    Ok(config)
}

/// Every `every`-th point of the curve, always ending on `total_steps`.
fn sample_curve(annealer: &Annealer, every: usize) -> Vec<(usize, f64)> {
    let total = annealer.total_steps();
    let every = if every == 0 { (total / 20).max(1) } else { every };
    let mut points: Vec<_> = (0..=total)
        .step_by(every)
        .map(|s| (s, annealer.weight_at(s)))
        .collect();
    if points.last().map(|&(s, _)| s) != Some(total) {
        points.push((total, annealer.weight_at(total)));
    }
    points
}
