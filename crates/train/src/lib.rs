//! # vae-train — KL Annealing
//!
//! Scheduling and objective assembly for VAE training:
//!
//! * **[`Annealer`]** — step-driven KL weight in \[0, 1\] (linear / cosine /
//!   logistic / none, optional baseline floor).
//! * **[`AnnealedObjective`]** — owns the annealer; one call to
//!   [`AnnealedObjective::step`] computes `reconstruction + weight · KL` and
//!   advances the schedule.

pub mod objective;
pub mod scheduler;

pub use objective::{AnnealedObjective, StepLosses};
pub use scheduler::{AnnealShape, Annealer};
