//! # vae-common — Shared Primitives
//!
//! Types shared across every crate in the workspace:
//!
//! * **[`AnnealConfig`]** — KL annealing hyper-parameters (serialised as JSON).
//! * **[`AnnealError`]** / **[`Result`]** — the workspace error type.

pub mod config;
pub mod error;

pub use config::AnnealConfig;
pub use error::{AnnealError, Result};
