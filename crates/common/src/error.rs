//! Error types shared by the schedule and loss crates.

use thiserror::Error;

/// Errors raised while building a schedule or computing VAE losses.
#[derive(Debug, Error)]
pub enum AnnealError {
    /// A schedule parameter is outside its supported domain
    /// (unknown shape name, `total_steps = 0`, baseline outside `[0, 1]`, ...).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Two tensors that must agree element-wise have different shapes.
    #[error("Shape mismatch in {op}: {lhs:?} vs {rhs:?}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },

    #[error(transparent)]
    Tensor(#[from] candle_core::Error),
}

impl AnnealError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

/// Result type for schedule and loss operations.
pub type Result<T> = std::result::Result<T, AnnealError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AnnealError::invalid("unsupported annealing shape 'exponential'");
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("exponential"));

        let err = AnnealError::ShapeMismatch {
            op: "binary_cross_entropy",
            lhs: vec![2, 2],
            rhs: vec![4],
        };
        let msg = err.to_string();
        assert!(msg.contains("binary_cross_entropy"));
        assert!(msg.contains("[2, 2]"));
        assert!(msg.contains("[4]"));
    }
}
