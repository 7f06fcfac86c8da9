//! Error types for the optbench crates.

use thiserror::Error;

use crate::problem::Mode;

/// Top-level error type for benchmark runs.
///
/// Numerical divergence is not an error: the epoch loop handles it by padding
/// the trajectories. Everything here propagates to the caller of a run.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown test problem: {0}")]
    UnknownProblem(String),

    #[error("Unknown optimizer: {0}")]
    UnknownOptimizer(String),

    #[error("Missing hyperparameter '{name}' for optimizer {optimizer}")]
    MissingHyperparameter { optimizer: String, name: String },

    #[error("Unknown hyperparameter '{name}' for optimizer {optimizer}")]
    UnknownHyperparameter { optimizer: String, name: String },

    #[error("Empty {0} pass: the data source yielded no batches")]
    EmptyPass(Mode),

    #[error("Unsupported capability: {0}")]
    Unsupported(String),

    #[error("Test problem error: {0}")]
    Problem(String),

    #[error("Optimizer error: {0}")]
    Optimizer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl BenchError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn problem(msg: impl Into<String>) -> Self {
        Self::Problem(msg.into())
    }

    pub fn optimizer(msg: impl Into<String>) -> Self {
        Self::Optimizer(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
