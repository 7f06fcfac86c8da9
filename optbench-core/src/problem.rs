//! Test-problem contract consumed by the epoch loop.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BenchError, Result};
use crate::params::ParameterSet;

/// Iteration mode of a test problem. Each mode has its own restartable pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Train,
    Test,
    TrainEval,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Train => write!(f, "train"),
            Mode::Test => write!(f, "test"),
            Mode::TrainEval => write!(f, "train_eval"),
        }
    }
}

/// Loss and accuracy of a single minibatch, already forced to scalars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchResult {
    pub loss: f64,
    pub accuracy: f64,
}

/// Outcome of pulling the next batch from the current pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Batch {
    Data(BatchResult),
    /// Every batch of the current pass has been consumed.
    EndOfPass,
}

impl Batch {
    pub fn data(loss: f64, accuracy: f64) -> Self {
        Batch::Data(BatchResult { loss, accuracy })
    }
}

/// Whether a problem adds a parameter-dependent regularization term to its loss.
///
/// Reported once by [`TestProblem::set_up`]; the epoch loop never asks again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegularizationCapability {
    Absent,
    Present,
}

impl RegularizationCapability {
    pub fn is_present(self) -> bool {
        self == RegularizationCapability::Present
    }
}

/// Construction settings for a test problem.
///
/// `random_seed` seeds every random draw the problem makes (data generation,
/// shuffling); constructing a problem is the only place seeding happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSettings {
    pub batch_size: usize,
    pub weight_decay: Option<f64>,
    pub random_seed: u64,
}

impl ProblemSettings {
    pub fn new(batch_size: usize, random_seed: u64) -> Self {
        Self {
            batch_size,
            weight_decay: None,
            random_seed,
        }
    }

    pub fn with_weight_decay(mut self, weight_decay: f64) -> Self {
        self.weight_decay = Some(weight_decay);
        self
    }
}

/// A model + dataset + loss bundle with mode-switchable batch iteration.
pub trait TestProblem {
    fn name(&self) -> &str;

    /// Prepare data and parameters. Idempotent; returns the regularization
    /// capability of the problem.
    fn set_up(&mut self) -> Result<RegularizationCapability>;

    /// Begin a fresh pass over the data of `mode`.
    fn init_pass(&mut self, mode: Mode) -> Result<()>;

    /// Pull the next batch of the current pass.
    fn next_batch(&mut self) -> Result<Batch>;

    /// Accumulate into the parameter gradients the gradient of the most recent
    /// training batch loss, regularization term included when present.
    fn backward(&mut self) -> Result<()>;

    fn parameters(&self) -> &ParameterSet;

    fn parameters_mut(&mut self) -> &mut ParameterSet;

    /// Regularization loss at the current parameters. Only called when
    /// `set_up` reported [`RegularizationCapability::Present`].
    fn regularization_loss(&self) -> Result<f64> {
        Err(BenchError::unsupported(format!(
            "{} has no regularization term",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display_matches_serde_names() {
        for mode in [Mode::Train, Mode::Test, Mode::TrainEval] {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{mode}\""));
        }
    }

    #[test]
    fn test_regularization_capability() {
        assert!(RegularizationCapability::Present.is_present());
        assert!(!RegularizationCapability::Absent.is_present());
    }
}
