//! Metric trajectories, the divergence abort routine and the run's metrics record.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::training::evaluator::Evaluation;
use crate::training::lossless;

/// Per-epoch evaluation snapshots. Index `i` is the state before training
/// epoch `i`; the last entry is the state after the final epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectories {
    #[serde(with = "lossless::seq")]
    pub train_losses: Vec<f64>,
    #[serde(with = "lossless::seq")]
    pub test_losses: Vec<f64>,
    #[serde(with = "lossless::seq")]
    pub train_accuracies: Vec<f64>,
    #[serde(with = "lossless::seq")]
    pub test_accuracies: Vec<f64>,
}

impl Trajectories {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            train_losses: Vec::with_capacity(capacity),
            test_losses: Vec::with_capacity(capacity),
            train_accuracies: Vec::with_capacity(capacity),
            test_accuracies: Vec::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, train: Evaluation, test: Evaluation) {
        self.train_losses.push(train.loss);
        self.train_accuracies.push(train.accuracy);
        self.test_losses.push(test.loss);
        self.test_accuracies.push(test.accuracy);
    }

    /// Number of snapshots recorded.
    pub fn len(&self) -> usize {
        self.train_losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train_losses.is_empty()
    }

    /// Repeat the last value of every trajectory until each has `len` entries.
    pub fn pad_to(&mut self, len: usize) {
        for series in [
            &mut self.train_losses,
            &mut self.test_losses,
            &mut self.train_accuracies,
            &mut self.test_accuracies,
        ] {
            if let Some(&last) = series.last() {
                series.resize(len.max(series.len()), last);
            }
        }
    }
}

/// Training loss became NaN or infinite.
pub fn is_diverged(loss: f64) -> bool {
    loss.is_nan() || loss.is_infinite()
}

/// Freeze every trajectory at its last valid reading after training diverged
/// in `epoch`, so the output keeps its `num_epochs + 1` shape.
pub fn abort_routine(epoch: usize, num_epochs: usize, trajectories: &mut Trajectories) {
    warn!(
        "Breaking from run after epoch {} of {} due to wrongly calibrated optimization (loss is NaN or inf)",
        epoch, num_epochs
    );
    trajectories.pad_to(num_epochs + 1);
}

/// Schedule inputs recorded verbatim so analysis can tell schedule runs apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzableTrainingParams {
    pub lr_sched_epochs: Option<Vec<usize>>,
    pub lr_sched_factors: Option<Vec<f64>>,
}

/// Everything the epoch loop measured in one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(flatten)]
    pub trajectories: Trajectories,
    /// Sampled raw training losses; standard runner only. Ends with the
    /// diverged value when training diverged.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "lossless::opt_seq")]
    pub minibatch_train_losses: Option<Vec<f64>>,
    /// Learning-rate schedule runner only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzable_training_params: Option<AnalyzableTrainingParams>,
    /// Epoch whose training pass diverged, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diverged_at_epoch: Option<usize>,
}

impl Metrics {
    pub fn diverged(&self) -> bool {
        self.diverged_at_epoch.is_some()
    }

    pub fn final_test_loss(&self) -> Option<f64> {
        self.trajectories.test_losses.last().copied()
    }

    pub fn final_test_accuracy(&self) -> Option<f64> {
        self.trajectories.test_accuracies.last().copied()
    }
}
