//! Full-pass evaluation of a test problem on one split.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BenchError, Result};
use crate::problem::{Batch, Mode, RegularizationCapability, TestProblem};

/// Split an evaluation pass runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalSplit {
    Test,
    TrainEval,
}

impl EvalSplit {
    pub fn mode(self) -> Mode {
        match self {
            EvalSplit::Test => Mode::Test,
            EvalSplit::TrainEval => Mode::TrainEval,
        }
    }

    fn label(self) -> &'static str {
        match self {
            EvalSplit::Test => "TEST",
            EvalSplit::TrainEval => "TRAIN",
        }
    }
}

/// Mean loss and accuracy over the batches of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: f64,
}

/// Evaluate the current model state on `split`.
///
/// Means are taken over batches, not samples. The regularization loss is added
/// once to the mean loss when the problem carries one.
pub fn evaluate(
    problem: &mut dyn TestProblem,
    split: EvalSplit,
    regularization: RegularizationCapability,
) -> Result<Evaluation> {
    problem.init_pass(split.mode())?;

    let mut loss = 0.0;
    let mut accuracy = 0.0;
    let mut batches = 0usize;
    while let Batch::Data(batch) = problem.next_batch()? {
        loss += batch.loss;
        accuracy += batch.accuracy;
        batches += 1;
    }
    if batches == 0 {
        return Err(BenchError::EmptyPass(split.mode()));
    }

    let mut loss = loss / batches as f64;
    let accuracy = accuracy / batches as f64;
    if regularization.is_present() {
        loss += problem.regularization_loss()?;
    }

    if accuracy != 0.0 {
        info!("{}: loss {}, acc {:.6}", split.label(), loss, accuracy);
    } else {
        info!("{}: loss {}", split.label(), loss);
    }

    Ok(Evaluation { loss, accuracy })
}
