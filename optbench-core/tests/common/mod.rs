//! Scripted test problem and recording optimizer shared by the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use optbench_core::error::Result;
use optbench_core::hyperparams::{HyperparameterSpec, Hyperparameters};
use optbench_core::optim::{Optimizer, OptimizerFactory};
use optbench_core::params::{Parameter, ParameterSet};
use optbench_core::problem::{Batch, Mode, RegularizationCapability, TestProblem};
use optbench_core::training::TelemetrySink;

type TrainLoss = Box<dyn Fn(usize, usize) -> f64>;

/// A problem whose batches are fully scripted.
///
/// Evaluation batches report `eval_losses[i] / (1 + passes)` where `passes` is
/// the number of training passes started so far, so every epoch's snapshot
/// differs. Training batch `b` of pass `p` reports `train_loss(p, b)`.
pub struct ScriptedProblem {
    pub eval_losses: Vec<f64>,
    pub eval_accuracy: f64,
    pub train_batches: usize,
    pub regularization: Option<f64>,
    train_loss: TrainLoss,
    params: ParameterSet,
    mode: Option<Mode>,
    cursor: usize,
    pub train_passes: usize,
    pub set_up_calls: usize,
    pub mode_log: Vec<Mode>,
    pub backward_calls: usize,
}

impl ScriptedProblem {
    pub fn new(train_batches: usize) -> Self {
        Self {
            eval_losses: vec![1.0, 2.0, 3.0],
            eval_accuracy: 0.5,
            train_batches,
            regularization: None,
            train_loss: Box::new(|_, _| 1.0),
            params: [Parameter::new("w", vec![0.0])].into_iter().collect(),
            mode: None,
            cursor: 0,
            train_passes: 0,
            set_up_calls: 0,
            mode_log: Vec::new(),
            backward_calls: 0,
        }
    }

    pub fn with_train_loss(mut self, f: impl Fn(usize, usize) -> f64 + 'static) -> Self {
        self.train_loss = Box::new(f);
        self
    }

    pub fn with_regularization(mut self, r: f64) -> Self {
        self.regularization = Some(r);
        self
    }

    pub fn with_eval_losses(mut self, losses: Vec<f64>) -> Self {
        self.eval_losses = losses;
        self
    }
}

impl TestProblem for ScriptedProblem {
    fn name(&self) -> &str {
        "scripted"
    }

    fn set_up(&mut self) -> Result<RegularizationCapability> {
        self.set_up_calls += 1;
        Ok(match self.regularization {
            Some(_) => RegularizationCapability::Present,
            None => RegularizationCapability::Absent,
        })
    }

    fn init_pass(&mut self, mode: Mode) -> Result<()> {
        if mode == Mode::Train {
            self.train_passes += 1;
        }
        self.mode = Some(mode);
        self.cursor = 0;
        self.mode_log.push(mode);
        Ok(())
    }

    fn next_batch(&mut self) -> Result<Batch> {
        let index = self.cursor;
        let batch = match self.mode {
            Some(Mode::Train) if index < self.train_batches => {
                Batch::data((self.train_loss)(self.train_passes - 1, index), 0.0)
            }
            Some(Mode::Test | Mode::TrainEval) if index < self.eval_losses.len() => {
                let scale = 1.0 / (1.0 + self.train_passes as f64);
                Batch::data(self.eval_losses[index] * scale, self.eval_accuracy)
            }
            _ => Batch::EndOfPass,
        };
        self.cursor += 1;
        Ok(batch)
    }

    fn backward(&mut self) -> Result<()> {
        self.backward_calls += 1;
        if let Some(p) = self.params.get_mut("w") {
            p.grad[0] += 1.0;
        }
        Ok(())
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    fn regularization_loss(&self) -> Result<f64> {
        Ok(self.regularization.unwrap_or(0.0))
    }
}

/// Records the learning rate in effect at every optimizer step.
pub struct RecordingOptimizer {
    lr: f64,
    log: Rc<RefCell<Vec<f64>>>,
}

impl Optimizer for RecordingOptimizer {
    fn name(&self) -> &str {
        "recording"
    }

    fn step(&mut self, params: &mut ParameterSet) -> Result<()> {
        self.log.borrow_mut().push(self.lr);
        for p in params.iter_mut() {
            for (w, g) in p.value.iter_mut().zip(&p.grad) {
                *w -= self.lr * g;
            }
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.lr = lr;
    }
}

#[derive(Default)]
pub struct RecordingFactory {
    pub lr_log: Rc<RefCell<Vec<f64>>>,
}

const RECORDING_SPECS: &[HyperparameterSpec] = &[HyperparameterSpec::required("lr")];

impl OptimizerFactory for RecordingFactory {
    fn name(&self) -> &str {
        "recording"
    }

    fn hyperparameter_specs(&self) -> &[HyperparameterSpec] {
        RECORDING_SPECS
    }

    fn build(
        &self,
        _params: &ParameterSet,
        hyperparams: &Hyperparameters,
    ) -> Result<Box<dyn Optimizer>> {
        Ok(Box::new(RecordingOptimizer {
            lr: hyperparams.require("recording", "lr")?,
            log: Rc::clone(&self.lr_log),
        }))
    }
}

/// Keeps every scalar in memory.
#[derive(Default)]
pub struct MemorySink {
    pub points: Vec<(String, f64, u64)>,
    pub flushed: bool,
}

impl TelemetrySink for MemorySink {
    fn add_scalar(&mut self, tag: &str, value: f64, step: u64) -> Result<()> {
        self.points.push((tag.to_string(), value, step));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushed = true;
        Ok(())
    }
}

pub fn lr(value: f64) -> Hyperparameters {
    Hyperparameters::new().with("lr", value)
}
