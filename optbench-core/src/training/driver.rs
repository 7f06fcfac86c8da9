//! The epoch loop: evaluate → train → evaluate, with divergence handling.
//!
//! One driver serves both runner variants. The standard runner records the
//! minibatch log and may stream it to a telemetry sink; the learning-rate
//! schedule runner advances a schedule before every training pass and reports
//! its inputs instead of the minibatch log.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BenchError, Result};
use crate::hyperparams::Hyperparameters;
use crate::optim::{Optimizer, OptimizerFactory};
use crate::problem::{Batch, Mode, RegularizationCapability, TestProblem};
use crate::training::evaluator::{EvalSplit, evaluate};
use crate::training::metrics::{
    AnalyzableTrainingParams, Metrics, Trajectories, abort_routine, is_diverged,
};
use crate::training::schedule::LrSchedule;
use crate::training::telemetry::TelemetrySink;

/// Which output contract a run follows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    /// Fixed hyperparameters; output carries the minibatch log.
    #[default]
    Standard,
    /// Optional epoch-wise learning-rate schedule; output carries
    /// `analyzable_training_params`.
    LearningRateSchedule,
}

/// Extra training parameters accepted by the learning-rate schedule runner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub lr_sched_epochs: Option<Vec<usize>>,
    pub lr_sched_factors: Option<Vec<f64>>,
}

impl TrainingParams {
    pub fn schedule(epochs: Vec<usize>, factors: Vec<f64>) -> Self {
        Self {
            lr_sched_epochs: Some(epochs),
            lr_sched_factors: Some(factors),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lr_sched_epochs.is_none() && self.lr_sched_factors.is_none()
    }

    /// Both halves of the schedule, or `None` when no schedule was given.
    fn breakpoints(&self) -> Result<Option<(&[usize], &[f64])>> {
        match (&self.lr_sched_epochs, &self.lr_sched_factors) {
            (Some(epochs), Some(factors)) => Ok(Some((epochs, factors))),
            (None, None) => Ok(None),
            _ => Err(BenchError::config(
                "lr_sched_epochs and lr_sched_factors must be given together",
            )),
        }
    }
}

impl From<&TrainingParams> for AnalyzableTrainingParams {
    fn from(params: &TrainingParams) -> Self {
        Self {
            lr_sched_epochs: params.lr_sched_epochs.clone(),
            lr_sched_factors: params.lr_sched_factors.clone(),
        }
    }
}

/// Loop length and minibatch logging behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub num_epochs: usize,
    pub train_log_interval: usize,
    pub print_train_iter: bool,
}

impl LoopSettings {
    pub fn new(num_epochs: usize) -> Self {
        Self {
            num_epochs,
            train_log_interval: 10,
            print_train_iter: false,
        }
    }
}

pub struct EpochLoop<'a> {
    settings: LoopSettings,
    kind: RunnerKind,
    training_params: TrainingParams,
    telemetry: Option<&'a mut dyn TelemetrySink>,
    global_step: u64,
}

impl<'a> EpochLoop<'a> {
    pub fn standard(settings: LoopSettings) -> Self {
        Self {
            settings,
            kind: RunnerKind::Standard,
            training_params: TrainingParams::default(),
            telemetry: None,
            global_step: 0,
        }
    }

    pub fn learning_rate_schedule(settings: LoopSettings, training_params: TrainingParams) -> Self {
        Self {
            settings,
            kind: RunnerKind::LearningRateSchedule,
            training_params,
            telemetry: None,
            global_step: 0,
        }
    }

    /// Stream sampled training losses to `sink`. Only the standard runner
    /// emits telemetry.
    pub fn with_telemetry(mut self, sink: &'a mut dyn TelemetrySink) -> Self {
        match self.kind {
            RunnerKind::Standard => self.telemetry = Some(sink),
            RunnerKind::LearningRateSchedule => {
                warn!("The learning-rate schedule runner does not emit telemetry; sink ignored")
            }
        }
        self
    }

    pub fn kind(&self) -> RunnerKind {
        self.kind
    }

    /// Drive the full run on `problem` with an optimizer built by `factory`.
    pub fn run(
        mut self,
        problem: &mut dyn TestProblem,
        factory: &dyn OptimizerFactory,
        hyperparams: &Hyperparameters,
    ) -> Result<Metrics> {
        if self.settings.train_log_interval == 0 {
            return Err(BenchError::config("train_log_interval must be at least 1"));
        }
        let breakpoints = self.training_params.breakpoints()?;
        if self.kind == RunnerKind::Standard && breakpoints.is_some() {
            return Err(BenchError::config(
                "the standard runner does not accept a learning-rate schedule",
            ));
        }

        let regularization = problem.set_up()?;
        let mut optimizer = factory.build(problem.parameters(), hyperparams)?;
        let mut schedule = match breakpoints {
            Some((epochs, factors)) => Some(LrSchedule::new(optimizer.as_mut(), epochs, factors)?),
            None => None,
        };

        let num_epochs = self.settings.num_epochs;
        let mut trajectories = Trajectories::with_capacity(num_epochs + 1);
        let mut minibatch_train_losses = Vec::new();
        let mut diverged_at_epoch = None;

        for epoch in 0..=num_epochs {
            info!("********************************");
            info!("Evaluating after {} of {} epochs...", epoch, num_epochs);
            let train = evaluate(problem, EvalSplit::TrainEval, regularization)?;
            let test = evaluate(problem, EvalSplit::Test, regularization)?;
            trajectories.record(train, test);
            info!("********************************");

            if epoch == num_epochs {
                break;
            }

            if let Some(schedule) = schedule.as_mut() {
                schedule.step(optimizer.as_mut());
                // Announced when the epoch about to be trained is a breakpoint.
                if schedule.is_breakpoint(epoch) {
                    info!("Setting learning rate to {}", schedule.current_lr());
                }
            }

            let last_loss = self.train_epoch(
                epoch,
                problem,
                optimizer.as_mut(),
                regularization,
                &mut minibatch_train_losses,
            )?;

            if is_diverged(last_loss) {
                abort_routine(epoch, num_epochs, &mut trajectories);
                diverged_at_epoch = Some(epoch);
                break;
            }
        }

        if let Some(sink) = self.telemetry.as_deref_mut() {
            sink.flush()?;
        }

        Ok(match self.kind {
            RunnerKind::Standard => Metrics {
                trajectories,
                minibatch_train_losses: Some(minibatch_train_losses),
                analyzable_training_params: None,
                diverged_at_epoch,
            },
            RunnerKind::LearningRateSchedule => Metrics {
                trajectories,
                minibatch_train_losses: None,
                analyzable_training_params: Some((&self.training_params).into()),
                diverged_at_epoch,
            },
        })
    }

    /// One full training pass. Returns the loss of the last batch.
    fn train_epoch(
        &mut self,
        epoch: usize,
        problem: &mut dyn TestProblem,
        optimizer: &mut dyn Optimizer,
        regularization: RegularizationCapability,
        minibatch_train_losses: &mut Vec<f64>,
    ) -> Result<f64> {
        problem.init_pass(Mode::Train)?;

        let mut batch_count = 0usize;
        let mut last_loss = None;
        loop {
            optimizer.zero_grad(problem.parameters_mut());
            let batch = match problem.next_batch()? {
                Batch::Data(batch) => batch,
                Batch::EndOfPass => break,
            };
            let mut loss = batch.loss;
            if regularization.is_present() {
                loss += problem.regularization_loss()?;
            }
            problem.backward()?;
            optimizer.step(problem.parameters_mut())?;

            if batch_count % self.settings.train_log_interval == 0 {
                minibatch_train_losses.push(loss);
                if self.settings.print_train_iter {
                    info!("Epoch {}, step {}: loss {}", epoch, batch_count, loss);
                }
                if let Some(sink) = self.telemetry.as_deref_mut() {
                    sink.add_scalar("loss", loss, self.global_step)?;
                }
            }

            last_loss = Some(loss);
            batch_count += 1;
            self.global_step += 1;
        }

        last_loss.ok_or(BenchError::EmptyPass(Mode::Train))
    }
}
