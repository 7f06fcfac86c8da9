//! Runner entry point: create the problem, drive the epoch loop, package the result.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::BenchConfig;
use crate::error::{BenchError, Result};
use crate::hyperparams::Hyperparameters;
use crate::optim::OptimizerFactory;
use crate::problem::ProblemSettings;
use crate::problems::create_testproblem;
use crate::training::driver::{EpochLoop, LoopSettings, RunnerKind, TrainingParams};
use crate::training::output::{RunOutput, write_output};
use crate::training::telemetry::JsonLinesSink;

/// One benchmark run. Unset options fall back to the runner's [`BenchConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub testproblem: String,
    pub hyperparams: Hyperparameters,
    pub batch_size: Option<usize>,
    pub num_epochs: Option<usize>,
    pub random_seed: u64,
    pub weight_decay: Option<f64>,
    pub output_dir: Option<PathBuf>,
    pub no_logs: Option<bool>,
    pub train_log_interval: Option<usize>,
    pub print_train_iter: Option<bool>,
    pub tb_log: Option<bool>,
    pub tb_log_dir: Option<PathBuf>,
    pub training_params: TrainingParams,
}

impl RunRequest {
    pub const DEFAULT_SEED: u64 = 42;

    pub fn new(testproblem: impl Into<String>, hyperparams: Hyperparameters) -> Self {
        Self {
            testproblem: testproblem.into(),
            hyperparams,
            batch_size: None,
            num_epochs: None,
            random_seed: Self::DEFAULT_SEED,
            weight_decay: None,
            output_dir: None,
            no_logs: None,
            train_log_interval: None,
            print_train_iter: None,
            tb_log: None,
            tb_log_dir: None,
            training_params: TrainingParams::default(),
        }
    }
}

/// Runs an optimizer on named test problems following one [`RunnerKind`].
pub struct Runner {
    factory: Box<dyn OptimizerFactory>,
    kind: RunnerKind,
    config: BenchConfig,
}

impl Runner {
    pub fn new(factory: Box<dyn OptimizerFactory>, kind: RunnerKind) -> Self {
        Self {
            factory,
            kind,
            config: BenchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BenchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn kind(&self) -> RunnerKind {
        self.kind
    }

    pub fn optimizer_name(&self) -> &str {
        self.factory.name()
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Execute `request` and return its output record. The record is also
    /// persisted unless `no_logs` is set. Configuration errors abort before
    /// anything is written.
    pub fn run(&self, request: RunRequest) -> Result<RunOutput> {
        let defaults = self.config.problem_defaults(&request.testproblem);
        let batch_size = request
            .batch_size
            .or(defaults.map(|d| d.batch_size))
            .ok_or_else(|| {
                BenchError::config(format!(
                    "no batch size given and no default for {}",
                    request.testproblem
                ))
            })?;
        let num_epochs = request
            .num_epochs
            .or(defaults.map(|d| d.num_epochs))
            .ok_or_else(|| {
                BenchError::config(format!(
                    "no epoch count given and no default for {}",
                    request.testproblem
                ))
            })?;

        if self.kind == RunnerKind::Standard && !request.training_params.is_empty() {
            return Err(BenchError::config(
                "the standard runner does not accept a learning-rate schedule",
            ));
        }

        let optimizer = self.factory.name().to_string();
        let hyperparams = request
            .hyperparams
            .resolve(&optimizer, self.factory.hyperparameter_specs())?;

        let settings = ProblemSettings {
            batch_size,
            weight_decay: request.weight_decay,
            random_seed: request.random_seed,
        };
        let mut problem = create_testproblem(&request.testproblem, &settings)?;

        let loop_settings = LoopSettings {
            num_epochs,
            train_log_interval: request
                .train_log_interval
                .unwrap_or(self.config.train_log_interval),
            print_train_iter: request
                .print_train_iter
                .unwrap_or(self.config.print_train_iter),
        };
        let output_dir = request
            .output_dir
            .clone()
            .unwrap_or_else(|| self.config.output_dir.clone());

        info!(
            testproblem = %request.testproblem,
            optimizer = %optimizer,
            batch_size,
            num_epochs,
            seed = request.random_seed,
            "Starting run"
        );

        let tb_log = request.tb_log.unwrap_or(self.config.tb_log);
        let mut sink = match (tb_log, self.kind) {
            (true, RunnerKind::Standard) => {
                let dir = request
                    .tb_log_dir
                    .clone()
                    .unwrap_or_else(|| self.config.telemetry_dir(&output_dir));
                match JsonLinesSink::create(&dir) {
                    Ok(sink) => Some(sink),
                    Err(e) => {
                        warn!("Not possible to use telemetry logging. Reason: {}", e);
                        None
                    }
                }
            }
            (true, RunnerKind::LearningRateSchedule) => {
                warn!("Telemetry logging is only supported by the standard runner");
                None
            }
            (false, _) => None,
        };

        let mut epoch_loop = match self.kind {
            RunnerKind::Standard => EpochLoop::standard(loop_settings),
            RunnerKind::LearningRateSchedule => {
                EpochLoop::learning_rate_schedule(loop_settings, request.training_params.clone())
            }
        };
        if let Some(sink) = sink.as_mut() {
            epoch_loop = epoch_loop.with_telemetry(sink);
        }

        let metrics = epoch_loop.run(problem.as_mut(), self.factory.as_ref(), &hyperparams)?;

        let output = RunOutput {
            testproblem: request.testproblem,
            optimizer,
            batch_size,
            num_epochs,
            random_seed: request.random_seed,
            weight_decay: request.weight_decay,
            optimizer_hyperparams: hyperparams,
            training_params: request.training_params,
            metrics,
        };

        if !request.no_logs.unwrap_or(self.config.no_logs) {
            let path = write_output(&output, &output_dir)?;
            info!(path = %path.display(), "Run output written");
        }

        Ok(output)
    }
}
