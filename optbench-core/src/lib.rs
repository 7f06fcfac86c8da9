//! # optbench-core: optimizer benchmarking harness
//!
//! Runs an optimizer against a standardized test problem for a fixed number of
//! epochs and records train/test loss and accuracy trajectories in a fixed-shape
//! output record that can be compared across optimizers.
//!
//! The heart of the crate is [`training::EpochLoop`]: it evaluates on the
//! train-eval and test splits before every epoch and once more after the last
//! one, trains in between, and freezes the trajectories if the training loss
//! diverges.

// Foundation
pub mod config;
pub mod error;
pub mod hyperparams;
pub mod params;

// Adapters
pub mod optim;
pub mod problem;
pub mod problems;

// Runner
pub mod training;

// Re-exports
pub use config::{BenchConfig, load_config};
pub use error::{BenchError, Result};
pub use hyperparams::{HyperparameterSpec, Hyperparameters};
pub use optim::{Optimizer, OptimizerFactory, optimizer_factory};
pub use params::{Parameter, ParameterSet};
pub use problem::{Batch, BatchResult, Mode, ProblemSettings, RegularizationCapability, TestProblem};
pub use problems::create_testproblem;
pub use training::{RunOutput, RunRequest, Runner, RunnerKind, TrainingParams};
