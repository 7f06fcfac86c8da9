//! Optimizer adapters: the algorithms under benchmark.

pub mod adam;
pub mod sgd;

pub use adam::{Adam, AdamFactory};
pub use sgd::{Sgd, SgdFactory};

use crate::error::{BenchError, Result};
use crate::hyperparams::{HyperparameterSpec, Hyperparameters};
use crate::params::ParameterSet;

/// Names accepted by [`optimizer_factory`].
pub const OPTIMIZER_NAMES: &[&str] = &["sgd", "adam"];

/// An optimizer bound to one parameter set for the duration of a run.
///
/// Internal state (momentum buffers, step counts) changes only through
/// [`Optimizer::step`].
pub trait Optimizer {
    fn name(&self) -> &str;

    fn zero_grad(&mut self, params: &mut ParameterSet) {
        params.zero_grad();
    }

    /// Apply one update using the gradients currently stored in `params`.
    fn step(&mut self, params: &mut ParameterSet) -> Result<()>;

    fn learning_rate(&self) -> f64;

    fn set_learning_rate(&mut self, lr: f64);
}

/// Builds an [`Optimizer`] from trainable parameters and named hyperparameters.
pub trait OptimizerFactory {
    fn name(&self) -> &str;

    fn hyperparameter_specs(&self) -> &[HyperparameterSpec];

    /// `hyperparams` has already been resolved against
    /// [`OptimizerFactory::hyperparameter_specs`].
    fn build(
        &self,
        params: &ParameterSet,
        hyperparams: &Hyperparameters,
    ) -> Result<Box<dyn Optimizer>>;
}

/// Look up a built-in optimizer by name.
pub fn optimizer_factory(name: &str) -> Result<Box<dyn OptimizerFactory>> {
    match name {
        "sgd" => Ok(Box::new(SgdFactory)),
        "adam" => Ok(Box::new(AdamFactory)),
        other => Err(BenchError::UnknownOptimizer(other.to_string())),
    }
}

/// Per-parameter state buffers shaped like the parameter set they serve.
pub(crate) fn zeroed_buffers(params: &ParameterSet) -> Vec<Vec<f64>> {
    params.shapes().into_iter().map(|n| vec![0.0; n]).collect()
}

pub(crate) fn check_shapes(
    optimizer: &str,
    buffers: &[Vec<f64>],
    params: &ParameterSet,
) -> Result<()> {
    let matches = buffers.len() == params.len()
        && buffers.iter().zip(params.iter()).all(|(b, p)| b.len() == p.len());
    if matches {
        Ok(())
    } else {
        Err(BenchError::optimizer(format!(
            "{optimizer}: parameter shapes changed since construction"
        )))
    }
}
