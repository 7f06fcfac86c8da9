//! Stochastic gradient descent with optional (Nesterov) momentum.
//!
//! ```text
//! buf = momentum * buf + grad
//! d   = grad + momentum * buf   (nesterov)
//!     = buf                     (otherwise)
//! θ   = θ - lr * d
//! ```

use crate::error::{BenchError, Result};
use crate::hyperparams::{HyperparameterSpec, Hyperparameters};
use crate::optim::{Optimizer, OptimizerFactory, check_shapes, zeroed_buffers};
use crate::params::ParameterSet;

const SPECS: &[HyperparameterSpec] = &[
    HyperparameterSpec::required("lr"),
    HyperparameterSpec::optional("momentum", 0.0),
    HyperparameterSpec::optional("nesterov", 0.0),
];

pub struct Sgd {
    lr: f64,
    momentum: f64,
    nesterov: bool,
    velocity: Vec<Vec<f64>>,
}

impl Sgd {
    pub fn new(params: &ParameterSet, lr: f64, momentum: f64, nesterov: bool) -> Result<Self> {
        if lr < 0.0 || !lr.is_finite() {
            return Err(BenchError::config(format!("sgd: invalid learning rate {lr}")));
        }
        if !(0.0..1.0).contains(&momentum) {
            return Err(BenchError::config(format!("sgd: momentum {momentum} outside [0, 1)")));
        }
        if nesterov && momentum == 0.0 {
            return Err(BenchError::config("sgd: nesterov momentum requires momentum > 0"));
        }
        Ok(Self {
            lr,
            momentum,
            nesterov,
            velocity: zeroed_buffers(params),
        })
    }
}

impl Optimizer for Sgd {
    fn name(&self) -> &str {
        "sgd"
    }

    fn step(&mut self, params: &mut ParameterSet) -> Result<()> {
        check_shapes("sgd", &self.velocity, params)?;
        for (param, buf) in params.iter_mut().zip(self.velocity.iter_mut()) {
            for ((w, g), v) in param.value.iter_mut().zip(&param.grad).zip(buf.iter_mut()) {
                let direction = if self.momentum == 0.0 {
                    *g
                } else {
                    *v = self.momentum * *v + g;
                    if self.nesterov { g + self.momentum * *v } else { *v }
                };
                *w -= self.lr * direction;
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

/// Factory for [`Sgd`]; `nesterov` is a 0/1 flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct SgdFactory;

impl OptimizerFactory for SgdFactory {
    fn name(&self) -> &str {
        "sgd"
    }

    fn hyperparameter_specs(&self) -> &[HyperparameterSpec] {
        SPECS
    }

    fn build(
        &self,
        params: &ParameterSet,
        hyperparams: &Hyperparameters,
    ) -> Result<Box<dyn Optimizer>> {
        let lr = hyperparams.require("sgd", "lr")?;
        let momentum = hyperparams.get("momentum").unwrap_or(0.0);
        let nesterov = hyperparams.get("nesterov").unwrap_or(0.0) != 0.0;
        Ok(Box::new(Sgd::new(params, lr, momentum, nesterov)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameter;

    fn single(value: f64, grad: f64) -> ParameterSet {
        let mut p = Parameter::new("x", vec![value]);
        p.grad[0] = grad;
        [p].into_iter().collect()
    }

    #[test]
    fn test_plain_step() {
        let mut params = single(1.0, 2.0);
        let mut opt = Sgd::new(&params, 0.1, 0.0, false).unwrap();
        opt.step(&mut params).unwrap();
        assert!((params.get("x").unwrap().value[0] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_momentum_accumulates() {
        let mut params = single(0.0, 1.0);
        let mut opt = Sgd::new(&params, 1.0, 0.5, false).unwrap();
        opt.step(&mut params).unwrap(); // buf = 1, x = -1
        opt.step(&mut params).unwrap(); // buf = 1.5, x = -2.5
        assert!((params.get("x").unwrap().value[0] + 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_nesterov_looks_ahead() {
        let mut params = single(0.0, 1.0);
        let mut opt = Sgd::new(&params, 1.0, 0.5, true).unwrap();
        opt.step(&mut params).unwrap(); // buf = 1, d = 1.5
        assert!((params.get("x").unwrap().value[0] + 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_settings() {
        let params = single(0.0, 0.0);
        assert!(Sgd::new(&params, -1.0, 0.0, false).is_err());
        assert!(Sgd::new(&params, 0.1, 1.0, false).is_err());
        assert!(Sgd::new(&params, 0.1, 0.0, true).is_err());
    }

    #[test]
    fn test_shape_change_is_rejected() {
        let params = single(0.0, 0.0);
        let mut opt = Sgd::new(&params, 0.1, 0.0, false).unwrap();
        let mut other: ParameterSet = [Parameter::new("x", vec![0.0, 0.0])].into_iter().collect();
        assert!(opt.step(&mut other).is_err());
    }
}
