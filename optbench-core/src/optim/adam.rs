//! Adam with bias-corrected first and second moment estimates.

use crate::error::{BenchError, Result};
use crate::hyperparams::{HyperparameterSpec, Hyperparameters};
use crate::optim::{Optimizer, OptimizerFactory, check_shapes, zeroed_buffers};
use crate::params::ParameterSet;

const SPECS: &[HyperparameterSpec] = &[
    HyperparameterSpec::required("lr"),
    HyperparameterSpec::optional("beta1", 0.9),
    HyperparameterSpec::optional("beta2", 0.999),
    HyperparameterSpec::optional("eps", 1e-8),
];

pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    t: u64,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl Adam {
    pub fn new(params: &ParameterSet, lr: f64, beta1: f64, beta2: f64, eps: f64) -> Result<Self> {
        if lr < 0.0 || !lr.is_finite() {
            return Err(BenchError::config(format!("adam: invalid learning rate {lr}")));
        }
        for (name, beta) in [("beta1", beta1), ("beta2", beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(BenchError::config(format!("adam: {name} {beta} outside [0, 1)")));
            }
        }
        if eps <= 0.0 {
            return Err(BenchError::config(format!("adam: eps must be positive, got {eps}")));
        }
        Ok(Self {
            lr,
            beta1,
            beta2,
            eps,
            t: 0,
            m: zeroed_buffers(params),
            v: zeroed_buffers(params),
        })
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> u64 {
        self.t
    }
}

impl Optimizer for Adam {
    fn name(&self) -> &str {
        "adam"
    }

    fn step(&mut self, params: &mut ParameterSet) -> Result<()> {
        check_shapes("adam", &self.m, params)?;
        self.t += 1;
        let bc1 = 1.0 - self.beta1.powi(self.t as i32);
        let bc2 = 1.0 - self.beta2.powi(self.t as i32);

        for ((param, m), v) in params.iter_mut().zip(&mut self.m).zip(&mut self.v) {
            for (i, w) in param.value.iter_mut().enumerate() {
                let g = param.grad[i];
                m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
                v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;
                let m_hat = m[i] / bc1;
                let v_hat = v[i] / bc2;
                *w -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
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

#[derive(Debug, Clone, Copy, Default)]
pub struct AdamFactory;

impl OptimizerFactory for AdamFactory {
    fn name(&self) -> &str {
        "adam"
    }

    fn hyperparameter_specs(&self) -> &[HyperparameterSpec] {
        SPECS
    }

    fn build(
        &self,
        params: &ParameterSet,
        hyperparams: &Hyperparameters,
    ) -> Result<Box<dyn Optimizer>> {
        Ok(Box::new(Adam::new(
            params,
            hyperparams.require("adam", "lr")?,
            hyperparams.require("adam", "beta1")?,
            hyperparams.require("adam", "beta2")?,
            hyperparams.require("adam", "eps")?,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Parameter;

    #[test]
    fn test_first_step_moves_by_lr() {
        let mut p = Parameter::new("x", vec![1.0, -1.0]);
        p.grad = vec![4.0, -0.25];
        let mut params: ParameterSet = [p].into_iter().collect();
        let mut opt = Adam::new(&params, 0.01, 0.9, 0.999, 1e-8).unwrap();
        opt.step(&mut params).unwrap();
        let x = &params.get("x").unwrap().value;
        // Bias correction makes the first update lr * sign(g).
        assert!((x[0] - 0.99).abs() < 1e-6);
        assert!((x[1] + 0.99).abs() < 1e-6);
        assert_eq!(opt.steps(), 1);
    }

    #[test]
    fn test_factory_requires_resolved_hyperparams() {
        let params: ParameterSet = [Parameter::new("x", vec![0.0])].into_iter().collect();
        let partial = Hyperparameters::new().with("lr", 0.1);
        assert!(AdamFactory.build(&params, &partial).is_err());

        let resolved = partial.resolve("adam", AdamFactory.hyperparameter_specs()).unwrap();
        let opt = AdamFactory.build(&params, &resolved).unwrap();
        assert_eq!(opt.learning_rate(), 0.1);
    }
}
