//! `quadratic_deep`: a 100-dimensional noisy quadratic.
//!
//! Per-sample loss `0.5 * Σ h_i (θ_i - x_i)²` with `x ~ N(0, I)`. The Hessian
//! is diagonal with 90 eigenvalues in `[0, 1]` and 10 in `[30, 60]`, drawn
//! from a fixed seed so every run benchmarks the same landscape.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{BenchError, Result};
use crate::params::{Parameter, ParameterSet};
use crate::problem::{Batch, Mode, ProblemSettings, RegularizationCapability, TestProblem};
use crate::problems::data::{Dataset, standard_normal};

pub const NAME: &str = "quadratic_deep";
pub const DIM: usize = 100;
pub const TRAIN_SIZE: usize = 1_000;
pub const TEST_SIZE: usize = 1_000;
const HESSIAN_SEED: u64 = 42;

pub struct QuadraticDeep {
    batch_size: usize,
    rng: StdRng,
    hessian: Vec<f64>,
    dataset: Option<Dataset<Vec<f64>>>,
    params: ParameterSet,
    last_batch: Vec<Vec<f64>>,
}

impl QuadraticDeep {
    pub fn new(settings: &ProblemSettings) -> Result<Self> {
        if settings.weight_decay.is_some() {
            return Err(BenchError::config(format!(
                "{NAME} has no regularization; weight decay is not supported"
            )));
        }
        Ok(Self {
            batch_size: settings.batch_size,
            rng: StdRng::seed_from_u64(settings.random_seed),
            hessian: hessian_spectrum(),
            dataset: None,
            params: [Parameter::new("theta", vec![1.0; DIM])].into_iter().collect(),
            last_batch: Vec::new(),
        })
    }

    pub fn hessian(&self) -> &[f64] {
        &self.hessian
    }

    fn theta(&self) -> &[f64] {
        self.params
            .get("theta")
            .map(|p| p.value.as_slice())
            .unwrap_or(&[])
    }

    fn sample_loss(&self, theta: &[f64], x: &[f64]) -> f64 {
        0.5 * self
            .hessian
            .iter()
            .zip(theta.iter().zip(x))
            .map(|(h, (t, xi))| h * (t - xi).powi(2))
            .sum::<f64>()
    }
}

fn hessian_spectrum() -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(HESSIAN_SEED);
    let mut eigenvalues: Vec<f64> = (0..90).map(|_| rng.gen_range(0.0..1.0)).collect();
    eigenvalues.extend((0..10).map(|_| rng.gen_range(30.0..60.0)));
    eigenvalues
}

impl TestProblem for QuadraticDeep {
    fn name(&self) -> &str {
        NAME
    }

    fn set_up(&mut self) -> Result<RegularizationCapability> {
        if self.dataset.is_none() {
            let rng = &mut self.rng;
            let mut draw = |n: usize| -> Vec<Vec<f64>> {
                (0..n)
                    .map(|_| (0..DIM).map(|_| standard_normal(rng)).collect())
                    .collect()
            };
            let train = draw(TRAIN_SIZE);
            let test = draw(TEST_SIZE);
            self.dataset = Some(Dataset::new(train, test, self.batch_size)?);
        }
        Ok(RegularizationCapability::Absent)
    }

    fn init_pass(&mut self, mode: Mode) -> Result<()> {
        let dataset = self
            .dataset
            .as_mut()
            .ok_or_else(|| BenchError::problem(format!("{NAME} is not set up")))?;
        dataset.init_pass(mode, &mut self.rng);
        Ok(())
    }

    fn next_batch(&mut self) -> Result<Batch> {
        let dataset = self
            .dataset
            .as_mut()
            .ok_or_else(|| BenchError::problem(format!("{NAME} is not set up")))?;
        let Some(samples) = dataset.next_batch()? else {
            return Ok(Batch::EndOfPass);
        };
        let theta = self.theta();
        let loss = samples
            .iter()
            .map(|x| self.sample_loss(theta, x))
            .sum::<f64>()
            / samples.len() as f64;
        self.last_batch = samples;
        Ok(Batch::data(loss, 0.0))
    }

    fn backward(&mut self) -> Result<()> {
        if self.last_batch.is_empty() {
            return Err(BenchError::problem("backward called before any batch"));
        }
        let n = self.last_batch.len() as f64;
        let mut mean_x = vec![0.0; DIM];
        for x in &self.last_batch {
            for (m, xi) in mean_x.iter_mut().zip(x) {
                *m += xi / n;
            }
        }
        let hessian = &self.hessian;
        let theta = self
            .params
            .get_mut("theta")
            .ok_or_else(|| BenchError::problem("theta parameter missing"))?;
        for i in 0..DIM {
            theta.grad[i] += hessian[i] * (theta.value[i] - mean_x[i]);
        }
        Ok(())
    }

    fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrum_is_fixed_across_seeds() {
        let a = QuadraticDeep::new(&ProblemSettings::new(10, 1)).unwrap();
        let b = QuadraticDeep::new(&ProblemSettings::new(10, 2)).unwrap();
        assert_eq!(a.hessian(), b.hessian());
        assert_eq!(a.hessian().len(), DIM);
        assert_eq!(a.hessian().iter().filter(|h| **h >= 30.0).count(), 10);
    }

    #[test]
    fn test_gradient_points_towards_noise_mean() {
        let mut problem = QuadraticDeep::new(&ProblemSettings::new(TRAIN_SIZE, 3)).unwrap();
        problem.set_up().unwrap();
        problem.init_pass(Mode::Train).unwrap();
        assert!(matches!(problem.next_batch().unwrap(), Batch::Data(_)));
        problem.backward().unwrap();
        let theta = problem.parameters().get("theta").unwrap();
        // theta starts at 1.0 and the noise mean is close to 0.
        assert!(theta.grad.iter().zip(problem.hessian()).all(|(g, h)| g * h >= 0.0));
        assert!(matches!(problem.next_batch().unwrap(), Batch::EndOfPass));
    }
}
