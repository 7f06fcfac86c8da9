//! `synthetic_logreg`: binary logistic regression on Gaussian features.
//!
//! Labels come from a hidden linear model plus label noise. The weights
//! (not the bias) carry an L2 penalty `0.5 * weight_decay * ||w||²`, which is
//! reported through the regularization capability when `weight_decay > 0`.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{BenchError, Result};
use crate::params::{Parameter, ParameterSet};
use crate::problem::{Batch, Mode, ProblemSettings, RegularizationCapability, TestProblem};
use crate::problems::data::{Dataset, standard_normal};

pub const NAME: &str = "synthetic_logreg";
pub const FEATURES: usize = 10;
pub const TRAIN_SIZE: usize = 2_000;
pub const TEST_SIZE: usize = 500;
pub const DEFAULT_WEIGHT_DECAY: f64 = 1e-3;
const LABEL_NOISE: f64 = 0.5;

#[derive(Debug, Clone)]
struct Sample {
    features: Vec<f64>,
    label: f64,
}

pub struct SyntheticLogReg {
    batch_size: usize,
    weight_decay: f64,
    rng: StdRng,
    dataset: Option<Dataset<Sample>>,
    params: ParameterSet,
    last_batch: Vec<Sample>,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Numerically stable binary cross-entropy on the logit `z`.
fn cross_entropy(z: f64, label: f64) -> f64 {
    z.max(0.0) - label * z + (-z.abs()).exp().ln_1p()
}

impl SyntheticLogReg {
    pub fn new(settings: &ProblemSettings) -> Result<Self> {
        let weight_decay = settings.weight_decay.unwrap_or(DEFAULT_WEIGHT_DECAY);
        if weight_decay < 0.0 || !weight_decay.is_finite() {
            return Err(BenchError::config(format!(
                "{NAME}: weight decay must be a non-negative number, got {weight_decay}"
            )));
        }
        Ok(Self {
            batch_size: settings.batch_size,
            weight_decay,
            rng: StdRng::seed_from_u64(settings.random_seed),
            dataset: None,
            params: [
                Parameter::new("weights", vec![0.0; FEATURES]),
                Parameter::new("bias", vec![0.0]),
            ]
            .into_iter()
            .collect(),
            last_batch: Vec::new(),
        })
    }

    pub fn weight_decay(&self) -> f64 {
        self.weight_decay
    }

    fn capability(&self) -> RegularizationCapability {
        if self.weight_decay > 0.0 {
            RegularizationCapability::Present
        } else {
            RegularizationCapability::Absent
        }
    }

    fn weights_and_bias(&self) -> Result<(&[f64], f64)> {
        let weights = self
            .params
            .get("weights")
            .ok_or_else(|| BenchError::problem("weights parameter missing"))?;
        let bias = self
            .params
            .get("bias")
            .ok_or_else(|| BenchError::problem("bias parameter missing"))?;
        Ok((&weights.value, bias.value[0]))
    }

    fn logit(weights: &[f64], bias: f64, features: &[f64]) -> f64 {
        weights.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + bias
    }
}

impl TestProblem for SyntheticLogReg {
    fn name(&self) -> &str {
        NAME
    }

    fn set_up(&mut self) -> Result<RegularizationCapability> {
        if self.dataset.is_none() {
            let rng = &mut self.rng;
            let true_weights: Vec<f64> = (0..FEATURES).map(|_| standard_normal(rng)).collect();
            let mut draw = |n: usize| -> Vec<Sample> {
                (0..n)
                    .map(|_| {
                        let features: Vec<f64> =
                            (0..FEATURES).map(|_| standard_normal(rng)).collect();
                        let score = Self::logit(&true_weights, 0.0, &features)
                            + LABEL_NOISE * standard_normal(rng);
                        Sample {
                            features,
                            label: if score > 0.0 { 1.0 } else { 0.0 },
                        }
                    })
                    .collect()
            };
            let train = draw(TRAIN_SIZE);
            let test = draw(TEST_SIZE);
            self.dataset = Some(Dataset::new(train, test, self.batch_size)?);
        }
        Ok(self.capability())
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
        let (weights, bias) = self.weights_and_bias()?;
        let mut loss = 0.0;
        let mut correct = 0usize;
        for sample in &samples {
            let z = Self::logit(weights, bias, &sample.features);
            loss += cross_entropy(z, sample.label);
            if (z > 0.0) == (sample.label > 0.5) {
                correct += 1;
            }
        }
        let n = samples.len() as f64;
        self.last_batch = samples;
        Ok(Batch::data(loss / n, correct as f64 / n))
    }

    fn backward(&mut self) -> Result<()> {
        if self.last_batch.is_empty() {
            return Err(BenchError::problem("backward called before any batch"));
        }
        let (weights, bias) = self.weights_and_bias()?;
        let n = self.last_batch.len() as f64;
        let mut grad_w = vec![0.0; FEATURES];
        let mut grad_b = 0.0;
        for sample in &self.last_batch {
            let residual = sigmoid(Self::logit(weights, bias, &sample.features)) - sample.label;
            for (g, x) in grad_w.iter_mut().zip(&sample.features) {
                *g += residual * x / n;
            }
            grad_b += residual / n;
        }
        if self.capability().is_present() {
            for (g, w) in grad_w.iter_mut().zip(weights) {
                *g += self.weight_decay * w;
            }
        }

        if let Some(p) = self.params.get_mut("weights") {
            for (acc, g) in p.grad.iter_mut().zip(&grad_w) {
                *acc += g;
            }
        }
        if let Some(p) = self.params.get_mut("bias") {
            p.grad[0] += grad_b;
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
        let (weights, _) = self.weights_and_bias()?;
        Ok(0.5 * self.weight_decay * weights.iter().map(|w| w * w).sum::<f64>())
    }
}
