//! Noisy two-dimensional test functions.
//!
//! Each sample carries a noise pair `(x, y)`; the per-sample loss is
//! `f(u, v) + x * u + y * v`. Training noise is standard normal scaled by
//! [`NOISE_LEVEL`], test noise is zero so the test loss equals `f(u, v)`.
//! These problems have no accuracy; batches report `0.0`.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{BenchError, Result};
use crate::params::{Parameter, ParameterSet};
use crate::problem::{Batch, Mode, ProblemSettings, RegularizationCapability, TestProblem};
use crate::problems::data::{Dataset, standard_normal};

pub const TRAIN_SIZE: usize = 10_000;
pub const TEST_SIZE: usize = 1_000;
pub const NOISE_LEVEL: f64 = 1.0;

/// A deterministic 2-D objective with its gradient.
#[derive(Debug, Clone, Copy)]
pub struct Objective {
    pub name: &'static str,
    pub start: (f64, f64),
    pub value: fn(f64, f64) -> f64,
    pub gradient: fn(f64, f64) -> (f64, f64),
}

pub const ROSENBROCK: Objective = Objective {
    name: "two_d_rosenbrock",
    start: (-0.5, 1.5),
    value: rosenbrock,
    gradient: rosenbrock_gradient,
};

pub const BEALE: Objective = Objective {
    name: "two_d_beale",
    start: (-4.5, 4.5),
    value: beale,
    gradient: beale_gradient,
};

pub fn rosenbrock(u: f64, v: f64) -> f64 {
    (1.0 - u).powi(2) + 100.0 * (v - u * u).powi(2)
}

fn rosenbrock_gradient(u: f64, v: f64) -> (f64, f64) {
    let du = -2.0 * (1.0 - u) - 400.0 * u * (v - u * u);
    let dv = 200.0 * (v - u * u);
    (du, dv)
}

pub fn beale(u: f64, v: f64) -> f64 {
    let (a, b, c) = beale_terms(u, v);
    a * a + b * b + c * c
}

fn beale_terms(u: f64, v: f64) -> (f64, f64, f64) {
    (
        1.5 - u + u * v,
        2.25 - u + u * v * v,
        2.625 - u + u * v * v * v,
    )
}

fn beale_gradient(u: f64, v: f64) -> (f64, f64) {
    let (a, b, c) = beale_terms(u, v);
    let du = 2.0 * a * (v - 1.0) + 2.0 * b * (v * v - 1.0) + 2.0 * c * (v * v * v - 1.0);
    let dv = 2.0 * a * u + 2.0 * b * 2.0 * u * v + 2.0 * c * 3.0 * u * v * v;
    (du, dv)
}

pub struct TwoDProblem {
    objective: Objective,
    batch_size: usize,
    rng: StdRng,
    dataset: Option<Dataset<[f64; 2]>>,
    params: ParameterSet,
    last_batch: Vec<[f64; 2]>,
}

impl TwoDProblem {
    pub fn new(objective: Objective, settings: &ProblemSettings) -> Result<Self> {
        if settings.weight_decay.is_some() {
            return Err(BenchError::config(format!(
                "{} has no regularization; weight decay is not supported",
                objective.name
            )));
        }
        let (u, v) = objective.start;
        Ok(Self {
            objective,
            batch_size: settings.batch_size,
            rng: StdRng::seed_from_u64(settings.random_seed),
            dataset: None,
            params: [Parameter::new("u", vec![u]), Parameter::new("v", vec![v])]
                .into_iter()
                .collect(),
            last_batch: Vec::new(),
        })
    }

    fn coordinates(&self) -> (f64, f64) {
        let value = |name: &str| self.params.get(name).map_or(f64::NAN, |p| p.value[0]);
        (value("u"), value("v"))
    }

    fn dataset_mut(&mut self) -> Result<&mut Dataset<[f64; 2]>> {
        self.dataset
            .as_mut()
            .ok_or_else(|| BenchError::problem(format!("{} is not set up", self.objective.name)))
    }
}

impl TestProblem for TwoDProblem {
    fn name(&self) -> &str {
        self.objective.name
    }

    fn set_up(&mut self) -> Result<RegularizationCapability> {
        if self.dataset.is_none() {
            let rng = &mut self.rng;
            let train = (0..TRAIN_SIZE)
                .map(|_| {
                    [
                        NOISE_LEVEL * standard_normal(rng),
                        NOISE_LEVEL * standard_normal(rng),
                    ]
                })
                .collect();
            let test = vec![[0.0, 0.0]; TEST_SIZE];
            self.dataset = Some(Dataset::new(train, test, self.batch_size)?);
        }
        Ok(RegularizationCapability::Absent)
    }

    fn init_pass(&mut self, mode: Mode) -> Result<()> {
        let dataset = self
            .dataset
            .as_mut()
            .ok_or_else(|| BenchError::problem(format!("{} is not set up", self.objective.name)))?;
        dataset.init_pass(mode, &mut self.rng);
        Ok(())
    }

    fn next_batch(&mut self) -> Result<Batch> {
        let Some(samples) = self.dataset_mut()?.next_batch()? else {
            return Ok(Batch::EndOfPass);
        };
        let (u, v) = self.coordinates();
        let base = (self.objective.value)(u, v);
        let loss = samples
            .iter()
            .map(|[x, y]| base + x * u + y * v)
            .sum::<f64>()
            / samples.len() as f64;
        self.last_batch = samples;
        Ok(Batch::data(loss, 0.0))
    }

    fn backward(&mut self) -> Result<()> {
        if self.last_batch.is_empty() {
            return Err(BenchError::problem("backward called before any batch"));
        }
        let (u, v) = self.coordinates();
        let (mut du, mut dv) = (self.objective.gradient)(u, v);
        let n = self.last_batch.len() as f64;
        du += self.last_batch.iter().map(|s| s[0]).sum::<f64>() / n;
        dv += self.last_batch.iter().map(|s| s[1]).sum::<f64>() / n;
        for (name, g) in [("u", du), ("v", dv)] {
            if let Some(p) = self.params.get_mut(name) {
                p.grad[0] += g;
            }
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
