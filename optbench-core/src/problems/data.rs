//! In-memory dataset splits with restartable, fully buffered passes.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{BenchError, Result};
use crate::problem::Mode;

/// Train and test samples of a synthetic problem.
///
/// * `Train` passes are reshuffled on every `init_pass` and drop the last
///   incomplete batch.
/// * `TrainEval` passes walk a fixed prefix of the training data the size of
///   the test set.
/// * `Test` passes walk the test data in order; the last batch may be short.
pub struct Dataset<S> {
    train: Vec<S>,
    test: Vec<S>,
    batch_size: usize,
    order: Vec<usize>,
    position: usize,
    mode: Option<Mode>,
}

impl<S: Clone> Dataset<S> {
    pub fn new(train: Vec<S>, test: Vec<S>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(BenchError::config("batch size must be at least 1"));
        }
        Ok(Self {
            train,
            test,
            batch_size,
            order: Vec::new(),
            position: 0,
            mode: None,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    pub fn test_len(&self) -> usize {
        self.test.len()
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn init_pass(&mut self, mode: Mode, rng: &mut StdRng) {
        self.order = match mode {
            Mode::Train => {
                let mut order: Vec<usize> = (0..self.train.len()).collect();
                order.shuffle(rng);
                order.truncate(self.train.len() - self.train.len() % self.batch_size);
                order
            }
            Mode::TrainEval => (0..self.test.len().min(self.train.len())).collect(),
            Mode::Test => (0..self.test.len()).collect(),
        };
        self.position = 0;
        self.mode = Some(mode);
    }

    /// Samples of the next batch, or `None` once the pass is exhausted.
    pub fn next_batch(&mut self) -> Result<Option<Vec<S>>> {
        let mode = self
            .mode
            .ok_or_else(|| BenchError::problem("next_batch called before init_pass"))?;
        if self.position >= self.order.len() {
            return Ok(None);
        }
        let end = (self.position + self.batch_size).min(self.order.len());
        let source = match mode {
            Mode::Test => &self.test,
            Mode::Train | Mode::TrainEval => &self.train,
        };
        let batch = self.order[self.position..end]
            .iter()
            .map(|&i| source[i].clone())
            .collect();
        self.position = end;
        Ok(Some(batch))
    }
}

/// Standard normal sample via the Box–Muller transform.
pub fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.r#gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.r#gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
