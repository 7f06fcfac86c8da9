//! Epoch-indexed learning-rate schedule with multiplicative breakpoints.

use crate::error::{BenchError, Result};
use crate::optim::Optimizer;

/// Multiplies the optimizer's learning rate by `factors[i]` once its epoch
/// counter reaches `epochs[i]`. Factors compound: `[0.1, 0.1]` ends at 1% of
/// the initial rate.
///
/// The counter starts at 0 and [`LrSchedule::step`] advances it by one, so
/// the step taken before training epoch `e` moves the schedule to `e + 1`. A
/// breakpoint at 0 applies immediately on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct LrSchedule {
    initial_lr: f64,
    current_lr: f64,
    epochs: Vec<usize>,
    factors: Vec<f64>,
    epoch: usize,
}

impl LrSchedule {
    pub fn new(optimizer: &mut dyn Optimizer, epochs: &[usize], factors: &[f64]) -> Result<Self> {
        if epochs.len() != factors.len() {
            return Err(BenchError::config(format!(
                "learning-rate schedule has {} epochs but {} factors",
                epochs.len(),
                factors.len()
            )));
        }
        if epochs.windows(2).any(|w| w[0] >= w[1]) {
            return Err(BenchError::config(
                "learning-rate schedule epochs must be strictly increasing",
            ));
        }
        if let Some(bad) = factors.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            return Err(BenchError::config(format!(
                "learning-rate schedule factor {bad} must be a positive number"
            )));
        }

        let initial_lr = optimizer.learning_rate();
        let mut schedule = Self {
            initial_lr,
            current_lr: initial_lr,
            epochs: epochs.to_vec(),
            factors: factors.to_vec(),
            epoch: 0,
        };
        schedule.apply(optimizer);
        Ok(schedule)
    }

    /// Advance one epoch. Returns the new rate when a breakpoint was reached.
    pub fn step(&mut self, optimizer: &mut dyn Optimizer) -> Option<f64> {
        self.epoch += 1;
        self.apply(optimizer)
    }

    fn apply(&mut self, optimizer: &mut dyn Optimizer) -> Option<f64> {
        let index = self.epochs.iter().position(|&e| e == self.epoch)?;
        self.current_lr *= self.factors[index];
        optimizer.set_learning_rate(self.current_lr);
        Some(self.current_lr)
    }

    /// Whether `epoch` is one of the configured breakpoints.
    pub fn is_breakpoint(&self, epoch: usize) -> bool {
        self.epochs.contains(&epoch)
    }

    pub fn current_lr(&self) -> f64 {
        self.current_lr
    }

    pub fn initial_lr(&self) -> f64 {
        self.initial_lr
    }

    pub fn epoch(&self) -> usize {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::Sgd;
    use crate::params::{Parameter, ParameterSet};

    fn sgd(lr: f64) -> Sgd {
        let params: ParameterSet = [Parameter::new("x", vec![0.0])].into_iter().collect();
        Sgd::new(&params, lr, 0.0, false).unwrap()
    }

    #[test]
    fn test_factors_compound_at_breakpoints() {
        let mut opt = sgd(1.0);
        let mut schedule = LrSchedule::new(&mut opt, &[2, 4], &[0.1, 0.1]).unwrap();
        let hits: Vec<Option<f64>> = (0..5).map(|_| schedule.step(&mut opt)).collect();
        assert_eq!(hits[0], None);
        assert!((hits[1].unwrap() - 0.1).abs() < 1e-15);
        assert_eq!(hits[2], None);
        assert!((hits[3].unwrap() - 0.01).abs() < 1e-15);
        assert_eq!(hits[4], None);
        assert!((opt.learning_rate() - 0.01).abs() < 1e-15);
        assert_eq!(schedule.epoch(), 5);
        assert_eq!(schedule.initial_lr(), 1.0);
    }

    #[test]
    fn test_breakpoint_zero_applies_on_construction() {
        let mut opt = sgd(0.5);
        let schedule = LrSchedule::new(&mut opt, &[0], &[0.5]).unwrap();
        assert_eq!(schedule.current_lr(), 0.25);
        assert_eq!(opt.learning_rate(), 0.25);
    }

    #[test]
    fn test_breakpoint_lookup() {
        let mut opt = sgd(1.0);
        let schedule = LrSchedule::new(&mut opt, &[2, 4], &[0.1, 0.1]).unwrap();
        let breakpoints: Vec<usize> = (0..6).filter(|&e| schedule.is_breakpoint(e)).collect();
        assert_eq!(breakpoints, vec![2, 4]);
    }

    #[test]
    fn test_invalid_schedules() {
        let mut opt = sgd(0.1);
        assert!(LrSchedule::new(&mut opt, &[1, 2], &[0.1]).is_err());
        assert!(LrSchedule::new(&mut opt, &[3, 3], &[0.1, 0.1]).is_err());
        assert!(LrSchedule::new(&mut opt, &[1], &[0.0]).is_err());
        assert!(LrSchedule::new(&mut opt, &[], &[]).is_ok());
    }
}
