//! Built-in synthetic test problems.
//!
//! Everything is generated in memory from the run's seed, so a
//! `(problem, seed)` pair always produces the same data and shuffles.

pub mod data;
pub mod logreg;
pub mod quadratic;
pub mod two_d;

pub use logreg::SyntheticLogReg;
pub use quadratic::QuadraticDeep;
pub use two_d::TwoDProblem;

use crate::error::{BenchError, Result};
use crate::problem::{ProblemSettings, TestProblem};

/// Names accepted by [`create_testproblem`].
pub const PROBLEM_NAMES: &[&str] = &[
    "two_d_rosenbrock",
    "two_d_beale",
    "quadratic_deep",
    "synthetic_logreg",
];

/// Instantiate a test problem by name. The problem is not set up yet.
pub fn create_testproblem(name: &str, settings: &ProblemSettings) -> Result<Box<dyn TestProblem>> {
    if settings.batch_size == 0 {
        return Err(BenchError::config("batch size must be at least 1"));
    }
    let problem: Box<dyn TestProblem> = match name {
        "two_d_rosenbrock" => Box::new(TwoDProblem::new(two_d::ROSENBROCK, settings)?),
        "two_d_beale" => Box::new(TwoDProblem::new(two_d::BEALE, settings)?),
        "quadratic_deep" => Box::new(QuadraticDeep::new(settings)?),
        "synthetic_logreg" => Box::new(SyntheticLogReg::new(settings)?),
        other => return Err(BenchError::UnknownProblem(other.to_string())),
    };
    Ok(problem)
}
