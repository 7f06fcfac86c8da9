//! Training infrastructure: evaluator, epoch loop, schedules, telemetry and output packaging.

pub mod driver;
pub mod evaluator;
pub mod lossless;
pub mod metrics;
pub mod output;
pub mod runner;
pub mod schedule;
pub mod telemetry;

pub use driver::{EpochLoop, LoopSettings, RunnerKind, TrainingParams};
pub use evaluator::{EvalSplit, Evaluation, evaluate};
pub use metrics::{AnalyzableTrainingParams, Metrics, Trajectories, abort_routine};
pub use output::{RunOutput, read_output, write_output};
pub use runner::{RunRequest, Runner};
pub use schedule::LrSchedule;
pub use telemetry::{JsonLinesSink, TelemetrySink};
