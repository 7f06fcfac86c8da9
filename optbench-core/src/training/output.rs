//! Run output record and its on-disk packaging.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::hyperparams::Hyperparameters;
use crate::training::driver::TrainingParams;
use crate::training::metrics::Metrics;

/// Everything persisted for one run: the settings that identify it and the
/// metrics measured. Holds only scalars and sequences of scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub testproblem: String,
    pub optimizer: String,
    pub batch_size: usize,
    pub num_epochs: usize,
    pub random_seed: u64,
    pub weight_decay: Option<f64>,
    pub optimizer_hyperparams: Hyperparameters,
    pub training_params: TrainingParams,
    #[serde(flatten)]
    pub metrics: Metrics,
}

/// `<testproblem>/<optimizer>/<settings>` relative to the output directory.
///
/// Runs that differ only in their seed share a folder.
pub fn run_folder(output: &RunOutput) -> PathBuf {
    let mut settings = format!(
        "num_epochs__{}__batch_size__{}",
        output.num_epochs, output.batch_size
    );
    if let Some(wd) = output.weight_decay {
        let _ = write!(settings, "__weight_decay__{}", format_value(wd));
    }
    for (name, value) in output.optimizer_hyperparams.iter() {
        let _ = write!(settings, "__{}__{}", name, format_value(value));
    }
    if let (Some(epochs), Some(factors)) = (
        &output.training_params.lr_sched_epochs,
        &output.training_params.lr_sched_factors,
    ) {
        settings.push_str("__lr_schedule");
        for (epoch, factor) in epochs.iter().zip(factors) {
            let _ = write!(settings, "__{}_{}", epoch, format_value(*factor));
        }
    }
    PathBuf::from(&output.testproblem)
        .join(&output.optimizer)
        .join(settings)
}

/// `random_seed__<seed>__<timestamp>.json`
pub fn file_name(output: &RunOutput, timestamp: DateTime<Utc>) -> String {
    format!(
        "random_seed__{}__{}.json",
        output.random_seed,
        timestamp.format("%Y-%m-%d-%H-%M-%S")
    )
}

/// Compact, filesystem-safe rendering of a float: `0.001` → `1e-3`.
fn format_value(value: f64) -> String {
    let plain = value.to_string();
    let scientific = format!("{value:e}");
    if scientific.len() < plain.len() {
        scientific
    } else {
        plain
    }
}

/// Serialize `output` under `output_dir` and return the file written.
pub fn write_output(output: &RunOutput, output_dir: &Path) -> Result<PathBuf> {
    let folder = output_dir.join(run_folder(output));
    std::fs::create_dir_all(&folder)?;
    let path = folder.join(file_name(output, Utc::now()));

    let content = serde_json::to_string_pretty(output)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &content)?;
    std::fs::rename(&tmp, &path)?;
    Ok(path)
}

pub fn read_output(path: &Path) -> Result<RunOutput> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
