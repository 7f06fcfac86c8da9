//! CLI subcommand handlers.

use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

use optbench_core::config::{BenchConfig, load_config};
use optbench_core::optim::OPTIMIZER_NAMES;
use optbench_core::problems::PROBLEM_NAMES;
use optbench_core::training::RunOutput;
use optbench_core::{
    Hyperparameters, RunRequest, Runner, RunnerKind, TrainingParams, optimizer_factory,
};

use crate::{Commands, ConfigAction};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum RunnerChoice {
    /// Fixed hyperparameters, records the minibatch loss log
    #[default]
    Standard,
    /// Epoch-wise learning-rate schedule
    LrSchedule,
}

impl From<RunnerChoice> for RunnerKind {
    fn from(choice: RunnerChoice) -> Self {
        match choice {
            RunnerChoice::Standard => RunnerKind::Standard,
            RunnerChoice::LrSchedule => RunnerKind::LearningRateSchedule,
        }
    }
}

#[derive(clap::Args, Debug)]
pub(crate) struct RunArgs {
    /// Test problem to run (see `optbench list`)
    testproblem: String,

    /// Optimizer to benchmark
    #[arg(short, long, default_value = "sgd")]
    optimizer: String,

    /// Runner variant
    #[arg(long, value_enum, default_value_t)]
    runner: RunnerChoice,

    /// Optimizer hyperparameter, repeatable (e.g. -H lr=0.01 -H momentum=0.9)
    #[arg(short = 'H', long = "hyperparam", value_name = "NAME=VALUE")]
    hyperparams: Vec<String>,

    /// Batch size (defaults to the test problem's setting)
    #[arg(short = 'b', long)]
    batch_size: Option<usize>,

    /// Number of training epochs (defaults to the test problem's setting)
    #[arg(short = 'N', long)]
    num_epochs: Option<usize>,

    #[arg(short = 'r', long, default_value_t = RunRequest::DEFAULT_SEED)]
    random_seed: u64,

    /// Weight decay for problems with a regularization term
    #[arg(long)]
    weight_decay: Option<f64>,

    /// Root directory for run outputs
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Do not write the run output
    #[arg(long)]
    no_logs: bool,

    /// Sample the training loss every this many batches
    #[arg(long)]
    train_log_interval: Option<usize>,

    /// Log every sampled training loss
    #[arg(long)]
    print_train_iter: bool,

    /// Write sampled training losses to a telemetry log
    #[arg(long)]
    tb_log: bool,

    #[arg(long)]
    tb_log_dir: Option<PathBuf>,

    /// Learning-rate schedule breakpoints, comma separated (lr-schedule runner)
    #[arg(long, value_delimiter = ',')]
    lr_sched_epochs: Option<Vec<usize>>,

    /// Learning-rate factors matching --lr-sched-epochs
    #[arg(long, value_delimiter = ',')]
    lr_sched_factors: Option<Vec<f64>>,
}

impl RunArgs {
    fn to_request(&self) -> anyhow::Result<RunRequest> {
        let hyperparams =
            Hyperparameters::from_assignments(self.hyperparams.iter().map(String::as_str))?;
        let mut request = RunRequest::new(&self.testproblem, hyperparams);
        request.batch_size = self.batch_size;
        request.num_epochs = self.num_epochs;
        request.random_seed = self.random_seed;
        request.weight_decay = self.weight_decay;
        request.output_dir = self.output_dir.clone();
        request.no_logs = self.no_logs.then_some(true);
        request.train_log_interval = self.train_log_interval;
        request.print_train_iter = self.print_train_iter.then_some(true);
        request.tb_log = self.tb_log.then_some(true);
        request.tb_log_dir = self.tb_log_dir.clone();
        request.training_params = TrainingParams {
            lr_sched_epochs: self.lr_sched_epochs.clone(),
            lr_sched_factors: self.lr_sched_factors.clone(),
        };
        Ok(request)
    }
}

/// Handle a CLI subcommand.
pub(crate) fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => handle_run(args, workspace, config_file),
        Commands::List { json } => handle_list(json, workspace, config_file),
        Commands::Config { action } => handle_config(action, workspace, config_file),
    }
}

fn load(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<BenchConfig> {
    load_config(Some(workspace), config_file)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
}

fn handle_run(args: RunArgs, workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<()> {
    let config = load(workspace, config_file)?;
    let factory = optimizer_factory(&args.optimizer)?;
    let runner = Runner::new(factory, args.runner.into()).with_config(config);

    let request = args.to_request()?;
    let output = runner
        .run(request)
        .with_context(|| format!("Run of {} on {} failed", args.optimizer, args.testproblem))?;

    print_summary(&output);
    Ok(())
}

fn print_summary(output: &RunOutput) {
    let metrics = &output.metrics;
    println!(
        "{} / {} ({} epochs, batch size {}, seed {})",
        output.testproblem,
        output.optimizer,
        output.num_epochs,
        output.batch_size,
        output.random_seed
    );
    if let Some(epoch) = metrics.diverged_at_epoch {
        println!("  diverged during epoch {epoch}; trajectories frozen");
    }
    if let Some(loss) = metrics.final_test_loss() {
        println!("  final test loss:     {loss}");
    }
    if let Some(acc) = metrics.final_test_accuracy().filter(|a| *a != 0.0) {
        println!("  final test accuracy: {acc:.4}");
    }
}

#[derive(Debug, Serialize)]
struct ProblemListing {
    name: &'static str,
    batch_size: Option<usize>,
    num_epochs: Option<usize>,
}

#[derive(Debug, Serialize)]
struct OptimizerListing {
    name: &'static str,
    /// `None` marks a required hyperparameter.
    hyperparams: Vec<(&'static str, Option<f64>)>,
}

#[derive(Debug, Serialize)]
struct Listing {
    problems: Vec<ProblemListing>,
    optimizers: Vec<OptimizerListing>,
}

fn listing(config: &BenchConfig) -> anyhow::Result<Listing> {
    let problems = PROBLEM_NAMES
        .iter()
        .map(|&name| {
            let defaults = config.problem_defaults(name);
            ProblemListing {
                name,
                batch_size: defaults.map(|d| d.batch_size),
                num_epochs: defaults.map(|d| d.num_epochs),
            }
        })
        .collect();

    let optimizers = OPTIMIZER_NAMES
        .iter()
        .map(|&name| -> anyhow::Result<OptimizerListing> {
            let factory = optimizer_factory(name)?;
            Ok(OptimizerListing {
                name,
                hyperparams: factory
                    .hyperparameter_specs()
                    .iter()
                    .map(|spec| (spec.name, spec.default))
                    .collect(),
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Listing {
        problems,
        optimizers,
    })
}

fn handle_list(json: bool, workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<()> {
    let config = load(workspace, config_file)?;
    let listing = listing(&config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("Test problems ({}):", listing.problems.len());
    for p in &listing.problems {
        match (p.batch_size, p.num_epochs) {
            (Some(bs), Some(n)) => println!("  {:<20} batch_size={bs} num_epochs={n}", p.name),
            _ => println!("  {}", p.name),
        }
    }
    println!("Optimizers ({}):", listing.optimizers.len());
    for o in &listing.optimizers {
        let hps: Vec<String> = o
            .hyperparams
            .iter()
            .map(|(name, default)| match default {
                Some(v) => format!("{name}={v}"),
                None => format!("{name} (required)"),
            })
            .collect();
        println!("  {:<20} {}", o.name, hps.join(", "));
    }
    Ok(())
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = init_config(workspace)?;
            println!("Configuration file at: {}", config_path.display());
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace, config_file)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

/// Write the default configuration to `<workspace>/.optbench/config.toml`
/// unless a file already exists there.
fn init_config(workspace: &Path) -> anyhow::Result<PathBuf> {
    let config_dir = workspace.join(".optbench");
    std::fs::create_dir_all(&config_dir)?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        tracing::info!(path = %config_path.display(), "Configuration file already exists");
        return Ok(config_path);
    }

    let toml_str = toml::to_string_pretty(&BenchConfig::default())?;
    std::fs::write(&config_path, &toml_str)?;
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn run_args(argv: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_run_args_map_onto_request() {
        let args = run_args(&[
            "optbench",
            "run",
            "quadratic_deep",
            "--optimizer",
            "adam",
            "-H",
            "lr=0.01",
            "-H",
            "beta1=0.8",
            "--num-epochs",
            "3",
            "--no-logs",
        ]);
        assert_eq!(args.runner, RunnerChoice::Standard);

        let request = args.to_request().unwrap();
        assert_eq!(request.testproblem, "quadratic_deep");
        assert_eq!(request.hyperparams.get("lr"), Some(0.01));
        assert_eq!(request.hyperparams.get("beta1"), Some(0.8));
        assert_eq!(request.num_epochs, Some(3));
        assert_eq!(request.batch_size, None);
        assert_eq!(request.random_seed, 42);
        assert_eq!(request.no_logs, Some(true));
        assert_eq!(request.tb_log, None);
        assert!(request.training_params.is_empty());
    }

    #[test]
    fn test_schedule_flags_are_comma_separated() {
        let args = run_args(&[
            "optbench",
            "run",
            "two_d_beale",
            "--runner",
            "lr-schedule",
            "-H",
            "lr=0.1",
            "--lr-sched-epochs",
            "2,4",
            "--lr-sched-factors",
            "0.1,0.5",
        ]);
        assert_eq!(RunnerKind::from(args.runner), RunnerKind::LearningRateSchedule);

        let request = args.to_request().unwrap();
        assert_eq!(
            request.training_params,
            TrainingParams::schedule(vec![2, 4], vec![0.1, 0.5])
        );
    }

    #[test]
    fn test_malformed_hyperparameter_is_rejected() {
        let args = run_args(&["optbench", "run", "two_d_beale", "-H", "lr"]);
        assert!(args.to_request().is_err());
    }

    #[test]
    fn test_listing_covers_registries() {
        let listing = listing(&BenchConfig::default()).unwrap();
        assert_eq!(listing.problems.len(), PROBLEM_NAMES.len());
        assert!(listing.problems.iter().all(|p| p.batch_size.is_some()));

        let sgd = listing
            .optimizers
            .iter()
            .find(|o| o.name == "sgd")
            .unwrap();
        assert!(sgd.hyperparams.contains(&("lr", None)));
        assert!(sgd.hyperparams.contains(&("momentum", Some(0.0))));
    }

    #[test]
    fn test_init_config_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_config(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(".optbench").join("config.toml"));

        let config = load(dir.path(), None).unwrap();
        assert_eq!(config.train_log_interval, 10);

        // A second init keeps the existing file.
        std::fs::write(&path, "train_log_interval = 3\n").unwrap();
        init_config(dir.path()).unwrap();
        assert_eq!(load(dir.path(), None).unwrap().train_log_interval, 3);
    }
}
