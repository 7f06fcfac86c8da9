//! Configuration system for optbench.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment.
//! Configuration is loaded from `~/.config/optbench/config.toml` and/or
//! `.optbench/config.toml` in the workspace directory. Command-line flags are
//! applied on top by the CLI.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default batch size and epoch count of a test problem, used when a run
/// request leaves them unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDefaults {
    pub batch_size: usize,
    pub num_epochs: usize,
}

/// Top-level configuration for benchmark runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Root directory results are written under.
    pub output_dir: PathBuf,
    /// Sample the training loss every this many batches.
    pub train_log_interval: usize,
    /// Log a progress line for every sampled training batch.
    pub print_train_iter: bool,
    /// Skip persisting the run output.
    pub no_logs: bool,
    /// Stream sampled training losses to a telemetry log.
    pub tb_log: bool,
    /// Telemetry directory; `<output_dir>/tb` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tb_log_dir: Option<PathBuf>,
    /// Per-test-problem defaults.
    pub problems: BTreeMap<String, ProblemDefaults>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let problems = [
            ("two_d_rosenbrock", 128, 20),
            ("two_d_beale", 128, 20),
            ("quadratic_deep", 128, 100),
            ("synthetic_logreg", 128, 20),
        ]
        .into_iter()
        .map(|(name, batch_size, num_epochs)| {
            (
                name.to_string(),
                ProblemDefaults {
                    batch_size,
                    num_epochs,
                },
            )
        })
        .collect();

        Self {
            output_dir: PathBuf::from("results"),
            train_log_interval: 10,
            print_train_iter: false,
            no_logs: false,
            tb_log: false,
            tb_log_dir: None,
            problems,
        }
    }
}

impl BenchConfig {
    pub fn problem_defaults(&self, testproblem: &str) -> Option<ProblemDefaults> {
        self.problems.get(testproblem).copied()
    }

    /// Telemetry directory for a run writing under `output_dir`.
    pub fn telemetry_dir(&self, output_dir: &Path) -> PathBuf {
        self.tb_log_dir
            .clone()
            .unwrap_or_else(|| output_dir.join("tb"))
    }
}

/// Path of the user-level configuration file, if a home directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "optbench", "optbench")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `OPTBENCH_`)
/// 2. Explicit config file (`--config`)
/// 3. Workspace-local config (`.optbench/config.toml`)
/// 4. User config (`~/.config/optbench/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
) -> Result<BenchConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(BenchConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".optbench").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(file) = config_file {
        figment = figment.merge(Toml::file(file));
    }

    // OPTBENCH_OUTPUT_DIR, OPTBENCH_PROBLEMS__QUADRATIC_DEEP__NUM_EPOCHS, ...
    figment = figment.merge(Env::prefixed("OPTBENCH_").split("__"));

    figment.extract().map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_builtin_problems() {
        let config = BenchConfig::default();
        for name in crate::problems::PROBLEM_NAMES {
            assert!(config.problem_defaults(name).is_some(), "{name}");
        }
        assert_eq!(config.train_log_interval, 10);
        assert_eq!(
            config.telemetry_dir(&config.output_dir),
            PathBuf::from("results").join("tb")
        );
        assert_eq!(
            config.telemetry_dir(Path::new("elsewhere")),
            PathBuf::from("elsewhere").join("tb")
        );
    }

    #[test]
    fn test_workspace_config_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".optbench");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(
            cfg_dir.join("config.toml"),
            "train_log_interval = 5\n\n[problems.quadratic_deep]\nbatch_size = 32\nnum_epochs = 3\n",
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.train_log_interval, 5);
        assert_eq!(
            config.problem_defaults("quadratic_deep"),
            Some(ProblemDefaults {
                batch_size: 32,
                num_epochs: 3
            })
        );
        // Untouched entries keep their defaults.
        assert_eq!(config.problem_defaults("two_d_beale").unwrap().num_epochs, 20);
    }

    #[test]
    fn test_explicit_file_wins_over_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_dir = dir.path().join(".optbench");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "output_dir = \"ws\"\n").unwrap();
        let explicit = dir.path().join("bench.toml");
        std::fs::write(&explicit, "output_dir = \"explicit\"\n").unwrap();

        let config = load_config(Some(dir.path()), Some(&explicit)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("explicit"));
    }

    #[test]
    fn test_roundtrips_through_toml() {
        let config = BenchConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: BenchConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
