//! Configuration loading and frontend factory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use exforge_core::engine::RunnerConfig;
use exforge_core::parser::AnswerSheet;
use exforge_core::traits::Frontend;

use crate::answer_sheet::AnswerSheetFrontend;
use crate::console::ConsoleFrontend;

/// Which frontend drives the attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontendConfig {
    Console {
        /// Show the reference inputs in the final report.
        #[serde(default)]
        debug: bool,
        /// Seconds to wait for each answer before counting it as malformed.
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    AnswerSheet {
        path: PathBuf,
        #[serde(default)]
        debug: bool,
        /// Echo prompts, answers and reports to stdout.
        #[serde(default = "default_true")]
        echo: bool,
    },
}

fn default_true() -> bool {
    true
}

impl Default for FrontendConfig {
    fn default() -> Self {
        FrontendConfig::Console {
            debug: false,
            timeout_secs: None,
        }
    }
}

impl FrontendConfig {
    pub fn debug(&self) -> bool {
        match self {
            FrontendConfig::Console { debug, .. } | FrontendConfig::AnswerSheet { debug, .. } => {
                *debug
            }
        }
    }

    pub fn set_debug(&mut self, value: bool) {
        match self {
            FrontendConfig::Console { debug, .. } | FrontendConfig::AnswerSheet { debug, .. } => {
                *debug = value
            }
        }
    }
}

/// Top-level exforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExforgeConfig {
    /// Malformed inputs accepted per field before it counts as "no answer".
    #[serde(default = "default_retry_cap")]
    pub retry_cap: u32,
    /// Seed for generated reference inputs; random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Max concurrent attempts when grading answer sheets.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Output directory for saved records.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub frontend: FrontendConfig,
}

fn default_retry_cap() -> u32 {
    3
}
fn default_parallelism() -> usize {
    4
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./exforge-results")
}

impl Default for ExforgeConfig {
    fn default() -> Self {
        Self {
            retry_cap: default_retry_cap(),
            seed: None,
            parallelism: default_parallelism(),
            output_dir: default_output_dir(),
            frontend: FrontendConfig::default(),
        }
    }
}

impl ExforgeConfig {
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            retry_cap: self.retry_cap,
            seed: self.seed,
        }
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.retry_cap >= 1, "retry_cap must be at least 1");
        anyhow::ensure!(self.parallelism >= 1, "parallelism must be at least 1");
        Ok(())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        from = start + value.len();
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Apply `EXFORGE_*` overrides, looking variables up through `lookup`.
fn apply_overrides(
    config: &mut ExforgeConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(seed) = lookup("EXFORGE_SEED") {
        config.seed = Some(
            seed.trim()
                .parse()
                .with_context(|| format!("EXFORGE_SEED is not a valid seed: {seed}"))?,
        );
    }
    if let Some(cap) = lookup("EXFORGE_RETRY_CAP") {
        config.retry_cap = cap
            .trim()
            .parse()
            .with_context(|| format!("EXFORGE_RETRY_CAP is not a number: {cap}"))?;
    }
    Ok(())
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `exforge.toml` in the current directory
/// 2. `~/.config/exforge/config.toml`
///
/// Environment variable overrides: `EXFORGE_SEED`, `EXFORGE_RETRY_CAP`.
pub fn load_config() -> Result<ExforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ExforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("exforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<ExforgeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => ExforgeConfig::default(),
    };

    apply_overrides(&mut config, |name| std::env::var(name).ok())?;

    config.output_dir = resolve_path(&config.output_dir);
    if let FrontendConfig::AnswerSheet { path, .. } = &mut config.frontend {
        *path = resolve_path(path);
    }

    config.validate()?;
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("exforge"))
}

/// Create the frontend for one attempt at `exercise`.
///
/// An answer-sheet configuration needs the parsed `sheet`.
pub fn create_frontend(
    config: &FrontendConfig,
    sheet: Option<&AnswerSheet>,
    exercise: &str,
) -> Result<Box<dyn Frontend>> {
    match config {
        FrontendConfig::Console {
            debug,
            timeout_secs,
        } => {
            let console = ConsoleFrontend::stdio(*debug);
            let frontend: Box<dyn Frontend> = match timeout_secs {
                Some(secs) => Box::new(console.with_timeout(Duration::from_secs(*secs))),
                None => Box::new(console),
            };
            Ok(frontend)
        }
        FrontendConfig::AnswerSheet { path, debug, echo } => {
            let sheet = sheet.with_context(|| {
                format!("answer sheet {} was not loaded", path.display())
            })?;
            let frontend: Box<dyn Frontend> = if *echo {
                Box::new(AnswerSheetFrontend::stdout(sheet, exercise, *debug))
            } else {
                let attempt = sheet.for_exercise(exercise);
                Box::new(AnswerSheetFrontend::new(attempt, tokio::io::sink(), *debug))
            };
            Ok(frontend)
        }
    }
}
