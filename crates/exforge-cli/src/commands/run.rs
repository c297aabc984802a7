//! The `exforge run` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use exforge_core::engine::{cancellation, run_batch, AttemptRunner, RunnerConfig};
use exforge_core::model::ExercisePool;
use exforge_core::parser::{parse_answer_sheet, validate_answer_sheet};
use exforge_core::report::{format_summary, SessionReport};
use exforge_core::results::{AttemptStatus, ExerciseRecord};
use exforge_frontends::config::{create_frontend, load_config_from, FrontendConfig};
use exforge_frontends::AnswerSheetFrontend;

/// Exit code of a session stopped with Ctrl-C.
const EXIT_CANCELLED: i32 = 130;

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    filter: Option<String>,
    answers: Option<PathBuf>,
    seed: Option<u64>,
    retry_cap: Option<u32>,
    debug: bool,
    format: String,
    output: Option<Option<PathBuf>>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "json"),
        "unknown format '{format}' (expected text or json)"
    );

    // Load config, then let flags win
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(seed) = seed {
        config.seed = Some(seed);
    }
    if let Some(cap) = retry_cap {
        anyhow::ensure!(cap >= 1, "retry cap must be at least 1");
        config.retry_cap = cap;
    }
    if let Some(path) = answers {
        config.frontend = FrontendConfig::AnswerSheet {
            path,
            debug: config.frontend.debug(),
            echo: true,
        };
    }
    if debug {
        config.frontend.set_debug(true);
    }

    let pool = super::selected_pool(filter.as_deref())?;
    let runner_config = config.runner_config();
    let started = Instant::now();

    let session = match &config.frontend {
        FrontendConfig::AnswerSheet { path, debug, echo } => {
            let echo = *echo && format == "text";
            let records = grade_answer_sheet(
                &pool,
                path,
                &runner_config,
                config.parallelism,
                *debug,
                echo,
            )
            .await?;
            Session {
                records,
                cancelled: false,
                failure: None,
            }
        }
        FrontendConfig::Console { .. } => {
            run_interactive(&pool, &config.frontend, &runner_config).await?
        }
    };

    let report = SessionReport::new(session.records, started.elapsed().as_millis() as u64);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if let Some(dir) = output {
        let dir = dir.unwrap_or_else(|| config.output_dir.clone());
        save_records(&report, &dir)?;
    }

    if let Some(failure) = session.failure {
        anyhow::bail!(failure);
    }
    if session.cancelled {
        eprintln!("Session cancelled.");
        std::process::exit(EXIT_CANCELLED);
    }

    Ok(())
}

struct Session {
    records: Vec<ExerciseRecord>,
    cancelled: bool,
    failure: Option<String>,
}

/// Attempt each exercise in turn on the console. Ctrl-C cancels the
/// current attempt and ends the session.
async fn run_interactive(
    pool: &ExercisePool,
    frontend: &FrontendConfig,
    runner_config: &RunnerConfig,
) -> Result<Session> {
    let mut session = Session {
        records: Vec::with_capacity(pool.len()),
        cancelled: false,
        failure: None,
    };

    // One console for the whole session so buffered stdin carries over.
    let mut console = create_frontend(frontend, None, "")?;

    // One watcher for the whole session; a Ctrl-C outside `collect` still
    // cancels the next wait for input.
    let (handle, signal) = cancellation();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    for definition in pool {
        if signal.is_cancelled() {
            session.cancelled = true;
            break;
        }

        let mut runner =
            match AttemptRunner::new(Arc::clone(definition), console, runner_config.clone()) {
                Ok(runner) => runner.with_cancel(signal.clone()),
                Err(e) => {
                    tracing::error!(exercise = definition.id(), "definition refused: {e}");
                    session.failure =
                        Some(format!("exercise '{}' refused: {e}", definition.id()));
                    break;
                }
            };
        let outcome = runner.run().await;
        let (frontend, record) = runner.into_parts();
        console = frontend;
        session.records.push(record);

        match outcome {
            Ok(AttemptStatus::Cancelled) => {
                session.cancelled = true;
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(exercise = definition.id(), "attempt failed: {e}");
                session.failure = Some(format!("attempt at '{}' failed: {e}", definition.id()));
                break;
            }
        }
    }

    watcher.abort();
    Ok(session)
}

/// Grade every selected exercise against a pre-recorded answer sheet.
async fn grade_answer_sheet(
    pool: &ExercisePool,
    path: &Path,
    runner_config: &RunnerConfig,
    parallelism: usize,
    debug: bool,
    echo: bool,
) -> Result<Vec<ExerciseRecord>> {
    let sheet = parse_answer_sheet(path)?;
    for warning in validate_answer_sheet(&sheet, pool) {
        tracing::warn!("{warning}");
    }

    let entries = run_batch(
        pool,
        |definition| {
            AnswerSheetFrontend::new(
                sheet.for_exercise(definition.id()),
                tokio::io::sink(),
                debug,
            )
        },
        runner_config,
        parallelism,
    )
    .await;

    let mut records = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Err(e) = &entry.outcome {
            eprintln!("  ERROR: {}: {e}", entry.exercise_id);
        }
        if let Some(record) = entry.record {
            if echo {
                println!("{}", format_summary(&record, debug));
            }
            records.push(record);
        }
    }
    Ok(records)
}

fn save_records(report: &SessionReport, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for record in &report.records {
        let path = dir.join(format!("{}-{}.json", record.exercise_id(), record.id()));
        record.save_json(&path)?;
    }
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H%M%S");
    let path = dir.join(format!("session-{timestamp}.json"));
    report.save_json(&path)?;
    eprintln!("Results saved to: {}", dir.display());
    Ok(())
}

fn print_summary(report: &SessionReport) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["Exercise", "Status", "Score", "Max", "Seed"]);

    for record in &report.records {
        let (score, max) = if record.is_sealed() {
            (
                record.total_score().to_string(),
                record.max_total_score().to_string(),
            )
        } else {
            ("-".to_string(), "-".to_string())
        };
        table.add_row(vec![
            Cell::new(record.exercise_id()),
            Cell::new(record.status().label()),
            Cell::new(score),
            Cell::new(max),
            Cell::new(record.seed()),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!(
        "\nComplete: {} completed, {} cancelled, {} failed; total {}/{} ({:.1}s)",
        report.completed(),
        report.cancelled(),
        report.failed(),
        report.total_score(),
        report.max_total_score(),
        report.duration_ms as f64 / 1000.0
    );
}
