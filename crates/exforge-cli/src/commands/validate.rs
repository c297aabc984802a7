//! The `exforge validate` command.

use std::path::PathBuf;

use anyhow::Result;

use exforge_core::catalog::builtin_pool;
use exforge_core::parser::{parse_answer_sheet, validate_answer_sheet};
use exforge_core::validation::{validate_pool, ValidationWarning};

/// Seed used when checking that generated reference inputs are reproducible.
const VALIDATION_SEED: u64 = 0;

pub fn execute(filter: Option<String>, answers: Option<PathBuf>) -> Result<()> {
    let pool = super::selected_pool(filter.as_deref())?;
    println!("Catalog: {} exercises", pool.len());

    let mut total_warnings = print_warnings(&validate_pool(&pool, VALIDATION_SEED));

    if let Some(path) = answers {
        let sheet = parse_answer_sheet(&path)?;
        println!(
            "Answer sheet: {} ({} attempts)",
            path.display(),
            sheet.attempts.len()
        );
        // Checked against the whole catalog so filtered-out entries are not "unknown".
        total_warnings += print_warnings(&validate_answer_sheet(&sheet, &builtin_pool()?));
    }

    if total_warnings == 0 {
        println!("All exercises valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}

fn print_warnings(warnings: &[ValidationWarning]) -> usize {
    for w in warnings {
        println!("  WARNING: {w}");
    }
    warnings.len()
}
