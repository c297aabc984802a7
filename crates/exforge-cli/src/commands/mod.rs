pub mod init;
pub mod list;
pub mod run;
pub mod validate;

use anyhow::Result;

use exforge_core::catalog::builtin_pool;
use exforge_core::model::ExercisePool;

/// Split a `--filter` value into its comma-separated patterns.
pub fn filter_patterns(filter: Option<&str>) -> Vec<String> {
    filter
        .map(|f| {
            f.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// The built-in catalog narrowed by `--filter`.
pub fn selected_pool(filter: Option<&str>) -> Result<ExercisePool> {
    let pool = builtin_pool()?.filter(&filter_patterns(filter));
    anyhow::ensure!(!pool.is_empty(), "no exercises match the filter");
    Ok(pool)
}
