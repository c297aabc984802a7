//! The `exforge init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("exforge.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("answers")?;
    write_if_missing(Path::new("answers/example.toml"), EXAMPLE_ANSWERS)?;

    println!("\nNext steps:");
    println!("  1. Run: exforge list");
    println!("  2. Run: exforge validate --answers answers/example.toml");
    println!("  3. Run: exforge run --answers answers/example.toml");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# exforge configuration

retry_cap = 3
# seed = 42
parallelism = 4
output_dir = "./exforge-results"

[frontend]
type = "console"
debug = false
# timeout_secs = 60

# Grade a pre-recorded sheet instead of prompting:
# [frontend]
# type = "answer_sheet"
# path = "answers/example.toml"
"#;

const EXAMPLE_ANSWERS: &str = r#"# One [[attempts]] entry per exercise; fields left out are skipped.

[[attempts]]
exercise = "addition"
[attempts.answers]
sum = 5

[[attempts]]
exercise = "coordinates"
[attempts.answers]
a = 1
b = 3

[[attempts]]
exercise = "capital"
[attempts.answers]
city = "Kyiv"
"#;
