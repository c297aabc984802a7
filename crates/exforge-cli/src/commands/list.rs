//! The `exforge list` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

pub fn execute(filter: Option<String>) -> Result<()> {
    let pool = super::selected_pool(filter.as_deref())?;

    let mut table = Table::new();
    table.set_header(vec!["Exercise", "Title", "Fields", "Max score", "Tags"]);

    for definition in &pool {
        let fields: Vec<String> = definition
            .fields()
            .iter()
            .map(|f| format!("{} ({})", f.id, f.kind))
            .collect();
        table.add_row(vec![
            Cell::new(definition.id()),
            Cell::new(definition.title()),
            Cell::new(fields.join(", ")),
            Cell::new(definition.max_total_score()),
            Cell::new(definition.tags().join(", ")),
        ]);
    }

    println!("{table}");
    println!("{} exercise(s)", pool.len());
    Ok(())
}
