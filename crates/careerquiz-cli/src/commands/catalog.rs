//! The `careerquiz tests` command: the skill-test catalog.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use careerquiz_core::parser;
use careerquiz_providers::load_config_from;

pub fn execute(bank_dir: Option<PathBuf>, json: bool, config_path: Option<PathBuf>) -> Result<()> {
    let dir = match bank_dir {
        Some(dir) => dir,
        None => load_config_from(config_path.as_deref())?.quiz.bank_dir,
    };
    anyhow::ensure!(dir.is_dir(), "bank directory not found: {}", dir.display());

    let catalog = parser::load_catalog(&dir)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    if catalog.entries.is_empty() {
        println!(
            "No skill tests found in {}. Run `careerquiz init` to create one.",
            dir.display()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID",
        "Title",
        "Difficulty",
        "Questions",
        "Duration",
        "Topics",
    ]);

    for entry in &catalog.entries {
        let title = if entry.recommended {
            format!("{} (recommended)", entry.title)
        } else {
            entry.title.clone()
        };
        table.add_row(vec![
            Cell::new(&entry.id),
            Cell::new(title),
            Cell::new(entry.difficulty),
            Cell::new(entry.question_count),
            Cell::new(format!("{} min", entry.duration_mins)),
            Cell::new(&entry.description),
        ]);
    }

    println!("{table}");
    println!("\nStart one with: careerquiz play --bank <path>");
    Ok(())
}
