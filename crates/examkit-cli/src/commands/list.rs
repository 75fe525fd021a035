//! The `examkit list` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::catalog::{DirectoryCatalog, ExamCatalog};
use examkit_core::clock::format_clock;
use examkit_core::config::load_config_from;

pub async fn execute(catalog_dir: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let catalog = DirectoryCatalog::new(catalog_dir.unwrap_or(config.catalog_dir));

    let exams = catalog.list().await?;
    if exams.is_empty() {
        println!(
            "No exams found in {}. Run `examkit init` to create an example.",
            catalog.root().display()
        );
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID",
        "Title",
        "Level",
        "Questions",
        "Sections",
        "Time",
        "Pass mark",
    ]);

    for exam in &exams {
        table.add_row(vec![
            Cell::new(&exam.id),
            Cell::new(&exam.title),
            Cell::new(exam.level),
            Cell::new(exam.question_count),
            Cell::new(exam.section_count),
            Cell::new(format_clock(exam.time_limit_secs)),
            Cell::new(format!("{}%", exam.passing_threshold)),
        ]);
    }

    println!("{table}");
    println!("{} exam(s) in {} catalog", exams.len(), catalog.name());
    Ok(())
}
