//! Rendering of score reports for the terminal.

use std::path::{Path, PathBuf};

use anyhow::Result;
use comfy_table::{Cell, Table};

use examkit_core::report::{option_letter, ScoreReport};

/// Print a report to stdout in the requested format.
pub fn print_report(report: &ScoreReport, format: &str) -> Result<()> {
    match format {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        "text" => print_summary(report),
        other => anyhow::bail!("unknown format: {other} (expected text, json or markdown)"),
    }
    Ok(())
}

/// Check a `--format` value before doing any work.
pub fn check_format(format: &str) -> Result<()> {
    anyhow::ensure!(
        matches!(format, "text" | "json" | "markdown" | "md"),
        "unknown format: {format} (expected text, json or markdown)"
    );
    Ok(())
}

fn print_summary(report: &ScoreReport) {
    let verdict = if report.passed { "PASSED" } else { "NOT PASSED" };
    println!(
        "{}: {}% ({}/{} correct, pass mark {}%) {verdict}",
        report.exam_id,
        report.score_percent,
        report.correct_count,
        report.total_questions,
        report.passing_threshold
    );
    println!(
        "Answered {}/{}, points {}/{}",
        report.answered_count, report.total_questions, report.points_earned, report.points_possible
    );

    let mut table = Table::new();
    table.set_header(vec!["Section", "Correct", "Total", "Score"]);
    for (name, section) in &report.per_section {
        table.add_row(vec![
            Cell::new(name),
            Cell::new(section.correct),
            Cell::new(section.total),
            Cell::new(format!("{}%", section.percent())),
        ]);
    }
    println!("\n{table}");

    let missed: Vec<_> = report.reviews.iter().filter(|r| !r.is_correct).collect();
    if !missed.is_empty() {
        println!("\nReview:");
        for r in missed {
            let chosen = r.chosen.map(option_letter).unwrap_or_else(|| "-".into());
            print!(
                "  {} ({}): chose {chosen}, correct {}",
                r.question_id,
                r.section,
                option_letter(r.correct_option_index)
            );
            match &r.explanation {
                Some(explanation) => println!(" — {explanation}"),
                None => println!(),
            }
        }
    }
}

/// Save a report as `<exam>-<timestamp>.json` under `dir`.
pub fn save_report(report: &ScoreReport, dir: &Path) -> Result<PathBuf> {
    let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("{}-{timestamp}.json", report.exam_id));
    report.save_json(&path)?;
    Ok(path)
}
