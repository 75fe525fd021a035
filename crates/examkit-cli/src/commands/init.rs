//! The `examkit init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("examkit.toml").exists() {
        println!("examkit.toml already exists, skipping.");
    } else {
        std::fs::write("examkit.toml", SAMPLE_CONFIG)?;
        println!("Created examkit.toml");
    }

    std::fs::create_dir_all("exams")?;
    let example_path = std::path::Path::new("exams/example.toml");
    if example_path.exists() {
        println!("exams/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_EXAM)?;
        println!("Created exams/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: examkit validate --exam exams/example.toml");
    println!("  2. Run: examkit take --exam exams/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examkit configuration

catalog_dir = "./exams"
output_dir = "./examkit-results"

# Wall time per second of exam clock, in milliseconds
tick_interval_ms = 1000

# Pause after submitting before the result is sealed
submit_ack_delay_ms = 0

# Remaining time at which the low-time warning appears
low_time_warning_secs = 300
"#;

const EXAMPLE_EXAM: &str = r#"[exam]
id = "example"
title = "Example Practice Exam"
level = "N5"
description = "A short exam to get started"
time_limit_secs = 300
passing_threshold = 60

[[sections]]
name = "Vocabulary"
type = "vocabulary"

[[sections.questions]]
id = "vocab-1"
prompt = "How do you read 山?"
options = ["やま", "かわ", "そら", "うみ"]
correct = 0
kind = "kanji_reading"
explanation = "山 (やま) means mountain."

[[sections.questions]]
id = "vocab-2"
prompt = "Which word means 'water'?"
options = ["ひ", "みず", "き"]
correct = 1
kind = "vocabulary_usage"

[[sections]]
name = "Grammar"
type = "grammar"

[[sections.questions]]
id = "grammar-1"
prompt = "わたし ___ がくせいです。"
options = ["を", "に", "は", "で"]
correct = 2
kind = "grammar_form"
explanation = "は marks the topic of the sentence."
"#;
