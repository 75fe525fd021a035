//! TOML exam parser.
//!
//! Loads exam definitions from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{
    ExamDefinition, Level, Question, Section, SectionType, DEFAULT_PASSING_THRESHOLD,
};

/// Intermediate TOML structure for parsing exam files.
#[derive(Debug, Deserialize)]
struct TomlExamFile {
    exam: TomlExamHeader,
    #[serde(default)]
    sections: Vec<TomlSection>,
}

#[derive(Debug, Deserialize)]
struct TomlExamHeader {
    id: String,
    title: String,
    level: String,
    #[serde(default)]
    description: String,
    time_limit_secs: u64,
    #[serde(default = "default_passing_threshold")]
    passing_threshold: u8,
}

fn default_passing_threshold() -> u8 {
    DEFAULT_PASSING_THRESHOLD
}

#[derive(Debug, Deserialize)]
struct TomlSection {
    name: String,
    #[serde(default, rename = "type")]
    section_type: Option<String>,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    prompt: String,
    options: Vec<String>,
    correct: usize,
    #[serde(default = "default_points")]
    points: u32,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

fn default_points() -> u32 {
    1
}

/// Parse a single TOML file into an `ExamDefinition`.
pub fn parse_exam(path: &Path) -> Result<ExamDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;

    parse_exam_str(&content, path)
}

/// Parse a TOML string into an `ExamDefinition` (useful for testing).
///
/// Every question must satisfy its own invariants and question ids must be
/// unique; softer problems are left to [`validate_exam`].
pub fn parse_exam_str(content: &str, source_path: &Path) -> Result<ExamDefinition> {
    let parsed: TomlExamFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let level: Level = parsed
        .exam
        .level
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;

    anyhow::ensure!(
        parsed.exam.time_limit_secs > 0,
        "exam '{}': time_limit_secs must be positive",
        parsed.exam.id
    );
    anyhow::ensure!(
        parsed.exam.passing_threshold <= 100,
        "exam '{}': passing_threshold must be at most 100",
        parsed.exam.id
    );

    let mut seen_ids = HashSet::new();
    let sections = parsed
        .sections
        .into_iter()
        .map(|s| {
            let section_type = s
                .section_type
                .map(|t| t.parse().map_err(|e: String| anyhow::anyhow!("{}", e)))
                .transpose()?;

            let questions = s
                .questions
                .into_iter()
                .map(|q| {
                    anyhow::ensure!(
                        seen_ids.insert(q.id.clone()),
                        "duplicate question ID: {}",
                        q.id
                    );
                    let question = Question {
                        id: q.id,
                        section_id: s.name.clone(),
                        prompt: q.prompt,
                        options: q.options,
                        correct_option_index: q.correct,
                        points: q.points,
                        explanation: q.explanation,
                        kind: q.kind,
                    };
                    question.validate().with_context(|| {
                        format!("invalid question '{}' in section '{}'", question.id, s.name)
                    })?;
                    Ok(question)
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(Section {
                name: s.name,
                section_type,
                questions,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ExamDefinition {
        id: parsed.exam.id,
        title: parsed.exam.title,
        level,
        description: parsed.exam.description,
        total_time_budget_seconds: parsed.exam.time_limit_secs,
        passing_threshold: parsed.exam.passing_threshold,
        sections,
    })
}

/// Recursively load all `.toml` exam files from a directory.
pub fn load_exam_directory(dir: &Path) -> Result<Vec<ExamDefinition>> {
    let mut exams = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            exams.extend(load_exam_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_exam(&path) {
                Ok(exam) => exams.push(exam),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    exams.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(exams)
}

/// A warning from exam validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn exam(message: impl Into<String>) -> Self {
        Self {
            question_id: None,
            message: message.into(),
        }
    }

    fn question(id: &str, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

/// Seconds per question below which the time budget is flagged.
const MIN_SECS_PER_QUESTION: u64 = 10;

/// Validate an exam definition for common issues.
pub fn validate_exam(exam: &ExamDefinition) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if exam.total_questions() == 0 {
        warnings.push(ValidationWarning::exam("exam has no questions"));
    }

    let mut seen_sections = HashSet::new();
    for section in &exam.sections {
        if !seen_sections.insert(section.name.as_str()) {
            warnings.push(ValidationWarning::exam(format!(
                "duplicate section name: {} (scores will be merged)",
                section.name
            )));
        }
        if section.questions.is_empty() {
            warnings.push(ValidationWarning::exam(format!(
                "section '{}' has no questions",
                section.name
            )));
        }
    }

    // Check for duplicate question IDs
    let mut seen_ids = HashSet::new();
    for q in exam.questions() {
        if !seen_ids.insert(q.id.as_str()) {
            warnings.push(ValidationWarning::question(
                &q.id,
                format!("duplicate question ID: {}", q.id),
            ));
        }
    }

    // Check question invariants and kinds against the section type table
    for section in &exam.sections {
        for q in &section.questions {
            if let Err(e) = q.validate() {
                warnings.push(ValidationWarning::question(&q.id, e.to_string()));
            }
            if let (Some(kind), Some(section_type)) = (&q.kind, section.section_type) {
                if let Err(e) = section_type.check_kind(kind) {
                    warnings.push(ValidationWarning::question(&q.id, e.to_string()));
                }
            }
        }
    }

    let total = exam.total_questions() as u64;
    if total > 0 && exam.total_time_budget_seconds < total * MIN_SECS_PER_QUESTION {
        warnings.push(ValidationWarning::exam(format!(
            "time limit of {}s leaves under {}s per question",
            exam.total_time_budget_seconds, MIN_SECS_PER_QUESTION
        )));
    }

    warnings
}

/// Section types used by an exam, in order of first appearance.
pub fn section_types(exam: &ExamDefinition) -> Vec<SectionType> {
    let mut types = Vec::new();
    for t in exam.sections.iter().filter_map(|s| s.section_type) {
        if !types.contains(&t) {
            types.push(t);
        }
    }
    types
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[exam]
id = "n5-sample"
title = "JLPT N5 Sample"
level = "N5"
description = "A short sample exam"
time_limit_secs = 600
passing_threshold = 60

[[sections]]
name = "Vocabulary"
type = "vocabulary"

[[sections.questions]]
id = "v1"
prompt = "Which word means 'student'?"
options = ["がくせい", "せんせい", "かいしゃいん", "いしゃ"]
correct = 0
kind = "vocabulary_usage"
explanation = "がくせい means student."

[[sections.questions]]
id = "v2"
prompt = "How is 山 read?"
options = ["かわ", "やま", "うみ", "そら"]
correct = 1
points = 2
kind = "kanji_reading"

[[sections]]
name = "Grammar"
type = "grammar"

[[sections.questions]]
id = "g1"
prompt = "わたし___にほんじんです。"
options = ["は", "が", "を", "に"]
correct = 0
"#;

    #[test]
    fn parse_valid_toml() {
        let exam = parse_exam_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(exam.id, "n5-sample");
        assert_eq!(exam.level, Level::N5);
        assert_eq!(exam.total_time_budget_seconds, 600);
        assert_eq!(exam.sections.len(), 2);
        assert_eq!(exam.total_questions(), 3);
        assert_eq!(exam.sections[0].section_type, Some(SectionType::Vocabulary));

        let v2 = exam.question("v2").unwrap();
        assert_eq!(v2.section_id, "Vocabulary");
        assert_eq!(v2.correct_option_index, 1);
        assert_eq!(v2.points, 2);
        assert_eq!(exam.question("g1").unwrap().points, 1);
        assert_eq!(
            section_types(&exam),
            vec![SectionType::Vocabulary, SectionType::Grammar]
        );
        assert!(validate_exam(&exam).is_empty());
    }

    #[test]
    fn parse_missing_optional_fields() {
        let toml = r#"
[exam]
id = "minimal"
title = "Minimal"
level = "n4"
time_limit_secs = 60

[[sections]]
name = "Only"

[[sections.questions]]
id = "q1"
prompt = "Yes?"
options = ["yes", "no"]
correct = 1
"#;
        let exam = parse_exam_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(exam.level, Level::N4);
        assert_eq!(exam.passing_threshold, 60);
        assert!(exam.description.is_empty());
        assert!(exam.sections[0].section_type.is_none());
    }

    #[test]
    fn parse_rejects_broken_answer_key() {
        let toml = r#"
[exam]
id = "bad"
title = "Bad"
level = "N5"
time_limit_secs = 60

[[sections]]
name = "S"

[[sections.questions]]
id = "q1"
prompt = "?"
options = ["a", "b"]
correct = 2
"#;
        let err = parse_exam_str(toml, &PathBuf::from("bad.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("option index 2 out of range"));
    }

    #[test]
    fn parse_rejects_duplicate_ids_and_zero_time() {
        let dupes = r#"
[exam]
id = "dupes"
title = "Dupes"
level = "N5"
time_limit_secs = 60

[[sections]]
name = "S"

[[sections.questions]]
id = "same"
prompt = "?"
options = ["a", "b"]
correct = 0

[[sections.questions]]
id = "same"
prompt = "??"
options = ["a", "b"]
correct = 1
"#;
        let err = parse_exam_str(dupes, &PathBuf::from("d.toml")).unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let no_time = dupes.replace("time_limit_secs = 60", "time_limit_secs = 0");
        assert!(parse_exam_str(&no_time, &PathBuf::from("d.toml")).is_err());
    }

    #[test]
    fn parse_rejects_unknown_level() {
        let toml = VALID_TOML.replace("level = \"N5\"", "level = \"N9\"");
        assert!(parse_exam_str(&toml, &PathBuf::from("t.toml")).is_err());
    }

    #[test]
    fn validate_flags_kind_mismatch_and_tight_time() {
        let mut exam = parse_exam_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        exam.sections[1].questions[0].kind = Some("kanji_reading".into());
        exam.total_time_budget_seconds = 20;
        exam.sections.push(Section {
            name: "Listening".into(),
            section_type: Some(SectionType::Listening),
            questions: vec![],
        });

        let warnings = validate_exam(&exam);
        assert!(warnings
            .iter()
            .any(|w| w.question_id.as_deref() == Some("g1") && w.message.contains("grammar")));
        assert!(warnings.iter().any(|w| w.message.contains("per question")));
        assert!(warnings.iter().any(|w| w.message.contains("no questions")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_exam_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("n5.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "nope = [").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let exams = load_exam_directory(dir.path()).unwrap();
        assert_eq!(exams.len(), 1);
        assert_eq!(exams[0].id, "n5-sample");
    }
}
