//! The `examkit score` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use examkit_core::parser;
use examkit_core::scoring::score;
use examkit_core::session::Answers;

use super::output::{check_format, print_report};

/// Either a bare answer map or a saved submission carrying one.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswersFile {
    Map(Answers),
    Submission {
        #[serde(default)]
        exam_id: Option<String>,
        answers: Answers,
    },
}

impl AnswersFile {
    /// The answers, provided they were saved for `expected_exam`.
    fn into_answers(self, expected_exam: &str) -> Result<Answers> {
        match self {
            AnswersFile::Map(answers) => Ok(answers),
            AnswersFile::Submission { exam_id, answers } => {
                if let Some(exam_id) = exam_id {
                    anyhow::ensure!(
                        exam_id == expected_exam,
                        "answers were submitted for exam '{exam_id}', not '{expected_exam}'"
                    );
                }
                Ok(answers)
            }
        }
    }
}

pub fn execute(exam_path: PathBuf, answers_path: PathBuf, format: String) -> Result<()> {
    check_format(&format)?;
    let exam = parser::parse_exam(&exam_path)?;

    let content = std::fs::read_to_string(&answers_path)
        .with_context(|| format!("failed to read answers: {}", answers_path.display()))?;
    let answers = serde_json::from_str::<AnswersFile>(&content)
        .with_context(|| format!("failed to parse answers: {}", answers_path.display()))?
        .into_answers(&exam.id)?;

    for id in answers.keys().filter(|id| exam.question(id).is_none()) {
        tracing::warn!(question_id = %id, "answer for unknown question ignored");
    }

    let report = score(&exam, &answers);
    print_report(&report, &format)
}
