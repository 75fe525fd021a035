//! Score report types with JSON persistence and markdown rendering.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::scoring::percent;

/// The outcome of scoring one completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub exam_id: String,
    pub total_questions: usize,
    /// Answers that matched a question in the exam.
    pub answered_count: usize,
    pub correct_count: usize,
    /// `correct / total`, rounded half-up.
    pub score_percent: u8,
    pub passed: bool,
    pub passing_threshold: u8,
    pub points_earned: u32,
    pub points_possible: u32,
    /// Tallies keyed by section name.
    pub per_section: BTreeMap<String, SectionScore>,
    /// One entry per question, in exam order.
    pub reviews: Vec<QuestionReview>,
}

/// Per-section tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionScore {
    pub total: usize,
    pub correct: usize,
}

impl SectionScore {
    pub fn percent(&self) -> u8 {
        percent(self.correct, self.total)
    }
}

/// Answer review for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: String,
    pub section: String,
    pub prompt: String,
    /// `None` when the question was left unanswered.
    pub chosen: Option<usize>,
    pub correct_option_index: usize,
    pub is_correct: bool,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl ScoreReport {
    pub fn unanswered_count(&self) -> usize {
        self.total_questions.saturating_sub(self.answered_count)
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ScoreReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        let verdict = if self.passed { "PASSED" } else { "NOT PASSED" };
        md.push_str(&format!("## {} — {verdict}\n\n", self.exam_id));
        md.push_str(&format!(
            "**Score:** {}% ({}/{} correct, pass mark {}%)\n\n",
            self.score_percent, self.correct_count, self.total_questions, self.passing_threshold
        ));
        md.push_str(&format!(
            "**Answered:** {}/{} · **Points:** {}/{}\n\n",
            self.answered_count, self.total_questions, self.points_earned, self.points_possible
        ));

        if !self.per_section.is_empty() {
            md.push_str("### Sections\n\n");
            md.push_str("| Section | Correct | Total | Score |\n");
            md.push_str("|---------|---------|-------|-------|\n");
            for (name, s) in &self.per_section {
                md.push_str(&format!(
                    "| {} | {} | {} | {}% |\n",
                    name,
                    s.correct,
                    s.total,
                    s.percent()
                ));
            }
            md.push('\n');
        }

        let missed: Vec<&QuestionReview> = self.reviews.iter().filter(|r| !r.is_correct).collect();
        if !missed.is_empty() {
            md.push_str("### Review\n\n");
            for r in missed {
                let chosen = r
                    .chosen
                    .map(option_letter)
                    .unwrap_or_else(|| "-".to_string());
                md.push_str(&format!(
                    "- `{}` ({}): chose {}, correct {}",
                    r.question_id,
                    r.section,
                    chosen,
                    option_letter(r.correct_option_index)
                ));
                if let Some(explanation) = &r.explanation {
                    md.push_str(&format!(" — {explanation}"));
                }
                md.push('\n');
            }
        }

        md
    }
}

/// `0 → "A"`, `1 → "B"`, ...
pub fn option_letter(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'A' + i).to_string(),
        _ => (index + 1).to_string(),
    }
}
