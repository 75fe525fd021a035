//! Core data model types for examkit.
//!
//! Exams are ordered sections of multiple-choice questions with a shared
//! time budget. Definitions are immutable once a session starts and are
//! shared between sessions behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Minimum number of options on a question.
pub const MIN_OPTIONS: usize = 2;
/// Maximum number of options on a question.
pub const MAX_OPTIONS: usize = 5;
/// Lowest point value a question may carry.
pub const MIN_POINTS: u32 = 1;
/// Highest point value a question may carry.
pub const MAX_POINTS: u32 = 10;
/// Passing threshold used when an exam file does not set one.
pub const DEFAULT_PASSING_THRESHOLD: u8 = 60;

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the exam.
    pub id: String,
    /// Name of the section this question belongs to.
    #[serde(default)]
    pub section_id: String,
    /// The question text shown to the student.
    pub prompt: String,
    /// Answer options, in display order.
    pub options: Vec<String>,
    /// Index into `options` of the correct answer.
    pub correct_option_index: usize,
    /// Weight of the question.
    #[serde(default = "default_points")]
    pub points: u32,
    /// Shown on the results page after submission.
    #[serde(default)]
    pub explanation: Option<String>,
    /// Question type tag from the section type's kind table.
    #[serde(default)]
    pub kind: Option<String>,
}

fn default_points() -> u32 {
    MIN_POINTS
}

impl Question {
    /// Returns `true` if `option` is the answer key.
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_option_index
    }

    /// Check that `index` names one of this question's options.
    pub fn check_option(&self, index: usize) -> Result<(), ValidationError> {
        if index < self.options.len() {
            Ok(())
        } else {
            Err(ValidationError::OptionOutOfRange {
                index,
                len: self.options.len(),
            })
        }
    }

    /// Check the question's own invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        check_option_count(self.options.len())?;
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(ValidationError::BlankOption);
        }
        self.check_option(self.correct_option_index)?;
        check_points(self.points)
    }
}

pub(crate) fn check_option_count(found: usize) -> Result<(), ValidationError> {
    if found < MIN_OPTIONS {
        Err(ValidationError::TooFewOptions {
            found,
            min: MIN_OPTIONS,
        })
    } else if found > MAX_OPTIONS {
        Err(ValidationError::TooManyOptions {
            found,
            max: MAX_OPTIONS,
        })
    } else {
        Ok(())
    }
}

pub(crate) fn check_points(points: u32) -> Result<(), ValidationError> {
    if (MIN_POINTS..=MAX_POINTS).contains(&points) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPoints {
            got: points,
            min: MIN_POINTS,
            max: MAX_POINTS,
        })
    }
}

/// Proficiency level of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    N1,
    N2,
    N3,
    N4,
    N5,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::N1 => write!(f, "N1"),
            Level::N2 => write!(f, "N2"),
            Level::N3 => write!(f, "N3"),
            Level::N4 => write!(f, "N4"),
            Level::N5 => write!(f, "N5"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "N1" => Ok(Level::N1),
            "N2" => Ok(Level::N2),
            "N3" => Ok(Level::N3),
            "N4" => Ok(Level::N4),
            "N5" => Ok(Level::N5),
            other => Err(format!("unknown level: {other}")),
        }
    }
}

/// Skill category of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Vocabulary,
    Grammar,
    Listening,
}

/// A question type a section may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuestionKind {
    pub value: &'static str,
    pub label: &'static str,
}

const VOCABULARY_KINDS: &[QuestionKind] = &[
    QuestionKind {
        value: "kanji_reading",
        label: "Kanji reading",
    },
    QuestionKind {
        value: "kanji_meaning",
        label: "Kanji meaning",
    },
    QuestionKind {
        value: "vocabulary_usage",
        label: "Vocabulary usage",
    },
    QuestionKind {
        value: "word_formation",
        label: "Word formation",
    },
];

const GRAMMAR_KINDS: &[QuestionKind] = &[
    QuestionKind {
        value: "grammar_form",
        label: "Grammar form",
    },
    QuestionKind {
        value: "sentence_composition",
        label: "Sentence composition",
    },
    QuestionKind {
        value: "text_grammar",
        label: "Text grammar",
    },
    QuestionKind {
        value: "reading_comprehension",
        label: "Reading comprehension",
    },
];

const LISTENING_KINDS: &[QuestionKind] = &[
    QuestionKind {
        value: "task_based",
        label: "Task-based comprehension",
    },
    QuestionKind {
        value: "key_point",
        label: "Key-point comprehension",
    },
    QuestionKind {
        value: "verbal_expression",
        label: "Verbal expression",
    },
    QuestionKind {
        value: "quick_response",
        label: "Quick response",
    },
];

impl SectionType {
    /// The question kinds allowed in sections of this type.
    pub fn question_kinds(&self) -> &'static [QuestionKind] {
        match self {
            SectionType::Vocabulary => VOCABULARY_KINDS,
            SectionType::Grammar => GRAMMAR_KINDS,
            SectionType::Listening => LISTENING_KINDS,
        }
    }

    pub fn accepts_kind(&self, kind: &str) -> bool {
        self.question_kinds().iter().any(|k| k.value == kind)
    }

    /// Check `kind` against this section type's table.
    pub fn check_kind(&self, kind: &str) -> Result<(), ValidationError> {
        if self.accepts_kind(kind) {
            Ok(())
        } else {
            Err(ValidationError::UnknownQuestionKind {
                kind: kind.to_string(),
                section_type: self.to_string(),
            })
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionType::Vocabulary => write!(f, "vocabulary"),
            SectionType::Grammar => write!(f, "grammar"),
            SectionType::Listening => write!(f, "listening"),
        }
    }
}

impl FromStr for SectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vocabulary" | "vocab" => Ok(SectionType::Vocabulary),
            "grammar" => Ok(SectionType::Grammar),
            "listening" => Ok(SectionType::Listening),
            other => Err(format!("unknown section type: {other}")),
        }
    }
}

/// A named group of questions sharing a skill category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    #[serde(default, rename = "type")]
    pub section_type: Option<SectionType>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// The static, author-controlled description of an exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamDefinition {
    /// Unique identifier for this exam.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    pub level: Level,
    #[serde(default)]
    pub description: String,
    /// Time allowed for the whole exam.
    pub total_time_budget_seconds: u64,
    /// Minimum score percentage for a pass.
    #[serde(default = "default_passing_threshold")]
    pub passing_threshold: u8,
    /// Sections in exam order.
    #[serde(default)]
    pub sections: Vec<Section>,
}

fn default_passing_threshold() -> u8 {
    DEFAULT_PASSING_THRESHOLD
}

impl ExamDefinition {
    /// Number of questions across all sections.
    pub fn total_questions(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }

    /// Sum of question points across all sections.
    pub fn total_points(&self) -> u32 {
        self.questions().map(|q| q.points).sum()
    }

    /// All questions in exam order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> + '_ {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    /// The question at a flat position across sections.
    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.questions().nth(index)
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions().find(|q| q.id == id)
    }

    /// Flat position of the question with this id.
    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.questions().position(|q| q.id == id)
    }

    /// Merge a section committed by the question bank editor.
    ///
    /// Replaces the section with the same name, or appends a new one.
    pub fn apply_section(&mut self, config: SectionConfig) {
        let SectionConfig {
            section_name,
            section_type,
            mut questions,
            ..
        } = config;
        for q in &mut questions {
            q.section_id = section_name.clone();
        }

        let section = Section {
            name: section_name,
            section_type: Some(section_type),
            questions,
        };
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
    }
}

/// A section's question list handed over by the editor on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub section_name: String,
    pub section_type: SectionType,
    pub question_count: usize,
    pub questions: Vec<Question>,
}
