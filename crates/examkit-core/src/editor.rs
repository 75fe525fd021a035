//! In-memory question bank editor for one exam section.
//!
//! The editor owns a draft question set while the authoring dialog is open.
//! Every operation either applies completely or returns a
//! [`ValidationError`] and leaves the draft untouched; in particular the
//! answer key of every question always points at a live option.

use uuid::Uuid;

use crate::error::ValidationError;
use crate::model::{
    check_option_count, check_points, Question, SectionConfig, SectionType, MAX_OPTIONS,
    MIN_OPTIONS, MIN_POINTS,
};

/// Input for a new question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    /// Raw option fields; blank entries are dropped on add.
    pub options: Vec<String>,
    /// Index into the raw `options` list.
    pub correct_option_index: usize,
    pub points: u32,
    pub explanation: Option<String>,
    pub kind: Option<String>,
}

impl Default for QuestionDraft {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            options: vec![String::new(); 4],
            correct_option_index: 0,
            points: MIN_POINTS,
            explanation: None,
            kind: None,
        }
    }
}

impl QuestionDraft {
    pub fn new<S: Into<String>>(
        prompt: impl Into<String>,
        options: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            options: options.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_correct(mut self, index: usize) -> Self {
        self.correct_option_index = index;
        self
    }

    pub fn with_points(mut self, points: u32) -> Self {
        self.points = points;
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Fields to change on an existing question. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionPatch {
    pub prompt: Option<String>,
    /// Replacement option list; blank entries are dropped.
    pub options: Option<Vec<String>>,
    /// New answer key, indexing the patch's `options` when both are set.
    pub correct_option_index: Option<usize>,
    pub points: Option<u32>,
    pub explanation: Option<Option<String>>,
    pub kind: Option<Option<String>>,
}

/// Drop blank options, returning the kept texts and a raw → kept index map.
fn filter_options(raw: &[String]) -> (Vec<String>, Vec<Option<usize>>) {
    let mut kept = Vec::with_capacity(raw.len());
    let mut mapping = Vec::with_capacity(raw.len());
    for option in raw {
        let text = option.trim();
        if text.is_empty() {
            mapping.push(None);
        } else {
            mapping.push(Some(kept.len()));
            kept.push(text.to_string());
        }
    }
    (kept, mapping)
}

/// Translate an answer key given against the raw list into the kept list.
fn remap_correct(mapping: &[Option<usize>], index: usize) -> Result<usize, ValidationError> {
    match mapping.get(index) {
        Some(Some(kept)) => Ok(*kept),
        Some(None) => Err(ValidationError::BlankCorrectOption(index)),
        None => Err(ValidationError::OptionOutOfRange {
            index,
            len: mapping.len(),
        }),
    }
}

/// Draft question set for one section.
#[derive(Debug, Clone)]
pub struct QuestionBankEditor {
    section_name: String,
    section_type: SectionType,
    questions: Vec<Question>,
    editing: Option<String>,
}

impl QuestionBankEditor {
    pub fn new(section_name: impl Into<String>, section_type: SectionType) -> Self {
        Self {
            section_name: section_name.into(),
            section_type,
            questions: Vec::new(),
            editing: None,
        }
    }

    /// Open an editor pre-filled with an existing section's questions.
    ///
    /// Every imported question must satisfy the same invariants as one added
    /// through [`add_question`](Self::add_question).
    pub fn from_config(config: SectionConfig) -> Result<Self, ValidationError> {
        for question in &config.questions {
            question.validate()?;
            if let Some(kind) = &question.kind {
                config.section_type.check_kind(kind)?;
            }
        }
        Ok(Self {
            section_name: config.section_name,
            section_type: config.section_type,
            questions: config.questions,
            editing: None,
        })
    }

    pub fn section_name(&self) -> &str {
        &self.section_name
    }

    pub fn section_type(&self) -> SectionType {
        self.section_type
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Id of the question open in the edit form, if any.
    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    fn position(&self, id: &str) -> Result<usize, ValidationError> {
        self.questions
            .iter()
            .position(|q| q.id == id)
            .ok_or_else(|| ValidationError::UnknownQuestion(id.to_string()))
    }

    fn check_kind(&self, kind: Option<&str>) -> Result<(), ValidationError> {
        match kind {
            Some(k) => self.section_type.check_kind(k),
            None => Ok(()),
        }
    }

    /// Validate a draft and append it with a fresh id.
    pub fn add_question(&mut self, draft: QuestionDraft) -> Result<String, ValidationError> {
        if draft.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        let (options, mapping) = filter_options(&draft.options);
        check_option_count(options.len())?;
        let correct_option_index = remap_correct(&mapping, draft.correct_option_index)?;
        check_points(draft.points)?;
        self.check_kind(draft.kind.as_deref())?;

        let id = Uuid::new_v4().to_string();
        self.questions.push(Question {
            id: id.clone(),
            section_id: self.section_name.clone(),
            prompt: draft.prompt.trim().to_string(),
            options,
            correct_option_index,
            points: draft.points,
            explanation: draft.explanation.filter(|e| !e.trim().is_empty()),
            kind: draft.kind,
        });

        tracing::debug!(section = %self.section_name, question_id = %id, "question added");
        Ok(id)
    }

    /// Merge `patch` into a question.
    ///
    /// If the new option list no longer contains the answer key and the patch
    /// does not name a new one, the key resets to the first option. Saving an
    /// edit closes the edit form for that question.
    pub fn update_question(
        &mut self,
        id: &str,
        patch: QuestionPatch,
    ) -> Result<(), ValidationError> {
        let pos = self.position(id)?;
        let mut updated = self.questions[pos].clone();

        if let Some(prompt) = patch.prompt {
            if prompt.trim().is_empty() {
                return Err(ValidationError::EmptyPrompt);
            }
            updated.prompt = prompt.trim().to_string();
        }

        match (patch.options, patch.correct_option_index) {
            (Some(raw), correct) => {
                let (options, mapping) = filter_options(&raw);
                check_option_count(options.len())?;
                updated.correct_option_index = match correct {
                    Some(index) => remap_correct(&mapping, index)?,
                    None if updated.correct_option_index < options.len() => {
                        updated.correct_option_index
                    }
                    None => {
                        tracing::debug!(question_id = id, "answer key reset after options shrank");
                        0
                    }
                };
                updated.options = options;
            }
            (None, Some(index)) => {
                updated.check_option(index)?;
                updated.correct_option_index = index;
            }
            (None, None) => {}
        }

        if let Some(points) = patch.points {
            check_points(points)?;
            updated.points = points;
        }
        if let Some(explanation) = patch.explanation {
            updated.explanation = explanation.filter(|e| !e.trim().is_empty());
        }
        if let Some(kind) = patch.kind {
            self.check_kind(kind.as_deref())?;
            updated.kind = kind;
        }

        self.questions[pos] = updated;
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        tracing::debug!(question_id = id, "question updated");
        Ok(())
    }

    /// Append an option and return the new option count. Rejected once the
    /// question has the maximum.
    pub fn add_option(&mut self, id: &str, text: &str) -> Result<usize, ValidationError> {
        let pos = self.position(id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::BlankOption);
        }
        let question = &mut self.questions[pos];
        if question.options.len() >= MAX_OPTIONS {
            return Err(ValidationError::TooManyOptions {
                found: question.options.len() + 1,
                max: MAX_OPTIONS,
            });
        }
        question.options.push(text.to_string());
        Ok(question.options.len())
    }

    /// Remove one option, keeping the answer key on the same option when it
    /// survives and resetting it to the first option when it does not.
    pub fn remove_option(&mut self, id: &str, index: usize) -> Result<(), ValidationError> {
        let pos = self.position(id)?;
        let question = &mut self.questions[pos];
        question.check_option(index)?;
        if question.options.len() <= MIN_OPTIONS {
            return Err(ValidationError::TooFewOptions {
                found: question.options.len() - 1,
                min: MIN_OPTIONS,
            });
        }

        question.options.remove(index);
        if question.correct_option_index == index {
            question.correct_option_index = 0;
        } else if question.correct_option_index > index {
            question.correct_option_index -= 1;
        }
        Ok(())
    }

    /// Remove a question, closing the edit form if it was open on it.
    pub fn remove_question(&mut self, id: &str) -> Result<Question, ValidationError> {
        let pos = self.position(id)?;
        let removed = self.questions.remove(pos);
        if self.editing.as_deref() == Some(id) {
            self.editing = None;
        }
        tracing::debug!(question_id = id, "question removed");
        Ok(removed)
    }

    pub fn begin_edit(&mut self, id: &str) -> Result<(), ValidationError> {
        self.position(id)?;
        self.editing = Some(id.to_string());
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Hand the draft set to the exam owner. Nothing is persisted here.
    pub fn commit(self) -> SectionConfig {
        tracing::info!(
            section = %self.section_name,
            questions = self.questions.len(),
            "section committed"
        );
        SectionConfig {
            question_count: self.questions.len(),
            section_name: self.section_name,
            section_type: self.section_type,
            questions: self.questions,
        }
    }
}
