//! Scoring of completed answer sets.
//!
//! [`score`] is a pure function of the definition and the answers: no clock,
//! no randomness, no I/O. The same inputs always give the same report.

use std::collections::BTreeMap;

use crate::model::ExamDefinition;
use crate::report::{QuestionReview, ScoreReport, SectionScore};
use crate::session::Answers;

/// `part / whole` as a percentage, rounded half-up. Zero when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let rounded = (part * 100 + whole / 2) / whole;
    rounded.min(100) as u8
}

/// Score an answer set against the exam's answer key.
///
/// Unanswered questions count as incorrect and stay in every total. Answers
/// keyed by ids that are not in the definition are ignored.
pub fn score(definition: &ExamDefinition, answers: &Answers) -> ScoreReport {
    let mut per_section: BTreeMap<String, SectionScore> = BTreeMap::new();
    let mut reviews = Vec::with_capacity(definition.total_questions());
    let mut total_questions = 0usize;
    let mut answered_count = 0usize;
    let mut correct_count = 0usize;
    let mut points_earned = 0u32;
    let mut points_possible = 0u32;

    for section in &definition.sections {
        let tally = per_section.entry(section.name.clone()).or_default();

        for question in &section.questions {
            let chosen = answers.get(&question.id).copied();
            let is_correct = chosen.is_some_and(|c| question.is_correct(c));

            total_questions += 1;
            tally.total += 1;
            points_possible += question.points;
            if chosen.is_some() {
                answered_count += 1;
            }
            if is_correct {
                correct_count += 1;
                tally.correct += 1;
                points_earned += question.points;
            }

            reviews.push(QuestionReview {
                question_id: question.id.clone(),
                section: section.name.clone(),
                prompt: question.prompt.clone(),
                chosen,
                correct_option_index: question.correct_option_index,
                is_correct,
                explanation: question.explanation.clone(),
            });
        }
    }

    let score_percent = percent(correct_count, total_questions);
    let passed = score_percent >= definition.passing_threshold;

    tracing::info!(
        exam_id = %definition.id,
        correct = correct_count,
        total = total_questions,
        score_percent,
        passed,
        "scored submission"
    );

    ScoreReport {
        exam_id: definition.id.clone(),
        total_questions,
        answered_count,
        correct_count,
        score_percent,
        passed,
        passing_threshold: definition.passing_threshold,
        points_earned,
        points_possible,
        per_section,
        reviews,
    }
}
