//! The `examkit take` command: an interactive timed session over stdin.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use examkit_core::clock::format_clock;
use examkit_core::config::load_config_from;
use examkit_core::driver::{SessionDriver, SessionEvent, SessionHandle, SessionSnapshot};
use examkit_core::error::DriverError;
use examkit_core::model::ExamDefinition;
use examkit_core::parser;
use examkit_core::report::option_letter;
use examkit_core::scoring::score;
use examkit_core::session::{ExamSession, Submission, SubmitReason};

use super::output::{check_format, print_report, save_report};

const HELP: &str = "Commands: next, prev, goto N, answer A-E (or 1-5), status, submit, quit";

/// One line of student input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Next,
    Prev,
    /// Zero-based question index.
    GoTo(usize),
    /// Zero-based option index.
    Answer(usize),
    Status,
    Submit,
    Quit,
    Help,
}

fn parse_input(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let input = match (command.to_ascii_lowercase().as_str(), arg) {
        ("next" | "n", None) => Input::Next,
        ("prev" | "p", None) => Input::Prev,
        ("goto" | "g", Some(n)) => Input::GoTo(parse_ordinal(n)?),
        ("answer" | "a", Some(choice)) => Input::Answer(parse_choice(choice)?),
        ("status" | "s", None) => Input::Status,
        ("submit", None) => Input::Submit,
        ("quit" | "q", None) => Input::Quit,
        ("help" | "h" | "?", None) => Input::Help,
        _ => return Err(format!("unrecognized input: {}\n{HELP}", line.trim())),
    };
    Ok(Some(input))
}

/// A 1-based number typed by the student.
fn parse_ordinal(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("expected a number from 1, got '{s}'")),
    }
}

/// An option letter (`A`..) or 1-based number.
fn parse_choice(s: &str) -> Result<usize, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Ok((c.to_ascii_uppercase() as u8 - b'A') as usize)
        }
        _ => parse_ordinal(s),
    }
}

enum Step {
    Continue,
    Done(Option<Submission>),
}

pub async fn execute(
    exam_path: PathBuf,
    output: Option<PathBuf>,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    check_format(&format)?;
    let config = load_config_from(config_path.as_deref())?;
    let exam = Arc::new(parser::parse_exam(&exam_path)?);
    let session = ExamSession::start(Arc::clone(&exam))?;

    let mut driver = SessionDriver::spawn(session, config.driver_config());
    let handle = driver.handle();

    eprintln!(
        "{} [{}]: {} questions, {} on the clock, pass mark {}%",
        exam.title,
        exam.level,
        exam.total_questions(),
        format_clock(exam.total_time_budget_seconds),
        exam.passing_threshold
    );
    eprintln!("{HELP}\n");
    show_question(&exam, &handle.snapshot().await?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let submission = loop {
        tokio::select! {
            event = driver.next_event() => match event {
                Some(SessionEvent::LowTime { remaining_seconds }) => {
                    eprintln!("** {} left **", format_clock(remaining_seconds));
                }
                Some(SessionEvent::Completed(submission)) => break Some(submission),
                Some(SessionEvent::Abandoned) | None => break None,
                Some(_) => {}
            },
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break None;
                };
                match parse_input(&line) {
                    Ok(None) => {}
                    Ok(Some(input)) => match apply(&handle, &exam, input).await? {
                        Step::Continue => {}
                        Step::Done(submission) => break submission,
                    },
                    Err(message) => eprintln!("{message}"),
                }
            }
        }
    };

    driver.shutdown().await?;

    let Some(submission) = submission else {
        eprintln!("Session abandoned; no score recorded.");
        return Ok(());
    };
    if submission.reason == SubmitReason::TimeExpired {
        eprintln!("Time is up. Your answers were submitted automatically.");
    }

    let report = score(&exam, &submission.answers);
    print_report(&report, &format)?;

    let dir = output.unwrap_or(config.output_dir);
    let path = save_report(&report, &dir)?;
    eprintln!("Report saved: {}", path.display());
    Ok(())
}

async fn apply(handle: &SessionHandle, exam: &ExamDefinition, input: Input) -> Result<Step> {
    let outcome = match input {
        Input::Next => handle.next().await.map(drop),
        Input::Prev => handle.previous().await.map(drop),
        Input::GoTo(index) => handle.go_to(index).await.map(drop),
        Input::Answer(option) => handle.answer_current(option).await,
        Input::Status => {
            show_status(exam, &handle.snapshot().await?);
            return Ok(Step::Continue);
        }
        Input::Submit => {
            return match handle.submit().await {
                Ok(submission) => Ok(Step::Done(Some(submission))),
                Err(DriverError::Stopped) => Err(DriverError::Stopped.into()),
                Err(e) => {
                    eprintln!("{e}");
                    Ok(Step::Continue)
                }
            };
        }
        Input::Quit => return Ok(Step::Done(None)),
        Input::Help => {
            eprintln!("{HELP}");
            return Ok(Step::Continue);
        }
    };

    match outcome {
        Ok(()) => show_question(exam, &handle.snapshot().await?),
        Err(DriverError::Stopped) => return Err(DriverError::Stopped.into()),
        Err(e) => eprintln!("{e}"),
    }
    Ok(Step::Continue)
}

fn show_question(exam: &ExamDefinition, snapshot: &SessionSnapshot) {
    let Some(question) = exam.question_at(snapshot.current_index) else {
        return;
    };
    let chosen = snapshot.answers.get(&question.id).copied();

    eprintln!(
        "Question {}/{} · {} · {} left",
        snapshot.current_index + 1,
        snapshot.total_questions,
        question.section_id,
        format_clock(snapshot.remaining_seconds)
    );
    eprintln!("  {}", question.prompt);
    for (i, option) in question.options.iter().enumerate() {
        let marker = if chosen == Some(i) { '*' } else { ' ' };
        eprintln!("  {marker} {}) {option}", option_letter(i));
    }
}

fn show_status(exam: &ExamDefinition, snapshot: &SessionSnapshot) {
    eprintln!(
        "Answered {}/{} · at question {} ({}%) · {} left",
        snapshot.answered_count,
        snapshot.total_questions,
        snapshot.current_index + 1,
        snapshot.progress_percent,
        format_clock(snapshot.remaining_seconds)
    );

    let unanswered: Vec<String> = exam
        .questions()
        .enumerate()
        .filter(|(_, q)| !snapshot.answers.contains_key(&q.id))
        .map(|(i, _)| (i + 1).to_string())
        .collect();
    if !unanswered.is_empty() {
        eprintln!("Unanswered: {}", unanswered.join(", "));
    }
}
