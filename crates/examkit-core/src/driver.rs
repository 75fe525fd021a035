//! Async driver for a live exam session.
//!
//! One spawned task owns the [`ExamSession`]. Every mutation arrives as a
//! command over a single channel and the countdown feeds ticks into the same
//! task, so navigation, answers, submission and expiry are applied strictly
//! one at a time. Clients talk to the task through cloneable
//! [`SessionHandle`]s and observe progress through [`SessionEvent`]s.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::clock::{start_countdown, CountdownHandle};
use crate::error::DriverError;
use crate::session::{Answers, ExamSession, Phase, Submission, TickOutcome};

/// Driver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Wall time per one-second tick of the exam clock.
    pub tick_interval: Duration,
    /// Pause between accepting a manual submit and sealing it.
    pub submit_ack_delay: Duration,
    /// Remaining seconds at which [`SessionEvent::LowTime`] fires.
    pub low_time_warning_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            submit_ack_delay: Duration::ZERO,
            low_time_warning_secs: 300,
        }
    }
}

/// Something observable happened in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One second elapsed.
    Ticked { remaining_seconds: u64 },
    /// Remaining time crossed the low-time threshold. Fires at most once.
    LowTime { remaining_seconds: u64 },
    /// A manual submit was accepted; input is closed.
    Submitting,
    /// The session completed. Fires exactly once per completed session.
    Completed(Submission),
    /// The session was torn down before completing.
    Abandoned,
}

/// Point-in-time view of a driven session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub exam_id: String,
    pub phase: Phase,
    pub current_index: usize,
    pub current_question_id: Option<String>,
    pub total_questions: usize,
    pub answered_count: usize,
    pub remaining_seconds: u64,
    pub progress_percent: u8,
    pub answers: Answers,
}

impl SessionSnapshot {
    fn of(session: &ExamSession) -> Self {
        Self {
            exam_id: session.definition().id.clone(),
            phase: session.phase(),
            current_index: session.current_index(),
            current_question_id: session.current_question().map(|q| q.id.clone()),
            total_questions: session.definition().total_questions(),
            answered_count: session.answered_count(),
            remaining_seconds: session.remaining_seconds(),
            progress_percent: session.progress_percent(),
            answers: session.answers().clone(),
        }
    }
}

type Reply<T> = oneshot::Sender<Result<T, DriverError>>;

enum Command {
    GoTo { index: usize, reply: Reply<usize> },
    Next { reply: Reply<usize> },
    Previous { reply: Reply<usize> },
    RecordAnswer {
        question_id: String,
        option_index: usize,
        reply: Reply<()>,
    },
    AnswerCurrent { option_index: usize, reply: Reply<()> },
    Submit { reply: Reply<Submission> },
    Snapshot { reply: Reply<SessionSnapshot> },
    Abandon,
}

/// Cloneable client of a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::GoTo { .. } => "GoTo",
            Command::Next { .. } => "Next",
            Command::Previous { .. } => "Previous",
            Command::RecordAnswer { .. } => "RecordAnswer",
            Command::AnswerCurrent { .. } => "AnswerCurrent",
            Command::Submit { .. } => "Submit",
            Command::Snapshot { .. } => "Snapshot",
            Command::Abandon => "Abandon",
        };
        f.write_str(name)
    }
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, DriverError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| DriverError::Stopped)?;
        response.await.map_err(|_| DriverError::Stopped)?
    }

    pub async fn go_to(&self, index: usize) -> Result<usize, DriverError> {
        self.request(|reply| Command::GoTo { index, reply }).await
    }

    pub async fn next(&self) -> Result<usize, DriverError> {
        self.request(|reply| Command::Next { reply }).await
    }

    pub async fn previous(&self) -> Result<usize, DriverError> {
        self.request(|reply| Command::Previous { reply }).await
    }

    pub async fn record_answer(
        &self,
        question_id: impl Into<String>,
        option_index: usize,
    ) -> Result<(), DriverError> {
        let question_id = question_id.into();
        self.request(|reply| Command::RecordAnswer {
            question_id,
            option_index,
            reply,
        })
        .await
    }

    pub async fn answer_current(&self, option_index: usize) -> Result<(), DriverError> {
        self.request(|reply| Command::AnswerCurrent {
            option_index,
            reply,
        })
        .await
    }

    /// Submit the session, waiting out the acknowledgment delay.
    ///
    /// Only the first submit (or an earlier expiry) wins; later calls get
    /// an invalid-transition error.
    pub async fn submit(&self) -> Result<Submission, DriverError> {
        self.request(|reply| Command::Submit { reply }).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, DriverError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Tear the session down. Stops the countdown; an uncompleted session
    /// emits [`SessionEvent::Abandoned`] instead of completing.
    pub fn abandon(&self) {
        let _ = self.commands.send(Command::Abandon);
    }

    /// Whether the driver task is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

/// Owner side of a spawned session: the event stream and the task.
#[derive(Debug)]
pub struct SessionDriver {
    handle: SessionHandle,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    task: JoinHandle<Option<Submission>>,
}

impl SessionDriver {
    /// Spawn the driver task and start the countdown. Requires a tokio runtime.
    pub fn spawn(session: ExamSession, config: DriverConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(session, config, commands_rx, events_tx));
        Self {
            handle: SessionHandle {
                commands: commands_tx,
            },
            events: events_rx,
            task,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Next event, or `None` once the driver has exited and the stream drained.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events.recv().await
    }

    /// Consume events until the session completes or is abandoned.
    pub async fn wait_for_completion(&mut self) -> Option<Submission> {
        while let Some(event) = self.events.recv().await {
            match event {
                SessionEvent::Completed(submission) => return Some(submission),
                SessionEvent::Abandoned => return None,
                _ => {}
            }
        }
        None
    }

    /// Abandon the session and wait for the task to exit.
    ///
    /// Returns the submission if the session had completed.
    pub async fn shutdown(self) -> Result<Option<Submission>, DriverError> {
        self.handle.abandon();
        let SessionDriver { handle, task, .. } = self;
        drop(handle);
        task.await.map_err(|e| {
            tracing::error!("session driver task failed: {e}");
            DriverError::Stopped
        })
    }
}

async fn run(
    mut session: ExamSession,
    config: DriverConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SessionEvent>,
) -> Option<Submission> {
    let (tick_tx, mut ticks) = mpsc::unbounded_channel::<()>();
    let countdown = start_countdown(config.tick_interval, move || tick_tx.send(()).is_ok());
    let mut low_time_sent = false;

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => {
                let Some(command) = command else { break };
                match command {
                    Command::Abandon => break,
                    Command::Submit { reply } => {
                        let result = submit(&mut session, &config, &countdown, &events).await;
                        let _ = reply.send(result);
                    }
                    other => apply(&mut session, other),
                }
            }

            Some(()) = ticks.recv() => {
                match session.tick() {
                    TickOutcome::Running { remaining_seconds } => {
                        let _ = events.send(SessionEvent::Ticked { remaining_seconds });
                        if !low_time_sent && remaining_seconds <= config.low_time_warning_secs {
                            low_time_sent = true;
                            tracing::info!(remaining_seconds, "low time warning");
                            let _ = events.send(SessionEvent::LowTime { remaining_seconds });
                        }
                    }
                    TickOutcome::Expired(submission) => {
                        countdown.cancel();
                        let _ = events.send(SessionEvent::Ticked { remaining_seconds: 0 });
                        let _ = events.send(SessionEvent::Completed(submission));
                    }
                    TickOutcome::Idle => {}
                }
            }
        }
    }

    countdown.cancel();
    if session.phase() != Phase::Completed {
        tracing::info!(
            exam_id = %session.definition().id,
            phase = %session.phase(),
            "session abandoned"
        );
        let _ = events.send(SessionEvent::Abandoned);
    }
    session.submission().cloned()
}

async fn submit(
    session: &mut ExamSession,
    config: &DriverConfig,
    countdown: &CountdownHandle,
    events: &mpsc::UnboundedSender<SessionEvent>,
) -> Result<Submission, DriverError> {
    session.begin_submit()?;
    countdown.cancel();
    let _ = events.send(SessionEvent::Submitting);

    if !config.submit_ack_delay.is_zero() {
        tokio::time::sleep(config.submit_ack_delay).await;
    }

    let submission = session.complete_submission()?;
    let _ = events.send(SessionEvent::Completed(submission.clone()));
    Ok(submission)
}

fn apply(session: &mut ExamSession, command: Command) {
    match command {
        Command::GoTo { index, reply } => {
            let _ = reply.send(session.go_to(index).map_err(Into::into));
        }
        Command::Next { reply } => {
            let _ = reply.send(session.next().map_err(Into::into));
        }
        Command::Previous { reply } => {
            let _ = reply.send(session.previous().map_err(Into::into));
        }
        Command::RecordAnswer {
            question_id,
            option_index,
            reply,
        } => {
            let result = session.record_answer(&question_id, option_index);
            let _ = reply.send(result.map_err(Into::into));
        }
        Command::AnswerCurrent {
            option_index,
            reply,
        } => {
            let _ = reply.send(session.answer_current(option_index).map_err(Into::into));
        }
        Command::Snapshot { reply } => {
            let _ = reply.send(Ok(SessionSnapshot::of(session)));
        }
        other @ (Command::Submit { .. } | Command::Abandon) => {
            tracing::debug!(command = ?other, "command handled by the run loop");
        }
    }
}
