//! Countdown timer and clock formatting.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Format seconds as `mm:ss` (minutes are not capped at 59).
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Cancellation handle for a running countdown.
///
/// Dropping the handle cancels the countdown as well.
#[derive(Debug)]
pub struct CountdownHandle {
    task: JoinHandle<()>,
}

impl CountdownHandle {
    /// Stop the countdown. No callback runs after this returns.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Invoke `on_tick` every `period`, first after one full period.
///
/// The countdown stops when `on_tick` returns `false` or the handle is
/// cancelled. Missed periods are caught up so no second is lost. Must be
/// called from within a tokio runtime.
pub fn start_countdown<F>(period: Duration, mut on_tick: F) -> CountdownHandle
where
    F: FnMut() -> bool + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        loop {
            interval.tick().await;
            if !on_tick() {
                break;
            }
        }
    });
    CountdownHandle { task }
}
