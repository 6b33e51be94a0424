//! Cancellable timers on the tokio clock
//!
//! Fades, auto-pause windows, audio settle delays and the resource sweep all
//! run as `TimerHandle`s. Cancelling (or dropping) a handle aborts the task,
//! so a superseded fade can never touch a newer session. Because the tasks
//! sleep on `tokio::time`, tests drive them with a paused clock instead of
//! waiting on wall-clock delays.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Handle to a scheduled task; aborts the task when cancelled or dropped
#[derive(Debug)]
pub struct TimerHandle {
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Run `f` once after `delay`
    pub fn after<F>(delay: Duration, f: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            time::sleep(delay).await;
            f.await;
        });
        Self { task: Some(task) }
    }

    /// Run `f` every `period`, first run one period from now
    pub fn every<F, Fut>(period: Duration, mut f: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                f().await;
            }
        });
        Self { task: Some(task) }
    }

    /// Run an arbitrary future as a cancellable task
    pub fn spawn<F>(f: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            task: Some(tokio::spawn(f)),
        }
    }

    /// Abort the task if it has not finished
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// True while the task is scheduled or running
    pub fn is_pending(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
