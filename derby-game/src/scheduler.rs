//! Real-time driver that ticks a shared session on a fixed period.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::clock::TICK_PERIOD;
use crate::constants::LOG_TARGET_SESSION;
use crate::session::RaceSession;

/// Session handle shared between the scheduler task and its owner.
pub type SharedSession = Arc<Mutex<RaceSession>>;

/// Owns the repeating timer for one session.
///
/// Each period the task locks the session, runs one [`RaceSession::tick`] and
/// releases it, so a tick always sees the previous tick's result. Pausing
/// keeps the session state, and a later [`start`](Self::start) resumes the
/// race where it stopped.
#[derive(Debug)]
pub struct RaceScheduler {
    session: SharedSession,
    period: Duration,
    task: Option<JoinHandle<()>>,
    cancel: Option<watch::Sender<bool>>,
}

impl RaceScheduler {
    #[must_use]
    pub fn new(session: SharedSession) -> Self {
        Self::with_period(session, TICK_PERIOD)
    }

    /// Scheduler with a custom tick period. A zero period falls back to
    /// [`TICK_PERIOD`].
    #[must_use]
    pub fn with_period(session: SharedSession, period: Duration) -> Self {
        let period = if period.is_zero() { TICK_PERIOD } else { period };
        Self {
            session,
            period,
            task: None,
            cancel: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// True while the tick task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Spawn the tick task. Returns `false` if it is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        let (cancel, cancelled) = watch::channel(false);
        let task = tokio::spawn(run_ticks(Arc::clone(&self.session), self.period, cancelled));
        self.task = Some(task);
        self.cancel = Some(cancel);
        log::debug!(target: LOG_TARGET_SESSION, "scheduler started, period {:?}", self.period);
        true
    }

    /// Stop ticking. Returns `false` if nothing was running.
    ///
    /// A tick already holding the session lock completes; no further tick
    /// starts after this returns. The aborted task may release its session
    /// handle slightly later; use [`stop`](Self::stop) to wait for that.
    pub fn pause(&mut self) -> bool {
        let was_running = self.is_running();
        self.signal_cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if was_running {
            log::debug!(target: LOG_TARGET_SESSION, "scheduler paused");
        }
        was_running
    }

    /// Pause and wait until the tick task has fully ended, so the scheduler
    /// holds the only remaining task-side handle to the session.
    pub async fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        self.signal_cancel();
        if let Some(task) = self.task.take() {
            task.abort();
            match task.await {
                Ok(()) => {}
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    log::warn!(target: LOG_TARGET_SESSION, "scheduler task ended abnormally: {err}");
                }
            }
        }
        if was_running {
            log::debug!(target: LOG_TARGET_SESSION, "scheduler stopped");
        }
        was_running
    }

    /// Wait for the tick task to end on its own, which happens once the
    /// session completes or after [`pause`](Self::pause).
    ///
    /// Cancel-safe: dropping the future leaves the task owned by the
    /// scheduler.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.as_mut() {
            if let Err(err) = task.await {
                log::warn!(target: LOG_TARGET_SESSION, "scheduler task ended abnormally: {err}");
            }
            self.task = None;
        }
        self.cancel = None;
    }

    fn signal_cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            // The task may already be gone; nothing left to signal then.
            let _ = cancel.send(true);
        }
    }
}

impl Drop for RaceScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run_ticks(session: SharedSession, period: Duration, mut cancelled: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = cancelled.changed() => {
                if changed.is_err() || *cancelled.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                if *cancelled.borrow() {
                    break;
                }
                let mut guard = session.lock().await;
                // Paused while waiting for the lock.
                if *cancelled.borrow() {
                    break;
                }
                let outcome = guard.tick();
                drop(guard);
                match outcome {
                    Some(outcome) if outcome.session_complete => break,
                    Some(_) => {}
                    None => break,
                }
            }
        }
    }
}
