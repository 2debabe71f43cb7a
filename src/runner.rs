//! Background execution of one job at a time.
//!
//! A [`JobRunner`] owns the "is running" state of one job kind. Starting a
//! job spawns a named worker thread; a second start while the first is still
//! running is refused. Stopping is cooperative: the job sees the request the
//! next time it checks its [`CancelToken`].

use std::any::Any;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use thiserror::Error;

use crate::cancel::{CancelToken, JobContext};
use crate::log::JobLog;
use crate::report::{JobKind, RunReport, RunStatus};

/// Error returned when a job cannot be started.
#[derive(Debug, Error)]
pub enum StartError {
    /// Returned when a job of the same kind is still running.
    #[error("the {0} is already running")]
    AlreadyRunning(JobKind),
    /// Returned when the worker thread cannot be spawned.
    #[error("could not start the {job} worker: {source}")]
    Spawn {
        /// Job that failed to start.
        job: JobKind,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
}

impl From<StartError> for RunReport {
    fn from(error: StartError) -> Self {
        match &error {
            StartError::AlreadyRunning(job) => {
                RunReport::new(*job, RunStatus::AlreadyRunning).with_error(&error)
            }
            StartError::Spawn { job, .. } => RunReport::new(*job, RunStatus::Error).with_error(&error),
        }
    }
}

/// Clears the running flag when the worker ends, including by panic.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs jobs of one kind on a worker thread, one at a time.
#[derive(Debug)]
pub struct JobRunner {
    /// Job this runner starts.
    kind: JobKind,
    /// Set while a worker is alive.
    running: Arc<AtomicBool>,
    /// Token of the current or last run.
    cancel: Mutex<CancelToken>,
}

impl JobRunner {
    /// Create an idle runner for `kind`.
    #[must_use]
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            running: Arc::new(AtomicBool::new(false)),
            cancel: Mutex::new(CancelToken::new()),
        }
    }

    /// Job kind this runner executes.
    #[must_use]
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Whether a job is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start `job` on a worker thread with a fresh [`JobContext`].
    ///
    /// # Errors
    ///
    /// Returns [`StartError::AlreadyRunning`] while an earlier job is running and
    /// [`StartError::Spawn`] when the thread cannot be created.
    ///
    /// # Examples
    /// ```
    /// use beamsec::{JobKind, JobLog, JobRunner, RunReport, RunStatus};
    ///
    /// let runner = JobRunner::new(JobKind::Matcher);
    /// let handle = runner
    ///     .start(JobLog::new("matcher"), |_context| {
    ///         RunReport::new(JobKind::Matcher, RunStatus::NoBeams)
    ///     })
    ///     .expect("runner is idle");
    /// assert_eq!(handle.join().status, RunStatus::NoBeams);
    /// ```
    pub fn start<F>(&self, log: JobLog, job: F) -> Result<JobHandle, StartError>
    where
        F: FnOnce(JobContext) -> RunReport + Send + 'static,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!(job = %self.kind, "start refused while running");
            return Err(StartError::AlreadyRunning(self.kind));
        }
        let guard = RunningGuard(Arc::clone(&self.running));
        let cancel = CancelToken::new();
        *self.cancel.lock() = cancel.clone();
        let context = JobContext::with_cancel(log, cancel.clone());

        let thread = thread::Builder::new()
            .name(format!("beamsec-{}", self.kind))
            .spawn(move || {
                let _guard = guard;
                job(context)
            })
            .map_err(|source| StartError::Spawn {
                job: self.kind,
                source,
            })?;
        tracing::debug!(job = %self.kind, "worker started");
        Ok(JobHandle {
            kind: self.kind,
            thread,
            cancel,
        })
    }

    /// Ask the running job, if any, to stop before its next item.
    pub fn stop(&self) {
        if self.is_running() {
            self.cancel.lock().cancel();
        }
    }
}

/// Handle to a job running on a worker thread.
#[derive(Debug)]
pub struct JobHandle {
    /// Job running on the thread.
    kind: JobKind,
    /// The worker.
    thread: JoinHandle<RunReport>,
    /// Stops the worker when cancelled.
    cancel: CancelToken,
}

impl JobHandle {
    /// Token that stops this job when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether the worker thread has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the job and return its report.
    ///
    /// A job that panicked yields a report with status [`RunStatus::Error`].
    #[must_use]
    pub fn join(self) -> RunReport {
        self.thread.join().unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            tracing::warn!(job = %self.kind, panic = message, "worker panicked");
            RunReport::new(self.kind, RunStatus::Error).with_error(format!("job panicked: {message}"))
        })
    }
}

/// Text of a panic payload, when it carries one.
fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::report::RunStats;

    #[test]
    fn second_start_is_refused_while_running() {
        let runner = JobRunner::new(JobKind::Registrar);
        let (release, gate) = mpsc::channel::<()>();
        let handle = runner
            .start(JobLog::new("registrar"), move |_| {
                gate.recv().ok();
                RunReport::finished(JobKind::Registrar, RunStats::new(0))
            })
            .expect("runner is idle");
        assert!(runner.is_running());

        let refused = runner
            .start(JobLog::new("registrar"), |_| unreachable!("never started"))
            .expect_err("runner is busy");
        let report = RunReport::from(refused);
        assert_eq!(report.status, RunStatus::AlreadyRunning);

        release.send(()).expect("worker waiting");
        let _ = handle.join();
        assert!(!runner.is_running());
    }

    #[test]
    fn stop_reaches_the_running_job() {
        let runner = JobRunner::new(JobKind::Matcher);
        let (started, ready) = mpsc::channel::<()>();
        let handle = runner
            .start(JobLog::new("matcher"), move |context| {
                started.send(()).ok();
                while !context.is_cancelled() {
                    thread::yield_now();
                }
                RunReport::new(JobKind::Matcher, RunStatus::Failed)
            })
            .expect("runner is idle");
        ready.recv().expect("worker started");
        runner.stop();
        assert_eq!(handle.join().status, RunStatus::Failed);
    }

    #[test]
    fn panics_become_error_reports() {
        let runner = JobRunner::new(JobKind::Generator);
        let handle = runner
            .start(JobLog::new("generator"), |_| panic!("engine exploded"))
            .expect("runner is idle");
        let report = handle.join();
        assert_eq!(report.status, RunStatus::Error);
        assert_eq!(report.error.as_deref(), Some("job panicked: engine exploded"));
        assert!(!runner.is_running());
    }
}
