//! Human-readable progress stream for batch jobs.
//!
//! Every job writes a linear, timestamped log through a [`JobLog`]. Lines go
//! to a pluggable [`LogSink`] (a GUI text box, a channel, a test buffer) and
//! fall back to standard output when no sink is set. The same messages are
//! emitted as `tracing` events so a subscriber sees them too.

use std::fmt;
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;

/// Width of separator rules in the log.
const RULE_WIDTH: usize = 60;

/// Destination for formatted log lines.
pub trait LogSink: Send + Sync {
    /// Receive one complete line, already timestamped.
    fn write_line(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn write_line(&self, line: &str) {
        self(line);
    }
}

/// Sink that prints each line to standard output.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn write_line(&self, line: &str) {
        println!("{line}");
    }
}

/// Sink that keeps every line in memory, for polling from another thread.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    /// Lines in the order they were written.
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every line written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Whether any line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }

    /// Number of lines that contain `needle`.
    #[must_use]
    pub fn count(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Timestamped log handle owned by one job run.
#[derive(Clone)]
pub struct JobLog {
    /// Job name attached to every tracing event.
    job: &'static str,
    /// Where lines go; standard output when `None`.
    sink: Option<Arc<dyn LogSink>>,
}

impl JobLog {
    /// Log for `job` that writes to standard output.
    #[must_use]
    pub fn new(job: &'static str) -> Self {
        Self { job, sink: None }
    }

    /// Route lines to `sink` instead of standard output.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Name of the job this log belongs to.
    #[must_use]
    pub fn job(&self) -> &'static str {
        self.job
    }

    /// Record a progress step.
    pub fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::debug!(job = self.job, "{message}");
        self.emit(message);
    }

    /// Record a failure or anomaly.
    pub fn warn(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        tracing::warn!(job = self.job, "{message}");
        self.emit(message);
    }

    /// Record a separator rule made of `ch`.
    pub fn rule(&self, ch: char) {
        let rule: String = std::iter::repeat(ch).take(RULE_WIDTH).collect();
        self.emit(&rule);
    }

    /// Timestamp `message` and hand it to the sink.
    fn emit(&self, message: &str) {
        let line = format!("[{}] {message}", Local::now().format("%H:%M:%S"));
        match &self.sink {
            Some(sink) => sink.write_line(&line),
            None => println!("{line}"),
        }
    }
}

impl fmt::Debug for JobLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobLog")
            .field("job", &self.job)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
