//! Outcome of a job run and its printed summary.

use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

/// The three batch jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Geometry files to section files.
    Generator,
    /// Section files to property records.
    Registrar,
    /// Beams to properties by external ID.
    Matcher,
}

impl JobKind {
    /// Short name used in logs and thread names.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Generator => "generator",
            Self::Registrar => "registrar",
            Self::Matcher => "matcher",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Final status tag of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every item succeeded.
    Success,
    /// Some items succeeded.
    PartialSuccess,
    /// No item succeeded.
    Failed,
    /// Inputs were rejected before the engine was touched.
    ValidationFailed,
    /// The input folder held no matching files.
    NoFiles,
    /// The model has no beams.
    NoBeams,
    /// The property catalog could not be built.
    CatalogFailed,
    /// Another run of the same job was still in progress.
    AlreadyRunning,
    /// Setup or the engine failed outside the per-item loop.
    Error,
}

impl RunStatus {
    /// Classify a finished loop by how many of `total` items succeeded.
    ///
    /// # Examples
    /// ```
    /// use beamsec::RunStatus;
    ///
    /// assert_eq!(RunStatus::classify(10, 10), RunStatus::Success);
    /// assert_eq!(RunStatus::classify(10, 3), RunStatus::PartialSuccess);
    /// assert_eq!(RunStatus::classify(10, 0), RunStatus::Failed);
    /// ```
    #[must_use]
    pub fn classify(total: usize, succeeded: usize) -> Self {
        if total > 0 && succeeded == total {
            Self::Success
        } else if succeeded > 0 {
            Self::PartialSuccess
        } else {
            Self::Failed
        }
    }

    /// Snake-case tag as serialised.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
            Self::ValidationFailed => "validation_failed",
            Self::NoFiles => "no_files",
            Self::NoBeams => "no_beams",
            Self::CatalogFailed => "catalog_failed",
            Self::AlreadyRunning => "already_running",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Per-item counters of one run.
///
/// A finished loop always satisfies
/// `succeeded + not_found + failed + skipped == total`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Items the job set out to process.
    pub total: usize,
    /// Items processed successfully.
    pub succeeded: usize,
    /// Items with no matching property.
    pub not_found: usize,
    /// Items whose processing failed.
    pub failed: usize,
    /// Items left unprocessed after a stop request.
    pub skipped: usize,
}

impl RunStats {
    /// Counters for a run over `total` items.
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Items accounted for so far.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.succeeded + self.not_found + self.failed + self.skipped
    }

    /// Share of `total` that succeeded, in percent.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64 * 100.0
        }
    }
}

/// One beam the matcher assigned a property to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamAssignment {
    /// 1-based ordinal of the beam.
    pub index: usize,
    /// External beam ID.
    pub id: u64,
    /// Assigned property identifier.
    pub property: u32,
}

/// Result of one job run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Job that produced the report.
    pub job: JobKind,
    /// Final status tag.
    pub status: RunStatus,
    /// Per-item counters.
    #[serde(flatten)]
    pub stats: RunStats,
    /// Message of the error behind a setup failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Assignments made by the matcher, in beam order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignments: Vec<BeamAssignment>,
}

impl RunReport {
    /// Report with `status` and no counted items.
    #[must_use]
    pub fn new(job: JobKind, status: RunStatus) -> Self {
        Self {
            job,
            status,
            stats: RunStats::default(),
            error: None,
            assignments: Vec::new(),
        }
    }

    /// Report for a finished loop, classified by its counters.
    #[must_use]
    pub fn finished(job: JobKind, stats: RunStats) -> Self {
        Self {
            stats,
            ..Self::new(job, RunStatus::classify(stats.total, stats.succeeded))
        }
    }

    /// Attach the message of the error that ended the run.
    #[must_use]
    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Whether every item succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Render the closing summary block of a run.
///
/// Counters that do not apply to the job are left out: only the matcher
/// reports properties that were not found, together with its success rate.
#[must_use]
pub fn render_summary(report: &RunReport) -> String {
    let mut output = String::new();
    let stats = &report.stats;
    let (noun, verb) = match report.job {
        JobKind::Generator => ("Files", "Generated"),
        JobKind::Registrar => ("Files", "Registered"),
        JobKind::Matcher => ("Beams", "Assigned"),
    };

    writeln!(&mut output, "{} finished: {}", report.job, report.status)
        .expect("writing to string cannot fail");
    writeln!(&mut output, "Total {}: {}", noun.to_lowercase(), stats.total)
        .expect("writing to string cannot fail");
    writeln!(&mut output, "{verb}: {}", stats.succeeded).expect("writing to string cannot fail");
    if report.job == JobKind::Matcher {
        writeln!(&mut output, "Not found: {}", stats.not_found)
            .expect("writing to string cannot fail");
    }
    writeln!(&mut output, "Failed: {}", stats.failed).expect("writing to string cannot fail");
    if stats.skipped > 0 {
        writeln!(&mut output, "Skipped: {}", stats.skipped)
            .expect("writing to string cannot fail");
    }
    if report.job == JobKind::Matcher && stats.total > 0 {
        writeln!(&mut output, "Success rate: {:.1}%", stats.success_rate())
            .expect("writing to string cannot fail");
    }
    if let Some(error) = &report.error {
        writeln!(&mut output, "Error: {error}").expect("writing to string cannot fail");
    }

    output
}
