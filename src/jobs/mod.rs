//! The three batch jobs and the pieces they share.
//!
//! Every job follows the same lifecycle: validate inputs without touching the
//! engine, start a [`Session`], do its work, then shut the session down and
//! log a summary. Per-item failures are counted; only setup failures end a run
//! early, each with its own [`RunStatus`].

pub mod generator;
pub mod matcher;
pub mod registrar;

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::cancel::JobContext;
use crate::engine::{Engine, SessionId, Session};
use crate::errors::{EngineError, ValidationError};
use crate::log::JobLog;
use crate::report::{render_summary, JobKind, RunReport, RunStatus};

/// Whether `path` has extension `extension`, ignoring case.
fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|found| found.to_str())
        .map_or(false, |found| found.eq_ignore_ascii_case(extension))
}

/// Files directly inside `folder` with extension `extension`, sorted by name.
///
/// Subfolders are not searched. Entries that cannot be read are skipped.
#[must_use]
pub fn list_files(folder: &Path, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| has_extension(path, extension))
        .collect()
}

/// Check that a model file exists and carries the expected extension.
///
/// # Errors
///
/// Returns [`ValidationError::MissingModel`] or [`ValidationError::WrongExtension`].
pub fn check_model(path: &Path, extension: &str) -> Result<(), ValidationError> {
    if !path.is_file() {
        return Err(ValidationError::MissingModel(path.to_path_buf()));
    }
    if !has_extension(path, extension) {
        return Err(ValidationError::WrongExtension {
            path: path.to_path_buf(),
            expected: extension.to_string(),
        });
    }
    Ok(())
}

/// Check that an input folder exists.
///
/// # Errors
///
/// Returns [`ValidationError::MissingFolder`].
pub fn check_folder(path: &Path) -> Result<(), ValidationError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(ValidationError::MissingFolder(path.to_path_buf()))
    }
}

/// Create an output folder if it does not exist yet.
///
/// # Errors
///
/// Returns [`ValidationError::CreateFolder`] when the folder cannot be created.
pub fn ensure_folder(path: &Path, log: &JobLog) -> Result<(), ValidationError> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|error| ValidationError::CreateFolder {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    log.info(format!("Created folder {}", path.display()));
    Ok(())
}

/// Check that a name prefix is not blank.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyPrefix`].
pub fn check_prefix(prefix: &str) -> Result<(), ValidationError> {
    if prefix.trim().is_empty() {
        Err(ValidationError::EmptyPrefix)
    } else {
        Ok(())
    }
}

/// Log the closing summary and hand the report back.
fn finish(report: RunReport, log: &JobLog) -> RunReport {
    log.rule('=');
    for line in render_summary(&report).lines() {
        log.info(line);
    }
    log.rule('=');
    report
}

/// Report for inputs rejected before the engine is touched.
fn rejected(job: JobKind, error: &ValidationError, log: &JobLog) -> RunReport {
    log.warn(format!("Validation failed: {error}"));
    finish(RunReport::new(job, RunStatus::ValidationFailed).with_error(error), log)
}

/// Run `body` inside an engine session and always shut the session down.
///
/// An [`EngineError`] escaping `body` becomes a report with status
/// [`RunStatus::Error`]. When the engine refuses to initialise, a release is
/// still attempted before the run ends with [`RunStatus::Error`].
fn in_session<E, F>(
    engine: &mut E,
    job: JobKind,
    session: SessionId,
    context: &JobContext,
    body: F,
) -> RunReport
where
    E: Engine + ?Sized,
    F: FnOnce(&mut Session<'_, E>) -> Result<RunReport, EngineError>,
{
    let log = &context.log;
    let error = match Session::start(&mut *engine, session) {
        Ok(mut session) => {
            log.info("Engine initialised");
            let report = body(&mut session).unwrap_or_else(|error| {
                log.warn(format!("The {job} stopped: {error}"));
                RunReport::new(job, RunStatus::Error).with_error(error)
            });
            session.shutdown(log);
            return finish(report, log);
        }
        Err(error) => error,
    };
    log.warn(format!("Could not initialise engine: {error}"));
    match engine.release() {
        Ok(()) => log.info("Engine released"),
        Err(code) => log.warn(format!(
            "Could not release engine: {}",
            EngineError::new(code, engine.error_message(code))
        )),
    }
    finish(RunReport::new(job, RunStatus::Error).with_error(error), log)
}
