//! Convert a folder of geometry files into section definition files.
//!
//! Each file is imported into its own scratch model, surface meshed, cleaned
//! and exported. The scratch model is saved for inspection and closed before
//! the next file starts.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cancel::JobContext;
use crate::config::GeneratorConfig;
use crate::engine::{Engine, Session};
use crate::errors::{EngineError, ValidationError};
use crate::log::JobLog;
use crate::options::{CleanOptions, ImportOptions, MeshOptions};
use crate::report::{JobKind, RunReport, RunStats, RunStatus};

use super::{check_folder, ensure_folder, in_session, list_files, rejected};

/// Scratch model and section file derived from one geometry file.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Targets {
    /// `temp_<stem>` model in the scratch folder.
    scratch: PathBuf,
    /// `<stem>` section file in the output folder.
    output: PathBuf,
}

impl Targets {
    /// Targets for the geometry file named `stem`.
    fn new(config: &GeneratorConfig, stem: &str) -> Self {
        Self {
            scratch: config
                .scratch_folder
                .join(format!("temp_{stem}.{}", config.model_extension)),
            output: config
                .output_folder
                .join(format!("{stem}.{}", config.section_extension)),
        }
    }
}

/// Require the geometry folder and create the output and scratch folders.
fn validate(config: &GeneratorConfig, log: &JobLog) -> Result<(), ValidationError> {
    check_folder(&config.geometry_folder)?;
    ensure_folder(&config.output_folder, log)?;
    ensure_folder(&config.scratch_folder, log)
}

/// Generate one section file per geometry file in the configured folder.
///
/// A file that fails at any step is counted and the job moves on to the next
/// one; nothing is retried.
pub fn generate_sections<E: Engine + ?Sized>(
    engine: &mut E,
    config: &GeneratorConfig,
    context: &JobContext,
) -> RunReport {
    let log = &context.log;
    log.rule('=');
    log.info(format!(
        "Generating sections from {} into {}",
        config.geometry_folder.display(),
        config.output_folder.display()
    ));
    if let Err(error) = validate(config, log) {
        return rejected(JobKind::Generator, &error, log);
    }
    in_session(engine, JobKind::Generator, config.session, context, |session| {
        Ok(run(session, config, context))
    })
}

/// Process every geometry file, inside a started session.
fn run<E: Engine + ?Sized>(
    session: &mut Session<'_, E>,
    config: &GeneratorConfig,
    context: &JobContext,
) -> RunReport {
    let log = &context.log;
    let files = list_files(&config.geometry_folder, &config.geometry_extension);
    if files.is_empty() {
        log.warn(format!(
            "No .{} files found in {}",
            config.geometry_extension,
            config.geometry_folder.display()
        ));
        return RunReport::new(JobKind::Generator, RunStatus::NoFiles);
    }
    log.info(format!("Found {} geometry files", files.len()));

    let mut stats = RunStats::new(files.len());
    for (offset, file) in files.iter().enumerate() {
        if context.is_cancelled() {
            stats.skipped = files.len() - offset;
            log.warn(format!("Stop requested; {} files skipped", stats.skipped));
            break;
        }
        let stem = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        log.info(format!("[{}/{}] {stem}", offset + 1, files.len()));
        let targets = Targets::new(config, &stem);
        remove_stale(&targets.scratch, log);
        match generate(session, config, file, &targets) {
            Ok(()) => {
                stats.succeeded += 1;
                log.info(format!("Section written to {}", targets.output.display()));
            }
            Err(error) => {
                stats.failed += 1;
                log.warn(format!("{stem} failed: {error}"));
                if let Err(error) = session.close() {
                    tracing::debug!(%error, "scratch model close after failure");
                }
            }
        }
    }
    RunReport::finished(JobKind::Generator, stats)
}

/// Delete a scratch model left over from an earlier run.
fn remove_stale(scratch: &Path, log: &JobLog) {
    if !scratch.exists() {
        return;
    }
    match fs::remove_file(scratch) {
        Ok(()) => log.info(format!("Removed stale {}", scratch.display())),
        Err(error) => log.warn(format!(
            "Could not remove stale {}: {error}",
            scratch.display()
        )),
    }
}

/// Take one geometry file through import, mesh, clean and export.
fn generate<E: Engine + ?Sized>(
    session: &mut Session<'_, E>,
    config: &GeneratorConfig,
    geometry: &Path,
    targets: &Targets,
) -> Result<(), EngineError> {
    session.create(&targets.scratch, &config.scratch_folder)?;
    session.import_geometry(geometry, &ImportOptions::default())?;
    session.surface_mesh(&MeshOptions::default())?;
    session.clean_mesh(&CleanOptions::default())?;
    session.export_section(&targets.output)?;
    session.save()?;
    session.close()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cancel::CancelToken;
    use crate::geometry::point;
    use crate::iges::write_points;
    use crate::local::LocalEngine;
    use crate::log::{LogSink, MemorySink};
    use crate::section::SectionFile;

    fn setup(dir: &Path) -> GeneratorConfig {
        let geometry = dir.join("geometry");
        fs::create_dir(&geometry).expect("folder created");
        GeneratorConfig {
            geometry_folder: geometry,
            output_folder: dir.join("out"),
            scratch_folder: dir.join("scratch"),
            ..GeneratorConfig::default()
        }
    }

    fn context() -> (JobContext, MemorySink) {
        let sink = MemorySink::new();
        let log = JobLog::new("generator").with_sink(Arc::new(sink.clone()));
        (JobContext::new(log), sink)
    }

    #[test]
    fn targets_follow_naming_rules() {
        let config = GeneratorConfig::default();
        let targets = Targets::new(&config, "ipe200");
        assert_eq!(targets.scratch, PathBuf::from("scratch/temp_ipe200.st7"));
        assert_eq!(targets.output, PathBuf::from("sections/ipe200.bxs"));
    }

    #[test]
    fn outlines_become_section_files() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let config = setup(dir.path());
        let square = [
            point(0.0, 0.0, 0.0),
            point(1.0, 0.0, 0.0),
            point(1.0, 1.0, 0.0),
            point(0.0, 1.0, 0.0),
        ];
        fs::write(config.geometry_folder.join("box.igs"), write_points(&square, "box"))
            .expect("fixture written");
        fs::write(config.geometry_folder.join("empty.igs"), "").expect("fixture written");
        let mut engine = LocalEngine::new();
        let (context, sink) = context();

        let report = generate_sections(&mut engine, &config, &context);
        assert_eq!(report.status, RunStatus::PartialSuccess);
        assert_eq!(report.stats.succeeded, 1);
        assert_eq!(report.stats.failed, 1);
        assert!(sink.contains("Created folder"));
        assert!(sink.contains("empty failed"));

        let section = SectionFile::read(&config.output_folder.join("box.bxs"))
            .expect("section file written");
        assert!((section.properties.area - 1.0).abs() < 1.0e-9);
        assert!(config.scratch_folder.join("temp_box.st7").is_file());
        assert!(!config.output_folder.join("empty.bxs").exists());
        assert_eq!(engine.init_count(), 1);
        assert_eq!(engine.release_count(), 1);
    }

    #[test]
    fn stale_scratch_models_are_replaced() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let config = setup(dir.path());
        fs::create_dir(&config.scratch_folder).expect("folder created");
        fs::write(config.scratch_folder.join("temp_box.st7"), "stale").expect("fixture written");
        let square = [
            point(0.0, 0.0, 0.0),
            point(2.0, 0.0, 0.0),
            point(2.0, 2.0, 0.0),
            point(0.0, 2.0, 0.0),
        ];
        fs::write(config.geometry_folder.join("box.igs"), write_points(&square, "box"))
            .expect("fixture written");
        let mut engine = LocalEngine::new();
        let (context, sink) = context();

        let report = generate_sections(&mut engine, &config, &context);
        assert!(report.is_success());
        assert!(sink.contains("Removed stale"));
        let scratch = fs::read_to_string(config.scratch_folder.join("temp_box.st7"))
            .expect("scratch model saved");
        assert_ne!(scratch, "stale");
    }

    #[test]
    fn stop_request_skips_the_remaining_files() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let config = setup(dir.path());
        for name in ["a", "b", "c", "d"] {
            let outline = [
                point(0.0, 0.0, 0.0),
                point(3.0, 0.0, 0.0),
                point(0.0, 3.0, 0.0),
            ];
            fs::write(
                config.geometry_folder.join(format!("{name}.igs")),
                write_points(&outline, name),
            )
            .expect("fixture written");
        }
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let sink = MemorySink::new();
        let recorder = sink.clone();
        let log = JobLog::new("generator").with_sink(Arc::new(move |line: &str| {
            recorder.write_line(line);
            if line.contains("[2/4]") {
                trigger.cancel();
            }
        }));
        let context = JobContext::with_cancel(log, cancel);
        let mut engine = LocalEngine::new();

        let report = generate_sections(&mut engine, &config, &context);

        let stats = report.stats;
        assert_eq!(report.status, RunStatus::PartialSuccess);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.skipped, 2);
        assert_eq!(
            stats.succeeded + stats.not_found + stats.failed + stats.skipped,
            stats.total
        );
        assert_eq!(engine.save_count(), 2);
        assert!(sink.contains("2 files skipped"));
        assert!(config.output_folder.join("b.bxs").is_file());
        assert!(!config.output_folder.join("c.bxs").exists());
        assert_eq!(engine.release_count(), 1);
    }

    #[test]
    fn empty_folder_reports_no_files() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let config = setup(dir.path());
        let mut engine = LocalEngine::new();
        let (context, _) = context();
        let report = generate_sections(&mut engine, &config, &context);
        assert_eq!(report.status, RunStatus::NoFiles);
    }
}
