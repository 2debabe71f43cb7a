//! Assign beam properties by matching external beam IDs to property names.
//!
//! A beam with ID `411` receives the property named `prefix + "411"`, compared
//! without regard to case. Beams whose name has no property are counted as
//! not found and left untouched.

use std::collections::BTreeMap;

use crate::cancel::JobContext;
use crate::catalog::PropertyCatalog;
use crate::config::MatcherConfig;
use crate::engine::{Engine, EntityClass, PropertyClass, Session};
use crate::errors::{EngineError, ValidationError};
use crate::log::JobLog;
use crate::report::{BeamAssignment, JobKind, RunReport, RunStats, RunStatus};

use super::{check_model, check_prefix, in_session, rejected};

/// What happened to a single beam.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The beam received `property`.
    Assigned {
        /// External beam ID.
        id: u64,
        /// Assigned property identifier.
        property: u32,
    },
    /// No property carries the expected name.
    NotFound,
    /// Reading the ID or assigning the property failed.
    Failed,
}

/// Reject a missing or misnamed model and a blank prefix.
fn validate(config: &MatcherConfig) -> Result<(), ValidationError> {
    check_model(&config.model_path, &config.model_extension)?;
    check_prefix(&config.prefix)
}

/// Assign every beam in the configured model the property named after its ID.
///
/// The model is saved once after the loop, including after a stop request.
/// The returned counts always satisfy
/// `succeeded + not_found + failed + skipped == total`.
pub fn assign_by_id<E: Engine + ?Sized>(
    engine: &mut E,
    config: &MatcherConfig,
    context: &JobContext,
) -> RunReport {
    let log = &context.log;
    log.rule('=');
    log.info(format!(
        "Assigning properties by beam ID in {}",
        config.model_path.display()
    ));
    if let Err(error) = validate(config) {
        return rejected(JobKind::Matcher, &error, log);
    }
    in_session(engine, JobKind::Matcher, config.session, context, |session| {
        run(session, config, context)
    })
}

/// Catalog, beam loop and single save, inside an open session.
fn run<E: Engine + ?Sized>(
    session: &mut Session<'_, E>,
    config: &MatcherConfig,
    context: &JobContext,
) -> Result<RunReport, EngineError> {
    let log = &context.log;
    session.open(&config.model_path)?;
    log.info("Model opened");

    let catalog = match PropertyCatalog::build(session, PropertyClass::Beam) {
        Ok(catalog) => catalog,
        Err(error) => {
            log.warn(format!("Could not build the property catalog: {error}"));
            return Ok(RunReport::new(JobKind::Matcher, RunStatus::CatalogFailed).with_error(error));
        }
    };
    log.info(format!("Found {} beam properties", catalog.len()));
    catalog.log_prefixed(&config.prefix, log);

    let total = session.entity_total(EntityClass::Beam)?;
    if total == 0 {
        log.warn("The model has no beams");
        return Ok(RunReport::new(JobKind::Matcher, RunStatus::NoBeams));
    }
    log.info(format!("Processing {total} beams"));

    let mut stats = RunStats::new(total);
    let mut assigned = BTreeMap::new();
    for index in 1..=total {
        if context.is_cancelled() {
            stats.skipped = total - index + 1;
            log.warn(format!("Stop requested; {} beams skipped", stats.skipped));
            break;
        }
        match assign_beam(session, &catalog, config, index, log) {
            Outcome::Assigned { id, property } => {
                stats.succeeded += 1;
                assigned.insert(index, (id, property));
            }
            Outcome::NotFound => stats.not_found += 1,
            Outcome::Failed => stats.failed += 1,
        }
    }

    match session.save() {
        Ok(()) => log.info("Model saved"),
        Err(error) => log.warn(format!("Could not save model: {error}")),
    }

    let mut report = RunReport::finished(JobKind::Matcher, stats);
    report.assignments = assigned
        .into_iter()
        .map(|(index, (id, property))| BeamAssignment { index, id, property })
        .collect();
    Ok(report)
}

/// Resolve and assign the property of the beam at `index`.
fn assign_beam<E: Engine + ?Sized>(
    session: &mut Session<'_, E>,
    catalog: &PropertyCatalog,
    config: &MatcherConfig,
    index: usize,
    log: &JobLog,
) -> Outcome {
    let id = match session.beam_id(index) {
        Ok(id) => id,
        Err(error) => {
            log.warn(format!("Beam {index}: could not read ID: {error}"));
            return Outcome::Failed;
        }
    };
    let name = config.expected_name(id);
    let Some(property) = catalog.resolve(&name) else {
        log.info(format!("Beam {index} (ID {id}): no property named {name}"));
        return Outcome::NotFound;
    };
    match session.set_element_property(EntityClass::Beam, index, property) {
        Ok(()) => {
            log.info(format!("Beam {index} (ID {id}) -> {name} (property {property})"));
            Outcome::Assigned { id, property }
        }
        Err(error) => {
            log.warn(format!("Beam {index} (ID {id}): could not assign {name}: {error}"));
            Outcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use super::*;
    use crate::geometry::point;
    use crate::local::{read_model, write_model, LocalEngine};
    use crate::log::MemorySink;
    use crate::model::{BeamIndex, Model, PropertyRecord};

    fn frame(dir: &Path, ids: &[u64], names: &[&str]) -> PathBuf {
        let mut model = Model::new();
        let mut previous = model.add_node(point(0.0, 0.0, 0.0));
        for (offset, id) in ids.iter().enumerate() {
            let next = model.add_node(point(offset as f64 + 1.0, 0.0, 0.0));
            model.add_beam(previous, next, *id).expect("nodes exist");
            previous = next;
        }
        for (offset, name) in names.iter().enumerate() {
            model
                .add_property(offset as u32 + 1, PropertyRecord::named(*name))
                .expect("identifier free");
        }
        let path = dir.join("frame.st7");
        write_model(&path, &model).expect("model written");
        path
    }

    fn config(path: PathBuf) -> MatcherConfig {
        MatcherConfig {
            model_path: path,
            ..MatcherConfig::default()
        }
    }

    fn quiet() -> (JobContext, MemorySink) {
        let sink = MemorySink::new();
        let log = JobLog::new("matcher").with_sink(Arc::new(sink.clone()));
        (JobContext::new(log), sink)
    }

    #[test]
    fn matching_names_are_assigned() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = frame(dir.path(), &[411, 999], &["other", "SEC_411"]);
        let mut engine = LocalEngine::new();
        let (context, sink) = quiet();

        let report = assign_by_id(&mut engine, &config(path.clone()), &context);
        assert_eq!(report.status, RunStatus::PartialSuccess);
        assert_eq!(report.stats.succeeded, 1);
        assert_eq!(report.stats.not_found, 1);
        assert_eq!(
            report.assignments,
            [BeamAssignment {
                index: 1,
                id: 411,
                property: 2
            }]
        );
        assert!(sink.contains("no property named sec_999"));
        assert!(sink.contains("1 of 2 properties start with 'sec_'"));

        let model = read_model(&path).expect("model reads back");
        assert_eq!(model.beam_property(BeamIndex::new(1)), Ok(Some(2)));
        assert_eq!(model.beam_property(BeamIndex::new(2)), Ok(None));
        assert_eq!(engine.save_count(), 1);
        assert_eq!(engine.release_count(), 1);
    }

    #[test]
    fn empty_prefix_is_rejected_before_init() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = frame(dir.path(), &[1], &["sec_1"]);
        let mut engine = LocalEngine::new();
        let (context, _) = quiet();
        let report = assign_by_id(
            &mut engine,
            &MatcherConfig {
                prefix: String::new(),
                ..config(path)
            },
            &context,
        );
        assert_eq!(report.status, RunStatus::ValidationFailed);
        assert_eq!(engine.init_count(), 0);
    }

    #[test]
    fn model_without_properties_fails_the_catalog() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = frame(dir.path(), &[1, 2], &[]);
        let mut engine = LocalEngine::new();
        let (context, _) = quiet();
        let report = assign_by_id(&mut engine, &config(path), &context);
        assert_eq!(report.status, RunStatus::CatalogFailed);
        assert_eq!(engine.close_count(), 1);
        assert_eq!(engine.release_count(), 1);
        assert_eq!(engine.save_count(), 0);
    }

    #[test]
    fn model_without_beams_reports_no_beams() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = frame(dir.path(), &[], &["sec_1"]);
        let mut engine = LocalEngine::new();
        let (context, _) = quiet();
        let report = assign_by_id(&mut engine, &config(path), &context);
        assert_eq!(report.status, RunStatus::NoBeams);
        assert_eq!(report.stats.total, 0);
        assert_eq!(engine.release_count(), 1);
    }

    #[test]
    fn cancelled_before_start_skips_everything() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = frame(dir.path(), &[1, 2, 3], &["sec_1"]);
        let mut engine = LocalEngine::new();
        let (context, _) = quiet();
        context.cancel.cancel();
        let report = assign_by_id(&mut engine, &config(path), &context);
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.stats.skipped, 3);
        assert_eq!(engine.save_count(), 1);
    }
}
