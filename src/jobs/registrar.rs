//! Turn a folder of section files into beam property records.

use std::path::Path;

use crate::cancel::JobContext;
use crate::config::RegistrarConfig;
use crate::engine::{Engine, PropertyClass, Session};
use crate::errors::{EngineError, ValidationError};
use crate::report::{JobKind, RunReport, RunStats, RunStatus};

use super::{check_folder, check_model, check_prefix, in_session, list_files, rejected};

/// Reject a missing model, a missing section folder or a blank prefix.
fn validate(config: &RegistrarConfig) -> Result<(), ValidationError> {
    check_model(&config.model_path, &config.model_extension)?;
    check_folder(&config.section_folder)?;
    check_prefix(&config.name_prefix)
}

/// Create one beam property per section file in the configured folder.
///
/// Files are taken in name order and numbered from one above the highest
/// property identifier already in the model. A file whose registration fails
/// keeps its identifier unused; later files are not renumbered.
pub fn register_sections<E: Engine + ?Sized>(
    engine: &mut E,
    config: &RegistrarConfig,
    context: &JobContext,
) -> RunReport {
    let log = &context.log;
    log.rule('=');
    log.info(format!(
        "Registering sections from {} into {}",
        config.section_folder.display(),
        config.model_path.display()
    ));
    if let Err(error) = validate(config) {
        return rejected(JobKind::Registrar, &error, log);
    }
    in_session(engine, JobKind::Registrar, config.session, context, |session| {
        run(session, config, context)
    })
}

/// Number and register every section file, inside an open session.
fn run<E: Engine + ?Sized>(
    session: &mut Session<'_, E>,
    config: &RegistrarConfig,
    context: &JobContext,
) -> Result<RunReport, EngineError> {
    let log = &context.log;
    session.open(&config.model_path)?;
    log.info("Model opened");
    let totals = session.property_totals(PropertyClass::Beam)?;
    log.info(format!(
        "Model has {} beam properties, highest identifier {}",
        totals.count, totals.highest
    ));

    let files = list_files(&config.section_folder, &config.section_extension);
    if files.is_empty() {
        log.warn(format!(
            "No .{} files found in {}",
            config.section_extension,
            config.section_folder.display()
        ));
        return Ok(RunReport::new(JobKind::Registrar, RunStatus::NoFiles));
    }

    let first = totals.highest + 1;
    let last = totals.highest + files.len() as u32;
    log.info(format!(
        "Registering {} sections as properties {first} to {last}",
        files.len()
    ));

    let mut stats = RunStats::new(files.len());
    let mut created = Vec::new();
    for (offset, file) in files.iter().enumerate() {
        if context.is_cancelled() {
            stats.skipped = files.len() - offset;
            log.warn(format!("Stop requested; {} files skipped", stats.skipped));
            break;
        }
        let property = first + offset as u32;
        let stem = file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{}{stem}", config.name_prefix);
        match register(session, config, property, &name, file) {
            Ok(()) => {
                stats.succeeded += 1;
                created.push(property);
                log.info(format!("Property {property} created: {name}"));
            }
            Err(error) => {
                stats.failed += 1;
                log.warn(format!("Property {property} ({name}) failed: {error}"));
            }
        }
    }

    if let (Some(low), Some(high)) = (created.first(), created.last()) {
        log.info(format!(
            "Created {} properties in the range {low} to {high}",
            created.len()
        ));
    }
    Ok(RunReport::finished(JobKind::Registrar, stats))
}

/// Create, type, material and section one property, saving after each step.
fn register<E: Engine + ?Sized>(
    session: &mut Session<'_, E>,
    config: &RegistrarConfig,
    property: u32,
    name: &str,
    section: &Path,
) -> Result<(), EngineError> {
    session.new_beam_property(property, config.beam_type, name)?;
    session.set_beam_property_type(property, config.beam_type)?;
    session.save()?;
    session.assign_library_material(PropertyClass::Beam, property, config.material)?;
    session.save()?;
    session.assign_section(property, section)?;
    session.save()
}
