#![warn(clippy::pedantic)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use approx::assert_relative_eq;
use beamsec::jobs::{generator, matcher, registrar};
use beamsec::section::SectionFile;
use beamsec::{
    iges, point, read_model, write_model, BeamIndex, GeneratorConfig, JobContext, JobLog,
    LocalEngine, MatcherConfig, MemorySink, Model, Point, RegistrarConfig, RunStatus,
};

/// A 100 x 10 flat bar.
fn flat_bar() -> Vec<Point> {
    vec![
        point(0.0, 0.0, 0.0),
        point(100.0, 0.0, 0.0),
        point(100.0, 10.0, 0.0),
        point(0.0, 10.0, 0.0),
    ]
}

/// An equal angle, 50 x 50 x 5, listed clockwise.
fn angle() -> Vec<Point> {
    vec![
        point(0.0, 0.0, 0.0),
        point(0.0, 50.0, 0.0),
        point(5.0, 50.0, 0.0),
        point(5.0, 5.0, 0.0),
        point(50.0, 5.0, 0.0),
        point(50.0, 0.0, 0.0),
    ]
}

fn context(job: &'static str) -> (JobContext, MemorySink) {
    let sink = MemorySink::new();
    let log = JobLog::new(job).with_sink(Arc::new(sink.clone()));
    (JobContext::new(log), sink)
}

fn write_geometry(folder: &Path, name: &str, outline: &[Point]) {
    fs::write(
        folder.join(format!("{name}.igs")),
        iges::write_points(outline, name),
    )
    .expect("geometry written");
}

#[test]
fn outlines_become_assigned_beam_properties() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let geometry = dir.path().join("geometry");
    fs::create_dir(&geometry).expect("folder created");
    write_geometry(&geometry, "101", &flat_bar());
    write_geometry(&geometry, "102", &angle());

    let mut engine = LocalEngine::new();

    // Generate the section library.
    let generate = GeneratorConfig {
        geometry_folder: geometry,
        output_folder: dir.path().join("sections"),
        scratch_folder: dir.path().join("scratch"),
        ..GeneratorConfig::default()
    };
    let (job, _) = context("generator");
    let report = generator::generate_sections(&mut engine, &generate, &job);
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.stats.succeeded, 2);

    let bar = SectionFile::read(&generate.output_folder.join("101.bxs")).expect("bar section");
    assert_relative_eq!(bar.properties.area, 1000.0, epsilon = 1.0e-6);
    assert_relative_eq!(bar.properties.centroid[0], 50.0, epsilon = 1.0e-9);
    assert_relative_eq!(bar.properties.centroid[1], 5.0, epsilon = 1.0e-9);
    assert_relative_eq!(
        bar.properties.ixx,
        100.0 * 10.0_f64.powi(3) / 12.0,
        max_relative = 1.0e-9
    );
    assert_relative_eq!(
        bar.properties.iyy,
        10.0 * 100.0_f64.powi(3) / 12.0,
        max_relative = 1.0e-9
    );
    let angle = SectionFile::read(&generate.output_folder.join("102.bxs")).expect("angle section");
    assert_relative_eq!(angle.properties.area, 475.0, epsilon = 1.0e-6);
    assert_relative_eq!(
        angle.properties.centroid[0],
        angle.properties.centroid[1],
        epsilon = 1.0e-9
    );

    // Register the library into a frame with two beams.
    let mut model = Model::new();
    let a = model.add_node(point(0.0, 0.0, 0.0));
    let b = model.add_node(point(0.0, 0.0, 3.0));
    let c = model.add_node(point(4.0, 0.0, 3.0));
    model.add_beam(a, b, 102).expect("nodes exist");
    model.add_beam(b, c, 101).expect("nodes exist");
    let model_path = dir.path().join("frame.st7");
    write_model(&model_path, &model).expect("model written");

    let register = RegistrarConfig {
        model_path: model_path.clone(),
        section_folder: generate.output_folder.clone(),
        ..RegistrarConfig::default()
    };
    let (job, sink) = context("registrar");
    let report = registrar::register_sections(&mut engine, &register, &job);
    assert_eq!(report.status, RunStatus::Success);
    assert!(sink.contains("Created 2 properties in the range 1 to 2"));

    // Assign by beam ID.
    let assign = MatcherConfig {
        model_path: model_path.clone(),
        prefix: "BXS_".to_string(),
        ..MatcherConfig::default()
    };
    let (job, _) = context("matcher");
    let report = matcher::assign_by_id(&mut engine, &assign, &job);
    assert_eq!(report.status, RunStatus::Success);
    assert_relative_eq!(report.stats.success_rate(), 100.0);

    let model = read_model(&model_path).expect("model reads back");
    let column = model
        .beam_property(BeamIndex::new(1))
        .expect("beam exists")
        .and_then(|id| model.property(id))
        .expect("column assigned");
    assert_eq!(column.name, "BXS_102");
    assert_relative_eq!(
        column.section.map_or(0.0, |section| section.area),
        475.0,
        epsilon = 1.0e-6
    );
    assert_eq!(engine.init_count(), 3);
    assert_eq!(engine.release_count(), 3);
}

#[test]
fn unreadable_geometry_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let geometry = dir.path().join("geometry");
    fs::create_dir(&geometry).expect("folder created");
    fs::write(geometry.join("a_notes.igs"), "not an IGES file").expect("fixture written");
    write_geometry(&geometry, "b_bar", &flat_bar());
    // Two points cannot form a section.
    write_geometry(&geometry, "c_line", &flat_bar()[..2]);

    let config = GeneratorConfig {
        geometry_folder: geometry,
        output_folder: dir.path().join("sections"),
        scratch_folder: dir.path().join("scratch"),
        ..GeneratorConfig::default()
    };
    let mut engine = LocalEngine::new();
    let (job, sink) = context("generator");

    let report = generator::generate_sections(&mut engine, &config, &job);

    assert_eq!(report.status, RunStatus::PartialSuccess);
    assert_eq!(report.stats.succeeded, 1);
    assert_eq!(report.stats.failed, 2);
    assert_eq!(sink.count("failed: engine error (9)"), 2);
    assert!(config.output_folder.join("b_bar.bxs").is_file());
    assert!(!engine.is_initialised());
}
