use std::sync::Arc;

use beamsec::jobs::matcher::assign_by_id;
use beamsec::{
    point, render_summary, shared, write_model, JobKind, JobLog, JobRunner, LocalEngine,
    MatcherConfig, Model, PropertyRecord, StdoutSink,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let model_path = dir.path().join("portal.st7");

    // Two columns and a rafter, with one beam whose ID has no property yet.
    let mut model = Model::new();
    let a = model.add_node(point(0.0, 0.0, 0.0));
    let b = model.add_node(point(0.0, 0.0, 4.0));
    let c = model.add_node(point(6.0, 0.0, 4.0));
    let d = model.add_node(point(6.0, 0.0, 0.0));
    model.add_beam(a, b, 411)?;
    model.add_beam(b, c, 520)?;
    model.add_beam(c, d, 411)?;
    model.add_property(1, PropertyRecord::named("SEC_411"))?;
    model.add_property(3, PropertyRecord::named("sec_999"))?;
    write_model(&model_path, &model)?;

    let config = MatcherConfig {
        model_path,
        ..MatcherConfig::default()
    };
    let engine = shared(LocalEngine::new());
    let runner = JobRunner::new(JobKind::Matcher);
    let log = JobLog::new("matcher").with_sink(Arc::new(StdoutSink));
    let handle = runner.start(log, move |context| {
        let mut engine = engine.lock();
        assign_by_id(&mut *engine, &config, &context)
    })?;
    let report = handle.join();

    println!();
    print!("{}", render_summary(&report));
    for assignment in &report.assignments {
        println!(
            "beam {} (ID {}) -> property {}",
            assignment.index, assignment.id, assignment.property
        );
    }

    Ok(())
}
