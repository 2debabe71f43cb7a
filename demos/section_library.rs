use std::fs;

use beamsec::jobs::generator::generate_sections;
use beamsec::section::SectionFile;
use beamsec::{iges, point, GeneratorConfig, JobContext, JobLog, LocalEngine, Point};

/// Outlines of a few common sections, in millimetres.
fn library() -> Vec<(&'static str, Vec<Point>)> {
    vec![
        (
            "flat_100x10",
            vec![
                point(0.0, 0.0, 0.0),
                point(100.0, 0.0, 0.0),
                point(100.0, 10.0, 0.0),
                point(0.0, 10.0, 0.0),
            ],
        ),
        (
            "angle_50x50x5",
            vec![
                point(0.0, 0.0, 0.0),
                point(50.0, 0.0, 0.0),
                point(50.0, 5.0, 0.0),
                point(5.0, 5.0, 0.0),
                point(5.0, 50.0, 0.0),
                point(0.0, 50.0, 0.0),
            ],
        ),
        (
            "tee_80x60x8",
            vec![
                point(-4.0, 0.0, 0.0),
                point(4.0, 0.0, 0.0),
                point(4.0, 52.0, 0.0),
                point(40.0, 52.0, 0.0),
                point(40.0, 60.0, 0.0),
                point(-40.0, 60.0, 0.0),
                point(-40.0, 52.0, 0.0),
                point(-4.0, 52.0, 0.0),
            ],
        ),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let geometry = dir.path().join("geometry");
    fs::create_dir(&geometry)?;
    let shapes = library();
    for (name, outline) in &shapes {
        fs::write(
            geometry.join(format!("{name}.igs")),
            iges::write_points(outline, name),
        )?;
    }

    let config = GeneratorConfig {
        geometry_folder: geometry,
        output_folder: dir.path().join("sections"),
        scratch_folder: dir.path().join("scratch"),
        ..GeneratorConfig::default()
    };
    let mut engine = LocalEngine::new();
    let context = JobContext::new(JobLog::new("generator"));
    let report = generate_sections(&mut engine, &config, &context);
    println!("status: {}", report.status);

    for (name, _) in &shapes {
        let section = SectionFile::read(&config.output_folder.join(format!("{name}.bxs")))?;
        let p = section.properties;
        println!(
            "{name}: A = {:.1}, centroid = ({:.2}, {:.2}), Ixx = {:.4e}, Iyy = {:.4e}, J = {:.4e}",
            p.area,
            p.centroid[0],
            p.centroid[1],
            p.ixx,
            p.iyy,
            p.polar()
        );
    }

    Ok(())
}
