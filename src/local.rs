//! File-backed engine that keeps models as JSON documents.
//!
//! [`LocalEngine`] implements [`Engine`] on top of [`Model`]. Each session
//! handle owns at most one open model together with the scratch geometry of
//! the section pipeline: the imported outline and its triangle mesh.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use nalgebra::Point2;

use crate::engine::{
    Engine, EngineResult, EntityClass, ErrorCode, PropertyClass, PropertyTotals, SessionId,
};
use crate::errors::{ModelEditError, SectionError};
use crate::iges;
use crate::model::{BeamIndex, BeamType, MaterialRef, Model, ModelDocument, PropertyRecord};
use crate::options::{CleanOptions, ImportOptions, MeshOptions};
use crate::section::{self, SectionFile, SectionProperties, Triangle};

/// A call was made before [`Engine::init`].
pub const ERR_NOT_INITIALISED: ErrorCode = ErrorCode(1);
/// The session has no open model.
pub const ERR_FILE_NOT_OPEN: ErrorCode = ErrorCode(2);
/// A file named in the call does not exist.
pub const ERR_FILE_NOT_FOUND: ErrorCode = ErrorCode(3);
/// An element ordinal or class is not valid for the model.
pub const ERR_INVALID_ENTITY: ErrorCode = ErrorCode(4);
/// A property identifier has no record.
pub const ERR_PROPERTY_MISSING: ErrorCode = ErrorCode(5);
/// A property identifier is already in use.
pub const ERR_PROPERTY_EXISTS: ErrorCode = ErrorCode(6);
/// Reading or writing a file failed.
pub const ERR_IO: ErrorCode = ErrorCode(7);
/// A file was read but its content is not valid.
pub const ERR_FORMAT: ErrorCode = ErrorCode(8);
/// Geometry could not be imported, meshed or integrated.
pub const ERR_GEOMETRY: ErrorCode = ErrorCode(9);
/// The session already has an open model.
pub const ERR_ALREADY_OPEN: ErrorCode = ErrorCode(10);

/// Read a model document from disk.
///
/// # Errors
///
/// Returns the underlying I/O error, or [`io::ErrorKind::InvalidData`] when the
/// document does not decode or references missing nodes or properties.
pub fn read_model(path: &Path) -> io::Result<Model> {
    let text = fs::read_to_string(path)?;
    let document: ModelDocument = serde_json::from_str(&text)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;
    Model::from_document(document).map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}

/// Write a model document to disk as pretty-printed JSON.
///
/// # Errors
///
/// Returns the underlying I/O error.
pub fn write_model(path: &Path, model: &Model) -> io::Result<()> {
    let text = serde_json::to_string_pretty(&model.to_document())?;
    fs::write(path, text)
}

/// Model opened by one session.
#[derive(Debug)]
struct OpenModel {
    /// Where `save_file` writes the model.
    path: PathBuf,
    /// The model itself.
    model: Model,
    /// Outline from the last geometry import, in the section plane.
    outline: Vec<Point2<f64>>,
    /// Triangles from the last surface mesh.
    mesh: Vec<Triangle>,
}

impl OpenModel {
    /// Wrap a freshly read or created model.
    fn new(path: &Path, model: Model) -> Self {
        Self {
            path: path.to_path_buf(),
            model,
            outline: Vec::new(),
            mesh: Vec::new(),
        }
    }
}

/// Engine backed by JSON model files on the local filesystem.
///
/// # Examples
/// ```
/// use beamsec::{LocalEngine, Session};
///
/// let mut engine = LocalEngine::new();
/// let session = Session::start(&mut engine, 1).expect("engine starts");
/// drop(session);
/// assert_eq!(engine.release_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct LocalEngine {
    /// Set by `init`, cleared by `release`.
    initialised: bool,
    /// Open models keyed by session handle.
    files: HashMap<SessionId, OpenModel>,
    /// Successful initialisations.
    init_count: usize,
    /// Successful releases.
    release_count: usize,
    /// Successful saves.
    save_count: usize,
    /// Successful closes.
    close_count: usize,
}

impl LocalEngine {
    /// Create an engine that has not been initialised yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`Engine::init`] has been called without a matching release.
    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Number of successful initialisations.
    #[must_use]
    pub fn init_count(&self) -> usize {
        self.init_count
    }

    /// Number of successful releases.
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.release_count
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.save_count
    }

    /// Number of successful closes.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.close_count
    }

    /// Fail with [`ERR_NOT_INITIALISED`] outside an init/release pair.
    fn ready(&self) -> EngineResult<()> {
        if self.initialised {
            Ok(())
        } else {
            Err(ERR_NOT_INITIALISED)
        }
    }

    /// Model open on `session`.
    fn file(&self, session: SessionId) -> EngineResult<&OpenModel> {
        self.ready()?;
        self.files.get(&session).ok_or(ERR_FILE_NOT_OPEN)
    }

    /// Mutable model open on `session`.
    fn file_mut(&mut self, session: SessionId) -> EngineResult<&mut OpenModel> {
        self.ready()?;
        self.files.get_mut(&session).ok_or(ERR_FILE_NOT_OPEN)
    }

    /// Fail when `session` already has a model open.
    fn free_slot(&self, session: SessionId) -> EngineResult<()> {
        self.ready()?;
        if self.files.contains_key(&session) {
            Err(ERR_ALREADY_OPEN)
        } else {
            Ok(())
        }
    }
}

/// Engine code for a file system failure.
fn io_code(error: &io::Error) -> ErrorCode {
    match error.kind() {
        io::ErrorKind::NotFound => ERR_FILE_NOT_FOUND,
        io::ErrorKind::InvalidData => ERR_FORMAT,
        _ => ERR_IO,
    }
}

/// Engine code for a rejected model edit.
fn edit_code(error: ModelEditError) -> ErrorCode {
    match error {
        ModelEditError::UnknownProperty(_) => ERR_PROPERTY_MISSING,
        ModelEditError::DuplicateProperty(_) => ERR_PROPERTY_EXISTS,
        ModelEditError::UnknownNode(_)
        | ModelEditError::UnknownBeam(_)
        | ModelEditError::ZeroProperty => ERR_INVALID_ENTITY,
    }
}

/// Engine code for a section pipeline failure.
fn section_code(error: &SectionError) -> ErrorCode {
    match error {
        SectionError::Io { source, .. } => io_code(source),
        SectionError::Format { .. } => ERR_FORMAT,
        SectionError::TooFewVertices(_) | SectionError::Triangulation | SectionError::ZeroArea => {
            ERR_GEOMETRY
        }
    }
}

impl Engine for LocalEngine {
    fn init(&mut self) -> EngineResult<()> {
        self.initialised = true;
        self.init_count += 1;
        Ok(())
    }

    fn release(&mut self) -> EngineResult<()> {
        self.ready()?;
        self.files.clear();
        self.initialised = false;
        self.release_count += 1;
        Ok(())
    }

    fn error_message(&self, code: ErrorCode) -> String {
        let text = match code {
            ERR_NOT_INITIALISED => "engine has not been initialised",
            ERR_FILE_NOT_OPEN => "no model file is open",
            ERR_FILE_NOT_FOUND => "file not found",
            ERR_INVALID_ENTITY => "invalid entity",
            ERR_PROPERTY_MISSING => "property does not exist",
            ERR_PROPERTY_EXISTS => "property already exists",
            ERR_IO => "file could not be read or written",
            ERR_FORMAT => "file format is not valid",
            ERR_GEOMETRY => "geometry could not be processed",
            ERR_ALREADY_OPEN => "a model file is already open",
            ErrorCode(other) => return format!("unknown error code {other}"),
        };
        text.to_string()
    }

    fn new_file(&mut self, session: SessionId, path: &Path, scratch: &Path) -> EngineResult<()> {
        self.free_slot(session)?;
        if !scratch.is_dir() {
            return Err(ERR_FILE_NOT_FOUND);
        }
        self.files.insert(session, OpenModel::new(path, Model::new()));
        Ok(())
    }

    fn open_file(&mut self, session: SessionId, path: &Path) -> EngineResult<()> {
        self.free_slot(session)?;
        let model = read_model(path).map_err(|error| io_code(&error))?;
        tracing::debug!(path = %path.display(), beams = model.beam_count(), "model opened");
        self.files.insert(session, OpenModel::new(path, model));
        Ok(())
    }

    fn save_file(&mut self, session: SessionId) -> EngineResult<()> {
        let file = self.file(session)?;
        write_model(&file.path, &file.model).map_err(|error| io_code(&error))?;
        self.save_count += 1;
        Ok(())
    }

    fn close_file(&mut self, session: SessionId) -> EngineResult<()> {
        self.ready()?;
        self.files.remove(&session).ok_or(ERR_FILE_NOT_OPEN)?;
        self.close_count += 1;
        Ok(())
    }

    fn property_totals(
        &self,
        session: SessionId,
        class: PropertyClass,
    ) -> EngineResult<PropertyTotals> {
        let file = self.file(session)?;
        Ok(match class {
            PropertyClass::Beam => PropertyTotals {
                count: file.model.property_count(),
                highest: file.model.highest_property(),
            },
            PropertyClass::Plate | PropertyClass::Brick => PropertyTotals::default(),
        })
    }

    fn property_name(
        &self,
        session: SessionId,
        class: PropertyClass,
        property: u32,
    ) -> EngineResult<String> {
        let file = self.file(session)?;
        match class {
            PropertyClass::Beam => file
                .model
                .property(property)
                .map(|record| record.name.clone())
                .ok_or(ERR_PROPERTY_MISSING),
            PropertyClass::Plate | PropertyClass::Brick => Err(ERR_PROPERTY_MISSING),
        }
    }

    fn entity_total(&self, session: SessionId, class: EntityClass) -> EngineResult<usize> {
        let file = self.file(session)?;
        Ok(match class {
            EntityClass::Beam => file.model.beam_count(),
            EntityClass::Plate | EntityClass::Brick => 0,
        })
    }

    fn beam_id(&self, session: SessionId, beam: usize) -> EngineResult<u64> {
        let file = self.file(session)?;
        file.model.beam_id(BeamIndex::new(beam)).map_err(edit_code)
    }

    fn set_element_property(
        &mut self,
        session: SessionId,
        class: EntityClass,
        element: usize,
        property: u32,
    ) -> EngineResult<()> {
        let file = self.file_mut(session)?;
        if class != EntityClass::Beam {
            return Err(ERR_INVALID_ENTITY);
        }
        file.model
            .set_beam_property(BeamIndex::new(element), property)
            .map_err(edit_code)
    }

    fn new_beam_property(
        &mut self,
        session: SessionId,
        property: u32,
        beam_type: BeamType,
        name: &str,
    ) -> EngineResult<()> {
        let file = self.file_mut(session)?;
        let record = PropertyRecord {
            beam_type,
            ..PropertyRecord::named(name)
        };
        file.model.add_property(property, record).map_err(edit_code)
    }

    fn set_beam_property_type(
        &mut self,
        session: SessionId,
        property: u32,
        beam_type: BeamType,
    ) -> EngineResult<()> {
        let file = self.file_mut(session)?;
        let record = file.model.property_mut(property).map_err(edit_code)?;
        record.beam_type = beam_type;
        Ok(())
    }

    fn assign_library_material(
        &mut self,
        session: SessionId,
        class: PropertyClass,
        property: u32,
        material: MaterialRef,
    ) -> EngineResult<()> {
        let file = self.file_mut(session)?;
        if class != PropertyClass::Beam {
            return Err(ERR_PROPERTY_MISSING);
        }
        let record = file.model.property_mut(property).map_err(edit_code)?;
        record.material = Some(material);
        Ok(())
    }

    fn assign_section(
        &mut self,
        session: SessionId,
        property: u32,
        section: &Path,
    ) -> EngineResult<()> {
        let file = self.file_mut(session)?;
        let record = file.model.property_mut(property).map_err(edit_code)?;
        let definition = SectionFile::read(section).map_err(|error| section_code(&error))?;
        record.section = Some(definition.properties);
        Ok(())
    }

    fn import_geometry(
        &mut self,
        session: SessionId,
        path: &Path,
        options: &ImportOptions,
    ) -> EngineResult<()> {
        let file = self.file_mut(session)?;
        let content = fs::read_to_string(path).map_err(|error| io_code(&error))?;
        let points = iges::parse_points(&content).map_err(|error| {
            tracing::debug!(path = %path.display(), %error, "geometry rejected");
            ERR_GEOMETRY
        })?;
        let outline: Vec<Point2<f64>> = points
            .into_iter()
            .map(|point| point.scaled(options.scale).to_plane())
            .collect();
        let outline = section::merge_vertices(&outline, options.merge_tolerance);
        if outline.len() < 3 {
            return Err(ERR_GEOMETRY);
        }
        file.outline = outline;
        file.mesh.clear();
        Ok(())
    }

    fn surface_mesh(&mut self, session: SessionId, options: &MeshOptions) -> EngineResult<()> {
        let file = self.file_mut(session)?;
        let triangles = section::triangulate(&file.outline).map_err(|error| section_code(&error))?;
        file.mesh = section::refine(triangles, options.target_size, options.min_size);
        tracing::debug!(triangles = file.mesh.len(), "surface meshed");
        Ok(())
    }

    fn clean_mesh(&mut self, session: SessionId, options: &CleanOptions) -> EngineResult<()> {
        let file = self.file_mut(session)?;
        if options.remove_degenerate {
            let mesh = std::mem::take(&mut file.mesh);
            let (kept, removed) = section::remove_degenerate(mesh, options.tolerance);
            if removed > 0 {
                tracing::debug!(removed, "degenerate triangles removed");
            }
            file.mesh = kept;
        }
        Ok(())
    }

    fn export_section(&mut self, session: SessionId, output: &Path) -> EngineResult<()> {
        let file = self.file(session)?;
        if file.mesh.is_empty() {
            return Err(ERR_GEOMETRY);
        }
        let properties =
            SectionProperties::from_triangles(&file.mesh).map_err(|error| section_code(&error))?;
        let name = output
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let definition = SectionFile {
            name,
            triangles: file.mesh.len(),
            properties,
        };
        definition.write(output).map_err(|error| section_code(&error))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::point;

    const SESSION: SessionId = 1;

    fn started() -> LocalEngine {
        let mut engine = LocalEngine::new();
        engine.init().expect("init never fails");
        engine
    }

    fn model_with_beams(dir: &Path) -> PathBuf {
        let mut model = Model::new();
        let a = model.add_node(point(0.0, 0.0, 0.0));
        let b = model.add_node(point(1.0, 0.0, 0.0));
        model.add_beam(a, b, 411).expect("nodes exist");
        model
            .add_property(3, PropertyRecord::named("sec_411"))
            .expect("identifier free");
        let path = dir.join("frame.st7");
        write_model(&path, &model).expect("model written");
        path
    }

    #[test]
    fn calls_without_an_open_model_fail() {
        let engine = started();
        assert_eq!(engine.beam_id(SESSION, 1), Err(ERR_FILE_NOT_OPEN));
        assert!(engine.error_message(ERR_FILE_NOT_OPEN).contains("open"));
        assert_eq!(engine.error_message(ErrorCode(99)), "unknown error code 99");
    }

    #[test]
    fn empty_or_truncated_models_are_format_errors() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let mut engine = started();
        for (name, content) in [("empty.st7", ""), ("truncated.st7", r#"{"nodes": ["#)] {
            let path = dir.path().join(name);
            fs::write(&path, content).expect("fixture written");
            assert_eq!(engine.open_file(SESSION, &path), Err(ERR_FORMAT));
        }
        assert_eq!(
            engine.open_file(SESSION, &dir.path().join("missing.st7")),
            Err(ERR_FILE_NOT_FOUND)
        );
    }

    #[test]
    fn sparse_property_lookups_report_missing() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = model_with_beams(dir.path());
        let mut engine = started();
        engine.open_file(SESSION, &path).expect("model opens");
        let totals = engine
            .property_totals(SESSION, PropertyClass::Beam)
            .expect("file open");
        assert_eq!(totals, PropertyTotals { count: 1, highest: 3 });
        assert_eq!(
            engine.property_name(SESSION, PropertyClass::Beam, 1),
            Err(ERR_PROPERTY_MISSING)
        );
        assert_eq!(
            engine.property_name(SESSION, PropertyClass::Beam, 3),
            Ok("sec_411".to_string())
        );
        assert_eq!(engine.open_file(SESSION, &path), Err(ERR_ALREADY_OPEN));
    }

    #[test]
    fn assignments_persist_after_save() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = model_with_beams(dir.path());
        let mut engine = started();
        engine.open_file(SESSION, &path).expect("model opens");
        assert_eq!(
            engine.set_element_property(SESSION, EntityClass::Beam, 2, 3),
            Err(ERR_INVALID_ENTITY)
        );
        assert_eq!(
            engine.set_element_property(SESSION, EntityClass::Beam, 1, 4),
            Err(ERR_PROPERTY_MISSING)
        );
        engine
            .set_element_property(SESSION, EntityClass::Beam, 1, 3)
            .expect("beam and property exist");
        engine.save_file(SESSION).expect("model saved");
        engine.close_file(SESSION).expect("model closed");

        let reloaded = read_model(&path).expect("model reads back");
        assert_eq!(reloaded.beam_property(BeamIndex::new(1)), Ok(Some(3)));
        assert_eq!(engine.save_count(), 1);
        assert_eq!(engine.close_count(), 1);
    }

    #[test]
    fn malformed_model_reports_format() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("broken.st7");
        fs::write(&path, "{ not json").expect("fixture written");
        let mut engine = started();
        assert_eq!(engine.open_file(SESSION, &path), Err(ERR_FORMAT));
    }

    #[test]
    fn outline_flows_through_to_a_section_file() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let geometry = dir.path().join("plate.igs");
        let outline = [
            point(0.0, 0.0, 0.0),
            point(2.0, 0.0, 0.0),
            point(2.0, 1.0, 0.0),
            point(0.0, 1.0, 0.0),
        ];
        fs::write(&geometry, iges::write_points(&outline, "plate")).expect("fixture written");

        let mut engine = started();
        engine
            .new_file(SESSION, &dir.path().join("temp_plate.st7"), dir.path())
            .expect("scratch model created");
        engine
            .import_geometry(SESSION, &geometry, &ImportOptions::default())
            .expect("outline imported");
        engine
            .surface_mesh(SESSION, &MeshOptions::default())
            .expect("outline meshed");
        engine
            .clean_mesh(SESSION, &CleanOptions::default())
            .expect("mesh cleaned");
        let output = dir.path().join("plate.bxs");
        engine.export_section(SESSION, &output).expect("section exported");

        let definition = SectionFile::read(&output).expect("section file reads back");
        assert_eq!(definition.name, "plate");
        assert!(definition.triangles >= 2);
        assert_relative_eq!(definition.properties.area, 2.0, epsilon = 1.0e-9);
        assert_relative_eq!(definition.properties.centroid[0], 1.0, epsilon = 1.0e-9);
        assert_relative_eq!(definition.properties.ixx, 2.0 / 12.0, epsilon = 1.0e-9);
    }

    #[test]
    fn near_duplicate_points_merge_on_import() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let geometry = dir.path().join("plate.igs");
        let outline = [
            point(0.0, 0.0, 0.0),
            point(2.0, 0.0, 0.0),
            point(2.000_000_1, 0.0, 0.0),
            point(2.0, 1.0, 0.0),
            point(0.0, 1.0, 0.0),
            point(0.0, 0.0, 0.0),
        ];
        fs::write(&geometry, iges::write_points(&outline, "plate")).expect("fixture written");

        let mut engine = started();
        engine
            .new_file(SESSION, &dir.path().join("temp_plate.st7"), dir.path())
            .expect("scratch model created");
        engine
            .import_geometry(SESSION, &geometry, &ImportOptions::default())
            .expect("outline imported");
        assert_eq!(engine.file(SESSION).map(|file| file.outline.len()), Ok(4));
    }

    #[test]
    fn export_without_mesh_fails() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let mut engine = started();
        engine
            .new_file(SESSION, &dir.path().join("temp.st7"), dir.path())
            .expect("scratch model created");
        assert_eq!(
            engine.export_section(SESSION, &dir.path().join("empty.bxs")),
            Err(ERR_GEOMETRY)
        );
    }

    #[test]
    fn release_drops_open_models() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = model_with_beams(dir.path());
        let mut engine = started();
        engine.open_file(SESSION, &path).expect("model opens");
        engine.release().expect("engine releases");
        assert!(!engine.is_initialised());
        assert_eq!(engine.entity_total(SESSION, EntityClass::Beam), Err(ERR_NOT_INITIALISED));
    }
}
