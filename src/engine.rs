//! The engine seam: a session-oriented FEA kernel addressed by integer handles.
//!
//! [`Engine`] mirrors the shape of a vendor API. Calls return a raw
//! [`ErrorCode`] on failure, and [`Session`] is the checked wrapper the jobs
//! use. It turns codes into [`EngineError`] with the engine's own message and
//! guarantees that the model file is closed and the engine released on every
//! exit path.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::log::JobLog;
use crate::model::{BeamType, MaterialRef};
use crate::options::{CleanOptions, ImportOptions, MeshOptions};

/// Raw status code reported by an engine call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub i32);

/// Handle identifying one open model within an engine.
pub type SessionId = u32;

/// Result of a raw engine call.
pub type EngineResult<T> = Result<T, ErrorCode>;

/// Engine instance shared between worker threads.
///
/// Holding the lock for a whole job keeps sessions exclusive.
pub type SharedEngine<E> = Arc<Mutex<E>>;

/// Wrap an engine for use from a [`JobRunner`](crate::JobRunner).
pub fn shared<E: Engine>(engine: E) -> SharedEngine<E> {
    Arc::new(Mutex::new(engine))
}

/// Class of property record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyClass {
    /// Beam cross-section properties.
    Beam,
    /// Plate properties.
    Plate,
    /// Brick properties.
    Brick,
}

/// Class of structural element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    /// Line elements.
    Beam,
    /// Surface elements.
    Plate,
    /// Solid elements.
    Brick,
}

/// Count and highest identifier of the property records of one class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropertyTotals {
    /// Number of defined records.
    pub count: usize,
    /// Highest identifier in use; identifiers below it may be unused.
    pub highest: u32,
}

/// A stateful FEA kernel.
///
/// Implementations are not expected to be reentrant. A caller must not run
/// two sessions against one engine at the same time; [`Session`] borrows the
/// engine mutably for its whole lifetime to make that impossible.
pub trait Engine {
    /// Initialise the engine before any session call.
    fn init(&mut self) -> EngineResult<()>;

    /// Release the engine and every resource it holds.
    fn release(&mut self) -> EngineResult<()>;

    /// Human-readable text for `code`.
    fn error_message(&self, code: ErrorCode) -> String;

    /// Create an empty model bound to `path`, with `scratch` for temporary files.
    fn new_file(&mut self, session: SessionId, path: &Path, scratch: &Path) -> EngineResult<()>;

    /// Open the model stored at `path`.
    fn open_file(&mut self, session: SessionId, path: &Path) -> EngineResult<()>;

    /// Persist the open model to its path.
    fn save_file(&mut self, session: SessionId) -> EngineResult<()>;

    /// Close the open model without saving.
    fn close_file(&mut self, session: SessionId) -> EngineResult<()>;

    /// Count and highest identifier of the property records of `class`.
    fn property_totals(&self, session: SessionId, class: PropertyClass)
        -> EngineResult<PropertyTotals>;

    /// Name of property `property` of `class`; fails for undefined identifiers.
    fn property_name(
        &self,
        session: SessionId,
        class: PropertyClass,
        property: u32,
    ) -> EngineResult<String>;

    /// Number of elements of `class`.
    fn entity_total(&self, session: SessionId, class: EntityClass) -> EngineResult<usize>;

    /// External identifier of the beam at 1-based ordinal `beam`.
    fn beam_id(&self, session: SessionId, beam: usize) -> EngineResult<u64>;

    /// Assign `property` to the element of `class` at 1-based ordinal `element`.
    fn set_element_property(
        &mut self,
        session: SessionId,
        class: EntityClass,
        element: usize,
        property: u32,
    ) -> EngineResult<()>;

    /// Create a beam property record under an unused identifier.
    fn new_beam_property(
        &mut self,
        session: SessionId,
        property: u32,
        beam_type: BeamType,
        name: &str,
    ) -> EngineResult<()>;

    /// Change the structural behaviour of a beam property.
    fn set_beam_property_type(
        &mut self,
        session: SessionId,
        property: u32,
        beam_type: BeamType,
    ) -> EngineResult<()>;

    /// Attach a library material to a property.
    fn assign_library_material(
        &mut self,
        session: SessionId,
        class: PropertyClass,
        property: u32,
        material: MaterialRef,
    ) -> EngineResult<()>;

    /// Attach the cross-section described by the section file at `section`.
    fn assign_section(&mut self, session: SessionId, property: u32, section: &Path)
        -> EngineResult<()>;

    /// Import surface geometry from `path` into the open model.
    fn import_geometry(
        &mut self,
        session: SessionId,
        path: &Path,
        options: &ImportOptions,
    ) -> EngineResult<()>;

    /// Mesh the imported surfaces.
    fn surface_mesh(&mut self, session: SessionId, options: &MeshOptions) -> EngineResult<()>;

    /// Clean the generated mesh.
    fn clean_mesh(&mut self, session: SessionId, options: &CleanOptions) -> EngineResult<()>;

    /// Export the meshed section shape to a section file at `output`.
    fn export_section(&mut self, session: SessionId, output: &Path) -> EngineResult<()>;
}

/// Scoped, checked access to an engine.
///
/// Starting a session initialises the engine. Ending it, through
/// [`Session::shutdown`] or by dropping it, closes any open model file and
/// releases the engine. Failures during that cleanup are logged and swallowed.
pub struct Session<'e, E: Engine + ?Sized> {
    /// Engine held for the whole session.
    engine: &'e mut E,
    /// Handle passed to every engine call.
    id: SessionId,
    /// Whether a model file is open and must be closed.
    file_open: bool,
    /// Cleared once the engine has been released.
    active: bool,
}

impl<'e, E: Engine + ?Sized> Session<'e, E> {
    /// Initialise `engine` and take exclusive use of it under handle `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine refuses to initialise.
    pub fn start(engine: &'e mut E, id: SessionId) -> Result<Self, EngineError> {
        let result = engine.init();
        result.map_err(|code| EngineError::new(code, engine.error_message(code)))?;
        Ok(Self {
            engine,
            id,
            file_open: false,
            active: true,
        })
    }

    /// Handle this session addresses the engine with.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Whether a model file is currently open.
    #[must_use]
    pub fn is_file_open(&self) -> bool {
        self.file_open
    }

    /// Turn a raw engine result into a checked one.
    fn check<T>(&self, result: EngineResult<T>) -> Result<T, EngineError> {
        result.map_err(|code| EngineError::new(code, self.engine.error_message(code)))
    }

    /// Open an existing model file.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine cannot open `path`.
    pub fn open(&mut self, path: &Path) -> Result<(), EngineError> {
        let result = self.engine.open_file(self.id, path);
        self.check(result)?;
        self.file_open = true;
        Ok(())
    }

    /// Create a new model file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine cannot create the model.
    pub fn create(&mut self, path: &Path, scratch: &Path) -> Result<(), EngineError> {
        let result = self.engine.new_file(self.id, path, scratch);
        self.check(result)?;
        self.file_open = true;
        Ok(())
    }

    /// Save the open model.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the model cannot be written.
    pub fn save(&mut self) -> Result<(), EngineError> {
        let result = self.engine.save_file(self.id);
        self.check(result)
    }

    /// Close the open model, if any. The file counts as closed even when the
    /// engine reports an error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine reports a failure while closing.
    pub fn close(&mut self) -> Result<(), EngineError> {
        if !self.file_open {
            return Ok(());
        }
        self.file_open = false;
        let result = self.engine.close_file(self.id);
        self.check(result)
    }

    /// See [`Engine::property_totals`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on any engine failure.
    pub fn property_totals(&self, class: PropertyClass) -> Result<PropertyTotals, EngineError> {
        self.check(self.engine.property_totals(self.id, class))
    }

    /// See [`Engine::property_name`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when `property` is undefined or on any engine failure.
    pub fn property_name(&self, class: PropertyClass, property: u32) -> Result<String, EngineError> {
        self.check(self.engine.property_name(self.id, class, property))
    }

    /// See [`Engine::entity_total`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] on any engine failure.
    pub fn entity_total(&self, class: EntityClass) -> Result<usize, EngineError> {
        self.check(self.engine.entity_total(self.id, class))
    }

    /// See [`Engine::beam_id`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when `beam` is out of range or on any engine failure.
    pub fn beam_id(&self, beam: usize) -> Result<u64, EngineError> {
        self.check(self.engine.beam_id(self.id, beam))
    }

    /// See [`Engine::set_element_property`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the assignment is rejected.
    pub fn set_element_property(
        &mut self,
        class: EntityClass,
        element: usize,
        property: u32,
    ) -> Result<(), EngineError> {
        let result = self
            .engine
            .set_element_property(self.id, class, element, property);
        self.check(result)
    }

    /// See [`Engine::new_beam_property`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the record cannot be created.
    pub fn new_beam_property(
        &mut self,
        property: u32,
        beam_type: BeamType,
        name: &str,
    ) -> Result<(), EngineError> {
        let result = self
            .engine
            .new_beam_property(self.id, property, beam_type, name);
        self.check(result)
    }

    /// See [`Engine::set_beam_property_type`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the property does not exist.
    pub fn set_beam_property_type(
        &mut self,
        property: u32,
        beam_type: BeamType,
    ) -> Result<(), EngineError> {
        let result = self
            .engine
            .set_beam_property_type(self.id, property, beam_type);
        self.check(result)
    }

    /// See [`Engine::assign_library_material`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the material cannot be attached.
    pub fn assign_library_material(
        &mut self,
        class: PropertyClass,
        property: u32,
        material: MaterialRef,
    ) -> Result<(), EngineError> {
        let result = self
            .engine
            .assign_library_material(self.id, class, property, material);
        self.check(result)
    }

    /// See [`Engine::assign_section`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the section file cannot be read or attached.
    pub fn assign_section(&mut self, property: u32, section: &Path) -> Result<(), EngineError> {
        let result = self.engine.assign_section(self.id, property, section);
        self.check(result)
    }

    /// See [`Engine::import_geometry`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the geometry cannot be imported.
    pub fn import_geometry(
        &mut self,
        path: &Path,
        options: &ImportOptions,
    ) -> Result<(), EngineError> {
        let result = self.engine.import_geometry(self.id, path, options);
        self.check(result)
    }

    /// See [`Engine::surface_mesh`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when meshing fails.
    pub fn surface_mesh(&mut self, options: &MeshOptions) -> Result<(), EngineError> {
        let result = self.engine.surface_mesh(self.id, options);
        self.check(result)
    }

    /// See [`Engine::clean_mesh`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when cleaning fails.
    pub fn clean_mesh(&mut self, options: &CleanOptions) -> Result<(), EngineError> {
        let result = self.engine.clean_mesh(self.id, options);
        self.check(result)
    }

    /// See [`Engine::export_section`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the section cannot be exported.
    pub fn export_section(&mut self, output: &Path) -> Result<(), EngineError> {
        let result = self.engine.export_section(self.id, output);
        self.check(result)
    }

    /// Close any open model and release the engine, logging each step.
    pub fn shutdown(mut self, log: &JobLog) {
        self.teardown(Some(log));
    }

    /// Close the open file and release the engine, once.
    fn teardown(&mut self, log: Option<&JobLog>) {
        if !self.active {
            return;
        }
        self.active = false;
        if self.file_open {
            match self.close() {
                Ok(()) => note(log, "Model file closed"),
                Err(error) => caution(log, &format!("Could not close model file: {error}")),
            }
        }
        let released = self.engine.release();
        match self.check(released) {
            Ok(()) => note(log, "Engine released"),
            Err(error) => caution(log, &format!("Could not release engine: {error}")),
        }
    }
}

impl<E: Engine + ?Sized> Drop for Session<'_, E> {
    fn drop(&mut self) {
        self.teardown(None);
    }
}

/// Progress line, to `log` when given and to tracing otherwise.
fn note(log: Option<&JobLog>, message: &str) {
    match log {
        Some(log) => log.info(message),
        None => tracing::debug!("{message}"),
    }
}

/// Failure line, to `log` when given and to tracing otherwise.
fn caution(log: Option<&JobLog>, message: &str) {
    match log {
        Some(log) => log.warn(message),
        None => tracing::warn!("{message}"),
    }
}
