#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

mod cancel;
mod catalog;
mod config;
mod engine;
mod errors;
mod geometry;
pub mod iges;
pub mod jobs;
mod local;
mod log;
mod model;
mod options;
mod report;
mod runner;
pub mod section;

pub use cancel::{CancelToken, JobContext};
pub use catalog::PropertyCatalog;
pub use config::{GeneratorConfig, JobsConfig, MatcherConfig, RegistrarConfig};
pub use engine::{
    shared, Engine, EngineResult, EntityClass, ErrorCode, PropertyClass, PropertyTotals, Session,
    SessionId, SharedEngine,
};
pub use errors::{
    CatalogError, ConfigError, EngineError, IgesError, ModelEditError, SectionError,
    ValidationError,
};
pub use geometry::{point, polygon_area, signed_area, Point};
pub use local::{
    read_model, write_model, LocalEngine, ERR_ALREADY_OPEN, ERR_FILE_NOT_FOUND, ERR_FILE_NOT_OPEN,
    ERR_FORMAT, ERR_GEOMETRY, ERR_INVALID_ENTITY, ERR_IO, ERR_NOT_INITIALISED,
    ERR_PROPERTY_EXISTS, ERR_PROPERTY_MISSING,
};
pub use log::{JobLog, LogSink, MemorySink, StdoutSink};
pub use model::{
    BeamIndex, BeamRecord, BeamType, MaterialRef, Model, ModelDocument, PropertyRecord,
};
pub use options::{CleanOptions, ImportOptions, MeshOptions};
pub use report::{render_summary, BeamAssignment, JobKind, RunReport, RunStats, RunStatus};
pub use runner::{JobHandle, JobRunner, StartError};
