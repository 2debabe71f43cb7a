//! Error types produced while driving the engine or preparing a batch job.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::ErrorCode;

/// Error raised when an engine call returns a non-zero code.
///
/// The message is looked up from the engine at the point the code is checked,
/// so it reads the same way the engine itself would report it.
///
/// # Examples
///
/// ```
/// use beamsec::{EngineError, ErrorCode};
///
/// let error = EngineError::new(ErrorCode(3), "file not found");
/// assert_eq!(error.to_string(), "engine error (3): file not found");
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("engine error ({}): {message}", .code.0)]
pub struct EngineError {
    /// Raw code returned by the engine.
    pub code: ErrorCode,
    /// Human-readable text the engine associates with `code`.
    pub message: String,
}

impl EngineError {
    /// Pair an engine code with its message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error returned when a property catalog cannot be built.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    /// Returned when the model defines no property records of the requested class.
    #[error("the model defines no properties to match against")]
    Empty,
    /// Returned when the property totals cannot be read.
    #[error("could not read property totals: {0}")]
    Totals(#[source] EngineError),
}

/// Error returned when a job's inputs are rejected before the engine is touched.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Returned when the target model file does not exist.
    #[error("model file not found: {}", .0.display())]
    MissingModel(PathBuf),
    /// Returned when the target model file has the wrong extension.
    #[error("model file {} must have the .{expected} extension", .path.display())]
    WrongExtension {
        /// Offending path.
        path: PathBuf,
        /// Extension the job requires, without the leading dot.
        expected: String,
    },
    /// Returned when an input folder does not exist.
    #[error("folder not found: {}", .0.display())]
    MissingFolder(PathBuf),
    /// Returned when an output folder cannot be created.
    #[error("could not create folder {}: {message}", .path.display())]
    CreateFolder {
        /// Folder that could not be created.
        path: PathBuf,
        /// Reason reported by the filesystem.
        message: String,
    },
    /// Returned when a required name prefix is empty.
    #[error("a property name prefix is required")]
    EmptyPrefix,
}

/// Error returned when reading or writing the job configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Returned when the configuration file cannot be read or written.
    #[error("configuration file {}: {source}", .path.display())]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Returned when the configuration file is not valid JSON for [`JobsConfig`](crate::JobsConfig).
    #[error("configuration file {} is malformed: {source}", .path.display())]
    Parse {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Error returned while computing or persisting cross-section data.
#[derive(Debug, Error)]
pub enum SectionError {
    /// Returned when an outline has fewer than three distinct vertices.
    #[error("outline needs at least three vertices (received {0})")]
    TooFewVertices(usize),
    /// Returned when the outline cannot be split into triangles.
    #[error("outline could not be triangulated; check for self-intersections")]
    Triangulation,
    /// Returned when the meshed section has no area left.
    #[error("section has zero area")]
    ZeroArea,
    /// Returned when a section file cannot be read or written.
    #[error("section file {}: {source}", .path.display())]
    Io {
        /// Path of the section file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// Returned when a section file does not decode.
    #[error("section file {} is malformed: {source}", .path.display())]
    Format {
        /// Path of the section file.
        path: PathBuf,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Error returned when an IGES file cannot be read as a section outline.
#[derive(Debug, Error, PartialEq)]
pub enum IgesError {
    /// Returned when the file has no parameter data records.
    #[error("no parameter data section found")]
    NoParameterData,
    /// Returned when a parameter field cannot be read as a number.
    #[error("entity at directory pointer {pointer} has an invalid field {field:?}")]
    InvalidField {
        /// Directory entry pointer of the entity.
        pointer: usize,
        /// Field text that failed to parse.
        field: String,
    },
    /// Returned when the file contains no point entities.
    #[error("no point entities found")]
    NoPoints,
}

/// Error returned when editing a [`Model`](crate::Model) with invalid indices.
///
/// # Examples
///
/// ```
/// use beamsec::{BeamIndex, Model, ModelEditError};
///
/// let mut model = Model::new();
/// let error = model
///     .set_beam_property(BeamIndex::new(1), 7)
///     .expect_err("an empty model has no beams");
/// assert_eq!(error, ModelEditError::UnknownBeam(1));
/// ```
#[derive(Debug, Error, PartialEq)]
pub enum ModelEditError {
    /// Returned when a node cannot be found in the model.
    #[error("node {0} does not exist in this model")]
    UnknownNode(usize),
    /// Returned when a beam ordinal is outside `1..=beam_count`.
    #[error("beam {0} does not exist in this model")]
    UnknownBeam(usize),
    /// Returned when a property identifier has no record.
    #[error("property {0} does not exist in this model")]
    UnknownProperty(u32),
    /// Returned when a property identifier is already taken.
    #[error("property {0} already exists in this model")]
    DuplicateProperty(u32),
    /// Returned when a property identifier of zero is used.
    #[error("property identifiers start at 1")]
    ZeroProperty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_carries_code_and_message() {
        let error = EngineError::new(ErrorCode(5), "property not defined");
        assert_eq!(error.code, ErrorCode(5));
        assert_eq!(format!("{error}"), "engine error (5): property not defined");
    }

    #[test]
    fn validation_errors_name_the_path() {
        let error = ValidationError::WrongExtension {
            path: PathBuf::from("model.txt"),
            expected: "st7".to_string(),
        };
        let text = error.to_string();
        assert!(text.contains("model.txt"));
        assert!(text.contains(".st7"));
    }
}
