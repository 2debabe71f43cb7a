//! Job configuration stored as a JSON file.
//!
//! Every field has a default, so a partial file (or `{}`) is a valid
//! configuration. Command-line flags are applied on top after loading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::SessionId;
use crate::errors::ConfigError;
use crate::model::{BeamType, MaterialRef};

/// Session handle used when a config names none.
fn default_session() -> SessionId {
    1
}

/// Model file extension.
fn default_model_extension() -> String {
    "st7".to_string()
}

/// Geometry file extension.
fn default_geometry_extension() -> String {
    "igs".to_string()
}

/// Section file extension.
fn default_section_extension() -> String {
    "bxs".to_string()
}

/// Settings of the geometry-to-section pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Folder scanned for geometry files.
    pub geometry_folder: PathBuf,
    /// Folder section files are written to; created when missing.
    pub output_folder: PathBuf,
    /// Folder for scratch models; created when missing.
    pub scratch_folder: PathBuf,
    /// Extension of geometry files, without the dot. Default: "igs"
    pub geometry_extension: String,
    /// Extension of generated section files. Default: "bxs"
    pub section_extension: String,
    /// Extension of scratch models. Default: "st7"
    pub model_extension: String,
    /// Engine session handle. Default: 1
    pub session: SessionId,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            geometry_folder: PathBuf::from("geometry"),
            output_folder: PathBuf::from("sections"),
            scratch_folder: PathBuf::from("scratch"),
            geometry_extension: default_geometry_extension(),
            section_extension: default_section_extension(),
            model_extension: default_model_extension(),
            session: default_session(),
        }
    }
}

/// Settings of the section-to-property registrar.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrarConfig {
    /// Model the properties are added to.
    pub model_path: PathBuf,
    /// Folder scanned for section files.
    pub section_folder: PathBuf,
    /// Prepended to each file stem to form the property name. Default: "BXS_"
    pub name_prefix: String,
    /// Library material given to every new property. Default: library 16, item 2
    pub material: MaterialRef,
    /// Structural behaviour of every new property. Default: beam
    pub beam_type: BeamType,
    /// Extension of section files. Default: "bxs"
    pub section_extension: String,
    /// Required extension of the model file. Default: "st7"
    pub model_extension: String,
    /// Engine session handle. Default: 1
    pub session: SessionId,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            section_folder: PathBuf::from("sections"),
            name_prefix: "BXS_".to_string(),
            material: MaterialRef::default(),
            beam_type: BeamType::default(),
            section_extension: default_section_extension(),
            model_extension: default_model_extension(),
            session: default_session(),
        }
    }
}

/// Settings of the ID-based property matcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Model whose beams are assigned.
    pub model_path: PathBuf,
    /// Prepended to each beam ID to form the expected property name. Default: "sec_"
    pub prefix: String,
    /// Required extension of the model file. Default: "st7"
    pub model_extension: String,
    /// Engine session handle. Default: 1
    pub session: SessionId,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            prefix: "sec_".to_string(),
            model_extension: default_model_extension(),
            session: default_session(),
        }
    }
}

impl MatcherConfig {
    /// Property name expected for the beam with external `id`.
    ///
    /// # Examples
    /// ```
    /// use beamsec::MatcherConfig;
    ///
    /// let config = MatcherConfig {
    ///     prefix: "SEC_".to_string(),
    ///     ..MatcherConfig::default()
    /// };
    /// assert_eq!(config.expected_name(411), "sec_411");
    /// ```
    #[must_use]
    pub fn expected_name(&self, id: u64) -> String {
        format!("{}{id}", self.prefix).to_lowercase()
    }
}

/// Settings of all three jobs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Geometry pipeline settings.
    pub generator: GeneratorConfig,
    /// Registrar settings.
    pub registrar: RegistrarConfig,
    /// Matcher settings.
    pub matcher: MatcherConfig,
}

impl JobsConfig {
    /// Read a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not a valid configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_takes_every_default() {
        let config: JobsConfig = serde_json::from_str("{}").expect("defaults apply");
        assert_eq!(config, JobsConfig::default());
        assert_eq!(config.matcher.prefix, "sec_");
        assert_eq!(config.registrar.name_prefix, "BXS_");
        assert_eq!(config.registrar.material, MaterialRef { library: 16, item: 2 });
        assert_eq!(config.generator.geometry_extension, "igs");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: JobsConfig = serde_json::from_str(
            r#"{ "matcher": { "model_path": "frame.st7", "prefix": "beam_" },
                 "registrar": { "beam_type": "truss" } }"#,
        )
        .expect("valid configuration");
        assert_eq!(config.matcher.model_path, PathBuf::from("frame.st7"));
        assert_eq!(config.matcher.model_extension, "st7");
        assert_eq!(config.registrar.beam_type, BeamType::Truss);
        assert_eq!(config.registrar.section_extension, "bxs");
    }

    #[test]
    fn saved_configuration_loads_back() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("jobs.json");
        let mut config = JobsConfig::default();
        config.matcher.prefix = "member_".to_string();
        config.save(&path).expect("configuration written");
        assert_eq!(JobsConfig::load(&path).expect("configuration read"), config);
    }

    #[test]
    fn malformed_file_names_its_path() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let path = dir.path().join("jobs.json");
        fs::write(&path, "[1, 2").expect("fixture written");
        let error = JobsConfig::load(&path).expect_err("malformed file rejected");
        assert!(matches!(error, ConfigError::Parse { .. }));
        assert!(error.to_string().contains("jobs.json"));
    }
}
