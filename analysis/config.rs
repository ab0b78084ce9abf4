//! Analysis settings, optionally persisted as TOML.
//!
//! Column names are never hard-coded: every run names its feature, outcome and
//! optional id/stratum columns here or on the command line. Command-line flags
//! take precedence over a loaded file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::exact::Alternative;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write the configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse the configuration file as TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize the configuration to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error(
        "No {0} column was given. Pass it on the command line or set it in the configuration file."
    )]
    MissingField(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Boolean column marking feature presence.
    pub feature: Option<String>,
    /// Boolean column marking outcome presence.
    pub outcome: Option<String>,
    /// Column holding unique entity identifiers.
    pub id: Option<String>,
    /// Categorical column to stratify on.
    pub stratify_by: Option<String>,
    /// Feature columns tested by a scan.
    pub features: Vec<String>,
    /// Single-character field separator, or "tab".
    pub separator: Option<String>,
    pub alternative: Alternative,
}

impl AnalysisConfig {
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config = toml::from_str(&toml_string)?;
        Ok(config)
    }

    pub fn feature_column(&self) -> Result<&str, ConfigError> {
        self.feature.as_deref().ok_or(ConfigError::MissingField("feature"))
    }

    pub fn outcome_column(&self) -> Result<&str, ConfigError> {
        self.outcome.as_deref().ok_or(ConfigError::MissingField("outcome"))
    }

    /// Feature list for a scan; an empty list is an error.
    pub fn feature_columns(&self) -> Result<&[String], ConfigError> {
        if self.features.is_empty() {
            return Err(ConfigError::MissingField("features"));
        }
        Ok(&self.features)
    }
}
