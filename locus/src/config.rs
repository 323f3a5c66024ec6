//! Filter configuration
//!
//! A filter can be described in a JSON file instead of (or in addition to)
//! command-line flags:
//!
//! ```json
//! {
//!   "patterns": ["mymodule", "pkg/foo"],
//!   "base_path": "/home/user/proj",
//!   "profile_all": false
//! }
//! ```
//!
//! Every field is optional. `patterns` must be a list of strings.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{ConfigError, RegistrationError};
use crate::filter::TraceFilter;

/// Declarative description of a [`TraceFilter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Path fragments matched as substrings
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Directory whose files are traced; empty disables the rule
    #[serde(default)]
    pub base_path: PathBuf,

    /// Reserved "trace everything" mode
    #[serde(default)]
    pub profile_all: bool,
}

impl FilterConfig {
    pub fn new<I, S>(patterns: I, base_path: impl Into<PathBuf>, profile_all: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
            base_path: base_path.into(),
            profile_all,
        }
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed, has unknown fields, or
    /// `patterns` is not a list of strings
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&json)
    }

    /// Check the values a filter cannot work with.
    ///
    /// # Errors
    /// Returns an error for an empty pattern, a pattern containing NUL, or a
    /// relative base path
    pub fn validate(&self) -> Result<(), RegistrationError> {
        for (index, pattern) in self.patterns.iter().enumerate() {
            if pattern.is_empty() {
                return Err(RegistrationError::EmptyPattern { index });
            }
            if pattern.contains('\0') {
                return Err(RegistrationError::InvalidPattern { index, pattern: pattern.clone() });
            }
        }

        if !self.base_path.as_os_str().is_empty() && !self.base_path.is_absolute() {
            return Err(RegistrationError::RelativeBasePath(self.base_path.clone()));
        }

        Ok(())
    }

    /// Validate and build the filter.
    ///
    /// # Errors
    /// See [`FilterConfig::validate`]
    pub fn build(&self) -> Result<TraceFilter, RegistrationError> {
        self.validate()?;
        Ok(TraceFilter::new(self.patterns.iter().cloned(), &self.base_path, self.profile_all))
    }
}
