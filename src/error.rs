//! Unified error handling for plugstack
//!
//! This module provides a centralized error type for the whole plugin
//! lifecycle, ensuring consistent error handling across all components.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout plugstack.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for plugstack operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed structured string (e.g. a semantic version)
    #[error("the string '{0}' is not a valid SemVer")]
    Format(String),

    /// Manifest present but schema-invalid; carries all field errors
    #[error("invalid metadata: {0}")]
    Validation(ValidationErrors),

    /// Expected file or directory absent
    #[error("'{0}' does not exist")]
    NotFound(PathBuf),

    /// Supplied path missing or of the wrong type
    #[error("invalid path '{path}': {reason}")]
    Path { path: PathBuf, reason: String },

    /// Archive extension does not match the configured one
    #[error("invalid plugin extension '{found}' (required: '{required}')")]
    InvalidExtension { found: String, required: String },

    /// Archive container unreadable
    #[error("the file '{0}' is not a valid plugin package")]
    CorruptArchive(PathBuf),

    /// Pack target already present; packing never overwrites
    #[error("the plugin package '{0}' already exists")]
    AlreadyExists(PathBuf),

    /// Install destination already present; install never merges
    #[error("the plugin '{name}' is already installed in '{directory}'")]
    AlreadyInstalled { name: String, directory: PathBuf },

    /// Uninstall target absent
    #[error("the plugin '{name}' is not installed in '{directory}'")]
    NotInstalled { name: String, directory: PathBuf },

    /// Operation requires a configuration flag that is unset
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A discovered plugin's code failed to load (non-fatal to discovery)
    #[error("failed to load plugin module '{plugin}': {message}")]
    ModuleLoad { plugin: String, message: String },

    /// I/O related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest (de)serialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Aggregated field-level validation failures.
///
/// All offending fields are collected in one pass, not just the first,
/// so a caller can report every problem with a manifest at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for the given field.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    /// All messages recorded for a field, if any.
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// Iterate over (field, messages) pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Convert into an `Error::Validation` if any failure was recorded.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_collects_all_fields() {
        let mut errors = ValidationErrors::new();
        errors.push("uuid", "required field is missing");
        errors.push("version", "not a valid SemVer");
        errors.push("version", "required field is missing");

        assert_eq!(errors.len(), 3);
        assert_eq!(errors.field("uuid").unwrap().len(), 1);
        assert_eq!(errors.field("version").unwrap().len(), 2);
        assert!(errors.field("name").is_none());
    }

    #[test]
    fn test_validation_errors_display_joins_messages() {
        let mut errors = ValidationErrors::new();
        errors.push("name", "must be alphanumeric");
        errors.push("uuid", "must be a hex string");

        let text = errors.to_string();
        assert!(text.contains("name: must be alphanumeric"));
        assert!(text.contains("uuid: must be a hex string"));
    }

    #[test]
    fn test_empty_validation_errors_into_result_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
