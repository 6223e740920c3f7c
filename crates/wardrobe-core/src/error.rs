//! Error types for the wardrobe catalog builder

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single schema violation, addressed by the field path it was found at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The main error type for wardrobe operations
#[derive(Debug, Error)]
pub enum WardrobeError {
    #[error("Invalid manifest {path}: {reason}")]
    InvalidManifest { path: String, reason: String },

    #[error("Missing resource: {0}")]
    MissingResource(String),

    #[error("Validation failed with {} issue(s): {}", .0.len(), join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    #[error("Content addressing error: {0}")]
    ContentAddressing(String),

    #[error("Cannot resolve identifier '{id}': {reason}")]
    IdentifierResolution { id: String, reason: String },

    #[error("Invalid model container: {0}")]
    InvalidContainer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Deploy error: {0}")]
    Deploy(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl WardrobeError {
    /// Whether this error concerns a single asset folder rather than shared setup.
    ///
    /// Asset-local errors are recorded and the build moves on; anything else
    /// aborts the run.
    pub fn is_asset_local(&self) -> bool {
        !matches!(self, WardrobeError::Config(_) | WardrobeError::Deploy(_))
    }

    /// Field-level issues carried by this error, if it is a validation failure
    pub fn issues(&self) -> Vec<ValidationIssue> {
        match self {
            WardrobeError::Validation(issues) => issues.clone(),
            WardrobeError::InvalidManifest { reason, .. } => {
                vec![ValidationIssue::new("/", reason.clone())]
            }
            other => vec![ValidationIssue::new("/", other.to_string())],
        }
    }
}

/// Result type alias for wardrobe operations
pub type Result<T> = std::result::Result<T, WardrobeError>;

impl From<serde_json::Error> for WardrobeError {
    fn from(err: serde_json::Error) -> Self {
        WardrobeError::Json(err.to_string())
    }
}

impl From<toml::de::Error> for WardrobeError {
    fn from(err: toml::de::Error) -> Self {
        WardrobeError::TomlParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_issue() {
        let err = WardrobeError::Validation(vec![
            ValidationIssue::new("/name", "must not be empty"),
            ValidationIssue::new("/data/tags", "must contain at least one tag"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("2 issue(s)"));
        assert!(msg.contains("/name: must not be empty"));
        assert!(msg.contains("/data/tags"));
    }

    #[test]
    fn test_asset_local_classification() {
        assert!(WardrobeError::MissingResource("thumbnail.png".into()).is_asset_local());
        assert!(!WardrobeError::Config("bad".into()).is_asset_local());
    }
}
