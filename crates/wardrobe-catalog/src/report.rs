//! Build outcome reporting

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use wardrobe_core::{ValidationIssue, WardrobeError};

/// One asset that failed to build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    pub collection: String,
    pub category: String,
    /// Folder name of the asset
    pub asset: String,
    pub folder: PathBuf,
    pub error: String,
    pub issues: Vec<ValidationIssue>,
}

impl AssetFailure {
    /// Record `error` against the asset in `folder`. Collection and category
    /// come from the enclosing directory names.
    pub fn new(folder: &Path, error: &WardrobeError) -> Self {
        let name_of = |p: Option<&Path>| {
            p.and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let category_dir = folder.parent();
        Self {
            collection: name_of(category_dir.and_then(Path::parent)),
            category: name_of(category_dir),
            asset: name_of(Some(folder)),
            folder: folder.to_path_buf(),
            error: error.to_string(),
            issues: error.issues(),
        }
    }

    /// `<collection>/<asset>`
    pub fn label(&self) -> String {
        format!("{}/{}", self.collection, self.asset)
    }
}

impl fmt::Display for AssetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.label(), self.category, self.error)
    }
}

/// One entry of `validation-errors.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetErrorReport {
    pub asset: String,
    pub errors: Vec<ValidationIssue>,
}

impl From<&AssetFailure> for AssetErrorReport {
    fn from(failure: &AssetFailure) -> Self {
        Self {
            asset: failure.label(),
            errors: failure.issues.clone(),
        }
    }
}

/// Counters for one build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub found: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub blobs: usize,
}

impl BuildStats {
    pub fn summary(&self) -> String {
        format!(
            "Found {} asset(s): {} built, {} failed, {} unique blob(s)",
            self.found, self.succeeded, self.failed, self.blobs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_labels_from_path() {
        let error = WardrobeError::MissingResource("thumbnail.png".to_string());
        let failure = AssetFailure::new(Path::new("/assets/xmas_2019/hat/santa_hat"), &error);
        assert_eq!(failure.collection, "xmas_2019");
        assert_eq!(failure.category, "hat");
        assert_eq!(failure.label(), "xmas_2019/santa_hat");
        assert_eq!(failure.issues.len(), 1);
        assert!(failure.to_string().contains("thumbnail.png"));
    }

    #[test]
    fn test_error_report_keeps_issue_paths() {
        let error = WardrobeError::Validation(vec![
            ValidationIssue::new("/data/category", "bad"),
            ValidationIssue::new("/i18n", "empty"),
        ]);
        let failure = AssetFailure::new(Path::new("/a/base-avatars/hat/cap"), &error);
        let report = AssetErrorReport::from(&failure);
        assert_eq!(report.asset, "base-avatars/cap");
        let paths: Vec<&str> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/data/category", "/i18n"]);
    }

    #[test]
    fn test_summary() {
        let stats = BuildStats {
            found: 3,
            succeeded: 2,
            failed: 1,
            blobs: 7,
        };
        assert_eq!(stats.summary(), "Found 3 asset(s): 2 built, 1 failed, 7 unique blob(s)");
    }
}
