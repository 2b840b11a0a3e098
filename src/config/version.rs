//! Version guard for patches using semver constraints
//!
//! A config may carry `versionRange` such as `">=3.0.0, <4.0.0"`; the patch is
//! only applied when the package's `package.json` version satisfies it.

use semver::{Version, VersionReq};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const PACKAGE_MANIFEST: &str = "package.json";

/// Errors during version checks
#[derive(Debug, Clone)]
pub enum VersionError {
    /// Invalid version string (e.g., "not-a-version")
    InvalidVersion { value: String, source: String },
    /// Invalid version requirement (e.g., ">=bad")
    InvalidRequirement { value: String, source: String },
    /// `package.json` missing, unreadable, or without a `version` field
    Manifest { path: PathBuf, reason: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
            VersionError::Manifest { path, reason } => {
                write!(f, "cannot read package version from {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Check if a version matches a requirement string
///
/// # Examples
///
/// ```
/// use package_patcher::config::version::matches_requirement;
///
/// assert!(matches_requirement("3.0.1", Some(">=3.0.0")).unwrap());
/// assert!(matches_requirement("3.2.0", Some(">=3.0.0, <4.0.0")).unwrap());
/// assert!(!matches_requirement("2.9.9", Some(">=3.0.0")).unwrap());
///
/// // None requirement means "any version"
/// assert!(matches_requirement("1.0.0", None).unwrap());
/// ```
pub fn matches_requirement(
    version: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    let Some(req_str) = requirement else {
        return Ok(true);
    };

    let req_str = req_str.trim();
    if req_str.is_empty() {
        return Ok(true);
    }

    let version = Version::parse(version.trim()).map_err(|e| VersionError::InvalidVersion {
        value: version.to_string(),
        source: e.to_string(),
    })?;

    let req = VersionReq::parse(req_str).map_err(|e| VersionError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    Ok(req.matches(&version))
}

#[derive(Deserialize)]
struct PackageManifest {
    version: Option<String>,
}

/// Read the `version` field of `<dir>/package.json`.
pub fn read_package_version(dir: &Path) -> Result<String, VersionError> {
    let path = dir.join(PACKAGE_MANIFEST);
    let contents = fs::read_to_string(&path).map_err(|e| VersionError::Manifest {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let manifest: PackageManifest =
        serde_json::from_str(&contents).map_err(|e| VersionError::Manifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    manifest.version.ok_or_else(|| VersionError::Manifest {
        path,
        reason: "missing \"version\" field".to_string(),
    })
}

/// Nearest ancestor of `file` that contains a `package.json`.
pub fn find_package_root(file: &Path) -> Option<PathBuf> {
    file.parent()?
        .ancestors()
        .find(|dir| dir.join(PACKAGE_MANIFEST).is_file())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_requirement() {
        assert!(matches_requirement("3.0.0", None).unwrap());
        assert!(matches_requirement("0.1.0", None).unwrap());
    }

    #[test]
    fn test_empty_requirement() {
        assert!(matches_requirement("3.0.0", Some("")).unwrap());
        assert!(matches_requirement("1.0.0", Some("   ")).unwrap());
    }

    #[test]
    fn test_compound_requirement() {
        let req = ">=3.0.0, <4.0.0";

        assert!(matches_requirement("3.0.0", Some(req)).unwrap());
        assert!(matches_requirement("3.9.5", Some(req)).unwrap());
        assert!(!matches_requirement("2.0.0", Some(req)).unwrap());
        assert!(!matches_requirement("4.0.0", Some(req)).unwrap());
    }

    #[test]
    fn test_caret_requirement() {
        let req = "^3.0";
        assert!(matches_requirement("3.0.1", Some(req)).unwrap());
        assert!(matches_requirement("3.4.0", Some(req)).unwrap());
        assert!(!matches_requirement("4.0.0", Some(req)).unwrap());
    }

    #[test]
    fn test_invalid_version() {
        let result = matches_requirement("not-a-version", Some(">=3.0.0"));
        assert!(matches!(result, Err(VersionError::InvalidVersion { .. })));
    }

    #[test]
    fn test_invalid_requirement() {
        let result = matches_requirement("3.0.0", Some(">=bad-version"));
        assert!(matches!(result, Err(VersionError::InvalidRequirement { .. })));
    }

    #[test]
    fn test_read_package_version() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "is-odd", "version": "3.0.1"}"#,
        )
        .unwrap();
        assert_eq!(read_package_version(dir.path()).unwrap(), "3.0.1");
    }

    #[test]
    fn test_read_package_version_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "is-odd"}"#).unwrap();
        assert!(matches!(
            read_package_version(dir.path()),
            Err(VersionError::Manifest { .. })
        ));
    }

    #[test]
    fn test_find_package_root_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        let nested = dir.path().join("lib/util");
        fs::create_dir_all(&nested).unwrap();

        let root = find_package_root(&nested.join("main.js")).unwrap();
        assert_eq!(root, dir.path());
    }
}
