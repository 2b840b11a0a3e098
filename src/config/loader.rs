use crate::config::schema::{ConfigError, PatchConfig};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Config document syntax, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
}

impl Format {
    /// `.toml` is TOML; everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: Option<PathBuf>,
        source: serde_json::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ConfigError,
    },
}

impl LoadError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            LoadError::Io { .. } => self,
            LoadError::Json { path: None, source } => LoadError::Json {
                path: Some(path),
                source,
            },
            LoadError::Toml { path: None, source } => LoadError::Toml {
                path: Some(path),
                source,
            },
            LoadError::Validation { path: None, source } => LoadError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => {
                write!(
                    f,
                    "failed to read patch config from {}: {}",
                    path.display(),
                    source
                )
            }
            LoadError::Json { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse patch config JSON ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse patch config JSON: {}", source),
            },
            LoadError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse patch config TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse patch config TOML: {}", source),
            },
            LoadError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid patch config ({}): {}", path.display(), source),
                None => write!(f, "invalid patch config: {}", source),
            },
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::Json { source, .. } => Some(source),
            LoadError::Toml { source, .. } => Some(source),
            LoadError::Validation { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str, format: Format) -> Result<PatchConfig, LoadError> {
    let config: PatchConfig = match format {
        Format::Json => serde_json::from_str(input)
            .map_err(|source| LoadError::Json { path: None, source })?,
        Format::Toml => toml_edit::de::from_str(input)
            .map_err(|source| LoadError::Toml { path: None, source })?,
    };
    config
        .validate()
        .map_err(|source| LoadError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchConfig, LoadError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents, Format::from_path(path)).map_err(|error| error.with_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ConfigIssue, Replacement, Target};

    #[test]
    fn test_load_json_global_package() {
        let json = r#"{
            "globalNpmPackage": "is-odd",
            "beautify": false,
            "targetFile": "lib/main.js",
            "replacements": [["isOdd(value) {", "isOdd(value) { check(value);"]]
        }"#;
        let config = load_from_str(json, Format::Json).unwrap();
        assert!(!config.reformat());
        assert_eq!(
            config.replacements,
            vec![Replacement::new(
                "isOdd(value) {",
                "isOdd(value) { check(value);"
            )]
        );
        assert!(matches!(
            config.target().unwrap(),
            Target::GlobalPackage { target_file: Some(_), .. }
        ));
    }

    #[test]
    fn test_load_toml_local_path() {
        let toml = r#"
packagePath = "node_modules/is-odd/index.js"
versionRange = ">=3.0.0"
replacements = [
    ["a", "b"],
    ["c", "d"],
]
"#;
        let config = load_from_str(toml, Format::Toml).unwrap();
        assert!(config.reformat());
        assert_eq!(config.version_range.as_deref(), Some(">=3.0.0"));
        assert_eq!(config.replacements.len(), 2);
    }

    #[test]
    fn test_reformat_alias() {
        let json = r#"{"packagePath": "a.js", "reformat": false, "replacements": [["a", "b"]]}"#;
        let config = load_from_str(json, Format::Json).unwrap();
        assert!(!config.reformat());
    }

    #[test]
    fn test_load_rejects_ambiguous_target() {
        let json = r#"{
            "packagePath": "a.js",
            "globalNpmPackage": "is-odd",
            "replacements": [["a", "b"]]
        }"#;
        match load_from_str(json, Format::Json) {
            Err(LoadError::Validation { source, .. }) => {
                assert!(source.issues.contains(&ConfigIssue::AmbiguousTarget));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_rejects_malformed_pair() {
        let json = r#"{"packagePath": "a.js", "replacements": [["only-one"]]}"#;
        assert!(matches!(
            load_from_str(json, Format::Json),
            Err(LoadError::Json { .. })
        ));
    }

    #[test]
    fn test_load_from_path_attaches_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patch.json");
        fs::write(&path, r#"{"replacements": [["a", "b"]]}"#).unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(err.to_string().contains("patch.json"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("p.toml")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("p.TOML")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("p.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("patch")), Format::Json);
    }
}
