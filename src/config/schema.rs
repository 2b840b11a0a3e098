use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Default file patched inside a global package when neither
/// `relativePath` nor `targetFile` is given.
pub const DEFAULT_RELATIVE_PATH: &str = "index.js";

/// A patch session description, as read from a config document.
///
/// The target is stored as two optional fields so that an ambiguous document
/// (both set, or neither) survives deserialization and is rejected by
/// [`PatchConfig::validate`] instead of by the parser.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PatchConfig {
    /// Local file to patch, relative to the working directory.
    #[serde(default)]
    pub package_path: Option<PathBuf>,
    /// Name of a globally installed npm package.
    #[serde(default)]
    pub global_npm_package: Option<String>,
    /// File inside the global package. Defaults to `index.js`.
    #[serde(default)]
    pub relative_path: Option<PathBuf>,
    /// File inside the global package; takes precedence over `relative_path`.
    #[serde(default)]
    pub target_file: Option<PathBuf>,
    /// Normalize formatting before matching.
    #[serde(default = "default_reformat", alias = "reformat")]
    pub beautify: bool,
    /// Semver requirement checked against the package's `package.json`.
    #[serde(default)]
    pub version_range: Option<String>,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

fn default_reformat() -> bool {
    true
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            package_path: None,
            global_npm_package: None,
            relative_path: None,
            target_file: None,
            beautify: true,
            version_range: None,
            replacements: Vec::new(),
        }
    }
}

/// One literal `(match, replacement)` pair. Serialized as a two-element array.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(from = "(String, String)")]
pub struct Replacement {
    pub find: String,
    pub replace: String,
}

impl Replacement {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }
}

impl From<(String, String)> for Replacement {
    fn from((find, replace): (String, String)) -> Self {
        Self { find, replace }
    }
}

/// The file a config points at, once the shape has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    LocalPath(PathBuf),
    GlobalPackage {
        name: String,
        relative_path: PathBuf,
        target_file: Option<PathBuf>,
    },
}

impl PatchConfig {
    /// Config targeting a local file.
    pub fn local(path: impl Into<PathBuf>, replacements: Vec<Replacement>) -> Self {
        Self {
            package_path: Some(path.into()),
            replacements,
            ..Self::default()
        }
    }

    /// Config targeting a file inside a globally installed package.
    pub fn global(name: impl Into<String>, replacements: Vec<Replacement>) -> Self {
        Self {
            global_npm_package: Some(name.into()),
            replacements,
            ..Self::default()
        }
    }

    pub fn with_reformat(mut self, reformat: bool) -> Self {
        self.beautify = reformat;
        self
    }

    pub fn reformat(&self) -> bool {
        self.beautify
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();

        let has_local = self.package_path.is_some();
        let has_global = self.global_npm_package.is_some();
        match (has_local, has_global) {
            (false, false) => issues.push(ConfigIssue::MissingTarget),
            (true, true) => issues.push(ConfigIssue::AmbiguousTarget),
            _ => {}
        }

        if let Some(path) = &self.package_path {
            if path.as_os_str().is_empty() {
                issues.push(ConfigIssue::MissingField {
                    field: "packagePath",
                });
            }
        }
        if let Some(name) = &self.global_npm_package {
            if name.trim().is_empty() {
                issues.push(ConfigIssue::MissingField {
                    field: "globalNpmPackage",
                });
            }
        }
        if has_local && (self.relative_path.is_some() || self.target_file.is_some()) {
            issues.push(ConfigIssue::InvalidCombo {
                message: "relativePath and targetFile only apply to globalNpmPackage".to_string(),
            });
        }

        if self.replacements.is_empty() {
            issues.push(ConfigIssue::EmptyReplacementList);
        }
        for (index, replacement) in self.replacements.iter().enumerate() {
            if replacement.find.is_empty() {
                issues.push(ConfigIssue::EmptyMatch { index });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError { issues })
        }
    }

    /// Validate and return the single target this config names.
    pub fn target(&self) -> Result<Target, ConfigError> {
        self.validate()?;
        match (&self.package_path, &self.global_npm_package) {
            (Some(path), None) => Ok(Target::LocalPath(path.clone())),
            (None, Some(name)) => Ok(Target::GlobalPackage {
                name: name.clone(),
                relative_path: self
                    .relative_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_RELATIVE_PATH)),
                target_file: self.target_file.clone(),
            }),
            // validate() rejects the other combinations
            _ => Err(ConfigError {
                issues: vec![ConfigIssue::AmbiguousTarget],
            }),
        }
    }
}

/// Malformed or ambiguous config. Lists every problem found.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub issues: Vec<ConfigIssue>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    MissingTarget,
    AmbiguousTarget,
    EmptyReplacementList,
    EmptyMatch { index: usize },
    MissingField { field: &'static str },
    InvalidCombo { message: String },
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigIssue::MissingTarget => {
                write!(f, "one of packagePath or globalNpmPackage is required")
            }
            ConfigIssue::AmbiguousTarget => {
                write!(f, "packagePath and globalNpmPackage cannot both be set")
            }
            ConfigIssue::EmptyReplacementList => write!(f, "replacements must not be empty"),
            ConfigIssue::EmptyMatch { index } => {
                write!(f, "replacement #{} has an empty match string", index + 1)
            }
            ConfigIssue::MissingField { field } => write!(f, "'{field}' must not be empty"),
            ConfigIssue::InvalidCombo { message } => write!(f, "invalid configuration: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_target() {
        let config = PatchConfig::local("lib/main.js", vec![Replacement::new("a", "b")]);
        assert_eq!(
            config.target().unwrap(),
            Target::LocalPath(PathBuf::from("lib/main.js"))
        );
        assert!(config.reformat());
    }

    #[test]
    fn test_global_target_defaults_to_index() {
        let config = PatchConfig::global("is-odd", vec![Replacement::new("a", "b")]);
        match config.target().unwrap() {
            Target::GlobalPackage {
                name,
                relative_path,
                target_file,
            } => {
                assert_eq!(name, "is-odd");
                assert_eq!(relative_path, PathBuf::from("index.js"));
                assert!(target_file.is_none());
            }
            other => panic!("unexpected target: {other:?}"),
        }
    }

    #[test]
    fn test_both_targets_rejected() {
        let mut config = PatchConfig::local("a.js", vec![Replacement::new("a", "b")]);
        config.global_npm_package = Some("is-odd".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.issues.contains(&ConfigIssue::AmbiguousTarget));
    }

    #[test]
    fn test_no_target_rejected() {
        let config = PatchConfig {
            replacements: vec![Replacement::new("a", "b")],
            ..PatchConfig::default()
        };
        let err = config.target().unwrap_err();
        assert_eq!(err.issues, vec![ConfigIssue::MissingTarget]);
    }

    #[test]
    fn test_reports_every_issue() {
        let config = PatchConfig::local(
            "a.js",
            vec![Replacement::new("", "x"), Replacement::new("", "y")],
        );
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.issues,
            vec![
                ConfigIssue::EmptyMatch { index: 0 },
                ConfigIssue::EmptyMatch { index: 1 }
            ]
        );
        assert!(err.to_string().contains("replacement #2"));
    }

    #[test]
    fn test_empty_replacements_rejected() {
        let config = PatchConfig::local("a.js", Vec::new());
        let err = config.validate().unwrap_err();
        assert_eq!(err.issues, vec![ConfigIssue::EmptyReplacementList]);
    }

    #[test]
    fn test_relative_path_requires_global() {
        let mut config = PatchConfig::local("a.js", vec![Replacement::new("a", "b")]);
        config.target_file = Some(PathBuf::from("lib/main.js"));
        assert!(matches!(
            config.validate().unwrap_err().issues[0],
            ConfigIssue::InvalidCombo { .. }
        ));
    }
}
