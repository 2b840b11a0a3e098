//! Target resolution: turns a [`PatchConfig`] into the file to patch.
//!
//! Global packages are located through the [`GlobalRoot`] capability, which by
//! default asks npm for its global `node_modules` directory.

use crate::config::schema::{ConfigError, PatchConfig, Target};
use std::env;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Suffix appended to the target's file name to form the backup path.
pub const BACKUP_SUFFIX: &str = ".backup";

/// Environment variable naming the npm executable.
pub const NPM_ENV: &str = "PACKAGE_PATCHER_NPM";

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("failed to run `{program} root -g`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{program} root -g` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("`{program} root -g` produced no output")]
    EmptyOutput { program: String },

    #[error("cannot determine working directory: {0}")]
    WorkingDir(std::io::Error),

    #[error("cannot expand '~': home directory is unknown")]
    NoHome,
}

/// Capability that yields the global package install root.
pub trait GlobalRoot {
    fn global_root(&self) -> Result<PathBuf, ResolutionError>;
}

/// Queries `npm root -g`.
#[derive(Debug, Clone)]
pub struct NpmGlobalRoot {
    program: OsString,
}

impl NpmGlobalRoot {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Uses `$PACKAGE_PATCHER_NPM` when set, `npm` otherwise.
    pub fn from_env() -> Self {
        Self::new(env::var_os(NPM_ENV).unwrap_or_else(|| OsString::from("npm")))
    }
}

impl Default for NpmGlobalRoot {
    fn default() -> Self {
        Self::from_env()
    }
}

impl GlobalRoot for NpmGlobalRoot {
    fn global_root(&self) -> Result<PathBuf, ResolutionError> {
        let program = self.program.to_string_lossy().into_owned();
        let output = Command::new(&self.program)
            .args(["root", "-g"])
            .output()
            .map_err(|source| ResolutionError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ResolutionError::Failed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if root.is_empty() {
            return Err(ResolutionError::EmptyOutput { program });
        }

        tracing::debug!(root = %root, "resolved global package root");
        Ok(PathBuf::from(root))
    }
}

/// A global root known ahead of time (tests, `--global-root`).
#[derive(Debug, Clone)]
pub struct FixedGlobalRoot(pub PathBuf);

impl GlobalRoot for FixedGlobalRoot {
    fn global_root(&self) -> Result<PathBuf, ResolutionError> {
        Ok(self.0.clone())
    }
}

/// The file a patch session operates on, plus its backup sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub path: PathBuf,
    pub backup_path: PathBuf,
    /// Package directory for global targets; used by the version guard.
    pub package_root: Option<PathBuf>,
}

impl ResolvedTarget {
    pub fn new(path: PathBuf, package_root: Option<PathBuf>) -> Self {
        let mut backup = path.clone().into_os_string();
        backup.push(BACKUP_SUFFIX);
        Self {
            path,
            backup_path: PathBuf::from(backup),
            package_root,
        }
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Resolve a config to an absolute target path.
///
/// Does not check that the file exists.
pub fn resolve(
    config: &PatchConfig,
    global_root: &dyn GlobalRoot,
) -> Result<ResolvedTarget, ResolveError> {
    match config.target()? {
        Target::LocalPath(path) => {
            let path = expand_home(&path)?;
            let cwd = env::current_dir().map_err(ResolutionError::WorkingDir)?;
            Ok(ResolvedTarget::new(absolutize(&cwd, &path), None))
        }
        Target::GlobalPackage {
            name,
            relative_path,
            target_file,
        } => {
            let package_root = global_root.global_root()?.join(&name);
            let file = target_file.unwrap_or(relative_path);
            let path = lexical_normalize(&package_root.join(file));
            Ok(ResolvedTarget::new(path, Some(package_root)))
        }
    }
}

fn expand_home(path: &Path) -> Result<PathBuf, ResolutionError> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = home::home_dir().ok_or(ResolutionError::NoHome)?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

/// Join `path` onto `base` unless already absolute, then drop `.`/`..`.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        lexical_normalize(path)
    } else {
        lexical_normalize(&base.join(path))
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Replacement;

    fn pairs() -> Vec<Replacement> {
        vec![Replacement::new("a", "b")]
    }

    struct FailingRoot;

    impl GlobalRoot for FailingRoot {
        fn global_root(&self) -> Result<PathBuf, ResolutionError> {
            Err(ResolutionError::EmptyOutput {
                program: "npm".to_string(),
            })
        }
    }

    #[test]
    fn test_backup_path_is_sibling() {
        let target = ResolvedTarget::new(PathBuf::from("/pkg/lib/main.js"), None);
        assert_eq!(target.backup_path, PathBuf::from("/pkg/lib/main.js.backup"));
    }

    #[test]
    fn test_local_path_made_absolute() {
        let config = PatchConfig::local("lib/./main.js", pairs());
        let target = resolve(&config, &FailingRoot).unwrap();
        let cwd = env::current_dir().unwrap();
        assert_eq!(target.path, cwd.join("lib/main.js"));
        assert!(target.package_root.is_none());
    }

    #[test]
    fn test_global_defaults_to_index_js() {
        let config = PatchConfig::global("is-odd", pairs());
        let root = FixedGlobalRoot(PathBuf::from("/usr/lib/node_modules"));
        let target = resolve(&config, &root).unwrap();
        assert_eq!(
            target.path,
            PathBuf::from("/usr/lib/node_modules/is-odd/index.js")
        );
        assert_eq!(
            target.package_root,
            Some(PathBuf::from("/usr/lib/node_modules/is-odd"))
        );
    }

    #[test]
    fn test_target_file_wins_over_relative_path() {
        let mut config = PatchConfig::global("is-odd", pairs());
        config.relative_path = Some(PathBuf::from("dist/index.js"));
        config.target_file = Some(PathBuf::from("lib/main.js"));
        let root = FixedGlobalRoot(PathBuf::from("/g"));
        let target = resolve(&config, &root).unwrap();
        assert_eq!(target.path, PathBuf::from("/g/is-odd/lib/main.js"));
    }

    #[test]
    fn test_relative_path_used_without_target_file() {
        let mut config = PatchConfig::global("@scope/pkg", pairs());
        config.relative_path = Some(PathBuf::from("dist/index.js"));
        let root = FixedGlobalRoot(PathBuf::from("/g"));
        let target = resolve(&config, &root).unwrap();
        assert_eq!(target.path, PathBuf::from("/g/@scope/pkg/dist/index.js"));
    }

    #[test]
    fn test_global_root_failure_is_resolution_error() {
        let config = PatchConfig::global("is-odd", pairs());
        let result = resolve(&config, &FailingRoot);
        assert!(matches!(result, Err(ResolveError::Resolution(_))));
    }

    #[test]
    fn test_invalid_config_skips_global_query() {
        let mut config = PatchConfig::global("is-odd", pairs());
        config.package_path = Some(PathBuf::from("a.js"));
        // FailingRoot would produce a resolution error if it were queried
        let result = resolve(&config, &FailingRoot);
        assert!(matches!(result, Err(ResolveError::Config(_))));
    }

    #[test]
    fn test_npm_missing_program() {
        let npm = NpmGlobalRoot::new("definitely-not-a-real-npm-binary");
        assert!(matches!(
            npm.global_root(),
            Err(ResolutionError::Spawn { .. })
        ));
    }

    #[test]
    #[cfg(unix)]
    fn test_npm_nonzero_exit() {
        let npm = NpmGlobalRoot::new("false");
        assert!(matches!(
            npm.global_root(),
            Err(ResolutionError::Failed { .. })
        ));
    }

    #[test]
    fn test_absolutize_parent_components() {
        let base = Path::new("/work/project");
        assert_eq!(
            absolutize(base, Path::new("../other/file.js")),
            PathBuf::from("/work/other/file.js")
        );
        assert_eq!(
            absolutize(base, Path::new("/abs/./x.js")),
            PathBuf::from("/abs/x.js")
        );
    }
}
