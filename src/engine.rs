//! Patch engine - resolves the target, guards it with a backup, and commits
//! literal replacements all-or-nothing
//!
//! State lives entirely on disk: a target with a `.backup` sibling has been
//! patched at least once, and `undo` copies that sibling back.

use crate::backup::{self, BackupError};
use crate::config::schema::{ConfigError, PatchConfig};
use crate::config::version::{self, VersionError};
use crate::reformat::{Normalizer, Reformatter};
use crate::replace::{self, ReplacementError, ReplacementOutcome};
use crate::resolve::{
    self, GlobalRoot, NpmGlobalRoot, ResolutionError, ResolveError, ResolvedTarget,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("invalid patch config: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot locate package: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("no backup file found at {path}; cannot undo patches")]
    NoBackup { path: PathBuf },

    #[error(transparent)]
    Replacement(#[from] ReplacementError),

    #[error("package version {found} does not satisfy versionRange {required}")]
    VersionMismatch { found: String, required: String },

    #[error("version check failed: {0}")]
    Version(#[from] VersionError),
}

impl From<ResolveError> for PatchError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Config(e) => PatchError::Config(e),
            ResolveError::Resolution(e) => PatchError::Resolution(e),
        }
    }
}

impl From<BackupError> for PatchError {
    fn from(e: BackupError) -> Self {
        match e {
            BackupError::NotFound { path } => PatchError::NoBackup { path },
            BackupError::Io { path, source } => PatchError::Io { path, source },
        }
    }
}

/// Result of a successful (or dry-run) patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    pub target: ResolvedTarget,
    /// A backup was written by this call.
    pub backup_created: bool,
    pub outcomes: Vec<ReplacementOutcome>,
    /// Target content as read from disk.
    pub original: String,
    /// Content written (or, for a dry run, that would be written).
    pub patched: String,
}

impl PatchReport {
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.applied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoReport {
    pub target: ResolvedTarget,
    pub restored_bytes: usize,
}

/// Runs apply/check/undo against one config at a time.
#[derive(Debug, Clone, Default)]
pub struct Patcher<G = NpmGlobalRoot, R = Normalizer> {
    global_root: G,
    reformatter: R,
}

impl Patcher {
    /// npm-backed resolution and the whitespace [`Normalizer`].
    pub fn new() -> Self {
        Self::default()
    }
}

impl<G: GlobalRoot, R: Reformatter> Patcher<G, R> {
    pub fn with_parts(global_root: G, reformatter: R) -> Self {
        Self {
            global_root,
            reformatter,
        }
    }

    pub fn resolve(&self, config: &PatchConfig) -> Result<ResolvedTarget, PatchError> {
        let target = resolve::resolve(config, &self.global_root)?;
        tracing::debug!(target = %target.path.display(), "resolved patch target");
        Ok(target)
    }

    /// Apply the config's replacements and write the result.
    ///
    /// A backup of the untouched file is created on the first call for a
    /// target and kept as-is on every later call. If any match is missing
    /// the target is not written.
    pub fn apply(&self, config: &PatchConfig) -> Result<PatchReport, PatchError> {
        let report = self.prepare(config, true)?;
        atomic_write(&report.target.path, report.patched.as_bytes())?;

        tracing::info!(
            target = %report.target.path.display(),
            replacements = report.outcomes.len(),
            backup_created = report.backup_created,
            "applied patches"
        );
        Ok(report)
    }

    /// Compute the patch without creating a backup or writing the target.
    pub fn check(&self, config: &PatchConfig) -> Result<PatchReport, PatchError> {
        self.prepare(config, false)
    }

    /// Restore the target from its backup. The backup is kept.
    pub fn undo(&self, config: &PatchConfig) -> Result<UndoReport, PatchError> {
        let target = self.resolve(config)?;
        let content = backup::restore(&target)?;
        atomic_write(&target.path, &content)?;

        tracing::info!(
            target = %target.path.display(),
            bytes = content.len(),
            "restored from backup"
        );
        Ok(UndoReport {
            restored_bytes: content.len(),
            target,
        })
    }

    fn prepare(
        &self,
        config: &PatchConfig,
        create_backup: bool,
    ) -> Result<PatchReport, PatchError> {
        let target = self.resolve(config)?;

        let bytes = fs::read(&target.path).map_err(|source| PatchError::Io {
            path: target.path.clone(),
            source,
        })?;
        let original = String::from_utf8(bytes).map_err(|e| PatchError::Io {
            path: target.path.clone(),
            source: io::Error::new(io::ErrorKind::InvalidData, e.utf8_error()),
        })?;

        check_version(config, &target)?;

        let backup_created = if create_backup {
            backup::ensure_backup(&target, original.as_bytes())?
        } else {
            false
        };

        let prepared = if config.reformat() {
            tracing::debug!("reformatting before matching");
            self.reformatter.reformat(&original)
        } else {
            original.clone()
        };

        let replaced = replace::apply(&prepared, &config.replacements)?;

        Ok(PatchReport {
            target,
            backup_created,
            outcomes: replaced.outcomes,
            original,
            patched: replaced.content,
        })
    }
}

fn check_version(config: &PatchConfig, target: &ResolvedTarget) -> Result<(), PatchError> {
    let Some(required) = config.version_range.as_deref() else {
        return Ok(());
    };
    if required.trim().is_empty() {
        return Ok(());
    }

    let root = target
        .package_root
        .clone()
        .or_else(|| version::find_package_root(&target.path))
        .ok_or_else(|| VersionError::Manifest {
            path: target.path.clone(),
            reason: "no package.json found in any parent directory".to_string(),
        })?;

    let found = version::read_package_version(&root)?;
    if version::matches_requirement(&found, Some(required))? {
        tracing::debug!(version = %found, range = %required, "package version accepted");
        Ok(())
    } else {
        Err(PatchError::VersionMismatch {
            found,
            required: required.to_string(),
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Symlinks are followed so the file they point to is replaced, not the link.
/// Permissions, owner (unix), and a fresh mtime are set on the tempfile before
/// the rename; once the rename succeeds nothing else can fail.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), PatchError> {
    let io_err = |source: io::Error| PatchError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dest = match fs::canonicalize(path) {
        Ok(real) => real,
        Err(e) if e.kind() == io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(io_err(e)),
    };

    let parent = dest.parent().ok_or_else(|| {
        io_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Path has no parent directory",
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;

    if let Ok(metadata) = fs::metadata(&dest) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(io_err)?;
        preserve_owner(temp.as_file(), &metadata, &dest);
    }

    // Bump mtime so file watchers and module caches notice the change
    filetime::set_file_handle_times(temp.as_file(), None, Some(filetime::FileTime::now()))
        .map_err(io_err)?;

    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(&dest).map_err(|e| io_err(e.error))?;

    Ok(())
}

/// Keep the replaced file's uid/gid. Only root can hand a file to another
/// user, so a failure leaves the caller as owner and is logged.
#[cfg(unix)]
fn preserve_owner(file: &fs::File, original: &fs::Metadata, path: &Path) {
    use std::os::unix::fs::MetadataExt;

    let current = match file.metadata() {
        Ok(current) => current,
        Err(_) => return,
    };
    if current.uid() == original.uid() && current.gid() == original.gid() {
        return;
    }
    if let Err(e) = std::os::unix::fs::fchown(file, Some(original.uid()), Some(original.gid())) {
        tracing::warn!(
            target = %path.display(),
            error = %e,
            "could not preserve file owner"
        );
    }
}

#[cfg(not(unix))]
fn preserve_owner(_file: &fs::File, _original: &fs::Metadata, _path: &Path) {}
