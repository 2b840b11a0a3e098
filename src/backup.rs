//! One-generation backup beside the target file.
//!
//! The backup is written once, from the first content the engine ever read,
//! and is never overwritten or removed afterwards.

use crate::resolve::ResolvedTarget;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("no backup found at {path}; cannot undo patches")]
    NotFound { path: PathBuf },

    #[error("backup I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Write `content` to the backup path unless a backup already exists.
///
/// Returns `true` when a new backup was created.
pub fn ensure_backup(target: &ResolvedTarget, content: &[u8]) -> Result<bool, BackupError> {
    let path = &target.backup_path;
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            tracing::debug!(backup = %path.display(), "backup already present");
            return Ok(false);
        }
        Err(source) => {
            return Err(BackupError::Io {
                path: path.clone(),
                source,
            })
        }
    };

    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|source| BackupError::Io {
            path: path.clone(),
            source,
        })?;

    tracing::debug!(backup = %path.display(), bytes = content.len(), "created backup");
    Ok(true)
}

/// Full content of the backup.
pub fn restore(target: &ResolvedTarget) -> Result<Vec<u8>, BackupError> {
    let path = &target.backup_path;
    fs::read(path).map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            BackupError::NotFound { path: path.clone() }
        } else {
            BackupError::Io {
                path: path.clone(),
                source,
            }
        }
    })
}

pub fn exists(target: &ResolvedTarget) -> bool {
    target.backup_path.exists()
}
