use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::pipeline::OwnershipSet;

/// A regular file found directly under the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub path: PathBuf,
    pub name: String,
}

#[derive(Debug, Error)]
pub enum RemovalError {
    #[error("destination is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("permission denied while reading {0}")]
    PermissionDenied(PathBuf),
    #[error("failed to scan {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RemovalError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => RemovalError::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotADirectory => RemovalError::NotADirectory(path.to_path_buf()),
            _ => RemovalError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    NothingToDo,
    Aborted,
    Removed,
}

#[derive(Debug)]
pub struct DeletionFailure {
    pub entry: LocalEntry,
    pub error: io::Error,
}

#[derive(Debug)]
pub struct RemovalReport {
    pub outcome: RemovalOutcome,
    pub candidates: Vec<LocalEntry>,
    pub removed: usize,
    pub failures: Vec<DeletionFailure>,
}

impl RemovalReport {
    fn untouched(outcome: RemovalOutcome, candidates: Vec<LocalEntry>) -> Self {
        Self {
            outcome,
            candidates,
            removed: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct RemovalReconciler;

impl RemovalReconciler {
    /// Top-level regular files of `destination` that `ownership` does not
    /// claim, sorted by name. Symlinks are never candidates.
    pub async fn candidates(
        destination: &Path,
        ownership: &OwnershipSet,
    ) -> Result<Vec<LocalEntry>, RemovalError> {
        let meta = tokio::fs::metadata(destination)
            .await
            .map_err(|err| RemovalError::from_io(destination, err))?;
        if !meta.is_dir() {
            return Err(RemovalError::NotADirectory(destination.to_path_buf()));
        }

        let mut entries = tokio::fs::read_dir(destination)
            .await
            .map_err(|err| RemovalError::from_io(destination, err))?;
        let mut candidates = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| RemovalError::from_io(destination, err))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|err| RemovalError::from_io(&entry.path(), err))?;
            if !file_type.is_file() {
                continue;
            }
            let path = entry.path();
            if ownership.contains(&path) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            debug!("'{name}' is considered for removal");
            candidates.push(LocalEntry { path, name });
        }
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(candidates)
    }

    /// Deletes local files the remote side no longer accounts for.
    ///
    /// `confirm` is called exactly once, with the complete candidate list,
    /// and only when that list is non-empty. Nothing is deleted unless it
    /// returns true. Individual deletion failures are collected in the report
    /// and do not stop the remaining deletions.
    pub async fn reconcile<F>(
        destination: &Path,
        ownership: &OwnershipSet,
        confirm: F,
    ) -> Result<RemovalReport, RemovalError>
    where
        F: FnOnce(&[LocalEntry]) -> bool,
    {
        let candidates = Self::candidates(destination, ownership).await?;
        if candidates.is_empty() {
            info!("no local files are missing from the remote library");
            return Ok(RemovalReport::untouched(
                RemovalOutcome::NothingToDo,
                candidates,
            ));
        }

        if !confirm(&candidates) {
            info!("Abort removal of missing photos");
            return Ok(RemovalReport::untouched(RemovalOutcome::Aborted, candidates));
        }

        let mut removed = 0;
        let mut failures = Vec::new();
        for entry in &candidates {
            match tokio::fs::remove_file(&entry.path).await {
                Ok(()) => {
                    debug!("removed '{}'", entry.name);
                    removed += 1;
                }
                Err(error) => {
                    warn!("failed to remove '{}': {error}", entry.name);
                    failures.push(DeletionFailure {
                        entry: entry.clone(),
                        error,
                    });
                }
            }
        }

        Ok(RemovalReport {
            outcome: RemovalOutcome::Removed,
            candidates,
            removed,
            failures,
        })
    }
}
