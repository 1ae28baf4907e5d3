use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::paths::{PathError, target_path_for};
use crate::remote::RemoteItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    SkipExisting,
    DownloadNew,
    OverwriteExisting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub target: PathBuf,
    pub action: ItemAction,
}

/// Decides what to do with one remote item given what is on disk. Reads
/// filesystem metadata only.
pub fn classify(
    destination: &Path,
    item: &RemoteItem,
    overwrite: bool,
) -> Result<Classification, PathError> {
    let target = target_path_for(destination, &item.name)?;
    let action = match fs::metadata(&target) {
        Ok(meta) if meta.is_file() => {
            if overwrite {
                ItemAction::OverwriteExisting
            } else {
                ItemAction::SkipExisting
            }
        }
        Ok(_) => return Err(PathError::NotAFile(target)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => ItemAction::DownloadNew,
        Err(source) => {
            return Err(PathError::Inspect {
                path: target,
                source,
            });
        }
    };
    Ok(Classification { target, action })
}
