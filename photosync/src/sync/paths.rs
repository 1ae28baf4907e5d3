use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("remote name is empty")]
    Empty,
    #[error("remote name contains unsupported component: {0}")]
    UnsupportedComponent(String),
    #[error("target exists but is not a regular file: {0}")]
    NotAFile(PathBuf),
    #[error("failed to inspect {path}: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Maps a remote item name under `destination`. Names are joined component by
/// component; anything that could escape the destination is rejected.
pub fn target_path_for(destination: &Path, name: &str) -> Result<PathBuf, PathError> {
    let mut out = destination.to_path_buf();
    let mut pushed = false;
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                pushed = true;
            }
            Component::CurDir => continue,
            Component::RootDir | Component::ParentDir | Component::Prefix(_) => {
                return Err(PathError::UnsupportedComponent(name.to_string()));
            }
        }
    }
    if !pushed {
        return Err(PathError::Empty);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_plain_name() {
        let root = PathBuf::from("/photos");
        let mapped = target_path_for(&root, "IMG_0001.JPG").unwrap();
        assert_eq!(mapped, PathBuf::from("/photos/IMG_0001.JPG"));
    }

    #[test]
    fn keeps_nested_segments_inside_destination() {
        let root = PathBuf::from("/photos");
        let mapped = target_path_for(&root, "./2024/IMG_0001.JPG").unwrap();
        assert_eq!(mapped, PathBuf::from("/photos/2024/IMG_0001.JPG"));
    }

    #[test]
    fn rejects_parent_dir() {
        let root = PathBuf::from("/photos");
        assert!(matches!(
            target_path_for(&root, "../secret.jpg"),
            Err(PathError::UnsupportedComponent(_))
        ));
    }

    #[test]
    fn rejects_absolute_names() {
        let root = PathBuf::from("/photos");
        assert!(matches!(
            target_path_for(&root, "/etc/passwd"),
            Err(PathError::UnsupportedComponent(_))
        ));
    }

    #[test]
    fn rejects_empty_names() {
        let root = PathBuf::from("/photos");
        assert!(matches!(target_path_for(&root, ""), Err(PathError::Empty)));
        assert!(matches!(target_path_for(&root, "."), Err(PathError::Empty)));
    }
}
