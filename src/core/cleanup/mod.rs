//! # Cleanup Module
//!
//! Prunes directories left empty after a file has been moved out of them.
//!
//! Starting from the moved file's original directory, each ancestor is
//! removed if and only if it is empty. The walk stops, successfully, at the
//! first non-empty directory, at the filesystem root, or at the optional
//! boundary directory (which is never removed).

use crate::error::RecordError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Remove `start` and its ancestors while they are empty.
///
/// `is_protected` lets the caller veto removal of a directory that is about
/// to receive a file; a protected directory ends the walk like a non-empty
/// one. Returns the removed directories, innermost first.
pub fn prune_empty_ancestors<F>(
    start: &Path,
    boundary: Option<&Path>,
    is_protected: F,
) -> Result<Vec<PathBuf>, RecordError>
where
    F: Fn(&Path) -> bool,
{
    let mut removed = Vec::new();
    let mut current = Some(start);

    while let Some(dir) = current {
        // Filesystem root, or the end of a relative path.
        if dir.as_os_str().is_empty() || dir.parent().is_none() {
            break;
        }

        if let Some(boundary) = boundary {
            if dir == boundary || !dir.starts_with(boundary) {
                break;
            }
        }

        if is_protected(dir) {
            break;
        }

        match is_empty_dir(dir) {
            Ok(true) => {}
            Ok(false) => break,
            // Already gone, e.g. pruned while handling a sibling file.
            Err(e) if e.kind() == ErrorKind::NotFound => {
                current = dir.parent();
                continue;
            }
            Err(source) => {
                return Err(RecordError::Cleanup {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        }

        match fs::remove_dir(dir) {
            Ok(()) => {
                tracing::debug!(path = %dir.display(), "removed empty directory");
                removed.push(dir.to_path_buf());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(RecordError::Cleanup {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        }

        current = dir.parent();
    }

    Ok(removed)
}

fn is_empty_dir(dir: &Path) -> std::io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}
