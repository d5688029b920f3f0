//! Collision-free destination claims.

use crate::core::cleanup::prune_empty_ancestors;
use crate::error::RecordError;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock};

fn counter_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<base>.*)\((?P<rep>\d+)\)$").expect("counter suffix pattern is valid")
    })
}

/// The next collision candidate for `path`.
///
/// `name.ext` becomes `name(1).ext`, `name(1).ext` becomes `name(2).ext`.
/// Names without an extension get the suffix at the end.
pub fn next_candidate(path: &Path) -> Result<PathBuf, RecordError> {
    let unresolvable = |reason: &str| RecordError::TargetResolution {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| unresolvable("file name is missing or not valid UTF-8"))?;
    let extension = match path.extension() {
        Some(ext) => Some(
            ext.to_str()
                .ok_or_else(|| unresolvable("extension is not valid UTF-8"))?,
        ),
        None => None,
    };

    let (base, counter) = match counter_suffix().captures(stem) {
        Some(captures) => {
            let base = captures.name("base").map(|m| m.as_str()).unwrap_or_default();
            let current: u64 = captures
                .name("rep")
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| unresolvable("collision counter does not fit in 64 bits"))?;
            let next = current
                .checked_add(1)
                .ok_or_else(|| unresolvable("collision counter overflowed"))?;
            (base, next)
        }
        None => (stem, 1),
    };

    let file_name = match extension {
        Some(ext) => format!("{}({}).{}", base, counter, ext),
        None => format!("{}({})", base, counter),
    };
    let candidate = path.with_file_name(file_name);

    if candidate == path {
        return Err(unresolvable("collision candidate did not change"));
    }

    Ok(candidate)
}

/// Destinations claimed during one run.
///
/// Finding a free name and recording it happen under one lock, so two
/// workers can never settle on the same destination. Directory creation
/// and pruning take the same lock, so a directory cannot be pruned between
/// being created for a claim and receiving its file.
///
/// Claims are keyed by canonical parent directory plus file name, so one
/// file reached through a relative and an absolute path is one claim.
#[derive(Debug, Default)]
pub struct DestinationClaims {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl DestinationClaims {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // A panicking worker cannot leave the set half-updated.
        self.claimed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create the parent directory of `desired`, then claim the first
    /// candidate that neither exists on disk nor was claimed earlier.
    pub fn claim(&self, desired: &Path) -> Result<PathBuf, RecordError> {
        let mut claimed = self.lock();

        if let Some(parent) = desired.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| RecordError::DirectoryCreation {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let mut candidate = desired.to_path_buf();
        while claimed.contains(&claim_key(&candidate)) || occupied(&candidate) {
            tracing::debug!(path = %candidate.display(), "destination taken, trying next name");
            candidate = next_candidate(&candidate)?;
        }

        claimed.insert(claim_key(&candidate));
        Ok(candidate)
    }

    /// Give a claim back after a failed relocation.
    pub fn release(&self, path: &Path) {
        self.lock().remove(&claim_key(path));
    }

    pub fn is_claimed(&self, path: &Path) -> bool {
        self.lock().contains(&claim_key(path))
    }

    /// Prune empty ancestors of `start`, sparing any directory that holds a
    /// claimed destination.
    pub fn prune_empty_ancestors(
        &self,
        start: &Path,
        boundary: Option<&Path>,
    ) -> Result<Vec<PathBuf>, RecordError> {
        let claimed = self.lock();
        prune_empty_ancestors(start, boundary, |dir| {
            let dir = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
            claimed.iter().any(|claim| claim.starts_with(&dir))
        })
    }
}

fn claim_key(path: &Path) -> PathBuf {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    fs::canonicalize(parent)
        .map(|parent| parent.join(name))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn occupied(path: &Path) -> bool {
    // symlink_metadata so that a dangling link still counts as taken.
    fs::symlink_metadata(path).is_ok()
}
