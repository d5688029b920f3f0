//! # Destination Module
//!
//! Computes where a record belongs in the organised tree.
//!
//! ## Layout
//! ```text
//! <root>/<YYYY>/<MM>/<file name>
//! <root>/<YYYY>/<MM>/<YYYY>.<MM> <album label>/<file name>
//! ```
//!
//! ## Policy
//! 1. If the file's parent directory is named like a dated album
//!    (`2015.05.03 Curry with Mates`, `2015-05`, `2015_5_3 Party`), its year
//!    and month are trusted over the capture date.
//! 2. Otherwise the capture date's year and month are used.
//! 3. A non-empty album label from step 1 becomes an extra
//!    `<YYYY>.<MM> <label>` directory, preserved verbatim.
//!
//! The file name is never changed. The layout this produces is itself
//! re-detected by step 1, so resolving an already-organised file gives the
//! same path again.

use crate::core::record::{FileRecord, RecordOutcome};
use crate::error::RecordError;
use chrono::Datelike;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn album_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<year>\d{4})[._-](?P<month>\d{1,2})(?:[._-](?P<day>\d{1,2}))?(?:[\s._-]*(?P<album>.*))?$",
        )
        .expect("album directory pattern is valid")
    })
}

/// A directory name carrying a year, a month and optionally an album label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumDirectory {
    pub year: i32,
    pub month: u32,
    pub label: Option<String>,
}

impl AlbumDirectory {
    /// Parse a single directory name. Returns `None` unless both year and
    /// month parse and the month is 1-12.
    pub fn parse(name: &str) -> Option<Self> {
        let captures = album_pattern().captures(name)?;

        let year: i32 = captures.name("year")?.as_str().parse().ok()?;
        let month: u32 = captures.name("month")?.as_str().parse().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }

        let label = captures
            .name("album")
            .map(|m| m.as_str().trim())
            .filter(|label| !label.is_empty())
            .map(str::to_string);

        Some(Self { year, month, label })
    }

    /// Parse the directory immediately containing `path`.
    pub fn from_parent_of(path: &Path) -> Option<Self> {
        let parent = path.parent()?.file_name()?.to_str()?;
        Self::parse(parent)
    }

    /// The album directory name, `"<YYYY>.<MM> <label>"`, if there is a label.
    pub fn album_dir_name(&self) -> Option<String> {
        self.label
            .as_ref()
            .map(|label| format!("{:04}.{:02} {}", self.year, self.month, label))
    }
}

/// Compute the destination for `source` under `root`.
///
/// `capture_date` is only consulted when the parent directory does not
/// carry a year and month; it is still required.
pub fn destination_for(
    root: &Path,
    source: &Path,
    capture_date: Option<chrono::NaiveDateTime>,
) -> Result<PathBuf, RecordError> {
    let capture_date = capture_date.ok_or_else(|| RecordError::MissingDate {
        path: source.to_path_buf(),
    })?;

    let file_name = source
        .file_name()
        .ok_or_else(|| RecordError::TargetResolution {
            path: source.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?;

    let album = AlbumDirectory::from_parent_of(source);
    let (year, month) = match &album {
        Some(album) => (album.year, album.month),
        None => (capture_date.year(), capture_date.month()),
    };

    let mut target = root
        .join(format!("{:04}", year))
        .join(format!("{:02}", month));

    if let Some(album_dir) = album.as_ref().and_then(AlbumDirectory::album_dir_name) {
        target.push(album_dir);
    }

    target.push(file_name);
    Ok(target)
}

/// Destination stage: set `destination_path` and drop the loaded content.
///
/// Fails with [`RecordError::MissingDate`] if the record has no capture date.
pub fn resolve_destination(root: &Path, mut record: FileRecord) -> RecordOutcome {
    match destination_for(root, record.source_path(), record.capture_date) {
        Ok(destination) => {
            tracing::debug!(
                source = %record.source_path().display(),
                destination = %destination.display(),
                "resolved destination"
            );
            record.destination_path = destination;
            record.clear_content();
            Ok(record)
        }
        Err(cause) => {
            record.clear_content();
            Err(record.fail(cause))
        }
    }
}
