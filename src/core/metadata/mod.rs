//! # Metadata Module
//!
//! Extracts embedded tags and reconciles them into a single capture date.
//!
//! ## Date Tags
//! Read in this order (reading priority only, not tie-break):
//! - `EXIF DateTimeDigitized`
//! - `EXIF DateTimeOriginal`
//! - `Image DateTime`
//!
//! Every value that parses is a candidate; the **earliest** candidate wins.
//! Unparseable values are logged and discarded.
//!
//! ## Fallback
//! With [`DateFallback::FileModified`], a record without any parseable tag
//! gets the source file's modification time instead. The default,
//! [`DateFallback::None`], leaves the date unset and the destination
//! resolver rejects the record.

mod provider;

pub use provider::{ExifProvider, MetadataProvider, StaticTags};

use crate::core::record::{FileRecord, TagMap};
use crate::error::RecordError;
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;

/// Date-bearing tags, in reading order.
pub const DATE_TAGS: [&str; 3] = [
    "EXIF DateTimeDigitized",
    "EXIF DateTimeOriginal",
    "Image DateTime",
];

/// What to do when no embedded date can be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFallback {
    /// Leave the capture date unset
    #[default]
    None,
    /// Use the file's last modification time
    FileModified,
}

/// Parse an EXIF-style timestamp.
///
/// Accepts the raw EXIF form `"2024:01:15 14:30:00"` and the display form
/// `"2024-01-15 14:30:00"`, optionally wrapped in quotes.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_matches('"').trim_end_matches('\0').trim();

    ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Reconcile the date tags in `tags` into one capture date.
///
/// Zero parseable candidates gives `None`, one gives that candidate, several
/// give the earliest.
pub fn reconcile_capture_date(tags: &TagMap) -> Option<NaiveDateTime> {
    DATE_TAGS
        .iter()
        .filter_map(|tag| {
            let raw = tags.get(*tag)?;
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                tracing::warn!(tag, value = %raw, "discarding unparseable timestamp");
            }
            parsed
        })
        .min()
}

/// Metadata stage: populate `metadata` and `capture_date`.
///
/// Never fails the record. A provider error is logged and treated as an
/// empty tag map; a missing date is left for the destination resolver to
/// reject.
pub fn enrich_metadata(
    mut record: FileRecord,
    provider: &dyn MetadataProvider,
    fallback: DateFallback,
) -> FileRecord {
    if record.metadata.is_empty() {
        if let Some(content) = record.content.as_deref() {
            match provider.extract_tags(content) {
                Ok(tags) => record.metadata = tags,
                Err(reason) => {
                    let error = RecordError::Metadata {
                        path: record.source_path().to_path_buf(),
                        reason,
                    };
                    tracing::warn!(%error, "treating file as untagged");
                }
            }
        }
    }

    if record.capture_date.is_none() {
        record.capture_date = reconcile_capture_date(&record.metadata);
    }

    if record.capture_date.is_none() && fallback == DateFallback::FileModified {
        record.capture_date = file_modified_date(&record);
        if record.capture_date.is_some() {
            tracing::info!(path = %record.source_path().display(), "no embedded date, using modification time");
        }
    }

    record
}

fn file_modified_date(record: &FileRecord) -> Option<NaiveDateTime> {
    let modified = fs::metadata(record.source_path()).ok()?.modified().ok()?;
    let datetime: DateTime<Local> = modified.into();
    Some(datetime.naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn datetime(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    fn tags(entries: &[(&str, &str)]) -> TagMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_raw_and_display_forms() {
        assert_eq!(parse_timestamp("2024:01:15 14:00:00"), Some(datetime(2024, 1, 15, 14)));
        assert_eq!(parse_timestamp("2024-01-15 14:00:00"), Some(datetime(2024, 1, 15, 14)));
        assert_eq!(parse_timestamp("\"2024:01:15 14:00:00\""), Some(datetime(2024, 1, 15, 14)));
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert_eq!(parse_timestamp("0000:00:00 00:00:00"), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn no_date_tags_gives_no_date() {
        assert_eq!(reconcile_capture_date(&tags(&[("Image Make", "Canon")])), None);
    }

    #[test]
    fn single_date_tag_is_used() {
        let found = reconcile_capture_date(&tags(&[("Image DateTime", "2015:05:04 10:00:00")]));
        assert_eq!(found, Some(datetime(2015, 5, 4, 10)));
    }

    #[test]
    fn earliest_of_several_dates_wins() {
        let found = reconcile_capture_date(&tags(&[
            ("EXIF DateTimeDigitized", "2015:05:06 10:00:00"),
            ("EXIF DateTimeOriginal", "2015:05:04 10:00:00"),
            ("Image DateTime", "2016:01:01 10:00:00"),
        ]));
        assert_eq!(found, Some(datetime(2015, 5, 4, 10)));
    }

    #[test]
    fn unparseable_dates_are_discarded_not_fatal() {
        let found = reconcile_capture_date(&tags(&[
            ("EXIF DateTimeDigitized", "    :  :     :  :  "),
            ("Image DateTime", "2015:05:04 10:00:00"),
        ]));
        assert_eq!(found, Some(datetime(2015, 5, 4, 10)));
    }

    #[test]
    fn enrich_populates_metadata_and_date() {
        let provider = StaticTags::new().with(
            b"photo".to_vec(),
            [("EXIF DateTimeOriginal", "2015:05:04 10:00:00")],
        );
        let mut record = FileRecord::new("IMG_4228.JPG");
        record.content = Some(b"photo".to_vec());

        let record = enrich_metadata(record, &provider, DateFallback::None);

        assert_eq!(record.metadata.len(), 1);
        assert_eq!(record.capture_date, Some(datetime(2015, 5, 4, 10)));
    }

    #[test]
    fn enrich_keeps_an_existing_date() {
        let provider = StaticTags::new().with(
            b"photo".to_vec(),
            [("EXIF DateTimeOriginal", "2015:05:04 10:00:00")],
        );
        let mut record = FileRecord::new("IMG_4228.JPG");
        record.content = Some(b"photo".to_vec());
        record.capture_date = Some(datetime(2001, 1, 1, 0));

        let record = enrich_metadata(record, &provider, DateFallback::None);

        assert_eq!(record.capture_date, Some(datetime(2001, 1, 1, 0)));
    }

    #[test]
    fn missing_date_stays_unset_without_fallback() {
        let mut record = FileRecord::new("IMG_0001.JPG");
        record.content = Some(b"no tags".to_vec());

        let record = enrich_metadata(record, &StaticTags::new(), DateFallback::None);

        assert!(record.capture_date.is_none());
    }

    #[test]
    fn modification_time_fallback_is_opt_in() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("IMG_0001.JPG");
        fs::write(&path, b"no tags").unwrap();
        let mut record = FileRecord::new(&path);
        record.content = Some(b"no tags".to_vec());

        let record = enrich_metadata(record, &StaticTags::new(), DateFallback::FileModified);

        assert!(record.capture_date.is_some());
    }
}
