//! # Record Module
//!
//! The unit of work flowing through the pipeline.
//!
//! A [`FileRecord`] is created by discovery, enriched by the load,
//! fingerprint, metadata and destination stages, and consumed by the
//! relocation engine. Any stage failure wraps the record into a
//! [`FailedRecord`], which is terminal.

use crate::error::RecordError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// Tag name to printable tag value, as produced by a metadata provider.
pub type TagMap = BTreeMap<String, String>;

/// Fixed-length content digest (SHA-256).
pub type ContentDigest = [u8; 32];

/// Working state for one candidate file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileRecord {
    /// Where the file was discovered. Never changes.
    source_path: PathBuf,
    /// File bytes, only held between loading and destination resolution.
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
    pub content_digest: Option<ContentDigest>,
    pub encoded_digest: Option<String>,
    pub capture_date: Option<NaiveDateTime>,
    pub metadata: TagMap,
    /// Empty until resolved; may be rewritten once more by collision resolution.
    pub destination_path: PathBuf,
    pub completed: bool,
}

impl FileRecord {
    /// Create a freshly discovered record.
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Default::default()
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// True once the destination resolver has run.
    pub fn has_destination(&self) -> bool {
        !self.destination_path.as_os_str().is_empty()
    }

    /// Drop the file bytes to bound memory once they are no longer needed.
    pub fn clear_content(&mut self) -> &mut Self {
        self.content = None;
        self
    }

    /// Fill unset fields of `self` from `other`.
    ///
    /// Rules, field by field:
    /// - `source_path`: never changes
    /// - `content`, `content_digest`, `encoded_digest`, `capture_date`: taken
    ///   from `other` only when unset here
    /// - `metadata`: entries missing here are inserted
    /// - `destination_path`: taken only when empty here
    /// - `completed`: OR-ed
    pub fn merge_from(&mut self, other: FileRecord) {
        if self.content.is_none() {
            self.content = other.content;
        }
        if self.content_digest.is_none() {
            self.content_digest = other.content_digest;
        }
        if self.encoded_digest.is_none() {
            self.encoded_digest = other.encoded_digest;
        }
        if self.capture_date.is_none() {
            self.capture_date = other.capture_date;
        }
        for (tag, value) in other.metadata {
            self.metadata.entry(tag).or_insert(value);
        }
        if !self.has_destination() {
            self.destination_path = other.destination_path;
        }
        self.completed |= other.completed;
    }

    /// Wrap this record with the failure that removed it from the success path.
    pub fn fail(self, cause: RecordError) -> FailedRecord {
        FailedRecord {
            record: self,
            cause,
        }
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File Record:")?;
        writeln!(f, "   Path: {}", self.source_path.display())?;
        writeln!(f, "   Digest: {}", self.encoded_digest.as_deref().unwrap_or("-"))?;
        write!(f, "   Target Path: {}", self.destination_path.display())
    }
}

/// The identity used for duplicate detection: the content digest.
pub fn content_key(record: &FileRecord) -> Option<&ContentDigest> {
    record.content_digest.as_ref()
}

/// Compare two records by content.
///
/// Records are duplicates when their digests are equal, regardless of path,
/// name or metadata. Records without a digest are never duplicates.
pub fn same_content(a: &FileRecord, b: &FileRecord) -> bool {
    match (content_key(a), content_key(b)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Group items sharing the identity returned by `key`, keeping only groups
/// with more than one member. Items for which `key` is `None` are never
/// grouped.
///
/// Groups are returned in order of their first member; members keep their
/// input order.
pub fn group_duplicates<'a, T, K, F>(items: &'a [T], key: F) -> Vec<Vec<&'a T>>
where
    K: Eq + Hash + 'a,
    F: Fn(&'a T) -> Option<K>,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<&T>> = Vec::new();

    for item in items {
        let Some(identity) = key(item) else {
            continue;
        };
        match index.get(&identity) {
            Some(&position) => groups[position].push(item),
            None => {
                index.insert(identity, groups.len());
                groups.push(vec![item]);
            }
        }
    }

    groups.retain(|group| group.len() > 1);
    groups
}

/// A record permanently removed from the success path.
#[derive(Debug)]
pub struct FailedRecord {
    pub record: FileRecord,
    pub cause: RecordError,
}

impl FailedRecord {
    pub fn source_path(&self) -> &Path {
        self.record.source_path()
    }
}

impl fmt::Display for FailedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.record.source_path.display(), self.cause)
    }
}

/// Outcome of a record after the pipeline has finished with it.
pub type RecordOutcome = std::result::Result<FileRecord, FailedRecord>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record_with_digest(path: &str, digest: u8) -> FileRecord {
        let mut record = FileRecord::new(path);
        record.content_digest = Some([digest; 32]);
        record
    }

    #[test]
    fn new_record_is_unresolved() {
        let record = FileRecord::new("photos/IMG_0001.JPG");
        assert_eq!(record.source_path(), Path::new("photos/IMG_0001.JPG"));
        assert!(!record.has_destination());
        assert!(!record.completed);
    }

    #[test]
    fn equal_digests_are_duplicates_regardless_of_path() {
        let mut a = record_with_digest("a/IMG_1.JPG", 7);
        let mut b = record_with_digest("b/renamed.jpg", 7);
        a.capture_date = NaiveDate::from_ymd_opt(2015, 5, 4).and_then(|d| d.and_hms_opt(0, 0, 0));
        b.capture_date = NaiveDate::from_ymd_opt(2019, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0));

        assert!(same_content(&a, &b));
    }

    #[test]
    fn missing_digest_is_never_a_duplicate() {
        let a = FileRecord::new("a.jpg");
        let b = FileRecord::new("a.jpg");
        assert!(!same_content(&a, &b));
    }

    #[test]
    fn group_duplicates_keeps_only_multi_member_groups() {
        let records = vec![
            record_with_digest("one.jpg", 1),
            record_with_digest("two.jpg", 2),
            record_with_digest("copy-of-one.jpg", 1),
        ];

        let groups = group_duplicates(&records, content_key);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][0].source_path(), Path::new("one.jpg"));
        assert_eq!(groups[0][1].source_path(), Path::new("copy-of-one.jpg"));
        assert!(same_content(groups[0][0], groups[0][1]));
    }

    #[test]
    fn records_without_digest_are_not_grouped() {
        let records = vec![FileRecord::new("a.jpg"), FileRecord::new("a.jpg")];
        assert!(group_duplicates(&records, content_key).is_empty());
    }

    #[test]
    fn merge_only_fills_unset_fields() {
        let mut target = FileRecord::new("a.jpg");
        target.encoded_digest = Some("kept".to_string());
        target.metadata.insert("Image DateTime".into(), "mine".into());

        let mut other = FileRecord::new("elsewhere.jpg");
        other.encoded_digest = Some("ignored".to_string());
        other.content_digest = Some([3; 32]);
        other.metadata.insert("Image DateTime".into(), "theirs".into());
        other.metadata.insert("EXIF DateTimeOriginal".into(), "added".into());
        other.destination_path = PathBuf::from("2015/05/a.jpg");
        other.completed = true;

        target.merge_from(other);

        assert_eq!(target.source_path(), Path::new("a.jpg"));
        assert_eq!(target.encoded_digest.as_deref(), Some("kept"));
        assert_eq!(target.content_digest, Some([3; 32]));
        assert_eq!(target.metadata["Image DateTime"], "mine");
        assert_eq!(target.metadata["EXIF DateTimeOriginal"], "added");
        assert_eq!(target.destination_path, PathBuf::from("2015/05/a.jpg"));
        assert!(target.completed);
    }

    #[test]
    fn merge_does_not_overwrite_resolved_destination() {
        let mut target = FileRecord::new("a.jpg");
        target.destination_path = PathBuf::from("2015/05/a(1).jpg");

        let mut other = FileRecord::new("a.jpg");
        other.destination_path = PathBuf::from("2015/05/a.jpg");
        target.merge_from(other);

        assert_eq!(target.destination_path, PathBuf::from("2015/05/a(1).jpg"));
    }

    #[test]
    fn failed_record_display_names_path_and_cause() {
        let failed = FileRecord::new("inbox/IMG_9.JPG").fail(RecordError::MissingDate {
            path: PathBuf::from("inbox/IMG_9.JPG"),
        });
        let message = failed.to_string();
        assert!(message.starts_with("inbox/IMG_9.JPG:"));
        assert!(message.contains("No capture date"));
    }
}
