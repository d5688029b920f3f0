//! Metadata providers.
//!
//! A provider turns raw file bytes into a [`TagMap`]. The pipeline only
//! needs printable tag values; how they are decoded is up to the provider.

use crate::core::record::TagMap;
use exif::{Context, In, Reader, Tag};
use std::collections::HashMap;
use std::io::Cursor;

/// Extracts named tags from file contents.
pub trait MetadataProvider: Send + Sync {
    /// Read every tag the provider understands. Bytes without a metadata
    /// block yield an empty map; only malformed metadata is an error.
    fn extract_tags(&self, bytes: &[u8]) -> Result<TagMap, String>;
}

/// EXIF tags via kamadak-exif.
///
/// Tags are named `"<group> <TagName>"`, e.g. `Image DateTime` or
/// `EXIF DateTimeOriginal`. Maker notes and thumbnail entries are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifProvider;

impl ExifProvider {
    pub fn new() -> Self {
        Self
    }

    fn tag_name(tag: Tag, ifd: In) -> Option<String> {
        if ifd != In::PRIMARY || tag == Tag::MakerNote {
            return None;
        }

        let group = match tag.context() {
            Context::Tiff => "Image",
            Context::Exif => "EXIF",
            Context::Gps => "GPS",
            Context::Interop => "Interoperability",
            _ => "Unknown",
        };
        Some(format!("{} {}", group, tag))
    }
}

impl MetadataProvider for ExifProvider {
    fn extract_tags(&self, bytes: &[u8]) -> Result<TagMap, String> {
        let mut cursor = Cursor::new(bytes);
        let exif = match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif,
            Err(exif::Error::NotFound(_)) => return Ok(TagMap::new()),
            Err(e) => return Err(e.to_string()),
        };

        Ok(exif
            .fields()
            .filter_map(|field| {
                Self::tag_name(field.tag, field.ifd_num)
                    .map(|name| (name, field.display_value().to_string()))
            })
            .collect())
    }
}

/// Fixed tags keyed by exact file contents.
///
/// Lets callers drive the metadata stage without real EXIF payloads.
#[derive(Debug, Clone, Default)]
pub struct StaticTags {
    by_content: HashMap<Vec<u8>, TagMap>,
}

impl StaticTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `tags` for any file whose contents equal `content`.
    pub fn with<I, K, V>(mut self, content: impl Into<Vec<u8>>, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let tags = tags.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.by_content.insert(content.into(), tags);
        self
    }
}

impl MetadataProvider for StaticTags {
    fn extract_tags(&self, bytes: &[u8]) -> Result<TagMap, String> {
        Ok(self.by_content.get(bytes).cloned().unwrap_or_default())
    }
}
