//! # Loader Module
//!
//! Reads file bytes into a record.

use crate::core::record::{FileRecord, RecordOutcome};
use crate::error::RecordError;
use std::fs;

/// Read the record's source file into memory.
///
/// Fails with [`RecordError::Read`] when the file cannot be read; the
/// failure is isolated to this record.
pub fn load_content(mut record: FileRecord) -> RecordOutcome {
    match fs::read(record.source_path()) {
        Ok(bytes) => {
            tracing::debug!(path = %record.source_path().display(), bytes = bytes.len(), "loaded");
            record.content = Some(bytes);
            Ok(record)
        }
        Err(source) => {
            tracing::warn!(path = %record.source_path().display(), error = %source, "failed to read content");
            let path = record.source_path().to_path_buf();
            Err(record.fail(RecordError::Read { path, source }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_file_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("photo.jpg");
        fs::write(&path, b"jpeg bytes").unwrap();

        let record = load_content(FileRecord::new(&path)).unwrap();

        assert_eq!(record.content.as_deref(), Some(&b"jpeg bytes"[..]));
    }

    #[test]
    fn missing_file_becomes_read_failure() {
        let failed = load_content(FileRecord::new("/nonexistent/photo.jpg")).unwrap_err();

        assert!(matches!(failed.cause, RecordError::Read { .. }));
        assert_eq!(failed.source_path(), std::path::Path::new("/nonexistent/photo.jpg"));
    }
}
