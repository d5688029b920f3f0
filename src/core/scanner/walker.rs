//! Directory walking implementation using walkdir.

use super::filter::{is_hidden, FileFilter};
use super::FileSource;
use crate::core::record::FileRecord;
use crate::error::DiscoveryError;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Discovers files by walking a base directory.
#[derive(Debug, Clone)]
pub struct WalkDirDiscovery {
    root: PathBuf,
    filter: FileFilter,
    follow_symlinks: bool,
}

impl WalkDirDiscovery {
    pub fn new(root: impl Into<PathBuf>, filter: FileFilter) -> Self {
        Self {
            root: root.into(),
            filter,
            follow_symlinks: false,
        }
    }

    /// Whether to follow symbolic links
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_root(&self) -> Result<(), DiscoveryError> {
        if !self.root.exists() {
            return Err(DiscoveryError::DirectoryNotFound {
                path: self.root.clone(),
            });
        }
        if !self.root.is_dir() {
            return Err(DiscoveryError::NotADirectory {
                path: self.root.clone(),
            });
        }
        Ok(())
    }

    /// Lazily yield every matching file beneath the root.
    pub fn iter(&self) -> Result<impl Iterator<Item = FileRecord> + '_, DiscoveryError> {
        self.check_root()?;

        let include_hidden = self.filter.include_hidden();
        let root = self.root.as_path();
        let walker = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                // Skip hidden directories unless configured otherwise
                include_hidden || entry.path() == root || !entry_is_hidden(entry)
            });

        Ok(walker.filter_map(move |entry| match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && self.filter.should_include(entry.path()) {
                    tracing::trace!(path = %entry.path().display(), "discovered");
                    Some(FileRecord::new(entry.into_path()))
                } else {
                    None
                }
            }
            Err(e) => {
                let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                tracing::warn!(path = %path, error = %e, "skipping unreadable entry");
                None
            }
        }))
    }
}

impl FileSource for WalkDirDiscovery {
    fn files(&self) -> Result<Box<dyn Iterator<Item = FileRecord> + Send + '_>, DiscoveryError> {
        Ok(Box::new(self.iter()?))
    }
}

fn entry_is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().map(is_hidden).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(&path).unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        path
    }

    fn discover(root: &Path, filter: FileFilter) -> Vec<PathBuf> {
        WalkDirDiscovery::new(root, filter)
            .iter()
            .unwrap()
            .map(|r| r.source_path().to_path_buf())
            .collect()
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(discover(temp_dir.path(), FileFilter::default()).is_empty());
    }

    #[test]
    fn finds_matching_files_in_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "root.jpg");
        create_file(temp_dir.path(), "2015.05.03 Curry/IMG_4228.JPG");
        create_file(temp_dir.path(), "notes.txt");

        let found = discover(temp_dir.path(), FileFilter::default());

        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|p| p.ends_with("2015.05.03 Curry/IMG_4228.JPG")));
        assert!(found.iter().any(|p| p.ends_with("root.jpg")));
    }

    #[test]
    fn filter_selects_file_types() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["one.py", "two.py", "three.py", "one.jpg"] {
            create_file(temp_dir.path(), name);
        }

        let jpgs = discover(temp_dir.path(), FileFilter::new(r".*\.jpg").unwrap());
        assert_eq!(jpgs.len(), 1);
        assert!(jpgs[0].ends_with("one.jpg"));

        let none = discover(temp_dir.path(), FileFilter::new(r".*\.NONE").unwrap());
        assert!(none.is_empty());

        let all = discover(temp_dir.path(), FileFilter::new("").unwrap());
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn hidden_directories_are_skipped_by_default() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "visible.jpg");
        create_file(temp_dir.path(), ".thumbnails/cached.jpg");

        assert_eq!(discover(temp_dir.path(), FileFilter::default()).len(), 1);
        assert_eq!(
            discover(temp_dir.path(), FileFilter::default().with_hidden(true)).len(),
            2
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_followed_only_when_asked() {
        let temp_dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        create_file(outside.path(), "IMG_0001.JPG");
        std::os::unix::fs::symlink(outside.path(), temp_dir.path().join("linked")).unwrap();

        let count = |follow: bool| {
            WalkDirDiscovery::new(temp_dir.path(), FileFilter::default())
                .follow_symlinks(follow)
                .iter()
                .unwrap()
                .count()
        };

        assert_eq!(count(false), 0);
        assert_eq!(count(true), 1);
    }

    #[test]
    fn missing_root_is_fatal() {
        let discovery = WalkDirDiscovery::new("/nonexistent/path/12345", FileFilter::default());
        assert!(matches!(
            discovery.iter().err(),
            Some(DiscoveryError::DirectoryNotFound { .. })
        ));
    }

    #[test]
    fn file_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let file = create_file(temp_dir.path(), "photo.jpg");
        let discovery = WalkDirDiscovery::new(file, FileFilter::default());
        assert!(matches!(
            discovery.files().err(),
            Some(DiscoveryError::NotADirectory { .. })
        ));
    }
}
