//! Filename filtering for discovery.

use crate::error::DiscoveryError;
use regex::Regex;
use std::path::Path;

/// Default filter: `.jpg` / `.jpeg` in any letter case.
pub const DEFAULT_FILENAME_FILTER: &str = r"(?i)\.jpe?g$";

/// Decides whether a discovered file is a candidate.
#[derive(Debug, Clone)]
pub struct FileFilter {
    /// `None` matches no file at all.
    pattern: Option<Regex>,
    include_hidden: bool,
}

impl FileFilter {
    /// Compile a filter from a regular expression searched within file names.
    pub fn new(pattern: &str) -> Result<Self, DiscoveryError> {
        let pattern = Regex::new(pattern).map_err(|e| DiscoveryError::InvalidFilter {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            pattern: Some(pattern),
            include_hidden: false,
        })
    }

    /// Compile `pattern`, or log why it cannot compile and match nothing.
    pub fn new_or_empty(pattern: &str) -> Self {
        Self::new(pattern).unwrap_or_else(|error| {
            tracing::warn!(%error, "filename filter matches nothing, no files will be discovered");
            Self {
                pattern: None,
                include_hidden: false,
            }
        })
    }

    /// Include hidden files and directories (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn include_hidden(&self) -> bool {
        self.include_hidden
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        if !self.include_hidden && is_hidden(name) {
            return false;
        }

        self.pattern.as_ref().is_some_and(|pattern| pattern.is_match(name))
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            pattern: Some(
                Regex::new(DEFAULT_FILENAME_FILTER).expect("default filter is a valid regex"),
            ),
            include_hidden: false,
        }
    }
}

pub(crate) fn is_hidden(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}
