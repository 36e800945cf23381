//! Merge ordering configuration
//!
//! A sectioned text file controls the merge beyond what the dependency
//! declarations express:
//!
//! ```text
//! [first]
//! 3rd/prototype.js     # forced to load before everything else, in order
//!
//! [last]
//! core/api.js          # forced to load after everything else
//!
//! [include]
//! core/map.js          # non-empty list restricts the scan to these
//!
//! [exclude]
//! 3rd/logger.js        # skipped; a bare directory prefix excludes a tree
//! ```
//!
//! `#` starts a comment; blank lines are ignored.

use crate::error::{MergeError, MergeResult};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeConfig {
    /// Files forced before all others, in listed order
    pub first: Vec<String>,
    /// Files forced after all others, in listed order
    pub last: Vec<String>,
    /// When non-empty, only these files (plus `first`) are scanned
    pub include: Vec<String>,
    /// Files and directory prefixes left out of the scan
    pub exclude: Vec<String>,
}

impl MergeConfig {
    pub fn parse(text: &str) -> MergeResult<Self> {
        let mut config = Self::default();
        let mut section: Option<&str> = None;
        for (number, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if let Some(heading) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = Some(match heading {
                    "first" => "first",
                    "last" => "last",
                    "include" => "include",
                    "exclude" => "exclude",
                    other => {
                        return Err(MergeError::InvalidConfig(format!(
                            "unknown section [{}] on line {}",
                            other,
                            number + 1
                        )))
                    }
                });
                continue;
            }
            let entry = line.to_string();
            match section {
                Some("first") => config.first.push(entry),
                Some("last") => config.last.push(entry),
                Some("include") => config.include.push(entry),
                Some("exclude") => config.exclude.push(entry),
                _ => {
                    return Err(MergeError::InvalidConfig(format!(
                        "entry before any section on line {}",
                        number + 1
                    )))
                }
            }
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> MergeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MergeError::io(path, e))?;
        Self::parse(&text)
    }

    /// Whether a scanned path is excluded, either listed directly or
    /// under an excluded directory
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude.iter().any(|excluded| {
            if excluded == path {
                return true;
            }
            let mut prefix = excluded.clone();
            if !prefix.ends_with('/') {
                prefix.push('/');
            }
            path.starts_with(&prefix)
        })
    }

    /// Whether a forced ordering or restriction mentions the path
    pub fn is_forced(&self, path: &str) -> bool {
        self.first.iter().any(|f| f == path) || self.last.iter().any(|l| l == path)
    }
}
