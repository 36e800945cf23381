//! Dependency-ordered source concatenation
//!
//! The merger walks source directories for JavaScript files, pulls in
//! everything their `@requires` declarations reference, orders the whole
//! set topologically and concatenates it, each file under a banner naming
//! it. A declaration naming a file that does not exist on disk fails the
//! merge; it must not be silently dropped from the bundle.

use crate::config::MergeConfig;
use crate::error::{MergeError, MergeResult};
use crate::source::SourceFile;
use crate::toposort::toposort;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

const SUFFIX_JAVASCRIPT: &str = ".js";

/// Merger over one source tree
#[derive(Debug, Clone)]
pub struct Merger {
    source_dir: PathBuf,
    config: Option<MergeConfig>,
}

impl Merger {
    /// Create a merger scanning the given directory
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            config: None,
        }
    }

    /// Apply a merge ordering configuration
    pub fn with_config(mut self, config: MergeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Produce the merged source text
    pub fn merge(&self) -> MergeResult<String> {
        let mut order = self.scan()?;
        let mut files: HashMap<String, SourceFile> = HashMap::new();
        for path in &order {
            files.insert(path.clone(), SourceFile::read(&self.source_dir, path)?);
        }

        // resolution passes: pull in required files from outside the
        // scanned set until the closure is complete
        let mut at = 0;
        while at < order.len() {
            let requirer = order[at].clone();
            for required in files[&requirer].requires() {
                if files.contains_key(&required) {
                    continue;
                }
                if !self.source_dir.join(&required).exists() {
                    return Err(MergeError::missing(required, requirer.clone()));
                }
                debug!("importing {}", required);
                files.insert(
                    required.clone(),
                    SourceFile::read(&self.source_dir, &required)?,
                );
                order.push(required);
            }
            at += 1;
        }

        let requires: HashMap<String, Vec<String>> = files
            .iter()
            .map(|(path, file)| (path.clone(), file.requires()))
            .collect();
        let mut sorted = toposort(&order, &requires)?;

        // forced first and last files move to the required position
        if let Some(config) = &self.config {
            let free: Vec<String> = sorted
                .iter()
                .filter(|path| !config.is_forced(path))
                .cloned()
                .collect();
            sorted = config
                .first
                .iter()
                .chain(free.iter())
                .chain(config.last.iter())
                .filter(|path| files.contains_key(path.as_str()))
                .cloned()
                .collect();
        }

        let mut result = String::new();
        for path in &sorted {
            let file = &files[path];
            debug!("exporting {}", path);
            result.push_str(&banner(path));
            result.push_str(&file.source);
            if !file.source.ends_with('\n') {
                result.push('\n');
            }
        }
        info!("merged {} files", sorted.len());
        Ok(result)
    }

    /// Merge and write the result to `output`
    pub fn merge_to(&self, output: &Path) -> MergeResult<()> {
        let merged = self.merge()?;
        std::fs::write(output, &merged).map_err(|e| MergeError::io(output, e))?;
        info!("generated {} ({} bytes)", output.display(), merged.len());
        Ok(())
    }

    /// Scan for JavaScript sources, honoring the configuration's include
    /// and exclude lists; paths come back sorted, slash-separated and
    /// relative to the scan root
    fn scan(&self) -> MergeResult<Vec<String>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.source_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if !file_name.ends_with(SUFFIX_JAVASCRIPT) || file_name.starts_with('.') {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.source_dir)
                .expect("walked path is under the scan root")
                .to_string_lossy()
                .replace('\\', "/");
            let keep = match &self.config {
                Some(config) if !config.include.is_empty() => {
                    config.include.contains(&relative) || config.first.contains(&relative)
                }
                Some(config) => !config.is_excluded(&relative),
                None => true,
            };
            if keep {
                paths.push(relative);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

fn banner(path: &str) -> String {
    let rule = "=".repeat(70);
    format!("/* {}\n    {}\n   {} */\n\n", rule, path, rule)
}
