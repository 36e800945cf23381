//! Action execution context
//!
//! A [`TaskContext`] is the single argument handed to a target's action.
//! It carries the target name, the resolved dependency list and the
//! session's variable table, and exposes the helper surface actions are
//! written against: subprocess invocation, checksummed downloads and small
//! filesystem operations. Every string argument passed to a helper is
//! interpolated against the variable table before use.

use crate::error::{EngineError, EngineResult};
use crate::vars::VariableTable;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;
use tracing::{debug, info};

/// Context bound to the target currently being rebuilt
pub struct TaskContext<'a> {
    name: &'a str,
    dependencies: &'a [String],
    vars: &'a VariableTable,
}

impl<'a> TaskContext<'a> {
    pub(crate) fn new(name: &'a str, dependencies: &'a [String], vars: &'a VariableTable) -> Self {
        Self {
            name,
            dependencies,
            vars,
        }
    }

    /// Name of the target being rebuilt; the artifact path for file targets
    pub fn name(&self) -> &str {
        self.name
    }

    /// The target's dependency names, in declaration order
    pub fn dependencies(&self) -> &[String] {
        self.dependencies
    }

    /// The session's variable table
    pub fn vars(&self) -> &VariableTable {
        self.vars
    }

    /// Interpolate `%(NAME)s` placeholders against the variable table
    pub fn expand(&self, template: &str) -> EngineResult<String> {
        self.vars.expand(template)
    }

    /// Fail the action with a message attributed to this target
    pub fn fail<T>(&self, message: impl ToString) -> EngineResult<T> {
        Err(EngineError::build(self.name, message))
    }

    /// Spawn a subprocess and await it; a non-zero exit fails the action.
    ///
    /// Variables are expanded in every argument.
    pub fn run<I, S>(&self, argv: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let argv = self.expand_argv(argv)?;
        info!("{}: {}", self.name, argv.join(" "));
        let status = Command::new(&argv[0])
            .args(&argv[1..])
            .status()
            .map_err(|e| EngineError::build(self.name, format!("{}: {}", argv[0], e)))?;
        if !status.success() {
            return self.fail(format!("{} exited with {}", argv[0], status));
        }
        Ok(())
    }

    /// Like [`run`](Self::run), but capture stdout into the target file
    pub fn output<I, S>(&self, argv: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let argv = self.expand_argv(argv)?;
        info!("{}: {}", self.name, argv.join(" "));
        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .output()
            .map_err(|e| EngineError::build(self.name, format!("{}: {}", argv[0], e)))?;
        if !output.status.success() {
            return self.fail(format!(
                "{} exited with {}: {}",
                argv[0],
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        fs::write(self.name, &output.stdout).map_err(|e| EngineError::io(self.name, e))?;
        Ok(())
    }

    /// Fetch a URL into the target file, verifying a sha256 digest when given.
    ///
    /// A digest mismatch is fatal and the partial artifact is not written.
    pub fn download(&self, url: &str, sha256: Option<&str>) -> EngineResult<()> {
        let url = self.expand(url)?;
        info!("{}: download {}", self.name, url);
        let response = reqwest::blocking::get(&url)
            .and_then(|r| r.error_for_status())
            .map_err(|e| EngineError::build(self.name, format!("download failed: {}", e)))?;
        let content = response
            .bytes()
            .map_err(|e| EngineError::build(self.name, format!("download failed: {}", e)))?;
        if let Some(expected) = sha256 {
            let actual = format!("{:x}", Sha256::digest(&content));
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(EngineError::CorruptDownload {
                    url,
                    expected: expected.to_string(),
                    actual,
                });
            }
        }
        fs::write(self.name, &content).map_err(|e| EngineError::io(self.name, e))?;
        Ok(())
    }

    /// Create the target file, or freshen its modification time
    pub fn touch(&self) -> EngineResult<()> {
        debug!("{}: touch", self.name);
        let path = Path::new(self.name);
        if path.exists() {
            let file = fs::File::options()
                .append(true)
                .open(path)
                .map_err(|e| EngineError::io(path, e))?;
            file.set_modified(SystemTime::now())
                .map_err(|e| EngineError::io(path, e))?;
        } else {
            fs::File::create(path).map_err(|e| EngineError::io(path, e))?;
        }
        Ok(())
    }

    /// Copy each source file to `dest` (a file, or a directory to copy into)
    pub fn cp<I, S>(&self, sources: I, dest: &str) -> EngineResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dest = PathBuf::from(self.expand(dest)?);
        for source in sources {
            let source = PathBuf::from(self.expand(source.as_ref())?);
            let target = if dest.is_dir() {
                match source.file_name() {
                    Some(file_name) => dest.join(file_name),
                    None => return self.fail(format!("cannot copy {}", source.display())),
                }
            } else {
                dest.clone()
            };
            info!("{}: cp {} {}", self.name, source.display(), target.display());
            fs::copy(&source, &target).map_err(|e| EngineError::io(&source, e))?;
        }
        Ok(())
    }

    /// Remove files or directory trees, ignoring anything that is absent
    pub fn rm_rf<I, S>(&self, paths: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let path = PathBuf::from(self.expand(path.as_ref())?);
            info!("{}: rm -rf {}", self.name, path.display());
            if path.is_dir() {
                let _ = fs::remove_dir_all(&path);
            } else {
                let _ = fs::remove_file(&path);
            }
        }
        Ok(())
    }

    /// Create a directory and its parents if it does not exist yet
    pub fn makedirs(&self, path: &str) -> EngineResult<()> {
        let path = PathBuf::from(self.expand(path)?);
        if !path.as_os_str().is_empty() && !path.exists() {
            info!("{}: mkdir -p {}", self.name, path.display());
            fs::create_dir_all(&path).map_err(|e| EngineError::io(&path, e))?;
        }
        Ok(())
    }

    fn expand_argv<I, S>(&self, argv: I) -> EngineResult<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let argv = argv
            .into_iter()
            .map(|arg| self.expand(arg.as_ref()))
            .collect::<EngineResult<Vec<_>>>()?;
        if argv.is_empty() {
            return self.fail("empty command");
        }
        Ok(argv)
    }
}
