//! Scanned JavaScript source files and their dependency declarations
//!
//! Dependencies are declared in source comments of the form:
//!
//! ```text
//! // @requires lib/geometry.js
//! ```
//!
//! `@require` and `@requires` are accepted, with an optional trailing
//! colon, one declaration per line.

use crate::error::{MergeError, MergeResult};
use std::path::Path;
use std::sync::OnceLock;

fn requires_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"@requires?:?[ \t]+(\S+)").unwrap())
}

/// A JavaScript source file, addressed by its slash-separated path
/// relative to the scan root
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub source: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Load `relative` from beneath `root`
    pub fn read(root: &Path, relative: &str) -> MergeResult<Self> {
        let full = root.join(relative);
        let source = std::fs::read_to_string(&full).map_err(|e| MergeError::io(&full, e))?;
        Ok(Self::new(relative, source))
    }

    /// The dependency paths declared in the source, in declaration order
    pub fn requires(&self) -> Vec<String> {
        self.source
            .lines()
            .filter_map(|line| requires_re().captures(line))
            .map(|captures| captures[1].to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("// @requires lib/geometry.js")]
    #[case("// @require lib/geometry.js")]
    #[case("// @requires: lib/geometry.js")]
    #[case(" * @requires lib/geometry.js")]
    fn test_declaration_forms(#[case] line: &str) {
        let file = SourceFile::new("map.js", line);
        assert_eq!(file.requires(), vec!["lib/geometry.js"]);
    }

    #[test]
    fn test_multiple_declarations_in_order() {
        let file = SourceFile::new(
            "map.js",
            "// @requires lib/events.js\nvar Map = {};\n// @requires lib/geometry.js\n",
        );
        assert_eq!(file.requires(), vec!["lib/events.js", "lib/geometry.js"]);
    }

    #[test]
    fn test_no_declarations() {
        let file = SourceFile::new("util.js", "function clamp(x) { return x; }\n");
        assert!(file.requires().is_empty());
    }
}
