//! Process-wide build variables with first-setter-wins semantics
//!
//! Variables come from the process environment first, then CLI `key=value`
//! overrides, then buildfile defaults; the first assignment to a key wins
//! and later attempts are silently ignored. String arguments handed to
//! subprocess helpers are interpolated against this table using
//! `%(NAME)s`-style placeholders.

use crate::error::{EngineError, EngineResult};
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"%\(([A-Za-z_][A-Za-z0-9_]*)\)s").unwrap())
}

/// Insert-once map of build variables
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    values: HashMap<String, String>,
}

impl VariableTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table seeded from the process environment
    pub fn from_env() -> Self {
        let mut table = Self::new();
        for (key, value) in std::env::vars() {
            table.set(key, value);
        }
        table
    }

    /// Set a variable unless it is already set.
    ///
    /// Returns `true` when the value was inserted, `false` when an earlier
    /// setter won.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if self.values.contains_key(&key) {
            return false;
        }
        self.values.insert(key, value.into());
        true
    }

    /// Look up a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether the variable has been set
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Interpolate `%(NAME)s` placeholders in a template.
    ///
    /// A reference to an unset variable is a lookup error.
    pub fn expand(&self, template: &str) -> EngineResult<String> {
        let mut result = String::with_capacity(template.len());
        let mut last = 0;
        for captures in placeholder_re().captures_iter(template) {
            let whole = captures.get(0).unwrap();
            let name = &captures[1];
            let value = self
                .values
                .get(name)
                .ok_or_else(|| EngineError::UnsetVariable {
                    name: name.to_string(),
                })?;
            result.push_str(&template[last..whole.start()]);
            result.push_str(value);
            last = whole.end();
        }
        result.push_str(&template[last..]);
        Ok(result)
    }
}
