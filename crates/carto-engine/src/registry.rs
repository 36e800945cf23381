//! Target registry and dynamic rules
//!
//! The registry owns every named target plus an ordered list of dynamic
//! rules. Rules are pattern-matched factories: a name with no registered
//! target is matched against each rule pattern in registration order, and
//! exactly one match instantiates a concrete target that is then cached.
//! More than one match is an ambiguity error. A name with no target, no
//! matching rule and no file on disk is unknown; resolution fails fast
//! rather than synthesizing a placeholder.

use crate::error::{EngineError, EngineResult};
use crate::target::Target;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;

/// Factory producing a concrete target from a rule-matched name
pub type RuleFactory = Box<dyn Fn(&str, &Captures) -> Target + Send + Sync>;

/// A pattern-matched target factory
pub struct Rule {
    pattern: Regex,
    factory: RuleFactory,
}

/// Registry of named targets and dynamic rules
#[derive(Default)]
pub struct TargetRegistry {
    targets: HashMap<String, Target>,
    rules: Vec<Rule>,
    default: Option<String>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target; the first registered target becomes the default.
    ///
    /// Registering a name twice is an error; use
    /// [`register_override`](Self::register_override) to replace a target
    /// deliberately.
    pub fn register(&mut self, target: Target) -> EngineResult<()> {
        if self.targets.contains_key(&target.name) {
            return Err(EngineError::DuplicateTarget { name: target.name });
        }
        self.insert(target);
        Ok(())
    }

    /// Register a target, replacing any previous definition of the name
    pub fn register_override(&mut self, target: Target) {
        self.insert(target);
    }

    fn insert(&mut self, target: Target) {
        if self.default.is_none() {
            self.default = Some(target.name.clone());
        }
        self.targets.insert(target.name.clone(), target);
    }

    /// Add a dynamic rule; rules are tried in registration order
    pub fn add_rule(
        &mut self,
        pattern: &str,
        factory: impl Fn(&str, &Captures) -> Target + Send + Sync + 'static,
    ) -> EngineResult<()> {
        let pattern = Regex::new(pattern).map_err(|source| EngineError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.rules.push(Rule {
            pattern,
            factory: Box::new(factory),
        });
        Ok(())
    }

    /// The first-registered target, used when no target is requested
    pub fn default_target(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Look up an already-resolved target
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    /// Resolve a name to a target.
    ///
    /// Resolution order: registered target, else exactly one matching rule
    /// (two or more is [`EngineError::AmbiguousRule`]), else an existing
    /// file on disk becomes a precious no-action leaf, else
    /// [`EngineError::UnknownTarget`].
    pub fn resolve(&mut self, name: &str) -> EngineResult<&Target> {
        if self.targets.contains_key(name) {
            return Ok(&self.targets[name]);
        }
        let mut resolved: Option<Target> = None;
        for rule in &self.rules {
            let Some(captures) = rule.pattern.captures(name) else {
                continue;
            };
            if resolved.is_some() {
                return Err(EngineError::AmbiguousRule {
                    name: name.to_string(),
                });
            }
            resolved = Some((rule.factory)(name, &captures));
        }
        let target = match resolved {
            Some(target) => target,
            None if Path::new(name).exists() => Target::new(name).precious(true),
            None => {
                return Err(EngineError::UnknownTarget {
                    name: name.to_string(),
                })
            }
        };
        self.targets.insert(name.to_string(), target);
        Ok(&self.targets[name])
    }
}
