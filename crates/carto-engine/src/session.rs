//! Build session: resolve, build, clean and graph traversals
//!
//! A [`BuildSession`] is constructed once per invocation and passed by
//! reference through every operation; it owns the target registry, the
//! variable table and the per-invocation stamp memo. There is no hidden
//! process-wide state and no persisted build manifest: staleness is purely
//! mtime-based, recomputed each invocation.

use crate::context::TaskContext;
use crate::error::{EngineError, EngineResult};
use crate::registry::TargetRegistry;
use crate::target::{Stamp, Target};
use crate::vars::VariableTable;
use regex::Captures;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info};

/// One build invocation's worth of state
pub struct BuildSession {
    registry: TargetRegistry,
    vars: VariableTable,
    stamps: HashMap<String, Stamp>,
}

impl BuildSession {
    /// Create a session with variables seeded from the process environment
    pub fn new() -> Self {
        Self::with_variables(VariableTable::from_env())
    }

    /// Create a session with an explicit variable table
    pub fn with_variables(vars: VariableTable) -> Self {
        Self {
            registry: TargetRegistry::new(),
            vars,
            stamps: HashMap::new(),
        }
    }

    pub fn vars(&self) -> &VariableTable {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VariableTable {
        &mut self.vars
    }

    /// Register a target; duplicate names are an error
    pub fn register(&mut self, target: Target) -> EngineResult<()> {
        self.registry.register(target)
    }

    /// Register a target, replacing any previous definition
    pub fn register_override(&mut self, target: Target) {
        self.registry.register_override(target)
    }

    /// Add a dynamic rule, tried in registration order
    pub fn add_rule(
        &mut self,
        pattern: &str,
        factory: impl Fn(&str, &Captures) -> Target + Send + Sync + 'static,
    ) -> EngineResult<()> {
        self.registry.add_rule(pattern, factory)
    }

    /// The first-registered target, used when none is requested
    pub fn default_target(&self) -> Option<&str> {
        self.registry.default_target()
    }

    /// Look up an already-resolved target
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.registry.get(name)
    }

    /// Bring a target up to date, building its dependencies first.
    ///
    /// Returns the target's stamp so callers can propagate it upward.
    /// Under `dry_run` the staleness decisions are still computed, logged
    /// and propagated, but no action is invoked.
    pub fn build(&mut self, name: &str, dry_run: bool) -> EngineResult<Stamp> {
        let (dependencies, phony, makedirs, action) = {
            let target = self.registry.resolve(name)?;
            (
                target.dependencies.clone(),
                target.phony,
                target.makedirs,
                target.action.clone(),
            )
        };

        // leaves first, tracking the newest dependency stamp
        let mut dep_stamp: Option<Stamp> = None;
        for dependency in &dependencies {
            let stamp = self.build(dependency, dry_run)?;
            dep_stamp = Some(dep_stamp.map_or(stamp, |newest| newest.max(stamp)));
        }

        debug!("{}: build", name);
        let own = match self.stamps.get(name) {
            Some(stamp) => *stamp,
            None => {
                let stamp = if phony {
                    Stamp::Missing
                } else {
                    match fs::metadata(name).and_then(|meta| meta.modified()) {
                        Ok(mtime) => Stamp::At(mtime),
                        Err(_) => Stamp::Missing,
                    }
                };
                self.stamps.insert(name.to_string(), stamp);
                stamp
            }
        };

        let stale = own == Stamp::Missing || dep_stamp.is_some_and(|newest| own < newest);
        if !stale {
            return Ok(own);
        }

        debug!("{}: action", name);
        if makedirs && !dry_run {
            if let Some(parent) = Path::new(name).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    info!("{}: mkdir -p {}", name, parent.display());
                    fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
                }
            }
        }
        if let Some(action) = action {
            if dry_run {
                info!("{}: would run action (dry run)", name);
            } else {
                let ctx = TaskContext::new(name, &dependencies, &self.vars);
                if let Err(error) = action(&ctx) {
                    // never leave a partial artifact a later staleness
                    // check would treat as fresh
                    self.remove_artifact(name, false)?;
                    return Err(match error {
                        wrapped @ (EngineError::Build { .. }
                        | EngineError::CorruptDownload { .. }
                        | EngineError::UnsetVariable { .. }) => wrapped,
                        other => EngineError::build(name, other),
                    });
                }
            }
        }

        // with dependencies, adopt the newest dependency stamp so downstream
        // comparisons stay transitive without re-statting; otherwise the
        // wall clock
        let stamp = dep_stamp.unwrap_or_else(|| Stamp::At(SystemTime::now()));
        self.stamps.insert(name.to_string(), stamp);
        Ok(stamp)
    }

    /// Remove a target's artifact, and its dependencies' artifacts when
    /// `recurse` is set.
    ///
    /// Precious targets survive unless `really` is given; missing files
    /// are not an error.
    pub fn clean(&mut self, name: &str, really: bool, recurse: bool) -> EngineResult<()> {
        let dependencies = self.registry.resolve(name)?.dependencies.clone();
        self.remove_artifact(name, really)?;
        if recurse {
            for dependency in &dependencies {
                self.clean(dependency, really, recurse)?;
            }
        }
        Ok(())
    }

    /// Emit the dependency graph reachable from `name` as a textual
    /// `digraph`, each edge exactly once
    pub fn graph<W: io::Write>(&mut self, name: &str, out: &mut W) -> EngineResult<()> {
        writeln!(out, "digraph \"{}\" {{", name).map_err(|e| EngineError::io(name, e))?;
        let mut visited = HashSet::new();
        self.graph_edges(name, out, &mut visited)?;
        writeln!(out, "}}").map_err(|e| EngineError::io(name, e))?;
        Ok(())
    }

    fn graph_edges<W: io::Write>(
        &mut self,
        name: &str,
        out: &mut W,
        visited: &mut HashSet<String>,
    ) -> EngineResult<()> {
        if !visited.insert(name.to_string()) {
            return Ok(());
        }
        let dependencies = self.registry.resolve(name)?.dependencies.clone();
        for dependency in &dependencies {
            writeln!(out, "\t\"{}\" -> \"{}\";", name, dependency)
                .map_err(|e| EngineError::io(name, e))?;
            self.graph_edges(dependency, out, visited)?;
        }
        Ok(())
    }

    fn remove_artifact(&self, name: &str, really: bool) -> EngineResult<()> {
        let Some(target) = self.registry.get(name) else {
            return Ok(());
        };
        if target.phony {
            return Ok(());
        }
        if really || (target.cleanable && !target.precious) {
            info!("{}: clean", name);
            match fs::remove_file(name) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(EngineError::io(name, e)),
            }
        }
        Ok(())
    }
}

impl Default for BuildSession {
    fn default() -> Self {
        Self::new()
    }
}
