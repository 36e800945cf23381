//! Build targets and their freshness stamps

use crate::context::TaskContext;
use crate::error::EngineResult;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// The unit of work attached to a target, invoked when the target is stale.
///
/// Actions receive a [`TaskContext`] bound to the target being rebuilt and
/// report failure through the ordinary `Result` channel; the engine cleans
/// the target's own output before propagating an action error.
pub type Action = Arc<dyn Fn(&TaskContext) -> EngineResult<()> + Send + Sync>;

/// Freshness stamp of a target within one build invocation.
///
/// `Missing` (phony target, or no file on disk) is older than every
/// on-disk modification time, so a missing target is always rebuilt.
/// The "not yet computed" state is the absence of a stamp in the
/// session's memo, not a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stamp {
    /// No on-disk artifact; infinitely old
    Missing,
    /// Modification time of the artifact, or the propagated dependency
    /// stamp after a rebuild
    At(SystemTime),
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "missing"),
            Self::At(time) => match time.duration_since(SystemTime::UNIX_EPOCH) {
                Ok(d) => write!(f, "{}.{:03}", d.as_secs(), d.subsec_millis()),
                Err(_) => write!(f, "pre-epoch"),
            },
        }
    }
}

/// A named unit of build output with dependencies and an optional action.
///
/// The name may be a filesystem path (the target's artifact) or purely
/// symbolic for phony grouping targets such as `build` or `lint`.
#[derive(Clone)]
pub struct Target {
    /// Target name; doubles as the artifact path for non-phony targets
    pub name: String,
    /// Work to perform on rebuild; absent for pure aggregation targets
    pub(crate) action: Option<Action>,
    /// Names of targets that must be up to date first, in order
    pub dependencies: Vec<String>,
    /// No on-disk artifact; considered present once built during a run
    pub phony: bool,
    /// Never deleted by clean without the `really` override
    pub precious: bool,
    /// Deleted by ordinary clean; `false` keeps the artifact unless
    /// `really` is given
    pub cleanable: bool,
    /// Create the artifact's parent directory before the action runs
    pub makedirs: bool,
}

impl Target {
    /// Create a new target with no action and no dependencies
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: None,
            dependencies: Vec::new(),
            phony: false,
            precious: false,
            cleanable: true,
            makedirs: true,
        }
    }

    /// Create a phony grouping target over the given dependencies.
    ///
    /// Phony targets have no artifact, so ordinary clean skips them.
    pub fn virtual_(
        name: impl Into<String>,
        dependencies: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(name)
            .with_dependencies(dependencies)
            .phony(true)
            .cleanable(false)
    }

    /// Attach the rebuild action
    pub fn with_action(
        mut self,
        action: impl Fn(&TaskContext) -> EngineResult<()> + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// Append dependencies, preserving order
    pub fn with_dependencies(
        mut self,
        dependencies: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.dependencies
            .extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// Append a single dependency
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    /// Mark the target as phony (no on-disk artifact)
    pub fn phony(mut self, phony: bool) -> Self {
        self.phony = phony;
        self
    }

    /// Protect the artifact from clean without the `really` override
    pub fn precious(mut self, precious: bool) -> Self {
        self.precious = precious;
        self
    }

    /// Control whether ordinary clean removes the artifact
    pub fn cleanable(mut self, cleanable: bool) -> Self {
        self.cleanable = cleanable;
        self
    }

    /// Control parent directory creation before the action runs
    pub fn makedirs(mut self, makedirs: bool) -> Self {
        self.makedirs = makedirs;
        self
    }

    /// Whether the target carries an action
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("action", &self.action.as_ref().map(|_| "<fn>"))
            .field("dependencies", &self.dependencies)
            .field("phony", &self.phony)
            .field("precious", &self.precious)
            .field("cleanable", &self.cleanable)
            .field("makedirs", &self.makedirs)
            .finish()
    }
}
