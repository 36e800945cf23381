//! Incremental target-graph build engine
//!
//! The engine owns a registry of named build targets (file-backed or
//! phony), each with an ordered dependency list and an optional action.
//! Building a target resolves its name (exact match, else dynamic
//! rule-based match, else an existing file as a precious leaf), brings
//! every dependency up to date first, and invokes the action only when the
//! target is stale by timestamp comparison. Also provides:
//! - Recursive clean with precious-target protection
//! - Dependency graph dumps for visualization tooling
//! - Dry-run traversal reporting staleness decisions
//! - A variable table with first-setter-wins semantics and `%(NAME)s`
//!   interpolation for subprocess arguments

pub mod context;
pub mod error;
pub mod registry;
pub mod session;
pub mod target;
pub mod vars;

// Re-export main types
pub use context::TaskContext;
pub use error::{EngineError, EngineResult};
pub use registry::{Rule, RuleFactory, TargetRegistry};
pub use session::BuildSession;
pub use target::{Action, Stamp, Target};
pub use vars::VariableTable;
