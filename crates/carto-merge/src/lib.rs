//! Dependency-ordered JavaScript source merging
//!
//! Combines a tree of JavaScript source files into a single bundle whose
//! order satisfies the `// @requires <path>` declarations inside the
//! files. Provides:
//! - A generic topological sorter over a "requires" relation, with
//!   cycle detection and missing-dependency reporting
//! - Source scanning with `@requires` extraction
//! - A sectioned configuration file for forced first/last ordering and
//!   include/exclude lists
//! - The merger itself: scan, resolve, sort, concatenate

pub mod config;
pub mod error;
pub mod merger;
pub mod source;
pub mod toposort;

// Re-export main types
pub use config::MergeConfig;
pub use error::{MergeError, MergeResult};
pub use merger::Merger;
pub use source::SourceFile;
pub use toposort::toposort;
