//! Topological ordering of items under a "requires" relation
//!
//! Depth-first reverse postorder: items are visited in input order, each
//! item's requirements recursively before the item itself, so the result
//! is deterministic for a deterministic input order. An edge to an item
//! absent from the mapping is an error, and so is a cycle: a truncated
//! or silently re-ordered output would hide real dependency bugs in the
//! merged sources.

use crate::error::{MergeError, MergeResult};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Order `items` so that everything an item requires precedes it.
///
/// Every item appears exactly once in the output; duplicates in `items`
/// are visited once. `requires` must have an entry for every reachable
/// item, including the items themselves.
pub fn toposort<K>(items: &[K], requires: &HashMap<K, Vec<K>>) -> MergeResult<Vec<K>>
where
    K: Eq + Hash + Clone + Display,
{
    let mut marks: HashMap<&K, Mark> = HashMap::new();
    let mut order = Vec::with_capacity(items.len());
    let mut path: Vec<&K> = Vec::new();
    for item in items {
        visit(item, None, requires, &mut marks, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit<'a, K>(
    item: &'a K,
    required_by: Option<&K>,
    requires: &'a HashMap<K, Vec<K>>,
    marks: &mut HashMap<&'a K, Mark>,
    path: &mut Vec<&'a K>,
    order: &mut Vec<K>,
) -> MergeResult<()>
where
    K: Eq + Hash + Clone + Display,
{
    match marks.get(item) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            let start = path.iter().position(|seen| *seen == item).unwrap_or(0);
            let cycle = path[start..]
                .iter()
                .map(|seen| seen.to_string())
                .chain(std::iter::once(item.to_string()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(MergeError::CircularDependency(cycle));
        }
        None => {}
    }
    let Some(dependencies) = requires.get(item) else {
        return Err(MergeError::MissingDependency {
            item: item.to_string(),
            required_by: required_by.map(ToString::to_string),
        });
    };
    marks.insert(item, Mark::InProgress);
    path.push(item);
    for dependency in dependencies {
        visit(dependency, Some(item), requires, marks, path, order)?;
    }
    path.pop();
    marks.insert(item, Mark::Done);
    order.push(item.clone());
    Ok(())
}
