//! Integration tests for the target graph engine
//!
//! Exercises build, clean and graph traversals over real scratch trees.

use carto_engine::{BuildSession, EngineError, Stamp, Target, VariableTable};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

fn session() -> BuildSession {
    BuildSession::with_variables(VariableTable::new())
}

/// Target that writes its own file and counts invocations
fn file_target(path: &Path, counter: &Arc<AtomicUsize>) -> Target {
    let counter = Arc::clone(counter);
    Target::new(path.to_string_lossy().to_string()).with_action(move |ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        fs::write(ctx.name(), "built").map_err(|e| carto_engine::EngineError::io(ctx.name(), e))
    })
}

fn name_of(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn set_mtime(path: &Path, time: SystemTime) {
    let file = fs::File::options().append(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}

fn old_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000_000)
}

#[test]
fn test_missing_leaf_builds_then_chain_is_idempotent() {
    // A (no deps, file missing) -> B (depends on A) -> C (phony)
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    let a_runs = Arc::new(AtomicUsize::new(0));
    let b_runs = Arc::new(AtomicUsize::new(0));

    let mut session = session();
    session.register(file_target(&a, &a_runs)).unwrap();
    session
        .register(file_target(&b, &b_runs).with_dependency(name_of(&a)))
        .unwrap();
    session
        .register(Target::virtual_("package", [name_of(&b)]))
        .unwrap();

    session.build("package", false).unwrap();
    assert_eq!(a_runs.load(Ordering::SeqCst), 1);
    assert_eq!(b_runs.load(Ordering::SeqCst), 1);
    assert!(a.exists());
    assert!(b.exists());

    // no filesystem changes: the second build performs no actions
    session.build("package", false).unwrap();
    assert_eq!(a_runs.load(Ordering::SeqCst), 1);
    assert_eq!(b_runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_rebuilt_dependency_marks_ancestors_stale() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&b, "stale").unwrap();
    set_mtime(&b, old_time());

    let a_runs = Arc::new(AtomicUsize::new(0));
    let b_runs = Arc::new(AtomicUsize::new(0));

    let mut session = session();
    session.register(file_target(&a, &a_runs)).unwrap();
    session
        .register(file_target(&b, &b_runs).with_dependency(name_of(&a)))
        .unwrap();

    // A's action runs (file missing) and stamps A with the current time,
    // which is newer than B's old mtime, so B rebuilds too
    session.build(&name_of(&b), false).unwrap();
    assert_eq!(a_runs.load(Ordering::SeqCst), 1);
    assert_eq!(b_runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_fresh_target_newer_than_dependencies_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "old dependency").unwrap();
    set_mtime(&a, old_time());
    fs::write(&b, "fresh output").unwrap();

    let b_runs = Arc::new(AtomicUsize::new(0));
    let mut session = session();
    session
        .register(file_target(&b, &b_runs).with_dependency(name_of(&a)))
        .unwrap();

    session.build(&name_of(&b), false).unwrap();
    assert_eq!(b_runs.load(Ordering::SeqCst), 0);
    assert_eq!(fs::read_to_string(&b).unwrap(), "fresh output");
}

#[test]
fn test_dry_run_computes_decisions_without_acting() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let a_runs = Arc::new(AtomicUsize::new(0));

    let mut session = session();
    session.register(file_target(&a, &a_runs)).unwrap();

    let stamp = session.build(&name_of(&a), true).unwrap();
    assert_eq!(a_runs.load(Ordering::SeqCst), 0);
    assert!(!a.exists());
    // the staleness decision is still computed and propagated
    assert!(matches!(stamp, Stamp::At(_)));
}

#[test]
fn test_clean_removes_outputs_recursively() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "a").unwrap();
    fs::write(&b, "b").unwrap();

    let mut session = session();
    session
        .register(Target::new(name_of(&a)).with_action(|_| Ok(())))
        .unwrap();
    session
        .register(
            Target::new(name_of(&b))
                .with_dependency(name_of(&a))
                .with_action(|_| Ok(())),
        )
        .unwrap();
    session
        .register(Target::virtual_("package", [name_of(&b)]))
        .unwrap();

    session.clean("package", false, true).unwrap();
    assert!(!a.exists());
    assert!(!b.exists());

    // idempotent: cleaning again is not an error
    session.clean("package", false, true).unwrap();
}

#[test]
fn test_clean_without_recurse_touches_one_node() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "a").unwrap();
    fs::write(&b, "b").unwrap();

    let mut session = session();
    session
        .register(Target::new(name_of(&a)).with_action(|_| Ok(())))
        .unwrap();
    session
        .register(
            Target::new(name_of(&b))
                .with_dependency(name_of(&a))
                .with_action(|_| Ok(())),
        )
        .unwrap();

    session.clean(&name_of(&b), false, false).unwrap();
    assert!(!b.exists());
    assert!(a.exists());
}

#[test]
fn test_clean_spares_precious_without_really() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("compiler.jar");
    fs::write(&jar, "slow to rebuild").unwrap();

    let mut session = session();
    session
        .register(Target::new(name_of(&jar)).precious(true).with_action(|_| Ok(())))
        .unwrap();

    session.clean(&name_of(&jar), false, true).unwrap();
    assert!(jar.exists());

    session.clean(&name_of(&jar), true, true).unwrap();
    assert!(!jar.exists());
}

#[test]
fn test_ambiguous_rules_fail_resolution() {
    let mut session = session();
    session
        .add_rule(r"\.json$", |name, _| Target::new(name))
        .unwrap();
    session
        .add_rule(r"^generated/", |name, _| Target::new(name))
        .unwrap();

    let err = session.build("generated/config.json", false).unwrap_err();
    assert!(matches!(
        err,
        EngineError::AmbiguousRule { name } if name == "generated/config.json"
    ));
}

#[test]
fn test_rule_built_target_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root: PathBuf = dir.path().to_path_buf();
    let prefix = name_of(&root);

    let mut session = session();
    session
        .add_rule(r"deep/nested/[^/]+\.json$", |name, _| {
            Target::new(name).with_action(|ctx| {
                fs::write(ctx.name(), "{}").map_err(|e| EngineError::io(ctx.name(), e))
            })
        })
        .unwrap();

    let name = format!("{}/deep/nested/example.json", prefix);
    session.build(&name, false).unwrap();
    assert_eq!(fs::read_to_string(root.join("deep/nested/example.json")).unwrap(), "{}");
}

#[test]
fn test_failing_action_cleans_its_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("partial.txt");
    let downstream_runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&downstream_runs);

    let mut session = session();
    session
        .register(Target::new(name_of(&out)).with_action(|ctx| {
            fs::write(ctx.name(), "partial").map_err(|e| EngineError::io(ctx.name(), e))?;
            ctx.fail("compiler crashed")
        }))
        .unwrap();
    session
        .register(
            Target::new("downstream")
                .phony(true)
                .with_dependency(name_of(&out))
                .with_action(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
        .unwrap();

    let err = session.build("downstream", false).unwrap_err();
    match err {
        EngineError::Build { target, message } => {
            assert_eq!(target, name_of(&out));
            assert!(message.contains("compiler crashed"));
        }
        other => panic!("expected build error, got {:?}", other),
    }
    // the partial artifact is removed and the dependent never ran
    assert!(!out.exists());
    assert_eq!(downstream_runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_graph_emits_each_edge_once() {
    let dir = tempfile::tempdir().unwrap();
    let shared = dir.path().join("shared.js");
    fs::write(&shared, "// leaf").unwrap();
    let shared_name = name_of(&shared);

    let mut session = session();
    session
        .register(Target::virtual_("left", [shared_name.clone()]))
        .unwrap();
    session
        .register(Target::virtual_("right", [shared_name.clone()]))
        .unwrap();
    session
        .register(Target::virtual_("top", ["left", "right"]))
        .unwrap();

    let mut out = Vec::new();
    session.graph("top", &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("digraph \"top\" {"));
    assert!(text.trim_end().ends_with('}'));
    let leaf_edges = text
        .lines()
        .filter(|line| line.contains("-> ") && line.contains("shared.js"))
        .count();
    assert_eq!(leaf_edges, 2); // left -> shared, right -> shared
    assert_eq!(text.matches("\"top\" -> ").count(), 2);
}

#[test]
fn test_source_leaf_resolves_precious() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("hand-written.js");
    fs::write(&source, "// source").unwrap();

    let mut session = session();
    session
        .register(Target::virtual_("lib", [name_of(&source)]))
        .unwrap();
    session.build("lib", false).unwrap();

    // cleaning the tree never deletes the hand-written source
    session.clean("lib", false, true).unwrap();
    assert!(source.exists());
}
