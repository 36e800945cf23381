//! The Carto project's target tree
//!
//! Registers every build target against a project root: the merged
//! library, the lint stamp, the downloaded closure compiler, and dynamic
//! rules for the per-example compiler configs and combined files. Target
//! names are root-relative paths, so the driver must run from the project
//! root.

use carto_engine::{BuildSession, EngineError, EngineResult, Target};
use carto_merge::{MergeConfig, Merger};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

const COMPILER_JAR: &str = "build/compiler.jar";
const COMPILER_URL: &str = "https://plovr.googlecode.com/files/plovr-eba786b34df9.jar";
const COMPILER_SHA256: &str = "5f2c725fd09b4b1dcc96f4cd8a534ce67f0fd4bbfbf2bb38d7e69d6cd9b55e04";

/// Name of the optional merge ordering config at the project root
const MERGE_CONFIG: &str = "carto.cfg";

/// Register the whole target tree; `all` is the default target
pub fn register(session: &mut BuildSession, root: &Path) -> EngineResult<()> {
    session.vars_mut().set("JAVA", "java");
    session.vars_mut().set("JSLINT", "jslint");

    let sources = find_sources(root)?;
    let examples = find_examples(root);

    session.register(Target::virtual_("all", ["build", "examples"]))?;
    session.register(Target::virtual_(
        "build",
        ["build/carto.js", "build/carto.css"],
    ))?;

    // the merged library
    let src_dir = root.join("src");
    let merge_config = root.join(MERGE_CONFIG);
    let mut library = Target::new("build/carto.js").with_dependencies(sources.iter().cloned());
    if merge_config.exists() {
        library = library.with_dependency(MERGE_CONFIG);
    }
    session.register(library.with_action(move |ctx| {
        let mut merger = Merger::new(&src_dir);
        if merge_config.exists() {
            let config = MergeConfig::from_file(&merge_config)
                .or_else(|error| ctx.fail(error))?;
            merger = merger.with_config(config);
        }
        merger
            .merge_to(Path::new(ctx.name()))
            .or_else(|error| ctx.fail(error))
    }))?;

    session.register(
        Target::new("build/carto.css")
            .with_dependency("build/carto.js")
            .with_action(|ctx| ctx.touch()),
    )?;

    // slow to fetch; ordinary clean keeps it
    session.register(
        Target::new(COMPILER_JAR)
            .cleanable(false)
            .with_action(|ctx| ctx.download(COMPILER_URL, Some(COMPILER_SHA256))),
    )?;

    session.register(Target::virtual_("lint", ["build/lint-timestamp"]))?;
    let lint_sources = sources.clone();
    session.register(
        Target::new("build/lint-timestamp")
            .with_dependencies(sources.iter().cloned())
            .with_action(move |ctx| {
                let mut argv = vec!["%(JSLINT)s".to_string()];
                argv.extend(lint_sources.iter().cloned());
                ctx.run(&argv)?;
                ctx.touch()
            }),
    )?;

    // per-example compiler config: examples/<id>.json
    session.add_rule(r"^examples/(?P<id>[^/]+)\.json$", |name, captures| {
        let id = captures["id"].to_string();
        Target::new(name)
            .with_dependency(format!("examples/{}.js", id))
            .with_action(move |ctx| {
                let config = serde_json::json!({
                    "id": id,
                    "inputs": [
                        format!("examples/{}.js", id),
                        "build/carto.js",
                    ],
                });
                let text = serde_json::to_string_pretty(&config).or_else(|e| ctx.fail(e))?;
                fs::write(ctx.name(), text).map_err(|e| EngineError::io(ctx.name(), e))
            })
    })?;

    // compiled example: examples/<id>.combined.js
    let combined_sources = sources.clone();
    session.add_rule(
        r"^examples/(?P<id>[^/]+)\.combined\.js$",
        move |name, captures| {
            let id = captures["id"].to_string();
            let config = format!("examples/{}.json", id);
            Target::new(name)
                .with_dependency(COMPILER_JAR)
                .with_dependencies(combined_sources.iter().cloned())
                .with_dependency(format!("examples/{}.js", id))
                .with_dependency(config.clone())
                .with_action(move |ctx| {
                    ctx.output(["%(JAVA)s", "-jar", COMPILER_JAR, "build", config.as_str()])
                })
        },
    )?;

    session.register(Target::virtual_(
        "examples",
        examples.iter().map(|id| format!("examples/{}.json", id)),
    ))?;
    session.register(Target::virtual_(
        "build-examples",
        examples
            .iter()
            .map(|id| format!("examples/{}.combined.js", id)),
    ))?;

    Ok(())
}

/// All JavaScript sources under `<root>/src`, sorted, as root-relative
/// slash-separated names
fn find_sources(root: &Path) -> EngineResult<Vec<String>> {
    let src = root.join("src");
    if !src.is_dir() {
        return Ok(Vec::new());
    }
    let mut sources = Vec::new();
    for entry in WalkDir::new(&src)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        if !file_name.ends_with(".js") || file_name.starts_with('.') {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .expect("walked path is under the project root")
            .to_string_lossy()
            .replace('\\', "/");
        sources.push(relative);
    }
    sources.sort();
    Ok(sources)
}

/// Example page ids: `examples/<id>.html`
fn find_examples(root: &Path) -> Vec<String> {
    let examples = root.join("examples");
    let Ok(entries) = fs::read_dir(&examples) else {
        return Vec::new();
    };
    let mut ids: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            name.strip_suffix(".html").map(ToString::to_string)
        })
        .collect();
    ids.sort();
    ids
}
