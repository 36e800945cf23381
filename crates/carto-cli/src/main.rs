use anyhow::{Context, Result};
use carto_engine::{BuildSession, EngineError, VariableTable};
use clap::Parser;
use std::io::{self, Write};
use std::path::Path;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

mod project;

/// Carto build tool.
///
/// Builds the Carto JavaScript mapping library: merges the sources in
/// dependency order, stamps lint runs, and generates per-example compiler
/// configurations and combined files.
///
/// EXAMPLES:
///     carto                     Build the default target
///     carto build               Build the merged library
///     carto -n build            Report what would be rebuilt
///     carto -c -r all           Clean everything, precious files too
///     carto -g build            Dump the dependency graph
///     carto JAVA=/opt/java/bin/java build-examples
#[derive(Parser)]
#[command(name = "carto")]
#[command(version)]
struct Cli {
    /// Target names to build, or KEY=value variable overrides
    args: Vec<String>,

    /// Recursively clean the requested targets instead of building
    #[arg(short, long)]
    clean: bool,

    /// Emit the dependency graph instead of building
    #[arg(short, long)]
    graph: bool,

    /// Traverse and report staleness decisions without invoking actions
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Allow cleaning of precious targets
    #[arg(short, long)]
    really: bool,

    /// Lower the logging threshold (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn assignment_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^(?P<key>\w+)=(?P<value>.*)$").unwrap())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // environment first, then CLI overrides; the first setter wins
    let mut vars = VariableTable::from_env();
    let mut requested = Vec::new();
    for arg in &cli.args {
        if let Some(captures) = assignment_re().captures(arg) {
            let key = &captures["key"];
            if !vars.set(key, &captures["value"]) {
                tracing::debug!("{} already set, keeping the earlier value", key);
            }
            continue;
        }
        requested.push(arg.clone());
    }

    let mut session = BuildSession::with_variables(vars);
    project::register(&mut session, Path::new("."))?;

    if requested.is_empty() {
        let default = session
            .default_target()
            .context("no targets registered")?
            .to_string();
        requested.push(default);
    }

    for name in &requested {
        if cli.clean {
            session.clean(name, cli.really, true)?;
        } else if cli.graph {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            session.graph(name, &mut out)?;
            out.flush()?;
        } else {
            match session.build(name, cli.dry_run) {
                Ok(_) => {}
                Err(error @ EngineError::Build { .. }) => {
                    tracing::error!("{}", error);
                    std::process::exit(1);
                }
                Err(other) => return Err(other.into()),
            }
        }
    }
    Ok(())
}
