//! Subcommand handlers
//!
//! Each handler prints its report to stdout and returns the exit status.

use crate::output;
use anyhow::{Context, Result};
use clap::ArgMatches;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use wetwire_discover::{DiscoveryEngine, DiscoveryOptions, DiscoveryReport};
use wetwire_graph::{render_dot, render_mermaid, GraphExport, NeedsGraph};
use wetwire_lint::{FixPipeline, LintConfig, ProjectRunner};

fn path_of(args: &ArgMatches) -> PathBuf {
    args.get_one::<PathBuf>("path")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."))
}

fn format_of(args: &ArgMatches) -> &str {
    args.get_one::<String>("format").map_or("text", String::as_str)
}

fn status(failed: bool) -> ExitCode {
    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

/// Config from `--config`, or from the project root, with CLI overrides
fn load_config(root: &Path, args: &ArgMatches) -> Result<LintConfig> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(file) => LintConfig::load(file)?,
        None => LintConfig::discover(root)?,
    };
    if let Some(cycles) = args.get_one::<usize>("max-cycles") {
        config = config.with_max_fix_cycles(*cycles);
    }
    config.validate()?;
    Ok(config)
}

fn discover(root: &Path, config: &LintConfig) -> Result<DiscoveryReport> {
    let options = DiscoveryOptions::default().with_extensions(config.extensions.clone());
    let report = DiscoveryEngine::new(options)
        .discover_directory(root)
        .with_context(|| format!("failed to discover sources under {}", root.display()))?;
    for err in &report.errors {
        eprintln!("error: {err}");
    }
    Ok(report)
}

/// `wetwire lint`
pub(crate) fn lint(args: &ArgMatches) -> Result<ExitCode> {
    let root = path_of(args);
    let fix = args.get_flag("fix");
    let config = load_config(&root, args)?;
    info!(root = %root.display(), fix, max_cycles = config.max_fix_cycles, "lint");

    let runner = ProjectRunner::from_pipeline(FixPipeline::new(config)).with_fix(fix);
    let summary = runner
        .run(&root)
        .with_context(|| format!("lint failed for {}", root.display()))?;

    match format_of(args) {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => print!("{}", output::lint_text(&summary, fix)),
    }
    Ok(status(summary.has_failures()))
}

/// `wetwire graph`
pub(crate) fn graph(args: &ArgMatches) -> Result<ExitCode> {
    let root = path_of(args);
    let config = LintConfig::discover(&root)?;
    let report = discover(&root, &config)?;
    let model = report.model();

    let graphs: Vec<GraphExport> = model
        .workflows
        .iter()
        .map(|workflow| {
            let graph = NeedsGraph::from_workflow(workflow);
            for cycle in graph.cycles() {
                warn!(workflow = %workflow.id, jobs = ?cycle, "needs cycle");
            }
            graph.export()
        })
        .collect();
    info!(workflows = graphs.len(), "exporting needs graphs");

    match format_of(args) {
        "dot" => print!("{}", render_dot(&graphs)),
        "json" => println!("{}", serde_json::to_string_pretty(&graphs)?),
        _ => print!("{}", render_mermaid(&graphs)),
    }
    Ok(status(!report.is_clean()))
}

/// `wetwire list`
pub(crate) fn list(args: &ArgMatches) -> Result<ExitCode> {
    let root = path_of(args);
    let config = LintConfig::discover(&root)?;
    let report = discover(&root, &config)?;

    match format_of(args) {
        "json" => println!("{}", serde_json::to_string_pretty(&report.entities)?),
        _ => print!("{}", output::entities_text(&report.entities)),
    }
    Ok(status(!report.is_clean()))
}
