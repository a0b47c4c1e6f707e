//! Check command implementation.

use anyhow::{Context, Result};
use palinter_core::{Analyzer, Severity};
use std::path::Path;

use crate::config_resolver;
use crate::OutputFormat;

/// Arguments of the check command.
pub struct CheckArgs<'a> {
    /// Project root.
    pub root: &'a Path,
    /// Explicit config path.
    pub config: Option<&'a Path>,
    /// Output format.
    pub format: OutputFormat,
    /// Lowest failing severity.
    pub fail_on: Severity,
    /// Worker threads.
    pub jobs: Option<usize>,
    /// Extra exclude globs.
    pub exclude: Vec<String>,
    /// Honour `.gitignore`.
    pub respect_gitignore: bool,
}

/// Runs the check command.
pub fn run(args: &CheckArgs<'_>) -> Result<bool> {
    let rules = config_resolver::load(args.root, args.config)?;

    let mut builder = Analyzer::builder()
        .root(args.root)
        .rules(rules)
        .excludes(args.exclude.iter().cloned())
        .respect_gitignore(args.respect_gitignore);
    if let Some(jobs) = args.jobs {
        builder = builder.parallelism(jobs);
    }

    let analyzer = builder.build().context("Failed to build analyzer")?;

    tracing::info!(
        "Checking {} with {} rules",
        analyzer.root().display(),
        analyzer.rule_count()
    );

    let result = analyzer.analyze().context("Analysis failed")?;

    super::output::print(&result, args.format, args.fail_on)?;

    Ok(!result.fails(args.fail_on))
}
