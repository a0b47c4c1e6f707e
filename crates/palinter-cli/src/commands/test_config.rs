//! Test-config command implementation.

use anyhow::{Context, Result};
use palinter_core::selftest;
use std::path::Path;

use crate::config_resolver::{self, ConfigSource};

/// Runs the test-config command.
///
/// Cases without a `config` of their own use the resolved config, when
/// there is one.
pub fn run(dir: &Path, config: Option<&Path>) -> Result<bool> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let rules = match config_resolver::resolve(&cwd, config) {
        ConfigSource::NotFound => None,
        _ => Some(config_resolver::load(&cwd, config)?),
    };

    let report = selftest::run_dir(dir, rules.as_ref())
        .with_context(|| format!("Failed to run test cases in {}", dir.display()))?;

    for failure in &report.failures {
        print!("{failure}");
    }
    if report.focused {
        println!("\x1b[33mOnly projects marked `only` were run\x1b[0m");
    }

    if report.passed() {
        println!(
            "\x1b[32m✓ {} case file(s), {} project(s) passed\x1b[0m",
            report.cases, report.projects
        );
    } else {
        println!(
            "\x1b[31m✗ {} failure(s) in {} case file(s), {} project(s)\x1b[0m",
            report.failures.len(),
            report.cases,
            report.projects
        );
    }

    Ok(report.passed() && !report.focused)
}
