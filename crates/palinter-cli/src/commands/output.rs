//! Shared output formatting for lint results.

use anyhow::Result;
use palinter_core::{LintResult, Severity};

use crate::OutputFormat;

/// Print lint results in the specified format.
pub fn print(result: &LintResult, format: OutputFormat, fail_on: Severity) -> Result<()> {
    match format {
        OutputFormat::Text => print_text(result, fail_on),
        OutputFormat::Json => return print_json(result),
        OutputFormat::Compact => print_compact(result),
    }
    Ok(())
}

fn print_text(result: &LintResult, fail_on: Severity) {
    let (errors, warnings) = result.count_by_severity();

    for violation in &result.violations {
        let severity_indicator = match violation.severity {
            Severity::Error => "\x1b[31merror\x1b[0m",
            Severity::Warning => "\x1b[33mwarning\x1b[0m",
        };

        println!(
            "{} {} at {}",
            violation.code,
            violation.rule,
            violation.location.path.display(),
        );
        println!("  {}: {}", severity_indicator, violation.message);
        if let Some(detail) = &violation.detail {
            println!("  = detail: {detail}");
        }
        println!();
    }

    let summary_color = if result.fails(fail_on) {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    println!(
        "{}Found {} error(s), {} warning(s) in {} file(s), {} folder(s)\x1b[0m",
        summary_color, errors, warnings, result.files_checked, result.folders_checked
    );
}

fn print_json(result: &LintResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    println!("{json}");
    Ok(())
}

fn print_compact(result: &LintResult) {
    for violation in &result.violations {
        println!("{violation}");
    }
}
