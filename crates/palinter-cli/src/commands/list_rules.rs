//! List rules command implementation.

use anyhow::Result;
use palinter_core::config::model::{FolderScope, Rule};
use palinter_core::RuleSet;
use std::fmt::Write;
use std::path::Path;

use crate::config_resolver;

/// Runs the list-rules command.
pub fn run(root: &Path, config: Option<&Path>) -> Result<bool> {
    let rules = config_resolver::load(root, config)?;
    print!("{}", render(&rules));
    Ok(true)
}

fn render(rules: &RuleSet) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<10} {:<9} {:<40} Description", "Kind", "Severity", "Id");
    let _ = writeln!(out, "{}", "-".repeat(80));

    if !rules.global_rules.is_empty() {
        let _ = writeln!(out, "\nglobal_rules:");
        for rule in &rules.global_rules {
            push_rule(&mut out, rule, 1);
        }
    }

    rules.root.walk(&mut |scope: &FolderScope| {
        let _ = write!(out, "\n{}:", scope.path);
        let mut flags = Vec::new();
        if scope.optional {
            flags.push("optional");
        }
        if scope.allow_unconfigured_files {
            flags.push("allow_unconfigured_files");
        }
        if scope.allow_unconfigured_folders {
            flags.push("allow_unconfigured_folders");
        }
        if !flags.is_empty() {
            let _ = write!(out, " ({})", flags.join(", "));
        }
        out.push('\n');
        for rule in &scope.rules {
            push_rule(&mut out, rule, 1);
        }
    });

    let _ = writeln!(out, "\n{} rule(s)", rules.rule_count());
    out
}

fn push_rule(out: &mut String, rule: &Rule, depth: usize) {
    let meta = rule.meta();
    let kind = if meta.non_recursive {
        format!("{}*", rule.kind())
    } else {
        rule.kind().to_string()
    };
    let _ = writeln!(
        out,
        "{}{:<10} {:<9} {:<40} {}",
        "  ".repeat(depth),
        kind,
        meta.severity,
        meta.id,
        meta.description.as_deref().unwrap_or_default()
    );
    if let Rule::OneOf(one_of) = rule {
        for alternative in &one_of.alternatives {
            push_rule(out, alternative, depth + 1);
        }
    }
}
