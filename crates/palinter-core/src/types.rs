//! Core types for layout violations and results.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity level for layout violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, but never fails a run on its own.
    Warning,
    /// Must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Violation codes.
pub mod codes {
    /// An expectation of a matched rule failed.
    pub const EXPECTATION_FAILED: &str = "PL001";
    /// No alternative of a matched `one_of` passed.
    pub const ONE_OF_UNSATISFIED: &str = "PL002";
    /// A file matched no rule.
    pub const UNEXPECTED_FILE: &str = "PL003";
    /// A folder matched no rule and is not declared.
    pub const UNEXPECTED_FOLDER: &str = "PL004";
    /// A declared, non-optional folder does not exist.
    pub const MISSING_FOLDER: &str = "PL005";
    /// A file listed in `has_files_in_root` does not exist.
    pub const MISSING_ROOT_FILE: &str = "PL006";
    /// Several root files share a base name.
    pub const DUPLICATE_NAME: &str = "PL007";
    /// File content could not be read as text.
    pub const UNREADABLE_FILE: &str = "PL008";
}

/// Kind of node a violation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A folder.
    Folder,
    /// A file.
    File,
}

/// Where a violation was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Path relative to the project root, always starting with `./`.
    pub path: PathBuf,
    /// Whether the path is a file or a folder.
    pub kind: NodeKind,
}

impl Location {
    /// Creates a file location.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::File,
        }
    }

    /// Creates a folder location.
    #[must_use]
    pub fn folder(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Folder,
        }
    }
}

/// A layout violation found during analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Violation code (e.g., "PL001").
    pub code: String,
    /// Identity of the rule that produced it.
    pub rule: String,
    /// Severity of this violation.
    pub severity: Severity,
    /// Offending node.
    pub location: Location,
    /// Rendered message: the configured `error_msg` when there is one.
    pub message: String,
    /// Generic reason, kept when `message` is a custom text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        rule: impl Into<String>,
        severity: Severity,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            rule: rule.into(),
            severity,
            location,
            message: message.into(),
            detail: None,
        }
    }

    /// Adds the generic reason behind a custom message.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Formats the violation for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!(
            "{} {} at {}\n",
            self.code,
            self.rule,
            self.location.path.display(),
        );
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        if let Some(detail) = &self.detail {
            let _ = writeln!(output, "  = detail: {detail}");
        }
        output
    }

    /// Sort key giving a stable report order.
    fn sort_key(&self) -> (&PathBuf, &str, &str, &str) {
        (&self.location.path, &self.code, &self.rule, &self.message)
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.location.path.display(),
            self.severity,
            self.code,
            self.message
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

/// Result of running a layout analysis.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LintResult {
    /// All violations found, sorted by path.
    pub violations: Vec<Violation>,
    /// Number of files checked.
    pub files_checked: usize,
    /// Number of folders checked, the root included.
    pub folders_checked: usize,
}

impl LintResult {
    /// Creates a new empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == Severity::Error)
    }

    /// Returns true if any violation is at or above `threshold`.
    #[must_use]
    pub fn fails(&self, threshold: Severity) -> bool {
        self.violations.iter().any(|v| v.severity >= threshold)
    }

    /// Returns violations filtered by severity.
    #[must_use]
    pub fn by_severity(&self, severity: Severity) -> Vec<&Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .collect()
    }

    /// Returns `true` if some violation points at `path`.
    #[must_use]
    pub fn has_violations_at(&self, path: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.location.path.as_os_str() == path)
    }

    /// Counts violations by severity as `(errors, warnings)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize) {
        let errors = self
            .violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
            .count();
        (errors, self.violations.len() - errors)
    }

    /// Sorts violations by path, code, rule and message.
    pub fn sort(&mut self) {
        self.violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    }

    /// Formats failing violations as a multi-line report, suitable for
    /// `panic!()` messages in tests.
    #[must_use]
    pub fn format_report(&self, fail_on: Severity) -> String {
        use std::fmt::Write;

        let failing: Vec<&Violation> = self
            .violations
            .iter()
            .filter(|v| v.severity >= fail_on)
            .collect();

        let mut report = String::new();
        let _ = writeln!(report, "\n=== palinter: {} violation(s) ===\n", failing.len());

        for v in &failing {
            let _ = writeln!(report, "{}", v.format());
        }

        let (errors, warnings) = self.count_by_severity();
        let _ = writeln!(
            report,
            "Total: {} error(s), {} warning(s) in {} file(s), {} folder(s)",
            errors, warnings, self.files_checked, self.folders_checked
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_violation(path: &str, severity: Severity, message: &str) -> Violation {
        Violation::new(
            codes::EXPECTATION_FAILED,
            "./src.rules[0]",
            severity,
            Location::file(path),
            message,
        )
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
    }

    #[test]
    fn warnings_alone_do_not_fail() {
        let result = LintResult {
            violations: vec![make_violation("./a.ts", Severity::Warning, "w")],
            ..LintResult::default()
        };
        assert!(!result.has_errors());
        assert!(!result.fails(Severity::Error));
        assert!(result.fails(Severity::Warning));
        assert_eq!(result.count_by_severity(), (0, 1));
    }

    #[test]
    fn sort_is_by_path_first() {
        let mut result = LintResult {
            violations: vec![
                make_violation("./src/b.ts", Severity::Error, "b"),
                make_violation("./src/a.ts", Severity::Warning, "z"),
                make_violation("./src/a.ts", Severity::Error, "a"),
            ],
            ..LintResult::default()
        };
        result.sort();
        let order: Vec<&str> = result.violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(order, vec!["a", "z", "b"]);
        assert!(result.has_violations_at("./src/a.ts"));
        assert!(!result.has_violations_at("./src/c.ts"));
    }

    #[test]
    fn format_includes_detail() {
        let v = make_violation("./icons/A.svg", Severity::Error, "Svg files should be kebab-case")
            .with_detail("should be named in kebab-case");
        insta::assert_snapshot!(v.format(), @r"
        PL001 ./src.rules[0] at ./icons/A.svg
          error: Svg files should be kebab-case
          = detail: should be named in kebab-case
        ");
        assert_eq!(
            v.to_string(),
            "./icons/A.svg: error [PL001] Svg files should be kebab-case (should be named in kebab-case)"
        );
    }

    #[test]
    fn report_lists_only_failing() {
        let result = LintResult {
            violations: vec![
                make_violation("./a.ts", Severity::Warning, "warn"),
                make_violation("./b.ts", Severity::Error, "err"),
            ],
            files_checked: 2,
            folders_checked: 1,
        };
        let report = result.format_report(Severity::Error);
        assert!(report.contains("1 violation(s)"));
        assert!(report.contains("err"));
        assert!(!report.contains("warn\n"));
        assert!(report.contains("Total: 1 error(s), 1 warning(s) in 2 file(s), 1 folder(s)"));
    }
}
