//! Config self-tests: run a rule set against inline example projects and
//! compare the reported violations with the expected ones.
//!
//! A case file is YAML:
//!
//! ```yaml
//! config: { ... }              # optional, else the rule set under test
//! expect_config_error: text    # optional, substring of the config error
//! projects:
//!   - structure:
//!       /src:
//!         index.ts: "export {}"
//!     expected_errors: ["./src/index.ts: should be named"]
//!     expected_warnings: []
//!     only: false
//! ```
//!
//! Violations are rendered as `path: message`; each expected entry must be
//! a substring of a distinct violation of the right severity, and no other
//! violation may be reported.

use crate::config::{ConfigError, RuleSet};
use crate::tree;
use crate::types::{LintResult, Severity, Violation};
use crate::walker;

use rayon::prelude::*;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that prevent the self-test run as a whole.
#[derive(Debug, Error)]
pub enum SelfTestError {
    /// The cases directory could not be listed.
    #[error("failed to list test cases: {0}")]
    Walk(#[from] walkdir::Error),

    /// The directory holds no case file.
    #[error("no test case files (*.yaml, *.yml) found in {}", .0.display())]
    NoCases(PathBuf),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CaseDto {
    #[serde(default)]
    config: Option<serde_json::Value>,
    #[serde(default)]
    expect_config_error: Option<String>,
    #[serde(default)]
    projects: Vec<ProjectDto>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectDto {
    structure: serde_json::Value,
    #[serde(default)]
    expected_errors: Vec<String>,
    #[serde(default)]
    expected_warnings: Vec<String>,
    #[serde(default)]
    only: bool,
}

/// A failed case or project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseFailure {
    /// Case file.
    pub file: PathBuf,
    /// 1-based project index, `None` for file-level problems.
    pub project: Option<usize>,
    /// What went wrong.
    pub problems: Vec<String>,
}

impl fmt::Display for CaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.project {
            Some(n) => writeln!(f, "Test case '{}' - project {n}:", self.file.display())?,
            None => writeln!(f, "Test case '{}':", self.file.display())?,
        }
        for problem in &self.problems {
            writeln!(f, "  • {problem}")?;
        }
        Ok(())
    }
}

/// Outcome of a self-test run.
#[derive(Debug, Clone, Default)]
pub struct SelfTestReport {
    /// Number of case files read.
    pub cases: usize,
    /// Number of projects checked.
    pub projects: usize,
    /// Only projects marked `only` were run.
    pub focused: bool,
    /// Failed cases and projects.
    pub failures: Vec<CaseFailure>,
}

impl SelfTestReport {
    /// Returns `true` if every case passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs every case file under `dir`. `rules` is used by cases without a
/// `config` of their own.
///
/// # Errors
///
/// Returns an error if `dir` cannot be listed or holds no case file.
/// Problems inside case files are reported as failures instead.
pub fn run_dir(dir: &Path, rules: Option<&RuleSet>) -> Result<SelfTestReport, SelfTestError> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).follow_links(false) {
        let entry = entry?;
        let is_case = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|e| e == "yaml" || e == "yml");
        if is_case {
            files.push(entry.into_path());
        }
    }
    files.sort();
    if files.is_empty() {
        return Err(SelfTestError::NoCases(dir.to_path_buf()));
    }
    info!("Found {} test case file(s) in {}", files.len(), dir.display());

    let cases: Vec<(PathBuf, Result<CaseDto, String>)> = files
        .into_iter()
        .map(|path| {
            let parsed = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read file: {e}"))
                .and_then(|text| serde_yaml::from_str(&text).map_err(|e| format!("invalid case file: {e}")));
            (path, parsed)
        })
        .collect();

    let focused = cases
        .iter()
        .filter_map(|(_, case)| case.as_ref().ok())
        .any(|case| case.projects.iter().any(|p| p.only));

    let outcomes: Vec<(usize, Vec<CaseFailure>)> = cases
        .par_iter()
        .map(|(path, case)| match case {
            Err(reason) => (0, vec![file_failure(path, vec![reason.clone()])]),
            Ok(case) => run_case(path, case, rules, focused),
        })
        .collect();

    let report = SelfTestReport {
        cases: outcomes.len(),
        projects: outcomes.iter().map(|(n, _)| n).sum(),
        focused,
        failures: outcomes.into_iter().flat_map(|(_, f)| f).collect(),
    };
    info!(
        "Self-test: {} case file(s), {} project(s), {} failure(s)",
        report.cases,
        report.projects,
        report.failures.len()
    );
    Ok(report)
}

fn run_case(
    path: &Path,
    case: &CaseDto,
    fallback: Option<&RuleSet>,
    focused: bool,
) -> (usize, Vec<CaseFailure>) {
    debug!("Running test case {}", path.display());

    let loaded: Result<std::borrow::Cow<'_, RuleSet>, String> = match (&case.config, fallback) {
        (Some(value), _) => RuleSet::from_value(value.clone())
            .map(std::borrow::Cow::Owned)
            .map_err(|e: ConfigError| e.to_string()),
        (None, Some(rules)) => Ok(std::borrow::Cow::Borrowed(rules)),
        (None, None) => Err("case has no `config` and no config file was given".to_string()),
    };

    let rules = match (loaded, &case.expect_config_error) {
        (Err(error), Some(expected)) if error.contains(expected.as_str()) => return (0, Vec::new()),
        (Err(error), Some(expected)) => {
            return (
                0,
                vec![file_failure(
                    path,
                    vec![format!("expected config error containing `{expected}`, got: {error}")],
                )],
            )
        }
        (Err(error), None) => return (0, vec![file_failure(path, vec![error])]),
        (Ok(_), Some(expected)) => {
            return (
                0,
                vec![file_failure(
                    path,
                    vec![format!("expected config error containing `{expected}`, config loaded")],
                )],
            )
        }
        (Ok(rules), None) => rules,
    };

    let mut failures = Vec::new();
    let mut run = 0;
    for (i, project) in case.projects.iter().enumerate() {
        if focused && !project.only {
            continue;
        }
        run += 1;
        let problems = match tree::from_structure(&project.structure) {
            Err(reason) => vec![format!("invalid structure: {reason}")],
            Ok(root) => compare(&walker::walk(&rules, &root), project),
        };
        if !problems.is_empty() {
            failures.push(CaseFailure {
                file: path.to_path_buf(),
                project: Some(i + 1),
                problems,
            });
        }
    }
    (run, failures)
}

fn compare(result: &LintResult, project: &ProjectDto) -> Vec<String> {
    let mut problems = match_expected(
        &result.by_severity(Severity::Error),
        &project.expected_errors,
        "error",
    );
    problems.extend(match_expected(
        &result.by_severity(Severity::Warning),
        &project.expected_warnings,
        "warning",
    ));
    problems
}

fn match_expected(reported: &[&Violation], expected: &[String], kind: &str) -> Vec<String> {
    let lines: Vec<String> = reported
        .iter()
        .map(|v| format!("{}: {}", v.location.path.display(), v.message))
        .collect();
    let mut used = vec![false; lines.len()];
    let mut problems = Vec::new();

    for want in expected {
        let want = want.trim();
        let hit = lines
            .iter()
            .enumerate()
            .position(|(i, line)| !used[i] && line.contains(want));
        match hit {
            Some(i) => used[i] = true,
            None => problems.push(format!("expected {kind} not reported: {want}")),
        }
    }
    for (line, _) in lines.iter().zip(&used).filter(|(_, used)| !**used) {
        problems.push(format!("unexpected {kind}: {line}"));
    }
    problems
}

fn file_failure(path: &Path, problems: Vec<String>) -> CaseFailure {
    CaseFailure {
        file: path.to_path_buf(),
        project: None,
        problems,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use std::fs;

    const CONFIG: &str = r"
./:
  /icons:
    rules:
      - if_file: { has_extension: svg }
        expect: { name_case_is: kebab-case }
";

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn passing_and_failing_projects() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "icons.yaml",
            r#"
projects:
  - structure:
      /icons:
        arrow-left.svg: ""
    expected_errors: []
  - structure:
      /icons:
        ArrowLeft.svg: ""
    expected_errors:
      - "./icons/ArrowLeft.svg: should be named in kebab-case"
  - structure:
      /icons:
        ArrowLeft.svg: ""
    expected_errors: []
"#,
        );
        let rules = RuleSet::parse(CONFIG, ConfigFormat::Yaml).unwrap();
        let report = run_dir(dir.path(), Some(&rules)).unwrap();

        assert_eq!(report.cases, 1);
        assert_eq!(report.projects, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].project, Some(3));
        assert_eq!(
            report.failures[0].problems,
            vec!["unexpected error: ./icons/ArrowLeft.svg: should be named in kebab-case".to_string()]
        );
    }

    #[test]
    fn inline_config_and_expected_config_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a_inline.yaml",
            r#"
config:
  ./:
    allow_unconfigured_files: true
projects:
  - structure: { "a.md": "" }
"#,
        );
        write(
            dir.path(),
            "b_broken.yml",
            r"
config:
  global_rules: [missing_block]
expect_config_error: unknown block `missing_block`
",
        );
        let report = run_dir(dir.path(), None).unwrap();
        assert!(report.passed(), "{:?}", report.failures);
        assert_eq!(report.cases, 2);
        assert_eq!(report.projects, 1);
    }

    #[test]
    fn only_focuses_projects() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "focus.yaml",
            r#"
projects:
  - structure: { "/icons": { "Bad.svg": "" } }
  - structure: { "/icons": { "good.svg": "" } }
    only: true
"#,
        );
        let rules = RuleSet::parse(CONFIG, ConfigFormat::Yaml).unwrap();
        let report = run_dir(dir.path(), Some(&rules)).unwrap();
        assert!(report.focused);
        assert_eq!(report.projects, 1);
        assert!(report.passed());
    }

    #[test]
    fn broken_case_file_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.yaml", "projects: 3");
        let report = run_dir(dir.path(), None).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].problems[0].starts_with("invalid case file"));
    }

    #[test]
    fn empty_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(run_dir(dir.path(), None), Err(SelfTestError::NoCases(_))));
    }
}
