//! Analyzer facade: snapshot a project and walk it with a rule set.

use crate::config::model::{GlobPattern, ModelError, RuleSet};
use crate::tree::{self, FolderNode, SnapshotOptions};
use crate::types::LintResult;
use crate::walker;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during analysis.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// IO error resolving the root.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Root is not a directory.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Directory traversal failed.
    #[error("failed to read directory tree: {0}")]
    Walk(#[from] ignore::Error),

    /// Exclude pattern is invalid.
    #[error("invalid exclude pattern: {0}")]
    Exclude(#[from] ModelError),

    /// Worker pool could not be created.
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Builder for configuring an [`Analyzer`].
#[derive(Debug)]
pub struct AnalyzerBuilder {
    root: Option<PathBuf>,
    rules: RuleSet,
    exclude_patterns: Vec<String>,
    parallelism: Option<usize>,
    respect_gitignore: bool,
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self {
            root: None,
            rules: RuleSet::default(),
            exclude_patterns: Vec::new(),
            parallelism: None,
            respect_gitignore: true,
        }
    }
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root directory to analyze.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Sets the resolved rules.
    #[must_use]
    pub fn rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Adds an exclude glob pattern, on top of the config's `ignore` list.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Adds multiple exclude glob patterns.
    #[must_use]
    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sets the number of worker threads (default: one per CPU).
    #[must_use]
    pub fn parallelism(mut self, jobs: usize) -> Self {
        self.parallelism = Some(jobs);
        self
    }

    /// Sets whether `.gitignore` files are honoured (default: true).
    #[must_use]
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Builds the analyzer.
    ///
    /// # Errors
    ///
    /// Returns an error if the root doesn't exist or an exclude pattern is
    /// invalid.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let root = self.root.unwrap_or_else(|| PathBuf::from("."));
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(&root)
        };
        if !root.is_dir() {
            return Err(AnalyzerError::NotADirectory(root));
        }

        let mut ignore = self.rules.ignore.clone();
        for pattern in &self.exclude_patterns {
            ignore.push(GlobPattern::new(pattern)?);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism.unwrap_or(0))
            .thread_name(|i| format!("palinter-{i}"))
            .build()?;

        Ok(Analyzer {
            root,
            rules: self.rules,
            ignore,
            respect_gitignore: self.respect_gitignore,
            pool,
        })
    }
}

/// The main analyzer that orchestrates a layout check.
///
/// Use [`Analyzer::builder()`] to construct an instance.
#[derive(Debug)]
pub struct Analyzer {
    root: PathBuf,
    rules: RuleSet,
    ignore: Vec<GlobPattern>,
    respect_gitignore: bool,
    pool: rayon::ThreadPool,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Returns the root directory being analyzed.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the number of resolved rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.rule_count()
    }

    /// Snapshots the root directory and checks it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory tree cannot be read. Unreadable
    /// file contents are violations, not errors.
    pub fn analyze(&self) -> Result<LintResult, AnalyzerError> {
        info!("Starting analysis at {:?}", self.root);

        let snapshot = tree::snapshot(
            &self.root,
            &SnapshotOptions {
                respect_gitignore: self.respect_gitignore,
                ignore: &self.ignore,
            },
        )?;

        let result = self.analyze_tree(&snapshot);

        info!(
            "Analysis complete: {} violations in {} files, {} folders",
            result.violations.len(),
            result.files_checked,
            result.folders_checked
        );

        Ok(result)
    }

    /// Checks an already built snapshot.
    #[must_use]
    pub fn analyze_tree(&self, snapshot: &FolderNode) -> LintResult {
        debug!(
            "Walking with {} rule(s) on {} thread(s)",
            self.rule_count(),
            self.pool.current_num_threads()
        );
        self.pool.install(|| walker::walk(&self.rules, snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;
    use std::fs;

    #[test]
    fn test_builder() {
        let analyzer = Analyzer::builder()
            .root(".")
            .exclude("target")
            .parallelism(2)
            .build()
            .expect("Failed to build analyzer");

        assert!(analyzer.root().exists());
        assert_eq!(analyzer.rule_count(), 0);
    }

    #[test]
    fn test_missing_root() {
        let err = Analyzer::builder()
            .root("/nonexistent/palinter/root")
            .build()
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::NotADirectory(_)));
    }

    #[test]
    fn test_invalid_exclude() {
        let err = Analyzer::builder().root(".").exclude("[").build().unwrap_err();
        assert!(matches!(err, AnalyzerError::Exclude(_)));
    }

    #[test]
    fn test_analyze_disk_with_excludes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/build")).unwrap();
        fs::write(dir.path().join("src/index.ts"), "export {}").unwrap();
        fs::write(dir.path().join("src/notes.md"), "").unwrap();
        fs::write(dir.path().join("src/build/out.md"), "").unwrap();

        let rules = RuleSet::parse(
            r"
./:
  /src:
    rules:
      - if_file: { has_extension: ts }
        expect: any
      - if_folder: any
        expect: any
",
            ConfigFormat::Yaml,
        )
        .unwrap();

        let result = Analyzer::builder()
            .root(dir.path())
            .rules(rules)
            .exclude("**/*.md")
            .parallelism(1)
            .build()
            .unwrap()
            .analyze()
            .unwrap();

        assert!(result.violations.is_empty(), "{}", result.format_report(crate::Severity::Warning));
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.folders_checked, 3);
    }
}
