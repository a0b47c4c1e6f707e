//! Pure domain model for resolved layout rules.
//!
//! This module contains no serde and no I/O. Every pattern and template is
//! compiled at construction time; block references are already expanded and
//! `one_of` alternatives are flattened.

use crate::case::{NameCase, UnknownCase};
use crate::context::MatchContext;
use crate::pattern::{Captures, ContentPattern, NamePattern, PatternError, PatternSyntax};
use crate::template::{Template, TemplateError, Unresolved};
use crate::types::Severity;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

// ────────────────────────────────────────────
// Validated building blocks
// ────────────────────────────────────────────

/// A validated glob used by the `ignore` list, matched against paths
/// relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    raw: String,
    compiled: glob::Pattern,
}

impl GlobPattern {
    /// Creates a new glob pattern.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is empty or has invalid glob syntax.
    pub fn new(pattern: &str) -> Result<Self, ModelError> {
        if pattern.is_empty() {
            return Err(ModelError::EmptyGlobPattern);
        }
        let compiled = glob::Pattern::new(pattern).map_err(|e| ModelError::InvalidGlobPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests a root-relative path. Patterns without a `/` also match the
    /// last path component, so `node_modules` ignores that folder anywhere.
    #[must_use]
    pub fn matches(&self, relative: &Path) -> bool {
        if self.compiled.matches_path(relative) {
            return true;
        }
        !self.raw.contains('/')
            && relative
                .file_name()
                .is_some_and(|name| self.compiled.matches(&name.to_string_lossy()))
    }

    /// Returns the pattern as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// A pattern whose compilation needs one of the two pattern flavours.
pub trait CompilePattern: Clone + Sized {
    /// Compiles a rendered pattern string.
    ///
    /// # Errors
    ///
    /// Returns error if the pattern is invalid.
    fn compile(raw: &str) -> Result<Self, PatternError>;

    /// How values substituted into `raw` must be escaped.
    fn syntax(raw: &str) -> PatternSyntax;
}

impl CompilePattern for NamePattern {
    fn compile(raw: &str) -> Result<Self, PatternError> {
        Self::new(raw)
    }

    fn syntax(raw: &str) -> PatternSyntax {
        PatternSyntax::of_name(raw)
    }
}

impl CompilePattern for ContentPattern {
    fn compile(raw: &str) -> Result<Self, PatternError> {
        Self::new(raw)
    }

    fn syntax(raw: &str) -> PatternSyntax {
        PatternSyntax::of_content(raw)
    }
}

/// Failure to turn a templated pattern into a concrete one at runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// A reference has no value in the current match context.
    #[error(transparent)]
    Unresolved(#[from] Unresolved),
    /// The rendered pattern does not compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// A pattern that may contain template references.
///
/// Patterns without references are compiled once here. Templated ones are
/// checked by compiling a sample rendering, then compiled per match.
#[derive(Debug, Clone)]
pub struct TemplatedPattern<P> {
    template: Template,
    syntax: PatternSyntax,
    fixed: Option<P>,
}

impl<P: CompilePattern> TemplatedPattern<P> {
    /// Parses and validates a pattern template.
    ///
    /// # Errors
    ///
    /// Returns error if the template or the pattern is malformed.
    pub fn new(raw: &str) -> Result<Self, ModelError> {
        let template = Template::parse(raw)?;
        let syntax = P::syntax(raw);
        let fixed = if let Some(text) = template.literal_text() {
            Some(P::compile(&text)?)
        } else {
            let sample = template
                .render(|_| Some("x".to_string()), |v| syntax.escape(v))
                .map_err(|e| ModelError::InvalidTemplate(e.to_string()))?;
            P::compile(&sample)?;
            None
        };
        Ok(Self {
            template,
            syntax,
            fixed,
        })
    }

    /// Returns the underlying template.
    #[must_use]
    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Renders against `ctx`, returning the concrete pattern and its text.
    ///
    /// # Errors
    ///
    /// Returns error if a reference is unresolved or the rendering does not
    /// compile.
    pub fn resolve(&self, ctx: &MatchContext<'_>) -> Result<(Cow<'_, P>, String), ResolveError> {
        if let Some(fixed) = &self.fixed {
            return Ok((Cow::Borrowed(fixed), self.template.render_lossy(|_| None)));
        }
        let rendered = self
            .template
            .render(|r| ctx.resolve(r), |v| self.syntax.escape(v))?;
        let pattern = P::compile(&rendered)?;
        let display = self.template.render_lossy(|r| ctx.resolve(r));
        Ok((Cow::Owned(pattern), display))
    }
}

// ────────────────────────────────────────────
// Conditions
// ────────────────────────────────────────────

/// Selects the files a rule applies to.
#[derive(Debug, Clone)]
pub enum FileCondition {
    /// Every file.
    Any,
    /// Files passing all configured filters.
    Match(FileFilter),
}

/// Filters of an `if_file` object; unset filters always pass.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// File name ends with `.<ext>` for one of these.
    pub has_extension: Vec<String>,
    /// File name matches one of these; captures come from the first match.
    pub has_name: Vec<NamePattern>,
    /// Leading segment follows this case.
    pub has_name_case: Option<NameCase>,
    /// File name matches none of these.
    pub does_not_have_name: Vec<NamePattern>,
}

impl FileCondition {
    /// Evaluates the condition against a file name.
    #[must_use]
    pub fn evaluate(&self, file_name: &str) -> Option<Captures> {
        let Self::Match(filter) = self else {
            return Some(Captures::default());
        };
        if !filter.has_extension.is_empty()
            && !filter
                .has_extension
                .iter()
                .any(|ext| has_extension(file_name, ext))
        {
            return None;
        }
        if filter.has_name_case.is_some_and(|case| !case.matches(file_name)) {
            return None;
        }
        if filter.does_not_have_name.iter().any(|p| p.is_match(file_name)) {
            return None;
        }
        if filter.has_name.is_empty() {
            return Some(Captures::default());
        }
        filter.has_name.iter().find_map(|p| p.captures(file_name))
    }

    /// Capture groups guaranteed whenever the condition matches.
    #[must_use]
    pub fn min_groups(&self) -> usize {
        match self {
            Self::Any => 0,
            Self::Match(f) => min_group_count(&f.has_name),
        }
    }

    /// Named groups the condition may define.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        match self {
            Self::Any => Vec::new(),
            Self::Match(f) => collect_group_names(f.has_name.iter()),
        }
    }
}

/// Selects the folders a rule applies to.
#[derive(Debug, Clone)]
pub enum FolderCondition {
    /// Every folder.
    Any,
    /// Folders passing all configured filters.
    Match(FolderFilter),
}

/// Filters of an `if_folder` object.
#[derive(Debug, Clone, Default)]
pub struct FolderFilter {
    /// Folder name matches one of these.
    pub has_name: Vec<NamePattern>,
    /// Leading segment follows this case.
    pub has_name_case: Option<NameCase>,
    /// Folder name matches none of these.
    pub does_not_have_name: Vec<NamePattern>,
    /// Selects folders with at least one root file matching this pattern
    /// and reports base names shared by several of them.
    pub duplicate_root_name: Option<NamePattern>,
}

impl FolderCondition {
    /// Evaluates the condition against a folder and its root file names
    /// (in lexicographic order).
    #[must_use]
    pub fn evaluate<'n>(
        &self,
        folder_name: &str,
        mut root_files: impl Iterator<Item = &'n str>,
    ) -> Option<Captures> {
        let Self::Match(filter) = self else {
            return Some(Captures::default());
        };
        if filter.has_name_case.is_some_and(|case| !case.matches(folder_name)) {
            return None;
        }
        if filter
            .does_not_have_name
            .iter()
            .any(|p| p.is_match(folder_name))
        {
            return None;
        }
        let mut captures = if filter.has_name.is_empty() {
            Captures::default()
        } else {
            filter.has_name.iter().find_map(|p| p.captures(folder_name))?
        };
        if let Some(pattern) = &filter.duplicate_root_name {
            let file_caps = root_files.find_map(|name| pattern.captures(name))?;
            captures = captures.merge(file_caps);
        }
        Some(captures)
    }

    /// Capture groups guaranteed whenever the condition matches.
    #[must_use]
    pub fn min_groups(&self) -> usize {
        match self {
            Self::Any => 0,
            Self::Match(f) if !f.has_name.is_empty() => min_group_count(&f.has_name),
            Self::Match(f) => f
                .duplicate_root_name
                .as_ref()
                .map_or(0, NamePattern::group_count),
        }
    }

    /// Named groups the condition may define.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        match self {
            Self::Any => Vec::new(),
            Self::Match(f) => {
                collect_group_names(f.has_name.iter().chain(f.duplicate_root_name.as_ref()))
            }
        }
    }
}

/// Returns `true` if `file_name` ends with `.<ext>`.
#[must_use]
pub fn has_extension(file_name: &str, ext: &str) -> bool {
    file_name
        .strip_suffix(ext)
        .is_some_and(|stem| stem.len() > 1 && stem.ends_with('.'))
}

fn min_group_count(patterns: &[NamePattern]) -> usize {
    patterns
        .iter()
        .map(NamePattern::group_count)
        .min()
        .unwrap_or(0)
}

fn collect_group_names<'p>(patterns: impl Iterator<Item = &'p NamePattern>) -> Vec<String> {
    let mut names: Vec<String> = patterns
        .flat_map(|p| p.group_names().map(str::to_string).collect::<Vec<_>>())
        .collect();
    names.sort();
    names.dedup();
    names
}

// ────────────────────────────────────────────
// Expectations
// ────────────────────────────────────────────

/// The `expect` of a file or folder rule.
#[derive(Debug, Clone)]
pub enum Expectations<E> {
    /// Every matched node is accepted.
    Any,
    /// Every matched node is rejected.
    None,
    /// Each entry is checked independently; each failing predicate yields
    /// its own violation.
    Each(Vec<E>),
}

/// How a content constraint combines its patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    /// At least one pattern's count is within bounds.
    Some,
    /// Every pattern's count is within bounds.
    Every,
}

/// A content-matching constraint with multiplicity bounds.
#[derive(Debug, Clone)]
pub struct ContentConstraint {
    /// Combinator over `patterns`.
    pub quantifier: Quantifier,
    /// Patterns whose occurrences are counted.
    pub patterns: Vec<TemplatedPattern<ContentPattern>>,
    /// Minimum occurrences (default 1).
    pub at_least: usize,
    /// Maximum occurrences, unbounded if unset.
    pub at_most: Option<usize>,
}

impl ContentConstraint {
    /// Returns `true` if `count` respects the bounds.
    #[must_use]
    pub fn within_bounds(&self, count: usize) -> bool {
        count >= self.at_least && self.at_most.map_or(true, |max| count <= max)
    }
}

/// One expectation object of a file rule.
#[derive(Debug, Clone, Default)]
pub struct FileExpect {
    /// Leading segment follows this case.
    pub name_case_is: Option<NameCase>,
    /// Name matches one of these.
    pub name_is: Vec<TemplatedPattern<NamePattern>>,
    /// Name matches none of these.
    pub name_is_not: Vec<TemplatedPattern<NamePattern>>,
    /// Name ends with one of these extensions.
    pub extension_is: Vec<String>,
    /// Each pattern is matched by some other file in the same folder.
    pub has_sibling_file: Vec<TemplatedPattern<NamePattern>>,
    /// Name without its final extension contains none of these.
    pub name_not_includes_any: Vec<String>,
    /// Every constraint passes.
    pub content_matches: Vec<ContentConstraint>,
    /// At least one constraint passes.
    pub content_matches_some: Vec<ContentConstraint>,
    /// Content contains none of these.
    pub content_not_matches: Vec<TemplatedPattern<ContentPattern>>,
    /// Message used for violations of this expectation.
    pub error_msg: Option<Template>,
}

impl FileExpect {
    /// Returns `true` if evaluating this expectation reads file content.
    #[must_use]
    pub fn needs_content(&self) -> bool {
        !self.content_matches.is_empty()
            || !self.content_matches_some.is_empty()
            || !self.content_not_matches.is_empty()
    }
}

/// Root-file predicates of a folder expectation.
#[derive(Debug, Clone, Default)]
pub struct RootFilesExpect {
    /// Each pattern matches at least one root file.
    pub has: Vec<TemplatedPattern<NamePattern>>,
    /// No root file matches any of these.
    pub does_not_have: Vec<TemplatedPattern<NamePattern>>,
    /// No two root files share a base name under this pattern.
    pub does_not_have_duplicate_name: Option<NamePattern>,
}

/// One expectation object of a folder rule.
#[derive(Debug, Clone, Default)]
pub struct FolderExpect {
    /// Leading segment follows this case.
    pub name_case_is: Option<NameCase>,
    /// Name matches one of these.
    pub name_is: Vec<TemplatedPattern<NamePattern>>,
    /// Name matches none of these.
    pub name_is_not: Vec<TemplatedPattern<NamePattern>>,
    /// Root-file predicates.
    pub root_files: RootFilesExpect,
    /// Message used for violations of this expectation.
    pub error_msg: Option<Template>,
}

// ────────────────────────────────────────────
// Rules
// ────────────────────────────────────────────

/// Attributes shared by every rule kind.
#[derive(Debug, Clone)]
pub struct RuleMeta {
    /// Stable identity used in reports.
    pub id: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Message used when an expectation has none of its own.
    pub error_msg: Option<Template>,
    /// `Warning` when `is_warning` is set.
    pub severity: Severity,
    /// Confines the rule to direct children of its folder.
    pub non_recursive: bool,
    /// Matching does not count as "configured".
    pub not_touch: bool,
}

/// An `if_file` rule.
#[derive(Debug, Clone)]
pub struct FileRule {
    /// Shared attributes.
    pub meta: RuleMeta,
    /// Which files are selected.
    pub condition: FileCondition,
    /// What selected files must satisfy.
    pub expect: Expectations<FileExpect>,
}

/// An `if_folder` rule.
#[derive(Debug, Clone)]
pub struct FolderRule {
    /// Shared attributes.
    pub meta: RuleMeta,
    /// Which folders are selected.
    pub condition: FolderCondition,
    /// What selected folders must satisfy.
    pub expect: Expectations<FolderExpect>,
}

/// A `one_of` rule. Alternatives never contain nested `one_of`s.
#[derive(Debug, Clone)]
pub struct OneOfRule {
    /// Shared attributes.
    pub meta: RuleMeta,
    /// Alternatives in declaration order.
    pub alternatives: Vec<Rule>,
}

/// A resolved rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Applies to files.
    File(FileRule),
    /// Applies to folders.
    Folder(FolderRule),
    /// Satisfied by any one alternative.
    OneOf(OneOfRule),
}

impl Rule {
    /// Returns the shared attributes.
    #[must_use]
    pub fn meta(&self) -> &RuleMeta {
        match self {
            Self::File(r) => &r.meta,
            Self::Folder(r) => &r.meta,
            Self::OneOf(r) => &r.meta,
        }
    }

    /// Returns the rule identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.meta().id
    }

    /// Returns `true` if the rule also applies below the folder that
    /// declares it.
    #[must_use]
    pub fn is_recursive(&self) -> bool {
        !self.meta().non_recursive
    }

    /// Returns `true` if the rule (or an alternative) selects files.
    #[must_use]
    pub fn targets_files(&self) -> bool {
        match self {
            Self::File(_) => true,
            Self::Folder(_) => false,
            Self::OneOf(r) => r.alternatives.iter().any(Self::targets_files),
        }
    }

    /// Returns `true` if the rule (or an alternative) selects folders.
    #[must_use]
    pub fn targets_folders(&self) -> bool {
        match self {
            Self::File(_) => false,
            Self::Folder(_) => true,
            Self::OneOf(r) => r.alternatives.iter().any(Self::targets_folders),
        }
    }

    /// Short label of the rule kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "if_file",
            Self::Folder(_) => "if_folder",
            Self::OneOf(_) => "one_of",
        }
    }
}

// ────────────────────────────────────────────
// Folder tree and aggregate root
// ────────────────────────────────────────────

/// Rules and constraints attached to one declared folder.
#[derive(Debug, Clone, Default)]
pub struct FolderScope {
    /// Path of the folder relative to the root, e.g. `./src/stores`.
    pub path: String,
    /// Local rules, applied to the folder's children.
    pub rules: Vec<Rule>,
    /// Files that must exist directly in this folder.
    pub has_files_in_root: Vec<NamePattern>,
    /// Files matched by no rule are accepted.
    pub allow_unconfigured_files: bool,
    /// Folders matched by no rule are accepted.
    pub allow_unconfigured_folders: bool,
    /// A missing folder is not a violation.
    pub optional: bool,
    /// Appended to "file is not expected" messages.
    pub unexpected_files_error_msg: Option<String>,
    /// Appended to "folder is not expected" messages.
    pub unexpected_folders_error_msg: Option<String>,
    /// Declared subfolders keyed by name.
    pub folders: BTreeMap<String, FolderScope>,
}

impl FolderScope {
    /// Visits this scope and every declared descendant, parents first.
    pub fn walk<'s>(&'s self, visit: &mut impl FnMut(&'s FolderScope)) {
        visit(self);
        for child in self.folders.values() {
            child.walk(visit);
        }
    }
}

/// The resolved configuration consumed by the tree walker.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// The root folder scope (`./`).
    pub root: FolderScope,
    /// Rules appended to every folder's rule list, evaluated last.
    pub global_rules: Vec<Rule>,
    /// Paths skipped when the directory snapshot is taken.
    pub ignore: Vec<GlobPattern>,
    /// Extensions whose content is read; other files read as empty.
    pub analyze_content_of_files_types: Option<Vec<String>>,
}

impl RuleSet {
    /// Total number of resolved rules, globals counted once.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        let mut count = self.global_rules.len();
        self.root.walk(&mut |scope| count += scope.rules.len());
        count
    }

    /// Returns `true` if content of files named `file_name` is analyzed.
    #[must_use]
    pub fn analyzes_content_of(&self, file_name: &str) -> bool {
        self.analyze_content_of_files_types
            .as_ref()
            .map_or(true, |exts| exts.iter().any(|ext| has_extension(file_name, ext)))
    }
}

// ────────────────────────────────────────────
// Error types
// ────────────────────────────────────────────

/// Errors from model construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Glob pattern is empty.
    #[error("glob pattern must not be empty")]
    EmptyGlobPattern,

    /// Glob pattern has invalid syntax.
    #[error("invalid glob pattern `{pattern}`: {reason}")]
    InvalidGlobPattern {
        /// The invalid pattern.
        pattern: String,
        /// Why it's invalid.
        reason: String,
    },

    /// Name or content pattern failed to compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Template failed to parse.
    #[error("{0}")]
    InvalidTemplate(String),

    /// Unknown name case.
    #[error(transparent)]
    Case(#[from] UnknownCase),

    /// Extension is empty or starts with a dot.
    #[error("invalid extension `{0}`: expected e.g. `ts`, `d.ts`")]
    InvalidExtension(String),

    /// `at_least` is greater than `at_most`.
    #[error("at_least ({at_least}) is greater than at_most ({at_most})")]
    InvertedBounds {
        /// Lower bound.
        at_least: usize,
        /// Upper bound.
        at_most: usize,
    },

    /// A reference cannot be resolved by any match.
    #[error("unresolvable reference `{reference}`: {reason}")]
    UnresolvableReference {
        /// The reference as written.
        reference: String,
        /// Why it can never resolve.
        reason: String,
    },
}

impl From<TemplateError> for ModelError {
    fn from(e: TemplateError) -> Self {
        Self::InvalidTemplate(e.to_string())
    }
}

impl fmt::Display for Quantifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Some => f.write_str("some"),
            Self::Every => f.write_str("every"),
        }
    }
}

// ────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Inherited;

    fn name(p: &str) -> NamePattern {
        NamePattern::new(p).unwrap()
    }

    #[test]
    fn glob_pattern_matches_paths_and_names() {
        let by_name = GlobPattern::new("node_modules").unwrap();
        assert!(by_name.matches(Path::new("web/node_modules")));
        assert!(!by_name.matches(Path::new("web/src")));

        let by_path = GlobPattern::new("src/**/*.test.ts").unwrap();
        assert!(by_path.matches(Path::new("src/a/b.test.ts")));
        assert!(!by_path.matches(Path::new("lib/b.test.ts")));
    }

    #[test]
    fn glob_pattern_empty_rejected() {
        assert_eq!(GlobPattern::new(""), Err(ModelError::EmptyGlobPattern));
    }

    #[test]
    fn extension_check_handles_compound_extensions() {
        assert!(has_extension("a.d.ts", "ts"));
        assert!(has_extension("a.d.ts", "d.ts"));
        assert!(!has_extension("ts", "ts"));
        assert!(!has_extension("a.mts", "ts"));
    }

    #[test]
    fn file_condition_filters_combine() {
        let cond = FileCondition::Match(FileFilter {
            has_extension: vec!["ts".to_string()],
            has_name: vec![name("*Store.ts"), name("*Doc.ts")],
            has_name_case: Some(NameCase::Camel),
            does_not_have_name: vec![name("static*")],
        });
        assert_eq!(cond.evaluate("userDoc.ts").unwrap().get(1), Some("user"));
        assert!(cond.evaluate("UserDoc.ts").is_none());
        assert!(cond.evaluate("staticDoc.ts").is_none());
        assert!(cond.evaluate("user.ts").is_none());
        assert_eq!(cond.min_groups(), 1);
    }

    #[test]
    fn folder_condition_duplicate_selects_on_any_root_file() {
        let cond = FolderCondition::Match(FolderFilter {
            duplicate_root_name: Some(name("regex:(?<baseName>.+)(Doc|Store).ts")),
            ..FolderFilter::default()
        });
        let caps = cond
            .evaluate("users", ["index.ts", "userDoc.ts"].into_iter())
            .unwrap();
        assert_eq!(caps.name("baseName"), Some("user"));
        assert!(cond.evaluate("users", ["index.ts"].into_iter()).is_none());
        assert_eq!(cond.group_names(), vec!["baseName".to_string()]);
    }

    #[test]
    fn templated_pattern_static_and_dynamic() {
        let fixed = TemplatedPattern::<NamePattern>::new("index.ts").unwrap();
        let dynamic = TemplatedPattern::<NamePattern>::new("$1Store.ts").unwrap();

        let inherited = Inherited::new();
        let caps = name("*Store.utils.ts").captures("counterStore.utils.ts").unwrap();
        let ctx = MatchContext::for_file("counterStore.utils.ts", "stores", &inherited)
            .with_captures(caps);

        let (p, text) = fixed.resolve(&ctx).unwrap();
        assert!(p.is_match("index.ts"));
        assert_eq!(text, "index.ts");

        let (p, text) = dynamic.resolve(&ctx).unwrap();
        assert!(p.is_match("counterStore.ts"));
        assert_eq!(text, "counterStore.ts");
    }

    #[test]
    fn templated_pattern_unescapes_double_dollar() {
        let tp = TemplatedPattern::<ContentPattern>::new("costs $$5").unwrap();
        let inherited = Inherited::new();
        let ctx = MatchContext::for_file("price.ts", "src", &inherited);

        let (p, text) = tp.resolve(&ctx).unwrap();
        assert_eq!(p.count_matches("costs $5, still costs $5"), 2);
        assert_eq!(text, "costs $5");
    }

    #[test]
    fn templated_pattern_rejects_bad_pattern_at_construction() {
        assert!(matches!(
            TemplatedPattern::<ContentPattern>::new("regex:({{1}}"),
            Err(ModelError::Pattern(PatternError::InvalidRegex { .. }))
        ));
    }

    #[test]
    fn templated_pattern_unresolved_at_runtime() {
        let tp = TemplatedPattern::<NamePattern>::new("{{baseName}}.ts").unwrap();
        let inherited = Inherited::new();
        let ctx = MatchContext::for_file("a.ts", "src", &inherited);
        assert!(matches!(tp.resolve(&ctx), Err(ResolveError::Unresolved(_))));
    }

    #[test]
    fn content_bounds() {
        let c = ContentConstraint {
            quantifier: Quantifier::Some,
            patterns: Vec::new(),
            at_least: 1,
            at_most: Some(1),
        };
        assert!(!c.within_bounds(0));
        assert!(c.within_bounds(1));
        assert!(!c.within_bounds(2));
    }
}
