//! Depth-first evaluation of a [`RuleSet`] over a directory snapshot.
//!
//! The children of a folder are judged by that folder's effective rules:
//! its local rules, then recursive rules inherited from ancestors (nearest
//! first), then the global rules. Sibling subtrees are walked in parallel
//! on the current rayon pool; a folder's root-file constraints run once all
//! of its children have been walked.

use crate::config::model::{
    has_extension, CompilePattern, Expectations, FileExpect, FileRule, FolderCondition,
    FolderExpect, FolderRule, FolderScope, OneOfRule, Rule, RuleMeta, RuleSet, TemplatedPattern,
};
use crate::content;
use crate::context::{Inherited, MatchContext};
use crate::pattern::{Captures, NamePattern};
use crate::report::ViolationSink;
use crate::template::Template;
use crate::tree::{child_path, FileNode, FolderNode};
use crate::types::{codes, LintResult, Location, Severity, Violation};
use rayon::prelude::*;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

/// Evaluates `rules` over the snapshot rooted at `root`.
///
/// Runs on the rayon pool of the caller; wrap in
/// [`rayon::ThreadPool::install`] to bound the number of workers.
#[must_use]
pub fn walk(rules: &RuleSet, root: &FolderNode) -> LintResult {
    let walker = Walker {
        rules,
        sink: ViolationSink::new(),
        files_checked: AtomicUsize::new(0),
        folders_checked: AtomicUsize::new(0),
    };
    walker.walk_folder(root, Some(&rules.root), &[], &Inherited::new(), true);

    LintResult {
        violations: walker.sink.into_sorted(),
        files_checked: walker.files_checked.into_inner(),
        folders_checked: walker.folders_checked.into_inner(),
    }
}

struct Walker<'r> {
    rules: &'r RuleSet,
    sink: ViolationSink,
    files_checked: AtomicUsize,
    folders_checked: AtomicUsize,
}

/// A subfolder accepted for traversal.
struct Descent<'n, 'r> {
    node: &'n FolderNode,
    scope: Option<&'r FolderScope>,
    captures: Inherited,
}

/// One failed predicate, before its message is chosen.
struct Failure {
    code: &'static str,
    reason: String,
}

impl Failure {
    fn expectation(reason: impl Into<String>) -> Self {
        Self {
            code: codes::EXPECTATION_FAILED,
            reason: reason.into(),
        }
    }
}

/// A violation waiting for its rule and location.
struct Finding {
    code: &'static str,
    message: String,
    detail: Option<String>,
}

/// Result of one rule on one node whose condition matched.
struct Outcome {
    touched: bool,
    captures: Captures,
    findings: Vec<Finding>,
}

/// Lazily loaded file text, read at most once per file.
struct FileContent<'n> {
    file: &'n FileNode,
    analyzed: bool,
    text: OnceCell<Option<String>>,
}

impl<'r> Walker<'r> {
    fn walk_folder(
        &self,
        folder: &FolderNode,
        scope: Option<&'r FolderScope>,
        inherited: &[&'r Rule],
        captures: &Inherited,
        is_root: bool,
    ) {
        self.folders_checked.fetch_add(1, Ordering::Relaxed);
        trace!("Walking {}", folder.path);

        let local = scope.map(|s| s.rules.as_slice()).unwrap_or_default();
        let rules: Vec<&'r Rule> = local
            .iter()
            .chain(inherited.iter().copied())
            .chain(self.rules.global_rules.iter())
            .collect();

        for file in &folder.files {
            self.check_file(file, folder, &rules, scope, captures);
        }

        let skip_undeclared = is_root
            && !local
                .iter()
                .chain(&self.rules.global_rules)
                .any(Rule::targets_folders);
        let mut descents = Vec::new();
        for sub in &folder.folders {
            let declared = scope.and_then(|s| s.folders.get(&sub.name));
            if declared.is_none() && skip_undeclared {
                debug!("Skipping undeclared folder {}", sub.path);
                continue;
            }
            if let Some(descent) = self.check_folder(sub, declared, &rules, folder, scope, captures) {
                descents.push(descent);
            }
        }

        if let Some(scope) = scope {
            self.check_missing_folders(folder, scope);
        }

        let child_inherited: Vec<&'r Rule> = local
            .iter()
            .filter(|r| r.is_recursive())
            .chain(inherited.iter().copied())
            .collect();
        descents.par_iter().for_each(|d| {
            self.walk_folder(d.node, d.scope, &child_inherited, &d.captures, false);
        });

        if let Some(scope) = scope {
            self.check_root_files(folder, scope);
        }
    }

    // ── Files ──

    fn check_file(
        &self,
        file: &FileNode,
        folder: &FolderNode,
        rules: &[&'r Rule],
        scope: Option<&FolderScope>,
        captures: &Inherited,
    ) {
        self.files_checked.fetch_add(1, Ordering::Relaxed);
        let content = FileContent {
            file,
            analyzed: self.rules.analyzes_content_of(&file.name),
            text: OnceCell::new(),
        };
        let location = Location::file(&file.path);
        let mut touched = false;

        for rule in rules {
            let outcome = match rule {
                Rule::File(r) => self.file_rule(r, file, folder, captures, &content),
                Rule::OneOf(r) => {
                    let base = MatchContext::for_file(&file.name, &folder.name, captures);
                    one_of(r, &base, |alt| match alt {
                        Rule::File(a) => self.file_rule(a, file, folder, captures, &content),
                        _ => None,
                    })
                }
                Rule::Folder(_) => None,
            };
            if let Some(outcome) = outcome {
                touched |= outcome.touched;
                self.emit(rule.meta(), &location, outcome.findings);
            }
        }

        if !touched && !scope.is_some_and(|s| s.allow_unconfigured_files) {
            let message = format!(
                "File `{}` is not expected in folder `{}`{}",
                file.name,
                folder.path,
                appended(scope.and_then(|s| s.unexpected_files_error_msg.as_deref()))
            );
            self.sink.push(Violation::new(
                codes::UNEXPECTED_FILE,
                format!("{}.allow_unconfigured_files", scope_path(scope, folder)),
                Severity::Error,
                location,
                message,
            ));
        }
    }

    fn file_rule(
        &self,
        rule: &FileRule,
        file: &FileNode,
        folder: &FolderNode,
        captures: &Inherited,
        content: &FileContent<'_>,
    ) -> Option<Outcome> {
        let caps = rule.condition.evaluate(&file.name)?;
        let ctx = MatchContext::for_file(&file.name, &folder.name, captures).with_captures(caps);

        let findings = match &rule.expect {
            Expectations::Any => Vec::new(),
            Expectations::None => findings(
                vec![Failure::expectation("file is not expected")],
                None,
                &rule.meta,
                &ctx,
            ),
            Expectations::Each(expects) => expects
                .iter()
                .flat_map(|expect| {
                    let failures =
                        self.check_file_expect(expect, file, folder, &ctx, content, &rule.meta);
                    findings(failures, expect.error_msg.as_ref(), &rule.meta, &ctx)
                })
                .collect(),
        };

        Some(Outcome {
            touched: !rule.meta.not_touch,
            captures: ctx.captures().clone(),
            findings,
        })
    }

    fn check_file_expect(
        &self,
        expect: &FileExpect,
        file: &FileNode,
        folder: &FolderNode,
        ctx: &MatchContext<'_>,
        content: &FileContent<'_>,
        meta: &RuleMeta,
    ) -> Vec<Failure> {
        let mut failures = Vec::new();
        let name = file.name.as_str();

        if let Some(case) = expect.name_case_is {
            if !case.matches(name) {
                failures.push(Failure::expectation(format!("should be named in {case}")));
            }
        }
        if let Some(reason) = name_is(&expect.name_is, name, ctx) {
            failures.push(Failure::expectation(reason));
        }
        failures.extend(name_is_not(&expect.name_is_not, name, ctx).into_iter().map(Failure::expectation));

        if !expect.extension_is.is_empty()
            && !expect.extension_is.iter().any(|ext| has_extension(name, ext))
        {
            failures.push(Failure::expectation(format!(
                "should have extension {}",
                quoted(&expect.extension_is, " or ")
            )));
        }

        for pattern in &expect.has_sibling_file {
            match pattern.resolve(ctx) {
                Err(e) => failures.push(Failure::expectation(unresolvable(pattern, &e))),
                Ok((sibling, display)) => {
                    let found = folder
                        .files
                        .iter()
                        .any(|f| f.name != file.name && sibling.is_match(&f.name));
                    if !found {
                        failures.push(Failure::expectation(format!(
                            "should have a sibling file matching `{display}`"
                        )));
                    }
                }
            }
        }

        let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
        for part in &expect.name_not_includes_any {
            if stem.contains(part.as_str()) {
                failures.push(Failure::expectation(format!("name should not include `{part}`")));
            }
        }

        if expect.needs_content() {
            if let Some(text) = content.text(&self.sink, meta) {
                for constraint in &expect.content_matches {
                    if let Err(reason) = content::check(constraint, text, ctx) {
                        failures.push(Failure::expectation(reason));
                    }
                }
                if !expect.content_matches_some.is_empty() {
                    let reasons: Vec<String> = expect
                        .content_matches_some
                        .iter()
                        .filter_map(|c| content::check(c, text, ctx).err())
                        .collect();
                    if reasons.len() == expect.content_matches_some.len() {
                        failures.push(Failure::expectation(format!(
                            "content should satisfy one of: {}",
                            reasons.join("; ")
                        )));
                    }
                }
                failures.extend(
                    content::check_absent(&expect.content_not_matches, text, ctx)
                        .into_iter()
                        .map(Failure::expectation),
                );
            }
        }

        failures
    }

    // ── Folders ──

    fn check_folder<'n>(
        &self,
        sub: &'n FolderNode,
        declared: Option<&'r FolderScope>,
        rules: &[&'r Rule],
        parent: &FolderNode,
        scope: Option<&FolderScope>,
        captures: &Inherited,
    ) -> Option<Descent<'n, 'r>> {
        let location = Location::folder(&sub.path);
        let mut touched = declared.is_some();
        let mut failed = false;
        let mut captured = Inherited::new();

        for rule in rules {
            let outcome = match rule {
                Rule::Folder(r) => self.folder_rule(r, sub, captures),
                Rule::OneOf(r) => {
                    let base = MatchContext::for_folder(&sub.name, captures);
                    one_of(r, &base, |alt| match alt {
                        Rule::Folder(a) => self.folder_rule(a, sub, captures),
                        _ => None,
                    })
                }
                Rule::File(_) => None,
            };
            let Some(outcome) = outcome else {
                continue;
            };
            touched |= outcome.touched;
            failed |= rule.meta().severity == Severity::Error && !outcome.findings.is_empty();
            for (name, value) in outcome.captures.named() {
                captured.entry(name.clone()).or_insert_with(|| value.clone());
            }
            self.emit(rule.meta(), &location, outcome.findings);
        }

        if failed {
            debug!("Not descending into {}: folder rule failed", sub.path);
            return None;
        }
        if !touched {
            if !scope.is_some_and(|s| s.allow_unconfigured_folders) {
                let message = format!(
                    "Folder `/{}` is not expected in folder `{}`{}",
                    sub.name,
                    parent.path,
                    appended(scope.and_then(|s| s.unexpected_folders_error_msg.as_deref()))
                );
                self.sink.push(Violation::new(
                    codes::UNEXPECTED_FOLDER,
                    format!("{}.allow_unconfigured_folders", scope_path(scope, parent)),
                    Severity::Error,
                    location,
                    message,
                ));
            }
            return None;
        }

        let mut inherited = captures.clone();
        inherited.extend(captured);
        Some(Descent {
            node: sub,
            scope: declared,
            captures: inherited,
        })
    }

    fn folder_rule(&self, rule: &FolderRule, sub: &FolderNode, captures: &Inherited) -> Option<Outcome> {
        let caps = rule.condition.evaluate(&sub.name, sub.file_names())?;
        let ctx = MatchContext::for_folder(&sub.name, captures).with_captures(caps);

        let mut failures = Vec::new();
        if let FolderCondition::Match(filter) = &rule.condition {
            if let Some(pattern) = &filter.duplicate_root_name {
                failures.extend(duplicates(pattern, sub));
            }
        }

        let mut out = match &rule.expect {
            Expectations::None => {
                failures.push(Failure::expectation("folder is not expected"));
                findings(failures, None, &rule.meta, &ctx)
            }
            Expectations::Any | Expectations::Each(_) => findings(failures, None, &rule.meta, &ctx),
        };
        if let Expectations::Each(expects) = &rule.expect {
            for expect in expects {
                let failures = check_folder_expect(expect, sub, &ctx);
                out.extend(findings(failures, expect.error_msg.as_ref(), &rule.meta, &ctx));
            }
        }

        Some(Outcome {
            touched: !rule.meta.not_touch,
            captures: ctx.captures().clone(),
            findings: out,
        })
    }

    fn check_missing_folders(&self, folder: &FolderNode, scope: &FolderScope) {
        for (name, child) in &scope.folders {
            if child.optional || folder.folder(name).is_some() {
                continue;
            }
            self.sink.push(Violation::new(
                codes::MISSING_FOLDER,
                child.path.clone(),
                Severity::Error,
                Location::folder(child_path(&folder.path, name)),
                format!("Folder `/{name}` is missing in folder `{}`", folder.path),
            ));
        }
    }

    fn check_root_files(&self, folder: &FolderNode, scope: &FolderScope) {
        for pattern in &scope.has_files_in_root {
            if folder.file_names().any(|name| pattern.is_match(name)) {
                continue;
            }
            self.sink.push(Violation::new(
                codes::MISSING_ROOT_FILE,
                format!("{}.has_files_in_root", scope.path),
                Severity::Error,
                Location::folder(&folder.path),
                format!(
                    "Folder `{}` should have a file matching `{}`",
                    folder.path,
                    pattern.as_str()
                ),
            ));
        }
    }

    fn emit(&self, meta: &RuleMeta, location: &Location, findings: Vec<Finding>) {
        if findings.is_empty() {
            return;
        }
        self.sink.extend(findings.into_iter().map(|f| {
            let violation = Violation::new(f.code, &meta.id, meta.severity, location.clone(), f.message);
            match f.detail {
                Some(detail) => violation.with_detail(detail),
                None => violation,
            }
        }));
    }
}

impl FileContent<'_> {
    /// Returns the text, reporting an unreadable file the first time.
    fn text(&self, sink: &ViolationSink, meta: &RuleMeta) -> Option<&str> {
        self.text
            .get_or_init(|| match content::load(self.file, self.analyzed) {
                Ok(text) => Some(text),
                Err(reason) => {
                    sink.push(Violation::new(
                        codes::UNREADABLE_FILE,
                        &meta.id,
                        meta.severity,
                        Location::file(&self.file.path),
                        reason,
                    ));
                    None
                }
            })
            .as_deref()
    }
}

/// Evaluates a `one_of`: it passes as soon as one matched alternative has
/// no findings. Otherwise the alternative with the fewest findings (the
/// earliest on ties) supplies the message and the detail.
fn one_of(
    rule: &OneOfRule,
    base: &MatchContext<'_>,
    mut evaluate: impl FnMut(&Rule) -> Option<Outcome>,
) -> Option<Outcome> {
    let mut matched = false;
    let mut touched = false;
    let mut closest: Option<Vec<Finding>> = None;

    for alternative in &rule.alternatives {
        let Some(outcome) = evaluate(alternative) else {
            continue;
        };
        matched = true;
        touched |= outcome.touched;
        if outcome.findings.is_empty() {
            return Some(Outcome {
                touched: touched && !rule.meta.not_touch,
                captures: outcome.captures,
                findings: Vec::new(),
            });
        }
        if closest.as_ref().map_or(true, |c| outcome.findings.len() < c.len()) {
            closest = Some(outcome.findings);
        }
    }

    if !matched {
        return None;
    }
    let closest = closest.unwrap_or_default();
    let message = rule
        .meta
        .error_msg
        .as_ref()
        .map(|t| t.render_lossy(|r| base.resolve(r)))
        .or_else(|| closest.first().map(|f| f.message.clone()))
        .unwrap_or_else(|| "no alternative of one_of is satisfied".to_string());
    let detail = closest
        .iter()
        .map(|f| match &f.detail {
            Some(detail) => format!("{}: {detail}", f.message),
            None => f.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ");

    Some(Outcome {
        touched: touched && !rule.meta.not_touch,
        captures: Captures::default(),
        findings: vec![Finding {
            code: codes::ONE_OF_UNSATISFIED,
            message,
            detail: Some(detail),
        }],
    })
}

fn check_folder_expect(expect: &FolderExpect, sub: &FolderNode, ctx: &MatchContext<'_>) -> Vec<Failure> {
    let mut failures = Vec::new();
    let name = sub.name.as_str();

    if let Some(case) = expect.name_case_is {
        if !case.matches(name) {
            failures.push(Failure::expectation(format!("should be named in {case}")));
        }
    }
    if let Some(reason) = name_is(&expect.name_is, name, ctx) {
        failures.push(Failure::expectation(reason));
    }
    failures.extend(name_is_not(&expect.name_is_not, name, ctx).into_iter().map(Failure::expectation));

    for pattern in &expect.root_files.has {
        match pattern.resolve(ctx) {
            Err(e) => failures.push(Failure::expectation(unresolvable(pattern, &e))),
            Ok((file, display)) => {
                if !sub.file_names().any(|n| file.is_match(n)) {
                    failures.push(Failure::expectation(format!(
                        "should have a root file matching `{display}`"
                    )));
                }
            }
        }
    }
    for pattern in &expect.root_files.does_not_have {
        match pattern.resolve(ctx) {
            Err(e) => failures.push(Failure::expectation(unresolvable(pattern, &e))),
            Ok((file, display)) => {
                let found: Vec<&str> = sub.file_names().filter(|n| file.is_match(n)).collect();
                if !found.is_empty() {
                    failures.push(Failure::expectation(format!(
                        "should not have root files matching `{display}`: {}",
                        found.join(", ")
                    )));
                }
            }
        }
    }
    if let Some(pattern) = &expect.root_files.does_not_have_duplicate_name {
        failures.extend(duplicates(pattern, sub));
    }

    failures
}

/// One failure per base name shared by several root files. The base name is
/// the `baseName` group when the pattern has one, else the first group.
fn duplicates(pattern: &NamePattern, folder: &FolderNode) -> Vec<Failure> {
    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for name in folder.file_names() {
        let Some(caps) = pattern.captures(name) else {
            continue;
        };
        let base = caps.name("baseName").or_else(|| caps.get(1)).unwrap_or(name);
        groups.entry(base.to_string()).or_default().push(name);
    }
    groups
        .into_iter()
        .filter(|(_, files)| files.len() > 1)
        .map(|(base, files)| Failure {
            code: codes::DUPLICATE_NAME,
            reason: format!(
                "should not have files sharing the base name `{base}`: {}",
                files.join(", ")
            ),
        })
        .collect()
}

fn name_is(
    patterns: &[TemplatedPattern<NamePattern>],
    name: &str,
    ctx: &MatchContext<'_>,
) -> Option<String> {
    if patterns.is_empty() {
        return None;
    }
    let mut shown = Vec::with_capacity(patterns.len());
    let mut unresolved = None;
    for pattern in patterns {
        match pattern.resolve(ctx) {
            Ok((compiled, _)) if compiled.is_match(name) => return None,
            Ok((_, display)) => shown.push(display),
            Err(e) => {
                unresolved.get_or_insert_with(|| unresolvable(pattern, &e));
            }
        }
    }
    Some(unresolved.unwrap_or_else(|| match shown.as_slice() {
        [one] => format!("should match pattern `{one}`"),
        _ => format!("should match one of {}", quoted(&shown, ", ")),
    }))
}

fn name_is_not(
    patterns: &[TemplatedPattern<NamePattern>],
    name: &str,
    ctx: &MatchContext<'_>,
) -> Vec<String> {
    patterns
        .iter()
        .filter_map(|pattern| match pattern.resolve(ctx) {
            Err(e) => Some(unresolvable(pattern, &e)),
            Ok((compiled, display)) => compiled
                .is_match(name)
                .then(|| format!("should not match pattern `{display}`")),
        })
        .collect()
}

/// Picks messages: the expectation's `error_msg`, else the rule's, else the
/// generic reason. A custom message keeps the reason as detail.
fn findings(
    failures: Vec<Failure>,
    expect_msg: Option<&Template>,
    meta: &RuleMeta,
    ctx: &MatchContext<'_>,
) -> Vec<Finding> {
    let custom = expect_msg
        .or(meta.error_msg.as_ref())
        .map(|t| t.render_lossy(|r| ctx.resolve(r)));
    failures
        .into_iter()
        .map(|f| match &custom {
            Some(message) => Finding {
                code: f.code,
                message: message.clone(),
                detail: Some(f.reason),
            },
            None => Finding {
                code: f.code,
                message: f.reason,
                detail: None,
            },
        })
        .collect()
}

fn unresolvable<P: CompilePattern>(pattern: &TemplatedPattern<P>, error: &impl std::fmt::Display) -> String {
    format!("pattern `{}` cannot be resolved: {error}", pattern.template())
}

fn quoted(items: &[String], separator: &str) -> String {
    items
        .iter()
        .map(|i| format!("`{i}`"))
        .collect::<Vec<_>>()
        .join(separator)
}

fn appended(message: Option<&str>) -> String {
    message.map(|m| format!(" | {m}")).unwrap_or_default()
}

fn scope_path<'a>(scope: Option<&'a FolderScope>, folder: &'a FolderNode) -> &'a str {
    scope.map_or(folder.path.as_str(), |s| s.path.as_str())
}
