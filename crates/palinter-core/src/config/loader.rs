//! DTO → Domain model conversion with validation.
//!
//! Block references are expanded in place, `one_of` alternatives are
//! flattened, and every pattern and template is compiled. Template
//! references that can never resolve are rejected here:
//!
//! - `$n` / `{{n}}` beyond the number of groups the rule's own condition
//!   guarantees;
//! - names that are neither a builtin, a named group of the rule's own
//!   condition, nor a named group of any folder condition in the config.

use crate::case::NameCase;
use crate::context::{FILE_BUILTINS, FOLDER_BUILTINS};
use crate::pattern::NamePattern;
use crate::template::{Template, TemplateRef};
use crate::types::Severity;

use super::dto::{
    many, ConfigDto, ContentMatchDto, FileExpectDto, FileFilterDto, FolderDto, FolderExpectDto,
    FolderFilterDto, RuleDto,
};
use super::model::{
    CompilePattern, ContentConstraint, Expectations, FileCondition, FileExpect, FileFilter,
    FileRule, FolderCondition, FolderExpect, FolderFilter, FolderRule, FolderScope, GlobPattern,
    ModelError, OneOfRule, Quantifier, RootFilesExpect, Rule, RuleMeta, RuleSet,
    TemplatedPattern,
};

use miette::Diagnostic;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Errors during DTO → Domain conversion.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum LoadError {
    /// A field-level validation error.
    #[error("{context}: {source}")]
    #[diagnostic(code(palinter::config::invalid_value))]
    Validation {
        /// Where the error occurred (e.g., "./src.rules[0].if_file.has_name[1]").
        context: String,
        /// The underlying model error.
        source: ModelError,
    },

    /// A value does not have the expected structure.
    #[error("{context}: {message}")]
    #[diagnostic(code(palinter::config::shape))]
    Shape {
        /// Where the error occurred.
        context: String,
        /// What is wrong.
        message: String,
    },

    /// A rule sets none or several of `if_file`, `if_folder`, `one_of`.
    #[error("{context}: exactly one of `if_file`, `if_folder` or `one_of` must be set")]
    #[diagnostic(code(palinter::config::ambiguous_rule))]
    AmbiguousRule {
        /// The offending rule.
        context: String,
    },

    /// A string where only a fixed keyword is accepted.
    #[error("{context}: unknown keyword `{value}`, expected: {expected}")]
    #[diagnostic(code(palinter::config::keyword))]
    InvalidKeyword {
        /// Where the error occurred.
        context: String,
        /// The invalid value.
        value: String,
        /// Accepted keywords.
        expected: &'static str,
    },

    /// A folder key that is neither a known field nor a `/subfolder`.
    #[error("{context}: unknown field `{field}`")]
    #[diagnostic(
        code(palinter::config::unknown_field),
        help("subfolder keys must start with `/`, e.g. `/src`")
    )]
    UnknownField {
        /// The folder containing the key.
        context: String,
        /// The key.
        field: String,
    },

    /// A reference to a block that does not exist.
    #[error("{context}: unknown block `{name}`")]
    #[diagnostic(code(palinter::config::unknown_block))]
    UnknownBlock {
        /// Where the reference was found.
        context: String,
        /// The undefined block name.
        name: String,
    },

    /// Blocks reference each other in a loop.
    #[error("block reference cycle: {cycle}")]
    #[diagnostic(code(palinter::config::block_cycle))]
    BlockCycle {
        /// The blocks on the cycle, e.g. `a -> b -> a`.
        cycle: String,
    },

    /// A template reference that no match can ever provide.
    #[error("{context}: unresolvable reference `{reference}`: {reason}")]
    #[diagnostic(code(palinter::config::unresolved_template))]
    UnresolvedTemplate {
        /// Where the template was found.
        context: String,
        /// The reference as written.
        reference: String,
        /// Why it can never resolve.
        reason: String,
    },
}

/// Converts a `ConfigDto` to a validated `RuleSet`.
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load(dto: ConfigDto) -> Result<RuleSet, LoadError> {
    let ignore = dto
        .ignore
        .iter()
        .enumerate()
        .map(|(i, p)| GlobPattern::new(p).map_err(validation(format!("ignore[{i}]"))))
        .collect::<Result<Vec<_>, _>>()?;

    let analyze_content_of_files_types = dto
        .analyze_content_of_files_types
        .map(|exts| extensions(exts, "analyze_content_of_files_types"))
        .transpose()?;

    let mut loader = Loader::new(&dto.blocks);
    for name in dto.blocks.keys() {
        loader.resolve_block(name, &format!("blocks.{name}"))?;
    }
    let global_rules = loader.convert_rule_list(&dto.global_rules, "global_rules")?;
    let root_value = dto.root.unwrap_or(Value::Object(Map::new()));
    let root = loader.convert_folder(root_value, ROOT_PATH)?;
    loader.check_pending_names()?;

    Ok(RuleSet {
        root,
        global_rules,
        ignore,
        analyze_content_of_files_types,
    })
}

const ROOT_PATH: &str = "./";

fn validation(context: impl Into<String>) -> impl FnOnce(ModelError) -> LoadError {
    let context = context.into();
    move |source| LoadError::Validation { context, source }
}

fn parse<T: DeserializeOwned>(value: Value, context: &str) -> Result<T, LoadError> {
    serde_json::from_value(value).map_err(|e| LoadError::Shape {
        context: context.to_string(),
        message: e.to_string(),
    })
}

fn parse_case(raw: &str, context: &str) -> Result<NameCase, LoadError> {
    raw.parse::<NameCase>()
        .map_err(|e| validation(context)(ModelError::Case(e)))
}

fn extensions(raw: Vec<String>, context: &str) -> Result<Vec<String>, LoadError> {
    raw.into_iter()
        .enumerate()
        .map(|(i, ext)| {
            if ext.is_empty() || ext.starts_with('.') {
                Err(validation(format!("{context}[{i}]"))(
                    ModelError::InvalidExtension(ext),
                ))
            } else {
                Ok(ext)
            }
        })
        .collect()
}

fn name_patterns(raw: Vec<String>, context: &str) -> Result<Vec<NamePattern>, LoadError> {
    raw.iter()
        .enumerate()
        .map(|(i, p)| {
            NamePattern::new(p)
                .map_err(|e| validation(format!("{context}[{i}]"))(ModelError::Pattern(e)))
        })
        .collect()
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        format!("./{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Which variables a rule's templates may reference.
struct TemplateScope {
    builtins: &'static [&'static str],
    min_groups: usize,
    names: Vec<String>,
}

struct PendingName {
    context: String,
    reference: String,
    name: String,
}

struct Loader<'a> {
    blocks: &'a BTreeMap<String, Value>,
    resolved: BTreeMap<String, Vec<Rule>>,
    in_progress: Vec<String>,
    folder_group_names: BTreeSet<String>,
    pending_names: Vec<PendingName>,
}

impl<'a> Loader<'a> {
    fn new(blocks: &'a BTreeMap<String, Value>) -> Self {
        Self {
            blocks,
            resolved: BTreeMap::new(),
            in_progress: Vec::new(),
            folder_group_names: BTreeSet::new(),
            pending_names: Vec::new(),
        }
    }

    // ── Blocks and rule lists ──

    fn resolve_block(&mut self, name: &str, context: &str) -> Result<Vec<Rule>, LoadError> {
        if let Some(rules) = self.resolved.get(name) {
            return Ok(rules.clone());
        }
        if let Some(start) = self.in_progress.iter().position(|n| n == name) {
            let mut cycle = self.in_progress[start..].to_vec();
            cycle.push(name.to_string());
            return Err(LoadError::BlockCycle {
                cycle: cycle.join(" -> "),
            });
        }
        let value = self
            .blocks
            .get(name)
            .ok_or_else(|| LoadError::UnknownBlock {
                context: context.to_string(),
                name: name.to_string(),
            })?
            .clone();

        self.in_progress.push(name.to_string());
        let block_ctx = format!("blocks.{name}");
        let rules = match value {
            Value::Array(items) => {
                let mut rules = Vec::new();
                for (i, item) in items.into_iter().enumerate() {
                    let item_ctx = format!("{block_ctx}[{i}]");
                    match item {
                        Value::String(target) => {
                            rules.extend(self.resolve_block(&target, &item_ctx)?);
                        }
                        other => rules.push(self.convert_rule(other, &item_ctx, format!("{name}[{i}]"))?),
                    }
                }
                rules
            }
            Value::String(target) => self.resolve_block(&target, &block_ctx)?,
            other => vec![self.convert_rule(other, &block_ctx, name.to_string())?],
        };
        self.in_progress.pop();

        self.resolved.insert(name.to_string(), rules.clone());
        Ok(rules)
    }

    fn convert_rule_list(&mut self, entries: &[Value], context: &str) -> Result<Vec<Rule>, LoadError> {
        let mut rules = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            let entry_ctx = format!("{context}[{i}]");
            match entry {
                Value::String(name) => rules.extend(self.resolve_block(name, &entry_ctx)?),
                other => rules.push(self.convert_rule(other.clone(), &entry_ctx, entry_ctx.clone())?),
            }
        }
        Ok(rules)
    }

    // ── Rules ──

    fn convert_rule(&mut self, value: Value, context: &str, default_id: String) -> Result<Rule, LoadError> {
        if !value.is_object() {
            return Err(LoadError::Shape {
                context: context.to_string(),
                message: "expected a rule object or a block name".to_string(),
            });
        }
        let dto: RuleDto = parse(value, context)?;
        let error_msg = dto
            .error_msg
            .as_deref()
            .map(|m| Template::parse(m).map_err(|e| validation(format!("{context}.error_msg"))(e.into())))
            .transpose()?;
        let meta = RuleMeta {
            id: dto.id.clone().unwrap_or(default_id),
            description: dto.description.clone(),
            error_msg,
            severity: if dto.is_warning {
                Severity::Warning
            } else {
                Severity::Error
            },
            non_recursive: dto.non_recursive,
            not_touch: dto.not_touch,
        };

        match (dto.if_file, dto.if_folder, dto.one_of) {
            (Some(cond), None, None) => self.convert_file_rule(meta, cond, dto.expect, context),
            (None, Some(cond), None) => self.convert_folder_rule(meta, cond, dto.expect, context),
            (None, None, Some(alternatives)) => {
                if dto.expect.is_some() {
                    return Err(LoadError::Shape {
                        context: context.to_string(),
                        message: "`one_of` rules take no `expect`; put it on the alternatives"
                            .to_string(),
                    });
                }
                self.convert_one_of(meta, &alternatives, context)
            }
            _ => Err(LoadError::AmbiguousRule {
                context: context.to_string(),
            }),
        }
    }

    fn convert_file_rule(
        &mut self,
        meta: RuleMeta,
        condition: Value,
        expect: Option<Value>,
        context: &str,
    ) -> Result<Rule, LoadError> {
        let cond_ctx = format!("{context}.if_file");
        let condition = match keyword_or_object(condition, &cond_ctx, "any")? {
            Some(obj) => {
                let dto: FileFilterDto = parse(obj, &cond_ctx)?;
                FileCondition::Match(FileFilter {
                    has_extension: extensions(many(dto.has_extension), &format!("{cond_ctx}.has_extension"))?,
                    has_name: name_patterns(many(dto.has_name), &format!("{cond_ctx}.has_name"))?,
                    has_name_case: dto
                        .has_name_case
                        .map(|c| parse_case(&c, &format!("{cond_ctx}.has_name_case")))
                        .transpose()?,
                    does_not_have_name: name_patterns(
                        many(dto.does_not_have_name),
                        &format!("{cond_ctx}.does_not_have_name"),
                    )?,
                })
            }
            None => FileCondition::Any,
        };

        let scope = TemplateScope {
            builtins: FILE_BUILTINS,
            min_groups: condition.min_groups(),
            names: condition.group_names(),
        };
        if let Some(t) = &meta.error_msg {
            self.check_template(t, &scope, &format!("{context}.error_msg"))?;
        }
        let expect = self.convert_expectations(expect, &format!("{context}.expect"), |loader, v, ctx| {
            loader.convert_file_expect(v, ctx, &scope)
        })?;

        Ok(Rule::File(FileRule {
            meta,
            condition,
            expect,
        }))
    }

    fn convert_folder_rule(
        &mut self,
        meta: RuleMeta,
        condition: Value,
        expect: Option<Value>,
        context: &str,
    ) -> Result<Rule, LoadError> {
        let cond_ctx = format!("{context}.if_folder");
        let condition = match keyword_or_object(condition, &cond_ctx, "any")? {
            Some(obj) => {
                let dto: FolderFilterDto = parse(obj, &cond_ctx)?;
                let duplicate_root_name = dto
                    .root_files
                    .and_then(|r| r.does_not_have_duplicate_name)
                    .map(|p| {
                        NamePattern::new(&p).map_err(|e| {
                            validation(format!("{cond_ctx}.root_files.does_not_have_duplicate_name"))(e.into())
                        })
                    })
                    .transpose()?;
                FolderCondition::Match(FolderFilter {
                    has_name: name_patterns(many(dto.has_name), &format!("{cond_ctx}.has_name"))?,
                    has_name_case: dto
                        .has_name_case
                        .map(|c| parse_case(&c, &format!("{cond_ctx}.has_name_case")))
                        .transpose()?,
                    does_not_have_name: name_patterns(
                        many(dto.does_not_have_name),
                        &format!("{cond_ctx}.does_not_have_name"),
                    )?,
                    duplicate_root_name,
                })
            }
            None => FolderCondition::Any,
        };

        let names = condition.group_names();
        self.folder_group_names.extend(names.iter().cloned());
        let scope = TemplateScope {
            builtins: FOLDER_BUILTINS,
            min_groups: condition.min_groups(),
            names,
        };
        if let Some(t) = &meta.error_msg {
            self.check_template(t, &scope, &format!("{context}.error_msg"))?;
        }
        let expect = self.convert_expectations(expect, &format!("{context}.expect"), |loader, v, ctx| {
            loader.convert_folder_expect(v, ctx, &scope)
        })?;

        Ok(Rule::Folder(FolderRule {
            meta,
            condition,
            expect,
        }))
    }

    fn convert_one_of(&mut self, meta: RuleMeta, entries: &[Value], context: &str) -> Result<Rule, LoadError> {
        let mut alternatives = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            let entry_ctx = format!("{context}.one_of[{i}]");
            let rules = match entry {
                Value::String(name) => self.resolve_block(name, &entry_ctx)?,
                other => vec![self.convert_rule(other.clone(), &entry_ctx, format!("{}.one_of[{i}]", meta.id))?],
            };
            for rule in rules {
                match rule {
                    Rule::OneOf(nested) => alternatives.extend(nested.alternatives),
                    other => alternatives.push(other),
                }
            }
        }
        if alternatives.is_empty() {
            return Err(LoadError::Shape {
                context: format!("{context}.one_of"),
                message: "must list at least one alternative".to_string(),
            });
        }
        Ok(Rule::OneOf(OneOfRule { meta, alternatives }))
    }

    // ── Expectations ──

    fn convert_expectations<E>(
        &mut self,
        value: Option<Value>,
        context: &str,
        mut convert: impl FnMut(&mut Self, Value, &str) -> Result<E, LoadError>,
    ) -> Result<Expectations<E>, LoadError> {
        match value {
            None => Ok(Expectations::Any),
            Some(Value::String(keyword)) => match keyword.as_str() {
                "any" => Ok(Expectations::Any),
                "none" => Ok(Expectations::None),
                _ => Err(LoadError::InvalidKeyword {
                    context: context.to_string(),
                    value: keyword,
                    expected: "any, none",
                }),
            },
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| convert(self, item, &format!("{context}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Expectations::Each),
            Some(obj @ Value::Object(_)) => Ok(Expectations::Each(vec![convert(self, obj, context)?])),
            Some(_) => Err(LoadError::Shape {
                context: context.to_string(),
                message: "expected `any`, `none`, an object or a list of objects".to_string(),
            }),
        }
    }

    fn convert_file_expect(&mut self, value: Value, context: &str, scope: &TemplateScope) -> Result<FileExpect, LoadError> {
        let dto: FileExpectDto = parse(value, context)?;

        let mut content_matches =
            self.constraints(dto.content_matches.unwrap_or_default(), &format!("{context}.content_matches"), scope)?;
        if let Some(legacy) = dto.content_matches_any {
            let ctx = format!("{context}.content_matches_any");
            content_matches.push(ContentConstraint {
                quantifier: Quantifier::Some,
                patterns: self.patterns(legacy, &ctx, scope)?,
                at_least: 1,
                at_most: None,
            });
        }

        Ok(FileExpect {
            name_case_is: dto
                .name_case_is
                .map(|c| parse_case(&c, &format!("{context}.name_case_is")))
                .transpose()?,
            name_is: self.patterns(many(dto.name_is), &format!("{context}.name_is"), scope)?,
            name_is_not: self.patterns(many(dto.name_is_not), &format!("{context}.name_is_not"), scope)?,
            extension_is: extensions(many(dto.extension_is), &format!("{context}.extension_is"))?,
            has_sibling_file: self.patterns(
                many(dto.has_sibling_file),
                &format!("{context}.has_sibling_file"),
                scope,
            )?,
            name_not_includes_any: dto.name_not_includes_any.unwrap_or_default(),
            content_matches,
            content_matches_some: self.constraints(
                dto.content_matches_some.unwrap_or_default(),
                &format!("{context}.content_matches_some"),
                scope,
            )?,
            content_not_matches: self.patterns(
                many(dto.content_not_matches),
                &format!("{context}.content_not_matches"),
                scope,
            )?,
            error_msg: self.message(dto.error_msg, &format!("{context}.error_msg"), scope)?,
        })
    }

    fn convert_folder_expect(&mut self, value: Value, context: &str, scope: &TemplateScope) -> Result<FolderExpect, LoadError> {
        let dto: FolderExpectDto = parse(value, context)?;
        let root_files = match dto.root_files {
            Some(root) => {
                let ctx = format!("{context}.root_files");
                RootFilesExpect {
                    has: self.patterns(many(root.has), &format!("{ctx}.has"), scope)?,
                    does_not_have: self.patterns(many(root.does_not_have), &format!("{ctx}.does_not_have"), scope)?,
                    does_not_have_duplicate_name: root
                        .does_not_have_duplicate_name
                        .map(|p| {
                            NamePattern::new(&p).map_err(|e| {
                                validation(format!("{ctx}.does_not_have_duplicate_name"))(e.into())
                            })
                        })
                        .transpose()?,
                }
            }
            None => RootFilesExpect::default(),
        };

        Ok(FolderExpect {
            name_case_is: dto
                .name_case_is
                .map(|c| parse_case(&c, &format!("{context}.name_case_is")))
                .transpose()?,
            name_is: self.patterns(many(dto.name_is), &format!("{context}.name_is"), scope)?,
            name_is_not: self.patterns(many(dto.name_is_not), &format!("{context}.name_is_not"), scope)?,
            root_files,
            error_msg: self.message(dto.error_msg, &format!("{context}.error_msg"), scope)?,
        })
    }

    fn constraints(
        &mut self,
        entries: Vec<Value>,
        context: &str,
        scope: &TemplateScope,
    ) -> Result<Vec<ContentConstraint>, LoadError> {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| self.constraint(entry, &format!("{context}[{i}]"), scope))
            .collect()
    }

    fn constraint(&mut self, value: Value, context: &str, scope: &TemplateScope) -> Result<ContentConstraint, LoadError> {
        if let Value::String(pattern) = value {
            return Ok(ContentConstraint {
                quantifier: Quantifier::Some,
                patterns: self.patterns(vec![pattern], context, scope)?,
                at_least: 1,
                at_most: None,
            });
        }
        let dto: ContentMatchDto = parse(value, context)?;
        let (quantifier, raw, field) = match (dto.some, dto.every) {
            (Some(p), None) => (Quantifier::Some, p, "some"),
            (None, Some(p)) => (Quantifier::Every, p, "every"),
            _ => {
                return Err(LoadError::Shape {
                    context: context.to_string(),
                    message: "exactly one of `some` or `every` must be set".to_string(),
                })
            }
        };
        if raw.is_empty() {
            return Err(LoadError::Shape {
                context: format!("{context}.{field}"),
                message: "must list at least one pattern".to_string(),
            });
        }
        let at_least = dto.at_least.unwrap_or(1);
        if let Some(at_most) = dto.at_most {
            if at_least > at_most {
                return Err(validation(context)(ModelError::InvertedBounds { at_least, at_most }));
            }
        }
        Ok(ContentConstraint {
            quantifier,
            patterns: self.patterns(raw, &format!("{context}.{field}"), scope)?,
            at_least,
            at_most: dto.at_most,
        })
    }

    fn patterns<P: CompilePattern>(
        &mut self,
        raw: Vec<String>,
        context: &str,
        scope: &TemplateScope,
    ) -> Result<Vec<TemplatedPattern<P>>, LoadError> {
        raw.iter()
            .enumerate()
            .map(|(i, p)| {
                let ctx = format!("{context}[{i}]");
                let pattern = TemplatedPattern::<P>::new(p).map_err(validation(ctx.clone()))?;
                self.check_template(pattern.template(), scope, &ctx)?;
                Ok::<_, LoadError>(pattern)
            })
            .collect()
    }

    fn message(&mut self, raw: Option<String>, context: &str, scope: &TemplateScope) -> Result<Option<Template>, LoadError> {
        let Some(raw) = raw else {
            return Ok(None);
        };
        let template = Template::parse(&raw).map_err(|e| validation(context)(e.into()))?;
        self.check_template(&template, scope, context)?;
        Ok(Some(template))
    }

    // ── Template references ──

    fn check_template(&mut self, template: &Template, scope: &TemplateScope, context: &str) -> Result<(), LoadError> {
        for reference in template.refs() {
            match reference {
                TemplateRef::Index(n) if *n > scope.min_groups => {
                    return Err(LoadError::UnresolvedTemplate {
                        context: context.to_string(),
                        reference: reference.to_string(),
                        reason: format!(
                            "the rule's condition guarantees {} capture group(s)",
                            scope.min_groups
                        ),
                    });
                }
                TemplateRef::Index(_) => {}
                TemplateRef::Name { name, .. } => {
                    if scope.builtins.contains(&name.as_str()) || scope.names.contains(name) {
                        continue;
                    }
                    self.pending_names.push(PendingName {
                        context: context.to_string(),
                        reference: reference.to_string(),
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_pending_names(&self) -> Result<(), LoadError> {
        match self
            .pending_names
            .iter()
            .find(|p| !self.folder_group_names.contains(&p.name))
        {
            Some(p) => Err(LoadError::UnresolvedTemplate {
                context: p.context.clone(),
                reference: p.reference.clone(),
                reason: "not a builtin and not captured by the rule's or any folder's condition"
                    .to_string(),
            }),
            None => Ok(()),
        }
    }

    // ── Folder tree ──

    fn convert_folder(&mut self, value: Value, path: &str) -> Result<FolderScope, LoadError> {
        let value = match value {
            Value::Null => Value::Object(Map::new()),
            Value::Object(map) => Value::Object(expand_nested_keys(map, path)?),
            _ => {
                return Err(LoadError::Shape {
                    context: path.to_string(),
                    message: "expected a folder object".to_string(),
                })
            }
        };
        let dto: FolderDto = parse(value, path)?;

        let rules = self.convert_rule_list(&dto.rules, &format!("{path}.rules"))?;
        let has_files_in_root = name_patterns(dto.has_files_in_root, &format!("{path}.has_files_in_root"))?;

        let mut folders = BTreeMap::new();
        for (key, child) in dto.folders {
            let name = key
                .strip_prefix('/')
                .filter(|n| !n.is_empty())
                .ok_or_else(|| LoadError::UnknownField {
                    context: path.to_string(),
                    field: key.clone(),
                })?;
            let scope = self.convert_folder(child, &child_path(path, name))?;
            folders.insert(name.to_string(), scope);
        }

        Ok(FolderScope {
            path: path.to_string(),
            rules,
            has_files_in_root,
            allow_unconfigured_files: dto.allow_unconfigured_files,
            allow_unconfigured_folders: dto.allow_unconfigured_folders,
            optional: dto.optional,
            unexpected_files_error_msg: dto.unexpected_files_error_msg,
            unexpected_folders_error_msg: dto.unexpected_folders_error_msg,
            folders,
        })
    }
}

/// Returns `Ok(None)` for the keyword, `Ok(Some(obj))` for an object.
fn keyword_or_object(value: Value, context: &str, keyword: &'static str) -> Result<Option<Value>, LoadError> {
    match value {
        Value::String(s) if s == keyword => Ok(None),
        Value::String(s) => Err(LoadError::InvalidKeyword {
            context: context.to_string(),
            value: s,
            expected: keyword,
        }),
        obj @ Value::Object(_) => Ok(Some(obj)),
        _ => Err(LoadError::Shape {
            context: context.to_string(),
            message: format!("expected `{keyword}` or an object"),
        }),
    }
}

/// Rewrites `"/a/b": {...}` into `"/a": { "/b": {...} }`, merging with an
/// existing `/a` entry.
fn expand_nested_keys(map: Map<String, Value>, path: &str) -> Result<Map<String, Value>, LoadError> {
    let mut out = Map::new();
    for (key, value) in map {
        let (key, value) = match key.strip_prefix('/').and_then(|rest| rest.split_once('/')) {
            Some((head, tail)) if !head.is_empty() && !tail.is_empty() => {
                let mut nested = Map::new();
                nested.insert(format!("/{tail}"), value);
                (format!("/{head}"), Value::Object(nested))
            }
            _ => (key, value),
        };
        match out.remove(&key) {
            None => {
                out.insert(key, value);
            }
            Some(existing) => {
                let merged = merge_folders(existing, value, &child_path(path, key.trim_start_matches('/')))?;
                out.insert(key, merged);
            }
        }
    }
    Ok(out)
}

fn merge_folders(a: Value, b: Value, path: &str) -> Result<Value, LoadError> {
    match (a, b) {
        (Value::Object(mut a), Value::Object(b)) => {
            for (key, value) in b {
                let merged = match a.remove(&key) {
                    None => value,
                    Some(existing) if key.starts_with('/') => {
                        merge_folders(existing, value, &child_path(path, key.trim_start_matches('/')))?
                    }
                    Some(_) => {
                        return Err(LoadError::Shape {
                            context: path.to_string(),
                            message: format!("`{key}` is declared more than once"),
                        })
                    }
                };
                a.insert(key, merged);
            }
            Ok(Value::Object(a))
        }
        _ => Err(LoadError::Shape {
            context: path.to_string(),
            message: "expected a folder object".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load_json(value: Value) -> Result<RuleSet, LoadError> {
        load(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn empty_config_loads() {
        let set = load_json(json!({})).unwrap();
        assert!(set.root.rules.is_empty());
        assert_eq!(set.root.path, "./");
    }

    #[test]
    fn block_reference_expands_in_place() {
        let set = load_json(json!({
            "blocks": {
                "ts_only": { "if_file": "any", "expect": { "extension_is": "ts" } }
            },
            "./": { "rules": ["ts_only", { "if_folder": "any" }] }
        }))
        .unwrap();
        let ids: Vec<&str> = set.root.rules.iter().map(Rule::id).collect();
        assert_eq!(ids, vec!["ts_only", "./.rules[1]"]);
    }

    #[test]
    fn block_list_ids_are_indexed() {
        let set = load_json(json!({
            "blocks": {
                "pair": [
                    { "if_file": "any" },
                    { "id": "named", "if_folder": "any" }
                ]
            },
            "global_rules": ["pair"]
        }))
        .unwrap();
        let ids: Vec<&str> = set.global_rules.iter().map(Rule::id).collect();
        assert_eq!(ids, vec!["pair[0]", "named"]);
    }

    #[test]
    fn undefined_block_is_one_error() {
        let err = load_json(json!({ "./": { "rules": ["missing"] } })).unwrap_err();
        assert!(
            matches!(&err, LoadError::UnknownBlock { name, context } if name == "missing" && context == "./.rules[0]"),
            "{err}"
        );
    }

    #[test]
    fn block_cycle_is_detected() {
        let err = load_json(json!({
            "blocks": {
                "a": { "one_of": ["b"] },
                "b": ["a"]
            }
        }))
        .unwrap_err();
        assert!(
            matches!(&err, LoadError::BlockCycle { cycle } if cycle == "a -> b -> a"),
            "{err}"
        );
    }

    #[test]
    fn rule_discriminant_must_be_unique() {
        let both = load_json(json!({
            "global_rules": [{ "if_file": "any", "if_folder": "any" }]
        }))
        .unwrap_err();
        assert!(matches!(both, LoadError::AmbiguousRule { .. }));

        let neither = load_json(json!({ "global_rules": [{ "expect": "any" }] })).unwrap_err();
        assert!(matches!(neither, LoadError::AmbiguousRule { .. }));
    }

    #[test]
    fn nested_one_of_is_flattened() {
        let set = load_json(json!({
            "global_rules": [{
                "one_of": [
                    { "if_file": { "has_extension": "ts" } },
                    { "one_of": [
                        { "if_file": { "has_extension": "tsx" } },
                        { "if_file": { "has_extension": "css" } }
                    ] }
                ]
            }]
        }))
        .unwrap();
        let Rule::OneOf(one_of) = &set.global_rules[0] else {
            panic!("expected one_of");
        };
        assert_eq!(one_of.alternatives.len(), 3);
        assert!(one_of
            .alternatives
            .iter()
            .all(|r| matches!(r, Rule::File(_))));
    }

    #[test]
    fn invalid_pattern_reports_location() {
        let err = load_json(json!({
            "./": { "/src": { "rules": [{ "if_file": { "has_name": ["*.ts", "*(a|b.ts"] } }] } }
        }))
        .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("./src.rules[0].if_file.has_name[1]:"));
    }

    #[test]
    fn numbered_reference_beyond_condition_groups_is_fatal() {
        let err = load_json(json!({
            "global_rules": [{
                "if_file": { "has_name": "*Store.ts" },
                "expect": { "has_sibling_file": "$2.ts" }
            }]
        }))
        .unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedTemplate { ref reference, .. } if reference == "{{2}}"));
    }

    #[test]
    fn unknown_name_reference_is_fatal() {
        let err = load_json(json!({
            "global_rules": [{
                "if_file": "any",
                "expect": { "name_is": "{{baseName}}.ts" }
            }]
        }))
        .unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedTemplate { .. }));
    }

    #[test]
    fn name_captured_by_a_folder_condition_is_accepted() {
        let set = load_json(json!({
            "./": {
                "rules": [
                    { "if_folder": { "has_name": "regex:(?<feature>.+)-module" } },
                    { "if_file": "any", "expect": { "name_is": "{{feature}}.*" } }
                ]
            }
        }));
        assert!(set.is_ok());
    }

    #[test]
    fn nested_folder_keys_are_split() {
        let set = load_json(json!({
            "./": {
                "/src/stores": { "rules": [{ "if_file": "any" }] },
                "/src": { "has_files_in_root": ["index.ts"] }
            }
        }))
        .unwrap();
        let src = &set.root.folders["src"];
        assert_eq!(src.path, "./src");
        assert_eq!(src.has_files_in_root.len(), 1);
        assert_eq!(src.folders["stores"].path, "./src/stores");
        assert_eq!(src.folders["stores"].rules.len(), 1);
    }

    #[test]
    fn unknown_folder_field_is_rejected() {
        let err = load_json(json!({ "./": { "rulez": [] } })).unwrap_err();
        assert!(matches!(err, LoadError::UnknownField { ref field, .. } if field == "rulez"));
    }

    #[test]
    fn content_constraints_and_legacy_forms() {
        let set = load_json(json!({
            "global_rules": [{
                "if_file": "any",
                "expect": {
                    "content_matches": [
                        "plain",
                        { "every": ["a", "b"], "at_most": 2 }
                    ],
                    "content_matches_any": ["x", "y"]
                }
            }]
        }))
        .unwrap();
        let Rule::File(rule) = &set.global_rules[0] else {
            panic!("expected file rule");
        };
        let Expectations::Each(expects) = &rule.expect else {
            panic!("expected list");
        };
        let c = &expects[0].content_matches;
        assert_eq!(c.len(), 3);
        assert_eq!(c[1].quantifier, Quantifier::Every);
        assert_eq!(c[1].at_most, Some(2));
        assert_eq!(c[2].patterns.len(), 2);
    }

    #[test]
    fn inverted_bounds_rejected() {
        let err = load_json(json!({
            "global_rules": [{
                "if_file": "any",
                "expect": { "content_matches": [{ "some": ["a"], "at_least": 3, "at_most": 1 }] }
            }]
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Validation {
                source: ModelError::InvertedBounds { .. },
                ..
            }
        ));
    }

    #[test]
    fn invalid_keywords_rejected() {
        let err = load_json(json!({ "global_rules": [{ "if_file": "all" }] })).unwrap_err();
        assert!(matches!(err, LoadError::InvalidKeyword { .. }));
        let err = load_json(json!({ "global_rules": [{ "if_file": "any", "expect": "some" }] }))
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidKeyword { .. }));
    }
}
